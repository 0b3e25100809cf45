use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::input::InputError;
use crate::core::scoring::ScoringError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {source}")]
    Input {
        #[from]
        source: InputError,
    },

    #[error("Scoring failed: {source}")]
    Scoring {
        #[from]
        source: ScoringError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}
