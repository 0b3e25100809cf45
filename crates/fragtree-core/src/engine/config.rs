use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for parameter '{parameter}': {message}")]
    InvalidValue {
        parameter: &'static str,
        message: String,
    },
}

/// Settings for the post-optimization recalibration pass. When enabled, a
/// linear mass correction is fitted against the best tree's annotations and
/// the analysis is rerun on the corrected input if the fit is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalibrationConfig {
    pub enabled: bool,
    /// Minimum number of annotated peaks required before a correction is
    /// fitted. Fits over fewer points are too noisy to trust.
    pub min_peaks: usize,
    pub max_rounds: usize,
}

impl Default for RecalibrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_peaks: 5,
            max_rounds: 1,
        }
    }
}

/// Top-level analysis parameters. `Duration::ZERO` disables the corresponding
/// time budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Wall-clock budget for solving a single candidate's graph.
    pub candidate_timeout: Duration,
    /// Wall-clock budget for the whole compound across all candidates.
    pub compound_timeout: Duration,
    pub recalibration: RecalibrationConfig,
    /// Number of top-ranked trees kept in the outcome.
    pub retained_trees: usize,
}

impl AnalysisConfig {
    /// Range checks shared by the builder and by entry points that accept a
    /// config constructed directly from its public fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recalibration.min_peaks < 3 {
            return Err(ConfigError::InvalidValue {
                parameter: "min_recalibration_peaks",
                message: format!("must be at least 3, got {}", self.recalibration.min_peaks),
            });
        }
        if self.retained_trees == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "retained_trees",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            candidate_timeout: Duration::ZERO,
            compound_timeout: Duration::ZERO,
            recalibration: RecalibrationConfig::default(),
            retained_trees: 1,
        }
    }
}

#[derive(Default)]
pub struct AnalysisConfigBuilder {
    candidate_timeout: Option<Duration>,
    compound_timeout: Option<Duration>,
    recalibration_enabled: Option<bool>,
    min_recalibration_peaks: Option<usize>,
    max_recalibration_rounds: Option<usize>,
    retained_trees: Option<usize>,
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = Some(timeout);
        self
    }
    pub fn compound_timeout(mut self, timeout: Duration) -> Self {
        self.compound_timeout = Some(timeout);
        self
    }
    pub fn recalibration_enabled(mut self, enabled: bool) -> Self {
        self.recalibration_enabled = Some(enabled);
        self
    }
    pub fn min_recalibration_peaks(mut self, peaks: usize) -> Self {
        self.min_recalibration_peaks = Some(peaks);
        self
    }
    pub fn max_recalibration_rounds(mut self, rounds: usize) -> Self {
        self.max_recalibration_rounds = Some(rounds);
        self
    }
    pub fn retained_trees(mut self, count: usize) -> Self {
        self.retained_trees = Some(count);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let defaults = AnalysisConfig::default();
        let recalibration_defaults = RecalibrationConfig::default();
        let config = AnalysisConfig {
            candidate_timeout: self.candidate_timeout.unwrap_or(defaults.candidate_timeout),
            compound_timeout: self.compound_timeout.unwrap_or(defaults.compound_timeout),
            recalibration: RecalibrationConfig {
                enabled: self
                    .recalibration_enabled
                    .unwrap_or(recalibration_defaults.enabled),
                min_peaks: self
                    .min_recalibration_peaks
                    .unwrap_or(recalibration_defaults.min_peaks),
                max_rounds: self
                    .max_recalibration_rounds
                    .unwrap_or(recalibration_defaults.max_rounds),
            },
            retained_trees: self.retained_trees.unwrap_or(defaults.retained_trees),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_unset_fields_with_defaults() {
        let config = AnalysisConfigBuilder::new()
            .candidate_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.candidate_timeout, Duration::from_secs(5));
        assert_eq!(config.compound_timeout, Duration::ZERO);
        assert!(config.recalibration.enabled);
        assert_eq!(config.retained_trees, 1);
    }

    #[test]
    fn builder_rejects_too_few_recalibration_peaks() {
        let result = AnalysisConfigBuilder::new()
            .min_recalibration_peaks(2)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "min_recalibration_peaks",
                ..
            })
        ));
    }

    #[test]
    fn builder_rejects_zero_retained_trees() {
        let result = AnalysisConfigBuilder::new().retained_trees(0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "retained_trees",
                ..
            })
        ));
    }

    #[test]
    fn validate_catches_direct_struct_construction() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let config = AnalysisConfig {
            retained_trees: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                parameter: "retained_trees",
                ..
            })
        ));
    }
}
