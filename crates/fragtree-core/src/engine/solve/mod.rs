//! Maximum colorful subtree solvers.
//!
//! The optimizer selects a subset of loss edges forming a tree rooted at the
//! pseudo-root in which no two fragments share a peak, maximizing the sum of
//! edge weights. The problem is NP-hard; [`BranchBoundSolver`] solves it
//! exactly with anytime behavior under a budget, [`GreedySolver`] gives a
//! fast lower bound.

mod branch_bound;
mod greedy;

pub use branch_bound::BranchBoundSolver;
pub use greedy::GreedySolver;

use crate::core::models::graph::{FragmentationGraph, LossId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Shared cancellation flag. Cloning yields a handle to the same flag, so a
/// caller can cancel a solve running on another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Wall-clock and cancellation budget for one solve.
#[derive(Debug, Clone, Default)]
pub struct SolveBudget {
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl SolveBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn expired(&self) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// Result of one solve: the selected edges, their summed weight, and whether
/// the solver proved optimality before the budget ran out.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub edges: Vec<LossId>,
    pub objective: f64,
    pub optimal: bool,
}

/// The optimizer seam. Implementations must return a valid colorful tree
/// rooted at the pseudo-root, or `None` for an infeasible graph. When the
/// budget expires mid-search, the best tree found so far is returned with
/// `optimal` set to `false`.
pub trait TreeSolver: Send + Sync {
    fn solve(&self, graph: &FragmentationGraph, budget: &SolveBudget) -> Option<SolverOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn budget_expires_on_past_deadline_or_cancellation() {
        let budget = SolveBudget::with_deadline(Instant::now());
        assert!(budget.expired());

        let token = CancelToken::new();
        let budget = SolveBudget::unbounded().with_cancel(token.clone());
        assert!(!budget.expired());
        token.cancel();
        assert!(budget.expired());
    }
}
