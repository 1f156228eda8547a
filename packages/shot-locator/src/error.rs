//! Solver error types.
//!
//! Two disjoint classes: [`InputError`] is a caller bug caught before the first
//! iteration, [`ConvergenceFailure`] is a numerical outcome that still carries
//! the best estimate found.

use serde::Serialize;
use shot_types::ShotEstimate;
use thiserror::Error;

/// Result type for solver operations
pub type SolveResult<T> = Result<T, SolveError>;

/// Precondition violations: bad inputs or configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// No arrival times or no sensor positions
    #[error("no arrival times or sensor positions supplied")]
    Empty,

    /// Times and positions are not index-aligned
    #[error("arrival time count ({times}) != sensor position count ({positions})")]
    LengthMismatch { times: usize, positions: usize },

    /// A config field that must be strictly positive is not
    #[error("config field `{field}` must be > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    /// A config field is NaN or infinite
    #[error("config field `{field}` is not finite")]
    NonFiniteConfig { field: &'static str },

    #[error("config field `max_iterations` must be at least 1")]
    ZeroIterations,

    #[error("arrival time at index {index} is not finite")]
    NonFiniteTime { index: usize },

    #[error("sensor position at index {index} is not finite")]
    NonFinitePosition { index: usize },
}

/// Why an iteration stopped short of tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// `max_iterations` updates applied, loss still above tolerance
    BudgetExhausted,
    /// Loss or iterate became NaN/Inf
    Diverged,
}

/// Non-convergence outcome, with the lowest-loss iterate seen
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize)]
#[error("solver stopped ({reason:?}) after {iterations} iterations; best loss {loss:.3e}")]
pub struct ConvergenceFailure {
    pub best: ShotEstimate,
    /// Mean squared residual of `best`
    pub loss: f64,
    /// Update steps applied before stopping
    pub iterations: usize,
    pub reason: FailureReason,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("invalid solver input: {0}")]
    InvalidInput(#[from] InputError),

    #[error(transparent)]
    NotConverged(#[from] ConvergenceFailure),
}

impl SolveError {
    /// True for caller errors, false for numerical non-convergence
    pub fn is_precondition(&self) -> bool {
        matches!(self, SolveError::InvalidInput(_))
    }

    /// Best available estimate for degraded operation, if the solve got that far
    pub fn best_estimate(&self) -> Option<&ShotEstimate> {
        match self {
            SolveError::NotConverged(f) => Some(&f.best),
            SolveError::InvalidInput(_) => None,
        }
    }
}
