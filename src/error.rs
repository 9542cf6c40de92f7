//! Error taxonomy for the energy hub pipeline.
//!
//! Loading and building errors abort a run. Solver and timeout errors are reported per solve, so
//! that a failing intermediate Pareto point does not discard points which were already solved.
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, EnergyHubError>;

/// Errors raised while loading, building or solving an energy hub model.
#[derive(Debug, Error)]
pub enum EnergyHubError {
    /// Input data is missing, malformed or inconsistent with the declared horizon.
    #[error("failed to load model from {path}")]
    Load {
        /// The model directory
        path: PathBuf,
        /// The underlying cause, with context naming the offending file
        #[source]
        source: anyhow::Error,
    },

    /// The requested build options are mutually inconsistent.
    #[error("invalid model configuration: {0}")]
    Build(String),

    /// The solver found the model infeasible or unbounded, or could not run it at all.
    #[error("solver failed during {stage}: {status}")]
    Solver {
        /// Which solve failed (e.g. "cost minimisation", "Pareto point 2")
        stage: String,
        /// The status reported by the solver
        status: String,
    },

    /// The configured solver time limit was reached before optimality was proven.
    #[error("solver time limit of {limit}s reached during {stage}")]
    Timeout {
        /// Which solve timed out
        stage: String,
        /// The time limit in seconds
        limit: f64,
    },
}

impl EnergyHubError {
    /// Create a [`EnergyHubError::Build`] from anything printable
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    /// Whether this error came from the solver rather than from the inputs
    pub fn is_solve_failure(&self) -> bool {
        matches!(self, Self::Solver { .. } | Self::Timeout { .. })
    }
}
