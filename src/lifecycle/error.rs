//! Lifecycle error types.

use thiserror::Error;

use crate::catalog::DeploymentStatus;

/// A lifecycle operation was refused. Nothing changed and nothing was logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("model {model_id} cannot deploy while {status}")]
    NotIdle {
        model_id: String,
        status: DeploymentStatus,
    },

    #[error("model {model_id} is {status}, not Active")]
    NotActive {
        model_id: String,
        status: DeploymentStatus,
    },

    #[error("model {0} has no open deployment")]
    NoInstance(String),

    #[error("model {0} is already scaling")]
    ScaleInFlight(String),

    #[error("model {0} is terminating")]
    TerminationInFlight(String),

    #[error("scale delta must be at least 1")]
    InvalidDelta,
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
