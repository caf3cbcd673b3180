use thiserror::Error;
use uuid::Uuid;

use crate::action::ParseError;
use crate::session::SessionError;

/// Generic worker lifecycle failures.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker is already running")]
    AlreadyRunning,

    #[error("worker is not running")]
    NotRunning,

    #[error("worker operation failed: {0}")]
    Failed(String),
}

/// Failures of environment-worker trajectory operations.
#[derive(Error, Debug)]
pub enum EnvWorkerError {
    #[error("unknown trajectory {0}")]
    UnknownTrajectory(Uuid),

    #[error("device pool exhausted: all {capacity} devices are bound")]
    PoolExhausted { capacity: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewardError {
    #[error("unknown reward type `{0}`")]
    UnknownRewardType(String),
}
