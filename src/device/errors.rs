use std::time::Duration;

use thiserror::Error;

use crate::device::types::DeviceBinding;

/// Failure conditions the device-control collaborator may report.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device {0} unreachable")]
    Unreachable(DeviceBinding),

    #[error("device operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("device operation failed: {0}")]
    Execution(String),
}
