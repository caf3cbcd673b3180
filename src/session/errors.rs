use thiserror::Error;
use uuid::Uuid;

use crate::action::Action;
use crate::device::DeviceBinding;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("device {device} unavailable")]
    DeviceUnavailable { device: DeviceBinding },

    #[error("action {action:?} failed on trajectory {trajectory_id} (device {device}): {reason}")]
    ActionExecution {
        trajectory_id: Uuid,
        device: DeviceBinding,
        action: Action,
        reason: String,
    },

    #[error(
        "snapshot was taken on device {snapshot_device} but trajectory {trajectory_id} is bound to {session_device}"
    )]
    SnapshotMismatch {
        trajectory_id: Uuid,
        session_device: DeviceBinding,
        snapshot_device: DeviceBinding,
    },

    #[error("snapshot operation failed for trajectory {trajectory_id}: {reason}")]
    Snapshot { trajectory_id: Uuid, reason: String },

    #[error("snapshot metadata I/O failed: {0}")]
    Metadata(#[from] std::io::Error),

    #[error("snapshot metadata encoding failed: {0}")]
    MetadataEncode(#[from] serde_json::Error),
}
