//! One live trajectory bound to one device.
//!
//! A `Session` owns the binding for its lifetime: it executes normalized
//! actions through the injected [`DeviceControl`] collaborator, tracks the
//! last observation, and handles snapshot save/load including the metadata
//! check that stops a snapshot from being restored onto the wrong device.

pub mod errors;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::action::Action;
use crate::device::{DeviceBinding, DeviceControl, DeviceError, Observation};
pub use errors::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Running,
    Saved,
    Removed,
}

/// A point-in-time device snapshot plus the session metadata needed to
/// validate a later restore. Persisted as `<trajectory_id>.json` under the
/// worker's snapshot directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRef {
    /// Opaque reference handed back by the device collaborator.
    pub snapshot: String,
    pub trajectory_id: Uuid,
    pub device: DeviceBinding,
    /// Unix timestamp (seconds) at save time.
    pub taken_at: u64,
}

pub struct Session {
    trajectory_id: Uuid,
    device: DeviceBinding,
    control: Arc<dyn DeviceControl>,
    snapshot_dir: Option<PathBuf>,
    state: SessionState,
    last_observation: Option<Observation>,
}

impl Session {
    pub fn new(
        trajectory_id: Uuid,
        device: DeviceBinding,
        control: Arc<dyn DeviceControl>,
        snapshot_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            trajectory_id,
            device,
            control,
            snapshot_dir,
            state: SessionState::Created,
            last_observation: None,
        }
    }

    pub fn trajectory_id(&self) -> Uuid {
        self.trajectory_id
    }

    pub fn device(&self) -> &DeviceBinding {
        &self.device
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_observation(&self) -> Option<&Observation> {
        self.last_observation.as_ref()
    }

    /// Executes one action against the bound device and returns a fresh
    /// observation. A collaborator timeout leaves the session running; the
    /// caller decides what to do with the late failure.
    pub async fn step(&mut self, action: &Action) -> Result<Observation, SessionError> {
        let obs = self
            .control
            .execute(&self.device, action)
            .await
            .map_err(|e| self.map_device_error(e, action))?;
        self.state = SessionState::Running;
        self.last_observation = Some(obs.clone());
        Ok(obs)
    }

    /// Snapshots the device and persists session metadata so a later `load`
    /// can validate the device binding.
    pub async fn save(&mut self) -> Result<SnapshotRef, SessionError> {
        let snapshot = self
            .control
            .snapshot_save(&self.device)
            .await
            .map_err(|e| self.map_snapshot_error(e))?;

        let snapshot_ref = SnapshotRef {
            snapshot,
            trajectory_id: self.trajectory_id,
            device: self.device.clone(),
            taken_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };

        if let Some(dir) = &self.snapshot_dir {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}.json", self.trajectory_id));
            let bytes = serde_json::to_vec_pretty(&snapshot_ref)?;
            std::fs::write(&path, bytes)?;
            info!(trajectory_id = %self.trajectory_id, path = %path.display(), "snapshot metadata written");
        }

        self.state = SessionState::Saved;
        Ok(snapshot_ref)
    }

    /// Restores a snapshot. Rejected when the snapshot was taken on a
    /// different device than this session is bound to.
    pub async fn load(&mut self, snapshot_ref: &SnapshotRef) -> Result<(), SessionError> {
        if snapshot_ref.device != self.device {
            return Err(SessionError::SnapshotMismatch {
                trajectory_id: self.trajectory_id,
                session_device: self.device.clone(),
                snapshot_device: snapshot_ref.device.clone(),
            });
        }

        self.control
            .snapshot_restore(&self.device, &snapshot_ref.snapshot)
            .await
            .map_err(|e| self.map_snapshot_error(e))?;
        self.state = SessionState::Running;
        Ok(())
    }

    /// Tears down collaborator state and removes the local snapshot metadata
    /// file. The metadata delete is best-effort; a stale file only wastes
    /// disk.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Removed;

        if let Some(dir) = &self.snapshot_dir {
            let path = dir.join(format!("{}.json", self.trajectory_id));
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(trajectory_id = %self.trajectory_id, error = %e, "failed to delete snapshot metadata");
                }
            }
        }

        self.control
            .teardown(&self.device)
            .await
            .map_err(|e| self.map_snapshot_error(e))
    }

    fn map_device_error(&self, e: DeviceError, action: &Action) -> SessionError {
        match e {
            DeviceError::Unreachable(device) => SessionError::DeviceUnavailable { device },
            DeviceError::Timeout(_) | DeviceError::Execution(_) => {
                SessionError::ActionExecution {
                    trajectory_id: self.trajectory_id,
                    device: self.device.clone(),
                    action: action.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn map_snapshot_error(&self, e: DeviceError) -> SessionError {
        match e {
            DeviceError::Unreachable(device) => SessionError::DeviceUnavailable { device },
            other => SessionError::Snapshot {
                trajectory_id: self.trajectory_id,
                reason: other.to_string(),
            },
        }
    }
}
