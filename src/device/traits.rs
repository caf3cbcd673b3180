use async_trait::async_trait;

use crate::action::Action;
use crate::device::errors::DeviceError;
use crate::device::types::{DeviceBinding, Observation};

/// Capability interface for the external device/emulator control subsystem.
///
/// The core never assumes knowledge of how commands reach the device (ADB,
/// gRPC agent, in-memory fake). Timeouts are the implementor's concern; a
/// reported timeout surfaces to callers as an action-execution failure.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Executes one normalized action and returns a fresh observation.
    async fn execute(
        &self,
        device: &DeviceBinding,
        action: &Action,
    ) -> Result<Observation, DeviceError>;

    /// Persists device state, returning an opaque snapshot reference.
    async fn snapshot_save(&self, device: &DeviceBinding) -> Result<String, DeviceError>;

    /// Restores device state from a previously saved snapshot.
    async fn snapshot_restore(
        &self,
        device: &DeviceBinding,
        snapshot: &str,
    ) -> Result<(), DeviceError>;

    /// Tears down whatever per-device state the collaborator holds.
    async fn teardown(&self, device: &DeviceBinding) -> Result<(), DeviceError>;
}
