use async_trait::async_trait;
use uuid::Uuid;

use crate::worker::errors::WorkerError;
use crate::worker::types::{ConfigMap, Heartbeat, WorkerKind};

/// Lifecycle interface every worker kind exposes to the coordinator.
#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> Uuid;

    fn kind(&self) -> WorkerKind;

    /// Starts background activity (cleanup loops etc.). Starting an
    /// already-running worker is an error, not a silent no-op.
    async fn start(&self) -> Result<(), WorkerError>;

    async fn stop(&self) -> Result<(), WorkerError>;

    /// Reports the worker's own view of its status and resource usage.
    async fn heartbeat(&self) -> Result<Heartbeat, WorkerError>;

    /// Hot-merges a configuration patch. Unrecognized keys are kept, not
    /// validated.
    fn update_config(&self, patch: ConfigMap);

    fn config(&self) -> ConfigMap;
}
