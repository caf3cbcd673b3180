use thiserror::Error;
use uuid::Uuid;

use crate::worker::WorkerError;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("worker {0} not found")]
    WorkerNotFound(Uuid),

    #[error("`{op}` failed for worker {worker_id}: {source}")]
    WorkerOperationFailed {
        worker_id: Uuid,
        op: &'static str,
        #[source]
        source: WorkerError,
    },
}
