pub mod env;
pub mod errors;
pub mod reward;
pub mod traits;
pub mod types;

pub use env::EnvWorker;
pub use errors::{EnvWorkerError, RewardError, WorkerError};
pub use reward::RewardWorker;
pub use traits::Worker;
pub use types::{ConfigMap, Heartbeat, RewardOutcome, TrajectoryData, WorkerKind, WorkerStatus};
