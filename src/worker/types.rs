use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque key/value configuration map. The core only consumes the keys it
/// recognizes (`max_idle_secs`, `cleanup_interval_secs`); everything else is
/// carried for whoever injected it.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Shallow-merges `patch` into `base`, overwriting existing keys.
pub fn merge_config(base: &mut ConfigMap, patch: ConfigMap) {
    for (key, value) in patch {
        base.insert(key, value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Environment,
    Reward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Stopped,
    Starting,
    Running,
    Degraded,
    StoppedError,
}

/// Snapshot of a worker's own view of its health, returned by
/// [`Worker::heartbeat`](crate::worker::Worker::heartbeat).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub status: WorkerStatus,
    /// Free-form resource gauges (active trajectories, free devices, ...).
    #[serde(default)]
    pub resources: ConfigMap,
}

/// A recorded trajectory submitted for scoring. Optional fields default to
/// empty so partially-specified payloads never fail deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrajectoryData {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub states: Vec<Value>,
    #[serde(default)]
    pub success: bool,
    /// Key/value conditions the task is considered done when met.
    #[serde(default)]
    pub goal: ConfigMap,
    /// Observed end-of-trajectory state, matched against `goal`.
    #[serde(default)]
    pub final_state: ConfigMap,
}

/// Scalar reward plus the per-factor breakdown that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardOutcome {
    pub reward: f64,
    pub breakdown: BTreeMap<String, f64>,
}
