//! Reward worker: stateless-per-call scoring of recorded trajectories.
//!
//! Nothing here reads or writes session state; the payload handed to
//! `calculate` is all there is, and outcomes are not retained.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::worker::errors::{RewardError, WorkerError};
use crate::worker::traits::Worker;
use crate::worker::types::{
    merge_config, ConfigMap, Heartbeat, RewardOutcome, TrajectoryData, WorkerKind, WorkerStatus,
};

const ACTION_PENALTY: f64 = -0.01;
const TARGET_BONUS: f64 = 0.5;
const SUCCESS_BONUS: f64 = 1.0;

pub struct RewardWorker {
    id: Uuid,
    config: StdMutex<ConfigMap>,
    running: AtomicBool,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for RewardWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardWorker {
    pub fn new() -> Self {
        let worker = Self {
            id: Uuid::new_v4(),
            config: StdMutex::new(ConfigMap::new()),
            running: AtomicBool::new(false),
        };
        info!(worker_id = %worker.id, "reward worker initialized");
        worker
    }

    /// Scores a recorded trajectory. Unknown `reward_type` is an error;
    /// missing optional payload fields are treated as empty.
    pub fn calculate(
        &self,
        reward_type: &str,
        data: &TrajectoryData,
    ) -> Result<RewardOutcome, RewardError> {
        match reward_type {
            "rule_based" => Ok(rule_based(data)),
            "task_completion" => Ok(task_completion(data)),
            "efficiency" => Ok(efficiency(data)),
            other => Err(RewardError::UnknownRewardType(other.to_string())),
        }
    }
}

/// Deterministic rule mix: per-action penalty, a bonus for reaching a target
/// element, and a terminal success bonus.
fn rule_based(data: &TrajectoryData) -> RewardOutcome {
    let mut reward = 0.0;
    let mut breakdown = BTreeMap::new();

    let action_penalty = ACTION_PENALTY * data.actions.len() as f64;
    reward += action_penalty;
    breakdown.insert("action_penalty".to_string(), action_penalty);

    let target_achieved = data.states.iter().any(|state| {
        state.get("target_element").is_some()
            && state.get("interaction").and_then(|v| v.as_str()) == Some("click")
    });
    if target_achieved {
        reward += TARGET_BONUS;
        breakdown.insert("target_bonus".to_string(), TARGET_BONUS);
    }

    if data.success {
        reward += SUCCESS_BONUS;
        breakdown.insert("success_bonus".to_string(), SUCCESS_BONUS);
    }

    RewardOutcome { reward, breakdown }
}

/// All-or-nothing: 1.0 when every goal condition holds in the final state,
/// 0.0 otherwise. An empty goal is never considered met.
fn task_completion(data: &TrajectoryData) -> RewardOutcome {
    let completed = !data.goal.is_empty()
        && data
            .goal
            .iter()
            .all(|(key, expected)| data.final_state.get(key) == Some(expected));

    let reward = if completed { SUCCESS_BONUS } else { 0.0 };
    let mut breakdown = BTreeMap::new();
    breakdown.insert(
        "task_completed".to_string(),
        if completed { 1.0 } else { 0.0 },
    );
    RewardOutcome { reward, breakdown }
}

/// Fewer steps, higher reward; failure gets a small flat penalty.
fn efficiency(data: &TrajectoryData) -> RewardOutcome {
    let mut breakdown = BTreeMap::new();
    let reward = if !data.success {
        -0.1
    } else if data.actions.is_empty() {
        0.0
    } else {
        1.0 / data.actions.len() as f64
    };
    breakdown.insert("efficiency".to_string(), reward);
    RewardOutcome { reward, breakdown }
}

#[async_trait]
impl Worker for RewardWorker {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Reward
    }

    async fn start(&self) -> Result<(), WorkerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::AlreadyRunning);
        }
        info!(worker_id = %self.id, "reward worker started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), WorkerError> {
        self.running.store(false, Ordering::SeqCst);
        info!(worker_id = %self.id, "reward worker stopped");
        Ok(())
    }

    async fn heartbeat(&self) -> Result<Heartbeat, WorkerError> {
        let status = if self.running.load(Ordering::SeqCst) {
            WorkerStatus::Running
        } else {
            WorkerStatus::Stopped
        };
        let mut resources = ConfigMap::new();
        resources.insert(
            "active".to_string(),
            json!(self.running.load(Ordering::SeqCst)),
        );
        Ok(Heartbeat { status, resources })
    }

    fn update_config(&self, patch: ConfigMap) {
        info!(worker_id = %self.id, "updating reward worker config");
        merge_config(&mut lock(&self.config), patch);
    }

    fn config(&self) -> ConfigMap {
        lock(&self.config).clone()
    }
}
