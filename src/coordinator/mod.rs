//! Coordinator: registry and control plane for workers.
//!
//! Holds the worker registry behind its own lock, routes explicit control
//! operations, and runs the periodic health monitor. A worker that fails
//! enough consecutive probes is marked degraded and surfaced in `status()`;
//! it is never auto-restarted. Operators act on reported status.

pub mod errors;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

pub use errors::CoordinatorError;

use crate::worker::{ConfigMap, Worker, WorkerKind, WorkerStatus};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub health_check_interval: Duration,
    /// Consecutive failed probes before a worker is marked degraded.
    pub degraded_after: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(10),
            degraded_after: 3,
        }
    }
}

struct Entry {
    worker: Arc<dyn Worker>,
    status: WorkerStatus,
    last_health_check_at: Option<Instant>,
    consecutive_failures: u32,
}

/// Registry row returned by `status()`.
#[derive(Debug, Clone)]
pub struct WorkerOverview {
    pub worker_id: Uuid,
    pub kind: WorkerKind,
    pub status: WorkerStatus,
    pub last_health_check_at: Option<Instant>,
    pub consecutive_failures: u32,
}

type Registry = Arc<StdMutex<HashMap<Uuid, Entry>>>;

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Coordinator {
    id: Uuid,
    config: CoordinatorConfig,
    registry: Registry,
    monitor: StdMutex<Option<JoinHandle<()>>>,
    health_checks_run: Arc<AtomicU32>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let coordinator = Self {
            id: Uuid::new_v4(),
            config,
            registry: Arc::new(StdMutex::new(HashMap::new())),
            monitor: StdMutex::new(None),
            health_checks_run: Arc::new(AtomicU32::new(0)),
        };
        info!(coordinator_id = %coordinator.id, "coordinator initialized");
        coordinator
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn register(&self, worker: Arc<dyn Worker>) -> Uuid {
        let worker_id = worker.id();
        let kind = worker.kind();
        lock(&self.registry).insert(
            worker_id,
            Entry {
                worker,
                status: WorkerStatus::Stopped,
                last_health_check_at: None,
                consecutive_failures: 0,
            },
        );
        info!(%worker_id, ?kind, "worker registered");
        worker_id
    }

    pub fn unregister(&self, worker_id: Uuid) -> Result<(), CoordinatorError> {
        match lock(&self.registry).remove(&worker_id) {
            Some(_) => {
                info!(%worker_id, "worker unregistered");
                Ok(())
            }
            None => {
                warn!(%worker_id, "attempted to unregister unknown worker");
                Err(CoordinatorError::WorkerNotFound(worker_id))
            }
        }
    }

    fn worker(&self, worker_id: Uuid) -> Result<Arc<dyn Worker>, CoordinatorError> {
        lock(&self.registry)
            .get(&worker_id)
            .map(|entry| Arc::clone(&entry.worker))
            .ok_or(CoordinatorError::WorkerNotFound(worker_id))
    }

    fn set_status(&self, worker_id: Uuid, status: WorkerStatus) {
        if let Some(entry) = lock(&self.registry).get_mut(&worker_id) {
            entry.status = status;
        }
    }

    pub async fn start_worker(&self, worker_id: Uuid) -> Result<(), CoordinatorError> {
        let worker = self.worker(worker_id)?;
        self.set_status(worker_id, WorkerStatus::Starting);

        // The worker call runs without the registry lock held; a slow start
        // must not block status queries.
        match worker.start().await {
            Ok(()) => {
                self.set_status(worker_id, WorkerStatus::Running);
                info!(%worker_id, "worker started");
                Ok(())
            }
            Err(source) => {
                self.set_status(worker_id, WorkerStatus::StoppedError);
                Err(CoordinatorError::WorkerOperationFailed {
                    worker_id,
                    op: "start",
                    source,
                })
            }
        }
    }

    pub async fn stop_worker(&self, worker_id: Uuid) -> Result<(), CoordinatorError> {
        let worker = self.worker(worker_id)?;
        match worker.stop().await {
            Ok(()) => {
                self.set_status(worker_id, WorkerStatus::Stopped);
                info!(%worker_id, "worker stopped");
                Ok(())
            }
            Err(source) => {
                self.set_status(worker_id, WorkerStatus::StoppedError);
                Err(CoordinatorError::WorkerOperationFailed {
                    worker_id,
                    op: "stop",
                    source,
                })
            }
        }
    }

    pub async fn restart_worker(&self, worker_id: Uuid) -> Result<(), CoordinatorError> {
        self.stop_worker(worker_id).await?;
        self.start_worker(worker_id).await
    }

    pub fn update_worker_config(
        &self,
        worker_id: Uuid,
        patch: ConfigMap,
    ) -> Result<(), CoordinatorError> {
        let worker = self.worker(worker_id)?;
        worker.update_config(patch);
        info!(%worker_id, "worker config updated");
        Ok(())
    }

    pub fn status(&self) -> Vec<WorkerOverview> {
        lock(&self.registry)
            .iter()
            .map(|(worker_id, entry)| WorkerOverview {
                worker_id: *worker_id,
                kind: entry.worker.kind(),
                status: entry.status,
                last_health_check_at: entry.last_health_check_at,
                consecutive_failures: entry.consecutive_failures,
            })
            .collect()
    }

    pub fn worker_status(&self, worker_id: Uuid) -> Result<WorkerOverview, CoordinatorError> {
        lock(&self.registry)
            .get(&worker_id)
            .map(|entry| WorkerOverview {
                worker_id,
                kind: entry.worker.kind(),
                status: entry.status,
                last_health_check_at: entry.last_health_check_at,
                consecutive_failures: entry.consecutive_failures,
            })
            .ok_or(CoordinatorError::WorkerNotFound(worker_id))
    }

    /// Spawns the periodic health monitor. Probes run without holding the
    /// registry lock so a slow worker never blocks status queries.
    pub fn spawn_health_monitor(&self) {
        let registry = Arc::clone(&self.registry);
        let interval = self.config.health_check_interval;
        let degraded_after = self.config.degraded_after;
        let checks_run = Arc::clone(&self.health_checks_run);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                run_health_checks(&registry, degraded_after).await;
                checks_run.fetch_add(1, Ordering::Relaxed);
            }
        });

        if let Some(old) = lock(&self.monitor).replace(handle) {
            old.abort();
        }
        info!(coordinator_id = %self.id, interval = ?interval, "health monitor running");
    }

    /// Number of completed health-check sweeps. Useful for tests and status
    /// endpoints.
    pub fn health_checks_run(&self) -> u32 {
        self.health_checks_run.load(Ordering::Relaxed)
    }

    /// Stops the monitor and all registered workers. Worker stop failures
    /// are logged and skipped so one bad worker cannot wedge shutdown.
    pub async fn shutdown(&self) {
        info!(coordinator_id = %self.id, "shutting down coordinator");
        if let Some(handle) = lock(&self.monitor).take() {
            handle.abort();
        }

        let workers: Vec<(Uuid, Arc<dyn Worker>)> = lock(&self.registry)
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(&entry.worker)))
            .collect();

        for (worker_id, worker) in workers {
            if let Err(e) = worker.stop().await {
                warn!(%worker_id, error = %e, "worker failed to stop during shutdown");
            }
            self.set_status(worker_id, WorkerStatus::Stopped);
        }
    }
}

/// One sweep: probe every worker, then fold the results back into the
/// registry. Degraded is reported, never acted on.
async fn run_health_checks(registry: &Registry, degraded_after: u32) {
    let workers: Vec<(Uuid, Arc<dyn Worker>)> = lock(registry)
        .iter()
        .map(|(id, entry)| (*id, Arc::clone(&entry.worker)))
        .collect();

    for (worker_id, worker) in workers {
        let probe = worker.heartbeat().await;
        let now = Instant::now();

        let mut map = lock(registry);
        let Some(entry) = map.get_mut(&worker_id) else {
            continue; // unregistered mid-probe
        };
        entry.last_health_check_at = Some(now);

        match probe {
            Ok(hb) => {
                entry.consecutive_failures = 0;
                // Recovery from degraded is reflected; explicit operator
                // states (stopped, stopped-error) are left alone.
                if entry.status == WorkerStatus::Degraded {
                    entry.status = hb.status;
                }
            }
            Err(e) => {
                entry.consecutive_failures += 1;
                error!(%worker_id, failures = entry.consecutive_failures, error = %e, "health check failed");
                if entry.consecutive_failures >= degraded_after {
                    if entry.status != WorkerStatus::Degraded {
                        warn!(%worker_id, "worker marked degraded; restart is an operator action");
                    }
                    entry.status = WorkerStatus::Degraded;
                }
            }
        }
    }
}
