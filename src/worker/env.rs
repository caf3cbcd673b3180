//! Environment worker: owns the trajectory registry and the device pool.
//!
//! Two locking domains, per the concurrency model:
//! - one allocation lock over the pool + routing maps, never held across a
//!   device call;
//! - one async lock per trajectory, held across the device call, so steps on
//!   the same trajectory serialize in arrival order while distinct
//!   trajectories run fully in parallel.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::action::normalize;
use crate::device::{DeviceBinding, DeviceControl, Observation};
use crate::session::{Session, SnapshotRef};
use crate::worker::errors::{EnvWorkerError, WorkerError};
use crate::worker::traits::Worker;
use crate::worker::types::{merge_config, ConfigMap, Heartbeat, WorkerKind, WorkerStatus};

const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(3600);
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

struct Slot {
    device: DeviceBinding,
    last_active: StdMutex<Instant>,
    session: AsyncMutex<Session>,
}

impl Slot {
    fn touch(&self) {
        *lock(&self.last_active) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        lock(&self.last_active).elapsed()
    }
}

/// Pool + routing state, guarded by the single allocation lock.
struct AllocState {
    free: VecDeque<DeviceBinding>,
    bound: HashMap<DeviceBinding, Uuid>,
    trajectories: HashMap<Uuid, Arc<Slot>>,
}

impl AllocState {
    fn capacity(&self) -> usize {
        self.free.len() + self.bound.len()
    }
}

struct Shared {
    control: Arc<dyn DeviceControl>,
    snapshot_dir: StdMutex<Option<PathBuf>>,
    inner: StdMutex<AllocState>,
    config: StdMutex<ConfigMap>,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Atomically unbinds a trajectory. The slot keeps living until
    /// in-flight operations drain; the device stays off the free list until
    /// then, so no new trajectory can claim it mid-step.
    fn detach(&self, trajectory_id: Uuid) -> Result<Arc<Slot>, EnvWorkerError> {
        let mut inner = lock(&self.inner);
        let slot = inner
            .trajectories
            .remove(&trajectory_id)
            .ok_or(EnvWorkerError::UnknownTrajectory(trajectory_id))?;
        inner.bound.remove(&slot.device);
        Ok(slot)
    }

    async fn remove(&self, trajectory_id: Uuid) -> Result<(), EnvWorkerError> {
        // Phase one: the routing entry goes away no matter what happens to
        // teardown below, so the id is never left stuck.
        let slot = self.detach(trajectory_id)?;

        // Phase two: wait for in-flight operations on the trajectory to
        // drain, then best-effort teardown. Only then does the device return
        // to the pool; the binding is released even when teardown fails.
        let mut session = slot.session.lock().await;
        let result = session.close().await;
        lock(&self.inner).free.push_back(slot.device.clone());
        info!(%trajectory_id, device = %slot.device, "trajectory removed, device released");
        result.map_err(EnvWorkerError::from)
    }

    fn max_idle(&self) -> Duration {
        lock(&self.config)
            .get("max_idle_secs")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MAX_IDLE)
    }

    fn cleanup_interval(&self) -> Duration {
        lock(&self.config)
            .get("cleanup_interval_secs")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL)
    }

    /// One sweep over the registry, removing trajectories idle longer than
    /// `max_idle`.
    async fn cleanup_idle(&self, max_idle: Duration) {
        let idle: Vec<Uuid> = {
            let inner = lock(&self.inner);
            inner
                .trajectories
                .iter()
                .filter(|(_, slot)| slot.idle_for() > max_idle)
                .map(|(id, _)| *id)
                .collect()
        };

        for trajectory_id in idle {
            info!(%trajectory_id, "cleaning up idle trajectory");
            if let Err(e) = self.remove(trajectory_id).await {
                error!(%trajectory_id, error = %e, "idle cleanup failed");
            }
        }
    }
}

/// Manages a pool of environment sessions keyed by trajectory id.
pub struct EnvWorker {
    id: Uuid,
    shared: Arc<Shared>,
    running: AtomicBool,
    cleanup_task: StdMutex<Option<JoinHandle<()>>>,
}

impl EnvWorker {
    /// `devices` is the fixed pool supplied by the provisioning collaborator;
    /// its length is the worker's capacity.
    pub fn new(control: Arc<dyn DeviceControl>, devices: Vec<DeviceBinding>) -> Self {
        let worker = Self {
            id: Uuid::new_v4(),
            shared: Arc::new(Shared {
                control,
                snapshot_dir: StdMutex::new(None),
                inner: StdMutex::new(AllocState {
                    free: devices.into_iter().collect(),
                    bound: HashMap::new(),
                    trajectories: HashMap::new(),
                }),
                config: StdMutex::new(ConfigMap::new()),
            }),
            running: AtomicBool::new(false),
            cleanup_task: StdMutex::new(None),
        };
        info!(worker_id = %worker.id, "environment worker initialized");
        worker
    }

    /// Directory for snapshot metadata files (one JSON file per trajectory).
    pub fn with_snapshot_dir(self, dir: impl Into<PathBuf>) -> Self {
        *lock(&self.shared.snapshot_dir) = Some(dir.into());
        self
    }

    pub fn with_config(self, config: ConfigMap) -> Self {
        *lock(&self.shared.config) = config;
        self
    }

    /// Allocates the next free device and creates a session bound to it.
    /// Allocation and registry insertion happen under one lock acquisition,
    /// so two concurrent creates can never claim the same device.
    pub fn create(&self) -> Result<Uuid, EnvWorkerError> {
        let mut inner = lock(&self.shared.inner);
        let capacity = inner.capacity();
        let device = inner
            .free
            .pop_front()
            .ok_or(EnvWorkerError::PoolExhausted { capacity })?;

        let trajectory_id = Uuid::new_v4();
        let session = Session::new(
            trajectory_id,
            device.clone(),
            Arc::clone(&self.shared.control),
            lock(&self.shared.snapshot_dir).clone(),
        );
        inner.bound.insert(device.clone(), trajectory_id);
        inner.trajectories.insert(
            trajectory_id,
            Arc::new(Slot {
                device: device.clone(),
                last_active: StdMutex::new(Instant::now()),
                session: AsyncMutex::new(session),
            }),
        );
        drop(inner);

        info!(%trajectory_id, %device, "trajectory created");
        Ok(trajectory_id)
    }

    fn slot(&self, trajectory_id: Uuid) -> Result<Arc<Slot>, EnvWorkerError> {
        lock(&self.shared.inner)
            .trajectories
            .get(&trajectory_id)
            .cloned()
            .ok_or(EnvWorkerError::UnknownTrajectory(trajectory_id))
    }

    /// Normalizes `raw` and executes it on the trajectory's device. Serialized
    /// per trajectory; parallel across trajectories.
    pub async fn step(
        &self,
        trajectory_id: Uuid,
        raw: &Value,
    ) -> Result<Observation, EnvWorkerError> {
        let slot = self.slot(trajectory_id)?;
        // A stream of malformed actions must not keep the trajectory alive.
        let action = normalize(raw)?;
        slot.touch();

        let mut session = slot.session.lock().await;
        let obs = session.step(&action).await?;
        Ok(obs)
    }

    pub async fn save(&self, trajectory_id: Uuid) -> Result<SnapshotRef, EnvWorkerError> {
        let slot = self.slot(trajectory_id)?;
        slot.touch();
        let mut session = slot.session.lock().await;
        Ok(session.save().await?)
    }

    pub async fn load(
        &self,
        trajectory_id: Uuid,
        snapshot_ref: &SnapshotRef,
    ) -> Result<(), EnvWorkerError> {
        let slot = self.slot(trajectory_id)?;
        slot.touch();
        let mut session = slot.session.lock().await;
        Ok(session.load(snapshot_ref).await?)
    }

    /// Removes a trajectory and frees its device. The routing entry is gone
    /// even when teardown fails partially; a second remove on the same id
    /// reports `UnknownTrajectory`.
    pub async fn remove(&self, trajectory_id: Uuid) -> Result<(), EnvWorkerError> {
        self.shared.remove(trajectory_id).await
    }

    /// Runs one idle-cleanup sweep with the currently configured threshold.
    pub async fn cleanup_idle_once(&self) {
        let max_idle = self.shared.max_idle();
        self.shared.cleanup_idle(max_idle).await;
    }

    pub fn active_trajectories(&self) -> usize {
        lock(&self.shared.inner).trajectories.len()
    }

    pub fn free_devices(&self) -> usize {
        lock(&self.shared.inner).free.len()
    }
}

#[async_trait]
impl Worker for EnvWorker {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Environment
    }

    async fn start(&self) -> Result<(), WorkerError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(worker_id = %self.id, "start requested but worker is already running");
            return Err(WorkerError::AlreadyRunning);
        }

        let shared = Arc::clone(&self.shared);
        let worker_id = self.id;
        let handle = tokio::spawn(async move {
            info!(%worker_id, "environment worker cleanup loop running");
            loop {
                tokio::time::sleep(shared.cleanup_interval()).await;
                let max_idle = shared.max_idle();
                shared.cleanup_idle(max_idle).await;
            }
        });
        *lock(&self.cleanup_task) = Some(handle);

        info!(worker_id = %self.id, "environment worker started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), WorkerError> {
        if let Some(handle) = lock(&self.cleanup_task).take() {
            handle.abort();
        }
        self.running.store(false, Ordering::SeqCst);
        info!(worker_id = %self.id, "environment worker stopped");
        Ok(())
    }

    async fn heartbeat(&self) -> Result<Heartbeat, WorkerError> {
        let (active, free, capacity) = {
            let inner = lock(&self.shared.inner);
            (inner.trajectories.len(), inner.free.len(), inner.capacity())
        };
        let status = if self.running.load(Ordering::SeqCst) {
            WorkerStatus::Running
        } else {
            WorkerStatus::Stopped
        };

        let mut resources = ConfigMap::new();
        resources.insert("active_trajectories".to_string(), json!(active));
        resources.insert("free_devices".to_string(), json!(free));
        resources.insert("capacity".to_string(), json!(capacity));
        Ok(Heartbeat { status, resources })
    }

    fn update_config(&self, patch: ConfigMap) {
        info!(worker_id = %self.id, "updating environment worker config");
        merge_config(&mut lock(&self.shared.config), patch);
    }

    fn config(&self) -> ConfigMap {
        lock(&self.shared.config).clone()
    }
}
