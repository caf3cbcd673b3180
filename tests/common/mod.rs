#![allow(dead_code)]

//! Scripted in-memory stand-in for the device-control collaborator.
//!
//! Activity is modeled as a per-device step counter: every state-changing
//! action bumps it, `screenshot`/`wait` only observe, and snapshots capture
//! and restore the counter. That is enough to exercise save/load semantics
//! and per-device serialization without a real emulator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use droidmux::action::Action;
use droidmux::device::{
    DeviceBinding, DeviceControl, DeviceError, Observation, Orientation, ScreenSize, UiElement,
};

#[derive(Default)]
struct DeviceState {
    steps: u64,
    in_flight: usize,
    max_in_flight: usize,
}

pub struct FakeDevice {
    latency: Duration,
    states: Mutex<HashMap<DeviceBinding, DeviceState>>,
    snapshots: Mutex<HashMap<String, (DeviceBinding, u64)>>,
    snapshot_counter: AtomicUsize,
    unreachable: Mutex<Vec<DeviceBinding>>,
    fail_execution: AtomicBool,
    calls: Mutex<Vec<(DeviceBinding, Action)>>,
    torn_down: Mutex<Vec<DeviceBinding>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            states: Mutex::new(HashMap::new()),
            snapshots: Mutex::new(HashMap::new()),
            snapshot_counter: AtomicUsize::new(0),
            unreachable: Mutex::new(Vec::new()),
            fail_execution: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            torn_down: Mutex::new(Vec::new()),
        }
    }

    pub fn set_unreachable(&self, device: &DeviceBinding) {
        self.unreachable.lock().unwrap().push(device.clone());
    }

    pub fn set_fail_execution(&self, fail: bool) {
        self.fail_execution.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(DeviceBinding, Action)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn torn_down(&self) -> Vec<DeviceBinding> {
        self.torn_down.lock().unwrap().clone()
    }

    /// Highest number of concurrently in-flight `execute` calls seen on
    /// `device`.
    pub fn max_in_flight(&self, device: &DeviceBinding) -> usize {
        self.states
            .lock()
            .unwrap()
            .get(device)
            .map(|s| s.max_in_flight)
            .unwrap_or(0)
    }

    fn check_reachable(&self, device: &DeviceBinding) -> Result<(), DeviceError> {
        if self.unreachable.lock().unwrap().contains(device) {
            return Err(DeviceError::Unreachable(device.clone()));
        }
        Ok(())
    }

    fn observation(device: &DeviceBinding, steps: u64) -> Observation {
        Observation {
            pixels: Some("aVZCT1J3MEtHZ28=".to_string()),
            ui_elements: vec![UiElement {
                bounds: [0, 0, 1080, 1920],
                text: format!("screen {steps}"),
                resource_id: "android:id/content".to_string(),
                class_name: "android.widget.FrameLayout".to_string(),
            }],
            current_activity: Some(format!("{device}/activity-{steps}")),
            screen_size: ScreenSize {
                width: 1080,
                height: 1920,
            },
            orientation: Orientation::Portrait,
        }
    }
}

#[async_trait]
impl DeviceControl for FakeDevice {
    async fn execute(
        &self,
        device: &DeviceBinding,
        action: &Action,
    ) -> Result<Observation, DeviceError> {
        self.check_reachable(device)?;
        if self.fail_execution.load(Ordering::SeqCst) {
            return Err(DeviceError::Execution("scripted failure".to_string()));
        }

        {
            let mut states = self.states.lock().unwrap();
            let state = states.entry(device.clone()).or_default();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        tokio::time::sleep(self.latency).await;

        let steps = {
            let mut states = self.states.lock().unwrap();
            let state = states.entry(device.clone()).or_default();
            state.in_flight -= 1;
            // Screenshot and wait are read-only; everything else moves the
            // device to a new screen.
            if !matches!(action, Action::Screenshot | Action::Wait { .. }) {
                state.steps += 1;
            }
            state.steps
        };

        self.calls.lock().unwrap().push((device.clone(), action.clone()));
        Ok(Self::observation(device, steps))
    }

    async fn snapshot_save(&self, device: &DeviceBinding) -> Result<String, DeviceError> {
        self.check_reachable(device)?;
        let steps = self
            .states
            .lock()
            .unwrap()
            .get(device)
            .map(|s| s.steps)
            .unwrap_or(0);
        let n = self.snapshot_counter.fetch_add(1, Ordering::SeqCst);
        let snapshot = format!("snap-{n}");
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.clone(), (device.clone(), steps));
        Ok(snapshot)
    }

    async fn snapshot_restore(
        &self,
        device: &DeviceBinding,
        snapshot: &str,
    ) -> Result<(), DeviceError> {
        self.check_reachable(device)?;
        let (_, steps) = self
            .snapshots
            .lock()
            .unwrap()
            .get(snapshot)
            .cloned()
            .ok_or_else(|| DeviceError::Execution(format!("unknown snapshot `{snapshot}`")))?;
        self.states
            .lock()
            .unwrap()
            .entry(device.clone())
            .or_default()
            .steps = steps;
        Ok(())
    }

    async fn teardown(&self, device: &DeviceBinding) -> Result<(), DeviceError> {
        self.torn_down.lock().unwrap().push(device.clone());
        Ok(())
    }
}
