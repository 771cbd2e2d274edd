// Copyright (c) 2024 Mike Tsao

use crate::machine::{InteractionControl, InteractionRegistry};
use crossbeam::channel::{unbounded, Receiver, Sender};
use rustc_hash::FxHashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A fake controller knob. Values are fed in through its
/// [TestControlHandle].
#[derive(Debug)]
pub struct TestInteractionControl {
    device: String,
    name: String,
    range: (i64, i64),
    receiver: Receiver<i64>,
    is_running: Arc<AtomicBool>,
    is_released: Arc<AtomicBool>,
}
impl TestInteractionControl {
    /// Returns the control and a handle that can drive and inspect it after
    /// the control has been handed away.
    pub fn new_with(device: &str, name: &str, range: (i64, i64)) -> (Self, TestControlHandle) {
        let (sender, receiver) = unbounded();
        let is_running = Arc::new(AtomicBool::default());
        let is_released = Arc::new(AtomicBool::default());
        (
            Self {
                device: device.to_string(),
                name: name.to_string(),
                range,
                receiver,
                is_running: Arc::clone(&is_running),
                is_released: Arc::clone(&is_released),
            },
            TestControlHandle {
                sender,
                is_running,
                is_released,
            },
        )
    }
}
impl InteractionControl for TestInteractionControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_name(&self) -> &str {
        &self.device
    }

    fn range(&self) -> (i64, i64) {
        self.range
    }

    fn start_device(&mut self) {
        self.is_running.store(true, Ordering::Relaxed);
    }

    fn stop_device(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
    }

    fn subscribe(&mut self) -> Receiver<i64> {
        self.receiver.clone()
    }
}
impl Drop for TestInteractionControl {
    fn drop(&mut self) {
        self.is_released.store(true, Ordering::Relaxed);
    }
}

/// Drives a [TestInteractionControl] from the outside.
#[derive(Debug, Clone)]
pub struct TestControlHandle {
    sender: Sender<i64>,
    is_running: Arc<AtomicBool>,
    is_released: Arc<AtomicBool>,
}
impl TestControlHandle {
    /// Reports a raw value, as if the knob moved.
    pub fn send(&self, value: i64) {
        let _ = self.sender.send(value);
    }

    /// Whether the device has been started and not stopped since.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Whether the control has been dropped.
    pub fn is_released(&self) -> bool {
        self.is_released.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct RegisteredControl {
    range: (i64, i64),
    receiver: Receiver<i64>,
    is_running: Arc<AtomicBool>,
}

/// An [InteractionRegistry] of fake controls. Each lookup hands out a fresh
/// control wired to the same handle as the one first registered.
#[derive(Debug, Default)]
pub struct TestInteractionRegistry {
    controls: FxHashMap<(String, String), RegisteredControl>,
}
impl TestInteractionRegistry {
    /// Registers a control and returns one instance of it.
    pub fn add_control(
        &mut self,
        device: &str,
        name: &str,
        range: (i64, i64),
    ) -> (Box<dyn InteractionControl>, TestControlHandle) {
        let (control, handle) = TestInteractionControl::new_with(device, name, range);
        self.controls.insert(
            (device.to_string(), name.to_string()),
            RegisteredControl {
                range,
                receiver: control.receiver.clone(),
                is_running: Arc::clone(&control.is_running),
            },
        );
        (Box::new(control), handle)
    }
}
impl InteractionRegistry for TestInteractionRegistry {
    fn find_control(
        &mut self,
        device: &str,
        control: &str,
    ) -> Option<Box<dyn InteractionControl>> {
        let registered = self
            .controls
            .get(&(device.to_string(), control.to_string()))?;
        Some(Box::new(TestInteractionControl {
            device: device.to_string(),
            name: control.to_string(),
            range: registered.range,
            receiver: registered.receiver.clone(),
            is_running: Arc::clone(&registered.is_running),
            is_released: Default::default(),
        }))
    }
}
