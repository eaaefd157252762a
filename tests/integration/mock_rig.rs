//! Simulated rig for integration tests.
//!
//! Wires the real queue, serializer, and dispatcher to a [`SimBench`] and
//! a recording event sink, so tests can assert on line history and event
//! order without touching `/dev/gpiochip*`.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use irrigator::Level;
use irrigator::adapters::sim::{SimBench, SimGpio};
use irrigator::app::dispatcher::Dispatcher;
use irrigator::app::events::AppEvent;
use irrigator::app::ports::EventSink;
use irrigator::app::queue::ActivationQueue;
use irrigator::app::serializer::{ActivationSerializer, Shutdown};
use irrigator::config::{GpioRef, IrrigationConfig};
use irrigator::drivers::registry::LineRegistry;

pub const RIG: &str = r#"{
    "pump": {"chip": "gpiochip0", "gpio": 4},
    "plants": [
        {"name": "tomatoes", "path": "/tomatoes", "duration": 1, "chip": "gpiochip0", "gpio": 17},
        {"name": "basil", "path": "/basil", "duration": 1, "chip": "gpiochip0", "gpio": 27}
    ]
}"#;

pub fn pump() -> GpioRef {
    GpioRef::new("gpiochip0", 4)
}

pub fn tomatoes() -> GpioRef {
    GpioRef::new("gpiochip0", 17)
}

pub fn basil() -> GpioRef {
    GpioRef::new("gpiochip0", 27)
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<AppEvent>>>,
}

impl RecordingSink {
    pub fn snapshot(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── MockRig ───────────────────────────────────────────────────

pub struct MockRig {
    pub bench: SimBench,
    pub queue: Arc<ActivationQueue>,
    pub shutdown: Arc<Shutdown>,
    pub sink: RecordingSink,
    pub dispatcher: Arc<Dispatcher>,
    worker: Option<JoinHandle<LineRegistry<SimGpio>>>,
}

#[allow(dead_code)]
impl MockRig {
    pub fn start() -> Self {
        Self::start_with(SimBench::new())
    }

    /// Start on a bench the caller may have pre-configured.
    pub fn start_with(bench: SimBench) -> Self {
        let config = IrrigationConfig::from_json(RIG).unwrap();
        let registry = LineRegistry::open(&mut bench.gpio(), &config).unwrap();
        let queue = Arc::new(ActivationQueue::new());
        let shutdown = Arc::new(Shutdown::new());
        let sink = RecordingSink::default();
        let worker = ActivationSerializer::new(
            registry,
            Arc::clone(&queue),
            Arc::clone(&shutdown),
            sink.clone(),
        )
        .spawn()
        .unwrap();
        let dispatcher = Arc::new(Dispatcher::new(&config, Arc::clone(&queue)));

        Self {
            bench,
            queue,
            shutdown,
            sink,
            dispatcher,
            worker: Some(worker),
        }
    }

    pub fn logical(&self, gpio: &GpioRef) -> Option<Level> {
        self.bench.logical(gpio, true)
    }

    pub fn is_active(&self, gpio: &GpioRef) -> bool {
        self.logical(gpio) == Some(Level::Active)
    }

    pub fn all_inactive(&self) -> bool {
        [pump(), tomatoes(), basil()]
            .iter()
            .all(|g| self.logical(g) == Some(Level::Inactive))
    }

    /// Wait until the worker has released the slot.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        wait_until(timeout, || !self.queue.is_busy())
    }

    /// Signal shutdown and join the worker.
    pub fn stop(mut self) -> LineRegistry<SimGpio> {
        self.shutdown.signal(());
        self.worker.take().unwrap().join().unwrap()
    }
}

impl Drop for MockRig {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.shutdown.signal(());
            let _ = worker.join();
        }
    }
}

/// Poll `cond` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
