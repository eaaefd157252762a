//! Activation serializer and executor.
//!
//! The single worker that turns queued requests into relay action, one
//! at a time:
//!
//! ```text
//!  Idle ──dequeue──▶ Energizing ──▶ Holding ──▶ De-energizing ──▶ Idle
//!                    pump, valve    hold time    valve, pump
//! ```
//!
//! De-energizing always runs, even when energizing failed part-way.  It
//! is tied to an [`ActiveZone`] guard, so dropping the in-flight future
//! (or a panic between the two phases) still releases both lines.
//!
//! Runtime write failures are logged and reported through the
//! [`EventSink`]; they never stop the worker.  The HTTP caller was answered
//! at enqueue time and gets no further notification.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, GpioPort};
use crate::app::queue::{ActivationQueue, ActivationRequest};
use crate::drivers::registry::{Entity, LineRegistry, PlantId};
use crate::drivers::task::spawn_worker;
use crate::error::Result;

/// Worker thread stack size.
pub const WORKER_STACK_KB: usize = 64;

/// Process-shutdown signal observed by the worker.
pub type Shutdown = Signal<CriticalSectionRawMutex, ()>;

enum Hold {
    Elapsed,
    Interrupted,
}

// ── Guaranteed release ────────────────────────────────────────

/// Pump + valve of one plant, energized or possibly so.
///
/// Released explicitly via [`release`](Self::release); otherwise `Drop`
/// releases it.
struct ActiveZone<'r, G: GpioPort> {
    registry: &'r mut LineRegistry<G>,
    plant: PlantId,
    armed: bool,
}

impl<'r, G: GpioPort> ActiveZone<'r, G> {
    fn engage(registry: &'r mut LineRegistry<G>, plant: PlantId) -> Self {
        Self {
            registry,
            plant,
            armed: true,
        }
    }

    /// Pump first: the valve must not open before supply is live.
    fn energize(&mut self) -> Result<()> {
        self.registry.energize(Entity::Pump)?;
        self.registry.energize(Entity::Valve(self.plant))
    }

    fn release(mut self) -> Result<()> {
        self.armed = false;
        self.registry.release(self.plant)
    }
}

impl<G: GpioPort> Drop for ActiveZone<'_, G> {
    fn drop(&mut self) {
        if self.armed {
            warn!("serializer: {} released by guard", self.plant);
            // Failures are already logged by the registry.
            let _ = self.registry.release(self.plant);
        }
    }
}

// ── Serializer ────────────────────────────────────────────────

/// Owns the line registry and executes activations sequentially.
pub struct ActivationSerializer<G: GpioPort, E: EventSink> {
    registry: LineRegistry<G>,
    queue: Arc<ActivationQueue>,
    shutdown: Arc<Shutdown>,
    events: E,
}

impl<G: GpioPort, E: EventSink> ActivationSerializer<G, E> {
    pub fn new(
        registry: LineRegistry<G>,
        queue: Arc<ActivationQueue>,
        shutdown: Arc<Shutdown>,
        events: E,
    ) -> Self {
        Self {
            registry,
            queue,
            shutdown,
            events,
        }
    }

    /// Serve requests until shutdown is signalled, then drive every line
    /// inactive and hand the registry back.
    pub async fn run(mut self) -> LineRegistry<G> {
        let queue = Arc::clone(&self.queue);
        let shutdown = Arc::clone(&self.shutdown);
        info!("serializer: idle, waiting for requests");

        loop {
            let next = future::or(async { Some(queue.dequeue().await) }, async {
                shutdown.wait().await;
                None
            })
            .await;

            let Some(claim) = next else { break };
            let interrupted = self.execute(&claim, &shutdown).await;
            drop(claim);
            if interrupted {
                break;
            }
        }

        if let Err(e) = self.registry.all_off() {
            error!("serializer: shutdown all-off incomplete: {e}");
        }
        self.events.emit(&AppEvent::WorkerStopped);
        info!("serializer: stopped");
        self.registry
    }

    /// Run one activation to completion.  Returns true when shutdown cut
    /// the hold short.
    async fn execute(&mut self, request: &ActivationRequest, shutdown: &Shutdown) -> bool {
        let started = Instant::now();
        let plant = request.name.clone();
        self.events.emit(&AppEvent::ActivationStarted {
            plant: plant.clone(),
            hold: request.hold,
        });

        let mut zone = ActiveZone::engage(&mut self.registry, request.plant);

        let held = match zone.energize() {
            Ok(()) => {
                self.events.emit(&AppEvent::Energized {
                    plant: plant.clone(),
                });
                Some(hold(request.hold, shutdown).await)
            }
            Err(e) => {
                error!("serializer: energize '{plant}' failed: {e}");
                self.events.emit(&AppEvent::ActivationFailed {
                    plant: plant.clone(),
                    error: e.to_string(),
                });
                None
            }
        };

        if let Err(e) = zone.release() {
            self.events.emit(&AppEvent::ReleaseFailed {
                plant: plant.clone(),
                error: e.to_string(),
            });
        }

        let elapsed = started.elapsed();
        match held {
            Some(Hold::Elapsed) => {
                self.events
                    .emit(&AppEvent::ActivationCompleted { plant, elapsed });
                false
            }
            Some(Hold::Interrupted) => {
                self.events
                    .emit(&AppEvent::ActivationInterrupted { plant, elapsed });
                true
            }
            None => false,
        }
    }
}

impl<G, E> ActivationSerializer<G, E>
where
    G: GpioPort + 'static,
    G::Chip: Send,
    G::Line: Send,
    E: EventSink + Send + 'static,
{
    /// Run the serializer on its own thread.
    pub fn spawn(self) -> Result<JoinHandle<LineRegistry<G>>> {
        spawn_worker("activation", WORKER_STACK_KB, move || {
            future::block_on(self.run())
        })
    }
}

async fn hold(duration: Duration, shutdown: &Shutdown) -> Hold {
    future::or(
        async {
            async_io_mini::Timer::after(duration).await;
            Hold::Elapsed
        },
        async {
            shutdown.wait().await;
            Hold::Interrupted
        },
    )
    .await
}
