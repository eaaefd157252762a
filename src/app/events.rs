//! Structured application events emitted by the activation worker.

use std::time::Duration;

/// Everything observable about an activation's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A request left the queue; energizing begins.
    ActivationStarted { plant: String, hold: Duration },
    /// Pump and valve are both energized; the hold interval starts.
    Energized { plant: String },
    /// Hold elapsed and both lines were released.
    ActivationCompleted { plant: String, elapsed: Duration },
    /// Shutdown cut the hold short; lines were released.
    ActivationInterrupted { plant: String, elapsed: Duration },
    /// Energizing failed; the hold was skipped.
    ActivationFailed { plant: String, error: String },
    /// At least one line could not be de-energized.
    ReleaseFailed { plant: String, error: String },
    /// The worker stopped and drove every line inactive.
    WorkerStopped,
}
