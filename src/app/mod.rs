//! Activation core: request arbitration and sequential execution.
//!
//! ```text
//!  Dispatcher ──▶ ActivationQueue ──▶ ActivationSerializer ──▶ LineRegistry
//!  (HTTP side)    (one slot)          (one worker)             (GPIO lines)
//! ```

pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod queue;
pub mod serializer;
