//! Port traits — the hexagonal boundary between activation logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ LineRegistry / ActivationSerializer (domain)
//! ```
//!
//! Driven adapters (GPIO backends, event sinks) implement these traits.
//! The domain consumes them via generics, so the activation core never
//! touches `/dev/gpiochip*` directly.

use embedded_hal::digital::OutputPin;

use crate::error::GpioError;

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Opens GPIO chips and requests output lines on them.
///
/// Only used during startup by [`LineRegistry`](crate::drivers::registry::LineRegistry).
/// The handles it returns are owned by the registry for the lifetime of
/// the process; runtime writes go through [`OutputPin`].
pub trait GpioPort {
    /// An opened chip (controller).
    type Chip;
    /// An exclusively requested output line.
    type Line: OutputPin;

    /// Open the chip named `id` (`gpiochip0`, or a device path).
    fn open_chip(&mut self, id: &str) -> Result<Self::Chip, GpioError>;

    /// Request exclusive output control of `line` on `chip`, driven to
    /// `high` immediately.  Levels here are electrical, not logical.
    fn request_line(
        &mut self,
        chip: &mut Self::Chip,
        line: u32,
        high: bool,
        consumer: &str,
    ) -> Result<Self::Line, GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The serializer emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
