//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing activation events through the
//! `log` facade, one structured line per event.

use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// Render `event` as a single log line.
pub fn render(event: &AppEvent) -> String {
    match event {
        AppEvent::ActivationStarted { plant, hold } => {
            format!("ACTIVATE | plant={plant} | hold={:.1}s", hold.as_secs_f32())
        }
        AppEvent::Energized { plant } => format!("ENERGIZED | plant={plant} | pump=on valve=on"),
        AppEvent::ActivationCompleted { plant, elapsed } => {
            format!("COMPLETE | plant={plant} | elapsed={:.1}s", elapsed.as_secs_f32())
        }
        AppEvent::ActivationInterrupted { plant, elapsed } => {
            format!("INTERRUPT | plant={plant} | elapsed={:.1}s", elapsed.as_secs_f32())
        }
        AppEvent::ActivationFailed { plant, error } => {
            format!("FAILED | plant={plant} | error={error}")
        }
        AppEvent::ReleaseFailed { plant, error } => {
            format!("RELEASE | plant={plant} | error={error}")
        }
        AppEvent::WorkerStopped => "STOP | all lines inactive".to_owned(),
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::ActivationFailed { .. } | AppEvent::ReleaseFailed { .. } => {
                error!("{}", render(event));
            }
            _ => info!("{}", render(event)),
        }
    }
}
