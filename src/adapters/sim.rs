//! In-memory GPIO bench.
//!
//! Implements [`GpioPort`] without touching hardware: chips and lines
//! live in a shared [`SimBench`] that records every request and write.
//! Used by `--simulate` and by the test suite, which can also knock out
//! chips, pre-claim lines, and make writes fail.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use log::info;

use crate::app::ports::GpioPort;
use crate::config::GpioRef;
use crate::error::{GpioError, Level};

/// Lines exposed by every simulated chip.
pub const SIM_LINES_PER_CHIP: u32 = 64;

/// One attempted line write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWrite {
    pub gpio: GpioRef,
    /// Electrical level requested.
    pub high: bool,
    /// False when the write was made to fail.
    pub applied: bool,
}

#[derive(Default)]
struct BenchState {
    missing_chips: BTreeSet<String>,
    chip_opens: BTreeMap<String, usize>,
    claimed: BTreeMap<GpioRef, String>,
    requests: Vec<GpioRef>,
    levels: BTreeMap<GpioRef, bool>,
    failures: BTreeMap<GpioRef, usize>,
    writes: Vec<LineWrite>,
}

/// Shared state of the simulated rig.  Cheap to clone.
#[derive(Clone, Default)]
pub struct SimBench {
    state: Arc<Mutex<BenchState>>,
}

impl SimBench {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BenchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A [`GpioPort`] backed by this bench.
    pub fn gpio(&self) -> SimGpio {
        SimGpio {
            bench: self.clone(),
        }
    }

    /// Make `chip` fail to open.
    pub fn remove_chip(&self, chip: &str) {
        self.lock().missing_chips.insert(chip.to_owned());
    }

    /// Mark `gpio` as held by another consumer.
    pub fn claim(&self, gpio: &GpioRef, consumer: &str) {
        self.lock().claimed.insert(gpio.clone(), consumer.to_owned());
    }

    /// Make the next `times` writes to `gpio` fail.  `usize::MAX` fails forever.
    pub fn fail_writes(&self, gpio: &GpioRef, times: usize) {
        self.lock().failures.insert(gpio.clone(), times);
    }

    /// Current electrical level of a requested line.
    pub fn level(&self, gpio: &GpioRef) -> Option<bool> {
        self.lock().levels.get(gpio).copied()
    }

    /// Current logical level of a requested line.
    pub fn logical(&self, gpio: &GpioRef, active_low: bool) -> Option<Level> {
        self.level(gpio).map(|high| {
            if high == active_low {
                Level::Inactive
            } else {
                Level::Active
            }
        })
    }

    /// Electrical level of every requested line.
    pub fn levels(&self) -> BTreeMap<GpioRef, bool> {
        self.lock().levels.clone()
    }

    /// Consumer label holding `gpio`.
    pub fn consumer(&self, gpio: &GpioRef) -> Option<String> {
        self.lock().claimed.get(gpio).cloned()
    }

    /// How many times `chip` was opened.
    pub fn chip_opens(&self, chip: &str) -> usize {
        self.lock().chip_opens.get(chip).copied().unwrap_or(0)
    }

    /// Lines successfully requested, in request order.
    pub fn requests(&self) -> Vec<GpioRef> {
        self.lock().requests.clone()
    }

    /// Every write attempt since the last [`clear_writes`](Self::clear_writes).
    pub fn writes(&self) -> Vec<LineWrite> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }
}

/// [`GpioPort`] over a [`SimBench`].
pub struct SimGpio {
    bench: SimBench,
}

/// An "opened" simulated chip.
#[derive(Debug)]
pub struct SimChip {
    id: String,
}

/// A requested simulated line.  Dropping it releases the claim.
pub struct SimLine {
    bench: SimBench,
    gpio: GpioRef,
}

impl GpioPort for SimGpio {
    type Chip = SimChip;
    type Line = SimLine;

    fn open_chip(&mut self, id: &str) -> Result<SimChip, GpioError> {
        let mut state = self.bench.lock();
        if state.missing_chips.contains(id) {
            return Err(GpioError::ChipUnavailable(format!("{id}: no such device")));
        }
        *state.chip_opens.entry(id.to_owned()).or_default() += 1;
        Ok(SimChip { id: id.to_owned() })
    }

    fn request_line(
        &mut self,
        chip: &mut SimChip,
        line: u32,
        high: bool,
        consumer: &str,
    ) -> Result<SimLine, GpioError> {
        let gpio = GpioRef::new(chip.id.clone(), line);
        let mut state = self.bench.lock();
        if line >= SIM_LINES_PER_CHIP {
            return Err(GpioError::LineUnavailable(format!(
                "{gpio}: offset out of range"
            )));
        }
        if let Some(owner) = state.claimed.get(&gpio) {
            return Err(GpioError::LineUnavailable(format!(
                "{gpio}: busy (held by {owner})"
            )));
        }
        state.claimed.insert(gpio.clone(), consumer.to_owned());
        state.requests.push(gpio.clone());
        state.levels.insert(gpio.clone(), high);
        drop(state);

        Ok(SimLine {
            bench: self.bench.clone(),
            gpio,
        })
    }
}

impl SimLine {
    fn drive(&mut self, high: bool) -> Result<(), SimLineError> {
        let mut state = self.bench.lock();
        let fail = match state.failures.get_mut(&self.gpio) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                true
            }
            _ => false,
        };
        state.writes.push(LineWrite {
            gpio: self.gpio.clone(),
            high,
            applied: !fail,
        });
        if fail {
            return Err(SimLineError {
                gpio: self.gpio.clone(),
            });
        }
        state.levels.insert(self.gpio.clone(), high);
        info!("sim: {} -> {}", self.gpio, if high { "high" } else { "low" });
        Ok(())
    }
}

impl Drop for SimLine {
    fn drop(&mut self) {
        let mut state = self.bench.lock();
        state.claimed.remove(&self.gpio);
        state.levels.remove(&self.gpio);
    }
}

/// Injected write failure.
#[derive(Debug)]
pub struct SimLineError {
    pub gpio: GpioRef,
}

impl embedded_hal::digital::Error for SimLineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for SimLine {
    type Error = SimLineError;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}
