//! Linux GPIO character-device backend.
//!
//! Chips are opened from `/dev/<id>` (or the literal path when the id
//! contains a `/`), lines are requested through the kernel's line-handle
//! ioctl so the kernel enforces exclusive ownership.

use std::path::PathBuf;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};

use crate::app::ports::GpioPort;
use crate::error::GpioError;

/// [`GpioPort`] over `/dev/gpiochip*`.
#[derive(Debug, Default)]
pub struct CdevGpio;

impl CdevGpio {
    pub fn new() -> Self {
        Self
    }
}

/// Device path for a chip identifier.
pub fn chip_path(id: &str) -> PathBuf {
    if id.contains('/') {
        PathBuf::from(id)
    } else {
        PathBuf::from("/dev").join(id)
    }
}

impl GpioPort for CdevGpio {
    type Chip = Chip;
    type Line = CdevLine;

    fn open_chip(&mut self, id: &str) -> Result<Chip, GpioError> {
        let path = chip_path(id);
        Chip::new(&path)
            .map_err(|e| GpioError::ChipUnavailable(format!("{}: {e}", path.display())))
    }

    fn request_line(
        &mut self,
        chip: &mut Chip,
        line: u32,
        high: bool,
        consumer: &str,
    ) -> Result<CdevLine, GpioError> {
        let handle = chip
            .get_line(line)
            .and_then(|l| l.request(LineRequestFlags::OUTPUT, u8::from(high), consumer))
            .map_err(|e| GpioError::LineUnavailable(format!("line {line}: {e}")))?;
        Ok(CdevLine { handle })
    }
}

/// A requested output line.  The kernel releases it when dropped.
pub struct CdevLine {
    handle: LineHandle,
}

/// Write failure reported by the kernel.
#[derive(Debug)]
pub struct CdevLineError(gpio_cdev::errors::Error);

impl embedded_hal::digital::Error for CdevLineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for CdevLine {
    type Error = CdevLineError;
}

impl OutputPin for CdevLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.handle.set_value(0).map_err(CdevLineError)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.handle.set_value(1).map_err(CdevLineError)
    }
}
