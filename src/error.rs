//! Unified error types for the irrigation controller.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! entry point can report startup failures uniformly.  Hardware backends
//! speak [`GpioError`]; the line registry wraps it with the logical entity
//! (pump or plant) and physical address that failed.

use core::fmt;

use crate::config::{ConfigError, GpioRef};

// ---------------------------------------------------------------------------
// Logical line level
// ---------------------------------------------------------------------------

/// Relay drive level, independent of electrical polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Relay energized (pump running / valve open).
    Active,
    /// Relay released.
    Inactive,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`GpioPort`](crate::app::ports::GpioPort) backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioError {
    /// The chip device could not be opened.
    ChipUnavailable(String),
    /// The line does not exist or is held by another consumer.
    LineUnavailable(String),
    /// Any other I/O failure from the backend.
    Io(String),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChipUnavailable(msg) => write!(f, "chip unavailable: {msg}"),
            Self::LineUnavailable(msg) => write!(f, "line unavailable: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for GpioError {}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// Configuration is unreadable, malformed, or invalid.
    Config(ConfigError),
    /// A configured chip could not be opened.
    ChipOpen { chip: String, source: GpioError },
    /// A configured line could not be requested as output.
    LineRequest {
        entity: String,
        gpio: GpioRef,
        source: GpioError,
    },
    /// Driving a requested line failed at runtime.
    LineWrite {
        entity: String,
        gpio: GpioRef,
        level: Level,
        detail: String,
    },
    /// A plant index outside the configured set.
    UnknownPlant(usize),
    /// The activation worker could not be started.
    Worker(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::ChipOpen { chip, source } => write!(f, "open chip {chip}: {source}"),
            Self::LineRequest {
                entity,
                gpio,
                source,
            } => write!(f, "request line for {entity} ({gpio}): {source}"),
            Self::LineWrite {
                entity,
                gpio,
                level,
                detail,
            } => write!(f, "drive {entity} ({gpio}) {level}: {detail}"),
            Self::UnknownPlant(index) => write!(f, "no plant with index {index}"),
            Self::Worker(msg) => write!(f, "worker: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::ChipOpen { source, .. } | Self::LineRequest { source, .. } => Some(source),
            Self::LineWrite { .. } | Self::UnknownPlant(_) | Self::Worker(_) => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
