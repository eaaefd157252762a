//! Irrigation relay controller library.
//!
//! Exposes the activation core (queue, serializer, dispatcher, line
//! registry) and its adapters for integration testing.  The Linux GPIO
//! backend is guarded by the `cdev` feature; everything else runs on any
//! host against the in-memory bench.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod drivers;

mod error;

pub mod adapters;

pub use error::{Error, GpioError, Level, Result};
