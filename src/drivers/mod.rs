//! Relay line ownership and worker threads.

pub mod registry;
pub mod task;
