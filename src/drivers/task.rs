//! Named worker-thread spawning.
//!
//! Long-lived workers get an explicit name (visible in `ps -L` and panic
//! messages) and an explicit stack size.  Spawn failure is returned to the
//! caller instead of panicking, so startup can abort with a diagnostic.

use std::thread::JoinHandle;

use crate::error::{Error, Result};

/// Spawn `f` on a dedicated, named thread.
pub fn spawn_worker<T, F>(name: &str, stack_kb: usize, f: F) -> Result<JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    log::info!("Spawning '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.to_owned())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|e| Error::Worker(format!("spawn '{name}': {e}")))
}
