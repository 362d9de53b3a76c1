//! Thread lifecycle demonstrations
//!
//! Each demo spawns its own threads, drives them with artificial delays and
//! returns a serializable report of what it observed. Nothing here prints;
//! the binary decides how to show a report.

pub mod counter;
pub mod flag;
pub mod interrupt;
pub mod lifecycle;
pub mod once;
pub mod sleep;
pub mod wait_notify;

pub use counter::{CounterReport, CounterStrategy};
pub use flag::FlagReport;
pub use interrupt::InterruptReport;
pub use lifecycle::{CallReport, JoinReport, SpawnReport, ThreadFactory};
pub use once::{InitMode, OnceReport};
pub use sleep::{SleepOutcome, SleepReport};
pub use wait_notify::{ReadMode, WaitReport, WaitTiming};

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error::{LabError, Result};

/// Spawn a named OS thread
pub(crate) fn spawn_named<F, T>(name: &str, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    log::trace!("Spawning thread '{}'", name);
    Ok(thread::Builder::new().name(name.to_string()).spawn(f)?)
}

/// Join a thread, turning a panic into `ThreadPanicked`
pub(crate) fn join_named<T>(handle: JoinHandle<T>) -> Result<T> {
    let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
    handle.join().map_err(|_| LabError::ThreadPanicked(name))
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
