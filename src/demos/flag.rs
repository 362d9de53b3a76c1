//! Stopping a spinning worker through a shared atomic flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use super::{join_named, spawn_named};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagReport {
    /// Loop iterations the worker ran before it saw the flag cleared
    pub spins: u64,
}

/// Let a worker spin on a `running` flag for `run_for`, then clear the flag
pub fn spin_until_stopped(run_for: Duration) -> Result<FlagReport> {
    let running = Arc::new(AtomicBool::new(true));

    let worker = {
        let running = Arc::clone(&running);
        spawn_named("spinner", move || {
            let mut spins = 0u64;
            while running.load(Ordering::Acquire) {
                spins += 1;
                std::hint::spin_loop();
            }
            spins
        })?
    };

    thread::sleep(run_for);
    running.store(false, Ordering::Release);

    let spins = join_named(worker)?;
    log::info!("Spinner stopped after {} spins", spins);
    Ok(FlagReport { spins })
}
