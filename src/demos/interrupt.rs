//! Cooperative interruption of a busy worker.
//!
//! The worker counts towards a limit and polls its cancellation token on every
//! step. The main thread cancels after a delay; the worker notices at its next
//! check and returns early. There is no way to stop a thread from outside, so
//! this is also how a forced stop is expressed.

use std::thread;
use std::time::Duration;

use log::info;
use serde::Serialize;

use super::{join_named, spawn_named};
use crate::cancel::CancellationToken;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterruptReport {
    pub limit: u64,
    /// Steps completed before the worker stopped
    pub counted: u64,
    /// Whether the worker stopped because of cancellation
    pub interrupted: bool,
}

/// Count to `limit`, spending `step` per iteration, and interrupt after `interrupt_after`
pub fn count_until_interrupted(limit: u64, step: Duration, interrupt_after: Duration) -> Result<InterruptReport> {
    let token = CancellationToken::new();
    let worker = {
        let token = token.clone();
        spawn_named("counter", move || count(&token, limit, step))?
    };

    thread::sleep(interrupt_after);
    token.cancel();

    let (counted, interrupted) = join_named(worker)?;
    info!("Counter stopped at {}/{} (interrupted: {})", counted, limit, interrupted);
    Ok(InterruptReport {
        limit,
        counted,
        interrupted,
    })
}

fn count(token: &CancellationToken, limit: u64, step: Duration) -> (u64, bool) {
    for i in 0..limit {
        if token.is_cancelled() {
            return (i, true);
        }
        if !step.is_zero() {
            thread::sleep(step);
        }
    }
    (limit, false)
}
