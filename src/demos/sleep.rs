//! Interrupting a sleeping worker that owns resources.
//!
//! The worker creates scratch files, then sleeps on its cancellation token.
//! If the sleep completes it processes the files and leaves them in place.
//! If it is cancelled it deletes what it created and returns: the cleanup is
//! the worker's job, done at the point where it observes cancellation.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use super::{elapsed_ms, join_named, spawn_named};
use crate::cancel::CancellationToken;
use crate::error::{LabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SleepReport {
    pub outcome: SleepOutcome,
    pub created: usize,
    pub processed: usize,
    pub removed: usize,
    pub elapsed_ms: u64,
}

/// Run the worker in `dir`, cancelling it after `cancel_after` if given
pub fn sleep_with_cleanup(
    dir: &Path,
    files: usize,
    sleep_for: Duration,
    cancel_after: Option<Duration>,
) -> Result<SleepReport> {
    fs::create_dir_all(dir)?;
    let token = CancellationToken::new();
    let start = Instant::now();

    let worker = {
        let token = token.clone();
        let dir = dir.to_path_buf();
        spawn_named("sleeper", move || work(&dir, files, sleep_for, &token))?
    };

    if let Some(delay) = cancel_after {
        thread::sleep(delay);
        token.cancel();
    }

    let (outcome, created, processed, removed) = join_named(worker)??;
    info!("Sleeper finished: {:?}", outcome);
    Ok(SleepReport {
        outcome,
        created,
        processed,
        removed,
        elapsed_ms: elapsed_ms(start),
    })
}

fn scratch_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("scratch-{}.tmp", index))
}

fn work(
    dir: &Path,
    files: usize,
    sleep_for: Duration,
    token: &CancellationToken,
) -> Result<(SleepOutcome, usize, usize, usize)> {
    let mut created = Vec::with_capacity(files);
    for i in 0..files {
        let path = scratch_path(dir, i);
        fs::write(&path, format!("scratch {}\n", i))?;
        created.push(path);
    }
    debug!("Created {} scratch file(s) in {}", created.len(), dir.display());

    match token.sleep(sleep_for) {
        Ok(()) => {
            for path in &created {
                let mut content = fs::read_to_string(path)?;
                content.push_str("processed\n");
                fs::write(path, content)?;
            }
            Ok((SleepOutcome::Completed, created.len(), created.len(), 0))
        }
        Err(LabError::Cancelled) => {
            let mut removed = 0;
            for path in &created {
                fs::remove_file(path)?;
                removed += 1;
            }
            debug!("Cancelled, removed {} scratch file(s)", removed);
            Ok((SleepOutcome::Cancelled, created.len(), 0, removed))
        }
        Err(e) => Err(e),
    }
}
