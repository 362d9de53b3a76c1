//! Lazily created shared instance under contention.
//!
//! With `CheckThenSet`, every thread that sees the slot empty builds its own
//! instance, stores it over whatever is there and keeps using it: callers end
//! up holding different instances and the last store wins the slot.
//! `GetOrInit` runs the initializer exactly once and makes the other threads
//! wait for it.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::error::{LabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitMode {
    /// Check for an instance, build one if missing, then store it
    CheckThenSet,
    /// Single guarded initialization
    GetOrInit,
}

#[derive(Debug)]
struct Instance {
    serial: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnceReport {
    pub mode: InitMode,
    pub threads: usize,
    /// Times the initializer ran
    pub initializations: u64,
    /// Distinct instances handed out to callers
    pub distinct_instances: usize,
}

/// Have `threads` threads fetch the shared instance at the same time
///
/// `init_delay` widens the window between the emptiness check and the store.
pub fn race_to_init(mode: InitMode, threads: usize, init_delay: Duration) -> Result<OnceReport> {
    let guarded: OnceLock<Instance> = OnceLock::new();
    // Serial of the stored instance, 0 while empty
    let unguarded = AtomicU64::new(0);
    let initializations = AtomicU64::new(0);

    let build = || {
        let serial = initializations.fetch_add(1, Ordering::SeqCst) + 1;
        thread::sleep(init_delay);
        Instance { serial }
    };

    let serials = thread::scope(|scope| -> Result<Vec<u64>> {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| match mode {
                    InitMode::CheckThenSet => match unguarded.load(Ordering::SeqCst) {
                        0 => {
                            let instance = build();
                            unguarded.store(instance.serial, Ordering::SeqCst);
                            instance.serial
                        }
                        stored => stored,
                    },
                    InitMode::GetOrInit => guarded.get_or_init(build).serial,
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| LabError::ThreadPanicked("initializer".to_string())))
            .collect()
    })?;

    let distinct: HashSet<u64> = serials.into_iter().collect();
    Ok(OnceReport {
        mode,
        threads,
        initializations: initializations.load(Ordering::SeqCst),
        distinct_instances: distinct.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_init_runs_once() {
        let report = race_to_init(InitMode::GetOrInit, 8, Duration::from_millis(20)).unwrap();
        assert_eq!(report.initializations, 1);
        assert_eq!(report.distinct_instances, 1);
    }

    #[test]
    fn test_check_then_set_bounds() {
        let report = race_to_init(InitMode::CheckThenSet, 8, Duration::from_millis(20)).unwrap();
        assert!(report.initializations >= 1);
        assert!(report.initializations <= 8);
        assert_eq!(report.distinct_instances as u64, report.initializations);
    }

    #[test]
    fn test_check_then_set_hands_out_several_instances() {
        let report = race_to_init(InitMode::CheckThenSet, 8, Duration::from_millis(200)).unwrap();
        assert!(report.distinct_instances > 1);
        assert_eq!(report.distinct_instances as u64, report.initializations);
    }

    #[test]
    fn test_single_thread_initializes_once() {
        let report = race_to_init(InitMode::CheckThenSet, 1, Duration::ZERO).unwrap();
        assert_eq!(report.initializations, 1);
    }
}
