//! Concurrent increments with and without synchronization.
//!
//! Several threads increment a shared counter. The racy strategy splits the
//! increment into a separate load and store, so concurrent increments can
//! overwrite each other. The value stays a valid integer, only updates are
//! lost. The other strategies make the read-modify-write indivisible.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::thread;

use log::info;
use serde::Serialize;

use crate::error::{LabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterStrategy {
    /// Separate load and store: increments can be lost
    Racy,
    /// Exclusive lock around the increment
    Mutex,
    /// Write lock for increments, read lock for reads
    RwLock,
    /// Single atomic fetch-add
    Atomic,
}

impl std::fmt::Display for CounterStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CounterStrategy::Racy => "racy",
            CounterStrategy::Mutex => "mutex",
            CounterStrategy::RwLock => "rwlock",
            CounterStrategy::Atomic => "atomic",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for CounterStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "racy" => Ok(CounterStrategy::Racy),
            "mutex" => Ok(CounterStrategy::Mutex),
            "rwlock" => Ok(CounterStrategy::RwLock),
            "atomic" => Ok(CounterStrategy::Atomic),
            other => Err(format!("unknown counter strategy: {}", other)),
        }
    }
}

/// A counter shared between incrementing threads
pub trait Counter: Sync {
    fn increment(&self) -> Result<()>;
    fn get(&self) -> Result<u64>;
}

#[derive(Default)]
struct RacyCounter(AtomicU64);

impl Counter for RacyCounter {
    fn increment(&self) -> Result<()> {
        let current = self.0.load(Ordering::Relaxed);
        thread::yield_now();
        self.0.store(current + 1, Ordering::Relaxed);
        Ok(())
    }

    fn get(&self) -> Result<u64> {
        Ok(self.0.load(Ordering::Relaxed))
    }
}

#[derive(Default)]
struct MutexCounter(Mutex<u64>);

impl Counter for MutexCounter {
    fn increment(&self) -> Result<()> {
        *self.0.lock()? += 1;
        Ok(())
    }

    fn get(&self) -> Result<u64> {
        Ok(*self.0.lock()?)
    }
}

#[derive(Default)]
struct RwLockCounter(RwLock<u64>);

impl Counter for RwLockCounter {
    fn increment(&self) -> Result<()> {
        *self.0.write()? += 1;
        Ok(())
    }

    fn get(&self) -> Result<u64> {
        Ok(*self.0.read()?)
    }
}

#[derive(Default)]
struct AtomicCounter(AtomicU64);

impl Counter for AtomicCounter {
    fn increment(&self) -> Result<()> {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn get(&self) -> Result<u64> {
        Ok(self.0.load(Ordering::Relaxed))
    }
}

impl CounterStrategy {
    /// Build an empty counter using this strategy
    pub fn counter(&self) -> Box<dyn Counter> {
        match self {
            CounterStrategy::Racy => Box::<RacyCounter>::default(),
            CounterStrategy::Mutex => Box::<MutexCounter>::default(),
            CounterStrategy::RwLock => Box::<RwLockCounter>::default(),
            CounterStrategy::Atomic => Box::<AtomicCounter>::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterReport {
    pub strategy: CounterStrategy,
    pub expected: u64,
    pub actual: u64,
}

impl CounterReport {
    /// Increments that were overwritten by a concurrent increment
    pub fn lost(&self) -> u64 {
        self.expected.saturating_sub(self.actual)
    }
}

/// Run `threads` threads, each incrementing `increments` times
pub fn count(strategy: CounterStrategy, threads: usize, increments: u64) -> Result<CounterReport> {
    let counter = strategy.counter();
    let counter = counter.as_ref();

    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || -> Result<()> {
                    for _ in 0..increments {
                        counter.increment()?;
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| LabError::ThreadPanicked("incrementer".to_string()))??;
        }
        Ok(())
    })?;

    let report = CounterReport {
        strategy,
        expected: threads as u64 * increments,
        actual: counter.get()?,
    };
    info!("{} counter: {}/{}", strategy, report.actual, report.expected);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synchronized_strategies_are_exact() {
        for strategy in [CounterStrategy::Mutex, CounterStrategy::RwLock, CounterStrategy::Atomic] {
            let report = count(strategy, 4, 10_000).unwrap();
            assert_eq!(report.actual, 40_000, "strategy {}", strategy);
            assert_eq!(report.lost(), 0);
        }
    }

    #[test]
    fn test_racy_never_overcounts() {
        let report = count(CounterStrategy::Racy, 4, 10_000).unwrap();
        assert!(report.actual <= report.expected);
        assert!(report.actual >= 1);
    }

    #[test]
    fn test_single_thread_racy_is_exact() {
        let report = count(CounterStrategy::Racy, 1, 1_000).unwrap();
        assert_eq!(report.actual, 1_000);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Mutex".parse::<CounterStrategy>().unwrap(), CounterStrategy::Mutex);
        assert_eq!("rwlock".parse::<CounterStrategy>().unwrap(), CounterStrategy::RwLock);
        assert!("spinlock".parse::<CounterStrategy>().is_err());
    }

    #[test]
    fn test_lost_updates() {
        let report = CounterReport {
            strategy: CounterStrategy::Racy,
            expected: 100,
            actual: 93,
        };
        assert_eq!(report.lost(), 7);
    }
}
