//! Spawning, naming and joining threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::info;
use serde::Serialize;

use super::{elapsed_ms, join_named, spawn_named};
use crate::error::Result;

/// Order in which the worker and the main thread finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub events: Vec<String>,
    pub elapsed_ms: u64,
}

/// Start a worker that sleeps for `delay`, wait for it, then finish
///
/// Because main joins before recording its own event, "worker" always
/// precedes "main end".
pub fn join_worker(delay: Duration) -> Result<JoinReport> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();

    let worker = {
        let events = Arc::clone(&events);
        spawn_named("t1", move || -> Result<()> {
            thread::sleep(delay);
            events.lock()?.push("worker".to_string());
            Ok(())
        })?
    };

    join_named(worker)??;
    events.lock()?.push("main end".to_string());

    let events = events.lock()?.clone();
    Ok(JoinReport {
        events,
        elapsed_ms: elapsed_ms(start),
    })
}

/// Creates threads named `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct ThreadFactory {
    prefix: String,
    count: AtomicUsize,
}

impl ThreadFactory {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            count: AtomicUsize::new(0),
        }
    }

    /// Number of threads created so far
    pub fn created(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn spawn<F, T>(&self, f: F) -> Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        spawn_named(&format!("{}-{}", self.prefix, n), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnReport {
    /// Names each thread reported for itself, in spawn order
    pub names: Vec<String>,
}

/// Spawn `count` threads from a factory and collect their self-reported names
pub fn spawn_from_factory(prefix: &str, count: usize) -> Result<SpawnReport> {
    let factory = ThreadFactory::new(prefix);
    let handles = (0..count)
        .map(|_| factory.spawn(|| thread::current().name().unwrap_or_default().to_string()))
        .collect::<Result<Vec<_>>>()?;

    let names = handles.into_iter().map(join_named).collect::<Result<Vec<_>>>()?;
    info!("Factory created {} thread(s)", factory.created());
    Ok(SpawnReport { names })
}

/// A value computed on another thread and collected through its join handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallReport {
    pub value: String,
    pub elapsed_ms: u64,
}

/// Compute `value` on a worker after `delay`; the caller blocks in join
pub fn call_with_result(delay: Duration, value: &str) -> Result<CallReport> {
    let start = Instant::now();
    let value = value.to_string();
    let worker = spawn_named("callable", move || {
        thread::sleep(delay);
        value
    })?;

    let value = join_named(worker)?;
    Ok(CallReport {
        value,
        elapsed_ms: elapsed_ms(start),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_orders_events() {
        let report = join_worker(Duration::from_millis(30)).unwrap();
        assert_eq!(report.events, vec!["worker".to_string(), "main end".to_string()]);
        assert!(report.elapsed_ms >= 30);
    }

    #[test]
    fn test_factory_names_threads_in_sequence() {
        let report = spawn_from_factory("Thread", 3).unwrap();
        assert_eq!(report.names, vec!["Thread-1", "Thread-2", "Thread-3"]);
    }

    #[test]
    fn test_factory_counts_created() {
        let factory = ThreadFactory::new("w");
        assert_eq!(factory.created(), 0);
        let handle = factory.spawn(|| 7).unwrap();
        assert_eq!(join_named(handle).unwrap(), 7);
        assert_eq!(factory.created(), 1);
    }

    #[test]
    fn test_call_returns_value_after_delay() {
        let report = call_with_result(Duration::from_millis(20), "Hello from callable").unwrap();
        assert_eq!(report.value, "Hello from callable");
        assert!(report.elapsed_ms >= 20);
    }
}
