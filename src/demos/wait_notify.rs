//! Producer/consumer pair contrasting a racy read with a rendezvous.
//!
//! The producer sleeps, then publishes. The consumer sleeps a shorter time,
//! then reads. In `Racy` mode it reads without waiting and observes nothing
//! when it runs first; in `Rendezvous` mode it waits on the `SignalBox` and
//! always observes the published value.

use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use super::{elapsed_ms, join_named, spawn_named};
use crate::cancel::CancellationToken;
use crate::error::{LabError, Result};
use crate::signal_box::SignalBox;

/// How the consumer reads the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Read immediately, without waiting for the producer
    Racy,
    /// Wait until the producer has published
    Rendezvous,
}

impl std::fmt::Display for ReadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadMode::Racy => write!(f, "racy"),
            ReadMode::Rendezvous => write!(f, "rendezvous"),
        }
    }
}

/// Artificial delays controlling who runs first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTiming {
    pub producer_delay: Duration,
    pub consumer_delay: Duration,
    pub value: String,
}

impl Default for WaitTiming {
    fn default() -> Self {
        Self {
            producer_delay: Duration::from_millis(2000),
            consumer_delay: Duration::from_millis(1000),
            value: "ABC".to_string(),
        }
    }
}

impl WaitTiming {
    /// Whether the consumer is scheduled to read before the producer publishes
    pub fn consumer_first(&self) -> bool {
        self.consumer_delay < self.producer_delay
    }
}

/// What the consumer saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitReport {
    pub mode: ReadMode,
    /// `None` when the consumer read before anything was published
    pub observed: Option<String>,
    /// Time from start until the consumer finished reading
    pub consumer_elapsed_ms: u64,
}

impl WaitReport {
    /// The consumer missed the value
    pub fn missed(&self) -> bool {
        self.observed.is_none()
    }
}

/// Run one producer and one consumer against a fresh `SignalBox`
///
/// Cancelling `token` stops both sleeps and a parked rendezvous read. A
/// cancelled consumer makes the whole run fail with `Cancelled`.
pub fn run(mode: ReadMode, timing: &WaitTiming, token: &CancellationToken) -> Result<WaitReport> {
    info!(
        "Running {} wait demo (producer {:?}, consumer {:?})",
        mode, timing.producer_delay, timing.consumer_delay
    );
    let signal: SignalBox = SignalBox::new();
    let start = Instant::now();

    let producer = {
        let signal = signal.clone();
        let token = token.clone();
        let delay = timing.producer_delay;
        let value = timing.value.clone();
        spawn_named("producer", move || -> Result<()> {
            token.sleep(delay)?;
            debug!("Producer publishing");
            signal.publish(value)
        })?
    };

    let consumer = {
        let signal = signal.clone();
        let token = token.clone();
        let delay = timing.consumer_delay;
        spawn_named("consumer", move || -> Result<(Option<String>, u64)> {
            token.sleep(delay)?;
            let observed = match mode {
                ReadMode::Racy => signal.read_without_waiting()?,
                ReadMode::Rendezvous => Some(signal.await_and_read_cancellable(&token)?),
            };
            Ok((observed, elapsed_ms(start)))
        })?
    };

    let consumed = join_named(consumer)?;
    match join_named(producer)? {
        Ok(()) | Err(LabError::Cancelled) => {}
        Err(e) => return Err(e),
    }
    let (observed, consumer_elapsed_ms) = consumed?;

    debug!("Consumer observed {:?} after {}ms", observed, consumer_elapsed_ms);
    Ok(WaitReport {
        mode,
        observed,
        consumer_elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn timing(producer_ms: u64, consumer_ms: u64) -> WaitTiming {
        WaitTiming {
            producer_delay: Duration::from_millis(producer_ms),
            consumer_delay: Duration::from_millis(consumer_ms),
            value: "ABC".to_string(),
        }
    }

    #[test]
    fn test_default_timing_runs_consumer_first() {
        let timing = WaitTiming::default();
        assert!(timing.consumer_first());
        assert_eq!(timing.value, "ABC");
    }

    #[test]
    fn test_racy_read_misses_value() {
        let report = run(ReadMode::Racy, &timing(200, 20), &CancellationToken::new()).unwrap();
        assert!(report.missed());
        assert_eq!(report.mode, ReadMode::Racy);
    }

    #[test]
    fn test_racy_read_sees_value_when_producer_first() {
        let report = run(ReadMode::Racy, &timing(10, 200), &CancellationToken::new()).unwrap();
        assert_eq!(report.observed, Some("ABC".to_string()));
    }

    #[test]
    fn test_rendezvous_waits_for_value() {
        let report = run(ReadMode::Rendezvous, &timing(200, 100), &CancellationToken::new()).unwrap();
        assert_eq!(report.observed, Some("ABC".to_string()));
        assert!(report.consumer_elapsed_ms >= 200);
    }

    #[test]
    fn test_rendezvous_cancelled_while_waiting() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let result = run(ReadMode::Rendezvous, &timing(5_000, 10), &token);
        assert!(matches!(result, Err(LabError::Cancelled)));
        handle.join().unwrap();
    }

    #[test]
    fn test_read_mode_display() {
        assert_eq!(ReadMode::Racy.to_string(), "racy");
        assert_eq!(ReadMode::Rendezvous.to_string(), "rendezvous");
    }

    #[test]
    fn test_report_serializes() {
        let report = WaitReport {
            mode: ReadMode::Rendezvous,
            observed: Some("ABC".to_string()),
            consumer_elapsed_ms: 2001,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "rendezvous");
        assert_eq!(json["observed"], "ABC");
    }
}
