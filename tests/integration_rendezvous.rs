//! Rendezvous integration tests
//!
//! Drives SignalBox through the public API with real producer and consumer
//! threads and the timings of the classic wait/notify demonstration.

use std::thread;
use std::time::{Duration, Instant};

use threadlab::demos::{ReadMode, WaitTiming, wait_notify};
use threadlab::error::Result;
use threadlab::{CancellationToken, LabError, SignalBox};

const UNIT: Duration = Duration::from_millis(100);

/// Integration test: producer after 2 units, consumer awaits after 1 unit
#[test]
fn test_consumer_receives_value_after_producer_delay() -> Result<()> {
    let signal: SignalBox = SignalBox::new();
    let start = Instant::now();

    let producer = {
        let signal = signal.clone();
        thread::spawn(move || {
            thread::sleep(2 * UNIT);
            signal.publish("ABC".to_string())
        })
    };
    let consumer = {
        let signal = signal.clone();
        thread::spawn(move || {
            thread::sleep(UNIT);
            let value = signal.await_and_read();
            (value, start.elapsed())
        })
    };

    let (value, elapsed) = consumer.join().unwrap();
    producer.join().unwrap()?;

    assert_eq!(value?, "ABC");
    assert!(elapsed >= 2 * UNIT);
    Ok(())
}

/// Integration test: same timing, racy reader misses while rendezvous does not
#[test]
fn test_racy_read_misses_where_rendezvous_succeeds() -> Result<()> {
    let timing = WaitTiming {
        producer_delay: 2 * UNIT,
        consumer_delay: UNIT,
        value: "ABC".to_string(),
    };
    let token = CancellationToken::new();

    let racy = wait_notify::run(ReadMode::Racy, &timing, &token)?;
    let rendezvous = wait_notify::run(ReadMode::Rendezvous, &timing, &token)?;

    assert_eq!(racy.observed, None);
    assert_eq!(rendezvous.observed, Some("ABC".to_string()));
    assert!(rendezvous.consumer_elapsed_ms >= (2 * UNIT).as_millis() as u64);
    Ok(())
}

/// Integration test: every interleaving of publish and await yields the value
#[test]
fn test_await_always_returns_published_value() -> Result<()> {
    for producer_ms in [0u64, 5, 20] {
        for consumer_ms in [0u64, 5, 20] {
            let signal: SignalBox = SignalBox::new();
            let writer = signal.clone();
            let reader = signal.clone();

            let producer = thread::spawn(move || {
                thread::sleep(Duration::from_millis(producer_ms));
                writer.publish(format!("{}-{}", producer_ms, consumer_ms))
            });
            let consumer = thread::spawn(move || {
                thread::sleep(Duration::from_millis(consumer_ms));
                reader.await_and_read()
            });

            producer.join().unwrap()?;
            assert_eq!(consumer.join().unwrap()?, format!("{}-{}", producer_ms, consumer_ms));
        }
    }
    Ok(())
}

/// Integration test: write-once holds while readers are waiting
#[test]
fn test_second_publish_does_not_reach_waiters() -> Result<()> {
    let signal: SignalBox = SignalBox::new();
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let reader = signal.clone();
            thread::spawn(move || reader.await_and_read())
        })
        .collect();

    signal.publish("first".to_string())?;
    assert!(matches!(
        signal.publish("second".to_string()),
        Err(LabError::ContractViolation(_))
    ));

    for reader in readers {
        assert_eq!(reader.join().unwrap()?, "first");
    }
    Ok(())
}

/// Integration test: cancelling one waiter leaves the others waiting
#[test]
fn test_cancel_one_waiter_of_many() -> Result<()> {
    let signal: SignalBox = SignalBox::new();
    let token = CancellationToken::new();

    let cancelled = {
        let reader = signal.clone();
        let token = token.clone();
        thread::spawn(move || reader.await_and_read_cancellable(&token))
    };
    let patient = {
        let reader = signal.clone();
        thread::spawn(move || reader.await_and_read())
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while signal.parked_waiters()? < 2 {
        assert!(Instant::now() < deadline, "waiters never parked");
        thread::sleep(Duration::from_millis(1));
    }

    token.cancel();
    assert!(matches!(cancelled.join().unwrap(), Err(LabError::Cancelled)));
    assert!(!patient.is_finished());

    signal.publish("done".to_string())?;
    assert_eq!(patient.join().unwrap()?, "done");
    Ok(())
}
