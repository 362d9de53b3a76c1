//! Write-once rendezvous between a publishing thread and waiting readers.
//!
//! `SignalBox` pairs an explicit `Mutex` with a `Condvar`. One task publishes
//! a value exactly once; readers either wait for it with the predicate
//! re-checked after every wake ([`SignalBox::await_and_read`]) or peek at it
//! without waiting ([`SignalBox::read_without_waiting`]), which is racy with
//! respect to publish timing but never a data race.

use std::sync::{Arc, Condvar, LockResult, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::cancel::CancellationToken;
use crate::error::{LabError, Result};

/// Handle to a write-once value shared between threads
///
/// Clones are cheap and refer to the same value.
pub struct SignalBox<T = String> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    condition: Condvar,
}

struct State<T> {
    /// Absent until published, then never changes
    value: Option<T>,
    /// Tasks currently parked on `condition`
    parked: usize,
}

impl<T> Shared<T> {
    fn wake_all(&self) {
        // Notify while holding the lock so a waiter between its predicate
        // check and its park cannot miss the wake.
        let _state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.condition.notify_all();
    }
}

impl<T> Clone for SignalBox<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for SignalBox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SignalBox<T> {
    /// Create an empty box
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: None,
                    parked: 0,
                }),
                condition: Condvar::new(),
            }),
        }
    }

    /// Publish the value and wake every waiter
    ///
    /// A second publish fails with `ContractViolation` and leaves the first
    /// value in place.
    pub fn publish(&self, value: T) -> Result<()> {
        let mut state = self.shared.state.lock()?;
        if state.value.is_some() {
            debug!("Rejected second publish");
            return Err(LabError::ContractViolation("value already published".to_string()));
        }
        state.value = Some(value);
        debug!("Published value, waking {} parked waiter(s)", state.parked);
        self.shared.condition.notify_all();
        Ok(())
    }

    /// Whether a value has been published
    pub fn is_published(&self) -> Result<bool> {
        Ok(self.shared.state.lock()?.value.is_some())
    }

    /// Number of tasks currently parked waiting for the value
    pub fn parked_waiters(&self) -> Result<usize> {
        Ok(self.shared.state.lock()?.parked)
    }

    /// Wake every parked waiter without publishing
    ///
    /// Waiters re-check the value and park again. Behaves like a spurious
    /// wake-up of the condition variable.
    pub fn wake_waiters(&self) {
        trace!("Waking waiters without publishing");
        self.shared.wake_all();
    }

    /// Park on the condition, for at most `timeout` if given
    fn park<'a>(
        &'a self,
        mut state: MutexGuard<'a, State<T>>,
        timeout: Option<Duration>,
    ) -> Result<MutexGuard<'a, State<T>>> {
        state.parked += 1;
        trace!("Parking, {} waiter(s) parked", state.parked);
        let woken = match timeout {
            Some(timeout) => self
                .shared
                .condition
                .wait_timeout(state, timeout)
                .map(|(guard, _)| guard)
                .map_err(|poisoned| PoisonError::new(poisoned.into_inner().0)),
            None => self.shared.condition.wait(state),
        };
        Self::unpark(woken)
    }

    /// Undo the parked count on both the normal and the poisoned path
    fn unpark(woken: LockResult<MutexGuard<'_, State<T>>>) -> Result<MutexGuard<'_, State<T>>> {
        match woken {
            Ok(mut state) => {
                state.parked -= 1;
                Ok(state)
            }
            Err(poisoned) => {
                let message = poisoned.to_string();
                poisoned.into_inner().parked -= 1;
                Err(LabError::Poisoned(message))
            }
        }
    }
}

impl<T: Clone> SignalBox<T> {
    /// Block until the value is published, then return it
    ///
    /// The predicate is checked before the first park, so a value published
    /// earlier is returned immediately, and after every wake, so spurious
    /// wake-ups park again.
    pub fn await_and_read(&self) -> Result<T> {
        let mut state = self.shared.state.lock()?;
        loop {
            if let Some(value) = &state.value {
                return Ok(value.clone());
            }
            state = self.park(state, None)?;
        }
    }

    /// Block until the value is published or `timeout` elapses
    ///
    /// A timeout too large to form a deadline waits without one.
    pub fn await_timeout(&self, timeout: Duration) -> Result<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock()?;
        loop {
            if let Some(value) = &state.value {
                return Ok(value.clone());
            }
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!("Wait timed out after {:?}", timeout);
                        return Err(LabError::Timeout(timeout.as_millis() as u64));
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            state = self.park(state, remaining)?;
        }
    }

    /// Return the value if it has been published, `None` otherwise
    ///
    /// Takes the lock but does not wait: called before `publish`, it
    /// observes the absent state.
    pub fn read_without_waiting(&self) -> Result<Option<T>> {
        Ok(self.shared.state.lock()?.value.clone())
    }
}

impl<T: Clone + Send + 'static> SignalBox<T> {
    /// Block until the value is published or `token` is cancelled
    ///
    /// Returns `Err(LabError::Cancelled)` if the token is cancelled while the
    /// value is still absent. A value that is already present wins over
    /// cancellation.
    pub fn await_and_read_cancellable(&self, token: &CancellationToken) -> Result<T> {
        let mut state = self.shared.state.lock()?;
        if let Some(value) = &state.value {
            return Ok(value.clone());
        }

        let shared = Arc::clone(&self.shared);
        let _registration = token.on_cancel(move || shared.wake_all())?;

        loop {
            if let Some(value) = &state.value {
                return Ok(value.clone());
            }
            if token.is_cancelled() {
                debug!("Wait cancelled before value was published");
                return Err(LabError::Cancelled);
            }
            state = self.park(state, None)?;
        }
    }
}

impl<T> std::fmt::Debug for SignalBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("SignalBox");
        match self.shared.state.try_lock() {
            Ok(state) => dbg
                .field("published", &state.value.is_some())
                .field("parked", &state.parked),
            Err(_) => dbg.field("state", &"<locked>"),
        };
        dbg.finish()
    }
}
