//! Cancellation token for cooperative cancellation
//!
//! A task holding a token checks it at its suspension points and exits with
//! `Err(LabError::Cancelled)` once cancellation was requested. Nothing is
//! injected into the task asynchronously; the task decides where it stops.
//!
//! Blocking primitives that park on their own condition variable register a
//! wake-up callback with [`CancellationToken::on_cancel`], so a parked task
//! notices cancellation without polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{LabError, Result};

type WakeFn = Arc<dyn Fn() + Send + Sync>;

/// Token for checking and triggering cancellation
///
/// Clones share state: cancelling any clone cancels all of them.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    /// Fast-path flag, written only while `wakers` is locked
    cancelled: AtomicBool,
    wakers: Mutex<Wakers>,
    /// Parks `sleep` callers
    sleepers: Condvar,
}

#[derive(Default)]
struct Wakers {
    next_id: u64,
    callbacks: Vec<(u64, WakeFn)>,
}

impl CancellationToken {
    /// Create a new, uncancelled token
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                wakers: Mutex::new(Wakers::default()),
                sleepers: Condvar::new(),
            }),
        }
    }

    /// Check if cancellation was requested
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation
    ///
    /// Wakes sleepers and runs every registered callback exactly once.
    /// Calling it again is a no-op.
    pub fn cancel(&self) {
        let callbacks = {
            let mut wakers = match self.inner.wakers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if self.inner.cancelled.swap(true, Ordering::AcqRel) {
                return;
            }
            self.inner.sleepers.notify_all();
            std::mem::take(&mut wakers.callbacks)
        };

        log::debug!("Cancellation requested, waking {} waiter(s)", callbacks.len());
        // Callbacks take other locks; the wakers lock must be released first.
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Check if cancelled and return error if so
    ///
    /// ```ignore
    /// fn work(token: &CancellationToken) -> Result<()> {
    ///     loop {
    ///         token.check()?;
    ///         // ... do work ...
    ///     }
    /// }
    /// ```
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(LabError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `Err(LabError::Cancelled)` as soon as the token is cancelled,
    /// including when it already was before the call. A duration too large
    /// to form a deadline sleeps until cancelled.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(duration);
        let mut wakers = self.inner.wakers.lock()?;
        loop {
            if self.is_cancelled() {
                return Err(LabError::Cancelled);
            }
            wakers = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    self.inner.sleepers.wait_timeout(wakers, deadline - now)?.0
                }
                None => self.inner.sleepers.wait(wakers)?,
            };
        }
    }

    /// Register a callback to run when the token is cancelled
    ///
    /// Fails with `Err(LabError::Cancelled)` instead of registering if the
    /// token is already cancelled. The check and the registration happen
    /// under the same lock `cancel` takes, so a callback is either run by
    /// `cancel` or the caller sees the error. Dropping the returned
    /// registration removes the callback.
    pub fn on_cancel<F>(&self, callback: F) -> Result<CancelRegistration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut wakers = self.inner.wakers.lock()?;
        if self.is_cancelled() {
            return Err(LabError::Cancelled);
        }
        let id = wakers.next_id;
        wakers.next_id += 1;
        wakers.callbacks.push((id, Arc::new(callback)));
        Ok(CancelRegistration {
            token: self.clone(),
            id,
        })
    }

    fn deregister(&self, id: u64) {
        let mut wakers = match self.inner.wakers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        wakers.callbacks.retain(|(registered, _)| *registered != id);
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.wakers.lock().map(|w| w.callbacks.len()).unwrap_or(0)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Handle for a callback registered with [`CancellationToken::on_cancel`]
///
/// Removes the callback when dropped.
#[must_use = "the callback is removed as soon as the registration is dropped"]
pub struct CancelRegistration {
    token: CancellationToken,
    id: u64,
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        self.token.deregister(self.id);
    }
}
