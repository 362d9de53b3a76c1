//! threadlab - thread lifecycle demonstrations
//!
//! The core is [`SignalBox`], a write-once value guarded by a mutex and a
//! condition variable, read either racily or through a predicate-guarded
//! rendezvous. Interruption is modelled by an explicit [`CancellationToken`]
//! observed at suspension points. The [`demos`] module drives these and the
//! standard library primitives through small producer/consumer scenarios.

pub mod cancel;
pub mod demos;
pub mod error;
pub mod signal_box;

pub use cancel::{CancelRegistration, CancellationToken};
pub use error::{LabError, Result};
pub use signal_box::SignalBox;
