//! Error types for threadlab
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in threadlab
#[derive(Debug, Error)]
pub enum LabError {
    /// A waiting or sleeping task was cancelled through its token
    #[error("Cancelled")]
    Cancelled,

    /// An operation was used outside its contract (e.g. publishing twice)
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A timed wait expired before the value was published
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// A lock was poisoned by a panicking thread
    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    /// A joined thread panicked
    #[error("Thread panicked: {0}")]
    ThreadPanicked(String),

    /// IO error (thread spawn, scratch files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LabError {
    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LabError::Cancelled)
    }
}

impl<G> From<std::sync::PoisonError<G>> for LabError {
    fn from(e: std::sync::PoisonError<G>) -> Self {
        LabError::Poisoned(e.to_string())
    }
}

/// Result type alias for threadlab operations
pub type Result<T> = std::result::Result<T, LabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error() {
        let err = LabError::Cancelled;
        assert_eq!(err.to_string(), "Cancelled");
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_contract_violation_error() {
        let err = LabError::ContractViolation("value already published".to_string());
        assert_eq!(err.to_string(), "Contract violation: value already published");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_timeout_error() {
        let err = LabError::Timeout(250);
        assert_eq!(err.to_string(), "Timed out after 250ms");
    }

    #[test]
    fn test_thread_panicked_error() {
        let err = LabError::ThreadPanicked("consumer".to_string());
        assert_eq!(err.to_string(), "Thread panicked: consumer");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LabError = io_err.into();
        assert!(matches!(err, LabError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_poison_error_conversion() {
        let mutex = std::sync::Arc::new(std::sync::Mutex::new(0));
        let poisoner = mutex.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err: LabError = mutex.lock().unwrap_err().into();
        assert!(matches!(err, LabError::Poisoned(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(LabError::Cancelled)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
