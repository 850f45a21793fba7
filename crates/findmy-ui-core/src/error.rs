//! Library-wide error type.

use std::future::Future;
use std::panic::Location;
use std::pin::Pin;

use thiserror::Error;

use crate::backend::BackendError;
use crate::descriptor::DescriptorError;

/// Future returned by `verify_*` helpers.
///
/// Verifications are plain functions that capture the caller's location with
/// `#[track_caller]` and then box the async work, so a failed assertion points
/// at the test line rather than at the helper.
pub type Verification<'a, T> = Pin<Box<dyn Future<Output = Result<T, UiError>> + 'a>>;

/// Errors raised by waits, dispatch, helpers and verifications.
///
/// Timeouts are not errors: a wait that runs out of time returns
/// [`WaitOutcome::TimedOut`](crate::wait::WaitOutcome::TimedOut). Only
/// failed verifications and environment problems surface here.
#[derive(Error, Debug)]
pub enum UiError {
    /// The backend failed in a way that cannot be retried.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// An operation needed the app but none was launched.
    #[error("no application launched")]
    NoApplication,

    #[error(transparent)]
    InvalidDescriptor(#[from] DescriptorError),

    /// A verification did not hold.
    #[error("assertion failed at {location}: {message}")]
    Assertion {
        message: String,
        location: &'static Location<'static>,
    },
}

impl UiError {
    /// Builds an assertion failure attributed to the caller's source line.
    #[track_caller]
    pub fn assertion(message: impl Into<String>) -> Self {
        UiError::Assertion {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Builds an assertion failure for a location captured earlier, e.g.
    /// before entering an async block.
    pub fn assertion_at(message: impl Into<String>, location: &'static Location<'static>) -> Self {
        UiError::Assertion {
            message: message.into(),
            location,
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, UiError::Assertion { .. })
    }

    /// True for failures of the environment rather than of the app under test.
    pub fn is_environment(&self) -> bool {
        match self {
            UiError::Backend(_) | UiError::NoApplication => true,
            UiError::InvalidDescriptor(_) | UiError::Assertion { .. } => false,
        }
    }
}

/// Fails with an assertion error unless `condition` holds.
#[track_caller]
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), UiError> {
    if condition {
        Ok(())
    } else {
        Err(UiError::assertion(message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_records_caller_location() {
        let line = line!() + 1;
        let err = UiError::assertion("map not visible");
        match &err {
            UiError::Assertion { location, message } => {
                assert_eq!(location.line(), line);
                assert!(location.file().ends_with("error.rs"));
                assert_eq!(message, "map not visible");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("map not visible"));
        assert!(err.to_string().contains("error.rs"));
    }

    #[test]
    fn ensure_passes_through_location() {
        assert!(ensure(true, || unreachable!()).is_ok());
        let line = line!() + 1;
        let err = ensure(false, || "nope".to_string()).unwrap_err();
        match err {
            UiError::Assertion { location, .. } => assert_eq!(location.line(), line),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn classification() {
        assert!(UiError::NoApplication.is_environment());
        assert!(UiError::Backend(BackendError::NotConnected).is_environment());
        assert!(!UiError::assertion("x").is_environment());
        assert!(UiError::assertion("x").is_assertion());
    }
}
