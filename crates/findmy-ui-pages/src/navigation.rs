//! Errors raised while moving between pages.

use findmy_ui_core::error::UiError;
use thiserror::Error;

/// Why a page action or transition failed.
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error(transparent)]
    Ui(#[from] UiError),

    /// An element the page relies on never showed up.
    #[error("{page}: {element} not found")]
    ElementMissing { page: &'static str, element: String },
}

impl NavigationError {
    pub fn missing(page: &'static str, element: impl ToString) -> Self {
        NavigationError::ElementMissing {
            page,
            element: element.to_string(),
        }
    }

    /// True for failures of the environment rather than of the app under test.
    pub fn is_environment(&self) -> bool {
        match self {
            NavigationError::Ui(e) => e.is_environment(),
            NavigationError::ElementMissing { .. } => false,
        }
    }
}

/// Result of a page action: the page the app is on afterwards.
pub type NavResult<T> = Result<T, NavigationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use findmy_ui_core::backend::BackendError;

    #[test]
    fn classification_follows_cause() {
        assert!(!NavigationError::missing("DeviceDetail", "label=\"Close\"").is_environment());
        assert!(NavigationError::from(UiError::from(BackendError::NotConnected)).is_environment());
        assert!(!NavigationError::from(UiError::assertion("x")).is_environment());
    }

    #[test]
    fn missing_element_message() {
        let err = NavigationError::missing("Main", "id=\"CardContainerView\"");
        assert_eq!(err.to_string(), "Main: id=\"CardContainerView\" not found");
    }
}
