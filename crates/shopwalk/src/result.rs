//! Result and error types for shopwalk.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for shopwalk operations
pub type ShopwalkResult<T> = Result<T, ShopwalkError>;

/// Errors that can occur while driving a storefront flow
#[derive(Debug, Error)]
pub enum ShopwalkError {
    /// A required element was never found
    #[error("Element not found: {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// A required element never reached the required state within budget
    #[error("Timed out after {elapsed_ms}ms waiting for {locator} to be {condition}")]
    TimeoutExceeded {
        /// Locator description
        locator: String,
        /// Condition description
        condition: String,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// The UI refused an interaction (overlay, disabled control)
    #[error("Interaction with {locator} rejected: {reason}")]
    InteractionRejected {
        /// Locator or element description
        locator: String,
        /// Why the browser refused
        reason: String,
    },

    /// Element handle invalidated by a re-render
    #[error("Stale element reference: {element}")]
    StaleReference {
        /// Element handle id
        element: String,
    },

    /// Observed value disagrees with the expected one
    #[error("Assertion failed for {what}: expected {expected:?}, observed {observed:?}")]
    AssertionMismatch {
        /// What was compared
        what: String,
        /// Expected value
        expected: String,
        /// Observed value
        observed: String,
    },

    /// Required external input is absent
    #[error("Missing {what}: {}", path.display())]
    DataSourceMissing {
        /// What was missing (data file, config key)
        what: String,
        /// Resolved path or key
        path: PathBuf,
    },

    /// Text could not be parsed (prices, quantities)
    #[error("Cannot parse {input:?}: {reason}")]
    Format {
        /// Raw input
        input: String,
        /// Parser complaint
        reason: String,
    },

    /// A multi-step flow could not reach its next state
    #[error("{flow} could not reach state {state}: {source}")]
    UnreachedState {
        /// Flow name
        flow: String,
        /// State that was never reached
        state: String,
        /// Guard failure
        #[source]
        source: Box<ShopwalkError>,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Any other driver-level failure (dead session, protocol error)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ShopwalkError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an assertion mismatch
    #[must_use]
    pub fn mismatch(
        what: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
    ) -> Self {
        Self::AssertionMismatch {
            what: what.into(),
            expected: expected.into(),
            observed: observed.into(),
        }
    }

    /// Transient DOM-timing failure that the interaction layer may retry
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::InteractionRejected { .. } | Self::StaleReference { .. }
        )
    }

    /// Element handle went stale
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let stale = ShopwalkError::StaleReference {
            element: "mock-1".to_string(),
        };
        let rejected = ShopwalkError::InteractionRejected {
            locator: "button".to_string(),
            reason: "intercepted".to_string(),
        };
        let timeout = ShopwalkError::TimeoutExceeded {
            locator: "button".to_string(),
            condition: "visible".to_string(),
            elapsed_ms: 100,
        };
        assert!(stale.is_transient());
        assert!(stale.is_stale());
        assert!(rejected.is_transient());
        assert!(!rejected.is_stale());
        assert!(!timeout.is_transient());
    }

    #[test]
    fn test_timeout_message_names_locator_and_condition() {
        let err = ShopwalkError::TimeoutExceeded {
            locator: "cart price (css: .price__amount)".to_string(),
            condition: "visible".to_string(),
            elapsed_ms: 15_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("cart price"));
        assert!(msg.contains("visible"));
        assert!(msg.contains("15000ms"));
    }

    #[test]
    fn test_mismatch_reports_both_values() {
        let msg = ShopwalkError::mismatch("quantity", "2", "1").to_string();
        assert!(msg.contains("\"2\""));
        assert!(msg.contains("\"1\""));
    }

    #[test]
    fn test_unreached_state_keeps_source() {
        let err = ShopwalkError::UnreachedState {
            flow: "add to cart".to_string(),
            state: "SizePickerOpen".to_string(),
            source: Box::new(ShopwalkError::ElementNotFound {
                locator: "sizes".to_string(),
            }),
        };
        assert!(err.to_string().contains("SizePickerOpen"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
