//! Result and error types for widget-probe.

use std::fmt;
use thiserror::Error;

/// Result type for widget-probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the widget
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A wait condition was not met within its budget
    #[error("Timed out after {timeout_ms}ms waiting for `{selector}` to be {condition}")]
    Timeout {
        /// Selector (or load-state label) that was awaited
        selector: String,
        /// Condition that was awaited (e.g. "visible", "networkidle")
        condition: String,
        /// Budget in milliseconds
        timeout_ms: u64,
    },

    /// Observed value did not match expectation
    #[error("Assertion failed: {0}")]
    Assertion(AssertionFailure),

    /// Initial page load failed
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page creation or page-level error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// CDP call failed while querying or interacting
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Invalid suite configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Create a timeout error
    #[must_use]
    pub fn timeout(selector: impl Into<String>, condition: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            selector: selector.into(),
            condition: condition.into(),
            timeout_ms,
        }
    }

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

    /// Whether this is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this is an assertion failure
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}

impl From<AssertionFailure> for ProbeError {
    fn from(failure: AssertionFailure) -> Self {
        Self::Assertion(failure)
    }
}

/// Kind of assertion that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    /// Text was not equal to the expected value
    TextMismatch,
    /// Text did not match the expected pattern
    PatternMismatch,
    /// Fewer elements than required
    CountTooLow,
    /// Element was not visible
    NotVisible,
    /// Element was not enabled
    NotEnabled,
    /// Text was empty
    EmptyText,
}

impl AssertionKind {
    /// Short label for reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TextMismatch => "text mismatch",
            Self::PatternMismatch => "pattern mismatch",
            Self::CountTooLow => "count too low",
            Self::NotVisible => "not visible",
            Self::NotEnabled => "not enabled",
            Self::EmptyText => "empty text",
        }
    }
}

/// A failed expectation with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// What kind of check failed
    pub kind: AssertionKind,
    /// Message naming what was expected and what was observed
    pub message: String,
}

impl AssertionFailure {
    /// Create a new assertion failure
    #[must_use]
    pub fn new(kind: AssertionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.label(), self.message)
    }
}
