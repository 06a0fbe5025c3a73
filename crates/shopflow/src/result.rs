//! Result and error types for shopflow.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for shopflow operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors that can occur while preparing or running a scenario
#[derive(Debug, Error)]
pub enum FlowError {
    /// The shop database could not be opened
    #[error("Failed to open store at {}: {message}", path.display())]
    StoreConnection {
        /// Database path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Rows could not be cleared from the shop database
    #[error("Failed to reset store: {message}")]
    StoreReset {
        /// Error message
        message: String,
    },

    /// Browser or page could not be created
    #[error("Failed to launch {engine} session: {message}")]
    SessionLaunch {
        /// Engine name
        engine: String,
        /// Error message
        message: String,
    },

    /// Navigation did not finish in time
    #[error("Navigation to {url} timed out after {ms}ms")]
    NavigationTimeout {
        /// URL being loaded
        url: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Navigation failed outright
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Element never reached the required state
    #[error("Timed out after {ms}ms waiting for '{selector}' to be {state}")]
    ElementTimeout {
        /// CSS selector
        selector: String,
        /// State that was awaited
        state: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Rendered text did not match
    #[error("{0}")]
    Assertion(AssertionFailure),

    /// Page interaction error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Invalid configuration or scenario definition
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
}

impl FlowError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
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

    /// Stable, machine-readable name of the error class
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StoreConnection { .. } => "store_connection",
            Self::StoreReset { .. } => "store_reset",
            Self::SessionLaunch { .. } => "session_launch",
            Self::NavigationTimeout { .. } => "navigation_timeout",
            Self::Navigation { .. } => "navigation",
            Self::ElementTimeout { .. } => "element_timeout",
            Self::Assertion(_) => "assertion",
            Self::Page { .. } => "page",
            Self::Screenshot { .. } => "screenshot",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
        }
    }

    /// Whether this error came from a bounded wait running out
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout { .. } | Self::ElementTimeout { .. }
        )
    }
}

/// Mismatch between expected and rendered page state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// Zero-based index of the failing step
    pub step_index: usize,
    /// Locator that was read
    pub locator: String,
    /// What the step expected (or forbade, for negative checks)
    pub expected: String,
    /// What the page rendered; `None` when the element was absent
    pub actual: Option<String>,
    /// Short description of the check
    pub check: &'static str,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Assertion failed at step {} ({} '{}'): expected {:?}, got ",
            self.step_index, self.check, self.locator, self.expected
        )?;
        match &self.actual {
            Some(actual) => write!(f, "{actual:?}"),
            None => f.write_str("<no element>"),
        }
    }
}
