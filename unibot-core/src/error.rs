//! Unified error handling system
//!
//! Every fallible operation in the pipeline returns a [`UnibotError`]. Each error maps onto
//! one [`ErrorKind`], which is all the orchestrator needs to pick a recovery path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

pub type UnibotResult<T> = Result<T, UnibotError>;

/// Result of a remote lookup (announcements or completion).
///
/// Callers branch on `err.kind()` and surface `err.message()`; transport details stay
/// inside the client that produced the error.
pub type FetchOutcome<T> = Result<T, UnibotError>;

/// Failure classes shared by every remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Server,
    Timeout,
    Parse,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Server => "server",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Parse => "parse",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the assistant
#[derive(Error, Debug)]
pub enum UnibotError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Server error: {message}")]
    Server {
        message: String,
        status: Option<u16>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl UnibotError {
    /// Failure class used for fallback decisions.
    ///
    /// Configuration problems (such as a missing credential) and internal faults report
    /// [`ErrorKind::Unknown`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnibotError::Network { .. } => ErrorKind::Network,
            UnibotError::Server { .. } => ErrorKind::Server,
            UnibotError::Timeout { .. } => ErrorKind::Timeout,
            UnibotError::Parse { .. } | UnibotError::Serialization(_) => ErrorKind::Parse,
            UnibotError::Config { .. } | UnibotError::Internal { .. } | UnibotError::Io(_) => {
                ErrorKind::Unknown
            }
        }
    }

    /// The bare diagnostic message, without the variant prefix used by `Display`
    pub fn message(&self) -> String {
        match self {
            UnibotError::Network { message, .. }
            | UnibotError::Server { message, .. }
            | UnibotError::Parse { message, .. }
            | UnibotError::Config { message, .. }
            | UnibotError::Internal { message, .. } => message.clone(),
            UnibotError::Timeout {
                operation,
                duration_ms,
                ..
            } => format!(
                "Request timeout: {} took longer than {} ms to respond",
                operation, duration_ms
            ),
            UnibotError::Io(e) => e.to_string(),
            UnibotError::Serialization(e) => e.to_string(),
        }
    }

    /// HTTP status that produced this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            UnibotError::Server { status, .. } => *status,
            _ => None,
        }
    }

    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            UnibotError::Network { context, .. } => Some(context),
            UnibotError::Server { context, .. } => Some(context),
            UnibotError::Timeout { context, .. } => Some(context),
            UnibotError::Parse { context, .. } => Some(context),
            UnibotError::Config { context, .. } => Some(context),
            UnibotError::Internal { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if a later attempt could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            UnibotError::Network { .. } => true,
            UnibotError::Timeout { .. } => true,
            UnibotError::Server { status, .. } => {
                matches!(status, Some(code) if *code >= 500 || *code == 429)
            }
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self {
            UnibotError::Internal { .. } => {
                error!(error_id = ?error_id, error = %self, "Internal error occurred");
            }
            UnibotError::Config { .. } => {
                error!(error_id = ?error_id, error = %self, "Configuration error");
            }
            UnibotError::Network { .. }
            | UnibotError::Timeout { .. }
            | UnibotError::Server { .. } => {
                warn!(
                    error_id = ?error_id,
                    kind = %self.kind(),
                    recoverable = self.is_recoverable(),
                    error = %self,
                    "Remote call failed"
                );
            }
            _ => {
                error!(error_id = ?error_id, kind = %self.kind(), error = %self, "Error occurred");
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::UnibotError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'unibot config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! network_error {
    ($msg:expr, $component:expr) => {
        $crate::UnibotError::Network {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check network connectivity"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::UnibotError::Network {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check network connectivity"),
        }
    };
}

#[macro_export]
macro_rules! server_error {
    ($msg:expr, $status:expr, $component:expr) => {
        $crate::UnibotError::Server {
            message: $msg.to_string(),
            status: Some($status),
            context: $crate::ErrorContext::new($component)
                .with_metadata("status", &$status.to_string()),
        }
    };
}

#[macro_export]
macro_rules! parse_error {
    ($msg:expr, $component:expr) => {
        $crate::UnibotError::Parse {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::UnibotError::Parse {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}
