//! Shared HTTP plumbing for the live data clients
//!
//! Builds configured `reqwest` clients and maps transport failures and HTTP statuses onto
//! the shared error kinds.

use std::collections::HashMap;
use std::time::Duration;
use unibot_core::{ErrorContext, UnibotError, UnibotResult};

/// Configuration for HTTP clients
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Additional default headers
    pub headers: HashMap<String, String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 8,
            user_agent: format!("unibot/{}", env!("CARGO_PKG_VERSION")),
            headers: HashMap::new(),
        }
    }
}

impl HttpClientConfig {
    /// Set additional header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Names used when describing a failed endpoint to users
#[derive(Debug, Clone, Copy)]
pub struct EndpointLabels {
    /// e.g. "announcement server"
    pub server: &'static str,
    /// e.g. "announcements API endpoint"
    pub endpoint: &'static str,
}

impl EndpointLabels {
    pub const ANNOUNCEMENTS: EndpointLabels = EndpointLabels {
        server: "announcement server",
        endpoint: "announcements API endpoint",
    };

    pub const GENERIC: EndpointLabels = EndpointLabels {
        server: "server",
        endpoint: "API endpoint",
    };
}

/// Helper function to create HTTP client with common configuration
pub fn create_http_client(config: &HttpClientConfig) -> UnibotResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            UnibotError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    for (key, value) in &config.headers {
        let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            UnibotError::Config {
                message: format!("Invalid header name '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?;

        let header_value =
            reqwest::header::HeaderValue::from_str(value).map_err(|e| UnibotError::Config {
                message: format!("Invalid header value for '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        headers.insert(header_name, header_value);
    }

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| UnibotError::Config {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

/// Classify a transport-level `reqwest` failure
pub fn classify_request_error(
    error: reqwest::Error,
    labels: EndpointLabels,
    operation: &str,
    timeout_ms: u64,
) -> UnibotError {
    let context = ErrorContext::new("http_client").with_operation(operation);

    if error.is_timeout() {
        UnibotError::Timeout {
            operation: operation.to_string(),
            duration_ms: timeout_ms,
            context: context.with_suggestion("The server may be congested; try again later"),
        }
    } else if error.is_connect() || error.is_request() || error.is_body() {
        UnibotError::Network {
            message: format!("Unable to connect to the {}: {}", labels.server, error),
            source: Some(Box::new(error)),
            context: context.with_suggestion("Check network connectivity"),
        }
    } else if error.is_decode() {
        UnibotError::Parse {
            message: format!("Invalid response: could not decode data from the {}", labels.server),
            source: Some(Box::new(error)),
            context,
        }
    } else {
        UnibotError::Internal {
            message: error.to_string(),
            source: Some(Box::new(error)),
            context,
        }
    }
}

/// Map a non-2xx status onto a `Server` error
pub fn status_error(status: u16, body: &str, labels: EndpointLabels, operation: &str) -> UnibotError {
    let message = match status {
        s if s >= 500 => format!(
            "Server error ({}): The {} is currently unavailable. Details: {}",
            s, labels.server, body
        ),
        404 => format!("The {} was not found.", labels.endpoint),
        429 => "Too many requests. Please try again later.".to_string(),
        s => format!("API request failed with status {}. Details: {}", s, body),
    };

    UnibotError::Server {
        message,
        status: Some(status),
        context: ErrorContext::new("http_client")
            .with_operation(operation)
            .with_metadata("status", &status.to_string())
            .with_suggestion(match status {
                404 => "Check the configured endpoint path",
                429 => "Wait before retrying",
                _ => "Check the service status",
            }),
    }
}

/// Read a response, returning the body text on success and a classified error otherwise
pub async fn read_body(
    response: reqwest::Response,
    labels: EndpointLabels,
    operation: &str,
    timeout_ms: u64,
) -> UnibotResult<String> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status.as_u16(), &body, labels, operation));
    }

    response
        .text()
        .await
        .map_err(|e| classify_request_error(e, labels, operation, timeout_ms))
}
