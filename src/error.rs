//! Error types for the Cronometer export client
//!
//! Every public API returns `Result<T, Error>`. The variants follow the
//! failure modes of the service: credentials and sessions (`Auth`,
//! `SessionExpired`), drift of the GWT magic values (`GwtVersion`), markup or
//! payload changes (`Protocol`) and failed exports (`Export`).

use crate::types::{DateRange, ExportKind};
use thiserror::Error;

/// Maximum number of response body characters carried in error messages
pub const SNIPPET_LEN: usize = 200;

/// The main error type for the Cronometer export client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    // ============================================================================
    // Protocol Errors
    // ============================================================================
    /// The service rejected the GWT permutation/header values. Update the
    /// configuration instead of retrying.
    #[error("GWT version mismatch (permutation/header values may be outdated): {message}")]
    GwtVersion { message: String },

    #[error("Unexpected response from service: {message}")]
    Protocol { message: String },

    // ============================================================================
    // Export Errors
    // ============================================================================
    #[error("Export of {kind}{} failed: {message}", range_suffix(.range))]
    Export {
        kind: ExportKind,
        range: Option<DateRange>,
        message: String,
    },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

}

fn range_suffix(range: &Option<DateRange>) -> String {
    match range {
        Some(range) => format!(" for {range}"),
        None => String::new(),
    }
}

impl Error {
    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a session expired error
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::SessionExpired {
            message: message.into(),
        }
    }

    /// Create a GWT version error
    pub fn gwt_version(message: impl Into<String>) -> Self {
        Self::GwtVersion {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an export error
    pub fn export(kind: ExportKind, range: Option<DateRange>, message: impl Into<String>) -> Self {
        Self::Export {
            kind,
            range,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Bad credentials, or a session that is missing or no longer accepted
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth { .. } | Error::SessionExpired { .. })
    }

    /// Check if this error is retryable at the transport level
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. }
        )
    }
}

/// Truncate a response body for inclusion in an error message
pub fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Result type alias for the Cronometer export client
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for attaching export context to errors
pub trait ResultExt<T> {
    /// Report a failure as an export failure of `kind` over `range`
    ///
    /// `position` is appended in brackets when non-empty. An expired session
    /// keeps its variant so the caller can still drop the session.
    fn export_context<F: FnOnce() -> String>(
        self,
        kind: ExportKind,
        range: DateRange,
        position: F,
    ) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn export_context<F: FnOnce() -> String>(
        self,
        kind: ExportKind,
        range: DateRange,
        position: F,
    ) -> Result<T> {
        self.map_err(|e| {
            let position = position();
            let with_position = |message: String| {
                if position.is_empty() {
                    message
                } else {
                    format!("{message} [{position}]")
                }
            };
            match e.into() {
                Error::SessionExpired { message } => Error::session_expired(with_position(message)),
                Error::Export { message, .. } => {
                    Error::export(kind, Some(range), with_position(message))
                }
                other => Error::export(kind, Some(range), with_position(other.to_string())),
            }
        })
    }
}
