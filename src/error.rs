//! Error types for the Vantage control client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use vantage_control::{Control, Result, Vid};
//!
//! async fn example(control: &Control) -> Result<()> {
//!     let level = control.get_load(Vid::new(219)).await?;
//!     println!("load 219 is at {level}%");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connect | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectFailed`] |
//! | Disconnection | [`Error::ConnectionClosed`] |
//! | Misuse | [`Error::Disposed`], [`Error::InvalidArgument`] |
//! | Request | [`Error::RequestTimeout`] |
//! | Format | [`Error::Parse`] |
//! | External | [`Error::Io`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::parser::ParseError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection or pool options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// TCP connection or handshake failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// TCP connect did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// A pooled connect attempt failed.
    ///
    /// Every acquirer waiting on the same attempt receives the same cause.
    #[error("Connect to {host} failed: {source}")]
    ConnectFailed {
        /// Host the pool tried to reach.
        host: String,
        /// Shared cause of the failure.
        #[source]
        source: Arc<Error>,
    },

    /// Connection closed while an operation was outstanding.
    ///
    /// Returned to queued writes and pending requests when the
    /// connection terminates underneath them.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Misuse Errors
    // ========================================================================
    /// Operation attempted on a disposed resource.
    #[error("{resource} has been disposed")]
    Disposed {
        /// Kind of resource (connection, pool, control).
        resource: &'static str,
    },

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// No matching reply arrived before the deadline.
    #[error("Request '{command}' timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Command text that was sent.
        command: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Malformed reply or status line.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a pooled connect failure sharing `source`.
    #[inline]
    pub fn connect_failed(host: impl Into<String>, source: Arc<Error>) -> Self {
        Self::ConnectFailed {
            host: host.into(),
            source,
        }
    }

    /// Creates a disposed-resource error.
    #[inline]
    pub fn disposed(resource: &'static str) -> Self {
        Self::Disposed { resource }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            command: command.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. } => true,
            Self::ConnectFailed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectFailed { .. }
                | Self::ConnectionClosed
                | Self::Io(_)
        )
    }

    /// Returns `true` if this is a disposed-resource error.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry, possibly after acquiring
    /// a fresh connection.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectFailed { .. }
                | Self::ConnectionClosed
                | Self::RequestTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
