//! Connection and pool configuration.
//!
//! Provides typed option structs with builder-style setters.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use vantage_control::{ConnectOptions, PoolOptions};
//!
//! let connect = ConnectOptions::new()
//!     .with_port(3001)
//!     .with_connect_timeout(Duration::from_secs(5));
//!
//! let pool = PoolOptions::new()
//!     .with_idle_timeout(Duration::from_secs(30))
//!     .with_sweep_interval(Duration::from_secs(60));
//!
//! assert!(pool.validate().is_ok());
//! assert_eq!(connect.port, 3001);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::{DEFAULT_PORT, HANDSHAKE};

// ============================================================================
// Constants
// ============================================================================

/// Default limit on establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time an unused pooled connection is kept open.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default period of the pool's idle sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// ConnectOptions
// ============================================================================

/// Options for opening a connection to a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// TCP port of the control interface.
    pub port: u16,

    /// Limit on the TCP connect; `None` waits for the OS.
    pub connect_timeout: Option<Duration>,

    /// Lines written right after connecting, before the read loop starts.
    pub handshake: Vec<String>,

    /// Disable Nagle's algorithm on the socket.
    pub nodelay: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            handshake: HANDSHAKE.iter().map(|line| (*line).to_string()).collect(),
            nodelay: true,
        }
    }
}

impl ConnectOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TCP port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Waits for the OS connect timeout instead of a local one.
    #[inline]
    #[must_use]
    pub fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    /// Replaces the handshake lines.
    #[must_use]
    pub fn with_handshake<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handshake = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables `TCP_NODELAY`.
    #[inline]
    #[must_use]
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Checks the options for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for port 0, a zero connect timeout, or a
    /// handshake line containing a line break.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("port must be non-zero"));
        }
        if self.connect_timeout == Some(Duration::ZERO) {
            return Err(Error::config("connect timeout must be non-zero"));
        }
        if let Some(line) = self
            .handshake
            .iter()
            .find(|line| line.contains(['\r', '\n']))
        {
            return Err(Error::config(format!(
                "handshake line contains a line break: {line:?}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// PoolOptions
// ============================================================================

/// Options for the connection pool's idle reclamation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// How long a connection with no acquirers stays open.
    pub idle_timeout: Duration,

    /// How often the idle sweep runs.
    pub sweep_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl PoolOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle timeout.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the sweep interval.
    #[inline]
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Checks the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the sweep interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(Error::config("sweep interval must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
