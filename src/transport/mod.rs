//! Line transport layer.
//!
//! This module carries `\r\n`-terminated text lines between the client
//! and a controller, and shares connections between clients.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────────┐      ┌──────────────┐
//! │  Control     │      │  ConnectionPool  │      │  Controller  │
//! │  (engine)    │─────►│  host → entry    │      │  (TCP 3001)  │
//! │              │      │   └ Connection ──┼─────►│              │
//! └──────────────┘      └──────────────────┘      └──────────────┘
//! ```
//!
//! The engine talks to a [`Transport`]: either a [`Connection`] it owns
//! outright or a [`PooledConnection`] leased from a [`ConnectionPool`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket, read loop, write queue, line handlers |
//! | `options` | Connect and pool settings |
//! | `pool` | Per-host connection sharing and idle reclamation |

// ============================================================================
// Submodules
// ============================================================================

/// Line-framed connection and its tasks.
pub mod connection;

/// Connect and pool options.
pub mod options;

/// Shared connection pool.
pub mod pool;

// ============================================================================
// Imports
// ============================================================================

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::subscription::Subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, LineEvent, LineHandler};
pub use options::{ConnectOptions, PoolOptions};
pub use pool::{ConnectionPool, Connector, PooledConnection, TcpConnector};

// ============================================================================
// Transport
// ============================================================================

/// A line channel the protocol engine can run over.
///
/// Implemented by [`Connection`] and [`PooledConnection`].
pub trait Transport: Send + Sync + 'static {
    /// Returns `true` until the underlying connection closes.
    fn is_open(&self) -> bool;

    /// Returns a label for the remote end.
    fn peer(&self) -> &str;

    /// Registers a line handler. See [`Connection::subscribe`].
    fn subscribe_lines(&self, handler: LineHandler) -> Subscription;

    /// Queues a line and returns a future for its completion.
    ///
    /// The line is queued before this method returns.
    fn write_line(&self, text: &str) -> BoxFuture<'static, Result<()>>;
}

impl Transport for Connection {
    fn is_open(&self) -> bool {
        Connection::is_open(self)
    }

    fn peer(&self) -> &str {
        Connection::peer(self)
    }

    fn subscribe_lines(&self, handler: LineHandler) -> Subscription {
        self.subscribe_handler(handler)
    }

    fn write_line(&self, text: &str) -> BoxFuture<'static, Result<()>> {
        Box::pin(Connection::write_line(self, text))
    }
}
