//! Vantage control - async client for the Vantage controller line protocol.
//!
//! This library talks to a Vantage lighting/HVAC controller over its
//! ASCII control port: it sends commands, correlates replies, and streams
//! unsolicited status changes (load levels, button presses, LEDs, tasks,
//! thermostat readings) to subscribers.
//!
//! # Architecture
//!
//! The client is layered, leaves first:
//!
//! - **Wire parser** ([`protocol`]): pure functions turning lines into typed events
//! - **Connection** ([`Connection`]): one socket, framed into `\r\n` lines, with a
//!   FIFO writer and a read loop broadcasting every line
//! - **Pool** ([`ConnectionPool`]): one shared connection per host, leased to many
//!   callers and reclaimed when idle
//! - **Control** ([`Control`]): reply correlation plus typed event fan-out
//!
//! Key design principles:
//!
//! - One socket per controller, shared, never written concurrently
//! - Lines are processed strictly in arrival order
//! - Cancellation is dropping the future
//! - Disposal is idempotent everywhere
//!
//! # Quick Start
//!
//! ```no_run
//! use vantage_control::{ConnectOptions, Control, Result, Vid};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let control = Control::connect("192.168.1.50", &ConnectOptions::default()).await?;
//!
//!     let _loads = control.on_load_update(|update| {
//!         println!("load {} -> {}%", update.vid, update.percent);
//!     });
//!
//!     println!("firmware {}", control.version().await?);
//!     println!("load 219 at {}%", control.get_load(Vid::new(219)).await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`control`] | Protocol engine: [`Control`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Controller object ids ([`Vid`]) |
//! | [`protocol`] | Wire constants, parser, events and commands |
//! | [`subscription`] | Subscription handles and notification streams |
//! | [`transport`] | Connection, pool and options |

// ============================================================================
// Modules
// ============================================================================

/// Protocol engine.
///
/// Use [`Control::connect`] or [`Control::new`] to start one.
pub mod control;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Controller object identifiers.
pub mod identifiers;

/// Wire format: constants, parser, typed events and commands.
pub mod protocol;

/// Subscription handles and notification streams.
pub mod subscription;

/// Line transport: connection, pool and options.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine
pub use control::Control;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::Vid;

// Protocol types
pub use protocol::{
    BlinkRate, ButtonAction, ButtonMode, ButtonUpdate, Command, EventKind, LedState, LedUpdate,
    LoadUpdate, ParseError, Rgb, SetpointKind, StatusEvent, TaskMode, TaskUpdate,
    TemperatureSensor, TemperatureUpdate, ThermostatMode, VariableValue,
};

// Subscription types
pub use subscription::{Notifications, Subscription};

// Transport types
pub use transport::{
    ConnectOptions, Connection, ConnectionPool, Connector, LineEvent, LineHandler, PoolOptions,
    PooledConnection, TcpConnector, Transport,
};
