//! Protocol engine.
//!
//! A [`Control`] sits on one controller connection. Every received line
//! goes two ways, in arrival order:
//!
//! - **Events**: status lines (and their query-reply twins) are parsed
//!   into [`StatusEvent`](crate::protocol::StatusEvent)s and delivered to
//!   subscribers. Malformed lines are logged and dropped.
//! - **Replies**: lines are matched against outstanding
//!   [`send_and_wait`](Control::send_and_wait) registrations by reply
//!   prefix.
//!
//! When the connection closes the control disconnects exactly once:
//! pending requests fail, disconnect handlers run, and event delivery
//! stops.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Control struct, dispatch, `send_and_wait` |
//! | `events` | Typed event subscriptions and streams |
//! | `pending` | Reply correlation table |
//! | `query` | Typed commands and queries |
//!
//! # Example
//!
//! ```no_run
//! use vantage_control::{Command, ConnectOptions, Control, Result, Vid};
//!
//! # async fn example() -> Result<()> {
//! let control = Control::connect("192.168.1.50", &ConnectOptions::default()).await?;
//!
//! let _presses = control.on_button_update(|update| {
//!     println!("button {} {:?}", update.vid, update.action);
//! });
//!
//! control
//!     .execute(&Command::Load { vid: Vid::new(219), percent: 75.0 })
//!     .await?;
//! let level = control.get_load(Vid::new(219)).await?;
//! println!("load 219 at {level}%");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod events;
mod pending;
mod query;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Control;
