//! Controller line protocol.
//!
//! This module defines the wire format spoken by the controller on its
//! control port: ASCII lines terminated by `\r\n`.
//!
//! # Protocol Overview
//!
//! | Line Kind | Direction | Example |
//! |-----------|-----------|---------|
//! | Command | Local → Controller | `GETLOAD 219` |
//! | Reply | Controller → Local | `R:GETLOAD 219 50.000` |
//! | Status | Controller → Local | `S:BTN 1402 PRESS` |
//!
//! `S:` lines are unsolicited broadcasts enabled by the handshake;
//! `R:` lines answer a command previously sent on the same socket.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed outgoing command vocabulary |
//! | `event` | Typed status events |
//! | `parser` | Line classification and field parsing |

// ============================================================================
// Submodules
// ============================================================================

/// Outgoing command vocabulary.
pub mod command;

/// Typed status events.
pub mod event;

/// Wire parser for reply and status lines.
pub mod parser;

// ============================================================================
// Constants
// ============================================================================

/// TCP port of the controller's ASCII control interface.
///
/// Older firmware notes mention 1234; every current controller listens here.
pub const DEFAULT_PORT: u16 = 3001;

/// Commands sent immediately after connecting.
///
/// `STATUS ALL` enables unsolicited status broadcasts for every object
/// type; `ECHO 0 INFUSION` selects the reply format the parser expects.
pub const HANDSHAKE: [&str; 2] = ["STATUS ALL", "ECHO 0 INFUSION"];

/// Line terminator on the wire, in both directions.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Longest line accepted from the controller, terminator excluded.
///
/// A peer exceeding it is treated as a read error and disconnected.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Prefix of unsolicited status lines.
pub const STATUS_PREFIX: &str = "S:";

/// Prefix of direct reply lines.
pub const REPLY_PREFIX: &str = "R:";

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{ButtonMode, Command, SetpointKind, TaskMode, ThermostatMode, VariableValue};
pub use event::{
    BlinkRate, ButtonAction, ButtonUpdate, EventKind, LedState, LedUpdate, LoadUpdate, Rgb,
    StatusEvent, TaskUpdate, TemperatureSensor, TemperatureUpdate,
};
pub use parser::ParseError;

// ============================================================================
// Helpers
// ============================================================================

/// Encodes a command line for the wire.
///
/// Appends [`LINE_TERMINATOR`] and replaces every non-ASCII character
/// with `?`.
#[must_use]
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
    bytes.extend(
        text.chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' }),
    );
    bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
    bytes
}

/// Decodes one received line, stripping the terminator.
///
/// Accepts a bare `\n` terminator as well. Invalid bytes are replaced
/// rather than rejected.
#[must_use]
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Normalizes an expected reply prefix so it ends with a field separator.
///
/// `R:GETLOAD 21` must not match `R:GETLOAD 219 ...`.
#[must_use]
pub fn normalize_reply_prefix(prefix: &str) -> String {
    if prefix.ends_with(' ') {
        prefix.to_string()
    } else {
        format!("{prefix} ")
    }
}

// ============================================================================
// Tests
// ============================================================================
