//! Wire parser for reply and status lines.
//!
//! Pure functions: each takes a line already known (by prefix) to belong
//! to a category and returns a typed record, or a [`ParseError`] when a
//! field is missing or malformed.
//!
//! Fields are separated by whitespace; field 0 is the prefix token
//! (`S:LOAD`, `R:GETLOAD`, ...).
//!
//! | Prefix | Fields |
//! |--------|--------|
//! | `S:LOAD` / `R:GETLOAD` | id, percent |
//! | `S:TASK` / `R:GETTASK` | id, state |
//! | `S:BTN` | id, `PRESS`/`RELEASE` |
//! | `S:LED` / `R:GETLED` | id, state, r, g, b, r-blink, b-blink, g-blink, rate |
//! | `R:GETTHERMTEMP` | id, sensor, temperature |
//! | `R:VERSION` | version |

// ============================================================================
// Imports
// ============================================================================

use std::str::{FromStr, SplitAsciiWhitespace};

use thiserror::Error;

use crate::identifiers::Vid;

use super::event::{
    BlinkRate, ButtonAction, ButtonUpdate, EventKind, LedState, LedUpdate, LoadUpdate, Rgb,
    StatusEvent, TaskUpdate, TemperatureSensor, TemperatureUpdate,
};

// ============================================================================
// Constants
// ============================================================================

/// Line prefixes that carry a typed event, tested in order.
///
/// Status and direct-reply variants of the same record share a kind.
pub const EVENT_LINE_PREFIXES: &[(&str, EventKind)] = &[
    ("S:LOAD ", EventKind::Load),
    ("R:GETLOAD ", EventKind::Load),
    ("S:TASK ", EventKind::Task),
    ("R:GETTASK ", EventKind::Task),
    ("S:BTN ", EventKind::Button),
    ("S:LED ", EventKind::Led),
    ("R:GETLED ", EventKind::Led),
    ("R:GETTHERMTEMP ", EventKind::Temperature),
];

// ============================================================================
// ParseError
// ============================================================================

/// Format error for a single received line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required field is absent.
    #[error("missing field '{field}' in line '{line}'")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
        /// The offending line.
        line: String,
    },

    /// A numeric field could not be parsed.
    #[error("invalid number for '{field}': '{value}'")]
    InvalidNumber {
        /// Name of the field.
        field: &'static str,
        /// Raw field text.
        value: String,
    },

    /// An enumerated field holds an unknown token.
    #[error("unknown {field} token '{value}'")]
    UnknownToken {
        /// Name of the field.
        field: &'static str,
        /// Raw field text.
        value: String,
    },

    /// The line does not belong to any known category.
    #[error("unrecognized line '{line}'")]
    UnknownLine {
        /// The offending line.
        line: String,
    },
}

impl ParseError {
    /// Creates an invalid number error.
    #[inline]
    pub fn invalid_number(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            field,
            value: value.into(),
        }
    }

    /// Creates an unknown token error.
    #[inline]
    pub fn unknown_token(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownToken {
            field,
            value: value.into(),
        }
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Cursor over the fields of one line, after its prefix token.
struct Fields<'a> {
    line: &'a str,
    parts: SplitAsciiWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        let mut parts = line.split_ascii_whitespace();
        parts.next();
        Self { line, parts }
    }

    fn next(&mut self, field: &'static str) -> Result<&'a str, ParseError> {
        self.parts.next().ok_or_else(|| ParseError::MissingField {
            field,
            line: self.line.to_string(),
        })
    }

    fn number<T: FromStr>(&mut self, field: &'static str) -> Result<T, ParseError> {
        let raw = self.next(field)?;
        raw.parse::<T>()
            .map_err(|_| ParseError::invalid_number(field, raw))
    }

    fn vid(&mut self) -> Result<Vid, ParseError> {
        self.next("vid")?.parse()
    }
}

// ============================================================================
// Record Parsers
// ============================================================================

/// Parses `S:LOAD <id> <percent>` / `R:GETLOAD <id> <percent>`.
///
/// The percent is passed through unmodified, without clamping.
pub fn parse_load(line: &str) -> Result<LoadUpdate, ParseError> {
    let mut fields = Fields::new(line);
    Ok(LoadUpdate {
        vid: fields.vid()?,
        percent: fields.number("percent")?,
    })
}

/// Parses `S:TASK <id> <state>` / `R:GETTASK <id> <state>`.
pub fn parse_task(line: &str) -> Result<TaskUpdate, ParseError> {
    let mut fields = Fields::new(line);
    Ok(TaskUpdate {
        vid: fields.vid()?,
        state: fields.number("state")?,
    })
}

/// Parses `S:BTN <id> PRESS|RELEASE`.
pub fn parse_button(line: &str) -> Result<ButtonUpdate, ParseError> {
    let mut fields = Fields::new(line);
    let vid = fields.vid()?;
    let raw = fields.next("action")?;
    let action =
        ButtonAction::from_token(raw).ok_or_else(|| ParseError::unknown_token("action", raw))?;
    Ok(ButtonUpdate { vid, action })
}

/// Parses `S:LED` / `R:GETLED`.
///
/// Wire layout after the id: `state r g b r-blink b-blink g-blink rate`.
/// The blink triple arrives with blue before green.
pub fn parse_led(line: &str) -> Result<LedUpdate, ParseError> {
    let mut fields = Fields::new(line);
    let vid = fields.vid()?;
    let state = fields.number("state")?;
    let color = Rgb {
        red: fields.number("red")?,
        green: fields.number("green")?,
        blue: fields.number("blue")?,
    };
    let blink_red = fields.number("red_blink")?;
    let blink_blue = fields.number("blue_blink")?;
    let blink_green = fields.number("green_blink")?;
    let raw_rate = fields.next("blink_rate")?;
    let blink_rate = BlinkRate::from_token(raw_rate)
        .ok_or_else(|| ParseError::unknown_token("blink_rate", raw_rate))?;

    Ok(LedUpdate {
        vid,
        state: LedState {
            state,
            color,
            blink_color: Rgb::new(blink_red, blink_green, blink_blue),
            blink_rate,
        },
    })
}

/// Parses `R:GETTHERMTEMP <id> COOL|HEAT|INDOOR|OUTDOOR <temperature>`.
pub fn parse_thermostat_temperature(line: &str) -> Result<TemperatureUpdate, ParseError> {
    let mut fields = Fields::new(line);
    let vid = fields.vid()?;
    let raw = fields.next("sensor")?;
    let sensor =
        TemperatureSensor::from_token(raw).ok_or_else(|| ParseError::unknown_token("sensor", raw))?;
    Ok(TemperatureUpdate {
        vid,
        sensor,
        value: fields.number("temperature")?,
    })
}

/// Parses `R:VERSION <version>` and returns the version token.
pub fn parse_version(line: &str) -> Result<String, ParseError> {
    Fields::new(line).next("version").map(str::to_string)
}

// ============================================================================
// Classification
// ============================================================================

/// Returns the event kind a line belongs to, if any.
#[must_use]
pub fn classify(line: &str) -> Option<EventKind> {
    EVENT_LINE_PREFIXES
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix))
        .map(|&(_, kind)| kind)
}

/// Classifies and parses a line into a typed event.
///
/// Returns `None` for lines that carry no event (other replies, echoes,
/// status types this crate does not model). Returns `Some(Err(_))` when
/// the line was classified but its fields are malformed.
#[must_use]
pub fn parse_status_line(line: &str) -> Option<Result<StatusEvent, ParseError>> {
    let kind = classify(line)?;
    Some(parse_kind(kind, line))
}

/// Parses a line into a typed event, failing for unrecognized lines.
pub fn parse_event(line: &str) -> Result<StatusEvent, ParseError> {
    parse_status_line(line).unwrap_or_else(|| {
        Err(ParseError::UnknownLine {
            line: line.to_string(),
        })
    })
}

fn parse_kind(kind: EventKind, line: &str) -> Result<StatusEvent, ParseError> {
    match kind {
        EventKind::Load => parse_load(line).map(StatusEvent::Load),
        EventKind::Led => parse_led(line).map(StatusEvent::Led),
        EventKind::Task => parse_task(line).map(StatusEvent::Task),
        EventKind::Button => parse_button(line).map(StatusEvent::Button),
        EventKind::Temperature => parse_thermostat_temperature(line).map(StatusEvent::Temperature),
    }
}

// ============================================================================
// Tests
// ============================================================================
