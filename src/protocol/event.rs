//! Typed status events.
//!
//! Events are immutable value records produced by the wire parser from
//! `S:` status broadcasts and from the `R:` replies that share their
//! layout (`R:GETLOAD`, `R:GETLED`, `R:GETTASK`, `R:GETTHERMTEMP`).
//!
//! # Event Types
//!
//! | Kind | Lines | Record |
//! |------|-------|--------|
//! | `Load` | `S:LOAD`, `R:GETLOAD` | [`LoadUpdate`] |
//! | `Led` | `S:LED`, `R:GETLED` | [`LedUpdate`] |
//! | `Task` | `S:TASK`, `R:GETTASK` | [`TaskUpdate`] |
//! | `Button` | `S:BTN` | [`ButtonUpdate`] |
//! | `Temperature` | `R:GETTHERMTEMP` | [`TemperatureUpdate`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::Vid;

// ============================================================================
// Value Enums
// ============================================================================

/// Physical button transition reported by `S:BTN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonAction {
    /// Button pressed down.
    Press,
    /// Button released.
    Release,
}

impl ButtonAction {
    /// Returns the wire token.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Press => "PRESS",
            Self::Release => "RELEASE",
        }
    }

    /// Parses a wire token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "PRESS" => Some(Self::Press),
            "RELEASE" => Some(Self::Release),
            _ => None,
        }
    }
}

/// LED blink rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlinkRate {
    /// Fast blinking.
    Fast,
    /// Medium blinking.
    Medium,
    /// Slow blinking.
    Slow,
    /// Very slow blinking.
    VerySlow,
    /// Steady, no blinking.
    Off,
}

impl BlinkRate {
    /// Returns the wire token as reported in status lines.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "FAST",
            Self::Medium => "MEDIUM",
            Self::Slow => "SLOW",
            Self::VerySlow => "VERYSLOW",
            Self::Off => "OFF",
        }
    }

    /// Parses a wire token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "FAST" => Some(Self::Fast),
            "MEDIUM" => Some(Self::Medium),
            "SLOW" => Some(Self::Slow),
            "VERYSLOW" => Some(Self::VerySlow),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Thermostat sensor or setpoint reported by `R:GETTHERMTEMP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureSensor {
    /// Cooling setpoint.
    Cool,
    /// Heating setpoint.
    Heat,
    /// Indoor temperature.
    Indoor,
    /// Outdoor temperature.
    Outdoor,
}

impl TemperatureSensor {
    /// Returns the wire token.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cool => "COOL",
            Self::Heat => "HEAT",
            Self::Indoor => "INDOOR",
            Self::Outdoor => "OUTDOOR",
        }
    }

    /// Parses a wire token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "COOL" => Some(Self::Cool),
            "HEAT" => Some(Self::Heat),
            "INDOOR" => Some(Self::Indoor),
            "OUTDOOR" => Some(Self::Outdoor),
            _ => None,
        }
    }
}

impl fmt::Display for TemperatureSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// LedState
// ============================================================================

/// An RGB triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl Rgb {
    /// Creates an RGB triple.
    #[inline]
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Full state of a keypad LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedState {
    /// On/off/blink state code reported by the controller.
    pub state: i32,
    /// Steady color.
    pub color: Rgb,
    /// Alternate color shown while blinking.
    pub blink_color: Rgb,
    /// Blink rate.
    pub blink_rate: BlinkRate,
}

// ============================================================================
// Update Records
// ============================================================================

/// A lighting load changed level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadUpdate {
    /// Load id.
    pub vid: Vid,
    /// Level in percent. Not clamped; the controller may report > 100.
    pub percent: f32,
}

/// An LED changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedUpdate {
    /// LED id.
    pub vid: Vid,
    /// New LED state.
    pub state: LedState,
}

/// A task changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// Task id.
    pub vid: Vid,
    /// New state code.
    pub state: i32,
}

/// A keypad button was pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonUpdate {
    /// Button id.
    pub vid: Vid,
    /// Transition.
    pub action: ButtonAction,
}

/// A thermostat reported a temperature or setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureUpdate {
    /// Thermostat id.
    pub vid: Vid,
    /// Which reading this is.
    pub sensor: TemperatureSensor,
    /// Temperature value.
    pub value: f32,
}

// ============================================================================
// StatusEvent
// ============================================================================

/// Kind of a [`StatusEvent`], in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// [`LoadUpdate`].
    Load,
    /// [`LedUpdate`].
    Led,
    /// [`TaskUpdate`].
    Task,
    /// [`ButtonUpdate`].
    Button,
    /// [`TemperatureUpdate`].
    Temperature,
}

/// Any typed event produced from a received line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatusEvent {
    /// Load level change.
    Load(LoadUpdate),
    /// LED state change.
    Led(LedUpdate),
    /// Task state change.
    Task(TaskUpdate),
    /// Button transition.
    Button(ButtonUpdate),
    /// Thermostat reading.
    Temperature(TemperatureUpdate),
}

impl StatusEvent {
    /// Returns the event kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Load(_) => EventKind::Load,
            Self::Led(_) => EventKind::Led,
            Self::Task(_) => EventKind::Task,
            Self::Button(_) => EventKind::Button,
            Self::Temperature(_) => EventKind::Temperature,
        }
    }

    /// Returns the id of the object the event concerns.
    #[inline]
    #[must_use]
    pub const fn vid(&self) -> Vid {
        match self {
            Self::Load(e) => e.vid,
            Self::Led(e) => e.vid,
            Self::Task(e) => e.vid,
            Self::Button(e) => e.vid,
            Self::Temperature(e) => e.vid,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
