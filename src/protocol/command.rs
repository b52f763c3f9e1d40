//! Outgoing command vocabulary.
//!
//! [`Command`] renders each controller verb to its wire text via
//! [`Display`](std::fmt::Display) and, for query verbs, names the reply
//! prefix that answers it.
//!
//! # Example
//!
//! ```
//! use vantage_control::protocol::Command;
//! use vantage_control::Vid;
//!
//! let cmd = Command::GetLoad { vid: Vid::new(219) };
//! assert_eq!(cmd.to_string(), "GETLOAD 219");
//! assert_eq!(cmd.reply_prefix().as_deref(), Some("R:GETLOAD 219"));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::Vid;

use super::REPLY_PREFIX;
use super::event::{BlinkRate, Rgb, TemperatureSensor};

// ============================================================================
// Value Enums
// ============================================================================

/// Mode argument of the `TASK` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskMode {
    /// Reboot the task's station.
    Boot,
    /// Cancel a running task.
    Cancel,
    /// Station connected.
    Connect,
    /// Thermostat day mode changed.
    DayMode,
    /// Station disconnected.
    Disconnect,
    /// Thermostat fan mode changed.
    FanMode,
    /// Button held.
    Hold,
    /// Value entered its range.
    InRange,
    /// Learn the current scene.
    Learn,
    /// No trigger.
    None,
    /// Thermostat operating mode changed.
    OperationMode,
    /// Value left its range.
    OutOfRange,
    /// Position changed.
    Position,
    /// Button pressed.
    Press,
    /// Button released.
    Release,
    /// Temperature changed.
    Temperature,
    /// Timer fired.
    Timer,
}

impl TaskMode {
    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "BOOT",
            Self::Cancel => "CANCEL",
            Self::Connect => "CONNECT",
            Self::DayMode => "DAYMODE",
            Self::Disconnect => "DISCONNECT",
            Self::FanMode => "FANMODE",
            Self::Hold => "HOLD",
            Self::InRange => "INRANGE",
            Self::Learn => "LEARN",
            Self::None => "NONE",
            Self::OperationMode => "OPERATIONMODE",
            Self::OutOfRange => "OUTOFRANGE",
            Self::Position => "POSITION",
            Self::Press => "PRESS",
            Self::Release => "RELEASE",
            Self::Temperature => "TEMPERATURE",
            Self::Timer => "TIMER",
        }
    }
}

/// How a button command exercises the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonMode {
    /// `BTNPRESS`.
    Press,
    /// `BTNRELEASE`.
    Release,
    /// `BTN`: press followed by release.
    PressRelease,
}

/// Thermostat operating mode for `THERMOP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThermostatMode {
    /// Heating and cooling disabled.
    Off,
    /// Cooling only.
    Cool,
    /// Heating only.
    Heat,
    /// Switch between heating and cooling as needed.
    Auto,
}

impl ThermostatMode {
    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Cool => "COOL",
            Self::Heat => "HEAT",
            Self::Auto => "AUTO",
        }
    }
}

/// Which setpoint `THERMTEMP` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetpointKind {
    /// Cooling setpoint.
    Cool,
    /// Heating setpoint.
    Heat,
}

impl SetpointKind {
    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cool => "COOL",
            Self::Heat => "HEAT",
        }
    }
}

/// Value written by `VARIABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableValue {
    /// Integer variable.
    Integer(i64),
    /// Text variable, quoted on the wire.
    Text(String),
}

// ============================================================================
// Command
// ============================================================================

/// A command understood by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Set a load level immediately.
    Load {
        /// Target object.
        vid: Vid,
        /// Level in percent.
        percent: f32,
    },
    /// Ramp a load to a level over `seconds`.
    RampLoad {
        /// Target object.
        vid: Vid,
        /// Level in percent.
        percent: f32,
        /// Ramp duration in seconds.
        seconds: f32,
    },
    /// Query a load level.
    GetLoad {
        /// Target object.
        vid: Vid,
    },
    /// Set an LED.
    Led {
        /// Target object.
        vid: Vid,
        /// Steady color.
        color: Rgb,
        /// Color shown on the blink phase.
        blink_color: Rgb,
        /// Blink rate.
        rate: BlinkRate,
    },
    /// Query an LED.
    GetLed {
        /// Target object.
        vid: Vid,
    },
    /// Run a task in the given mode.
    Task {
        /// Target object.
        vid: Vid,
        /// Task trigger mode.
        mode: TaskMode,
    },
    /// Query a task state.
    GetTask {
        /// Target object.
        vid: Vid,
    },
    /// Exercise a keypad button.
    Button {
        /// Target object.
        vid: Vid,
        /// Press, release or both.
        mode: ButtonMode,
    },
    /// Write a thermostat setpoint.
    ThermostatSetpoint {
        /// Target object.
        vid: Vid,
        /// Setpoint to write.
        kind: SetpointKind,
        /// Setpoint temperature.
        value: f32,
    },
    /// Query a thermostat temperature or setpoint.
    GetThermostatTemperature {
        /// Target object.
        vid: Vid,
        /// Sensor or setpoint to read.
        sensor: TemperatureSensor,
    },
    /// Set the fan to always on (`true`) or automatic.
    ThermostatFan {
        /// Target object.
        vid: Vid,
        /// `true` for always on.
        on: bool,
    },
    /// Set the thermostat operating mode.
    ThermostatMode {
        /// Target object.
        vid: Vid,
        /// Operating mode.
        mode: ThermostatMode,
    },
    /// Switch the thermostat between night (`true`) and day schedule.
    ThermostatNightMode {
        /// Target object.
        vid: Vid,
        /// `true` for the night schedule.
        night: bool,
    },
    /// Write a variable.
    Variable {
        /// Target object.
        vid: Vid,
        /// Value to store.
        value: VariableValue,
    },
    /// Move a blind to a position.
    BlindPosition {
        /// Target object.
        vid: Vid,
        /// Target position.
        position: i32,
    },
    /// Query the firmware version.
    Version,
    /// Pre-formatted command text, sent verbatim.
    Raw(String),
}

impl Command {
    /// Returns the reply prefix answering this command, for query verbs.
    ///
    /// Fire-and-forget verbs return `None`.
    #[must_use]
    pub fn reply_prefix(&self) -> Option<String> {
        match self {
            Self::GetLoad { vid } => Some(format!("{REPLY_PREFIX}GETLOAD {vid}")),
            Self::GetLed { vid } => Some(format!("{REPLY_PREFIX}GETLED {vid}")),
            Self::GetTask { vid } => Some(format!("{REPLY_PREFIX}GETTASK {vid}")),
            Self::GetThermostatTemperature { vid, sensor } => {
                Some(format!("{REPLY_PREFIX}GETTHERMTEMP {vid} {sensor}"))
            }
            Self::Version => Some(format!("{REPLY_PREFIX}VERSION")),
            Self::Raw(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| format!("{REPLY_PREFIX}{text}"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { vid, percent } => write!(f, "LOAD {vid} {:.0}", percent.round()),
            Self::RampLoad {
                vid,
                percent,
                seconds,
            } => write!(f, "RAMPLOAD {vid} {:.0} {seconds:.1}", percent.round()),
            Self::GetLoad { vid } => write!(f, "GETLOAD {vid}"),
            Self::Led {
                vid,
                color,
                blink_color,
                rate,
            } => write!(
                f,
                "LED {vid} {} {} {} {} {} {} {}",
                color.red,
                color.green,
                color.blue,
                blink_color.red,
                blink_color.green,
                blink_color.blue,
                rate.as_str().to_ascii_lowercase()
            ),
            Self::GetLed { vid } => write!(f, "GETLED {vid}"),
            Self::Task { vid, mode } => write!(f, "TASK {vid} {}", mode.as_str()),
            Self::GetTask { vid } => write!(f, "GETTASK {vid}"),
            Self::Button { vid, mode } => match mode {
                ButtonMode::Press => write!(f, "BTNPRESS {vid}"),
                ButtonMode::Release => write!(f, "BTNRELEASE {vid}"),
                ButtonMode::PressRelease => write!(f, "BTN {vid}"),
            },
            Self::ThermostatSetpoint { vid, kind, value } => {
                write!(f, "THERMTEMP {vid} {} {value:.1}", kind.as_str())
            }
            Self::GetThermostatTemperature { vid, sensor } => {
                write!(f, "GETTHERMTEMP {vid} {sensor}")
            }
            Self::ThermostatFan { vid, on } => {
                write!(f, "THERMFAN {vid} {}", if *on { "ON" } else { "AUTO" })
            }
            Self::ThermostatMode { vid, mode } => write!(f, "THERMOP {vid} {}", mode.as_str()),
            Self::ThermostatNightMode { vid, night } => {
                write!(f, "THERMDAY {vid} {}", if *night { "NIGHT" } else { "DAY" })
            }
            Self::Variable { vid, value } => match value {
                VariableValue::Integer(n) => write!(f, "VARIABLE {vid} {n}"),
                VariableValue::Text(s) => write!(f, "VARIABLE {vid} \"{}\"", s.replace('"', "\"\"")),
            },
            Self::BlindPosition { vid, position } => write!(f, "BLIND {vid} POS {position}"),
            Self::Version => f.write_str("VERSION"),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vid(n: u32) -> Vid {
        Vid::new(n)
    }

    #[test]
    fn test_load_rounds_percent() {
        let cmd = Command::Load {
            vid: vid(219),
            percent: 49.5,
        };
        assert_eq!(cmd.to_string(), "LOAD 219 50");

        let cmd = Command::Load {
            vid: vid(219),
            percent: 200.0,
        };
        assert_eq!(cmd.to_string(), "LOAD 219 200");
    }

    #[test]
    fn test_ramp_load() {
        let cmd = Command::RampLoad {
            vid: vid(219),
            percent: 75.0,
            seconds: 2.5,
        };
        assert_eq!(cmd.to_string(), "RAMPLOAD 219 75 2.5");
    }

    #[test]
    fn test_led() {
        let cmd = Command::Led {
            vid: vid(1591),
            color: Rgb::new(255, 0, 0),
            blink_color: Rgb::new(0, 0, 255),
            rate: BlinkRate::VerySlow,
        };
        assert_eq!(cmd.to_string(), "LED 1591 255 0 0 0 0 255 veryslow");
        assert_eq!(cmd.reply_prefix(), None);
    }

    #[test]
    fn test_button_modes() {
        let press = Command::Button {
            vid: vid(8),
            mode: ButtonMode::Press,
        };
        let release = Command::Button {
            vid: vid(8),
            mode: ButtonMode::Release,
        };
        let both = Command::Button {
            vid: vid(8),
            mode: ButtonMode::PressRelease,
        };
        assert_eq!(press.to_string(), "BTNPRESS 8");
        assert_eq!(release.to_string(), "BTNRELEASE 8");
        assert_eq!(both.to_string(), "BTN 8");
    }

    #[test]
    fn test_thermostat_commands() {
        let setpoint = Command::ThermostatSetpoint {
            vid: vid(44),
            kind: SetpointKind::Heat,
            value: 68.0,
        };
        assert_eq!(setpoint.to_string(), "THERMTEMP 44 HEAT 68.0");

        let fan = Command::ThermostatFan { vid: vid(44), on: false };
        assert_eq!(fan.to_string(), "THERMFAN 44 AUTO");

        let mode = Command::ThermostatMode {
            vid: vid(44),
            mode: ThermostatMode::Cool,
        };
        assert_eq!(mode.to_string(), "THERMOP 44 COOL");

        let night = Command::ThermostatNightMode {
            vid: vid(44),
            night: true,
        };
        assert_eq!(night.to_string(), "THERMDAY 44 NIGHT");
    }

    #[test]
    fn test_variable_text_is_quoted() {
        let cmd = Command::Variable {
            vid: vid(12),
            value: VariableValue::Text("say \"hi\"".into()),
        };
        assert_eq!(cmd.to_string(), "VARIABLE 12 \"say \"\"hi\"\"\"");

        let cmd = Command::Variable {
            vid: vid(12),
            value: VariableValue::Integer(-4),
        };
        assert_eq!(cmd.to_string(), "VARIABLE 12 -4");
    }

    #[test]
    fn test_task_and_blind() {
        let task = Command::Task {
            vid: vid(300),
            mode: TaskMode::Press,
        };
        assert_eq!(task.to_string(), "TASK 300 PRESS");

        let blind = Command::BlindPosition {
            vid: vid(9),
            position: 40,
        };
        assert_eq!(blind.to_string(), "BLIND 9 POS 40");
    }

    #[test]
    fn test_reply_prefixes() {
        let therm = Command::GetThermostatTemperature {
            vid: vid(44),
            sensor: TemperatureSensor::Outdoor,
        };
        assert_eq!(therm.to_string(), "GETTHERMTEMP 44 OUTDOOR");
        assert_eq!(
            therm.reply_prefix().as_deref(),
            Some("R:GETTHERMTEMP 44 OUTDOOR")
        );
        assert_eq!(Command::Version.reply_prefix().as_deref(), Some("R:VERSION"));
        assert_eq!(
            Command::Raw("GETVARIABLE 12".into()).reply_prefix().as_deref(),
            Some("R:GETVARIABLE 12")
        );
        assert_eq!(Command::Raw(String::new()).reply_prefix(), None);
    }
}
