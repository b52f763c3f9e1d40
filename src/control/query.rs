//! Typed commands and queries.

use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::Vid;
use crate::protocol::parser::{
    parse_led, parse_load, parse_task, parse_thermostat_temperature, parse_version,
};
use crate::protocol::{Command, LedState, TemperatureSensor};

use super::Control;

// ============================================================================
// Control - Commands
// ============================================================================

impl Control {
    /// Sends a command without waiting for a reply.
    ///
    /// # Errors
    ///
    /// See [`write_line`](Self::write_line).
    pub async fn execute(&self, command: &Command) -> Result<()> {
        let text = command.to_string();
        debug!(peer = %self.peer(), command = %text, "Executing");
        self.write_line(&text).await
    }

    /// Sends a query command and returns its raw reply line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `command` has no reply, plus
    /// the errors of [`send_and_wait`](Self::send_and_wait).
    pub async fn request(&self, command: &Command) -> Result<String> {
        let prefix = command.reply_prefix().ok_or_else(|| {
            Error::invalid_argument(format!("'{command}' does not produce a reply"))
        })?;
        self.send_and_wait(&command.to_string(), &prefix).await
    }
}

// ============================================================================
// Control - Queries
// ============================================================================

impl Control {
    /// Reads a load level in percent, unclamped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the reply is malformed, plus the errors
    /// of [`send_and_wait`](Self::send_and_wait).
    pub async fn get_load(&self, vid: Vid) -> Result<f32> {
        let reply = self.request(&Command::GetLoad { vid }).await?;
        Ok(parse_load(&reply)?.percent)
    }

    /// Reads an LED's state.
    ///
    /// # Errors
    ///
    /// Same as [`get_load`](Self::get_load).
    pub async fn get_led(&self, vid: Vid) -> Result<LedState> {
        let reply = self.request(&Command::GetLed { vid }).await?;
        Ok(parse_led(&reply)?.state)
    }

    /// Reads a task's state code.
    ///
    /// # Errors
    ///
    /// Same as [`get_load`](Self::get_load).
    pub async fn get_task(&self, vid: Vid) -> Result<i32> {
        let reply = self.request(&Command::GetTask { vid }).await?;
        Ok(parse_task(&reply)?.state)
    }

    /// Reads a thermostat temperature or setpoint.
    ///
    /// # Errors
    ///
    /// Same as [`get_load`](Self::get_load).
    pub async fn get_thermostat_temperature(
        &self,
        vid: Vid,
        sensor: TemperatureSensor,
    ) -> Result<f32> {
        let reply = self
            .request(&Command::GetThermostatTemperature { vid, sensor })
            .await?;
        Ok(parse_thermostat_temperature(&reply)?.value)
    }

    /// Reads the controller firmware version.
    ///
    /// # Errors
    ///
    /// Same as [`get_load`](Self::get_load).
    pub async fn version(&self) -> Result<String> {
        let reply = self.request(&Command::Version).await?;
        Ok(parse_version(&reply)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    use crate::protocol::{BlinkRate, Rgb, TaskMode};
    use crate::transport::Connection;

    /// Minimal scripted controller: answers each request with a fixed reply.
    async fn answer(remote: &mut BufReader<DuplexStream>, expected: &str, reply: &str) {
        let mut line = String::new();
        remote.read_line(&mut line).await.expect("read");
        assert_eq!(line, format!("{expected}\r\n"));
        remote
            .get_mut()
            .write_all(format!("{reply}\r\n").as_bytes())
            .await
            .expect("reply");
    }

    fn control_pair() -> (Control, BufReader<DuplexStream>) {
        let (local, remote) = tokio::io::duplex(4096);
        let control = Control::new(Connection::from_stream(local, "test")).expect("control");
        (control, BufReader::new(remote))
    }

    #[tokio::test]
    async fn test_get_load_passes_percent_through() {
        let (control, mut remote) = control_pair();

        for percent in ["0", "100", "200", "37.5"] {
            let reply_line = format!("R:GETLOAD 219 {percent}");
            let (level, ()) = tokio::join!(
                control.get_load(Vid::new(219)),
                answer(&mut remote, "GETLOAD 219", &reply_line),
            );
            let expected: f32 = percent.parse().expect("number");
            assert_eq!(level.expect("get_load"), expected);
        }
    }

    #[tokio::test]
    async fn test_get_led() {
        let (control, mut remote) = control_pair();

        let (state, ()) = tokio::join!(
            control.get_led(Vid::new(1591)),
            answer(&mut remote, "GETLED 1591", "R:GETLED 1591 1 255 128 0 1 2 3 FAST"),
        );
        let state = state.expect("get_led");
        assert_eq!(state.state, 1);
        assert_eq!(state.color, Rgb::new(255, 128, 0));
        assert_eq!(state.blink_color, Rgb::new(1, 3, 2));
        assert_eq!(state.blink_rate, BlinkRate::Fast);
    }

    #[tokio::test]
    async fn test_get_task_and_version() {
        let (control, mut remote) = control_pair();

        let (state, ()) = tokio::join!(
            control.get_task(Vid::new(40)),
            answer(&mut remote, "GETTASK 40", "R:GETTASK 40 3"),
        );
        assert_eq!(state.expect("get_task"), 3);

        let (version, ()) = tokio::join!(
            control.version(),
            answer(&mut remote, "VERSION", "R:VERSION 3.2.1"),
        );
        assert_eq!(version.expect("version"), "3.2.1");
    }

    #[tokio::test]
    async fn test_thermostat_sensors_do_not_collide() {
        let (local, remote) = tokio::io::duplex(4096);
        let control = Arc::new(Control::new(Connection::from_stream(local, "test")).expect("control"));
        let mut remote = BufReader::new(remote);

        let heat = tokio::spawn({
            let control = Arc::clone(&control);
            async move {
                control
                    .get_thermostat_temperature(Vid::new(9), TemperatureSensor::Heat)
                    .await
            }
        });
        let indoor = tokio::spawn({
            let control = Arc::clone(&control);
            async move {
                control
                    .get_thermostat_temperature(Vid::new(9), TemperatureSensor::Indoor)
                    .await
            }
        });

        let mut line = String::new();
        remote.read_line(&mut line).await.expect("read");
        remote.read_line(&mut line).await.expect("read");

        remote
            .get_mut()
            .write_all(b"R:GETTHERMTEMP 9 INDOOR 70.5\r\nR:GETTHERMTEMP 9 HEAT 66.0\r\n")
            .await
            .expect("reply");

        assert_eq!(indoor.await.expect("join").expect("indoor"), 70.5);
        assert_eq!(heat.await.expect("join").expect("heat"), 66.0);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_parse_error() {
        let (control, mut remote) = control_pair();

        let (level, ()) = tokio::join!(
            control.get_load(Vid::new(219)),
            answer(&mut remote, "GETLOAD 219", "R:GETLOAD 219"),
        );
        assert!(matches!(level, Err(Error::Parse(_))));
        assert!(control.is_connected());
    }

    #[tokio::test]
    async fn test_execute_writes_command_text() {
        let (control, mut remote) = control_pair();

        control
            .execute(&Command::Task {
                vid: Vid::new(12),
                mode: TaskMode::Press,
            })
            .await
            .expect("execute");

        let mut line = String::new();
        remote.read_line(&mut line).await.expect("read");
        assert_eq!(line, "TASK 12 PRESS\r\n");
    }

    #[tokio::test]
    async fn test_request_rejects_fire_and_forget() {
        let (control, _remote) = control_pair();

        let err = control
            .request(&Command::Load {
                vid: Vid::new(1),
                percent: 50.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(control.pending_count(), 0);
    }
}
