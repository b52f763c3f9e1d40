//! Core Control struct: construction, line dispatch and request correlation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::normalize_reply_prefix;
use crate::protocol::parser::parse_status_line;
use crate::protocol::StatusEvent;
use crate::subscription::{Subscribers, Subscription};
use crate::transport::{ConnectOptions, Connection, LineEvent, Transport};

use super::pending::{PendingGuard, PendingTable};

// ============================================================================
// Types
// ============================================================================

/// Typed event handler.
pub(crate) type EventHandler = dyn Fn(&StatusEvent) + Send + Sync;

/// Disconnect handler.
pub(crate) type DisconnectHandler = dyn Fn() + Send + Sync;

/// State shared between the [`Control`] and its line handlers.
pub(crate) struct ControlInner {
    /// Peer label for logging.
    pub(crate) peer: String,
    /// Set once, on the first observed disconnect.
    pub(crate) disconnected: AtomicBool,
    /// Outstanding `send_and_wait` registrations.
    pub(crate) pending: PendingTable,
    /// Typed event subscribers.
    pub(crate) event_handlers: Arc<Subscribers<EventHandler>>,
    /// Disconnect subscribers.
    pub(crate) disconnect_handlers: Arc<Subscribers<DisconnectHandler>>,
}

impl ControlInner {
    pub(crate) fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    /// Classifies a line and delivers its event, if any.
    fn handle_event_line(&self, line: &str) {
        if self.is_disconnected() {
            return;
        }

        match parse_status_line(line) {
            Some(Ok(event)) => {
                for handler in self.event_handlers.snapshot() {
                    handler(&event);
                }
            }
            Some(Err(e)) => {
                warn!(peer = %self.peer, line = %line, error = %e, "Dropping malformed status line");
            }
            None => {}
        }
    }

    /// Hands a line to the pending-request table.
    fn handle_reply_line(&self, line: &str) {
        let fulfilled = self.pending.dispatch(line);
        if fulfilled > 0 {
            trace!(peer = %self.peer, line = %line, fulfilled, "Reply matched");
        }
    }

    /// Transitions to disconnected. Returns `false` if already there.
    pub(crate) fn disconnect(&self) -> bool {
        if self
            .disconnected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let failed = self.pending.close();
        self.event_handlers.drain();
        let handlers = self.disconnect_handlers.drain();

        debug!(peer = %self.peer, failed, "Control disconnected");

        for handler in handlers {
            handler();
        }

        true
    }
}

// ============================================================================
// Control
// ============================================================================

/// Protocol engine bound to one controller connection.
///
/// Correlates commands with their replies and fans status lines out to
/// typed event subscribers. Once the connection closes, every pending
/// request fails with [`Error::ConnectionClosed`] and later requests
/// fail with [`Error::Disposed`].
///
/// Dropping the `Control` detaches it from the transport; an owned
/// [`Connection`] closes with it, a pooled one returns to its pool.
pub struct Control {
    pub(crate) inner: Arc<ControlInner>,
    transport: Box<dyn Transport>,
    _lines: [Subscription; 2],
}

// ============================================================================
// Control - Constructors
// ============================================================================

impl Control {
    /// Connects to a controller and starts the engine on the new connection.
    ///
    /// # Errors
    ///
    /// Returns the connect error; see [`Connection::connect`].
    pub async fn connect(host: &str, options: &ConnectOptions) -> Result<Self> {
        let connection = Connection::connect(host, options).await?;
        Self::new(connection)
    }

    /// Starts the engine on an established transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the transport is already closed.
    pub fn new(transport: impl Transport) -> Result<Self> {
        if !transport.is_open() {
            return Err(Error::invalid_argument(format!(
                "transport to {} is not open",
                transport.peer()
            )));
        }

        let inner = Arc::new(ControlInner {
            peer: transport.peer().to_string(),
            disconnected: AtomicBool::new(false),
            pending: PendingTable::default(),
            event_handlers: Arc::new(Subscribers::default()),
            disconnect_handlers: Arc::new(Subscribers::default()),
        });

        let events = {
            let inner = Arc::clone(&inner);
            transport.subscribe_lines(Arc::new(move |event: LineEvent<'_>| match event {
                LineEvent::Line(line) => inner.handle_event_line(line),
                LineEvent::Closed => {
                    inner.disconnect();
                }
            }))
        };

        let replies = {
            let inner = Arc::clone(&inner);
            transport.subscribe_lines(Arc::new(move |event: LineEvent<'_>| match event {
                LineEvent::Line(line) => inner.handle_reply_line(line),
                LineEvent::Closed => {
                    inner.disconnect();
                }
            }))
        };

        debug!(peer = %inner.peer, "Control started");

        Ok(Self {
            inner,
            transport: Box::new(transport),
            _lines: [events, replies],
        })
    }
}

// ============================================================================
// Control - Requests
// ============================================================================

impl Control {
    /// Returns `true` until the connection closes.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.inner.is_disconnected()
    }

    /// Returns the controller label.
    #[inline]
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.inner.peer
    }

    /// Returns the number of requests awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Writes a line without waiting for a reply.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] if the control is disconnected
    /// - Any write error from the transport
    pub async fn write_line(&self, text: &str) -> Result<()> {
        if self.inner.is_disconnected() {
            return Err(Error::disposed("control"));
        }
        self.transport.write_line(text).await
    }

    /// Sends a command and waits for the first line starting with
    /// `expected_prefix`.
    ///
    /// The prefix is normalized to end with a space, so `R:GETLOAD 21`
    /// never matches a reply for load 219. At most one request per
    /// distinct prefix should be outstanding at a time.
    ///
    /// Dropping the returned future cancels the wait and removes the
    /// registration; a write already on the wire still completes.
    ///
    /// # Arguments
    ///
    /// * `command` - Command text without terminator
    /// * `expected_prefix` - Start of the reply line, e.g. `R:GETLOAD 219`
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] if the control is already disconnected
    /// - [`Error::ConnectionClosed`] if the connection closes first
    /// - Any write error from the transport
    pub async fn send_and_wait(&self, command: &str, expected_prefix: &str) -> Result<String> {
        if self.inner.is_disconnected() {
            return Err(Error::disposed("control"));
        }

        let prefix = normalize_reply_prefix(expected_prefix);
        let (id, reply) = self.inner.pending.register(prefix)?;
        let _guard = PendingGuard {
            table: &self.inner.pending,
            id,
        };

        trace!(peer = %self.inner.peer, command, expected_prefix, "Request sent");
        self.transport.write_line(command).await?;

        reply.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Like [`send_and_wait`](Self::send_and_wait), bounded by `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestTimeout`] if no reply arrives in time, plus
    /// the errors of [`send_and_wait`](Self::send_and_wait).
    pub async fn send_and_wait_timeout(
        &self,
        command: &str,
        expected_prefix: &str,
        limit: Duration,
    ) -> Result<String> {
        timeout(limit, self.send_and_wait(command, expected_prefix))
            .await
            .map_err(|_| Error::request_timeout(command, limit.as_millis() as u64))?
    }

    /// Detaches from the transport and fails outstanding requests.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Control {
    fn drop(&mut self) {
        self.inner.disconnect();
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("peer", &self.inner.peer)
            .field("connected", &self.is_connected())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    fn control_pair() -> (Arc<Control>, BufReader<DuplexStream>) {
        let (local, remote) = tokio::io::duplex(4096);
        let control = Control::new(Connection::from_stream(local, "test")).expect("control");
        (Arc::new(control), BufReader::new(remote))
    }

    async fn next_request(remote: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        remote.read_line(&mut line).await.expect("read");
        line
    }

    async fn reply(remote: &mut BufReader<DuplexStream>, line: &str) {
        remote
            .get_mut()
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("reply");
    }

    #[tokio::test]
    async fn test_send_and_wait_returns_matching_line() {
        let (control, mut remote) = control_pair();

        let (result, ()) = tokio::join!(control.send_and_wait("GETLOAD 219", "R:GETLOAD 219"), async {
            assert_eq!(next_request(&mut remote).await, "GETLOAD 219\r\n");
            reply(&mut remote, "S:BTN 12 PRESS").await;
            reply(&mut remote, "R:GETLOAD 2190 5.000").await;
            reply(&mut remote, "R:GETLOAD 219 75.000").await;
        });

        assert_eq!(result.expect("reply"), "R:GETLOAD 219 75.000");
        assert_eq!(control.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_replies() {
        let (control, mut remote) = control_pair();

        let load = tokio::spawn({
            let control = Arc::clone(&control);
            async move { control.send_and_wait("GETLOAD 219", "R:GETLOAD 219").await }
        });
        let led = tokio::spawn({
            let control = Arc::clone(&control);
            async move { control.send_and_wait("GETLED 1591", "R:GETLED 1591").await }
        });

        next_request(&mut remote).await;
        next_request(&mut remote).await;

        reply(&mut remote, "R:GETLED 1591 1 255 0 0 0 0 0 OFF").await;
        let led = led.await.expect("join").expect("led");
        assert_eq!(led, "R:GETLED 1591 1 255 0 0 0 0 0 OFF");
        assert!(!load.is_finished());
        assert_eq!(control.pending_count(), 1);

        reply(&mut remote, "R:GETLOAD 219 40.000").await;
        let load = load.await.expect("join").expect("load");
        assert_eq!(load, "R:GETLOAD 219 40.000");
    }

    #[tokio::test]
    async fn test_disconnect_fails_every_pending_request() {
        let (control, mut remote) = control_pair();
        let notified = Arc::new(AtomicUsize::new(0));
        let _on_disconnect = {
            let notified = Arc::clone(&notified);
            control.on_disconnected(move || {
                notified.fetch_add(1, Ordering::SeqCst);
            })
        };

        let requests: Vec<_> = (0..5)
            .map(|i| {
                let control = Arc::clone(&control);
                tokio::spawn(async move {
                    control
                        .send_and_wait(&format!("GETTASK {i}"), &format!("R:GETTASK {i}"))
                        .await
                })
            })
            .collect();

        for _ in 0..5 {
            next_request(&mut remote).await;
        }
        drop(remote);

        for request in requests {
            let result = tokio::time::timeout(Duration::from_secs(1), request)
                .await
                .expect("request must not hang")
                .expect("join");
            assert!(matches!(result, Err(Error::ConnectionClosed)));
        }

        assert!(!control.is_connected());
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let err = control.send_and_wait("VERSION", "R:VERSION").await.unwrap_err();
        assert!(matches!(err, Error::Disposed { resource: "control" }));
        let err = control.write_line("VERSION").await.unwrap_err();
        assert!(err.is_disposed());
    }

    #[tokio::test]
    async fn test_cancelled_wait_removes_registration() {
        let (control, mut remote) = control_pair();

        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            control.send_and_wait("GETLOAD 5", "R:GETLOAD 5"),
        )
        .await;
        assert!(waited.is_err());
        assert_eq!(control.pending_count(), 0);

        // the late reply is ignored; the next request gets its own reply
        let mut events = control.events();
        assert_eq!(next_request(&mut remote).await, "GETLOAD 5\r\n");
        reply(&mut remote, "R:GETLOAD 5 10.000").await;
        assert!(events.recv().await.is_some());

        let (result, ()) = tokio::join!(control.send_and_wait("GETLOAD 5", "R:GETLOAD 5"), async {
            assert_eq!(next_request(&mut remote).await, "GETLOAD 5\r\n");
            reply(&mut remote, "R:GETLOAD 5 20.000").await;
        });
        assert_eq!(result.expect("reply"), "R:GETLOAD 5 20.000");
    }

    #[tokio::test]
    async fn test_send_and_wait_timeout() {
        let (control, _remote) = control_pair();

        let err = control
            .send_and_wait_timeout("VERSION", "R:VERSION", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout { ref command, timeout_ms: 20 } if command == "VERSION"));
        assert!(err.is_timeout());
        assert_eq!(control.pending_count(), 0);
        assert!(control.is_connected());
    }

    #[tokio::test]
    async fn test_new_rejects_closed_transport() {
        let (local, _remote) = tokio::io::duplex(64);
        let connection = Connection::from_stream(local, "test");
        connection.dispose();

        let err = Control::new(connection).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_drop_releases_line_handlers() {
        let (local, _remote) = tokio::io::duplex(64);
        let connection = Connection::from_stream(local, "test");

        let control = Control::new(connection.clone()).expect("control");
        assert_eq!(connection.handler_count(), 2);

        control.close();
        assert_eq!(connection.handler_count(), 0);
        assert!(connection.is_open());
    }
}
