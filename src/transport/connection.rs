//! Line-framed connection to a controller.
//!
//! This module owns one socket, frames it into `\r\n`-terminated lines,
//! serializes writers and broadcasts every received line to subscribers.
//!
//! # Tasks
//!
//! Each connection spawns two tokio tasks:
//!
//! - **Read loop**: reads one line at a time and invokes every current
//!   line handler, in arrival order, on the read task itself.
//! - **Writer**: drains a FIFO queue of write requests, one at a time, so
//!   concurrent callers never interleave bytes on the wire.
//!
//! # Lifecycle
//!
//! The `closed` flag is the single source of truth for "is this socket
//! usable". It flips exactly once, on [`Connection::dispose`], read EOF,
//! an I/O error, or when the last handle is dropped. Flipping it aborts
//! both tasks (releasing the socket) and delivers [`LineEvent::Closed`]
//! to every handler exactly once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{MAX_LINE_LENGTH, decode_line, encode_line};
use crate::subscription::{Notifications, Subscribers, Subscription};

use super::options::ConnectOptions;

// ============================================================================
// Types
// ============================================================================

/// Notification delivered to line handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// A line was received (terminator stripped).
    Line(&'a str),
    /// The connection closed; no further events follow.
    Closed,
}

/// Line handler callback type.
///
/// Called on the connection's read task for every received line, and
/// once with [`LineEvent::Closed`] when the connection terminates.
/// Handlers must not block.
pub type LineHandler = Arc<dyn Fn(LineEvent<'_>) + Send + Sync>;

type HandlerSet = Subscribers<dyn Fn(LineEvent<'_>) + Send + Sync>;

/// A queued write.
struct WriteRequest {
    bytes: Vec<u8>,
    done: oneshot::Sender<Result<()>>,
}

// ============================================================================
// Shared State
// ============================================================================

/// State shared by the handles, the read loop and the writer.
struct Shared {
    /// Peer label for logging.
    peer: String,
    /// Set once the connection is no longer usable.
    closed: AtomicBool,
    /// Current line handlers.
    handlers: Arc<HandlerSet>,
    /// Read loop and writer tasks.
    tasks: Mutex<Vec<AbortHandle>>,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Invokes a snapshot of the handlers with one line.
    fn broadcast(&self, line: &str) {
        for handler in self.handlers.snapshot() {
            handler(LineEvent::Line(line));
        }
    }

    /// Closes the connection. Returns `false` if it was already closed.
    fn close(&self, reason: &'static str) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            task.abort();
        }

        let handlers = self.handlers.drain();
        debug!(
            peer = %self.peer,
            reason,
            handlers = handlers.len(),
            "Connection closed"
        );

        for handler in handlers {
            handler(LineEvent::Closed);
        }

        true
    }
}

/// Closes the connection when the owning task ends for any reason.
struct CloseOnExit(Arc<Shared>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.close("task exited");
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Line-framed connection to a controller.
///
/// Cloning is cheap; all clones share one socket. The socket is closed
/// when [`dispose`](Self::dispose) is called, when the peer closes it, on
/// an I/O error, or when the last clone is dropped.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and can be shared across tasks.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

/// Owned by user handles only; the tasks hold [`Shared`].
struct ConnectionInner {
    shared: Arc<Shared>,
    write_tx: mpsc::UnboundedSender<WriteRequest>,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        self.shared.close("last handle dropped");
    }
}

// ============================================================================
// Connection - Constructors
// ============================================================================

impl Connection {
    /// Connects to a controller over TCP and performs the handshake.
    ///
    /// # Arguments
    ///
    /// * `host` - Controller hostname or IP address
    /// * `options` - Port, timeout and handshake settings
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::ConnectionTimeout`] if the TCP connect exceeds the timeout
    /// - [`Error::Connection`] if the connect or the handshake write fails
    ///
    /// The socket is closed on every failure path.
    pub async fn connect(host: &str, options: &ConnectOptions) -> Result<Self> {
        options.validate()?;
        let port = options.port;

        let connecting = TcpStream::connect((host, port));
        let connected = match options.connect_timeout {
            Some(limit) => timeout(limit, connecting)
                .await
                .map_err(|_| Error::connection_timeout(limit.as_millis() as u64))?,
            None => connecting.await,
        };
        let stream = connected
            .map_err(|e| Error::connection(format!("failed to connect to {host}:{port}: {e}")))?;

        stream
            .set_nodelay(options.nodelay)
            .map_err(|e| Error::connection(format!("failed to configure socket: {e}")))?;

        let connection = Self::open(stream, format!("{host}:{port}"), &options.handshake).await?;

        info!(host, port, "Connected to controller");

        Ok(connection)
    }

    /// Performs the handshake on an established stream, then starts the
    /// connection on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if writing the handshake fails; the
    /// stream is dropped in that case.
    pub async fn open<S>(mut stream: S, peer: impl Into<String>, handshake: &[String]) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let peer = peer.into();

        write_handshake(&mut stream, handshake)
            .await
            .map_err(|e| Error::connection(format!("handshake with {peer} failed: {e}")))?;

        debug!(peer = %peer, lines = handshake.len(), "Handshake sent");

        Ok(Self::from_stream(stream, peer))
    }

    /// Starts a connection on an established stream without a handshake.
    ///
    /// Spawns the read loop and writer tasks; must be called within a
    /// tokio runtime.
    pub fn from_stream<S>(stream: S, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (write_tx, write_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            peer: peer.into(),
            closed: AtomicBool::new(false),
            handlers: Arc::new(HandlerSet::default()),
            tasks: Mutex::new(Vec::with_capacity(2)),
        });

        let read_task = tokio::spawn(run_read_loop(reader, Arc::clone(&shared)));
        let write_task = tokio::spawn(run_writer(writer, write_rx, Arc::clone(&shared)));

        {
            let mut tasks = shared.tasks.lock();
            tasks.push(read_task.abort_handle());
            tasks.push(write_task.abort_handle());

            // the read loop may already have hit EOF and closed
            if shared.is_closed() {
                for task in tasks.drain(..) {
                    task.abort();
                }
            }
        }

        Self {
            inner: Arc::new(ConnectionInner { shared, write_tx }),
        }
    }
}

// ============================================================================
// Connection - Public API
// ============================================================================

impl Connection {
    /// Returns `true` until the connection closes.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.inner.shared.is_closed()
    }

    /// Returns the peer label (`host:port` for TCP connections).
    #[inline]
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.inner.shared.peer
    }

    /// Returns the number of registered line handlers.
    #[inline]
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.shared.handlers.len()
    }

    /// Returns `true` if both handles refer to the same socket.
    #[inline]
    #[must_use]
    pub fn same_connection(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner.shared, &other.inner.shared)
    }

    /// Queues a line for writing and returns a future for its completion.
    ///
    /// The line is queued when this method is called, so writes reach the
    /// wire in call order. Dropping the returned future before the writer
    /// reaches the line withdraws it; once bytes are flowing the write
    /// completes in the background regardless.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] if the connection is already closed
    /// - [`Error::InvalidArgument`] if `text` contains a line break
    /// - [`Error::ConnectionClosed`] if the connection closes before the write completes
    /// - [`Error::Io`] if the socket write fails
    pub fn write_line(&self, text: &str) -> impl Future<Output = Result<()>> + Send + use<> {
        let queued = self.enqueue(text);
        async move {
            let done = queued?;
            done.await.map_err(|_| Error::ConnectionClosed)?
        }
    }

    /// Registers a line handler.
    ///
    /// The handler runs on the read task for every line received after
    /// registration, and once with [`LineEvent::Closed`]. If the
    /// connection is already closed, it is invoked with
    /// [`LineEvent::Closed`] immediately.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(LineEvent<'_>) + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    /// Registers a shared line handler. See [`subscribe`](Self::subscribe).
    pub fn subscribe_handler(&self, handler: LineHandler) -> Subscription {
        let shared = &self.inner.shared;
        match shared
            .handlers
            .insert_unless(handler, || shared.is_closed())
        {
            Ok(id) => shared.handlers.subscription(id),
            Err(handler) => {
                handler(LineEvent::Closed);
                Subscription::inert()
            }
        }
    }

    /// Returns a stream of every line received from now on.
    ///
    /// The stream ends when the connection closes.
    pub fn lines(&self) -> Notifications<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |event| {
            if let LineEvent::Line(line) = event {
                let _ = tx.send(line.to_string());
            }
        });
        Notifications::new(rx, subscription)
    }

    /// Closes the connection.
    ///
    /// Idempotent. Queued writes fail with [`Error::ConnectionClosed`];
    /// handlers receive [`LineEvent::Closed`].
    pub fn dispose(&self) {
        if self.inner.shared.close("disposed") {
            debug!(peer = %self.peer(), "Connection disposed");
        }
    }

    fn enqueue(&self, text: &str) -> Result<oneshot::Receiver<Result<()>>> {
        if !self.is_open() {
            return Err(Error::disposed("connection"));
        }
        if text.contains(['\r', '\n']) {
            return Err(Error::invalid_argument(format!(
                "line contains a line break: {text:?}"
            )));
        }

        let (done, done_rx) = oneshot::channel();
        self.inner
            .write_tx
            .send(WriteRequest {
                bytes: encode_line(text),
                done,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        trace!(peer = %self.peer(), line = %text, "Line queued");

        Ok(done_rx)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer())
            .field("open", &self.is_open())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Writes the handshake lines as one buffer.
async fn write_handshake<W>(writer: &mut W, lines: &[String]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes: Vec<u8> = lines.iter().flat_map(|line| encode_line(line)).collect();
    writer.write_all(&bytes).await?;
    writer.flush().await
}

/// Reads one line ending in `\n`, `\r\n` or a bare `\r` into `buf`.
///
/// `skip_lf` carries a trailing `\r` across calls so a `\r\n` split
/// between reads still ends one line. Returns `false` at end of stream
/// with nothing buffered.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, skip_lf: &mut bool) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(!buf.is_empty());
        }
        if std::mem::take(skip_lf) && available[0] == b'\n' {
            reader.consume(1);
            continue;
        }

        let (taken, terminator) = match available.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(end) => {
                buf.extend_from_slice(&available[..end]);
                (end + 1, Some(available[end]))
            }
            None => {
                buf.extend_from_slice(available);
                (available.len(), None)
            }
        };
        reader.consume(taken);

        if buf.len() > MAX_LINE_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {MAX_LINE_LENGTH} bytes"),
            ));
        }
        if let Some(terminator) = terminator {
            *skip_lf = terminator == b'\r';
            return Ok(true);
        }
    }
}

/// Reads lines until EOF or error, broadcasting each one.
async fn run_read_loop<R>(reader: R, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let _guard = CloseOnExit(Arc::clone(&shared));
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut skip_lf = false;

    let reason = loop {
        buf.clear();
        match read_line(&mut reader, &mut buf, &mut skip_lf).await {
            Ok(false) => break "end of stream",
            Ok(true) => {
                let line = decode_line(&buf);
                trace!(peer = %shared.peer, line = %line, "Line received");
                shared.broadcast(&line);
            }
            Err(e) => {
                warn!(peer = %shared.peer, error = %e, "Read failed");
                break "read error";
            }
        }
    };

    shared.close(reason);
}

/// Drains the write queue one request at a time.
async fn run_writer<W>(
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<WriteRequest>,
    shared: Arc<Shared>,
) where
    W: AsyncWrite + Unpin,
{
    let _guard = CloseOnExit(Arc::clone(&shared));

    while let Some(request) = queue.recv().await {
        if request.done.is_closed() {
            trace!(peer = %shared.peer, "Write withdrawn before its turn");
            continue;
        }

        let written = async {
            writer.write_all(&request.bytes).await?;
            writer.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                let _ = request.done.send(Ok(()));
            }
            Err(e) => {
                warn!(peer = %shared.peer, error = %e, "Write failed");
                let _ = request.done.send(Err(Error::Io(e)));
                shared.close("write error");
                break;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncReadExt, DuplexStream};

    use crate::protocol::HANDSHAKE;

    /// Connection on one end of an in-memory pipe; the other end plays the controller.
    fn pipe() -> (Connection, DuplexStream) {
        let (local, remote) = tokio::io::duplex(4096);
        (Connection::from_stream(local, "test"), remote)
    }

    async fn read_remote_line(remote: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        remote.read_line(&mut line).await.expect("read");
        line
    }

    #[tokio::test]
    async fn test_handshake_bytes() {
        let mock = tokio_test::io::Builder::new()
            .write(b"STATUS ALL\r\n")
            .write(b"ECHO 0 INFUSION\r\n")
            .read(b"S:LOAD 5 20.000\r\n")
            .build();

        let handshake: Vec<String> = HANDSHAKE.iter().map(|l| l.to_string()).collect();
        let connection = Connection::open(mock, "mock", &handshake)
            .await
            .expect("open");

        let mut lines = connection.lines();
        assert_eq!(lines.recv().await.as_deref(), Some("S:LOAD 5 20.000"));
        // mock reports EOF once its script is exhausted
        assert_eq!(lines.recv().await, None);
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn test_broadcast_in_arrival_order() {
        let (connection, mut remote) = pipe();
        let mut first = connection.lines();
        let mut second = connection.lines();

        remote
            .write_all(b"S:LOAD 1 10\r\nS:LOAD 2 20\r\nR:VERSION 3.1\r\n")
            .await
            .expect("write");

        for lines in [&mut first, &mut second] {
            assert_eq!(lines.recv().await.as_deref(), Some("S:LOAD 1 10"));
            assert_eq!(lines.recv().await.as_deref(), Some("S:LOAD 2 20"));
            assert_eq!(lines.recv().await.as_deref(), Some("R:VERSION 3.1"));
        }
    }

    #[tokio::test]
    async fn test_bare_carriage_return_ends_line() {
        let mock = tokio_test::io::Builder::new()
            .read(b"S:LOAD 1 10\rS:LOAD 2 20\r")
            .read(b"\nS:BTN 3 PRESS\n")
            .build();
        let connection = Connection::from_stream(mock, "mock");
        let mut lines = connection.lines();

        assert_eq!(lines.recv().await.as_deref(), Some("S:LOAD 1 10"));
        assert_eq!(lines.recv().await.as_deref(), Some("S:LOAD 2 20"));
        // the split "\r\n" closes one line, not two
        assert_eq!(lines.recv().await.as_deref(), Some("S:BTN 3 PRESS"));
        assert_eq!(lines.recv().await, None);
    }

    #[tokio::test]
    async fn test_overlong_line_closes_connection() {
        let (connection, mut remote) = pipe();
        let mut lines = connection.lines();

        remote.write_all(b"S:LOAD 1 10\r\n").await.expect("write");
        assert_eq!(lines.recv().await.as_deref(), Some("S:LOAD 1 10"));

        let flood = vec![b'A'; MAX_LINE_LENGTH + 1];
        // the reader may stop draining once it gives up
        let _ = remote.write_all(&flood).await;

        assert_eq!(lines.recv().await, None);
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn test_write_line_appends_terminator() {
        let (connection, remote) = pipe();
        let mut remote = BufReader::new(remote);

        connection.write_line("GETLOAD 219").await.expect("write");
        assert_eq!(read_remote_line(&mut remote).await, "GETLOAD 219\r\n");
    }

    #[tokio::test]
    async fn test_writes_keep_call_order() {
        let (connection, remote) = pipe();
        let mut remote = BufReader::new(remote);

        let writes: Vec<_> = (0..20)
            .map(|i| connection.write_line(&format!("LOAD {i} 50")))
            .collect();
        let handles: Vec<_> = writes.into_iter().rev().map(tokio::spawn).collect();
        for handle in handles {
            handle.await.expect("join").expect("write");
        }

        for i in 0..20 {
            assert_eq!(read_remote_line(&mut remote).await, format!("LOAD {i} 50\r\n"));
        }
    }

    #[tokio::test]
    async fn test_withdrawn_write_is_skipped() {
        // capacity 1 forces the first write to stall on the pipe
        let (local, remote) = tokio::io::duplex(1);
        let connection = Connection::from_stream(local, "test");

        let first = tokio::spawn(connection.write_line("FIRST"));
        tokio::task::yield_now().await;
        drop(connection.write_line("WITHDRAWN"));
        let third = connection.write_line("THIRD");

        let mut remote = BufReader::new(remote);
        let mut received = String::new();
        let reader = async {
            for _ in 0..2 {
                remote.read_line(&mut received).await.expect("read");
            }
        };
        let (_, first_result, third_result) = tokio::join!(reader, first, third);
        first_result.expect("join").expect("first");
        third_result.expect("third");
        assert_eq!(received, "FIRST\r\nTHIRD\r\n");
    }

    #[tokio::test]
    async fn test_write_rejects_line_breaks() {
        let (connection, _remote) = pipe();
        let err = connection.write_line("GETLOAD 1\r\nGETLOAD 2").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_eof_closes_and_notifies_once() {
        let (connection, remote) = pipe();
        let closed = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let closed = Arc::clone(&closed);
            connection.subscribe(move |event| {
                if event == LineEvent::Closed {
                    closed.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let mut lines = connection.lines();
        drop(remote);
        assert_eq!(lines.recv().await, None);

        connection.dispose();
        connection.dispose();

        assert!(!connection.is_open());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(connection.handler_count(), 0);
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_fails_fast() {
        let (connection, _remote) = pipe();
        connection.dispose();
        connection.dispose();

        let err = connection.write_line("VERSION").await.unwrap_err();
        assert!(matches!(err, Error::Disposed { resource: "connection" }));
    }

    #[tokio::test]
    async fn test_dispose_fails_queued_writes() {
        // nobody reads the remote end, so writes back up
        let (local, _remote) = tokio::io::duplex(8);
        let connection = Connection::from_stream(local, "test");

        let pending: Vec<_> = (0..5)
            .map(|i| tokio::spawn(connection.write_line(&format!("LOAD {i} 100"))))
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;
        connection.dispose();

        for handle in pending {
            let result = tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("write must not hang")
                .expect("join");
            assert!(matches!(result, Err(Error::ConnectionClosed)));
        }
    }

    #[tokio::test]
    async fn test_subscribe_after_close_gets_closed() {
        let (connection, _remote) = pipe();
        connection.dispose();

        let closed = Arc::new(AtomicBool::new(false));
        let subscription = {
            let closed = Arc::clone(&closed);
            connection.subscribe(move |event| {
                if event == LineEvent::Closed {
                    closed.store(true, Ordering::SeqCst);
                }
            })
        };

        assert!(closed.load(Ordering::SeqCst));
        assert!(!subscription.is_active());
    }

    #[tokio::test]
    async fn test_last_handle_drop_closes_socket() {
        let (connection, mut remote) = pipe();
        let clone = connection.clone();
        drop(connection);
        assert!(clone.is_open());
        drop(clone);

        let mut buf = [0u8; 1];
        let n = tokio::time::timeout(Duration::from_secs(1), remote.read(&mut buf))
            .await
            .expect("remote must see EOF")
            .expect("read");
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_handler_added_mid_broadcast_misses_that_line() {
        let (connection, mut remote) = pipe();
        let late_lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let late_subscription = Arc::new(Mutex::new(None));

        let connection_clone = connection.clone();
        let _early = {
            let late_lines = Arc::clone(&late_lines);
            let late_subscription = Arc::clone(&late_subscription);
            connection.subscribe(move |event| {
                if let LineEvent::Line("S:BTN 1 PRESS") = event {
                    let late_lines = Arc::clone(&late_lines);
                    let subscription = connection_clone.subscribe(move |event| {
                        if let LineEvent::Line(line) = event {
                            late_lines.lock().push(line.to_string());
                        }
                    });
                    *late_subscription.lock() = Some(subscription);
                }
            })
        };

        let mut lines = connection.lines();
        remote
            .write_all(b"S:BTN 1 PRESS\r\nS:BTN 1 RELEASE\r\n")
            .await
            .expect("write");
        lines.recv().await;
        lines.recv().await;

        assert_eq!(*late_lines.lock(), ["S:BTN 1 RELEASE"]);
    }
}
