//! Connection pool sharing one physical connection per host.
//!
//! Many logical callers acquire the same controller; the pool hands each
//! of them a lightweight [`PooledConnection`] lease backed by a single
//! [`Connection`] per host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               ConnectionPool                │
//! │  ┌───────────────────────────────────────┐  │
//! │  │ "10.0.0.5" → Entry { Connected, 2 }   │  │
//! │  │ "10.0.0.6" → Entry { Connecting, 1 }  │  │
//! │  └───────────────────────────────────────┘  │
//! │             idle sweep (interval)           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Entry Lifecycle
//!
//! 1. First `acquire` for a host creates the entry and spawns one connect
//!    attempt. Concurrent acquirers for that host join the same attempt.
//! 2. A failed attempt removes its entry, so the next `acquire` retries.
//! 3. Dropping a lease decrements the acquisition count and stamps the
//!    release time. It never closes the connection.
//! 4. The sweep disposes entries with no acquirers that have been idle
//!    longer than [`PoolOptions::idle_timeout`].
//!
//! Lock order is the host map first, then an entry.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::subscription::Subscription;

use super::connection::{Connection, LineHandler};
use super::options::{ConnectOptions, PoolOptions};
use super::Transport;

// ============================================================================
// Connector
// ============================================================================

/// Opens connections on behalf of the pool.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a connection to `host`.
    async fn connect(&self, host: &str) -> Result<Connection>;
}

/// Connector that opens TCP connections with fixed options.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    options: ConnectOptions,
}

impl TcpConnector {
    /// Creates a connector using `options` for every connection.
    #[inline]
    #[must_use]
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }

    /// Returns the connect options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str) -> Result<Connection> {
        Connection::connect(host, &self.options).await
    }
}

// ============================================================================
// Pool Entry
// ============================================================================

/// Outcome of a connect attempt, published once.
type Outcome = Option<std::result::Result<Connection, Arc<Error>>>;

enum Phase {
    Connecting,
    Connected(Connection),
    Disposed,
}

struct EntryState {
    phase: Phase,
    acquisitions: usize,
    last_release: Instant,
}

/// Per-host record.
struct PoolEntry {
    host: String,
    state: Mutex<EntryState>,
    ready: watch::Receiver<Outcome>,
}

impl PoolEntry {
    /// Takes a lease unless the entry is unusable.
    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        let usable = match &state.phase {
            Phase::Connecting => true,
            Phase::Connected(connection) => connection.is_open(),
            Phase::Disposed => false,
        };
        if usable {
            state.acquisitions += 1;
        }
        usable
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.acquisitions = state.acquisitions.saturating_sub(1);
        state.last_release = Instant::now();
    }

    /// Stores a fresh connection, or disposes it if the entry was disposed meanwhile.
    fn complete(&self, connection: Connection) -> std::result::Result<Connection, Arc<Error>> {
        let mut state = self.state.lock();
        if let Phase::Disposed = state.phase {
            drop(state);
            debug!(host = %self.host, "Applying deferred dispose");
            connection.dispose();
            return Err(Arc::new(Error::disposed("connection pool")));
        }
        state.phase = Phase::Connected(connection.clone());
        Ok(connection)
    }

    /// Marks the entry disposed and hands back its connection, if any.
    fn force_dispose(&self) -> Option<Connection> {
        match std::mem::replace(&mut self.state.lock().phase, Phase::Disposed) {
            Phase::Connected(connection) => Some(connection),
            Phase::Connecting | Phase::Disposed => None,
        }
    }

    /// Disposes the entry if nobody holds it and it is idle or dead.
    ///
    /// Returns `None` if the entry stays.
    fn take_if_idle(&self, now: Instant, idle_timeout: Duration) -> Option<Option<Connection>> {
        let mut state = self.state.lock();
        if state.acquisitions > 0 {
            return None;
        }

        let idle = now.saturating_duration_since(state.last_release) > idle_timeout;
        let dead = match &state.phase {
            Phase::Connected(connection) => !connection.is_open(),
            Phase::Disposed => true,
            Phase::Connecting => false,
        };
        if !idle && !dead {
            return None;
        }

        match std::mem::replace(&mut state.phase, Phase::Disposed) {
            Phase::Connected(connection) => Some(Some(connection)),
            Phase::Connecting | Phase::Disposed => Some(None),
        }
    }

    /// Waits for the shared connect attempt.
    async fn wait_ready(&self) -> Result<Connection> {
        let connected = match &self.state.lock().phase {
            Phase::Connected(connection) => Some(connection.clone()),
            Phase::Connecting | Phase::Disposed => None,
        };
        if let Some(connection) = connected {
            return Ok(connection);
        }

        let mut ready = self.ready.clone();
        let outcome = ready
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::connection(format!("connect attempt to {} abandoned", self.host)))?
            .clone();

        match outcome {
            Some(Ok(connection)) => Ok(connection),
            Some(Err(cause)) if cause.is_disposed() => Err(Error::disposed("connection pool")),
            Some(Err(cause)) => Err(Error::connect_failed(self.host.clone(), cause)),
            None => Err(Error::disposed("connection pool")),
        }
    }
}

/// Holds one acquisition of an entry until dropped.
struct Lease {
    entry: Arc<PoolEntry>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.entry.release();
    }
}

// ============================================================================
// PooledConnection
// ============================================================================

/// Lease on a pooled connection.
///
/// Dropping the lease (or calling [`release`](Self::release)) returns it
/// to the pool; the shared connection stays open for other holders and
/// for reuse until the idle sweep reclaims it.
pub struct PooledConnection {
    connection: Connection,
    lease: Lease,
}

impl PooledConnection {
    /// Returns the shared connection.
    ///
    /// Disposing it closes the connection for every holder.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the host this lease was acquired for.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.lease.entry.host
    }

    /// Returns the lease to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Transport for PooledConnection {
    fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    fn peer(&self) -> &str {
        self.connection.peer()
    }

    fn subscribe_lines(&self, handler: LineHandler) -> Subscription {
        self.connection.subscribe_handler(handler)
    }

    fn write_line(&self, text: &str) -> BoxFuture<'static, Result<()>> {
        Box::pin(self.connection.write_line(text))
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("host", &self.host())
            .field("connection", &self.connection)
            .finish()
    }
}

// ============================================================================
// ConnectionPool
// ============================================================================

/// Shares one connection per host across many acquirers.
///
/// Cloning is cheap; clones share the same pool.
///
/// # Example
///
/// ```no_run
/// use vantage_control::{ConnectOptions, ConnectionPool, PoolOptions, Result};
///
/// # async fn example() -> Result<()> {
/// let pool = ConnectionPool::new(PoolOptions::default(), ConnectOptions::default())?;
///
/// let first = pool.acquire("192.168.1.50").await?;
/// let second = pool.acquire("192.168.1.50").await?;
/// assert!(first.connection().same_connection(second.connection()));
///
/// pool.dispose();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    connector: Arc<dyn Connector>,
    options: PoolOptions,
    entries: Mutex<FxHashMap<String, Arc<PoolEntry>>>,
    disposed: AtomicBool,
    sweeper: Mutex<Option<AbortHandle>>,
}

// ============================================================================
// ConnectionPool - Constructors
// ============================================================================

impl ConnectionPool {
    /// Creates a pool that opens TCP connections and starts the idle sweep.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either set of options is invalid.
    pub fn new(options: PoolOptions, connect: ConnectOptions) -> Result<Self> {
        connect.validate()?;
        Self::with_connector(Arc::new(TcpConnector::new(connect)), options)
    }

    /// Creates a pool that opens connections through `connector`.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` are invalid.
    pub fn with_connector(connector: Arc<dyn Connector>, options: PoolOptions) -> Result<Self> {
        options.validate()?;

        let inner = Arc::new(PoolInner {
            connector,
            options,
            entries: Mutex::new(FxHashMap::default()),
            disposed: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        });
        PoolInner::start_sweeper(&inner);

        debug!(
            idle_timeout_ms = options.idle_timeout.as_millis() as u64,
            sweep_interval_ms = options.sweep_interval.as_millis() as u64,
            "Connection pool created"
        );

        Ok(Self { inner })
    }
}

// ============================================================================
// ConnectionPool - Public API
// ============================================================================

impl ConnectionPool {
    /// Acquires a lease on the connection to `host`.
    ///
    /// Returns at once if the host is connected; otherwise waits for the
    /// shared connect attempt. Dropping the returned future gives the
    /// lease back without affecting the attempt.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] if the pool is disposed, before or during the wait
    /// - [`Error::ConnectFailed`] if the connect attempt fails
    pub async fn acquire(&self, host: &str) -> Result<PooledConnection> {
        let lease = self.inner.lease(host)?;
        let connection = lease.entry.wait_ready().await?;
        Ok(PooledConnection { connection, lease })
    }

    /// Returns the number of host entries, connected or not.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns the acquisition count for `host`, if it has an entry.
    #[must_use]
    pub fn acquisition_count(&self, host: &str) -> Option<usize> {
        let entry = self.inner.entries.lock().get(host).cloned()?;
        let acquisitions = entry.state.lock().acquisitions;
        Some(acquisitions)
    }

    /// Returns the pool options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Shuts the pool down.
    ///
    /// Stops the sweep and disposes every connection. Entries still
    /// connecting are disposed as soon as their attempt resolves.
    /// Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Runs one idle sweep as of `now`. Returns the number of evicted entries.
    pub(crate) fn evict_idle(&self, now: Instant) -> usize {
        self.inner.evict_idle(now)
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("entries", &self.entry_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ============================================================================
// PoolInner
// ============================================================================

impl PoolInner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Takes a lease on the host's entry, creating it if needed.
    fn lease(self: &Arc<Self>, host: &str) -> Result<Lease> {
        let mut entries = self.entries.lock();
        if self.is_disposed() {
            return Err(Error::disposed("connection pool"));
        }

        if let Some(entry) = entries.get(host) {
            if entry.try_acquire() {
                return Ok(Lease {
                    entry: Arc::clone(entry),
                });
            }
            debug!(host, "Replacing dead pool entry");
        }

        let entry = self.spawn_entry(host);
        entries.insert(host.to_string(), Arc::clone(&entry));
        Ok(Lease { entry })
    }

    /// Creates an entry holding one acquisition and starts its connect attempt.
    fn spawn_entry(self: &Arc<Self>, host: &str) -> Arc<PoolEntry> {
        let (ready_tx, ready_rx) = watch::channel(None);
        let entry = Arc::new(PoolEntry {
            host: host.to_string(),
            state: Mutex::new(EntryState {
                phase: Phase::Connecting,
                acquisitions: 1,
                last_release: Instant::now(),
            }),
            ready: ready_rx,
        });

        debug!(host, "Starting pooled connect");

        tokio::spawn(Self::run_connect(
            Arc::downgrade(self),
            Arc::clone(&self.connector),
            Arc::clone(&entry),
            ready_tx,
        ));

        entry
    }

    /// Drives one connect attempt and publishes its outcome.
    async fn run_connect(
        pool: Weak<PoolInner>,
        connector: Arc<dyn Connector>,
        entry: Arc<PoolEntry>,
        ready: watch::Sender<Outcome>,
    ) {
        let outcome = match connector.connect(&entry.host).await {
            Ok(connection) => entry.complete(connection),
            Err(e) => {
                warn!(host = %entry.host, error = %e, "Pooled connect failed");
                entry.state.lock().phase = Phase::Disposed;
                if let Some(pool) = pool.upgrade() {
                    pool.remove_entry(&entry);
                }
                Err(Arc::new(e))
            }
        };

        ready.send_replace(Some(outcome));
    }

    /// Removes `entry` if it is still the one registered for its host.
    fn remove_entry(&self, entry: &Arc<PoolEntry>) {
        let mut entries = self.entries.lock();
        if entries
            .get(&entry.host)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            entries.remove(&entry.host);
        }
    }

    fn evict_idle(&self, now: Instant) -> usize {
        let mut evicted = Vec::new();
        self.entries.lock().retain(|host, entry| {
            match entry.take_if_idle(now, self.options.idle_timeout) {
                Some(connection) => {
                    evicted.push((host.clone(), connection));
                    false
                }
                None => true,
            }
        });

        for (host, connection) in &evicted {
            if let Some(connection) = connection {
                connection.dispose();
            }
            debug!(host = %host, "Evicted idle connection");
        }

        evicted.len()
    }

    fn dispose(&self) {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.abort();
        }

        let drained: Vec<_> = self.entries.lock().drain().map(|(_, entry)| entry).collect();
        let connections: Vec<_> = drained.iter().filter_map(|entry| entry.force_dispose()).collect();

        for connection in &connections {
            connection.dispose();
        }

        info!(
            entries = drained.len(),
            connections = connections.len(),
            "Connection pool disposed"
        );
    }

    fn start_sweeper(inner: &Arc<Self>) {
        let pool = Arc::downgrade(inner);
        let period = inner.options.sweep_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(pool) = pool.upgrade() else {
                    break;
                };
                let evicted = pool.evict_idle(Instant::now());
                if evicted > 0 {
                    debug!(evicted, "Idle sweep finished");
                }
            }
        });

        *inner.sweeper.lock() = Some(task.abort_handle());
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
