//! Connection pair
//!
//! A live connection is split in two:
//!
//! ```text
//!         hub side                                   transport side
//!   ┌────────────────────┐                      ┌──────────────────────┐
//!   │ Connection         │  inbound (Result)    │ PeerLink             │
//!   │   recv()        ◄──┼──────────────────────┼── deliver() / fail() │
//!   │ ConnectionHandle   │  outbound (Bytes)    │                      │
//!   │   send()        ───┼──────────────────────┼─► next_outbound()    │
//!   │   close()  ────────┼──── close signal ────┼─► closed()           │
//!   └────────────────────┘                      └──────────────────────┘
//! ```
//!
//! `ConnectionHandle` is cheap to clone and is what the registry stores.
//! `Connection` owns the inbound side and is consumed by the receive loop.
//! `PeerSender` is a cloneable inbound writer, so a transport can read and
//! write the peer from independent loops.
//!
//! A close from the hub preempts the receive loop immediately. A close from
//! the transport only ends the inbound stream: payloads it already delivered
//! are still handed to the receive loop first.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ReadError, SendError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a connection instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Close state shared by every part of one connection
#[derive(Debug, Clone)]
struct CloseSignal {
    /// Cancelled when the hub closes the connection
    evicted: CancellationToken,
    /// Cancelled when either side closes; child of `evicted`
    closed: CancellationToken,
    /// Set by the first close from either side
    latched: Arc<AtomicBool>,
}

impl CloseSignal {
    fn new() -> Self {
        let evicted = CancellationToken::new();
        let closed = evicted.child_token();
        Self {
            evicted,
            closed,
            latched: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Close from the hub side. Returns `true` for the first close overall.
    fn evict(&self) -> bool {
        let first = !self.latched.swap(true, Ordering::AcqRel);
        self.evicted.cancel();
        first
    }

    /// Close from the transport side. Returns `true` for the first close overall.
    fn hang_up(&self) -> bool {
        let first = !self.latched.swap(true, Ordering::AcqRel);
        self.closed.cancel();
        first
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Create a connection pair with bounded buffers in both directions
///
/// `capacity` is the number of payloads each direction can queue before the
/// writer has to wait. Must be at least 1.
pub fn channel(capacity: usize) -> (Connection, PeerLink) {
    let capacity = capacity.max(1);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let id = ConnectionId::next();
    let signal = CloseSignal::new();

    let connection = Connection {
        handle: ConnectionHandle {
            id,
            outbound: outbound_tx,
            signal: signal.clone(),
        },
        inbound: inbound_rx,
    };
    let link = PeerLink {
        outbound: outbound_rx,
        peer: PeerSender {
            id,
            inbound: inbound_tx,
            signal,
        },
    };

    (connection, link)
}

/// Shared send side of a connection
///
/// Equality and hashing use the connection identity only.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Bytes>,
    signal: CloseSignal,
}

impl ConnectionHandle {
    /// Connection identity
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a payload for delivery to the peer
    ///
    /// Waits at most `timeout` for room in the outbound queue. Fails if the
    /// connection is closed, the transport end is gone, or the wait times out.
    pub async fn send(&self, payload: Bytes, timeout: Duration) -> Result<(), SendError> {
        if self.signal.is_closed() {
            return Err(SendError::Closed);
        }

        tokio::select! {
            biased;
            _ = self.signal.closed.cancelled() => Err(SendError::Closed),
            res = tokio::time::timeout(timeout, self.outbound.send(payload)) => match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(SendError::Closed),
                Err(_) => Err(SendError::TimedOut(timeout)),
            },
        }
    }

    /// Close the connection from the hub side
    ///
    /// Idempotent. Returns `true` only for the call that actually closed it,
    /// even when several callers race. A connection the transport already
    /// closed returns `false`.
    pub fn close(&self) -> bool {
        self.signal.evict()
    }

    /// Check whether the connection has been closed by either side
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    /// Wait until the connection is closed
    pub async fn closed(&self) {
        self.signal.closed.cancelled().await
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl std::hash::Hash for ConnectionHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Hub side of a connection: the send handle plus the inbound stream
#[derive(Debug)]
pub struct Connection {
    handle: ConnectionHandle,
    inbound: mpsc::Receiver<Result<Bytes, ReadError>>,
}

impl Connection {
    /// Connection identity
    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    /// Shared send handle
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Read the next inbound payload
    ///
    /// After a transport close, payloads already queued are returned before
    /// `ReadError::Closed`. A hub close returns `ReadError::Closed` at once.
    /// A transport error is returned as reported.
    pub async fn recv(&mut self) -> Result<Bytes, ReadError> {
        tokio::select! {
            biased;
            _ = self.handle.signal.evicted.cancelled() => Err(ReadError::Closed),
            next = self.inbound.recv() => next.unwrap_or(Err(ReadError::Closed)),
            _ = self.handle.signal.closed.cancelled() => Err(ReadError::Closed),
        }
    }
}

/// Cloneable inbound writer for the transport side
#[derive(Debug, Clone)]
pub struct PeerSender {
    id: ConnectionId,
    inbound: mpsc::Sender<Result<Bytes, ReadError>>,
    signal: CloseSignal,
}

impl PeerSender {
    /// Connection identity
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Hand a payload received from the peer to the hub
    pub async fn deliver(&self, payload: Bytes) -> Result<(), ReadError> {
        if self.signal.is_closed() {
            return Err(ReadError::Closed);
        }
        self.inbound
            .send(Ok(payload))
            .await
            .map_err(|_| ReadError::Closed)
    }

    /// Report a transport error to the hub; ends the receive loop
    pub async fn fail(&self, reason: impl Into<String>) {
        let _ = self
            .inbound
            .send(Err(ReadError::Transport(reason.into())))
            .await;
    }

    /// Close the connection from the transport side
    pub fn close(&self) {
        self.signal.hang_up();
    }

    /// Check whether the connection has been closed by either side
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    /// Wait until the connection is closed
    pub async fn closed(&self) {
        self.signal.closed.cancelled().await
    }
}

/// Transport side of a connection
///
/// Dropping the link closes the connection from the transport side.
#[derive(Debug)]
pub struct PeerLink {
    outbound: mpsc::Receiver<Bytes>,
    peer: PeerSender,
}

impl PeerLink {
    /// Connection identity
    pub fn id(&self) -> ConnectionId {
        self.peer.id
    }

    /// Cloneable inbound writer for this connection
    pub fn sender(&self) -> PeerSender {
        self.peer.clone()
    }

    /// Hand a payload received from the peer to the hub
    pub async fn deliver(&self, payload: Bytes) -> Result<(), ReadError> {
        self.peer.deliver(payload).await
    }

    /// Report a transport error to the hub; ends the receive loop
    pub async fn fail(&self, reason: impl Into<String>) {
        self.peer.fail(reason).await
    }

    /// Next payload the hub wants delivered to the peer
    ///
    /// Returns `None` once the connection is closed.
    pub async fn next_outbound(&mut self) -> Option<Bytes> {
        tokio::select! {
            biased;
            _ = self.peer.signal.closed.cancelled() => None,
            next = self.outbound.recv() => next,
        }
    }

    /// Take a queued outbound payload without waiting
    pub fn try_next_outbound(&mut self) -> Option<Bytes> {
        self.outbound.try_recv().ok()
    }

    /// Close the connection from the transport side
    pub fn close(&self) {
        self.peer.close();
    }

    /// Check whether the connection has been closed by either side
    pub fn is_closed(&self) -> bool {
        self.peer.is_closed()
    }

    /// Wait until the connection is closed
    pub async fn closed(&self) {
        self.peer.closed().await
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.peer.close();
    }
}
