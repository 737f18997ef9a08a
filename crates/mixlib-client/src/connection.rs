//! TCP control connection to a console.
//!
//! [`TcpConnection`] owns one TCP stream and runs the receive loop that
//! feeds a [`StreamFrameBuffer`]. Every decoded frame is, in wire order,
//! marked on the liveness watchdog, offered to the [`RequestCorrelator`],
//! and broadcast to frame subscribers. Sends from concurrent callers are
//! serialized through a write lock so two frames never interleave on the
//! wire.
//!
//! The connection is a one-way state machine:
//! `NotStarted -> Connecting -> Running -> (Stopped | Faulted)`. Both end
//! states are terminal; reconnecting means building a new connection.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mixlib_core::error::{Error, Result};
use mixlib_core::frame::{Frame, FrameCodec};

use crate::correlate::{KeyedRegistration, Matcher, RequestCorrelator};
use crate::framing::{StreamFrameBuffer, DEFAULT_CAPACITY};
use crate::liveness::LivenessWatchdog;

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default liveness window. Consoles that keep-alive every few seconds
/// stay comfortably inside this.
const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Broadcast channel capacity for frame subscribers.
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// Read chunk size for the receive loop.
const READ_CHUNK: usize = 4096;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Created, no socket yet.
    NotStarted = 0,
    /// Socket established, receive loop not yet running.
    Connecting = 1,
    /// Receive loop running.
    Running = 2,
    /// Shut down cooperatively. Terminal.
    Stopped = 3,
    /// Receive loop observed a transport or protocol fault. Terminal.
    Faulted = 4,
}

impl ConnectionState {
    fn from_u8(v: u8) -> ConnectionState {
        match v {
            0 => ConnectionState::NotStarted,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Running,
            3 => ConnectionState::Stopped,
            _ => ConnectionState::Faulted,
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Stopped | ConnectionState::Faulted)
    }
}

/// Atomic state cell enforcing that terminal states are final.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ConnectionState) -> Self {
        StateCell(AtomicU8::new(state as u8))
    }

    fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move to `to` unless already in a terminal state. Returns whether
    /// the transition happened.
    fn transition(&self, to: ConnectionState) -> bool {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            if ConnectionState::from_u8(current).is_terminal() {
                return false;
            }
            match self.0.compare_exchange(
                current,
                to as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Options for a [`TcpConnection`].
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Maximum time to wait for the TCP connect.
    pub connect_timeout: Duration,
    /// Window within which inbound traffic must be seen for
    /// [`is_healthy`](TcpConnection::is_healthy) to hold.
    pub liveness_timeout: Duration,
    /// Receive buffer capacity; a frame larger than this faults the
    /// connection.
    pub buffer_capacity: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptions {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            buffer_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// One TCP control connection to a console.
///
/// Safe to share across tasks (`Arc<TcpConnection>`): sends serialize
/// through an internal lock, request registration is lock-protected, and
/// the receive loop runs as an independent spawned task.
pub struct TcpConnection {
    addr: String,
    codec: Arc<dyn FrameCodec>,
    options: ConnectionOptions,
    state: Arc<StateCell>,
    /// Write half, taken on teardown. `None` before connect and after close.
    writer: Mutex<Option<WriteHalf<TcpStream>>>,
    /// Read half parked between `connect()` and `start()`.
    reader: std::sync::Mutex<Option<ReadHalf<TcpStream>>>,
    correlator: RequestCorrelator,
    watchdog: Arc<LivenessWatchdog>,
    frame_tx: broadcast::Sender<Frame>,
    cancel: CancellationToken,
    read_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TcpConnection {
    /// Create a connection in the `NotStarted` state.
    pub fn new(addr: &str, codec: Arc<dyn FrameCodec>, options: ConnectionOptions) -> Self {
        let (frame_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let watchdog = Arc::new(LivenessWatchdog::new(options.liveness_timeout));
        TcpConnection {
            addr: addr.to_string(),
            codec,
            options,
            state: Arc::new(StateCell::new(ConnectionState::NotStarted)),
            writer: Mutex::new(None),
            reader: std::sync::Mutex::new(None),
            correlator: RequestCorrelator::new(),
            watchdog,
            frame_tx,
            cancel: CancellationToken::new(),
            read_task: std::sync::Mutex::new(None),
        }
    }

    /// Establish the TCP stream. `NotStarted -> Connecting`.
    pub async fn connect(&self) -> Result<()> {
        if self.state.load() != ConnectionState::NotStarted {
            return Err(Error::Transport(format!(
                "connect() in state {:?}",
                self.state.load()
            )));
        }
        tracing::debug!(addr = %self.addr, "connecting to console");

        let stream = tokio::time::timeout(
            self.options.connect_timeout,
            TcpStream::connect(&self.addr),
        )
        .await
        .map_err(|_| {
            tracing::error!(addr = %self.addr, "TCP connection timed out");
            Error::Timeout
        })?
        .map_err(|e| {
            tracing::error!(addr = %self.addr, error = %e, "TCP connection failed");
            Error::Transport(format!("connect to {} failed: {e}", self.addr))
        })?;

        // Fader moves are small and latency-sensitive; disable Nagle.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %self.addr, error = %e, "failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = tokio::io::split(stream);
        *self.writer.lock().await = Some(write_half);
        *lock_std(&self.reader) = Some(read_half);
        self.state.transition(ConnectionState::Connecting);

        tracing::debug!(addr = %self.addr, "TCP connection established");
        Ok(())
    }

    /// Start the receive loop. `Connecting -> Running`.
    pub fn start(&self) -> Result<()> {
        let read_half = lock_std(&self.reader)
            .take()
            .ok_or(Error::NotConnected)?;
        if !self.state.transition(ConnectionState::Running) {
            return Err(Error::NotConnected);
        }

        let task = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&self.codec),
            self.options.buffer_capacity,
            self.correlator.clone(),
            Arc::clone(&self.watchdog),
            self.frame_tx.clone(),
            Arc::clone(&self.state),
            self.cancel.clone(),
            self.addr.clone(),
        ));
        *lock_std(&self.read_task) = Some(task);
        Ok(())
    }

    /// Convenience: create, connect, and start in one call.
    pub async fn open(
        addr: &str,
        codec: Arc<dyn FrameCodec>,
        options: ConnectionOptions,
    ) -> Result<Arc<Self>> {
        let conn = Arc::new(Self::new(addr, codec, options));
        conn.connect().await?;
        conn.start()?;
        Ok(conn)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Whether the receive loop is running and traffic has been seen
    /// within the liveness window. Advisory.
    pub fn is_healthy(&self) -> bool {
        self.state.load() == ConnectionState::Running && self.watchdog.is_healthy()
    }

    /// The liveness watchdog for this connection.
    pub fn watchdog(&self) -> &LivenessWatchdog {
        &self.watchdog
    }

    /// The request correlator for this connection.
    pub fn correlator(&self) -> &RequestCorrelator {
        &self.correlator
    }

    /// Subscribe to every decoded inbound frame, in wire order.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<Frame> {
        self.frame_tx.subscribe()
    }

    /// Write one encoded frame to the socket.
    ///
    /// Whole-frame writes from concurrent callers are serialized; two
    /// sends never interleave mid-frame.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        match self.state.load() {
            ConnectionState::Connecting | ConnectionState::Running => {}
            _ => return Err(Error::NotConnected),
        }
        let mut writer = self.writer.lock().await;
        let w = writer.as_mut().ok_or(Error::NotConnected)?;
        tracing::trace!(addr = %self.addr, bytes = bytes.len(), "sending frame");
        w.write_all(bytes).await.map_err(map_io_error)?;
        w.flush().await.map_err(map_io_error)?;
        Ok(())
    }

    /// Send a request and await the first frame accepted by `matcher`.
    ///
    /// The request is registered before the bytes go out, so a reply
    /// racing the send cannot be missed. Resolves with the frame,
    /// [`Error::Timeout`], or [`Error::Cancelled`] on teardown.
    pub async fn request(
        &self,
        bytes: &[u8],
        matcher: Matcher,
        timeout: Duration,
    ) -> Result<Frame> {
        let reply = self.correlator.register(matcher);
        if let Err(e) = self.send(bytes).await {
            reply.cancel();
            return Err(e);
        }
        reply.wait_cancellable(timeout, &self.cancel).await
    }

    /// Like [`request`](TcpConnection::request), but with at most one
    /// request in flight per `key`.
    ///
    /// If a request with the same key is already outstanding, no bytes are
    /// sent and the caller awaits the in-flight reply (the full-state dump
    /// pattern: one dump request at a time, late callers share it).
    pub async fn request_keyed(
        &self,
        key: &str,
        bytes: &[u8],
        matcher: Matcher,
        timeout: Duration,
    ) -> Result<Frame> {
        let KeyedRegistration {
            reply,
            newly_registered,
        } = self.correlator.register_keyed(key, matcher);
        if newly_registered {
            if let Err(e) = self.send(bytes).await {
                reply.cancel();
                return Err(e);
            }
        }
        reply.wait_cancellable(timeout, &self.cancel).await
    }

    /// Shut down cooperatively. `-> Stopped` (unless already Faulted).
    ///
    /// Cancels the receive loop, fails every pending request, and releases
    /// the socket. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.state.load().is_terminal() && lock_std(&self.read_task).is_none() {
            return Ok(());
        }
        tracing::debug!(addr = %self.addr, "closing connection");

        self.cancel.cancel();
        self.state.transition(ConnectionState::Stopped);

        if let Some(mut w) = self.writer.lock().await.take() {
            let _ = w.shutdown().await;
        }
        let task = lock_std(&self.read_task).take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.correlator.fail_all(false);

        tracing::debug!(addr = %self.addr, "connection closed");
        Ok(())
    }
}

/// Lock a std mutex, recovering from poisoning.
fn lock_std<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

/// The receive loop. Runs as a spawned task until cancelled or faulted.
#[allow(clippy::too_many_arguments)]
async fn read_loop(
    mut read_half: ReadHalf<TcpStream>,
    codec: Arc<dyn FrameCodec>,
    buffer_capacity: usize,
    correlator: RequestCorrelator,
    watchdog: Arc<LivenessWatchdog>,
    frame_tx: broadcast::Sender<Frame>,
    state: Arc<StateCell>,
    cancel: CancellationToken,
    addr: String,
) {
    let mut buffer = StreamFrameBuffer::with_capacity(buffer_capacity);
    let mut chunk = [0u8; READ_CHUNK];

    let fault: Option<String> = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!(addr = %addr, "receive loop cancelled");
                break None;
            }

            read = read_half.read(&mut chunk) => match read {
                Ok(0) => {
                    // Zero-length read on a stream: the peer closed while
                    // we expected a live session.
                    break Some("peer closed connection".to_string());
                }
                Ok(n) => {
                    tracing::trace!(addr = %addr, bytes = n, "received chunk");
                    let result = buffer.process(&chunk[..n], &*codec, |frame| {
                        watchdog.mark_seen();
                        let consumed = correlator.offer(&frame);
                        tracing::trace!(
                            kind = frame.kind,
                            consumed_by_request = consumed,
                            "dispatching frame"
                        );
                        let _ = frame_tx.send(frame);
                    });
                    if let Err(e) = result {
                        break Some(e.to_string());
                    }
                }
                Err(e) => {
                    break Some(format!("read error: {e}"));
                }
            }
        }
    };

    if let Some(reason) = fault {
        tracing::error!(addr = %addr, reason = %reason, "connection faulted");
        state.transition(ConnectionState::Faulted);
        correlator.fail_all(true);
    }
    // Cooperative shutdown: close() owns the Stopped transition and the
    // pending-request cleanup.
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixlib_core::frame::{encode_binary_frame, BinaryFrameCodec};
    use tokio::net::TcpListener;

    fn codec() -> Arc<dyn FrameCodec> {
        Arc::new(BinaryFrameCodec::default())
    }

    fn match_kind(kind: u16) -> Matcher {
        Box::new(move |f: &Frame| f.kind == kind)
    }

    async fn test_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn request_response_round_trip() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).await.unwrap();
            // Expect the request frame, answer with kind 0x02.
            assert_eq!(&buf[..n], &encode_binary_frame(0x01, b"ping")[..]);
            stream
                .write_all(&encode_binary_frame(0x02, b"pong"))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();
        assert_eq!(conn.state(), ConnectionState::Running);

        let reply = conn
            .request(
                &encode_binary_frame(0x01, b"ping"),
                match_kind(2),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(reply.body, b"pong");

        conn.close().await.unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn frames_broadcast_in_wire_order() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut bytes = Vec::new();
            for kind in 1..=5u8 {
                bytes.extend_from_slice(&encode_binary_frame(kind, &[kind]));
            }
            stream.write_all(&bytes).await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();
        let mut frames = conn.subscribe_frames();

        for expected in 1..=5u16 {
            let frame = tokio::time::timeout(Duration::from_secs(2), frames.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(frame.kind, expected);
        }

        conn.close().await.unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn inbound_traffic_marks_liveness() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream
                .write_all(&encode_binary_frame(0x0F, &[]))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();
        assert!(!conn.is_healthy(), "healthy before any traffic");

        let mut frames = conn.subscribe_frames();
        frames.recv().await.unwrap();
        assert!(conn.is_healthy());

        conn.close().await.unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn malformed_stream_faults_and_fails_pending() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Wait for the request so it is registered before the fault.
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            // Garbage that cannot start a frame.
            stream.write_all(&[0x00, 0x01, 0x02, 0x03]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();

        let result = conn
            .request(
                &encode_binary_frame(0x01, b""),
                match_kind(2),
                Duration::from_secs(2),
            )
            .await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert_eq!(conn.state(), ConnectionState::Faulted);
        assert_eq!(conn.correlator().pending_count(), 0);

        server.abort();
    }

    #[tokio::test]
    async fn peer_close_faults_connection() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();
        server.await.unwrap();

        // Give the receive loop a moment to observe the FIN.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(conn.state(), ConnectionState::Faulted);
        assert!(!conn.is_healthy());
    }

    #[tokio::test]
    async fn faulted_state_is_terminal() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();
        server.await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(conn.state(), ConnectionState::Faulted);

        // close() after a fault must not overwrite the Faulted state.
        conn.close().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Faulted);
    }

    #[tokio::test]
    async fn close_is_cooperative_and_idempotent() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();
        assert_eq!(conn.state(), ConnectionState::Running);

        conn.close().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Stopped);

        // Idempotent.
        conn.close().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Stopped);

        // Sends after close fail cleanly.
        let result = conn.send(&encode_binary_frame(0x01, b"")).await;
        assert!(matches!(result, Err(Error::NotConnected)));

        server.abort();
    }

    #[tokio::test]
    async fn close_cancels_outstanding_requests() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            // Never respond.
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();

        let request = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move {
                conn.request(
                    &encode_binary_frame(0x01, b""),
                    match_kind(2),
                    Duration::from_secs(10),
                )
                .await
            })
        };
        // Let the request register and send.
        tokio::time::sleep(Duration::from_millis(50)).await;
        conn.close().await.unwrap();

        let result = request.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        server.abort();
    }

    #[tokio::test]
    async fn concurrent_sends_do_not_interleave() {
        let (listener, addr) = test_listener().await;

        // Server decodes the stream it receives; interleaved writes would
        // surface as malformed frames.
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let codec = BinaryFrameCodec::default();
            let mut buffer = StreamFrameBuffer::new();
            let mut got = Vec::new();
            let mut chunk = [0u8; 1024];
            while got.len() < 20 {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buffer
                    .process(&chunk[..n], &codec, |f| got.push(f))
                    .expect("interleaved write corrupted the stream");
            }
            got
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..20u8 {
            let conn = Arc::clone(&conn);
            tasks.push(tokio::spawn(async move {
                conn.send(&encode_binary_frame(i, &[i; 100])).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let got = server.await.unwrap();
        assert_eq!(got.len(), 20);
        for frame in got {
            assert_eq!(frame.body, vec![frame.kind as u8; 100]);
        }

        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn keyed_request_sends_once() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).await.unwrap();
            let received = buf[..n].to_vec();
            // Respond after a delay so the second caller joins in flight.
            tokio::time::sleep(Duration::from_millis(100)).await;
            stream
                .write_all(&encode_binary_frame(0x09, b"state"))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            received
        });

        let conn = TcpConnection::open(&addr, codec(), ConnectionOptions::default())
            .await
            .unwrap();

        let req = encode_binary_frame(0x08, b"dump");
        let (a, b) = tokio::join!(
            conn.request_keyed("full-state", &req, match_kind(9), Duration::from_secs(2)),
            conn.request_keyed("full-state", &req, match_kind(9), Duration::from_secs(2)),
        );
        assert_eq!(a.unwrap().body, b"state");
        assert_eq!(b.unwrap().body, b"state");

        conn.close().await.unwrap();
        // Exactly one request frame reached the wire.
        let received = server.await.unwrap();
        assert_eq!(received, encode_binary_frame(0x08, b"dump"));
    }

    #[tokio::test]
    async fn connect_refused_reports_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let conn = TcpConnection::new(&addr, codec(), ConnectionOptions::default());
        let result = conn.connect().await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(conn.state(), ConnectionState::NotStarted);
    }

    #[tokio::test]
    async fn start_before_connect_fails() {
        let conn = TcpConnection::new("127.0.0.1:1", codec(), ConnectionOptions::default());
        assert!(matches!(conn.start(), Err(Error::NotConnected)));
    }
}
