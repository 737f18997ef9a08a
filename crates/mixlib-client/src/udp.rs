//! UDP connection for datagram-oriented console traffic.
//!
//! Some consoles push high-rate data (meters in particular) over UDP
//! rather than the TCP control session. Datagrams arrive frame-aligned:
//! every datagram holds one or more complete frames and never a partial
//! one, so there is no [`StreamFrameBuffer`](crate::StreamFrameBuffer)
//! here. Loss is acceptable for this traffic; a malformed or truncated
//! datagram is logged and skipped rather than treated as a session fault.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mixlib_core::error::{Error, Result};
use mixlib_core::frame::{DecodeResult, Frame, FrameCodec};

use crate::liveness::LivenessWatchdog;

/// Maximum datagram we will receive. Generous for meter blocks.
const MAX_DATAGRAM: usize = 16 * 1024;

/// Broadcast channel capacity for frame subscribers. Meter traffic is
/// high-rate; slow subscribers lag rather than exert backpressure.
const FRAME_CHANNEL_CAPACITY: usize = 1024;

/// One UDP session with a console.
///
/// Bind a local port, optionally peer it to the console's address, and
/// start the receive loop. Decoded frames are marked on the watchdog and
/// broadcast in datagram order.
pub struct UdpConnection {
    socket: Arc<UdpSocket>,
    codec: Arc<dyn FrameCodec>,
    watchdog: Arc<LivenessWatchdog>,
    frame_tx: broadcast::Sender<Frame>,
    cancel: CancellationToken,
    /// Set by `close()` and by the recv loop when the socket errors out.
    closed: Arc<AtomicBool>,
    recv_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl UdpConnection {
    /// Bind a local address (use port 0 to let the OS pick — consoles are
    /// told the resulting port during session negotiation).
    pub async fn bind(
        local_addr: &str,
        codec: Arc<dyn FrameCodec>,
        liveness_timeout: std::time::Duration,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(local_addr).await.map_err(|e| {
            tracing::error!(addr = %local_addr, error = %e, "UDP bind failed");
            Error::Transport(format!("UDP bind {local_addr} failed: {e}"))
        })?;
        tracing::debug!(addr = %local_addr, local = %socket.local_addr().map(|a| a.to_string()).unwrap_or_default(), "UDP socket bound");

        let (frame_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        Ok(UdpConnection {
            socket: Arc::new(socket),
            codec,
            watchdog: Arc::new(LivenessWatchdog::new(liveness_timeout)),
            frame_tx,
            cancel: CancellationToken::new(),
            closed: Arc::new(AtomicBool::new(false)),
            recv_task: std::sync::Mutex::new(None),
        })
    }

    /// The locally bound port, for session negotiation.
    pub fn local_port(&self) -> Result<u16> {
        Ok(self.socket.local_addr().map_err(Error::Io)?.port())
    }

    /// Peer the socket to the console's address so [`send`](Self::send)
    /// works and inbound datagrams from other sources are filtered.
    pub async fn peer(&self, remote_addr: &str) -> Result<()> {
        self.socket.connect(remote_addr).await.map_err(|e| {
            tracing::error!(addr = %remote_addr, error = %e, "UDP peer failed");
            Error::Transport(format!("UDP connect {remote_addr} failed: {e}"))
        })
    }

    /// Start the receive loop.
    pub fn start(&self) {
        let socket = Arc::clone(&self.socket);
        let codec = Arc::clone(&self.codec);
        let watchdog = Arc::clone(&self.watchdog);
        let frame_tx = self.frame_tx.clone();
        let cancel = self.cancel.clone();
        let closed = Arc::clone(&self.closed);

        let task = tokio::spawn(async move {
            let mut datagram = [0u8; MAX_DATAGRAM];
            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        tracing::debug!("UDP receive loop cancelled");
                        break;
                    }

                    received = socket.recv_from(&mut datagram) => match received {
                        Ok((n, _from)) => {
                            tracing::trace!(bytes = n, "received datagram");
                            dispatch_datagram(&datagram[..n], &*codec, &watchdog, &frame_tx);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "UDP receive error");
                            // Socket errors fault the session: health must
                            // drop immediately, not decay with the watchdog.
                            closed.store(true, Ordering::SeqCst);
                            break;
                        }
                    }
                }
            }
        });
        *lock_std(&self.recv_task) = Some(task);
    }

    /// Whether datagrams have been seen within the liveness window.
    pub fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.watchdog.is_healthy()
    }

    /// The liveness watchdog for this session.
    pub fn watchdog(&self) -> &LivenessWatchdog {
        &self.watchdog
    }

    /// Subscribe to every decoded frame, in datagram order.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<Frame> {
        self.frame_tx.subscribe()
    }

    /// Send one encoded frame to the peered address.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        self.socket.send(bytes).await.map_err(Error::Io)?;
        Ok(())
    }

    /// Stop the receive loop and release the socket. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        let task = lock_std(&self.recv_task).take();
        if let Some(task) = task {
            let _ = task.await;
        }
        tracing::debug!("UDP session closed");
    }
}

/// Decode every frame in one datagram and dispatch it.
///
/// A datagram is self-contained: `Incomplete` mid-datagram means it was
/// truncated in flight, and `Malformed` means garbage. Both cases drop the
/// rest of the datagram; neither faults the session, matching the lossy
/// contract of this transport.
fn dispatch_datagram(
    mut window: &[u8],
    codec: &dyn FrameCodec,
    watchdog: &LivenessWatchdog,
    frame_tx: &broadcast::Sender<Frame>,
) {
    while !window.is_empty() {
        match codec.decode(window) {
            DecodeResult::Complete { frame, consumed } => {
                window = &window[consumed..];
                watchdog.mark_seen();
                let _ = frame_tx.send(frame);
            }
            DecodeResult::Incomplete => {
                tracing::warn!(
                    remaining = window.len(),
                    "truncated frame in datagram, dropping remainder"
                );
                return;
            }
            DecodeResult::Malformed(reason) => {
                tracing::warn!(reason = %reason, "malformed datagram, dropping");
                return;
            }
        }
    }
}

/// Lock a std mutex, recovering from poisoning.
fn lock_std<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
