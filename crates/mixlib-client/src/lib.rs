//! Shared protocol-client machinery for console backends.
//!
//! Every vendor backend needs the same plumbing under its protocol logic:
//! a TCP connection with a receive loop, a framing buffer that reassembles
//! frames from arbitrary read chunks, request/reply correlation against an
//! unsolicited event stream, a liveness watchdog, and (for consoles that
//! push meters over UDP) a datagram session. This crate provides that
//! plumbing once, parameterized by each vendor's
//! [`FrameCodec`](mixlib_core::FrameCodec).

pub mod connection;
pub mod correlate;
pub mod framing;
pub mod liveness;
pub mod udp;

pub use connection::{ConnectionOptions, ConnectionState, TcpConnection};
pub use correlate::{KeyedRegistration, Matcher, PendingReply, RequestCorrelator};
pub use framing::{StreamFrameBuffer, DEFAULT_CAPACITY};
pub use liveness::{Clock, LivenessWatchdog, SystemClock};
pub use udp::UdpConnection;
