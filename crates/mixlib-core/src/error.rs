//! Error types for mixlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! request-level errors are all captured here.
//!
//! The taxonomy matters for recovery: [`Error::Protocol`] and transport
//! failures are fatal for a connection (a mis-framed byte stream cannot be
//! locally repaired), while [`Error::Timeout`] and [`Error::Cancelled`] are
//! per-request outcomes that leave the connection running.

/// The error type for all mixlib operations.
///
/// Variants cover the full range of failure modes encountered when
/// communicating with mixing consoles: socket failures, wire protocol
/// decode errors, request timeouts, and cancellation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (TCP socket, UDP socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed frame, header fields out of range,
    /// frame larger than the receive buffer).
    ///
    /// Fatal for the connection: byte alignment cannot be recovered once a
    /// frame is mis-parsed, so the connection transitions to Faulted.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for a response from the console.
    #[error("timeout waiting for response")]
    Timeout,

    /// A pending request was cancelled before a reply arrived.
    ///
    /// Emitted both for explicit caller cancellation and for the cascade
    /// cancellation that happens when a connection is torn down.
    #[error("request cancelled")]
    Cancelled,

    /// The requested operation is not supported by this console model.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An invalid parameter was passed to a mixer command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the console has been established, or the
    /// connection has already been shut down.
    #[error("not connected")]
    NotConnected,

    /// The connection to the console was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
