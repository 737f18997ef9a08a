//! Wire frames and the per-vendor frame codec contract.
//!
//! Every console speaks its own framing: fixed binary headers with length
//! fields, single-byte type markers, or newline-delimited text lines. The
//! [`FrameCodec`] trait is the one contract they all satisfy: given a
//! read-only byte window, report *incomplete*, *complete + consumed length*,
//! or *malformed* -- using only the bytes available, never blocking.
//!
//! "Incomplete" is an expected, frequent outcome during normal streaming
//! (a read boundary landed mid-frame), so it is a [`DecodeResult`] variant
//! rather than an error.

use std::fmt;

/// One complete, decoded unit of a console's wire protocol.
///
/// A `Frame` owns a private copy of its body: the receive buffer it was
/// parsed from is reused for subsequent reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Type/command discriminator from the wire header.
    pub kind: u16,
    /// The opaque frame body.
    pub body: Vec<u8>,
}

impl Frame {
    /// Create a frame from its discriminator and body.
    pub fn new(kind: u16, body: Vec<u8>) -> Self {
        Frame { kind, body }
    }

    /// The body interpreted as UTF-8 text, if it is valid UTF-8.
    ///
    /// Convenience for line-oriented protocols whose frames are text.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(kind=0x{:02X}, {} bytes)", self.kind, self.body.len())
    }
}

/// Result of one decode attempt against a byte window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// The window does not yet hold a complete frame; wait for more bytes.
    Incomplete,
    /// A frame was parsed; `consumed` bytes of the window belong to it.
    Complete {
        /// The decoded frame.
        frame: Frame,
        /// How many bytes of the window the frame occupied.
        consumed: usize,
    },
    /// The window cannot be the start of a valid frame.
    ///
    /// Fatal for a stream connection: alignment is unrecoverable.
    Malformed(String),
}

/// Per-vendor frame parser.
///
/// Implementations must decide from the window alone -- no blocking, no
/// requesting more data. The stream buffering discipline around the codec
/// lives in `mixlib-client`; datagram transports call the codec once per
/// datagram.
pub trait FrameCodec: Send + Sync {
    /// Attempt to parse one frame from the start of `window`.
    fn decode(&self, window: &[u8]) -> DecodeResult;
}

/// Length-prefixed binary framing.
///
/// Wire shape: `0x7F` magic, one type byte, u16 little-endian body length,
/// then the body. Several of the binary console protocols are minor
/// variations of this layout.
#[derive(Debug, Clone)]
pub struct BinaryFrameCodec {
    /// Largest body length the codec accepts before declaring the stream
    /// malformed. A length field beyond this is a corrupt or hostile peer,
    /// not a frame worth waiting for.
    pub max_body_len: usize,
}

/// `0x7F` frame magic for [`BinaryFrameCodec`].
pub const BINARY_FRAME_MAGIC: u8 = 0x7F;

/// Header length of [`BinaryFrameCodec`] frames (magic + type + length).
pub const BINARY_HEADER_LEN: usize = 4;

impl Default for BinaryFrameCodec {
    fn default() -> Self {
        BinaryFrameCodec {
            max_body_len: 16 * 1024,
        }
    }
}

impl FrameCodec for BinaryFrameCodec {
    fn decode(&self, window: &[u8]) -> DecodeResult {
        if window.len() < BINARY_HEADER_LEN {
            return DecodeResult::Incomplete;
        }
        if window[0] != BINARY_FRAME_MAGIC {
            return DecodeResult::Malformed(format!(
                "bad frame magic 0x{:02X} (expected 0x{:02X})",
                window[0], BINARY_FRAME_MAGIC
            ));
        }
        let kind = window[1] as u16;
        let body_len = u16::from_le_bytes([window[2], window[3]]) as usize;
        if body_len > self.max_body_len {
            return DecodeResult::Malformed(format!(
                "frame body length {body_len} exceeds limit {}",
                self.max_body_len
            ));
        }
        let total = BINARY_HEADER_LEN + body_len;
        if window.len() < total {
            return DecodeResult::Incomplete;
        }
        DecodeResult::Complete {
            frame: Frame::new(kind, window[BINARY_HEADER_LEN..total].to_vec()),
            consumed: total,
        }
    }
}

/// Encode a frame in [`BinaryFrameCodec`] wire format.
///
/// Used by tests and by vendor backends whose consoles speak this layout.
pub fn encode_binary_frame(kind: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(BINARY_HEADER_LEN + body.len());
    out.push(BINARY_FRAME_MAGIC);
    out.push(kind);
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// Newline-delimited text framing.
///
/// Each frame is one line; the trailing `\n` (and an optional `\r` before
/// it) is stripped. The decoded frame has kind 0 and the line as its body.
/// Invalid UTF-8 in a completed line is malformed -- these protocols are
/// text by definition, so binary garbage means lost alignment.
#[derive(Debug, Clone)]
pub struct LineFrameCodec {
    /// Longest line accepted before declaring the stream malformed.
    pub max_line_len: usize,
}

impl Default for LineFrameCodec {
    fn default() -> Self {
        LineFrameCodec {
            max_line_len: 8 * 1024,
        }
    }
}

impl FrameCodec for LineFrameCodec {
    fn decode(&self, window: &[u8]) -> DecodeResult {
        let Some(nl) = window.iter().position(|&b| b == b'\n') else {
            if window.len() > self.max_line_len {
                return DecodeResult::Malformed(format!(
                    "line exceeds {} bytes without terminator",
                    self.max_line_len
                ));
            }
            return DecodeResult::Incomplete;
        };
        let mut line = &window[..nl];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        if std::str::from_utf8(line).is_err() {
            return DecodeResult::Malformed("line is not valid UTF-8".into());
        }
        DecodeResult::Complete {
            frame: Frame::new(0, line.to_vec()),
            consumed: nl + 1,
        }
    }
}
