//! Stream framing buffer.
//!
//! TCP delivers a console's frames as arbitrarily-sized chunks: a read may
//! end mid-header, mid-body, or cover three frames and half of a fourth.
//! [`StreamFrameBuffer`] accumulates those chunks and repeatedly runs the
//! vendor's [`FrameCodec`] over them, emitting every complete frame exactly
//! once regardless of how the bytes were split across reads.
//!
//! Datagram transports do not use this type; a datagram is already
//! frame-aligned.

use mixlib_core::error::{Error, Result};
use mixlib_core::frame::{DecodeResult, Frame, FrameCodec};

/// Default buffer capacity. Larger than any frame the supported consoles
/// send, including full-state dumps.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Accumulates stream bytes and extracts complete frames via a [`FrameCodec`].
///
/// The buffer has a fixed capacity: a peer that starts a frame it never
/// completes (or advertises a length beyond the capacity) is a protocol
/// fault, and [`process`](StreamFrameBuffer::process) reports it as
/// [`Error::Protocol`] rather than growing without bound. Unconsumed tail
/// bytes are compacted to the front before the next append, so the buffer
/// only ever holds at most one partial frame plus whatever arrived with it.
#[derive(Debug)]
pub struct StreamFrameBuffer {
    buf: Vec<u8>,
    /// Start of not-yet-consumed bytes.
    read: usize,
    /// End of valid bytes.
    write: usize,
    capacity: usize,
}

impl StreamFrameBuffer {
    /// Create a buffer with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        StreamFrameBuffer {
            buf: Vec::with_capacity(capacity),
            read: 0,
            write: 0,
            capacity,
        }
    }

    /// Number of buffered bytes not yet consumed by a frame.
    pub fn pending_len(&self) -> usize {
        self.write - self.read
    }

    /// Append `new_bytes` and emit every frame that is now complete.
    ///
    /// `on_frame` is invoked once per decoded frame, in wire order, during
    /// this call. Returns [`Error::Protocol`] if the codec reports a
    /// malformed window or the append would exceed the buffer capacity;
    /// either way the connection must be failed, since byte alignment
    /// cannot be recovered.
    pub fn process(
        &mut self,
        new_bytes: &[u8],
        codec: &dyn FrameCodec,
        mut on_frame: impl FnMut(Frame),
    ) -> Result<()> {
        // Compact leftover tail bytes to the front before appending.
        if self.read > 0 {
            self.buf.copy_within(self.read..self.write, 0);
            self.write -= self.read;
            self.read = 0;
            self.buf.truncate(self.write);
        }

        if self.write + new_bytes.len() > self.capacity {
            return Err(Error::Protocol(format!(
                "frame buffer overflow: {} buffered + {} new exceeds capacity {}",
                self.write,
                new_bytes.len(),
                self.capacity
            )));
        }
        self.buf.extend_from_slice(new_bytes);
        self.write += new_bytes.len();

        loop {
            match codec.decode(&self.buf[self.read..self.write]) {
                DecodeResult::Complete { frame, consumed } => {
                    tracing::trace!(
                        kind = frame.kind,
                        bytes = consumed,
                        "decoded frame from stream"
                    );
                    self.read += consumed;
                    on_frame(frame);
                }
                DecodeResult::Incomplete => break,
                DecodeResult::Malformed(reason) => {
                    tracing::error!(reason = %reason, "malformed frame in stream");
                    return Err(Error::Protocol(reason));
                }
            }
        }

        // Everything consumed: reset offsets, no copy needed.
        if self.read == self.write {
            self.read = 0;
            self.write = 0;
            self.buf.clear();
        }

        Ok(())
    }
}

impl Default for StreamFrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixlib_core::frame::{encode_binary_frame, BinaryFrameCodec};

    fn collect(buffer: &mut StreamFrameBuffer, bytes: &[u8]) -> Vec<Frame> {
        let codec = BinaryFrameCodec::default();
        let mut frames = Vec::new();
        buffer
            .process(bytes, &codec, |f| frames.push(f))
            .expect("process failed");
        frames
    }

    #[test]
    fn single_frame_single_chunk() {
        let mut buffer = StreamFrameBuffer::new();
        let frames = collect(&mut buffer, &encode_binary_frame(0x01, &[0xAA, 0xBB]));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, 1);
        assert_eq!(frames[0].body, vec![0xAA, 0xBB]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn fragmented_frame_emitted_once_complete() {
        // The 6-byte frame [7F 01 02 00 AA BB] split across reads of
        // [7F 01], [02], [00 AA], [BB]: exactly one frame, emitted only
        // after the final chunk.
        let mut buffer = StreamFrameBuffer::new();
        assert!(collect(&mut buffer, &[0x7F, 0x01]).is_empty());
        assert!(collect(&mut buffer, &[0x02]).is_empty());
        assert!(collect(&mut buffer, &[0x00, 0xAA]).is_empty());
        let frames = collect(&mut buffer, &[0xBB]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, 1);
        assert_eq!(frames[0].body, vec![0xAA, 0xBB]);
    }

    #[test]
    fn framing_idempotent_under_one_byte_chunks() {
        // Any well-formed stream fed one byte at a time must yield the
        // same frames, in the same order, as fed whole.
        let mut stream = Vec::new();
        stream.extend_from_slice(&encode_binary_frame(0x01, &[1, 2, 3]));
        stream.extend_from_slice(&encode_binary_frame(0x02, &[]));
        stream.extend_from_slice(&encode_binary_frame(0x03, &[0xFF; 40]));
        stream.extend_from_slice(&encode_binary_frame(0x04, b"name"));

        let mut whole = StreamFrameBuffer::new();
        let expected = collect(&mut whole, &stream);
        assert_eq!(expected.len(), 4);

        let mut dribble = StreamFrameBuffer::new();
        let mut got = Vec::new();
        let codec = BinaryFrameCodec::default();
        for byte in &stream {
            dribble
                .process(std::slice::from_ref(byte), &codec, |f| got.push(f))
                .unwrap();
        }
        assert_eq!(got, expected);
        assert_eq!(dribble.pending_len(), 0);
    }

    #[test]
    fn framing_idempotent_under_odd_chunk_sizes() {
        let mut stream = Vec::new();
        for kind in 1..=9u8 {
            stream.extend_from_slice(&encode_binary_frame(kind, &vec![kind; kind as usize * 3]));
        }

        let mut whole = StreamFrameBuffer::new();
        let expected = collect(&mut whole, &stream);

        for chunk_size in [2usize, 3, 5, 7, 11, 13] {
            let mut buffer = StreamFrameBuffer::new();
            let mut got = Vec::new();
            let codec = BinaryFrameCodec::default();
            for chunk in stream.chunks(chunk_size) {
                buffer.process(chunk, &codec, |f| got.push(f)).unwrap();
            }
            assert_eq!(got, expected, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn compaction_preserves_partial_frame() {
        // Two complete frames plus the first 3 bytes of a third in one
        // chunk; the tail must survive compaction and complete later.
        let mut buffer = StreamFrameBuffer::new();
        let third = encode_binary_frame(0x07, &[9, 8, 7, 6]);

        let mut chunk = Vec::new();
        chunk.extend_from_slice(&encode_binary_frame(0x01, &[1]));
        chunk.extend_from_slice(&encode_binary_frame(0x02, &[2]));
        chunk.extend_from_slice(&third[..3]);

        let frames = collect(&mut buffer, &chunk);
        assert_eq!(frames.len(), 2);
        assert_eq!(buffer.pending_len(), 3);

        let frames = collect(&mut buffer, &third[3..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, 7);
        assert_eq!(frames[0].body, vec![9, 8, 7, 6]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn repeated_compactions_stay_correct() {
        // Many frames, always delivered so each chunk ends mid-frame,
        // forcing a compaction per process() call.
        let mut stream = Vec::new();
        for i in 0..50u8 {
            stream.extend_from_slice(&encode_binary_frame(i, &[i, i, i]));
        }

        let mut buffer = StreamFrameBuffer::new();
        let codec = BinaryFrameCodec::default();
        let mut got = Vec::new();
        // 5-byte chunks against 7-byte frames guarantees every call leaves
        // a tail.
        for chunk in stream.chunks(5) {
            buffer.process(chunk, &codec, |f| got.push(f)).unwrap();
        }
        assert_eq!(got.len(), 50);
        for (i, frame) in got.iter().enumerate() {
            assert_eq!(frame.kind, i as u16);
            assert_eq!(frame.body, vec![i as u8; 3]);
        }
    }

    #[test]
    fn frame_exactly_filling_buffer_is_recognized() {
        // A frame whose final byte lands exactly at capacity must decode
        // in the same call, not require one more (empty) read.
        let frame = encode_binary_frame(0x01, &[0x55; 12]);
        let mut buffer = StreamFrameBuffer::with_capacity(frame.len());
        let codec = BinaryFrameCodec::default();
        let mut got = Vec::new();
        buffer.process(&frame, &codec, |f| got.push(f)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].body.len(), 12);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn overflow_is_fatal() {
        let mut buffer = StreamFrameBuffer::with_capacity(8);
        let codec = BinaryFrameCodec::default();
        // A header promising a 100-byte body parks 4 bytes in the buffer,
        // then the next append overflows.
        let mut header = vec![0x7F, 0x01];
        header.extend_from_slice(&100u16.to_le_bytes());
        buffer.process(&header, &codec, |_| {}).unwrap();

        let result = buffer.process(&[0u8; 10], &codec, |_| {});
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn malformed_is_fatal() {
        let mut buffer = StreamFrameBuffer::new();
        let codec = BinaryFrameCodec::default();
        let result = buffer.process(&[0x00, 0x01, 0x02, 0x00], &codec, |_| {});
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn offsets_reset_when_fully_consumed() {
        let mut buffer = StreamFrameBuffer::with_capacity(16);
        let codec = BinaryFrameCodec::default();
        // Repeatedly filling a small buffer only works if offsets reset.
        for _ in 0..10 {
            let frame = encode_binary_frame(0x01, &[0; 10]);
            let mut count = 0;
            buffer.process(&frame, &codec, |_| count += 1).unwrap();
            assert_eq!(count, 1);
            assert_eq!(buffer.pending_len(), 0);
        }
    }
}
