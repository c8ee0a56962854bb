use super::types::{Limits, ParseError, ParseErrorKind};

pub const FRAME_HEADER_LEN: usize = 8;

const SELECTOR_STDOUT: u8 = 1;
const SELECTOR_STDERR: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub stream: StreamKind,
    pub payload: Vec<u8>,
}

/// Reassembles the engine's 8-byte-header multiplexed stream. Fragments
/// may split a frame anywhere, including inside the header; a frame is
/// emitted exactly once, in order, when its full payload has arrived.
/// Frames carrying an unknown selector byte are dropped whole.
#[derive(Debug)]
pub struct FrameDemuxer {
    buffer: Vec<u8>,
    max_frame_bytes: usize,
    consumed: usize,
}

impl Default for FrameDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDemuxer {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_bytes: limits.max_frame_bytes,
            consumed: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<StreamFrame>, ParseError> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while self.buffer.len() >= FRAME_HEADER_LEN {
            let length = u32::from_be_bytes([
                self.buffer[4],
                self.buffer[5],
                self.buffer[6],
                self.buffer[7],
            ]) as usize;
            if length > self.max_frame_bytes {
                // Offset of the length field within the whole stream.
                return Err(ParseError {
                    kind: ParseErrorKind::FrameTooLarge,
                    offset: self.consumed + 4,
                });
            }
            if self.buffer.len() < FRAME_HEADER_LEN + length {
                break;
            }

            let selector = self.buffer[0];
            let payload = self.buffer[FRAME_HEADER_LEN..FRAME_HEADER_LEN + length].to_vec();
            self.buffer.drain(..FRAME_HEADER_LEN + length);
            self.consumed += FRAME_HEADER_LEN + length;

            let stream = match selector {
                SELECTOR_STDOUT => StreamKind::Stdout,
                SELECTOR_STDERR => StreamKind::Stderr,
                _ => continue,
            };
            frames.push(StreamFrame { stream, payload });
        }

        Ok(frames)
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

pub fn encode_frame(stream: StreamKind, payload: &[u8]) -> Vec<u8> {
    let selector = match stream {
        StreamKind::Stdout => SELECTOR_STDOUT,
        StreamKind::Stderr => SELECTOR_STDERR,
    };
    let mut bytes = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    bytes.push(selector);
    bytes.extend_from_slice(&[0, 0, 0]);
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}
