use std::collections::HashMap;

use super::chunk::extract_chunks;
use super::types::{Limits, ParseError, ParseErrorKind, ResponseHead};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    Head(ResponseHead),
    Body(Vec<u8>),
    Stream(Vec<u8>),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    AwaitingHeaders,
    StreamingBody,
    Upgraded,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    ContentLength { remaining: usize },
    Chunked,
}

/// Incremental response parser. Raw socket bytes go in through `push`,
/// protocol events come out; buffer fragmentation never changes the
/// emitted event payloads. Once `Complete` or `Failed` is reached the
/// reader ignores all further input.
pub struct ResponseReader {
    state: ReaderState,
    buffer: Vec<u8>,
    mode: BodyMode,
    limits: Limits,
}

impl Default for ResponseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseReader {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            state: ReaderState::AwaitingHeaders,
            buffer: Vec::new(),
            mode: BodyMode::Chunked,
            limits,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<ResponseEvent>, ParseError> {
        if matches!(self.state, ReaderState::Complete | ReaderState::Failed) {
            return Ok(Vec::new());
        }
        match self.push_inner(bytes) {
            Ok(events) => Ok(events),
            Err(error) => {
                self.state = ReaderState::Failed;
                Err(error)
            }
        }
    }

    pub fn push_eof(&mut self) -> Result<Vec<ResponseEvent>, ParseError> {
        match self.state {
            ReaderState::Complete | ReaderState::Failed => Ok(Vec::new()),
            ReaderState::Upgraded => {
                self.state = ReaderState::Complete;
                Ok(vec![ResponseEvent::End])
            }
            ReaderState::AwaitingHeaders | ReaderState::StreamingBody => {
                self.state = ReaderState::Failed;
                Err(ParseError {
                    kind: ParseErrorKind::UnexpectedEof,
                    offset: self.buffer.len(),
                })
            }
        }
    }

    fn push_inner(&mut self, bytes: &[u8]) -> Result<Vec<ResponseEvent>, ParseError> {
        match self.state {
            ReaderState::AwaitingHeaders => self.consume_headers(bytes),
            ReaderState::StreamingBody => self.consume_body(bytes),
            ReaderState::Upgraded => {
                if bytes.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![ResponseEvent::Stream(bytes.to_vec())])
            }
            ReaderState::Complete | ReaderState::Failed => Ok(Vec::new()),
        }
    }

    fn consume_headers(&mut self, bytes: &[u8]) -> Result<Vec<ResponseEvent>, ParseError> {
        self.buffer.extend_from_slice(bytes);
        let Some(header_end) = twoway::find_bytes(&self.buffer, HEADER_TERMINATOR) else {
            if self.buffer.len() > self.limits.max_header_bytes {
                return Err(ParseError {
                    kind: ParseErrorKind::HeaderTooLarge,
                    offset: self.limits.max_header_bytes,
                });
            }
            return Ok(Vec::new());
        };
        if header_end > self.limits.max_header_bytes {
            return Err(ParseError {
                kind: ParseErrorKind::HeaderTooLarge,
                offset: self.limits.max_header_bytes,
            });
        }

        let head = parse_head(&self.buffer[..header_end])?;
        let leftover = self.buffer[header_end + HEADER_TERMINATOR.len()..].to_vec();
        self.buffer.clear();

        let mut events = vec![ResponseEvent::Head(head.clone())];

        if head.is_upgrade() {
            self.state = ReaderState::Upgraded;
            if !leftover.is_empty() {
                events.push(ResponseEvent::Stream(leftover));
            }
            return Ok(events);
        }

        if header_token_present(&head, "transfer-encoding", "chunked") {
            self.mode = BodyMode::Chunked;
            self.state = ReaderState::StreamingBody;
            events.extend(self.consume_body(&leftover)?);
            return Ok(events);
        }

        if let Some(length) = head
            .header("content-length")
            .and_then(|value| value.trim().parse::<usize>().ok())
        {
            if length == 0 {
                self.state = ReaderState::Complete;
                events.push(ResponseEvent::End);
                return Ok(events);
            }
            self.mode = BodyMode::ContentLength { remaining: length };
            self.state = ReaderState::StreamingBody;
            events.extend(self.consume_body(&leftover)?);
            return Ok(events);
        }

        // No framing signal at all: historic daemon behavior treats the
        // response as header-only and ends it here.
        self.state = ReaderState::Complete;
        events.push(ResponseEvent::End);
        Ok(events)
    }

    fn consume_body(&mut self, bytes: &[u8]) -> Result<Vec<ResponseEvent>, ParseError> {
        let mut events = Vec::new();

        match &mut self.mode {
            BodyMode::ContentLength { remaining } => {
                let take = bytes.len().min(*remaining);
                *remaining -= take;
                if take > 0 {
                    events.push(ResponseEvent::Body(bytes[..take].to_vec()));
                }
                if *remaining == 0 {
                    self.state = ReaderState::Complete;
                    events.push(ResponseEvent::End);
                }
            }
            BodyMode::Chunked => {
                self.buffer.extend_from_slice(bytes);
                if self.buffer.len() > self.limits.max_buffer_bytes {
                    return Err(ParseError {
                        kind: ParseErrorKind::BufferTooLarge,
                        offset: self.limits.max_buffer_bytes,
                    });
                }
                let scan = extract_chunks(&self.buffer)?;
                self.buffer = scan.remainder;
                for chunk in scan.chunks {
                    if chunk.is_empty() {
                        self.buffer.clear();
                        self.state = ReaderState::Complete;
                        events.push(ResponseEvent::End);
                        break;
                    }
                    events.push(ResponseEvent::Body(chunk));
                }
            }
        }

        Ok(events)
    }
}

fn parse_head(bytes: &[u8]) -> Result<ResponseHead, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError {
        kind: ParseErrorKind::InvalidStatusLine,
        offset: 0,
    })?;
    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or("");

    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next().unwrap_or("");
    // An unparsable status code is reported as 0 rather than an error.
    let status = parts
        .next()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(0);
    let reason = parts.next().unwrap_or("").trim().to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.find(':') else {
            continue;
        };
        if colon == 0 {
            continue;
        }
        let name = line[..colon].trim().to_ascii_lowercase();
        let value = line[colon + 1..].trim().to_string();
        headers.insert(name, value);
    }

    Ok(ResponseHead {
        status,
        reason,
        headers,
    })
}

fn header_token_present(head: &ResponseHead, name: &str, token: &str) -> bool {
    head.header(name).is_some_and(|value| {
        value
            .split(',')
            .any(|part| part.trim().eq_ignore_ascii_case(token))
    })
}
