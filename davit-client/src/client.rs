use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use davit_transport::{EngineAddr, connect};
use davit_wire::{
    Limits, ParseError, ParseErrorKind, ReaderState, ResponseEvent, ResponseHead, ResponseReader,
};

use crate::error::{EngineError, status_error};
use crate::request::EngineRequest;
use crate::response::EngineResponse;
use crate::session::{EngineIo, HijackedSession};

const READ_BUFFER_LEN: usize = 8192;
const BODY_CHANNEL_CAPACITY: usize = 64;

pub type BodyStream = ReceiverStream<Result<Vec<u8>, EngineError>>;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub addr: EngineAddr,
    pub timeout: Duration,
    pub limits: Limits,
}

impl EngineConfig {
    pub fn new(addr: EngineAddr) -> Self {
        Self {
            addr,
            timeout: Duration::from_secs(30),
            limits: Limits::default(),
        }
    }
}

/// Client for a container-engine daemon. Each call dials a fresh
/// connection and runs exactly one request/response cycle on it.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_env() -> Result<Self, EngineError> {
        Ok(Self::new(EngineConfig::new(EngineAddr::from_env()?)))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs a request and buffers the full response body. Statuses of
    /// 400 and above come back as typed errors.
    pub async fn request(&self, request: EngineRequest) -> Result<EngineResponse, EngineError> {
        tracing::debug!(method = %request.method, path = %request.path, "engine request");
        let encoded = request.encode(&self.host());
        let limits = self.config.limits;
        let cycle = async {
            let mut stream = connect(&self.config.addr).await?;
            execute_buffered(&mut stream, &encoded, limits).await
        };
        self.deadline(cycle).await
    }

    /// Runs a request whose body is consumed incrementally: each decoded
    /// body chunk is delivered through the returned stream as it
    /// arrives. The deadline covers the handshake up to the response
    /// head, not the body stream itself.
    pub async fn request_streamed(
        &self,
        request: EngineRequest,
    ) -> Result<(ResponseHead, BodyStream), EngineError> {
        tracing::debug!(method = %request.method, path = %request.path, "engine streamed request");
        let encoded = request.encode(&self.host());
        let limits = self.config.limits;
        let addr = self.config.addr.clone();
        let cycle = async move {
            let stream = connect(&addr).await?;
            start_streamed(stream, &encoded, limits).await
        };
        self.deadline(cycle).await
    }

    /// Runs a request that must upgrade the connection to a raw
    /// bidirectional stream. The deadline covers the upgrade handshake.
    pub async fn hijack(&self, request: EngineRequest) -> Result<HijackedSession, EngineError> {
        tracing::debug!(method = %request.method, path = %request.path, "engine hijack request");
        let encoded = request.encode(&self.host());
        let limits = self.config.limits;
        let addr = self.config.addr.clone();
        let cycle = async move {
            let stream = connect(&addr).await?;
            start_hijack(stream, &encoded, limits).await
        };
        self.deadline(cycle).await
    }

    fn host(&self) -> String {
        match &self.config.addr {
            EngineAddr::Tcp { host, .. } => host.clone(),
            EngineAddr::Unix(_) => "localhost".to_string(),
        }
    }

    // Dropping the future on expiry closes the connection, so bytes
    // arriving after a timeout can never resolve the request.
    async fn deadline<T>(
        &self,
        cycle: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        match tokio::time::timeout(self.config.timeout, cycle).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout),
        }
    }
}

pub(crate) async fn execute_buffered<S: EngineIo>(
    stream: &mut S,
    request: &[u8],
    limits: Limits,
) -> Result<EngineResponse, EngineError> {
    stream.write_all(request).await?;
    let mut reader = ResponseReader::with_limits(limits);
    let (head, pending) = read_head(stream, &mut reader).await?;
    let body = read_body_to_end(stream, &mut reader, pending).await?;
    if head.status >= 400 {
        return Err(status_error(&head, &body));
    }
    Ok(EngineResponse { head, body })
}

pub(crate) async fn start_streamed<S: EngineIo + 'static>(
    mut stream: S,
    request: &[u8],
    limits: Limits,
) -> Result<(ResponseHead, BodyStream), EngineError> {
    stream.write_all(request).await?;
    let mut reader = ResponseReader::with_limits(limits);
    let (head, pending) = read_head(&mut stream, &mut reader).await?;
    if head.status >= 400 {
        let body = read_body_to_end(&mut stream, &mut reader, pending).await?;
        return Err(status_error(&head, &body));
    }

    let (sender, receiver) = mpsc::channel(BODY_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut done = false;
        for event in &pending {
            if !forward_event(event, &sender, &mut done).await {
                return;
            }
        }
        let mut buf = vec![0u8; READ_BUFFER_LEN];
        while !done {
            let result = match stream.read(&mut buf).await {
                Ok(0) => reader.push_eof(),
                Ok(n) => reader.push(&buf[..n]),
                Err(error) => {
                    let _ = sender.send(Err(error.into())).await;
                    return;
                }
            };
            let events = match result {
                Ok(events) => events,
                Err(error) => {
                    let _ = sender.send(Err(error.into())).await;
                    return;
                }
            };
            for event in &events {
                if !forward_event(event, &sender, &mut done).await {
                    return;
                }
            }
        }
    });

    Ok((head, ReceiverStream::new(receiver)))
}

pub(crate) async fn start_hijack<S: EngineIo + 'static>(
    mut stream: S,
    request: &[u8],
    limits: Limits,
) -> Result<HijackedSession, EngineError> {
    stream.write_all(request).await?;
    let mut reader = ResponseReader::with_limits(limits);
    let (head, pending) = read_head(&mut stream, &mut reader).await?;
    if head.status >= 400 {
        let body = read_body_to_end(&mut stream, &mut reader, pending).await?;
        return Err(status_error(&head, &body));
    }
    if reader.state() != ReaderState::Upgraded {
        return Err(EngineError::Upgrade(format!(
            "engine answered {} without a stream content type",
            head.status
        )));
    }

    let mut early = Vec::new();
    for event in pending {
        if let ResponseEvent::Stream(bytes) = event {
            early.extend(bytes);
        }
    }
    Ok(HijackedSession::start(
        Box::new(stream),
        &head,
        early,
        limits,
    ))
}

async fn forward_event(
    event: &ResponseEvent,
    sender: &mpsc::Sender<Result<Vec<u8>, EngineError>>,
    done: &mut bool,
) -> bool {
    match event {
        ResponseEvent::Body(bytes) | ResponseEvent::Stream(bytes) => {
            sender.send(Ok(bytes.clone())).await.is_ok()
        }
        ResponseEvent::End => {
            *done = true;
            true
        }
        ResponseEvent::Head(_) => true,
    }
}

async fn read_head<S: EngineIo>(
    stream: &mut S,
    reader: &mut ResponseReader,
) -> Result<(ResponseHead, Vec<ResponseEvent>), EngineError> {
    let mut buf = vec![0u8; READ_BUFFER_LEN];
    loop {
        let n = stream.read(&mut buf).await?;
        let events = if n == 0 {
            reader.push_eof()?
        } else {
            reader.push(&buf[..n])?
        };
        for (index, event) in events.iter().enumerate() {
            if let ResponseEvent::Head(head) = event {
                return Ok((head.clone(), events[index + 1..].to_vec()));
            }
        }
        if n == 0 {
            return Err(ParseError {
                kind: ParseErrorKind::UnexpectedEof,
                offset: 0,
            }
            .into());
        }
    }
}

async fn read_body_to_end<S: EngineIo>(
    stream: &mut S,
    reader: &mut ResponseReader,
    pending: Vec<ResponseEvent>,
) -> Result<Vec<u8>, EngineError> {
    let mut body = Vec::new();
    if collect_events(&pending, &mut body) {
        return Ok(body);
    }
    let mut buf = vec![0u8; READ_BUFFER_LEN];
    loop {
        let n = stream.read(&mut buf).await?;
        let events = if n == 0 {
            reader.push_eof()?
        } else {
            reader.push(&buf[..n])?
        };
        if collect_events(&events, &mut body) || n == 0 {
            return Ok(body);
        }
    }
}

fn collect_events(events: &[ResponseEvent], body: &mut Vec<u8>) -> bool {
    let mut done = false;
    for event in events {
        match event {
            ResponseEvent::Body(bytes) | ResponseEvent::Stream(bytes) => {
                body.extend_from_slice(bytes);
            }
            ResponseEvent::End => done = true,
            ResponseEvent::Head(_) => {}
        }
    }
    done
}
