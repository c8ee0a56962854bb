use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use davit_wire::{FrameDemuxer, Limits, MULTIPLEXED_STREAM, ResponseHead, StreamKind};

const CHANNEL_CAPACITY: usize = 64;

pub(crate) trait EngineIo: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> EngineIo for T {}

/// A hijacked connection after a successful attach/exec upgrade. The
/// read half is pumped into per-stream channels in a background task;
/// the write half stays available for stdin.
pub struct HijackedSession {
    pub stdout: ReceiverStream<Vec<u8>>,
    pub stderr: ReceiverStream<Vec<u8>>,
    input: WriteHalf<Box<dyn EngineIo>>,
}

impl std::fmt::Debug for HijackedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HijackedSession").finish_non_exhaustive()
    }
}

impl HijackedSession {
    pub(crate) fn start(
        stream: Box<dyn EngineIo>,
        head: &ResponseHead,
        early: Vec<u8>,
        limits: Limits,
    ) -> Self {
        let multiplexed = head.header("content-type") == Some(MULTIPLEXED_STREAM);
        let (read_half, write_half) = tokio::io::split(stream);
        let (stdout_tx, stdout_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (stderr_tx, stderr_rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(pump(
            read_half, multiplexed, early, limits, stdout_tx, stderr_tx,
        ));

        Self {
            stdout: ReceiverStream::new(stdout_rx),
            stderr: ReceiverStream::new(stderr_rx),
            input: write_half,
        }
    }

    pub async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.input.write_all(bytes).await
    }

    pub async fn close_input(&mut self) -> std::io::Result<()> {
        self.input.shutdown().await
    }
}

async fn pump(
    mut read_half: ReadHalf<Box<dyn EngineIo>>,
    multiplexed: bool,
    early: Vec<u8>,
    limits: Limits,
    stdout: mpsc::Sender<Vec<u8>>,
    stderr: mpsc::Sender<Vec<u8>>,
) {
    let mut demuxer = FrameDemuxer::with_limits(limits);
    let mut buf = vec![0u8; 8192];
    let mut pending = Some(early);

    loop {
        let bytes = match pending.take() {
            Some(bytes) => bytes,
            None => {
                let n = match read_half.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                buf[..n].to_vec()
            }
        };
        if bytes.is_empty() {
            continue;
        }

        if multiplexed {
            let frames = match demuxer.push(&bytes) {
                Ok(frames) => frames,
                Err(error) => {
                    tracing::debug!(%error, "stopping demux pump");
                    break;
                }
            };
            for frame in frames {
                let sink = match frame.stream {
                    StreamKind::Stdout => &stdout,
                    StreamKind::Stderr => &stderr,
                };
                if sink.send(frame.payload).await.is_err() {
                    return;
                }
            }
        } else if stdout.send(bytes).await.is_err() {
            return;
        }
    }
}
