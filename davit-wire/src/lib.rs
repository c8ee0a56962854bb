mod chunk;
mod frame;
mod reader;
mod request;
mod types;

pub use chunk::{ChunkScan, extract_chunks};
pub use frame::{FRAME_HEADER_LEN, FrameDemuxer, StreamFrame, StreamKind, encode_frame};
pub use reader::{ReaderState, ResponseEvent, ResponseReader};
pub use request::{
    FINAL_CHUNK, RequestHead, encode_chunk, encode_request, encode_streaming_request,
};
pub use types::{
    Limits, MULTIPLEXED_STREAM, ParseError, ParseErrorKind, RAW_STREAM, ResponseHead,
};
