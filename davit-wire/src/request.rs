pub const FINAL_CHUNK: &[u8] = b"0\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Serializes a request with a buffered body in one write sequence. A
/// body, even an empty one, gets a `Content-Length` header.
pub fn encode_request(head: &RequestHead, body: Option<&[u8]>) -> Vec<u8> {
    let mut bytes = encode_head(head);
    if let Some(body) = body {
        append_header(&mut bytes, "Content-Length", &body.len().to_string());
        bytes.extend_from_slice(b"\r\n");
        bytes.extend_from_slice(body);
    } else {
        bytes.extend_from_slice(b"\r\n");
    }
    bytes
}

/// Serializes the head of a streaming-upload request. The body follows as
/// a sequence of `encode_chunk` writes closed by `FINAL_CHUNK`.
pub fn encode_streaming_request(head: &RequestHead) -> Vec<u8> {
    let mut bytes = encode_head(head);
    append_header(&mut bytes, "Transfer-Encoding", "chunked");
    bytes.extend_from_slice(b"\r\n");
    bytes
}

pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    let mut bytes = format!("{:x}\r\n", data.len()).into_bytes();
    bytes.extend_from_slice(data);
    bytes.extend_from_slice(b"\r\n");
    bytes
}

fn encode_head(head: &RequestHead) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(head.method.as_bytes());
    bytes.push(b' ');
    bytes.extend_from_slice(head.target.as_bytes());
    bytes.extend_from_slice(b" HTTP/1.1\r\n");
    for (name, value) in &head.headers {
        append_header(&mut bytes, name, value);
    }
    bytes
}

fn append_header(bytes: &mut Vec<u8>, name: &str, value: &str) {
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(b": ");
    bytes.extend_from_slice(value.as_bytes());
    bytes.extend_from_slice(b"\r\n");
}
