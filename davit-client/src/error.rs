use davit_transport::TransportError;
use davit_wire::{ParseError, ResponseHead};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("engine returned status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("upgrade failed: {0}")]
    Upgrade(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("wire protocol error: {0}")]
    Parse(#[from] ParseError),
    #[error("engine IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON from engine: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Maps an error-status response to the typed surface. The engine
/// reports failures as `{"message": "..."}` JSON bodies; the status
/// reason is the fallback when the body does not parse.
pub(crate) fn status_error(head: &ResponseHead, body: &[u8]) -> EngineError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(|parsed| parsed.message)
        .unwrap_or_else(|_| {
            if head.reason.is_empty() {
                format!("status {}", head.status)
            } else {
                head.reason.clone()
            }
        });
    match head.status {
        404 => EngineError::NotFound(message),
        401 => EngineError::Unauthorized(message),
        409 => EngineError::Conflict(message),
        status => EngineError::Http { status, message },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use davit_wire::ResponseHead;

    use super::{EngineError, status_error};

    fn head(status: u16, reason: &str) -> ResponseHead {
        ResponseHead {
            status,
            reason: reason.to_string(),
            headers: HashMap::new(),
        }
    }

    #[test]
    fn maps_404_with_json_message() {
        let error = status_error(&head(404, "Not Found"), b"{\"message\":\"no such container\"}");
        assert_matches!(error, EngineError::NotFound(message) if message == "no such container");
    }

    #[test]
    fn maps_401_and_409() {
        assert_matches!(status_error(&head(401, "nope"), b""), EngineError::Unauthorized(_));
        assert_matches!(status_error(&head(409, "busy"), b""), EngineError::Conflict(_));
    }

    #[test]
    fn falls_back_to_status_reason() {
        let error = status_error(&head(500, "Internal Server Error"), b"not json");
        assert_matches!(
            error,
            EngineError::Http { status: 500, message } if message == "Internal Server Error"
        );
    }
}
