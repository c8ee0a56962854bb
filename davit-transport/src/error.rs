use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport configuration error: {0}")]
    Config(String),
    #[error("transport IO error: {0}")]
    Io(#[from] std::io::Error),
}
