mod addr;
mod error;
mod stream;

pub use addr::EngineAddr;
pub use error::TransportError;
pub use stream::{EngineStream, connect};
