mod api;
mod client;
#[cfg(test)]
mod client_test;
mod error;
mod model;
mod request;
mod response;
mod session;

pub use davit_transport::{EngineAddr, TransportError};
pub use davit_wire::{Limits, ParseError, ParseErrorKind, ResponseHead};

pub use client::{BodyStream, Engine, EngineConfig};
pub use error::EngineError;
pub use model::{
    AttachOptions, ContainerConfig, ContainerInspect, ContainerState, ContainerSummary,
    CreatedContainer, ExecConfig, ExecCreated, PullProgress, VersionInfo,
};
pub use request::EngineRequest;
pub use response::EngineResponse;
pub use session::HijackedSession;
