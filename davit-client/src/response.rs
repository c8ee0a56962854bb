use davit_wire::ResponseHead;
use serde::de::DeserializeOwned;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub head: ResponseHead,
    pub body: Vec<u8>,
}

impl EngineResponse {
    pub fn status(&self) -> u16 {
        self.head.status
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, EngineError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
