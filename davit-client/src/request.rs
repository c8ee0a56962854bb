use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use davit_wire::{RequestHead, encode_request};

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub method: String,
    pub path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl EngineRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new("DELETE", path)
    }

    fn new(method: &str, path: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(bytes);
        self
    }

    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, EngineError> {
        self.body = Some(serde_json::to_vec(value)?);
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        Ok(self)
    }

    pub(crate) fn encode(&self, host: &str) -> Vec<u8> {
        let mut head = RequestHead::new(&self.method, self.target()).header("Host", host);
        for (name, value) in &self.headers {
            head = head.header(name, value);
        }
        encode_request(&head, self.body.as_deref())
    }

    fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(name, NON_ALPHANUMERIC),
                    utf8_percent_encode(value, NON_ALPHANUMERIC)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::EngineRequest;

    #[test]
    fn encodes_query_string() {
        let request = EngineRequest::get("/containers/json")
            .query("all", "1")
            .query("filters", "{\"status\":[\"running\"]}");
        let text = String::from_utf8(request.encode("localhost")).unwrap();
        assert!(text.starts_with("GET /containers/json?all=1&filters=%7B%22status%22%3A%5B%22running%22%5D%7D HTTP/1.1\r\n"));
        assert!(text.contains("Host: localhost\r\n"));
    }

    #[test]
    fn json_body_sets_content_type() {
        #[derive(serde::Serialize)]
        struct Body {
            name: String,
        }
        let request = EngineRequest::post("/test")
            .json(&Body {
                name: "abc".to_string(),
            })
            .unwrap();
        let text = String::from_utf8(request.encode("localhost")).unwrap();
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Content-Length: 14\r\n"));
        assert!(text.ends_with("{\"name\":\"abc\"}"));
    }
}
