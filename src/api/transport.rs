//! HTTP transport for the inventory backend.
//!
//! The client talks to a [`Transport`] so tests can script responses without
//! a server. [`HttpTransport`] is the real implementation over a blocking
//! `ureq` agent. No timeout and no retry are applied.

use crate::error::ApiError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

/// One request, with the path relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// Any HTTP answer, 2xx or not. Only failures to get an answer at all are
/// errors at this layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport {
    fn send(&self, request: &Request) -> Result<Response, ApiError>;
}

pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut req = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Content-Type", "application/json");
        if let Some(auth) = &request.authorization {
            req = req.set("Authorization", auth);
        }

        let resp = match &request.body {
            Some(body) => req.send_json(body.clone()),
            None => req.call(),
        };

        match resp {
            Ok(r) => {
                let status = r.status();
                let body = r
                    .into_string()
                    .map_err(|e| ApiError::Transport(e.to_string()))?;
                Ok(Response { status, body })
            }
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                Ok(Response { status, body })
            }
            Err(e) => Err(ApiError::Transport(e.to_string())),
        }
    }
}
