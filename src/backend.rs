//! HTTP access to the blood-donation backend.
//!
//! Every service goes through [`ApiTransport`]. The production transport is
//! [`ReqwestTransport`]; tests swap in the recording fake from `fake`.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// 400/422: the backend refused the input. User-correctable.
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("backend refused the credential: {message}")]
    Unauthorized { message: String },

    #[error("backend denied access: {message}")]
    Forbidden { message: String },

    #[error("{path} not found")]
    NotFound { path: String },

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected backend payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: vec![],
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn with_bearer(mut self, bearer: Option<&str>) -> Self {
        self.bearer = bearer.map(str::to_string);
        self
    }
}

#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Perform the call and return the JSON body (`Null` for empty bodies).
    async fn send(&self, req: ApiRequest) -> Result<Value, ClientError>;
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(value)?)
}

/// Map a non-success status onto the portal's error categories.
pub fn classify(status: u16, path: &str, message: String) -> ClientError {
    match status {
        400 | 422 => ClientError::Rejected { status, message },
        401 => ClientError::Unauthorized { message },
        403 => ClientError::Forbidden { message },
        404 => ClientError::NotFound {
            path: path.to_string(),
        },
        _ => ClientError::Status { status, message },
    }
}

/// Pull a human-readable message out of an error body. Accepts
/// `{"message": "..."}`, `{"message": ["...", "..."]}` and
/// `{"error": {"message": "..."}}`.
pub fn backend_message(body: &[u8]) -> Option<String> {
    let json: Value = serde_json::from_slice(body).ok()?;
    let message = json
        .get("message")
        .or_else(|| json.get("error").and_then(|e| e.get("message")))?;

    match message {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn send(&self, req: ApiRequest) -> Result<Value, ClientError> {
        let mut builder = self.client.request(req.method.clone(), self.url(&req.path));
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        tracing::debug!(method = %req.method, path = %req.path, status = status.as_u16(), "backend call");

        if status.is_success() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let message = backend_message(&bytes).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        Err(classify(status.as_u16(), &req.path, message))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    pub enum FakeReply {
        Json(Value),
        Fail(u16, &'static str),
    }

    /// Scripted transport. Replies queue per `METHOD path`; the last one
    /// queued keeps answering once the others are used up.
    #[derive(Default)]
    pub struct FakeTransport {
        replies: Mutex<HashMap<String, VecDeque<FakeReply>>>,
        calls: Mutex<Vec<ApiRequest>>,
    }

    fn key(method: &Method, path: &str) -> String {
        format!("{method} {path}")
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(&self, method: Method, path: &str, reply: FakeReply) -> &Self {
            self.replies
                .lock()
                .unwrap()
                .entry(key(&method, path))
                .or_default()
                .push_back(reply);
            self
        }

        pub fn json(&self, method: Method, path: &str, body: Value) -> &Self {
            self.on(method, path, FakeReply::Json(body))
        }

        pub fn fail(&self, method: Method, path: &str, status: u16, message: &'static str) -> &Self {
            self.on(method, path, FakeReply::Fail(status, message))
        }

        pub fn calls(&self) -> Vec<ApiRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
            self.calls()
                .into_iter()
                .filter(|c| c.method == method && c.path == path)
                .collect()
        }
    }

    #[async_trait]
    impl ApiTransport for FakeTransport {
        async fn send(&self, req: ApiRequest) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push(req.clone());

            let reply = {
                let mut replies = self.replies.lock().unwrap();
                let queue = replies.get_mut(&key(&req.method, &req.path));
                match queue {
                    Some(q) if q.len() > 1 => q.pop_front(),
                    Some(q) => q.front().cloned(),
                    None => None,
                }
            };

            match reply {
                Some(FakeReply::Json(v)) => Ok(v),
                Some(FakeReply::Fail(status, message)) => {
                    Err(classify(status, &req.path, message.to_string()))
                }
                None => Err(classify(404, &req.path, "no fake reply".into())),
            }
        }
    }
}
