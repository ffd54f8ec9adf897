//! Outgoing request model.
//!
//! A request is immutable once handed to a transport. The body carries its
//! own interpretation so each transport can resolve bytes and content type
//! the same way.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::http::truncate;

pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Request body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    None,
    /// UTF-8 text, sent as `text/plain`.
    Text(String),
    /// Raw bytes, sent as `application/octet-stream`.
    Bytes(Vec<u8>),
    /// Structured data, serialized and sent as `application/json`.
    Json(Value),
    /// Read this file's contents as the body; content type inferred from
    /// the extension.
    File(PathBuf),
}

impl Body {
    /// Build a JSON body from any serializable value.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Body> {
        Ok(Body::Json(serde_json::to_value(value).map_err(|e| {
            ClientError::Precondition(format!("body is not serializable: {e}"))
        })?))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }

    /// Resolve to raw bytes plus the inferred content type.
    pub fn resolve(&self) -> Result<Option<(Vec<u8>, &'static str)>> {
        match self {
            Body::None => Ok(None),
            Body::Text(text) => Ok(Some((text.as_bytes().to_vec(), CONTENT_TYPE_TEXT))),
            Body::Bytes(bytes) => Ok(Some((bytes.clone(), CONTENT_TYPE_BINARY))),
            Body::Json(value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| {
                    ClientError::Precondition(format!("body is not serializable: {e}"))
                })?;
                Ok(Some((bytes, CONTENT_TYPE_JSON)))
            }
            Body::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    ClientError::Precondition(format!(
                        "cannot read body file {}: {e}",
                        path.display()
                    ))
                })?;
                Ok(Some((bytes, content_type_for_path(path))))
            }
        }
    }
}

/// Content type inferred from a body file's extension.
pub(crate) fn content_type_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => CONTENT_TYPE_JSON,
        _ => CONTENT_TYPE_BINARY,
    }
}

/// A single RPC request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Resource path with optional query string. Must begin with `/`.
    pub path: String,
    pub body: Body,
    pub verb: Method,
    /// Header names are matched case-insensitively; insertion order is
    /// irrelevant on the wire.
    pub headers: Vec<(String, String)>,
    /// Whether redirects are transparently followed.
    pub allow_redirects: bool,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(verb: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: Body::None,
            verb,
            headers: Vec::new(),
            allow_redirects: true,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.allow_redirects = false;
        self
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path)?;
        if !self.headers.is_empty() {
            write!(f, " {}", truncate(&format!("{:?}", self.headers), 25))?;
        }
        if !self.body.is_none() {
            write!(f, " {}", truncate(&format!("{:?}", self.body), 256))?;
        }
        Ok(())
    }
}
