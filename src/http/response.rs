//! Response model and raw HTTP response parsing.
//!
//! Responses originate either from the library transport (an executed
//! reqwest call) or from the process transport (the bytes an external curl
//! invocation wrote to stdout). In the latter case a followed redirect
//! chain concatenates every hop's raw response; parsing walks the buffer
//! hop by hop and the last response is authoritative.

use std::fmt;

use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::http::{header_value, truncate};
use crate::tx::{TxId, TX_ID_HEADER};

/// Lazily decoded response body.
///
/// The raw bytes are always available; text and JSON interpretations fail
/// only when the accessor is invoked on incompatible content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    data: Vec<u8>,
}

impl ResponseBody {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Raw bytes. Always succeeds.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Decode as UTF-8 text.
    pub fn as_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|e| ClientError::Decoding(format!("body is not valid UTF-8: {e}")))
    }

    /// Parse as JSON.
    pub fn as_json(&self) -> Result<Value> {
        serde_json::from_slice(&self.data)
            .map_err(|e| ClientError::Decoding(format!("body is not valid JSON: {e}")))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Response to a request issued through a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    pub body: ResponseBody,
    /// Transaction identifier assigned to this request, when the node
    /// reported one. Both fields present or neither.
    pub tx_id: Option<TxId>,
    /// Response headers; names stored lowercased.
    pub headers: Vec<(String, String)>,
}

impl Response {
    /// Build from parts, extracting the transaction id from the well-known
    /// response header.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        let headers: Vec<(String, String)> = headers
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        let tx_id = TxId::from_header(header_value(&headers, TX_ID_HEADER));
        Self {
            status,
            body: ResponseBody::new(body),
            tx_id,
            headers,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// Parse one or more concatenated raw HTTP/1.1 responses.
    ///
    /// Each hop is framed by its declared `content-length`; a final hop
    /// without one owns the remainder of the buffer. When a parsed hop does
    /// not account for the whole remaining buffer, another response follows
    /// and the consumed prefix is discarded.
    pub fn from_raw(raw: &[u8]) -> Result<Response> {
        if raw.is_empty() {
            return Err(ClientError::Decoding("empty response buffer".to_string()));
        }
        let mut cursor = raw;
        loop {
            let mut header_buf = [httparse::EMPTY_HEADER; 64];
            let mut parsed = httparse::Response::new(&mut header_buf);
            let header_len = match parsed.parse(cursor) {
                Ok(httparse::Status::Complete(n)) => n,
                Ok(httparse::Status::Partial) => {
                    return Err(ClientError::Decoding("truncated HTTP response".to_string()))
                }
                Err(e) => {
                    return Err(ClientError::Decoding(format!("malformed HTTP response: {e}")))
                }
            };

            let headers: Vec<(String, String)> = parsed
                .headers
                .iter()
                .map(|h| {
                    (
                        h.name.to_lowercase(),
                        String::from_utf8_lossy(h.value).into_owned(),
                    )
                })
                .collect();

            let declared_len = header_value(&headers, "content-length")
                .map(|v| {
                    v.trim().parse::<usize>().map_err(|_| {
                        ClientError::Decoding(format!("invalid content-length '{v}'"))
                    })
                })
                .transpose()?;
            let body_len = declared_len.unwrap_or(cursor.len() - header_len);
            let total_len = header_len + body_len;
            if total_len > cursor.len() {
                return Err(ClientError::Decoding(
                    "response body shorter than declared length".to_string(),
                ));
            }
            if total_len < cursor.len() {
                // Another concatenated response follows (redirect hop).
                cursor = &cursor[total_len..];
                continue;
            }

            let status = parsed
                .code
                .ok_or_else(|| ClientError::Decoding("missing status code".to_string()))?;
            return Ok(Response::new(
                status,
                headers,
                cursor[header_len..total_len].to_vec(),
            ));
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(tx_id) = self.tx_id {
            write!(f, " @{tx_id}")?;
        }
        match self.body.as_text() {
            Ok(text) => write!(f, " {}", truncate(text, 256)),
            Err(_) => write!(f, " <{} binary bytes>", self.body.len()),
        }
    }
}
