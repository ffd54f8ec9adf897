//! Library transport: requests over a reusable authenticated connection.
//!
//! # Responsibilities
//! - Hold a connection context trusting the service root certificate, with
//!   an optional client certificate for mutual authentication
//! - Resolve the request body and infer its content type
//! - Attach an HTTP signature when a signing identity is configured
//! - Map network failures onto the client error taxonomy

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Method;

use crate::client::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http::{header_value, set_header, Request, Response};
use crate::signing::{body_digest, RequestSigner};
use crate::transport::NodeTransport;

pub struct LibraryTransport {
    base_url: String,
    /// Client following redirects; selected when the request allows them.
    redirecting: reqwest::Client,
    /// Client with redirects disabled.
    direct: reqwest::Client,
    signer: Option<RequestSigner>,
}

impl LibraryTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let ca_pem = std::fs::read(&config.ca).map_err(|e| {
            ClientError::transport_msg(format!(
                "cannot read CA certificate {}: {e}",
                config.ca.display()
            ))
        })?;
        let ca = reqwest::Certificate::from_pem(&ca_pem)
            .map_err(|e| ClientError::transport("invalid CA certificate", e))?;

        let identity = match &config.session_auth {
            Some(session) => {
                let mut pem = std::fs::read(&session.cert).map_err(|e| {
                    ClientError::transport_msg(format!(
                        "cannot read session certificate {}: {e}",
                        session.cert.display()
                    ))
                })?;
                pem.extend(std::fs::read(&session.key).map_err(|e| {
                    ClientError::transport_msg(format!(
                        "cannot read session key {}: {e}",
                        session.key.display()
                    ))
                })?);
                Some(
                    reqwest::Identity::from_pem(&pem)
                        .map_err(|e| ClientError::transport("invalid session identity", e))?,
                )
            }
            None => None,
        };

        let build = |policy: Policy| -> Result<reqwest::Client> {
            let mut builder = reqwest::Client::builder()
                .use_rustls_tls()
                .add_root_certificate(ca.clone())
                .redirect(policy);
            if let Some(identity) = identity.clone() {
                builder = builder.identity(identity);
            }
            builder
                .build()
                .map_err(|e| ClientError::transport("failed to build HTTP client", e))
        };

        let signer = config
            .signing_auth
            .as_ref()
            .map(RequestSigner::from_identity)
            .transpose()?;

        Ok(Self {
            base_url: format!("https://{}:{}", config.host, config.port),
            redirecting: build(Policy::default())?,
            direct: build(Policy::none())?,
            signer,
        })
    }
}

/// Merge per-request headers with the computed content type and, when a
/// signer is configured, the digest/content-length/authorization headers.
///
/// A signed GET forces `content-length: 0`; a caller-supplied non-zero
/// value is a precondition violation.
fn prepare_headers(
    request: &Request,
    body: Option<&[u8]>,
    content_type: Option<&'static str>,
    signer: Option<&RequestSigner>,
) -> Result<Vec<(String, String)>> {
    let mut headers = request.headers.clone();

    if let (Some(body), Some(content_type)) = (body, content_type) {
        if !body.is_empty() && header_value(&headers, "content-type").is_none() {
            headers.push(("content-type".to_string(), content_type.to_string()));
        }
    }

    if let Some(signer) = signer {
        let body = body.unwrap_or(&[]);
        if request.verb == Method::GET {
            match header_value(&headers, "content-length") {
                Some(value) if value != "0" => {
                    return Err(ClientError::Precondition(
                        "content-length must be 0 for signed GET requests".to_string(),
                    ));
                }
                Some(_) => {}
                None => headers.push(("content-length".to_string(), "0".to_string())),
            }
        } else if header_value(&headers, "content-length").is_none() {
            headers.push(("content-length".to_string(), body.len().to_string()));
        }

        // The digest of an empty body is still computed and signed.
        set_header(&mut headers, "digest", body_digest(body));
        let authorization =
            signer.authorization_header(&request.verb, &request.path, &headers, None)?;
        set_header(&mut headers, "authorization", authorization);
    }

    Ok(headers)
}

/// Map reqwest failures onto the client error taxonomy.
fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::TimedOut
    } else if err.is_connect() {
        ClientError::ConnectionFailed {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    } else {
        ClientError::transport("request failed", err)
    }
}

#[async_trait]
impl NodeTransport for LibraryTransport {
    async fn request(&self, request: &Request, timeout: Duration) -> Result<Response> {
        let resolved = request.body.resolve()?;
        let (body, content_type) = match &resolved {
            Some((bytes, content_type)) => (Some(bytes.as_slice()), Some(*content_type)),
            None => (None, None),
        };
        let headers = prepare_headers(request, body, content_type, self.signer.as_ref())?;

        let client = if request.allow_redirects {
            &self.redirecting
        } else {
            &self.direct
        };
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = client
            .request(request.verb.clone(), url)
            .timeout(timeout);
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(Response::new(status, response_headers, bytes.to_vec()))
    }
}
