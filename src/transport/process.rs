//! Process transport: shells out to curl for every request.
//!
//! # Responsibilities
//! - Translate a request into a curl invocation against the target node
//! - Spill in-memory bodies to a temporary file for `--data-binary`
//! - Map well-known curl exit codes onto the client error taxonomy
//! - Re-parse curl's raw `-i` output into the shared response model
//!
//! Signed requests are delegated to a signing wrapper script expected on
//! `PATH`, which computes the digest and authorization headers before
//! invoking curl itself.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::client::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http::{header_value, Body, Request, Response};
use crate::transport::{Identity, NodeTransport};

/// curl exit code for a failed TLS handshake or refused connection.
const EXIT_PEER_FAILED_VERIFICATION: i32 = 60;
/// curl exit code for an elapsed `-m` deadline.
const EXIT_OPERATION_TIMEDOUT: i32 = 28;

pub struct ProcessTransport {
    host: String,
    port: u16,
    ca: PathBuf,
    session_auth: Option<Identity>,
    signing_auth: Option<Identity>,
}

impl ProcessTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            ca: config.ca.clone(),
            session_auth: config.session_auth.clone(),
            signing_auth: config.signing_auth.clone(),
        }
    }

    /// The executable to invoke: plain curl, or the signing wrapper when a
    /// signing identity is configured.
    fn program(&self) -> &'static str {
        if self.signing_auth.is_some() {
            "scurl.sh"
        } else {
            "curl"
        }
    }

    fn build_args(
        &self,
        request: &Request,
        timeout: Duration,
        body_file: Option<&std::path::Path>,
        content_type: Option<&str>,
    ) -> Vec<String> {
        let mut args = vec![
            format!("https://{}:{}{}", self.host, self.port, request.path),
            "-X".to_string(),
            request.verb.to_string(),
            "-i".to_string(),
            "-m".to_string(),
            timeout.as_secs_f64().to_string(),
        ];
        if request.allow_redirects {
            args.push("-L".to_string());
        }
        if let Some(body_file) = body_file {
            args.push("--data-binary".to_string());
            args.push(format!("@{}", body_file.display()));
            if let Some(content_type) = content_type {
                if header_value(&request.headers, "content-type").is_none() {
                    args.push("-H".to_string());
                    args.push(format!("content-type: {content_type}"));
                }
            }
        }
        for (name, value) in &request.headers {
            args.push("-H".to_string());
            args.push(format!("{name}: {value}"));
        }
        args.push("--cacert".to_string());
        args.push(self.ca.display().to_string());
        if let Some(session) = &self.session_auth {
            args.push("--key".to_string());
            args.push(session.key.display().to_string());
            args.push("--cert".to_string());
            args.push(session.cert.display().to_string());
        }
        if let Some(signing) = &self.signing_auth {
            args.push("--signing-key".to_string());
            args.push(signing.key.display().to_string());
            args.push("--signing-cert".to_string());
            args.push(signing.cert.display().to_string());
        }
        args
    }
}

/// Map a finished curl invocation onto the error taxonomy, or hand back its
/// stdout for parsing.
fn map_output(output: Output) -> Result<Vec<u8>> {
    match output.status.code() {
        Some(0) => Ok(output.stdout),
        Some(EXIT_PEER_FAILED_VERIFICATION) => Err(ClientError::ConnectionFailed {
            message: "peer failed verification".to_string(),
            source: None,
        }),
        Some(EXIT_OPERATION_TIMEDOUT) => Err(ClientError::TimedOut),
        Some(code) => Err(ClientError::transport_msg(format!(
            "curl exited with code {code}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
        None => Err(ClientError::transport_msg(
            "curl terminated by signal".to_string(),
        )),
    }
}

#[async_trait]
impl NodeTransport for ProcessTransport {
    async fn request(&self, request: &Request, timeout: Duration) -> Result<Response> {
        // Dropped only after the invocation completes.
        let mut spilled: Option<NamedTempFile> = None;
        let (body_file, content_type) = match &request.body {
            Body::None => (None, None),
            Body::File(path) => (
                Some(path.clone()),
                Some(crate::http::request::content_type_for_path(path)),
            ),
            body => {
                let (bytes, content_type) = body.resolve()?.ok_or_else(|| {
                    ClientError::Precondition("body resolved to nothing".to_string())
                })?;
                let file = NamedTempFile::new().map_err(|e| {
                    ClientError::transport("cannot create temporary body file", e)
                })?;
                std::fs::write(file.path(), &bytes).map_err(|e| {
                    ClientError::transport("cannot write temporary body file", e)
                })?;
                let path = file.path().to_path_buf();
                spilled = Some(file);
                (Some(path), Some(content_type))
            }
        };

        let args = self.build_args(request, timeout, body_file.as_deref(), content_type);
        debug!(command = %format!("{} {}", self.program(), args.join(" ")), "Invoking curl");

        let output = Command::new(self.program())
            .args(&args)
            .output()
            .await
            .map_err(|e| ClientError::transport("failed to spawn curl", e))?;
        drop(spilled);

        let stdout = map_output(output)?;
        Response::from_raw(&stdout)
    }
}
