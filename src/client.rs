//! Client facade and connection-establishment state machine.
//!
//! # Responsibilities
//! - Hold the node coordinates, identities and timeout budgets for a client
//! - Retry the first request while the node may still be coming up
//! - Log every request and response at a consistent level
//! - Expose verb shorthands over the underlying transport
//!
//! A client starts in a not-yet-connected state. Until its first successful
//! response, connection-level failures are retried against a connection
//! budget; once any response has arrived, every later failure is surfaced
//! immediately. Consensus-level acceptance is a separate concern handled by
//! [`crate::commit::wait_for_commit`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::commit;
use crate::error::{ClientError, Result};
use crate::http::{Body, Request, Response};
use crate::transport::{select_transport, Identity, NodeTransport};

/// Budget for establishing the first connection to a node.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(3);
/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default budget for commit confirmation.
pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(3);
/// Pause between connection attempts during bring-up.
const CONNECTION_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Everything needed to construct a client for one node.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Node hostname or address.
    pub host: String,
    /// Node RPC port.
    pub port: u16,
    /// Path to the PEM service certificate used as the trust root.
    pub ca: PathBuf,
    /// Identity presented during the TLS handshake, if any.
    pub session_auth: Option<Identity>,
    /// Identity used to sign requests, if any.
    pub signing_auth: Option<Identity>,
    /// Budget for establishing the first connection.
    pub connection_timeout: Duration,
    /// Name used in log lines to tell clients apart.
    pub description: String,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, ca: impl Into<PathBuf>) -> Self {
        let host = host.into();
        let description = format!("[{host}:{port}]");
        Self {
            host,
            port,
            ca: ca.into(),
            session_auth: None,
            signing_auth: None,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            description,
        }
    }

    pub fn with_session_auth(mut self, identity: Identity) -> Self {
        self.session_auth = Some(identity);
        self
    }

    pub fn with_signing_auth(mut self, identity: Identity) -> Self {
        self.signing_auth = Some(identity);
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// RPC client for a single node.
pub struct Client {
    transport: Box<dyn NodeTransport>,
    connection_timeout: Duration,
    description: String,
    is_connected: bool,
}

impl Client {
    /// Construct a client, selecting the transport strategy from the
    /// environment.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(config, select_transport(config)?))
    }

    /// Construct a client over an explicit transport.
    pub fn with_transport(config: &ClientConfig, transport: Box<dyn NodeTransport>) -> Self {
        Self {
            transport,
            connection_timeout: config.connection_timeout,
            description: config.description.clone(),
            is_connected: false,
        }
    }

    async fn dispatch(&self, request: &Request) -> Result<Response> {
        debug!(client = %self.description, request = %request, "Sending request");
        let timeout = request.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let response = self.transport.request(request, timeout).await?;
        info!(client = %self.description, response = %response, "Received response");
        Ok(response)
    }

    /// Issue one request, retrying connection-level failures while the
    /// first connection is still being established.
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        if !request.path.starts_with('/') {
            return Err(ClientError::Precondition(format!(
                "request path '{}' must start with '/'",
                request.path
            )));
        }

        if self.is_connected {
            return self.dispatch(request).await;
        }

        let deadline = Instant::now() + self.connection_timeout;
        loop {
            match self.dispatch(request).await {
                Ok(response) => {
                    self.is_connected = true;
                    return Ok(response);
                }
                Err(err) if err.is_connection_retryable() && Instant::now() < deadline => {
                    debug!(
                        client = %self.description,
                        error = %err,
                        "Node not yet reachable, retrying"
                    );
                    tokio::time::sleep(CONNECTION_RETRY_INTERVAL).await;
                }
                Err(err) if err.is_connection_retryable() => {
                    return Err(ClientError::ConnectionFailed {
                        message: format!(
                            "connection still failing after {:?}",
                            self.connection_timeout
                        ),
                        source: Some(Box::new(err)),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn get(&mut self, path: impl Into<String>) -> Result<Response> {
        self.call(&Request::get(path)).await
    }

    pub async fn post(&mut self, path: impl Into<String>, body: Body) -> Result<Response> {
        self.call(&Request::post(path).with_body(body)).await
    }

    pub async fn put(&mut self, path: impl Into<String>, body: Body) -> Result<Response> {
        self.call(&Request::put(path).with_body(body)).await
    }

    pub async fn delete(&mut self, path: impl Into<String>) -> Result<Response> {
        self.call(&Request::delete(path)).await
    }

    pub async fn head(&mut self, path: impl Into<String>) -> Result<Response> {
        self.call(&Request::head(path)).await
    }

    /// Wait until the transaction named by `response` is durably committed.
    ///
    /// The response must carry a transaction id; responses to unreplicated
    /// requests do not.
    pub async fn wait_for_commit(
        &mut self,
        response: &Response,
        timeout: Duration,
    ) -> Result<()> {
        let tx_id = response.tx_id.ok_or_else(|| {
            ClientError::Precondition(
                "response carries no transaction id to wait for".to_string(),
            )
        })?;
        commit::wait_for_commit(self, tx_id, timeout).await
    }
}
