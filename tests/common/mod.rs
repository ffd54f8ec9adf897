//! Scripted transports for exercising the client without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quorum_client::{ClientError, NodeTransport, Request, Response, Result, TX_ID_HEADER};

/// Transport replaying a fixed sequence of outcomes, one per request.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Response>>>,
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(script: Vec<Result<Response>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of requests seen so far.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl NodeTransport for ScriptedTransport {
    async fn request(&self, _request: &Request, _timeout: Duration) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        script.pop_front().unwrap_or_else(|| {
            Err(ClientError::Precondition(
                "scripted transport exhausted".to_string(),
            ))
        })
    }
}

/// Transport answering each request through a closure.
pub struct FnTransport<F> {
    handler: F,
}

#[allow(dead_code)]
impl<F> FnTransport<F>
where
    F: Fn(&Request) -> Result<Response> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> NodeTransport for FnTransport<F>
where
    F: Fn(&Request) -> Result<Response> + Send + Sync,
{
    async fn request(&self, request: &Request, _timeout: Duration) -> Result<Response> {
        (self.handler)(request)
    }
}

#[allow(dead_code)]
pub fn ok_response(body: &str) -> Response {
    Response::new(200, Vec::new(), body.as_bytes().to_vec())
}

#[allow(dead_code)]
pub fn committed_response(tx_id: &str, body: &str) -> Response {
    Response::new(
        200,
        vec![(TX_ID_HEADER.to_string(), tx_id.to_string())],
        body.as_bytes().to_vec(),
    )
}

#[allow(dead_code)]
pub fn status_response(status: &str) -> Response {
    ok_response(&format!("{{\"status\": \"{status}\"}}"))
}

/// Route test logs through `RUST_LOG`; safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[allow(dead_code)]
pub fn connection_refused() -> ClientError {
    ClientError::ConnectionFailed {
        message: "connection refused".to_string(),
        source: None,
    }
}
