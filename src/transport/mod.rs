//! Pluggable request transports.
//!
//! # Responsibilities
//! - Define the one capability interface every transport implements
//! - Carry identity material (key/certificate paths) for both transports
//! - Select the transport strategy for a whole client population
//!
//! Two interchangeable strategies talk to a node: [`LibraryTransport`]
//! drives a reusable authenticated connection, [`ProcessTransport`] shells
//! out to curl and re-parses its raw output. Both produce the same
//! canonicalized [`Response`] model.

pub mod library;
pub mod process;

pub use library::LibraryTransport;
pub use process::ProcessTransport;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::ClientConfig;
use crate::error::Result;
use crate::http::{Request, Response};

/// Environment variable selecting the process transport when set non-empty.
pub const PROCESS_TRANSPORT_ENV: &str = "QUORUM_CURL_CLIENT";

/// Private key and certificate paths naming one identity.
///
/// A client may carry two independent identities: a session identity for
/// transport-level mutual authentication and a signing identity for request
/// signatures. Loaded from disk once at client construction; no rotation
/// within a client's lifetime.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Path to the PEM private key.
    pub key: PathBuf,
    /// Path to the matching PEM certificate.
    pub cert: PathBuf,
    /// Human-readable description.
    pub description: String,
}

impl Identity {
    pub fn new(
        key: impl Into<PathBuf>,
        cert: impl Into<PathBuf>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            cert: cert.into(),
            description: description.into(),
        }
    }
}

/// Capability interface implemented by every transport strategy.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    /// Issue one request and return the canonicalized response.
    async fn request(&self, request: &Request, timeout: Duration) -> Result<Response>;
}

/// Choose the transport for a client.
///
/// The library transport is the default; setting
/// [`PROCESS_TRANSPORT_ENV`] non-empty switches every new client to the
/// process transport.
pub fn select_transport(config: &ClientConfig) -> Result<Box<dyn NodeTransport>> {
    let use_process = std::env::var(PROCESS_TRANSPORT_ENV)
        .map(|v| !v.is_empty())
        .unwrap_or(false);
    if use_process {
        Ok(Box::new(ProcessTransport::new(config)))
    } else {
        Ok(Box::new(LibraryTransport::new(config)?))
    }
}
