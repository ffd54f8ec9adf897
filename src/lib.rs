//! Signed-RPC client for a consensus-replicated service.
//!
//! Talks HTTPS to a single node of a permissioned, consensus-replicated
//! service and confirms that accepted writes actually became durable.
//!
//! # Architecture
//!
//! - [`client`]: the [`Client`] facade, its configuration, and the
//!   connection-establishment retry loop
//! - [`transport`]: the [`NodeTransport`] seam with two strategies, an
//!   in-process HTTP client and an external curl invocation
//! - [`signing`]: draft-cavage HTTP signatures over a canonical string of
//!   the request target, timestamp and a fixed header set
//! - [`http`]: request and response models shared by both transports
//! - [`commit`]: polling loop confirming a transaction reached durable
//!   commit at its assigned (view, seqno)
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use quorum_client::{Body, Client, ClientConfig, Identity};
//!
//! # async fn run() -> quorum_client::Result<()> {
//! let config = ClientConfig::new("node0.example", 8443, "service_cert.pem")
//!     .with_session_auth(Identity::new("user_privk.pem", "user_cert.pem", "user0"));
//! let mut client = Client::new(&config)?;
//!
//! let response = client
//!     .post("/app/log", Body::json(&serde_json::json!({"id": 42, "msg": "hello"}))?)
//!     .await?;
//! client.wait_for_commit(&response, Duration::from_secs(3)).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod commit;
pub mod error;
pub mod http;
pub mod signing;
pub mod transport;
pub mod tx;

pub use client::{
    Client, ClientConfig, DEFAULT_COMMIT_TIMEOUT, DEFAULT_CONNECTION_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{ClientError, Result};
pub use http::{Body, Request, Response, ResponseBody};
pub use transport::{
    Identity, LibraryTransport, NodeTransport, ProcessTransport, PROCESS_TRANSPORT_ENV,
};
pub use tx::{TxId, TxStatus, TX_ID_HEADER};
