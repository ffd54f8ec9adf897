//! Commit confirmation over the node's transaction-status endpoint.
//!
//! A successful response only means a node accepted the request; the write
//! is durable only once consensus reports the transaction committed at the
//! exact (view, seqno) it was assigned. This module polls the status
//! endpoint until the verdict is final or the wait budget elapses.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::tx::{TxId, TxStatus};

/// Pause between status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Error code a node returns when it cannot answer for this session's view
/// of the log. Transient during leader changes; polling continues.
const SESSION_CONSISTENCY_LOST: &str = "SessionConsistencyLost";

/// Poll until `tx_id` is committed, invalid, or the budget elapses.
///
/// Pending and unknown statuses keep polling. A timeout error carries the
/// node's current commit point and consensus details for diagnostics.
pub async fn wait_for_commit(client: &mut Client, tx_id: TxId, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    let deadline = start + timeout;
    let path = format!("/node/tx?transaction_id={tx_id}");

    while Instant::now() < deadline {
        let response = client.get(path.clone()).await?;

        if response.status != 200 {
            if response.status == 500 && is_session_consistency_lost(&response) {
                debug!(tx = %tx_id, "Session consistency lost, retrying status poll");
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
            return Err(ClientError::transport_msg(format!(
                "transaction status query returned {}",
                response.status
            )));
        }

        let body = response.body.as_json()?;
        let status: TxStatus = serde_json::from_value(body["status"].clone())
            .map_err(|e| ClientError::Decoding(format!("invalid transaction status: {e}")))?;
        match status {
            TxStatus::Committed => {
                debug!(tx = %tx_id, elapsed = ?start.elapsed(), "Transaction committed");
                return Ok(());
            }
            TxStatus::Invalid => return Err(ClientError::TransactionInvalid { tx_id }),
            TxStatus::Pending | TxStatus::Unknown => {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }

    Err(ClientError::CommitTimeout {
        tx_id,
        waited: start.elapsed(),
        last_commit: snapshot(client, "/node/commit").await,
        last_consensus: snapshot(client, "/node/consensus").await,
    })
}

fn is_session_consistency_lost(response: &crate::http::Response) -> bool {
    response
        .body
        .as_json()
        .ok()
        .and_then(|body| {
            body.get("error")
                .and_then(|e| e.get("code"))
                .and_then(|c| c.as_str())
                .map(|c| c == SESSION_CONSISTENCY_LOST)
        })
        .unwrap_or(false)
}

/// Best-effort snapshot of a diagnostic endpoint for the timeout message.
async fn snapshot(client: &mut Client, path: &str) -> String {
    match client.get(path).await {
        Ok(response) => match response.body.as_text() {
            Ok(text) => text.to_string(),
            Err(_) => format!("<{} binary bytes>", response.body.len()),
        },
        Err(err) => format!("<unavailable: {err}>"),
    }
}
