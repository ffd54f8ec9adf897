//! Transaction identifiers and commit status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Response header carrying the transaction identifier assigned to a request.
pub const TX_ID_HEADER: &str = "x-quorum-transaction-id";

/// Identifier of a transaction in the replicated log.
///
/// `view` is the consensus epoch, `seqno` the position within the log.
/// Seqnos increase monotonically within a view, but no total order is
/// assumed across views; two identifiers name the same transaction only
/// when both fields are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId {
    pub view: u64,
    pub seqno: u64,
}

impl TxId {
    pub fn new(view: u64, seqno: u64) -> Self {
        Self { view, seqno }
    }

    /// Parse the value of the transaction-id response header.
    ///
    /// An absent or malformed value yields `None`, never an error and
    /// never a partial pair.
    pub fn from_header(value: Option<&str>) -> Option<TxId> {
        value.and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.view, self.seqno)
    }
}

impl FromStr for TxId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || ClientError::Precondition(format!("'{s}' is not a valid transaction id"));
        let (view, seqno) = s.split_once('.').ok_or_else(invalid)?;
        Ok(TxId {
            view: view.parse().map_err(|_| invalid())?,
            seqno: seqno.parse().map_err(|_| invalid())?,
        })
    }
}

/// Status of a transaction as reported by the node's status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// The node has not heard of this transaction yet.
    Unknown,
    /// Replicated, but not yet durable.
    Pending,
    /// Durable at this (view, seqno); will not be rolled back.
    Committed,
    /// Will never commit at this (view, seqno).
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_tx_id() {
        assert_eq!(TxId::from_header(Some("3.17")), Some(TxId::new(3, 17)));
        assert_eq!(TxId::from_header(Some("0.0")), Some(TxId::new(0, 0)));
    }

    #[test]
    fn test_absent_header_yields_none() {
        assert_eq!(TxId::from_header(None), None);
    }

    #[test]
    fn test_malformed_values_yield_none() {
        for value in ["abc", "3", "3.", ".17", "3.17.2", "-1.4", "3.abc", ""] {
            assert_eq!(TxId::from_header(Some(value)), None, "value: {value:?}");
        }
    }

    #[test]
    fn test_display_round_trip() {
        let tx_id = TxId::new(2, 42);
        assert_eq!(tx_id.to_string(), "2.42");
        assert_eq!(tx_id.to_string().parse::<TxId>().unwrap(), tx_id);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::from_str::<TxStatus>("\"Committed\"").unwrap(),
            TxStatus::Committed
        );
        assert_eq!(
            serde_json::from_str::<TxStatus>("\"Pending\"").unwrap(),
            TxStatus::Pending
        );
        assert!(serde_json::from_str::<TxStatus>("\"Nonsense\"").is_err());
    }
}
