//! Domain types for cached Ethereum transactions.
//!
//! Contains the canonical [`TxRecord`] the store persists and the API
//! serves, the [`TxStatus`] enum, the [`User`] principal row, and the
//! [`ResolvedBatch`] split returned by the resolver.

use serde::{Deserialize, Serialize};

// ==============================================================================
// Transaction Status
// ==============================================================================

/// Whether the ledger had assigned a containing block when the transaction
/// was resolved. Persisted and serialized as its integer code (0/1), the
/// representation the original API consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TxStatus {
    Pending,
    Confirmed,
}

impl TxStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, String> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Confirmed),
            other => Err(format!("unknown transaction status code: {other}")),
        }
    }
}

impl From<TxStatus> for u8 {
    fn from(status: TxStatus) -> Self {
        status.code() as u8
    }
}

impl TryFrom<u8> for TxStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(i64::from(code))
    }
}

// ==============================================================================
// Transaction Record
// ==============================================================================

/// The canonical transaction record: built once from the ledger's answer
/// and never mutated afterward. The store's surrogate id is deliberately
/// not a field here; it only travels in the parallel id vectors returned
/// by the store and never crosses the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    #[serde(rename = "transactionHash")]
    pub hash: String,
    #[serde(rename = "transactionStatus")]
    pub status: TxStatus,
    #[serde(rename = "blockHash")]
    pub block_hash: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<i64>,
    #[serde(rename = "from")]
    pub sender: String,
    /// `None` for contract-creation transactions.
    #[serde(rename = "to")]
    pub recipient: Option<String>,
    /// Set only when the transaction created a contract and a receipt
    /// was available at resolution time.
    #[serde(rename = "contractAddress")]
    pub contract_address: Option<String>,
    /// Number of event logs emitted; 0 when no receipt was available.
    #[serde(rename = "logsCount")]
    pub logs_count: i64,
    pub input: String,
    /// Wei amount as a decimal string. Ledger values exceed 64-bit range,
    /// so the decimal rendering is carried end to end without re-parsing.
    pub value: String,
}

// ==============================================================================
// User
// ==============================================================================

/// An authentication principal. Rows are created by the seed path; the
/// resolver only consumes `id`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

// ==============================================================================
// Resolved Batch
// ==============================================================================

/// The resolver's output, split by provenance. The split is preserved so
/// callers and tests can observe what was fetched versus served from the
/// cache; the API merges it chain-first.
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub from_chain: Vec<TxRecord>,
    pub from_cache: Vec<TxRecord>,
}

impl ResolvedBatch {
    /// Chain-first concatenation for the final response payload.
    pub fn merged(self) -> Vec<TxRecord> {
        let mut merged = self.from_chain;
        merged.extend(self.from_cache);
        merged
    }
}
