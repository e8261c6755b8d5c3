//! Shared helpers for the in-crate test modules.

use tempfile::TempDir;

use crate::rpc::types::{RpcReceipt, RpcTransaction};
use crate::store::Store;
use crate::types::{TxRecord, TxStatus};

/// A deterministic 32-byte transaction hash string.
pub fn tx_hash(byte: u8) -> String {
    format!("0x{}", hex::encode([byte; 32]))
}

/// A store backed by a fresh database file; the `TempDir` must be kept
/// alive for the duration of the test.
pub async fn temp_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}/cache.db", dir.path().display());
    let store = Store::connect(&url).await.expect("connect store");
    (dir, store)
}

/// A ledger-side transaction; confirmed when `block_number` is given.
pub fn chain_tx(hash: &str, block_number: Option<i64>) -> RpcTransaction {
    RpcTransaction {
        hash: hash.to_string(),
        block_hash: block_number.map(|n| format!("0xblock{n}")),
        block_number,
        from: "0x1111111111111111111111111111111111111111".to_string(),
        to: Some("0x2222222222222222222222222222222222222222".to_string()),
        input: "0x".to_string(),
        value: "1000000000000000000".to_string(),
    }
}

pub fn receipt(logs_count: i64) -> RpcReceipt {
    RpcReceipt {
        contract_address: None,
        logs_count,
    }
}

/// A confirmed cached record.
pub fn record(hash: &str) -> TxRecord {
    TxRecord {
        hash: hash.to_string(),
        status: TxStatus::Confirmed,
        block_hash: Some("0xcached".to_string()),
        block_number: Some(100),
        sender: "0x1111111111111111111111111111111111111111".to_string(),
        recipient: Some("0x2222222222222222222222222222222222222222".to_string()),
        contract_address: None,
        logs_count: 0,
        input: "0x".to_string(),
        value: "42".to_string(),
    }
}
