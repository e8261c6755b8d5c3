//! RPC result types, reduced to the fields the resolver consumes.
//!
//! The node's hex quantities are already converted by the adapter:
//! `block_number` to an integer and `value` to a decimal string.

/// Result of `eth_getTransactionByHash`.
#[derive(Debug, Clone)]
pub struct RpcTransaction {
    pub hash: String,
    /// `None` while the transaction is pending.
    pub block_hash: Option<String>,
    pub block_number: Option<i64>,
    pub from: String,
    /// `None` for contract-creation transactions.
    pub to: Option<String>,
    pub input: String,
    /// Wei amount as a decimal string; values exceed 64-bit range.
    pub value: String,
}

/// Result of `eth_getTransactionReceipt`.
#[derive(Debug, Clone)]
pub struct RpcReceipt {
    pub contract_address: Option<String>,
    pub logs_count: i64,
}
