//! Ethereum node RPC abstraction layer.
//!
//! Defines the [`EthRpc`] trait and provides an HTTP JSON-RPC
//! implementation ([`HttpRpcClient`]) plus a test mock (`mock::MockRpc`).

mod http_adapter;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use http_adapter::HttpRpcClient;
pub use types::{RpcReceipt, RpcTransaction};

use async_trait::async_trait;

use crate::error::CoreError;

/// Minimal trait covering the Ethereum JSON-RPC methods the resolver needs.
///
/// Implementations handle transport and response deserialization
/// internally. A hash unknown to the ledger yields `Ok(None)`, not an
/// error; only transport and node failures are `Err`, and those must
/// propagate so the resolver never persists partial data.
#[async_trait]
pub trait EthRpc: Send + Sync {
    /// Fetch a transaction by hash (`eth_getTransactionByHash`).
    async fn get_transaction(&self, hash: &str) -> Result<Option<RpcTransaction>, CoreError>;

    /// Fetch the transaction's receipt (`eth_getTransactionReceipt`).
    /// Transactions that have not been mined yet have no receipt.
    async fn get_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, CoreError>;
}
