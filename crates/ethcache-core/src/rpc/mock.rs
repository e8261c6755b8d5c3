use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{CoreError, RpcError};

use super::types::{RpcReceipt, RpcTransaction};
use super::EthRpc;

/// A mock Ethereum RPC backend for testing. Returns canned transaction and
/// receipt data from `HashMap`s populated via the builder pattern, and
/// counts issued fetches so tests can assert exactly how much remote
/// traffic a resolution produced.
pub struct MockRpc {
    transactions: HashMap<String, RpcTransaction>,
    receipts: HashMap<String, RpcReceipt>,
    failing: HashSet<String>,
    transaction_fetches: AtomicUsize,
    receipt_fetches: AtomicUsize,
}

impl MockRpc {
    pub fn builder() -> MockRpcBuilder {
        MockRpcBuilder {
            transactions: HashMap::new(),
            receipts: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    pub fn transaction_fetches(&self) -> usize {
        self.transaction_fetches.load(Ordering::SeqCst)
    }

    pub fn receipt_fetches(&self) -> usize {
        self.receipt_fetches.load(Ordering::SeqCst)
    }
}

pub struct MockRpcBuilder {
    transactions: HashMap<String, RpcTransaction>,
    receipts: HashMap<String, RpcReceipt>,
    failing: HashSet<String>,
}

impl MockRpcBuilder {
    pub fn with_transaction(mut self, tx: RpcTransaction) -> Self {
        self.transactions.insert(tx.hash.clone(), tx);
        self
    }

    pub fn with_receipt(mut self, hash: &str, receipt: RpcReceipt) -> Self {
        self.receipts.insert(hash.to_string(), receipt);
        self
    }

    /// Make both lookups for `hash` fail with a node error.
    pub fn with_failure(mut self, hash: &str) -> Self {
        self.failing.insert(hash.to_string());
        self
    }

    pub fn build(self) -> MockRpc {
        MockRpc {
            transactions: self.transactions,
            receipts: self.receipts,
            failing: self.failing,
            transaction_fetches: AtomicUsize::new(0),
            receipt_fetches: AtomicUsize::new(0),
        }
    }
}

impl MockRpc {
    fn check_failure(&self, hash: &str) -> Result<(), CoreError> {
        if self.failing.contains(hash) {
            return Err(CoreError::Rpc(RpcError::ServerError {
                code: -32000,
                message: format!("injected failure for {hash}"),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl EthRpc for MockRpc {
    async fn get_transaction(&self, hash: &str) -> Result<Option<RpcTransaction>, CoreError> {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failure(hash)?;
        Ok(self.transactions.get(hash).cloned())
    }

    async fn get_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, CoreError> {
        self.receipt_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failure(hash)?;
        Ok(self.receipts.get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx(hash: &str) -> RpcTransaction {
        RpcTransaction {
            hash: hash.to_string(),
            block_hash: Some("0xblock".to_string()),
            block_number: Some(42),
            from: "0xsender".to_string(),
            to: Some("0xrecipient".to_string()),
            input: "0x".to_string(),
            value: "1000".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_hash_is_absent_not_an_error() {
        let rpc = MockRpc::builder().build();
        let fetched = rpc.get_transaction("0xmissing").await.expect("no error");
        assert!(fetched.is_none());
        assert_eq!(rpc.transaction_fetches(), 1);
    }

    #[tokio::test]
    async fn canned_transaction_and_receipt_are_returned() {
        let rpc = MockRpc::builder()
            .with_transaction(sample_tx("0xaa"))
            .with_receipt(
                "0xaa",
                RpcReceipt {
                    contract_address: None,
                    logs_count: 5,
                },
            )
            .build();

        let tx = rpc
            .get_transaction("0xaa")
            .await
            .expect("no error")
            .expect("present");
        assert_eq!(tx.block_number, Some(42));

        let receipt = rpc
            .get_receipt("0xaa")
            .await
            .expect("no error")
            .expect("present");
        assert_eq!(receipt.logs_count, 5);
        assert_eq!(rpc.transaction_fetches(), 1);
        assert_eq!(rpc.receipt_fetches(), 1);
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_rpc_error() {
        let rpc = MockRpc::builder().with_failure("0xbad").build();
        let err = rpc.get_transaction("0xbad").await.expect_err("must fail");
        assert!(matches!(err, CoreError::Rpc(RpcError::ServerError { .. })));
    }
}
