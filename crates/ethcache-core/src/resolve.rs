//! Transaction resolution: cache lookup, concurrent remote fetch for
//! misses, write-through persistence, and user linkage.
//!
//! Every resolution is stateless aside from the store and the ledger; two
//! overlapping resolutions racing to insert the same hash are arbitrated
//! by the store's `UNIQUE(hash)` constraint, and the loser surfaces a
//! store error rather than silently duplicating the record.

use futures::future::{try_join, try_join_all};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::CoreError;
use crate::rlp;
use crate::rpc::{EthRpc, RpcReceipt, RpcTransaction};
use crate::store::Store;
use crate::types::{ResolvedBatch, TxRecord, TxStatus};

// ==============================================================================
// Request Parameters
// ==============================================================================

/// Validate the two request-parameter sources against each other and
/// produce the hash list to resolve.
///
/// Exactly one source must be non-empty: an RLP-encoded batch or an
/// explicit list. The HTTP layer already normalizes a single scalar query
/// value into a one-element list.
pub fn requested_hashes(
    batch: Option<&str>,
    listed: Vec<String>,
) -> Result<Vec<String>, CoreError> {
    match (batch, listed) {
        (Some(_), listed) if !listed.is_empty() => Err(CoreError::InvalidParams(
            "provide either an RLP batch or transactionHashes, not both".to_string(),
        )),
        (Some(rlp_hex), _) => rlp::decode_hash_list(rlp_hex),
        (None, listed) if listed.is_empty() => Err(CoreError::InvalidParams(
            "provide either an RLP batch or transactionHashes".to_string(),
        )),
        (None, listed) => Ok(listed),
    }
}

// ==============================================================================
// Resolution
// ==============================================================================

/// Resolve `hashes` against the cache and the remote ledger.
///
/// Cache misses are fetched concurrently (bounded by `concurrency`),
/// persisted in one bulk call, and, when a principal is present, linked to
/// it together with the cache hits. Hashes unknown to the ledger are
/// silently absent from the result; any store or ledger failure aborts the
/// whole resolution. A retry after a partial external success is
/// self-healing: previously persisted records turn into cache hits.
///
/// The miss list is the original sequence filtered against the found set,
/// so duplicate input hashes that both miss will race each other into the
/// hash uniqueness constraint and fail the call; callers should not submit
/// duplicates.
pub async fn resolve_transactions(
    rpc: &dyn EthRpc,
    store: &Store,
    hashes: &[String],
    user_id: Option<i64>,
    concurrency: usize,
) -> Result<ResolvedBatch, CoreError> {
    let cached = store.find_by_hashes(hashes).await?;
    let misses: Vec<&String> = hashes
        .iter()
        .filter(|hash| !cached.hashes.contains(*hash))
        .collect();
    debug!(
        requested = hashes.len(),
        cache_hits = cached.records.len(),
        misses = misses.len(),
        "resolving transactions"
    );

    let from_chain = if misses.is_empty() {
        Vec::new()
    } else {
        fetch_chain_transactions(rpc, &misses, concurrency).await?
    };

    let new_ids = store.insert_transactions(&from_chain).await?;

    if let Some(user_id) = user_id {
        let mut linked = new_ids;
        linked.extend_from_slice(&cached.ids);
        store.link_user(user_id, &linked).await?;
    }

    Ok(ResolvedBatch {
        from_chain,
        from_cache: cached.records,
    })
}

// ==============================================================================
// Remote Fetch Fan-Out
// ==============================================================================

/// Fetch transaction and receipt for every miss, all hashes concurrently
/// and the two calls per hash concurrently with each other, bounded by a
/// semaphore permit per hash.
///
/// Fan-out/fan-in: the call suspends until every fetch completes, and one
/// failing fetch fails the whole batch. A hash whose transaction lookup
/// returns nothing is dropped; a missing receipt is tolerated (the
/// transaction may simply not be mined yet).
async fn fetch_chain_transactions(
    rpc: &dyn EthRpc,
    hashes: &[&String],
    concurrency: usize,
) -> Result<Vec<TxRecord>, CoreError> {
    let semaphore = Semaphore::new(concurrency.max(1));

    let fetches = hashes.iter().map(|&hash| {
        let semaphore = &semaphore;
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .expect("semaphore is never closed");
            try_join(rpc.get_transaction(hash), rpc.get_receipt(hash)).await
        }
    });
    let fetched = try_join_all(fetches).await?;

    Ok(fetched
        .into_iter()
        .filter_map(|(transaction, receipt)| {
            transaction.map(|tx| record_from_chain(tx, receipt))
        })
        .collect())
}

/// Build the canonical record from the ledger's answer. Confirmed iff a
/// containing block was reported; receipt absence defaults the
/// receipt-derived fields.
fn record_from_chain(transaction: RpcTransaction, receipt: Option<RpcReceipt>) -> TxRecord {
    let status = if transaction.block_number.is_some() {
        TxStatus::Confirmed
    } else {
        TxStatus::Pending
    };
    let (contract_address, logs_count) = match receipt {
        Some(receipt) => (receipt.contract_address, receipt.logs_count),
        None => (None, 0),
    };

    TxRecord {
        hash: transaction.hash,
        status,
        block_hash: transaction.block_hash,
        block_number: transaction.block_number,
        sender: transaction.from,
        recipient: transaction.to,
        contract_address,
        logs_count,
        input: transaction.input,
        value: transaction.value,
    }
}

// ==============================================================================
// Tests
// ==============================================================================
