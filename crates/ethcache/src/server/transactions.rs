use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::info;

use ethcache_core::resolve;
use ethcache_core::types::TxRecord;

use super::error::AppError;
use super::SharedState;
use crate::auth::AuthUser;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Serialize)]
pub(super) struct TransactionsResponse {
    transactions: Vec<TxRecord>,
}

// ==============================================================================
// Handlers
// ==============================================================================

/// `GET /eth/{batch}` and `GET /eth?transactionHashes=...`: resolve a batch
/// of transaction hashes from exactly one of the two sources. With a valid
/// token the resolved transactions are linked to the caller; without a
/// token the resolution is anonymous.
pub(super) async fn get_eth(
    State(state): State<SharedState>,
    headers: HeaderMap,
    batch: Option<Path<String>>,
    RawQuery(query): RawQuery,
) -> Result<Json<TransactionsResponse>, AppError> {
    let user = optional_known_user(&state, &headers).await?;

    let listed = hashes_from_query(query.as_deref());
    let batch = batch.as_ref().map(|Path(b)| b.as_str());
    let hashes = resolve::requested_hashes(batch, listed)?;

    let resolved = resolve::resolve_transactions(
        state.rpc.as_ref(),
        &state.store,
        &hashes,
        user.as_ref().map(|u| u.id),
        state.rpc_concurrency,
    )
    .await?;
    info!(
        requested = hashes.len(),
        from_chain = resolved.from_chain.len(),
        from_cache = resolved.from_cache.len(),
        linked = user.is_some(),
        "resolved transaction batch"
    );

    Ok(Json(TransactionsResponse {
        transactions: resolved.merged(),
    }))
}

/// `GET /all`: every cached transaction; no authentication.
pub(super) async fn get_all(
    State(state): State<SharedState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let transactions = state.store.find_all().await?;
    Ok(Json(TransactionsResponse { transactions }))
}

/// `GET /my`: the caller's linked transactions; authentication required.
pub(super) async fn get_my(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<TransactionsResponse>, AppError> {
    let user = state.jwt.require_user(&headers)?;
    let transactions = state.store.find_by_user(user.id).await?;
    Ok(Json(TransactionsResponse { transactions }))
}

// ==============================================================================
// Helpers
// ==============================================================================

/// Decode the optional token and confirm the principal still exists. A
/// token whose user row has been removed no longer names anyone and is
/// rejected rather than silently resolving without linkage.
async fn optional_known_user(
    state: &SharedState,
    headers: &HeaderMap,
) -> Result<Option<AuthUser>, AppError> {
    let Some(user) = state.jwt.optional_user(headers)? else {
        return Ok(None);
    };
    match state.store.find_user_by_id(user.id).await? {
        Some(_) => Ok(Some(user)),
        None => Err(AppError::Unauthorized(format!(
            "unknown user: {}",
            user.username
        ))),
    }
}

/// Collect `transactionHashes` values from the raw query string. The key
/// may appear once (scalar) or repeatedly (sequence); both normalize to a
/// list. Hash identifiers are plain hex, so no percent-decoding applies.
fn hashes_from_query(query: Option<&str>) -> Vec<String> {
    let Some(query) = query else {
        return Vec::new();
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, value)| *key == "transactionHashes" && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .collect()
}
