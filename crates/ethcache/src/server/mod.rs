mod error;
mod sessions;
mod transactions;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use ethcache_core::rpc::EthRpc;
use ethcache_core::store::Store;

use crate::auth::JwtManager;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub rpc: Arc<dyn EthRpc>,
    pub store: Store,
    pub jwt: JwtManager,
    pub rpc_concurrency: usize,
}

type SharedState = Arc<AppState>;

// ==============================================================================
// Router
// ==============================================================================

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/authenticate", post(sessions::authenticate))
        .route("/eth", get(transactions::get_eth))
        .route("/eth/{batch}", get(transactions::get_eth))
        .route("/all", get(transactions::get_all))
        .route("/my", get(transactions::get_my))
        .fallback(route_not_found)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(shared)
}

async fn route_not_found() -> error::AppError {
    error::AppError::NotFound("route not found".to_string())
}

// ==============================================================================
// Tests
// ==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use ethcache_core::error::{CoreError, RpcError};
    use ethcache_core::rlp;
    use ethcache_core::rpc::{RpcReceipt, RpcTransaction};

    use crate::auth::{hash_password, AUTH_HEADER};

    const TEST_SECRET: &[u8] = b"test-secret";
    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    #[derive(Clone, Copy)]
    enum FakeRpcMode {
        Ok,
        Absent,
        RpcFailure,
    }

    struct FakeRpc {
        mode: FakeRpcMode,
    }

    #[async_trait]
    impl EthRpc for FakeRpc {
        async fn get_transaction(&self, hash: &str) -> Result<Option<RpcTransaction>, CoreError> {
            match self.mode {
                FakeRpcMode::Ok => Ok(Some(RpcTransaction {
                    hash: hash.to_string(),
                    block_hash: Some("0xblock".to_string()),
                    block_number: Some(42),
                    from: "0x1111111111111111111111111111111111111111".to_string(),
                    to: Some("0x2222222222222222222222222222222222222222".to_string()),
                    input: "0x".to_string(),
                    value: "1000000000000000000".to_string(),
                })),
                FakeRpcMode::Absent => Ok(None),
                FakeRpcMode::RpcFailure => Err(CoreError::Rpc(RpcError::ServerError {
                    code: -32000,
                    message: "header not found".to_string(),
                })),
            }
        }

        async fn get_receipt(&self, _hash: &str) -> Result<Option<RpcReceipt>, CoreError> {
            match self.mode {
                FakeRpcMode::Ok => Ok(Some(RpcReceipt {
                    contract_address: None,
                    logs_count: 1,
                })),
                FakeRpcMode::Absent => Ok(None),
                FakeRpcMode::RpcFailure => Err(CoreError::Rpc(RpcError::ServerError {
                    code: -32000,
                    message: "header not found".to_string(),
                })),
            }
        }
    }

    /// Router over a fresh store with one seeded user `alice`/`wonderland`.
    /// The `TempDir` must outlive the router.
    async fn test_router(mode: FakeRpcMode) -> (TempDir, Router) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = format!("sqlite://{}/cache.db", dir.path().display());
        let store = Store::connect(&url).await.expect("connect store");
        store
            .insert_user(
                "alice",
                &hash_password("wonderland").expect("hash seed password"),
            )
            .await
            .expect("seed user");

        let state = AppState {
            rpc: Arc::new(FakeRpc { mode }),
            store,
            jwt: JwtManager::new(TEST_SECRET),
            rpc_concurrency: 4,
        };
        (dir, build_router(state, TEST_TIMEOUT))
    }

    fn tx_hash(byte: u8) -> String {
        format!("0x{byte:02x}{:062x}", 0)
    }

    async fn response_body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .expect("response body must be readable");
        serde_json::from_slice(&bytes).expect("response body must be valid JSON")
    }

    async fn obtain_token(router: &Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/authenticate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");
        let status = response.status();
        (status, response_body_json(response).await)
    }

    #[tokio::test]
    async fn authenticate_issues_token_for_valid_credentials() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let (status, json) = obtain_token(&router, "alice", "wonderland").await;
        assert_eq!(status, StatusCode::OK);
        let token = json
            .get("token")
            .and_then(serde_json::Value::as_str)
            .expect("token field");
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;

        let (status, json) = obtain_token(&router, "alice", "not-wonderland").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            json.get("error").and_then(serde_json::Value::as_str),
            Some("invalid credentials")
        );

        // Unknown usernames get the same answer as wrong passwords.
        let (status, json) = obtain_token(&router, "mallory", "wonderland").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            json.get("error").and_then(serde_json::Value::as_str),
            Some("invalid credentials")
        );
    }

    #[tokio::test]
    async fn eth_resolves_query_hashes() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let uri = format!(
            "/eth?transactionHashes={}&transactionHashes={}",
            tx_hash(0xaa),
            tx_hash(0xbb)
        );
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_body_json(response).await;
        let transactions = json
            .get("transactions")
            .and_then(serde_json::Value::as_array)
            .expect("transactions array");
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0]["transactionStatus"], 1);
        assert_eq!(transactions[0]["logsCount"], 1);
    }

    #[tokio::test]
    async fn eth_resolves_rlp_batch_path() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let batch = rlp::encode_hash_list(&[tx_hash(0xaa), tx_hash(0xbb)]);
        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/eth/{batch}"))
                    .body(Body::empty())
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_body_json(response).await;
        assert_eq!(
            json.get("transactions")
                .and_then(serde_json::Value::as_array)
                .expect("transactions array")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn eth_with_both_sources_is_bad_request() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let batch = rlp::encode_hash_list(&[tx_hash(0xaa)]);
        let uri = format!("/eth/{batch}?transactionHashes={}", tx_hash(0xbb));
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn eth_with_no_source_is_bad_request() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let response = router
            .oneshot(Request::builder().uri("/eth").body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn eth_with_malformed_batch_is_bad_request() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/eth/not-hex-at-all")
                    .body(Body::empty())
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn eth_with_invalid_token_is_unauthorized() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let uri = format!("/eth?transactionHashes={}", tx_hash(0xaa));
        let response = router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(AUTH_HEADER, "garbage")
                    .body(Body::empty())
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn eth_with_token_for_deleted_user_is_unauthorized() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let token = JwtManager::new(TEST_SECRET)
            .sign(999, "ghost")
            .expect("sign");
        let uri = format!("/eth?transactionHashes={}", tx_hash(0xaa));
        let response = router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(AUTH_HEADER, token)
                    .body(Body::empty())
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn eth_rpc_failure_maps_to_502() {
        let (_dir, router) = test_router(FakeRpcMode::RpcFailure).await;
        let uri = format!("/eth?transactionHashes={}", tx_hash(0xaa));
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn eth_ledger_absent_hash_yields_empty_result() {
        let (_dir, router) = test_router(FakeRpcMode::Absent).await;
        let uri = format!("/eth?transactionHashes={}", tx_hash(0xaa));
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_body_json(response).await;
        assert_eq!(
            json.get("transactions")
                .and_then(serde_json::Value::as_array)
                .expect("transactions array")
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn my_requires_a_token_and_lists_linked_transactions() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/my").body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (status, json) = obtain_token(&router, "alice", "wonderland").await;
        assert_eq!(status, StatusCode::OK);
        let token = json["token"].as_str().expect("token field").to_string();

        // Resolve one hash with the token; it must show up under /my.
        let uri = format!("/eth?transactionHashes={}", tx_hash(0xaa));
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(AUTH_HEADER, &token)
                    .body(Body::empty())
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/my")
                    .header(AUTH_HEADER, &token)
                    .body(Body::empty())
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_body_json(response).await;
        let transactions = json
            .get("transactions")
            .and_then(serde_json::Value::as_array)
            .expect("transactions array");
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0]["transactionHash"], tx_hash(0xaa));
    }

    #[tokio::test]
    async fn all_is_public_and_lists_every_cached_transaction() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;

        // Anonymous resolution populates the cache without linking anyone.
        let uri = format!("/eth?transactionHashes={}", tx_hash(0xaa));
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::builder().uri("/all").body(Body::empty()).expect("request must build"))
            .await
            .expect("router should serve request");
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_body_json(response).await;
        assert_eq!(
            json.get("transactions")
                .and_then(serde_json::Value::as_array)
                .expect("transactions array")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let (_dir, router) = test_router(FakeRpcMode::Ok).await;
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/does-not-exist")
                    .body(Body::empty())
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_body_json(response).await;
        assert_eq!(
            json.get("error").and_then(serde_json::Value::as_str),
            Some("route not found")
        );
    }
}
