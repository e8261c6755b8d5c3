use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use tracing::{debug, trace};

use crate::error::{CoreError, RpcError};

use super::super::types::{RpcReceipt, RpcTransaction};
use super::super::EthRpc;
use super::parsing::{parse_receipt, parse_transaction};
use super::protocol::{parse_jsonrpc_error, JsonRpcRequest, JsonRpcResponse};

/// Ethereum JSON-RPC client over HTTP(S).
///
/// One instance is shared process-wide; it holds no per-request state
/// beyond the monotonic request-id counter. There is deliberately no
/// whole-request timeout here: the HTTP boundary's timeout layer is the
/// only cancellation mechanism around a resolution.
pub struct HttpRpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true)
            .build()
            .expect("reqwest client builder uses valid static config");

        Self {
            client,
            url: url.to_owned(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn rpc_call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, CoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(rpc.id = id, rpc.method = method, "rpc call");
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(RpcError::Transport)?;
        let status = response.status();

        let body = response.text().await.map_err(RpcError::Transport)?;
        debug!(rpc.id = id, rpc.method = method, %status, body_len = body.len(), "rpc response");
        trace!(rpc.id = id, rpc.method = method, body = %body, "rpc response body");

        let decoded: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
            RpcError::InvalidResponse(format!("decode JSON-RPC response: {e}; body={body}"))
        })?;

        if let Some(err) = decoded.error {
            return Err(parse_jsonrpc_error(err));
        }

        Ok(decoded.result.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl EthRpc for HttpRpcClient {
    async fn get_transaction(&self, hash: &str) -> Result<Option<RpcTransaction>, CoreError> {
        let raw = self
            .rpc_call("eth_getTransactionByHash", vec![serde_json::json!(hash)])
            .await?;
        parse_transaction(raw)
    }

    async fn get_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, CoreError> {
        let raw = self
            .rpc_call("eth_getTransactionReceipt", vec![serde_json::json!(hash)])
            .await?;
        parse_receipt(raw)
    }
}
