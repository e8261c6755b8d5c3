#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid request parameters: {0}")]
    InvalidParams(String),

    #[error("batch decode error: {0}")]
    Decode(String),

    #[error("ledger rpc failure: {0}")]
    Rpc(#[from] RpcError),

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node returned error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
