mod auth;
mod cli;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{eyre, WrapErr};

use ethcache_core::rpc::{EthRpc, HttpRpcClient};
use ethcache_core::store::Store;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store = Store::connect(&args.database_url)
        .await
        .wrap_err("open cache database")?;
    tracing::info!(database_url = %args.database_url, "cache store ready");

    for seed in &args.seed_user {
        let (username, password) = seed
            .split_once(':')
            .ok_or_else(|| eyre!("--seed-user expects username:password, got `{seed}`"))?;
        let password_hash = auth::hash_password(password)
            .map_err(|e| eyre!("hash seed password for {username}: {e}"))?;
        store
            .insert_user(username, &password_hash)
            .await
            .wrap_err("seed user")?;
        tracing::info!(username, "seeded user");
    }

    let rpc: Arc<dyn EthRpc> = Arc::new(HttpRpcClient::new(&args.rpc_url));
    tracing::info!(rpc_url = %args.rpc_url, "ledger rpc client ready");

    let state = server::AppState {
        rpc,
        store,
        jwt: auth::JwtManager::new(args.jwt_secret.as_bytes()),
        rpc_concurrency: args.rpc_concurrency,
    };
    let router = server::build_router(state, Duration::from_secs(args.request_timeout_secs));

    if args.bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0; it is accessible from the network");
    }
    let bind_addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .wrap_err("bind TCP listener")?;
    tracing::info!("listening on {bind_addr}");

    axum::serve(listener, router)
        .await
        .wrap_err("run HTTP server")?;

    Ok(())
}
