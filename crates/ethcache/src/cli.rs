use clap::Parser;

/// ethcache: Ethereum transaction cache and lookup API backed by SQLite.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Ethereum node JSON-RPC URL.
    #[arg(long, env = "ETH_NODE_URL")]
    pub rpc_url: String,

    /// SQLite database URL.
    #[arg(long, default_value = "sqlite://ethcache.db", env = "DATABASE_URL")]
    pub database_url: String,

    /// Secret used to sign and verify JWT session tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Address to bind the API server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, default_value = "3000", env = "API_PORT")]
    pub port: u16,

    /// Whole-request timeout in seconds; requests exceeding it get HTTP 408.
    #[arg(long, default_value = "600")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent ledger fetches within one resolution.
    #[arg(long, default_value = "8")]
    pub rpc_concurrency: usize,

    /// Seed a user as `username:password` before serving (repeatable).
    /// Existing usernames are left untouched.
    #[arg(long, value_name = "USER:PASS")]
    pub seed_user: Vec<String>,
}
