use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// runes: command-line client for Runes nodes (raw RPC, status, live events, webhooks).
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(flatten)]
    pub rpc: RpcArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct RpcArgs {
    /// Node JSON-RPC URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8332", env = "RUNES_RPC_URL")]
    pub rpc_url: String,

    /// RPC username (optional; not needed for token-in-URL providers).
    #[arg(long, global = true, env = "RUNES_RPC_USER")]
    pub rpc_user: Option<String>,

    /// RPC password (optional; not needed for token-in-URL providers).
    #[arg(long, global = true, env = "RUNES_RPC_PASS")]
    pub rpc_pass: Option<String>,

    /// Cookie file with `username:password`, used when no user/pass is given.
    #[arg(long, global = true, env = "RUNES_RPC_COOKIE_FILE")]
    pub rpc_cookie_file: Option<PathBuf>,

    /// Per-attempt RPC timeout in milliseconds.
    #[arg(long, global = true, default_value = "30000", env = "RUNES_RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: u64,

    /// Additional attempts after a transport failure.
    #[arg(long, global = true, default_value = "3", env = "RUNES_RPC_MAX_RETRIES")]
    pub rpc_max_retries: u32,

    /// Pause between RPC attempts in milliseconds.
    #[arg(long, global = true, default_value = "1000", env = "RUNES_RPC_RETRY_DELAY_MS")]
    pub rpc_retry_delay_ms: u64,

    /// Outbound RPC request ceiling per second. Unlimited when omitted.
    #[arg(long, global = true, env = "RUNES_RPC_REQUESTS_PER_SECOND")]
    pub rpc_requests_per_second: Option<u32>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Issue one raw RPC call and print its result.
    Call {
        /// RPC method name.
        method: String,

        /// Positional params. Each is parsed as JSON, falling back to a string.
        params: Vec<String>,
    },

    /// Query the node and log a chain/network/mempool summary.
    Status,

    /// Stream realtime events until Ctrl-C.
    Watch(WatchArgs),

    /// Deliver one event to the given webhook destinations.
    Notify(NotifyArgs),
}

#[derive(Args)]
pub struct WatchArgs {
    /// Realtime WebSocket URL.
    #[arg(long, default_value = "ws://127.0.0.1:8333/ws", env = "RUNES_WS_URL")]
    pub ws_url: String,

    /// Delay between reconnect attempts in milliseconds.
    #[arg(long, default_value = "5000", env = "RUNES_WS_RECONNECT_INTERVAL_MS")]
    pub reconnect_interval_ms: u64,

    /// Reconnect attempts before giving up.
    #[arg(long, default_value = "5", env = "RUNES_WS_MAX_RECONNECT_ATTEMPTS")]
    pub max_reconnect_attempts: u32,

    /// JSON frame to send every time the connection opens.
    #[arg(long)]
    pub subscribe: Option<String>,

    /// Only print messages with these `type` values (repeatable). Prints
    /// everything when omitted.
    #[arg(long = "type")]
    pub types: Vec<String>,
}

#[derive(Args)]
pub struct NotifyArgs {
    /// Destination as `<id>=<url>` (repeatable).
    #[arg(long = "webhook", required = true)]
    pub webhooks: Vec<String>,

    /// Event type, e.g. `transfer` or `transaction.confirmed`.
    #[arg(long)]
    pub event: String,

    /// Per-destination timeout in milliseconds.
    #[arg(long, default_value = "5000")]
    pub timeout_ms: u64,

    /// Extra attempts per destination after a failed delivery.
    #[arg(long, default_value = "0")]
    pub retry_count: u32,

    /// Sign each delivery body with HMAC-SHA256 under this secret.
    #[arg(long, env = "RUNES_WEBHOOK_SECRET")]
    pub secret: Option<String>,

    /// Event payload as JSON.
    pub data: String,
}
