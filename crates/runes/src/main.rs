mod cli;

use std::sync::Arc;
use std::time::Duration;

use bitcoin::Network;
use clap::Parser;
use eyre::{eyre, WrapErr};
use serde_json::Value;

use runes_core::observe::{Observer, TracingObserver};
use runes_core::realtime::WILDCARD;
use runes_core::{
    ConnectionState, NodeRpc, RealtimeClient, RealtimeConfig, RpcClient, RpcConfig,
    WebhookDefaults, WebhookEventType, WebhookNotifier, WebhookRegistration,
};

use cli::{Command, NotifyArgs, RpcArgs, WatchArgs};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli::Cli { rpc, command } = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let observer: Arc<dyn Observer> = Arc::new(TracingObserver);
    match command {
        Command::Call { method, params } => run_call(&rpc, observer, &method, &params).await,
        Command::Status => run_status(&rpc, observer).await,
        Command::Watch(args) => run_watch(args, observer).await,
        Command::Notify(args) => run_notify(args, observer).await,
    }
}

// ==============================================================================
// RPC
// ==============================================================================

fn rpc_config(args: &RpcArgs) -> RpcConfig {
    RpcConfig {
        url: args.rpc_url.clone(),
        user: args.rpc_user.clone(),
        pass: args.rpc_pass.clone(),
        cookie_file: args.rpc_cookie_file.clone(),
        timeout: Duration::from_millis(args.rpc_timeout_ms),
        max_retries: args.rpc_max_retries,
        retry_delay: Duration::from_millis(args.rpc_retry_delay_ms),
        requests_per_second: args.rpc_requests_per_second,
    }
}

fn rpc_client(args: &RpcArgs, observer: Arc<dyn Observer>) -> eyre::Result<RpcClient> {
    let client = RpcClient::new(&rpc_config(args)).wrap_err("configure RPC client")?;
    Ok(client.with_observer(observer))
}

async fn run_call(
    args: &RpcArgs,
    observer: Arc<dyn Observer>,
    method: &str,
    raw_params: &[String],
) -> eyre::Result<()> {
    let rpc = rpc_client(args, observer)?;
    let params = raw_params.iter().map(|raw| parse_param(raw)).collect();

    let result = rpc.call(method, params).await.map_err(|err| {
        let message = format_rpc_connect_error(&args.rpc_url, &err.to_string());
        eyre!(message).wrap_err(format!("while calling `{method}`"))
    })?;

    println!(
        "{}",
        serde_json::to_string_pretty(&result).wrap_err("render RPC result")?
    );
    Ok(())
}

async fn run_status(args: &RpcArgs, observer: Arc<dyn Observer>) -> eyre::Result<()> {
    let rpc = rpc_client(args, observer)?;

    let chain_info = rpc.get_blockchain_info().await.map_err(|err| {
        let message = format_rpc_connect_error(&args.rpc_url, &err.to_string());
        eyre!(message).wrap_err("while attempting to connect to node RPC")
    })?;
    let network = map_chain_to_network(&chain_info.chain)?;
    tracing::info!(
        chain = %chain_info.chain,
        %network,
        blocks = chain_info.blocks,
        best_block_hash = %chain_info.best_block_hash,
        "connected to node"
    );
    if chain_info.pruned {
        tracing::warn!("node is pruned; old transactions may be unavailable");
    }

    let network_info = rpc
        .get_network_info()
        .await
        .wrap_err("query network info")?;
    tracing::info!(
        version = network_info.version,
        subversion = %network_info.sub_version,
        connections = network_info.connections,
        network_active = network_info.network_active,
        "network"
    );
    if !network_info.network_active {
        tracing::warn!("node networking is disabled");
    }

    let mempool = rpc
        .get_mempool_info()
        .await
        .wrap_err("query mempool info")?;
    tracing::info!(
        size = mempool.size,
        bytes = mempool.bytes,
        usage = mempool.usage,
        max_mempool = mempool.max_mempool,
        min_fee = mempool.min_fee,
        "mempool"
    );

    Ok(())
}

/// Parse a positional param as JSON, falling back to a plain string so
/// `runes call getrune UNCOMMON•GOODS` needs no quoting.
fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn format_rpc_connect_error(rpc_url: &str, source_error: &str) -> String {
    let mut lines = vec![
        format!("could not reach RPC endpoint `{rpc_url}`"),
        format!("RPC error: {source_error}"),
    ];

    if source_error.contains("dns error") {
        lines.push(
            "hint: hostname resolution failed; verify the endpoint hostname and your DNS/network"
                .into(),
        );
    } else if source_error.contains("certificate") || source_error.contains("tls") {
        lines.push(
            "hint: TLS handshake failed; verify certificate trust and that the endpoint uses HTTPS"
                .into(),
        );
    } else if source_error.contains("HTTP status 401") || source_error.contains("HTTP status 403") {
        lines.push("hint: authentication failed; verify --rpc-user/--rpc-pass or --rpc-cookie-file".into());
    } else if source_error.contains("HTTP status 404") {
        lines.push("hint: endpoint path is invalid; verify the full RPC URL".into());
    } else if source_error.contains("timed out") {
        lines.push("hint: the node did not answer in time; raise --rpc-timeout-ms or check node load".into());
    } else if source_error.contains("error sending request for url") {
        lines.push("hint: request could not be sent; verify URL format and that the node is reachable".into());
    }

    lines.join("\n")
}

fn map_chain_to_network(chain: &str) -> eyre::Result<Network> {
    match chain {
        "main" => Ok(Network::Bitcoin),
        "test" => Ok(Network::Testnet),
        "signet" => Ok(Network::Signet),
        "regtest" => Ok(Network::Regtest),
        _ => Err(eyre!(
            "unrecognized chain name `{chain}` from getblockchaininfo"
        )),
    }
}

// ==============================================================================
// Realtime
// ==============================================================================

async fn run_watch(args: WatchArgs, observer: Arc<dyn Observer>) -> eyre::Result<()> {
    let subscribe: Option<Value> = args
        .subscribe
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .wrap_err("parse --subscribe as JSON")?;

    let config = RealtimeConfig {
        url: args.ws_url,
        reconnect_interval: Duration::from_millis(args.reconnect_interval_ms),
        max_reconnect_attempts: args.max_reconnect_attempts,
    };
    let client = RealtimeClient::new(&config, observer);

    let types = args.types;
    client
        .on(
            WILDCARD,
            Arc::new(move |message: &Value| {
                let kind = message
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if types.is_empty() || types.iter().any(|t| t == kind) {
                    println!("{message}");
                }
            }),
        )
        .await;

    let mut states = client.subscribe_state();
    client.connect().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let outcome = loop {
        tokio::select! {
            interrupted = &mut ctrl_c => {
                interrupted.wrap_err("listen for Ctrl-C")?;
                tracing::info!("interrupt received; closing realtime connection");
                break Ok(());
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = *states.borrow_and_update();
                match state {
                    ConnectionState::Open => {
                        if let Some(frame) = &subscribe {
                            if !client.send(frame).await? {
                                tracing::warn!("subscription frame not sent; connection already closed");
                            }
                        }
                    }
                    ConnectionState::Disconnected => {
                        break Err(eyre!(
                            "realtime connection to `{}` lost; reconnect attempts exhausted",
                            config.url
                        ));
                    }
                    _ => {}
                }
            }
        }
    };

    client.close().await;
    outcome
}

// ==============================================================================
// Webhooks
// ==============================================================================

async fn run_notify(args: NotifyArgs, observer: Arc<dyn Observer>) -> eyre::Result<()> {
    let event: WebhookEventType = args
        .event
        .parse()
        .wrap_err_with(|| format!("parse --event `{}`", args.event))?;
    let data: Value = serde_json::from_str(&args.data).wrap_err("parse event data as JSON")?;

    let notifier = WebhookNotifier::new(WebhookDefaults::default())
        .wrap_err("configure webhook notifier")?
        .with_observer(observer);
    for entry in &args.webhooks {
        let (id, url) = parse_webhook(entry)?;
        let mut registration = WebhookRegistration::new(url)
            .events([event])
            .timeout(Duration::from_millis(args.timeout_ms))
            .retry_count(args.retry_count);
        if let Some(secret) = &args.secret {
            registration = registration.secret(secret.clone());
        }
        notifier
            .register(id, registration)
            .await
            .wrap_err_with(|| format!("register webhook `{id}`"))?;
    }

    let results = notifier.notify(event, data).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&results).wrap_err("render delivery report")?
    );

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        return Err(eyre!(
            "{failed} of {} webhook deliveries failed",
            results.len()
        ));
    }
    Ok(())
}

fn parse_webhook(entry: &str) -> eyre::Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((id, url)) if !id.is_empty() && !url.is_empty() => Ok((id, url)),
        _ => Err(eyre!("webhook `{entry}` must be formatted as <id>=<url>")),
    }
}
