//! Node RPC layer.
//!
//! [`RpcClient`] owns the request lifecycle (ids, retry, logging) and talks to
//! the node through an [`RpcTransport`]. [`HttpTransport`] is the production
//! transport; tests plug in `mock::ScriptedTransport`. Typed call sites live
//! in [`methods`].

mod client;
mod http_adapter;
pub mod methods;
#[cfg(test)]
pub mod mock;
pub mod protocol;
pub mod types;

pub use client::RpcClient;
pub(crate) use http_adapter::parse_connection;
pub use http_adapter::HttpTransport;
pub use methods::{NodeRpc, RunesRpc};
pub use protocol::{JsonRpcRequest, RpcOutcome};
pub use types::{ChainInfo, MempoolInfo, NetworkInfo};

use async_trait::async_trait;

use crate::error::RpcError;

/// Delivers one request and returns the decoded outcome.
///
/// Implementations own transport concerns (timeouts, HTTP status, auth).
/// A node-side error envelope is a successful exchange and comes back as
/// [`RpcOutcome::Failure`], not as an `Err`.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, request: &JsonRpcRequest<'_>) -> Result<RpcOutcome, RpcError>;
}
