//! Observability port.
//!
//! The core reports what it does through [`Observer`] instead of touching a
//! process-wide metrics registry. [`NoopObserver`] is the default;
//! [`TracingObserver`] turns every report into a structured `tracing` event
//! and is what the CLI installs.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::RpcError;
use crate::realtime::ConnectionState;

pub trait Observer: Send + Sync {
    /// One RPC attempt finished, successfully or not.
    fn rpc_attempt(
        &self,
        _method: &str,
        _attempt: u32,
        _elapsed: Duration,
        _outcome: Result<(), &RpcError>,
    ) {
    }

    /// The realtime connection moved to a new state.
    fn connection_state(&self, _state: ConnectionState, _attempts: u32) {}

    /// A webhook delivery was judged.
    fn webhook_delivery(&self, _webhook_id: &str, _success: bool, _status: Option<u16>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn rpc_attempt(
        &self,
        method: &str,
        attempt: u32,
        elapsed: Duration,
        outcome: Result<(), &RpcError>,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(()) => debug!(rpc.method = method, attempt, elapsed_ms, "rpc attempt ok"),
            Err(error) => warn!(
                rpc.method = method,
                attempt,
                elapsed_ms,
                %error,
                "rpc attempt failed"
            ),
        }
    }

    fn connection_state(&self, state: ConnectionState, attempts: u32) {
        info!(ws.state = %state, ws.attempts = attempts, "realtime connection state");
    }

    fn webhook_delivery(&self, webhook_id: &str, success: bool, status: Option<u16>) {
        if success {
            info!(webhook.id = webhook_id, ?status, "webhook delivered");
        } else {
            warn!(webhook.id = webhook_id, ?status, "webhook delivery failed");
        }
    }
}
