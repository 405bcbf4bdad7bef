//! Configuration consumed by the RPC client, the realtime connection
//! manager, and the webhook notifier.
//!
//! All durations are `std::time::Duration`; the CLI maps millisecond flags
//! onto these structs.

use std::path::PathBuf;
use std::time::Duration;

use crate::webhook::WebhookEventType;

// ==============================================================================
// RPC
// ==============================================================================

#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// HTTP(S) endpoint of the node.
    pub url: String,
    pub user: Option<String>,
    pub pass: Option<String>,
    /// File containing `username:password`, used when no explicit
    /// credentials are given.
    pub cookie_file: Option<PathBuf>,
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Additional attempts after a transport failure.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// Outbound request ceiling; `None` disables rate limiting.
    pub requests_per_second: Option<u32>,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8332".to_owned(),
            user: None,
            pass: None,
            cookie_file: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            requests_per_second: None,
        }
    }
}

// ==============================================================================
// Realtime
// ==============================================================================

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub url: String,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl RealtimeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: Duration::from_secs(5),
            max_reconnect_attempts: 5,
        }
    }
}

// ==============================================================================
// Webhooks
// ==============================================================================

/// Values applied to every registration before the caller's own fields.
#[derive(Debug, Clone)]
pub struct WebhookDefaults {
    pub url: Option<String>,
    pub events: Vec<WebhookEventType>,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for WebhookDefaults {
    fn default() -> Self {
        Self {
            url: None,
            events: Vec::new(),
            timeout: Duration::from_secs(5),
            retry_count: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}
