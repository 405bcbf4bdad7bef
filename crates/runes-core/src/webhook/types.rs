use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ==============================================================================
// Event Types
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "transfer")]
    Transfer,
    #[serde(rename = "mint")]
    Mint,
    #[serde(rename = "burn")]
    Burn,
    #[serde(rename = "deposit")]
    Deposit,
    #[serde(rename = "withdrawal")]
    Withdrawal,
    #[serde(rename = "transaction.confirmed")]
    TransactionConfirmed,
    #[serde(rename = "transaction.failed")]
    TransactionFailed,
    #[serde(rename = "mempool.full")]
    MempoolFull,
    #[serde(rename = "high.fees")]
    HighFees,
    #[serde(rename = "block.synced")]
    BlockSynced,
}

impl WebhookEventType {
    pub const ALL: [Self; 10] = [
        Self::Transfer,
        Self::Mint,
        Self::Burn,
        Self::Deposit,
        Self::Withdrawal,
        Self::TransactionConfirmed,
        Self::TransactionFailed,
        Self::MempoolFull,
        Self::HighFees,
        Self::BlockSynced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::TransactionConfirmed => "transaction.confirmed",
            Self::TransactionFailed => "transaction.failed",
            Self::MempoolFull => "mempool.full",
            Self::HighFees => "high.fees",
            Self::BlockSynced => "block.synced",
        }
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookEventType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown webhook event type `{s}`")))
    }
}

// ==============================================================================
// Registrations
// ==============================================================================

/// Caller-supplied registration. Unset fields fall back to the notifier's
/// [`WebhookDefaults`](crate::config::WebhookDefaults).
#[derive(Debug, Clone, Default)]
pub struct WebhookRegistration {
    pub url: Option<String>,
    pub events: Option<Vec<WebhookEventType>>,
    pub timeout: Option<Duration>,
    pub retry_count: Option<u32>,
    /// Shared secret for signing delivery bodies.
    pub secret: Option<String>,
}

impl WebhookRegistration {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn events(mut self, events: impl IntoIterator<Item = WebhookEventType>) -> Self {
        self.events = Some(events.into_iter().collect());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// A stored registration with every field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    pub url: Url,
    pub events: BTreeSet<WebhookEventType>,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub secret: Option<String>,
}

impl WebhookConfig {
    pub fn subscribes_to(&self, event_type: WebhookEventType) -> bool {
        self.events.contains(&event_type)
    }
}

// ==============================================================================
// Events and Results
// ==============================================================================

/// The JSON body POSTed to every destination.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    #[serde(rename = "eventType")]
    pub event_type: WebhookEventType,
    pub data: Value,
    /// Unix time in milliseconds.
    pub timestamp: u64,
}

impl WebhookEvent {
    pub fn new(event_type: WebhookEventType, data: Value) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            event_type,
            data,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub webhook_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
}
