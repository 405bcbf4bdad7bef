use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use reqwest::header;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::WebhookDefaults;
use crate::error::CoreError;
use crate::observe::{NoopObserver, Observer};
use crate::rpc::parse_connection;

use super::signature::{sign, SIGNATURE_HEADER};
use super::types::{
    DeliveryResult, WebhookConfig, WebhookEvent, WebhookEventType, WebhookRegistration,
};

/// Fans events out to registered HTTP destinations.
///
/// Deliveries run concurrently and are joined without short-circuiting, so
/// one failing destination never hides another's outcome. Failures are
/// reported in the returned results, never raised. Registrations with a
/// secret get an [`SIGNATURE_HEADER`] over the exact body bytes.
pub struct WebhookNotifier {
    client: reqwest::Client,
    defaults: WebhookDefaults,
    registry: RwLock<BTreeMap<String, WebhookConfig>>,
    observer: Arc<dyn Observer>,
}

struct AttemptOutcome {
    status_code: Option<u16>,
    error: Option<String>,
}

impl WebhookNotifier {
    pub fn new(defaults: WebhookDefaults) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CoreError::Config(format!("build HTTP client: {e}")))?;
        Ok(Self {
            client,
            defaults,
            registry: RwLock::new(BTreeMap::new()),
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Store `registration` under `id`, replacing any earlier registration
    /// with the same id.
    pub async fn register(
        &self,
        id: impl Into<String>,
        registration: WebhookRegistration,
    ) -> Result<(), CoreError> {
        let id = id.into();
        let config = self.resolve(registration)?;
        info!(webhook.id = %id, webhook.url = %config.url, events = config.events.len(), "webhook registered");
        self.registry.write().await.insert(id, config);
        Ok(())
    }

    /// Remove the registration under `id`. Returns whether one existed.
    pub async fn unregister(&self, id: &str) -> bool {
        let removed = self.registry.write().await.remove(id).is_some();
        if removed {
            info!(webhook.id = id, "webhook unregistered");
        }
        removed
    }

    pub async fn registration(&self, id: &str) -> Option<WebhookConfig> {
        self.registry.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.registry.read().await.is_empty()
    }

    /// Deliver `data` to every registration subscribed to `event_type`.
    ///
    /// Registrations are snapshotted up front; changes made while deliveries
    /// are in flight apply to the next event. Results come back in id order.
    pub async fn notify(&self, event_type: WebhookEventType, data: Value) -> Vec<DeliveryResult> {
        let event = WebhookEvent::new(event_type, data);
        let targets: Vec<(String, WebhookConfig)> = self
            .registry
            .read()
            .await
            .iter()
            .filter(|(_, config)| config.subscribes_to(event_type))
            .map(|(id, config)| (id.clone(), config.clone()))
            .collect();

        debug!(event = %event_type, targets = targets.len(), "webhook fan-out");
        if targets.is_empty() {
            return Vec::new();
        }

        let body = match serde_json::to_vec(&event) {
            Ok(body) => body,
            Err(err) => {
                warn!(event = %event_type, error = %err, "webhook event could not be encoded");
                let error = format!("encode event: {err}");
                return targets
                    .into_iter()
                    .map(|(id, _)| self.report(&id, None, Some(error.clone()), 0))
                    .collect();
            }
        };

        let deliveries = targets
            .iter()
            .map(|(id, config)| self.deliver(id, config, event_type, &body));
        join_all(deliveries).await
    }

    fn resolve(&self, registration: WebhookRegistration) -> Result<WebhookConfig, CoreError> {
        let url = registration
            .url
            .or_else(|| self.defaults.url.clone())
            .ok_or_else(|| CoreError::Validation("webhook url is required".to_owned()))?;
        let url = parse_connection(&url, &["http", "https"])
            .map_err(|e| CoreError::Validation(format!("invalid webhook url: {e}")))?;
        let events = registration
            .events
            .unwrap_or_else(|| self.defaults.events.clone())
            .into_iter()
            .collect();

        Ok(WebhookConfig {
            url,
            events,
            timeout: registration.timeout.unwrap_or(self.defaults.timeout),
            retry_count: registration.retry_count.unwrap_or(self.defaults.retry_count),
            retry_delay: self.defaults.retry_delay,
            secret: registration.secret,
        })
    }

    async fn deliver(
        &self,
        id: &str,
        config: &WebhookConfig,
        event_type: WebhookEventType,
        body: &[u8],
    ) -> DeliveryResult {
        let signature = match config.secret.as_deref().map(|secret| sign(secret, body)) {
            None => None,
            Some(Ok(signature)) => Some(signature),
            Some(Err(err)) => return self.report(id, None, Some(err.to_string()), 0),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = self.post_once(config, body, signature.as_deref()).await;

            match &outcome.error {
                None => debug!(
                    webhook.id = id,
                    event = %event_type,
                    status = ?outcome.status_code,
                    attempt,
                    "webhook attempt ok"
                ),
                Some(error) => warn!(
                    webhook.id = id,
                    event = %event_type,
                    status = ?outcome.status_code,
                    error = error.as_str(),
                    attempt,
                    "webhook attempt failed"
                ),
            }

            if outcome.error.is_none() || attempt > config.retry_count {
                return self.report(id, outcome.status_code, outcome.error, attempt);
            }
            tokio::time::sleep(config.retry_delay).await;
        }
    }

    fn report(
        &self,
        id: &str,
        status_code: Option<u16>,
        error: Option<String>,
        attempts: u32,
    ) -> DeliveryResult {
        let success = error.is_none();
        self.observer.webhook_delivery(id, success, status_code);
        DeliveryResult {
            webhook_id: id.to_owned(),
            success,
            status_code,
            error,
            attempts,
        }
    }

    async fn post_once(
        &self,
        config: &WebhookConfig,
        body: &[u8],
        signature: Option<&str>,
    ) -> AttemptOutcome {
        let mut request = self
            .client
            .post(config.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(config.timeout)
            .body(body.to_vec());
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => AttemptOutcome {
                status_code: Some(response.status().as_u16()),
                error: None,
            },
            Ok(response) => {
                let status = response.status().as_u16();
                AttemptOutcome {
                    status_code: Some(status),
                    error: Some(format!("HTTP {status}")),
                }
            }
            Err(err) => AttemptOutcome {
                status_code: err.status().map(|s| s.as_u16()),
                error: Some(describe_request_error(&err, config)),
            },
        }
    }
}

fn describe_request_error(err: &reqwest::Error, config: &WebhookConfig) -> String {
    if err.is_timeout() {
        return format!("request timed out after {:?}", config.timeout);
    }
    let message = err.to_string();
    if message.is_empty() {
        "Unknown error".to_owned()
    } else {
        message
    }
}
