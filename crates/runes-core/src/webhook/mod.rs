//! Webhook fan-out.

mod notifier;
mod signature;
mod types;

pub use notifier::WebhookNotifier;
pub use signature::{sign, SIGNATURE_HEADER};
pub use types::{
    DeliveryResult, WebhookConfig, WebhookEvent, WebhookEventType, WebhookRegistration,
};
