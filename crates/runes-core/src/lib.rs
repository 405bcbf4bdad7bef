pub mod config;
pub mod error;
pub mod observe;
pub mod realtime;
pub mod rpc;
pub mod webhook;

pub use config::{RealtimeConfig, RpcConfig, WebhookDefaults};
pub use error::{CoreError, RpcError};
pub use observe::{NoopObserver, Observer, TracingObserver};
pub use realtime::{ConnectionState, RealtimeClient};
pub use rpc::{NodeRpc, RpcClient, RunesRpc};
pub use webhook::{DeliveryResult, WebhookEventType, WebhookNotifier, WebhookRegistration};
