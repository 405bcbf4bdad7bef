//! Realtime notifications over WebSocket.
//!
//! [`RealtimeClient`] keeps one connection alive and re-establishes it after
//! remote closes according to a [`ReconnectPolicy`]. The socket itself is
//! produced by a [`Connector`]; [`WsConnector`] is the `tokio-tungstenite`
//! implementation.

mod manager;
#[cfg(test)]
pub mod mock;
mod policy;
mod socket;
mod state;

pub use manager::{Listener, RealtimeClient, WILDCARD};
pub use policy::{FixedInterval, ReconnectPolicy};
pub use socket::WsConnector;
pub use state::ConnectionState;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

use crate::error::CoreError;

/// Outbound half of a connection: JSON text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = CoreError> + Send>>;

/// Inbound half of a connection: text frames until the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, CoreError>> + Send>>;

/// Opens one duplex text connection.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), CoreError>;
}
