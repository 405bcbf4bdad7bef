use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::CoreError;

use super::{Connector, FrameSink, FrameStream};

/// The far side of one accepted mock connection. Dropping it closes the
/// connection from the client's point of view.
pub struct ServerEnd {
    from_client: fmpsc::UnboundedReceiver<String>,
    to_client: fmpsc::UnboundedSender<String>,
}

impl ServerEnd {
    /// Next frame sent by the client.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Deliver a frame to the client.
    pub fn push(&self, text: &str) {
        self.to_client
            .unbounded_send(text.to_owned())
            .expect("client side must be connected");
    }
}

/// A connector that accepts or refuses attempts according to a script and
/// refuses once the script is exhausted. Accepted sessions are handed to the
/// test through the returned receiver.
pub struct MockConnector {
    script: Mutex<VecDeque<bool>>,
    attempts: AtomicUsize,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl MockConnector {
    pub fn scripted(
        script: impl IntoIterator<Item = bool>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted, servers) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            attempts: AtomicUsize::new(0),
            accepted,
        });
        (connector, servers)
    }

    pub fn refusing() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        Self::scripted([])
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), CoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let accept = self.script.lock().unwrap().pop_front().unwrap_or(false);
        if !accept {
            return Err(CoreError::WebSocket(format!("connection refused: {url}")));
        }

        let (client_tx, from_client) = fmpsc::unbounded::<String>();
        let (to_client, client_rx) = fmpsc::unbounded::<String>();
        let _ = self.accepted.send(ServerEnd {
            from_client,
            to_client,
        });

        let sink = client_tx.sink_map_err(|e| CoreError::WebSocket(e.to_string()));
        let stream = client_rx.map(Ok);
        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
