use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::rpc::parse_connection;

use super::{Connector, FrameSink, FrameStream};

/// `ws://` / `wss://` connector backed by `tokio-tungstenite`.
///
/// Only text frames are surfaced. Ping/pong is answered by tungstenite;
/// binary frames are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), CoreError> {
        let url = parse_connection(url, &["ws", "wss"])?;
        let (socket, response) = connect_async(url.as_str())
            .await
            .map_err(|e| CoreError::WebSocket(format!("connect {url}: {e}")))?;
        debug!(ws.url = %url, status = %response.status(), "websocket handshake complete");

        let (sink, stream) = socket.split();
        let sink = sink
            .with(|text: String| async move { Ok::<_, WsError>(Message::Text(text.into())) })
            .sink_map_err(|e| CoreError::WebSocket(e.to_string()));
        let stream = stream.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "websocket close frame");
                    None
                }
                Ok(other) => {
                    trace!(kind = ?other, "ignoring non-text websocket frame");
                    None
                }
                Err(e) => Some(Err(CoreError::WebSocket(e.to_string()))),
            }
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
