use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RealtimeConfig;
use crate::error::CoreError;
use crate::observe::Observer;

use super::policy::{FixedInterval, ReconnectPolicy};
use super::socket::WsConnector;
use super::state::ConnectionState;
use super::{Connector, FrameSink, FrameStream};

/// Listener key that receives every inbound message.
pub const WILDCARD: &str = "*";

/// Callback for inbound messages. Runs on the connection's driver task, so
/// it should hand work off rather than block.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Keeps one realtime connection alive.
///
/// A single driver task owns the socket and the reconnect timer, so there is
/// never more than one live socket or one pending reconnect. Closes the
/// caller did not request consume the [`ReconnectPolicy`] budget; a
/// successful open refills it. `close()` stops the driver without
/// reconnecting.
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn ReconnectPolicy>,
    observer: Arc<dyn Observer>,
    state_tx: watch::Sender<ConnectionState>,
    attempts: AtomicU32,
    session: Mutex<Session>,
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

#[derive(Default)]
struct Session {
    running: bool,
    outbound: Option<mpsc::UnboundedSender<String>>,
    shutdown: Option<Arc<Notify>>,
    driver: Option<JoinHandle<()>>,
}

impl RealtimeClient {
    /// WebSocket client with a fixed-interval reconnect policy from `config`.
    pub fn new(config: &RealtimeConfig, observer: Arc<dyn Observer>) -> Self {
        Self::with_parts(
            config.url.clone(),
            Arc::new(WsConnector),
            Arc::new(FixedInterval {
                interval: config.reconnect_interval,
                max_attempts: config.max_reconnect_attempts,
            }),
            observer,
        )
    }

    pub fn with_parts(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        policy: Arc<dyn ReconnectPolicy>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                connector,
                policy,
                observer,
                state_tx,
                attempts: AtomicU32::new(0),
                session: Mutex::new(Session::default()),
                listeners: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Reconnect attempts made since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Register `listener` for inbound messages whose `type` field equals
    /// `message_type`, or for every message with [`WILDCARD`].
    pub async fn on(&self, message_type: impl Into<String>, listener: Listener) {
        self.inner
            .listeners
            .write()
            .await
            .entry(message_type.into())
            .or_default()
            .push(listener);
    }

    /// Start the connection. A no-op while a session is already running;
    /// otherwise the reconnect budget is reset.
    pub async fn connect(&self) {
        let mut session = self.inner.session.lock().await;
        if session.running {
            debug!(ws.url = %self.inner.url, "realtime connection already running");
            return;
        }

        self.inner.attempts.store(0, Ordering::SeqCst);
        let shutdown = Arc::new(Notify::new());
        session.running = true;
        session.outbound = None;
        session.shutdown = Some(shutdown.clone());

        let inner = self.inner.clone();
        session.driver = Some(tokio::spawn(async move { inner.drive(shutdown).await }));
    }

    /// Serialize `payload` and send it as one text frame.
    ///
    /// Returns `Ok(false)` without sending when the connection is not open;
    /// nothing is queued.
    pub async fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<bool, CoreError> {
        let text = serde_json::to_string(payload)?;
        let session = self.inner.session.lock().await;
        match (&session.outbound, self.state()) {
            (Some(outbound), ConnectionState::Open) => Ok(outbound.send(text).is_ok()),
            (_, state) => {
                debug!(ws.state = %state, "realtime connection not open; message dropped");
                Ok(false)
            }
        }
    }

    /// Close the connection and cancel any pending reconnect. Returns once
    /// the driver has stopped.
    pub async fn close(&self) {
        let (shutdown, driver) = {
            let mut session = self.inner.session.lock().await;
            (session.shutdown.clone(), session.driver.take())
        };
        let Some(shutdown) = shutdown else {
            return;
        };

        shutdown.notify_one();
        if let Some(driver) = driver {
            if let Err(err) = driver.await {
                warn!(error = %err, "realtime driver task ended abnormally");
            }
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Ok(mut session) = self.inner.session.try_lock() {
            if let Some(driver) = session.driver.take() {
                driver.abort();
            }
        }
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let attempts = self.attempts.load(Ordering::SeqCst);
        debug!(ws.state = %state, ws.attempts = attempts, "realtime state change");
        self.state_tx.send_replace(state);
        self.observer.connection_state(state, attempts);
    }

    async fn drive(self: Arc<Self>, shutdown: Arc<Notify>) {
        loop {
            self.set_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                connected = self.connector.connect(&self.url) => connected,
                _ = shutdown.notified() => break,
            };

            match connected {
                Ok((sink, stream)) => {
                    if self.run_session(sink, stream, &shutdown).await {
                        break;
                    }
                    info!(ws.url = %self.url, "realtime connection closed by peer");
                }
                Err(err) => {
                    warn!(ws.url = %self.url, error = %err, "realtime connection attempt failed");
                }
            }

            // The give-up decision and clearing `running` share one lock hold.
            let mut session = self.session.lock().await;
            let attempt = self.attempts.load(Ordering::SeqCst) + 1;
            let Some(delay) = self.policy.next_delay(attempt) else {
                warn!(
                    ws.url = %self.url,
                    ws.attempts = attempt - 1,
                    "reconnect attempts exhausted; staying disconnected"
                );
                self.finish(&mut session);
                return;
            };
            self.attempts.store(attempt, Ordering::SeqCst);
            self.set_state(ConnectionState::ReconnectPending);
            drop(session);
            info!(
                ws.url = %self.url,
                ws.attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "scheduling reconnect"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.notified() => break,
            }
        }

        let mut session = self.session.lock().await;
        self.finish(&mut session);
    }

    fn finish(&self, session: &mut Session) {
        session.running = false;
        session.outbound = None;
        session.shutdown = None;
        self.set_state(ConnectionState::Disconnected);
    }

    /// Pump one open connection. Returns `true` when the caller closed it.
    async fn run_session(
        &self,
        mut sink: FrameSink,
        mut stream: FrameStream,
        shutdown: &Notify,
    ) -> bool {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        self.session.lock().await.outbound = Some(outbound_tx);
        self.attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Open);

        let closed_by_caller = loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(text)) => self.dispatch(&text).await,
                    Some(Err(err)) => {
                        warn!(ws.url = %self.url, error = %err, "realtime socket error");
                        break false;
                    }
                    None => break false,
                },
                Some(text) = outbound_rx.recv() => {
                    if let Err(err) = sink.send(text).await {
                        warn!(ws.url = %self.url, error = %err, "realtime send failed");
                    }
                }
                _ = shutdown.notified() => break true,
            }
        };

        self.session.lock().await.outbound = None;
        if closed_by_caller {
            self.set_state(ConnectionState::Closing);
            if let Err(err) = sink.close().await {
                debug!(error = %err, "realtime close handshake failed");
            }
        }
        closed_by_caller
    }

    async fn dispatch(&self, text: &str) {
        let message: Value = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, len = text.len(), "dropping non-JSON realtime message");
                return;
            }
        };
        let message_type = message
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let listeners = self.listeners.read().await;
        let typed = listeners.get(message_type).filter(|_| message_type != WILDCARD);
        for listener in typed.into_iter().chain(listeners.get(WILDCARD)).flatten() {
            listener(&message);
        }
    }
}
