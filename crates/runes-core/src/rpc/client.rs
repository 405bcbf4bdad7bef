use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::config::RpcConfig;
use crate::error::CoreError;
use crate::observe::{NoopObserver, Observer};

use super::http_adapter::HttpTransport;
use super::protocol::{JsonRpcRequest, RpcOutcome};
use super::RpcTransport;

/// Message used when a call site expects a result and the node returned none.
pub const INVALID_RESPONSE: &str = "Invalid response from RPC";

/// JSON-RPC client with bounded retry.
///
/// Calls are not pipelined: each `call` issues one request at a time and
/// waits for its response. Concurrent callers sharing a client may complete
/// in any order.
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    max_retries: u32,
    retry_delay: Duration,
    next_id: AtomicU64,
    observer: Arc<dyn Observer>,
}

impl RpcClient {
    /// Build a client over HTTP from `config`.
    pub fn new(config: &RpcConfig) -> Result<Self, CoreError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Build a client over any transport; only the retry settings of
    /// `config` are used.
    pub fn with_transport(transport: Arc<dyn RpcTransport>, config: &RpcConfig) -> Self {
        Self {
            transport,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            next_id: AtomicU64::new(initial_request_id()),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call `method` and return its raw `result` (`Null` when absent).
    ///
    /// Transport failures are retried up to `max_retries` more times with a
    /// fixed delay; the last failure is returned. Node-side errors are
    /// returned immediately.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, CoreError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let id = self.next_request_id();
            debug!(
                rpc.id = id,
                rpc.method = method,
                rpc.params = params.len(),
                attempt,
                "rpc call"
            );

            let started = Instant::now();
            let request = JsonRpcRequest::new(id, method, &params);
            let result = self
                .transport
                .send(&request)
                .await
                .and_then(RpcOutcome::into_result);
            let elapsed = started.elapsed();

            let err = match result {
                Ok(value) => {
                    self.observer.rpc_attempt(method, attempt, elapsed, Ok(()));
                    return Ok(value);
                }
                Err(err) => err,
            };
            self.observer.rpc_attempt(method, attempt, elapsed, Err(&err));

            let retry = err.is_retryable() && attempt <= self.max_retries;
            warn!(
                rpc.id = id,
                rpc.method = method,
                attempt,
                retry,
                error = %err,
                "rpc call failed"
            );
            if !retry {
                return Err(err.into());
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Call `method` and decode a required result into `R`.
    ///
    /// This is the single helper every typed call site goes through. An
    /// absent or `null` result is [`INVALID_RESPONSE`]; `false` and `0` are
    /// legitimate results. Failures are prefixed with
    /// `"Failed to {operation}"`.
    pub async fn invoke<R: DeserializeOwned>(
        &self,
        operation: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<R, CoreError> {
        let outcome = match self.call(method, params).await {
            Ok(value) => decode_required(value),
            Err(err) => Err(err),
        };
        outcome.map_err(|err| {
            error!(operation, rpc.method = method, error = %err, "rpc operation failed");
            err.context(format!("Failed to {operation}"))
        })
    }
}

fn decode_required<R: DeserializeOwned>(value: Value) -> Result<R, CoreError> {
    if value.is_null() {
        return Err(CoreError::InvalidResponse(INVALID_RESPONSE.to_owned()));
    }
    serde_json::from_value(value)
        .map_err(|e| CoreError::InvalidResponse(format!("{INVALID_RESPONSE}: {e}")))
}

fn initial_request_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::RpcError;
    use crate::rpc::mock::{Reply, ScriptedTransport};

    fn client(transport: &Arc<ScriptedTransport>, max_retries: u32) -> RpcClient {
        let config = RpcConfig::default().with_retries(max_retries, Duration::from_millis(10));
        RpcClient::with_transport(transport.clone(), &config)
    }

    #[derive(Default)]
    struct RecordingObserver {
        attempts: Mutex<Vec<(String, u32, bool)>>,
    }

    impl Observer for RecordingObserver {
        fn rpc_attempt(
            &self,
            method: &str,
            attempt: u32,
            _elapsed: Duration,
            outcome: Result<(), &RpcError>,
        ) {
            self.attempts
                .lock()
                .unwrap()
                .push((method.to_owned(), attempt, outcome.is_ok()));
        }
    }

    #[tokio::test]
    async fn returns_result_untransformed() {
        let transport = Arc::new(ScriptedTransport::new([Reply::Result(
            json!({"txid": "abc123", "confirmations": 6}),
        )]));
        let rpc = client(&transport, 3);

        let result = rpc
            .call("gettransaction", vec![json!("abc123")])
            .await
            .expect("call must succeed");
        assert_eq!(result, json!({"txid": "abc123", "confirmations": 6}));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "gettransaction");
        assert_eq!(requests[0].params, vec![json!("abc123")]);
    }

    #[tokio::test]
    async fn server_error_carries_code_and_message_without_retry() {
        let transport = Arc::new(ScriptedTransport::always(Reply::ServerError {
            code: -8,
            message: "Invalid parameter".into(),
        }));
        let rpc = client(&transport, 3);

        let err = rpc
            .call("getrune", vec![json!("UNCOMMON•GOODS")])
            .await
            .expect_err("server error must surface");
        assert_eq!(err.server_code(), Some(-8));
        assert!(err.to_string().contains("Invalid parameter"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transport_failures_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new([
            Reply::Status(503),
            Reply::Timeout,
            Reply::Status(502),
            Reply::Result(json!(840000)),
        ]));
        let rpc = client(&transport, 3);

        let result = rpc.call("getblockcount", Vec::new()).await.expect("must recover");
        assert_eq!(result, json!(840000));
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries_with_last_error() {
        let transport = Arc::new(ScriptedTransport::new([
            Reply::Timeout,
            Reply::Timeout,
            Reply::Status(500),
        ]));
        let rpc = client(&transport, 2);

        let err = rpc
            .call("getblockcount", Vec::new())
            .await
            .expect_err("must give up");
        assert_eq!(transport.call_count(), 3);
        assert!(matches!(
            err,
            CoreError::Rpc(RpcError::HttpStatus { status: 500 })
        ));
        assert_eq!(err.to_string(), "HTTP status 500");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_wait_the_fixed_delay() {
        let transport = Arc::new(ScriptedTransport::always(Reply::Status(503)));
        let config = RpcConfig::default().with_retries(3, Duration::from_secs(2));
        let rpc = RpcClient::with_transport(transport.clone(), &config);

        let started = Instant::now();
        let _ = rpc.call("getblockcount", Vec::new()).await;
        assert_eq!(transport.call_count(), 4);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let transport = Arc::new(ScriptedTransport::always(Reply::Timeout));
        let rpc = client(&transport, 0);

        let err = rpc.call("getblockcount", Vec::new()).await.expect_err("must fail");
        assert!(err.is_timeout());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::always(Reply::Garbage));
        let rpc = client(&transport, 3);

        let err = rpc.call("getblockcount", Vec::new()).await.expect_err("must fail");
        assert!(matches!(err, CoreError::Rpc(RpcError::InvalidResponse(_))));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn request_ids_are_unique_per_attempt() {
        let transport = Arc::new(ScriptedTransport::new([
            Reply::Status(503),
            Reply::Result(json!(1)),
            Reply::Result(json!(2)),
        ]));
        let rpc = client(&transport, 1);

        rpc.call("a", Vec::new()).await.expect("first call must succeed");
        rpc.call("b", Vec::new()).await.expect("second call must succeed");

        let ids: Vec<u64> = transport.requests().iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_every_attempt() {
        let transport = Arc::new(ScriptedTransport::new([
            Reply::Status(503),
            Reply::Result(json!(true)),
        ]));
        let observer = Arc::new(RecordingObserver::default());
        let rpc = client(&transport, 2).with_observer(observer.clone());

        rpc.call("ping", Vec::new()).await.expect("must succeed");
        assert_eq!(
            *observer.attempts.lock().unwrap(),
            vec![("ping".to_owned(), 1, false), ("ping".to_owned(), 2, true)]
        );
    }

    #[tokio::test]
    async fn invoke_rejects_null_but_accepts_false_and_zero() {
        let transport = Arc::new(ScriptedTransport::new([
            Reply::Result(Value::Null),
            Reply::Result(json!(false)),
            Reply::Result(json!(0)),
        ]));
        let rpc = client(&transport, 0);

        let err = rpc
            .invoke::<bool>("check address", "validateaddress", vec![json!("bc1q")])
            .await
            .expect_err("null result must be rejected");
        assert_eq!(
            err.to_string(),
            "Failed to check address: Invalid response from RPC"
        );

        let valid: bool = rpc
            .invoke("check address", "validateaddress", vec![json!("bc1q")])
            .await
            .expect("false is a valid result");
        assert!(!valid);

        let count: u64 = rpc
            .invoke("get block count", "getblockcount", Vec::new())
            .await
            .expect("zero is a valid result");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn invoke_prefixes_server_errors() {
        let transport = Arc::new(ScriptedTransport::always(Reply::ServerError {
            code: -32601,
            message: "Method not found".into(),
        }));
        let rpc = client(&transport, 0);

        let err = rpc
            .invoke::<Value>("submit batch", "submitbatch", vec![json!([])])
            .await
            .expect_err("must fail");
        assert!(err.to_string().starts_with("Failed to submit batch: "));
        assert_eq!(err.server_code(), Some(-32601));
    }
}
