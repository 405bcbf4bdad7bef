use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{header, Url};
use tracing::{debug, trace};

use crate::config::RpcConfig;
use crate::error::{CoreError, RpcError};

use super::super::protocol::{decode_response, JsonRpcRequest, RpcOutcome};
use super::super::RpcTransport;
use super::connection::{parse_connection, resolve_auth};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Sends one JSON-RPC request per HTTP POST.
///
/// Each exchange (send plus body read) is raced against `timeout`; when the
/// deadline wins the request future is dropped, which aborts the in-flight
/// HTTP request.
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    auth: Option<(String, String)>,
    timeout: Duration,
    limiter: Option<DirectRateLimiter>,
}

impl HttpTransport {
    pub fn new(config: &RpcConfig) -> Result<Self, CoreError> {
        let auth = resolve_auth(
            config.user.as_deref(),
            config.pass.as_deref(),
            config.cookie_file.as_deref(),
        )?;
        let url = parse_connection(&config.url, &["http", "https"])?;
        if config.timeout.is_zero() {
            return Err(CoreError::Config("rpc timeout must be non-zero".to_owned()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CoreError::Config(format!("build HTTP client: {e}")))?;

        let limiter = match config.requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::Config("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            url,
            auth,
            timeout: config.timeout,
            limiter,
        })
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest<'_>) -> Result<RpcOutcome, RpcError> {
        self.wait_for_rate_limit().await;

        let mut builder = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))??;

        debug!(
            rpc.id = request.id,
            rpc.method = request.method,
            %status,
            body_len = body.len(),
            "rpc response"
        );
        trace!(rpc.id = request.id, rpc.method = request.method, body = %body, "rpc response body");

        // Status is judged before the body. Bitcoin Core before 28 sends
        // error envelopes with HTTP 500; those surface as `HttpStatus`.
        if !status.is_success() {
            return Err(RpcError::HttpStatus {
                status: status.as_u16(),
            });
        }

        decode_response(&body)
    }
}
