//! JSON-RPC 2.0 envelopes.

use serde_json::Value;

use crate::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// One outbound call. Params are borrowed so retries re-send the same
/// slice without cloning.
#[derive(Debug, serde::Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a [Value],
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// A decoded response: exactly one of a result payload or an error envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    Success(Value),
    Failure { code: i64, message: String },
}

impl RpcOutcome {
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure { code, message } => Err(RpcError::Server { code, message }),
        }
    }
}

/// Decode a response body into an [`RpcOutcome`].
///
/// A missing `result` with no `error` is a success carrying `null`; void
/// methods answer that way.
pub fn decode_response(body: &str) -> Result<RpcOutcome, RpcError> {
    let decoded: JsonRpcResponse = serde_json::from_str(body).map_err(|e| {
        RpcError::InvalidResponse(format!("decode JSON-RPC response: {e}; body={body}"))
    })?;

    match decoded.error {
        Some(err) => parse_jsonrpc_error(err),
        None => Ok(RpcOutcome::Success(decoded.result.unwrap_or(Value::Null))),
    }
}

/// JSON-RPC 2.0 defines errors as `{"code": <int>, "message": <string>}`.
/// Anything else is reported as `InvalidResponse` with the raw JSON.
fn parse_jsonrpc_error(err: Value) -> Result<RpcOutcome, RpcError> {
    #[derive(serde::Deserialize)]
    struct JsonRpcError {
        code: i64,
        message: String,
    }

    match serde_json::from_value::<JsonRpcError>(err.clone()) {
        Ok(parsed) => Ok(RpcOutcome::Failure {
            code: parsed.code,
            message: parsed.message,
        }),
        Err(_) => Err(RpcError::InvalidResponse(format!(
            "non-standard JSON-RPC error: {err}"
        ))),
    }
}
