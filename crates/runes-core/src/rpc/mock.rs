use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcError;

use super::protocol::{JsonRpcRequest, RpcOutcome};
use super::RpcTransport;

/// A canned transport reply. Kept separate from `RpcError` because
/// `reqwest::Error` cannot be constructed or cloned in tests.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    ServerError { code: i64, message: String },
    Timeout,
    Status(u16),
    Garbage,
}

impl Reply {
    fn produce(&self) -> Result<RpcOutcome, RpcError> {
        match self {
            Self::Result(value) => Ok(RpcOutcome::Success(value.clone())),
            Self::ServerError { code, message } => Ok(RpcOutcome::Failure {
                code: *code,
                message: message.clone(),
            }),
            Self::Timeout => Err(RpcError::Timeout(Duration::from_millis(100))),
            Self::Status(status) => Err(RpcError::HttpStatus { status: *status }),
            Self::Garbage => Err(RpcError::InvalidResponse("decode JSON-RPC response".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

/// A transport that replays a script of replies and records every request.
/// Once the script runs out, the fallback reply (if any) repeats forever.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::new([])
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn send(&self, request: &JsonRpcRequest<'_>) -> Result<RpcOutcome, RpcError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            id: request.id,
            method: request.method.to_owned(),
            params: request.params.to_vec(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(reply) => reply.produce(),
            None => Err(RpcError::InvalidResponse("scripted transport exhausted".into())),
        }
    }
}
