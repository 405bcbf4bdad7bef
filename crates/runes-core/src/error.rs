use std::time::Duration;

use bitcoin::Txid;

// ==============================================================================
// Transport-Level Errors
// ==============================================================================

/// Failures of a single JSON-RPC exchange.
///
/// `Timeout`, `Transport` and `HttpStatus` are transport failures and are
/// eligible for retry. `Server` means the node executed the method and
/// answered with an error envelope; `InvalidResponse` means the body could
/// not be decoded. Neither of those is retried.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("RPC error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transport(_) | Self::HttpStatus { .. }
        )
    }
}

// ==============================================================================
// Caller-Facing Errors
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("transaction not found: {0}")]
    TxNotFound(Txid),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("websocket failure: {0}")]
    WebSocket(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// An error re-raised by a higher-level operation, prefixed with the
    /// operation's name (e.g. "Failed to get rune info").
    #[error("{operation}: {source}")]
    Operation {
        operation: String,
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Wrap `self` with an operation prefix.
    pub fn context(self, operation: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any operation prefixes.
    pub fn root(&self) -> &CoreError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// The JSON-RPC error code when the node answered with an error envelope.
    pub fn server_code(&self) -> Option<i64> {
        match self.root() {
            Self::Rpc(RpcError::Server { code, .. }) => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Self::Rpc(RpcError::Timeout(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_not_retryable() {
        let err = RpcError::Server {
            code: -5,
            message: "not found".to_owned(),
        };
        assert!(!err.is_retryable());
        assert!(RpcError::HttpStatus { status: 503 }.is_retryable());
        assert!(RpcError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!RpcError::InvalidResponse("garbage".to_owned()).is_retryable());
    }

    #[test]
    fn operation_prefix_keeps_server_code() {
        let err = CoreError::from(RpcError::Server {
            code: -32601,
            message: "Method not found".to_owned(),
        })
        .context("Failed to submit batch");

        assert_eq!(
            err.to_string(),
            "Failed to submit batch: RPC error -32601: Method not found"
        );
        assert_eq!(err.server_code(), Some(-32601));
    }

    #[test]
    fn root_unwraps_nested_operations() {
        let err = CoreError::Validation("empty rune name".to_owned())
            .context("inner")
            .context("outer");
        assert!(matches!(err.root(), CoreError::Validation(_)));
        assert_eq!(err.server_code(), None);
    }
}
