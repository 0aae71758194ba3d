//! Error types for the RPC gateway.

use thiserror::Error;

/// Errors raised by RPC gateway operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The HTTP exchange failed: network error, timeout or non-2xx status,
    /// after retries were exhausted.
    #[error("Transport error during {operation}: {message}")]
    Transport {
        /// The gateway operation that failed.
        operation: &'static str,
        /// What went wrong.
        message: String,
    },

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error during {operation}: {message} (code {code})")]
    Protocol {
        /// The gateway operation that failed.
        operation: &'static str,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// A block range exceeds the hard limit of the requested call.
    #[error("Block range of {requested} blocks exceeds the limit of {max}")]
    RangeTooLarge {
        /// Blocks requested.
        requested: u64,
        /// Blocks allowed.
        max: u64,
    },

    /// A block range whose end precedes its start.
    #[error("Invalid block range {from}..={to}")]
    InvalidRange {
        /// First block.
        from: u64,
        /// Last block.
        to: u64,
    },

    /// A response could not be decoded.
    #[error("Failed to decode {operation} response: {message}")]
    Decode {
        /// The gateway operation that failed.
        operation: &'static str,
        /// What could not be decoded.
        message: String,
    },
}

impl RpcError {
    /// The name of the gateway operation the error came from, when known.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            RpcError::Transport { operation, .. }
            | RpcError::Protocol { operation, .. }
            | RpcError::Decode { operation, .. } => Some(operation),
            RpcError::RangeTooLarge { .. } | RpcError::InvalidRange { .. } => None,
        }
    }

    pub(crate) fn decode(operation: &'static str, message: impl ToString) -> Self {
        RpcError::Decode { operation, message: message.to_string() }
    }
}
