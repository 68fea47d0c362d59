//! Error types for bridge operations.

/// Errors that can occur while moving messages across the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Bridge channel closed")]
    ChannelClosed,

    #[error("Failed to encode script literal: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Error returned by a message handler.
///
/// Any handler failure is fatal to the run loop that delivered the message.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Unexpected message #{index}: {payload:?}")]
    Unexpected { index: u64, payload: String },

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
