//! Error types for the webview crate

use pane_ipc::HandlerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebviewError {
    #[error("Failed to initialize GTK: {0}")]
    GtkInit(String),

    #[error("Failed to create webview: {0}")]
    WebviewCreate(String),

    #[error("Failed to create window: {0}")]
    WindowCreate(String),

    #[error("Failed to navigate: {0}")]
    Navigate(String),

    #[error("Failed to evaluate JavaScript: {0}")]
    EvalScript(String),

    #[error("Failed to register init script: {0}")]
    InitScript(String),

    #[error("Message handler failed on message #{index}: {source}")]
    Handler {
        index: u64,
        #[source]
        source: HandlerError,
    },

    #[error("Platform not supported")]
    PlatformNotSupported,
}
