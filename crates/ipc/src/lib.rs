//! Message bridge for Pane
//!
//! Hosted script talks to native code through a single global function,
//! `window.external.invoke(string)`. The bridge shim installed as the first
//! init script maps that call onto the renderer's native post channel, and
//! the native side forwards each payload unchanged, in call order, to the
//! engine's message handler.
//!
//! The opposite direction is plain script evaluation; [`js_string_literal`]
//! helps build such scripts without hand-escaping.

mod error;

pub use error::{BridgeError, HandlerError};

use std::fmt;

use tokio::sync::mpsc;

/// Script installed before any page script on every load.
///
/// `window.ipc.postMessage` is the channel the renderer exposes to native
/// code; the shim keeps any existing `window.external` members intact.
pub const BRIDGE_SHIM: &str = r#"(function () {
  var post = function (payload) {
    window.ipc.postMessage(String(payload));
  };
  var external = window.external || {};
  try {
    external.invoke = post;
    window.external = external;
  } catch (_) {
    Object.defineProperty(window, "external", {
      value: { invoke: post },
      configurable: true,
    });
  }
})();"#;

/// A message sent from hosted script to native code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Zero-based arrival position on this bridge
    pub index: u64,
    /// Payload exactly as passed to `window.external.invoke`
    pub payload: String,
}

impl Message {
    pub fn as_str(&self) -> &str {
        &self.payload
    }
}

impl AsRef<str> for Message {
    fn as_ref(&self) -> &str {
        &self.payload
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload)
    }
}

/// Create a connected bridge pair.
///
/// The sender side is cloned into renderer callbacks; the receiver is owned
/// by the engine and drained on the UI thread.
pub fn bridge() -> (BridgeSender, BridgeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        BridgeSender { tx },
        BridgeReceiver {
            rx,
            next_index: 0,
        },
    )
}

/// Posting half of the bridge
#[derive(Debug, Clone)]
pub struct BridgeSender {
    tx: mpsc::UnboundedSender<String>,
}

impl BridgeSender {
    /// Forward a script payload to native code
    pub fn post(&self, payload: impl Into<String>) -> Result<(), BridgeError> {
        self.tx
            .send(payload.into())
            .map_err(|_| BridgeError::ChannelClosed)
    }
}

/// Receiving half of the bridge; assigns arrival indices
#[derive(Debug)]
pub struct BridgeReceiver {
    rx: mpsc::UnboundedReceiver<String>,
    next_index: u64,
}

impl BridgeReceiver {
    /// Take the next message if one has arrived (non-blocking)
    pub fn try_recv(&mut self) -> Option<Message> {
        let payload = self.rx.try_recv().ok()?;
        let index = self.next_index;
        self.next_index += 1;
        tracing::trace!(index, len = payload.len(), "bridge message received");
        Some(Message { index, payload })
    }

    /// Number of messages handed out so far
    pub fn delivered(&self) -> u64 {
        self.next_index
    }
}

/// Quote `value` as a JavaScript string literal.
///
/// JSON string syntax is a subset of JS string syntax, apart from the two
/// line separators which older engines reject inside literals.
pub fn js_string_literal(value: &str) -> Result<String, BridgeError> {
    let quoted = serde_json::to_string(value)?;
    Ok(quoted
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}
