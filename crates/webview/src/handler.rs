//! Message handler capability injected into the engine

use pane_ipc::{HandlerError, Message};

use crate::Webview;

/// Receives every message posted by hosted script, in arrival order.
///
/// The default implementation ignores messages. Returning an error stops
/// the run loop; `run()` then reports it as [`crate::WebviewError::Handler`].
pub trait MessageHandler {
    fn on_message(&mut self, webview: &mut Webview, message: &Message) -> Result<(), HandlerError> {
        let _ = (webview, message);
        Ok(())
    }
}

impl<F> MessageHandler for F
where
    F: FnMut(&mut Webview, &Message) -> Result<(), HandlerError>,
{
    fn on_message(&mut self, webview: &mut Webview, message: &Message) -> Result<(), HandlerError> {
        self(webview, message)
    }
}

/// Handler that drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreMessages;

impl MessageHandler for IgnoreMessages {}
