//! Embeddable webview for Pane
//!
//! [`BrowserEngine`] owns a native window hosting a web renderer and runs
//! the blocking UI loop. Each loop iteration:
//! - drains the dispatch queue,
//! - pumps native events,
//! - drains the queue again and delivers script messages to the handler,
//! - parks briefly on the queue's condvar when nothing happened.
//!
//! Other threads reach a running engine through [`WebviewHandle`], which
//! can only dispatch closures and request termination. Everything that
//! touches the renderer goes through [`Webview`], which exists on the UI
//! thread alone.

mod backend;
mod dispatch;
mod error;
mod handler;
mod headless;

#[cfg(target_os = "linux")]
mod platform_linux;

pub use backend::{Backend, BackendContext, ParentWindow};
pub use dispatch::{Job, WebviewHandle};
pub use error::WebviewError;
pub use handler::{IgnoreMessages, MessageHandler};
pub use headless::{BlankPage, HeadlessBackend, Journal, Page, PageEvent, Recorded};
pub use pane_config::{BackendKind, SizeHint, WindowConfig};
pub use pane_ipc::{HandlerError, Message};

#[cfg(target_os = "linux")]
pub use platform_linux::NativeBackend;

use std::ffi::c_void;
use std::ptr::NonNull;
use std::time::Duration;

use pane_ipc::BridgeReceiver;

/// Longest the idle loop parks before pumping native events again
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Options for [`BrowserEngine::new`]
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub window: WindowConfig,
    pub backend: BackendKind,
    pub parent: Option<ParentWindow>,
}

impl EngineOptions {
    /// Window defaults, backend from `PANE_BACKEND`
    pub fn new(debug: bool, parent: Option<ParentWindow>) -> Self {
        Self {
            window: WindowConfig::default().with_debug(debug),
            backend: BackendKind::from_env(),
            parent,
        }
    }
}

/// UI-thread view of a browser engine.
///
/// Dispatched closures and message handlers receive `&mut Webview`.
pub struct Webview {
    backend: Box<dyn Backend>,
    handle: WebviewHandle,
}

impl Webview {
    /// Load a URL or inline `data:` content
    pub fn navigate(&mut self, url: &str) -> Result<(), WebviewError> {
        tracing::debug!(%url, "navigate");
        self.backend.navigate(url)
    }

    /// Run script in the current page; the result is not observed
    pub fn eval(&mut self, script: &str) -> Result<(), WebviewError> {
        self.backend.eval(script)
    }

    /// Run script on every later page load, before any page script
    pub fn init(&mut self, script: &str) -> Result<(), WebviewError> {
        self.backend.init(script)
    }

    pub fn set_title(&mut self, title: &str) {
        self.backend.set_title(title);
    }

    pub fn set_size(&mut self, width: u32, height: u32, hint: SizeHint) {
        self.backend.set_size(width, height, hint);
    }

    /// Native window handle (`GtkWindow*` on Linux), if any
    pub fn window(&self) -> Option<NonNull<c_void>> {
        self.backend.window()
    }

    /// Queue a closure for a later loop iteration
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce(&mut Webview) + Send + 'static,
    {
        self.handle.dispatch(job);
    }

    pub fn terminate(&self) {
        self.handle.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.handle.is_terminated()
    }

    /// Cloneable handle for other threads
    pub fn handle(&self) -> WebviewHandle {
        self.handle.clone()
    }
}

/// Native window plus web renderer, driven by a blocking run loop
pub struct BrowserEngine {
    webview: Webview,
    inbox: BridgeReceiver,
    handler: Box<dyn MessageHandler>,
}

impl BrowserEngine {
    /// Create an engine with the backend named in `options`
    pub fn new(
        options: EngineOptions,
        handler: impl MessageHandler + 'static,
    ) -> Result<Self, WebviewError> {
        let EngineOptions {
            window,
            backend,
            parent,
        } = options;
        match backend {
            BackendKind::Headless => Self::with_backend(
                &window,
                |context| Ok(HeadlessBackend::new(context, BlankPage)),
                handler,
            ),
            BackendKind::Native => Self::native(&window, parent, handler),
        }
    }

    /// Create an engine on a caller-built backend
    pub fn with_backend<B, F>(
        window: &WindowConfig,
        build: F,
        handler: impl MessageHandler + 'static,
    ) -> Result<Self, WebviewError>
    where
        B: Backend + 'static,
        F: FnOnce(BackendContext) -> Result<B, WebviewError>,
    {
        let (bridge, inbox) = pane_ipc::bridge();
        let handle = WebviewHandle::new();
        let backend = build(BackendContext {
            bridge,
            handle: handle.clone(),
        })?;

        let mut webview = Webview {
            backend: Box::new(backend),
            handle,
        };
        webview.init(pane_ipc::BRIDGE_SHIM)?;
        webview.set_title(&window.title);
        webview.set_size(window.width, window.height, window.hint);

        Ok(Self {
            webview,
            inbox,
            handler: Box::new(handler),
        })
    }

    /// Create a windowless engine around a scripted page.
    ///
    /// The returned journal records every renderer call.
    pub fn headless(
        page: impl Page + 'static,
        handler: impl MessageHandler + 'static,
    ) -> Result<(Self, Journal), WebviewError> {
        let journal = Journal::default();
        let recorder = journal.clone();
        let engine = Self::with_backend(
            &WindowConfig::default(),
            move |context| Ok(HeadlessBackend::new(context, page).with_journal(recorder)),
            handler,
        )?;
        Ok((engine, journal))
    }

    #[cfg(target_os = "linux")]
    fn native(
        window: &WindowConfig,
        parent: Option<ParentWindow>,
        handler: impl MessageHandler + 'static,
    ) -> Result<Self, WebviewError> {
        Self::with_backend(
            window,
            |context| NativeBackend::new(window, parent, context),
            handler,
        )
    }

    #[cfg(not(target_os = "linux"))]
    fn native(
        _window: &WindowConfig,
        _parent: Option<ParentWindow>,
        _handler: impl MessageHandler + 'static,
    ) -> Result<Self, WebviewError> {
        Err(WebviewError::PlatformNotSupported)
    }

    /// Pump the UI loop on the calling thread until termination.
    ///
    /// Returns at once if the engine was already terminated. A handler error
    /// terminates the engine and is returned here.
    pub fn run(&mut self) -> Result<(), WebviewError> {
        if self.is_terminated() {
            tracing::debug!("run() after termination; not re-entering the loop");
            return Ok(());
        }
        tracing::debug!("entering UI loop");

        loop {
            let mut busy = self.drain_queue();
            if self.is_terminated() {
                break;
            }

            busy |= self.webview.backend.pump()?;
            busy |= self.drain_queue();
            busy |= self.deliver_messages()?;
            if self.is_terminated() {
                break;
            }

            if !busy {
                self.webview.handle.shared().wait_idle(POLL_INTERVAL);
            }
        }

        // Another thread may have queued work just before it terminated.
        self.drain_queue();
        tracing::debug!(delivered = self.inbox.delivered(), "UI loop exited");
        Ok(())
    }

    /// Run every closure queued so far; returns whether any ran
    fn drain_queue(&mut self) -> bool {
        let batch = self.webview.handle.shared().take_batch();
        let ran = !batch.is_empty();
        for job in batch {
            job(&mut self.webview);
        }
        ran
    }

    fn deliver_messages(&mut self) -> Result<bool, WebviewError> {
        let mut delivered = false;
        while !self.is_terminated() {
            let Some(message) = self.inbox.try_recv() else {
                break;
            };
            delivered = true;
            if let Err(source) = self.handler.on_message(&mut self.webview, &message) {
                tracing::error!(index = message.index, error = %source, "message handler failed");
                self.webview.terminate();
                return Err(WebviewError::Handler {
                    index: message.index,
                    source,
                });
            }
        }
        Ok(delivered)
    }

    pub fn navigate(&mut self, url: &str) -> Result<(), WebviewError> {
        self.webview.navigate(url)
    }

    pub fn eval(&mut self, script: &str) -> Result<(), WebviewError> {
        self.webview.eval(script)
    }

    pub fn init(&mut self, script: &str) -> Result<(), WebviewError> {
        self.webview.init(script)
    }

    pub fn set_title(&mut self, title: &str) {
        self.webview.set_title(title);
    }

    pub fn set_size(&mut self, width: u32, height: u32, hint: SizeHint) {
        self.webview.set_size(width, height, hint);
    }

    pub fn window(&self) -> Option<NonNull<c_void>> {
        self.webview.window()
    }

    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce(&mut Webview) + Send + 'static,
    {
        self.webview.dispatch(job);
    }

    pub fn terminate(&self) {
        self.webview.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.webview.is_terminated()
    }

    pub fn handle(&self) -> WebviewHandle {
        self.webview.handle()
    }

    /// UI-thread view, for setup before `run()`
    pub fn webview(&mut self) -> &mut Webview {
        &mut self.webview
    }
}

impl Drop for BrowserEngine {
    fn drop(&mut self) {
        let discarded = self.webview.handle.shared().take_batch().len();
        if discarded > 0 {
            tracing::debug!(discarded, "dropping closures that never ran");
        }
    }
}
