//! Renderer backend abstraction
//!
//! A backend owns the native window and web renderer. Every method is called
//! on the UI thread only.

use std::ffi::c_void;
use std::ptr::NonNull;

use pane_config::SizeHint;
use pane_ipc::BridgeSender;

use crate::{WebviewError, WebviewHandle};

/// Trait for renderers the engine can drive
pub trait Backend {
    /// Load a URL or inline (`data:`) content
    fn navigate(&mut self, url: &str) -> Result<(), WebviewError>;

    /// Queue script for asynchronous execution in the current page
    fn eval(&mut self, script: &str) -> Result<(), WebviewError>;

    /// Register script to run before page scripts on every later load
    fn init(&mut self, script: &str) -> Result<(), WebviewError>;

    fn set_title(&mut self, title: &str);

    fn set_size(&mut self, width: u32, height: u32, hint: SizeHint);

    /// Process pending native events without blocking.
    ///
    /// Returns `true` when anything was processed.
    fn pump(&mut self) -> Result<bool, WebviewError>;

    /// Native toplevel window, if the backend has one
    fn window(&self) -> Option<NonNull<c_void>> {
        None
    }
}

/// What a backend gets from the engine at construction
#[derive(Debug, Clone)]
pub struct BackendContext {
    /// Where script messages go
    pub bridge: BridgeSender,
    /// Used to request termination when the user closes the window
    pub handle: WebviewHandle,
}

/// Native toplevel to host the renderer in (`GtkWindow*` on Linux)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentWindow(NonNull<c_void>);

impl ParentWindow {
    /// Wrap a raw native window pointer; `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live toplevel of the platform's
    /// toolkit for as long as the engine using it exists.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}
