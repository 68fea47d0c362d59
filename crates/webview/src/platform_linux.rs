//! Linux-specific webview implementation using GTK and WebKitGTK

use std::ffi::c_void;
use std::ptr::NonNull;

use gtk::gdk;
use gtk::glib;
use gtk::glib::object::ObjectType;
use gtk::glib::translate::from_glib_none;
use gtk::prelude::*;
use pane_config::{SizeHint, WindowConfig};
use webkit2gtk::{
    UserContentInjectedFrames, UserContentManagerExt, UserScript, UserScriptInjectionTime,
    WebViewExt,
};
use wry::{WebViewBuilderExtUnix, WebViewExtUnix};

use crate::backend::{Backend, BackendContext, ParentWindow};
use crate::error::WebviewError;

/// Upper bound on GTK iterations per pump so the dispatch queue keeps draining
const MAX_EVENTS_PER_PUMP: u32 = 64;

/// GTK toplevel hosting a wry webview
pub struct NativeBackend {
    webview: wry::WebView,
    webkit_webview: webkit2gtk::WebView,
    window: gtk::Window,
    #[allow(dead_code)]
    container: gtk::Box,
    owns_window: bool,
}

impl NativeBackend {
    pub fn new(
        config: &WindowConfig,
        parent: Option<ParentWindow>,
        context: BackendContext,
    ) -> Result<Self, WebviewError> {
        // Initialize GTK if not already done
        if !gtk::is_initialized() {
            gtk::init().map_err(|e| WebviewError::GtkInit(e.to_string()))?;
        }

        let owns_window = parent.is_none();
        let window = match parent {
            // SAFETY: ParentWindow::from_raw requires a live GtkWindow pointer.
            #[allow(unsafe_code)]
            Some(parent) => unsafe {
                from_glib_none::<_, gtk::Window>(parent.as_ptr() as *mut gtk::ffi::GtkWindow)
            },
            None => gtk::Window::new(gtk::WindowType::Toplevel),
        };
        window.set_title(&config.title);
        window.set_default_size(config.width as i32, config.height as i32);

        // Closing the window ends the run loop
        let handle = context.handle.clone();
        window.connect_delete_event(move |_, _| {
            tracing::info!("window closed by user");
            handle.terminate();
            glib::Propagation::Proceed
        });

        let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
        window.add(&container);

        let bridge = context.bridge;
        let webview = wry::WebViewBuilder::new()
            .with_devtools(config.debug)
            .with_ipc_handler(move |msg: wry::http::Request<String>| {
                if bridge.post(msg.into_body()).is_err() {
                    tracing::warn!("Dropping script message: engine is gone");
                }
            })
            .build_gtk(&container)
            .map_err(|e| WebviewError::WebviewCreate(e.to_string()))?;

        let webkit_webview = webview.webview();
        webkit_webview.set_vexpand(true);
        webkit_webview.set_hexpand(true);

        window.show_all();
        tracing::info!(
            width = config.width,
            height = config.height,
            debug = config.debug,
            "native webview created"
        );

        Ok(Self {
            webview,
            webkit_webview,
            window,
            container,
            owns_window,
        })
    }
}

impl Backend for NativeBackend {
    fn navigate(&mut self, url: &str) -> Result<(), WebviewError> {
        self.webview
            .load_url(url)
            .map_err(|e| WebviewError::Navigate(e.to_string()))
    }

    fn eval(&mut self, script: &str) -> Result<(), WebviewError> {
        self.webview
            .evaluate_script(script)
            .map_err(|e| WebviewError::EvalScript(e.to_string()))
    }

    fn init(&mut self, script: &str) -> Result<(), WebviewError> {
        let manager = self
            .webkit_webview
            .user_content_manager()
            .ok_or_else(|| {
                WebviewError::InitScript("WebKitWebView has no content manager".into())
            })?;
        let user_script = UserScript::new(
            script,
            UserContentInjectedFrames::TopFrame,
            UserScriptInjectionTime::Start,
            &[],
            &[],
        );
        manager.add_script(&user_script);
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn set_size(&mut self, width: u32, height: u32, hint: SizeHint) {
        let (width, height) = (width as i32, height as i32);
        self.window.set_resizable(hint != SizeHint::Fixed);
        match hint {
            SizeHint::None => self.window.resize(width, height),
            SizeHint::Fixed => self.window.set_size_request(width, height),
            SizeHint::Min | SizeHint::Max => {
                let geometry = gdk::Geometry::new(
                    width,
                    height,
                    width,
                    height,
                    0,
                    0,
                    0,
                    0,
                    0.0,
                    0.0,
                    gdk::Gravity::NorthWest,
                );
                let mask = if hint == SizeHint::Min {
                    gdk::WindowHints::MIN_SIZE
                } else {
                    gdk::WindowHints::MAX_SIZE
                };
                self.window
                    .set_geometry_hints(None::<&gtk::Widget>, Some(&geometry), mask);
            }
        }
    }

    fn pump(&mut self) -> Result<bool, WebviewError> {
        let mut processed = 0;
        while processed < MAX_EVENTS_PER_PUMP && gtk::events_pending() {
            gtk::main_iteration_do(false);
            processed += 1;
        }
        Ok(processed > 0)
    }

    fn window(&self) -> Option<NonNull<c_void>> {
        NonNull::new(self.window.as_ptr() as *mut c_void)
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        if self.owns_window {
            self.window.close();
        }
        // Let GTK tear the widgets down before the loop is gone
        while gtk::events_pending() {
            gtk::main_iteration_do(false);
        }
    }
}
