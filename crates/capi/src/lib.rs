//! C API for Pane
//!
//! Flat `extern "C"` functions over [`BrowserEngine`], declared in
//! `include/webview.h`. Every function takes the opaque `webview_t` returned
//! by [`webview_create`]; callbacks receive their `arg` pointer exactly as it
//! was passed in.
//!
//! Threading: `webview_dispatch` and `webview_terminate` may be called from
//! any thread. Calls that touch the renderer (`navigate`, `eval`, `init`,
//! `set_title`, `set_size`) are queued through the dispatch queue, so they
//! are safe from any thread too and keep FIFO order with dispatched
//! callbacks. `webview_run` and `webview_destroy` belong to the thread that
//! created the webview.

#![allow(non_camel_case_types)]
#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr;
use std::sync::{Arc, Mutex};

use pane_webview::{
    BrowserEngine, EngineOptions, HandlerError, Message, MessageHandler, Page, ParentWindow,
    SizeHint, Webview, WebviewError, WebviewHandle,
};

/// Opaque webview instance
pub type webview_t = *mut CWebview;

/// Callback for [`webview_dispatch`]
pub type webview_dispatch_fn = Option<unsafe extern "C" fn(w: webview_t, arg: *mut c_void)>;

/// Callback for [`webview_set_message_handler`]; `message` is only valid
/// for the duration of the call
pub type webview_message_fn =
    Option<unsafe extern "C" fn(w: webview_t, message: *const c_char, arg: *mut c_void)>;

/// Pointer that may cross to the UI thread.
///
/// The C caller owns whatever it points at and promises it stays valid
/// until the callback it was passed with has run.
#[derive(Clone, Copy)]
struct SendPtr(*mut c_void);

unsafe impl Send for SendPtr {}

impl SendPtr {
    fn get(self) -> *mut c_void {
        self.0
    }
}

#[derive(Clone, Copy)]
struct Registration {
    callback: unsafe extern "C" fn(webview_t, *const c_char, *mut c_void),
    owner: SendPtr,
    arg: SendPtr,
}

type Slot = Arc<Mutex<Option<Registration>>>;

/// Forwards script messages to the registered C callback
struct CMessageHandler {
    slot: Slot,
}

impl MessageHandler for CMessageHandler {
    fn on_message(
        &mut self,
        _webview: &mut Webview,
        message: &Message,
    ) -> Result<(), HandlerError> {
        let registration = *self.slot.lock().unwrap_or_else(|p| p.into_inner());
        let Some(registration) = registration else {
            tracing::trace!(index = message.index, "no C message handler registered");
            return Ok(());
        };
        let payload = c_payload(message);
        // SAFETY: the callback and its arg were registered by the C caller.
        unsafe {
            (registration.callback)(
                registration.owner.get() as webview_t,
                payload.as_ptr(),
                registration.arg.get(),
            );
        }
        Ok(())
    }
}

/// Payload as a C string, cut at the first NUL like any C reader would
fn c_payload(message: &Message) -> CString {
    CString::new(message.payload.as_str()).unwrap_or_else(|err| {
        let nul = err.nul_position();
        tracing::warn!(
            index = message.index,
            nul,
            "message payload contains a NUL byte; passing the text before it"
        );
        let mut bytes = err.into_vec();
        bytes.truncate(nul);
        // No NUL is left before `nul`.
        CString::new(bytes).unwrap_or_default()
    })
}

/// State behind a `webview_t`
pub struct CWebview {
    handle: WebviewHandle,
    engine: UnsafeCell<BrowserEngine>,
    window: *mut c_void,
    message_slot: Slot,
}

/// Create a webview from explicit options; null on failure.
///
/// `webview_create` is this with the window defaults and `PANE_BACKEND`.
pub fn create_with_options(options: EngineOptions) -> webview_t {
    wrap(|handler| BrowserEngine::new(options, handler))
}

/// Create a windowless webview around a scripted page; null on failure
pub fn create_headless(page: impl Page + 'static) -> webview_t {
    wrap(|handler| BrowserEngine::headless(page, handler).map(|(engine, _)| engine))
}

fn wrap<F>(build: F) -> webview_t
where
    F: FnOnce(CMessageHandler) -> Result<BrowserEngine, WebviewError>,
{
    let message_slot = Slot::default();
    let handler = CMessageHandler {
        slot: message_slot.clone(),
    };
    match build(handler) {
        Ok(engine) => {
            let window = engine.window().map_or(ptr::null_mut(), |w| w.as_ptr());
            Box::into_raw(Box::new(CWebview {
                handle: engine.handle(),
                engine: UnsafeCell::new(engine),
                window,
                message_slot,
            }))
        }
        Err(err) => {
            tracing::error!(error = %err, "webview_create failed");
            ptr::null_mut()
        }
    }
}

/// Borrow the instance behind `w`, logging misuse
unsafe fn instance<'a>(w: webview_t, call: &str) -> Option<&'a CWebview> {
    // SAFETY: non-null handles come from webview_create and are live until destroy.
    let instance = unsafe { w.as_ref() };
    if instance.is_none() {
        tracing::warn!(call, "called with a null webview");
    }
    instance
}

/// Copy a C string, logging misuse
unsafe fn owned_str(s: *const c_char, call: &str) -> Option<String> {
    if s.is_null() {
        tracing::warn!(call, "called with a null string");
        return None;
    }
    // SAFETY: the caller passes a NUL-terminated string.
    match unsafe { CStr::from_ptr(s) }.to_str() {
        Ok(s) => Some(s.to_owned()),
        Err(err) => {
            tracing::warn!(call, error = %err, "ignoring string that is not UTF-8");
            None
        }
    }
}

/// Queue `job` on the UI thread of `w`
unsafe fn queue<F>(w: webview_t, call: &'static str, job: F)
where
    F: FnOnce(&mut Webview) + Send + 'static,
{
    if let Some(instance) = unsafe { instance(w, call) } {
        instance.handle.dispatch(job);
    }
}

/// Create a webview; `window` is an optional `GtkWindow*` to host it in.
///
/// Returns null if the window or renderer could not be created.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_create(debug: c_int, window: *mut c_void) -> webview_t {
    // SAFETY: the C caller hands us a live toplevel or null.
    let parent = unsafe { ParentWindow::from_raw(window) };
    create_with_options(EngineOptions::new(debug != 0, parent))
}

/// Destroy a webview. Callbacks still queued are discarded without running.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_destroy(w: webview_t) {
    if w.is_null() {
        return;
    }
    // SAFETY: `w` came from Box::into_raw in create_with_options.
    drop(unsafe { Box::from_raw(w) });
}

/// Run the UI loop until terminated. Returns 0, or -1 if a message
/// handler failed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_run(w: webview_t) -> c_int {
    let Some(instance) = (unsafe { instance(w, "webview_run") }) else {
        return -1;
    };
    // SAFETY: only webview_run and webview_destroy touch the engine, both on
    // the creating thread, and never at the same time.
    let engine = unsafe { &mut *instance.engine.get() };
    match engine.run() {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "webview_run failed");
            -1
        }
    }
}

/// Stop the UI loop; safe from any thread
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_terminate(w: webview_t) {
    if let Some(instance) = unsafe { instance(w, "webview_terminate") } {
        instance.handle.terminate();
    }
}

/// Call `callback(w, arg)` on the UI thread; safe from any thread
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_dispatch(
    w: webview_t,
    callback: webview_dispatch_fn,
    arg: *mut c_void,
) {
    let Some(callback) = callback else {
        tracing::warn!("webview_dispatch called without a callback");
        return;
    };
    let owner = SendPtr(w as *mut c_void);
    let arg = SendPtr(arg);
    // SAFETY: the C caller keeps `arg` valid until the callback runs.
    unsafe {
        queue(w, "webview_dispatch", move |_| {
            callback(owner.get() as webview_t, arg.get())
        });
    }
}

/// Native window handle (`GtkWindow*` on Linux), or null
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_get_window(w: webview_t) -> *mut c_void {
    unsafe { instance(w, "webview_get_window") }.map_or(ptr::null_mut(), |instance| instance.window)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_set_title(w: webview_t, title: *const c_char) {
    let Some(title) = (unsafe { owned_str(title, "webview_set_title") }) else {
        return;
    };
    unsafe { queue(w, "webview_set_title", move |webview| webview.set_title(&title)) };
}

/// Resize the window; `hints` is one of the `WEBVIEW_HINT_*` values
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_set_size(w: webview_t, width: c_int, height: c_int, hints: c_int) {
    let Some(hint) = SizeHint::from_raw(hints) else {
        tracing::warn!(hints, "webview_set_size called with an unknown hint");
        return;
    };
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        tracing::warn!(width, height, "webview_set_size called with a negative size");
        return;
    };
    unsafe {
        queue(w, "webview_set_size", move |webview| {
            webview.set_size(width, height, hint)
        })
    };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_navigate(w: webview_t, url: *const c_char) {
    let Some(url) = (unsafe { owned_str(url, "webview_navigate") }) else {
        return;
    };
    unsafe {
        queue(w, "webview_navigate", move |webview| {
            if let Err(err) = webview.navigate(&url) {
                tracing::warn!(error = %err, "webview_navigate failed");
            }
        })
    };
}

/// Register script to run before page scripts on every later load
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_init(w: webview_t, js: *const c_char) {
    let Some(js) = (unsafe { owned_str(js, "webview_init") }) else {
        return;
    };
    unsafe {
        queue(w, "webview_init", move |webview| {
            if let Err(err) = webview.init(&js) {
                tracing::warn!(error = %err, "webview_init failed");
            }
        })
    };
}

/// Evaluate script in the current page; the result is not reported
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_eval(w: webview_t, js: *const c_char) {
    let Some(js) = (unsafe { owned_str(js, "webview_eval") }) else {
        return;
    };
    unsafe {
        queue(w, "webview_eval", move |webview| {
            if let Err(err) = webview.eval(&js) {
                tracing::warn!(error = %err, "webview_eval failed");
            }
        })
    };
}

/// Receive `window.external.invoke` payloads; null `callback` unregisters
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webview_set_message_handler(
    w: webview_t,
    callback: webview_message_fn,
    arg: *mut c_void,
) {
    let Some(instance) = (unsafe { instance(w, "webview_set_message_handler") }) else {
        return;
    };
    let registration = callback.map(|callback| Registration {
        callback,
        owner: SendPtr(w as *mut c_void),
        arg: SendPtr(arg),
    });
    *instance
        .message_slot
        .lock()
        .unwrap_or_else(|p| p.into_inner()) = registration;
}
