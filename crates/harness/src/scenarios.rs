//! Lifecycle and messaging scenarios

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

use anyhow::{Context, ensure};
use pane_capi::{
    webview_create, webview_destroy, webview_dispatch, webview_init, webview_navigate,
    webview_run, webview_set_size, webview_set_title, webview_t, webview_terminate,
};
use pane_ipc::{HandlerError, Message};
use pane_webview::{BackendKind, BrowserEngine, EngineOptions, IgnoreMessages, Webview};

use crate::fixtures::ScriptedPage;

const BIDIR_INIT: &str = r#"
    window.x = 42;
    window.onload = () => {
      window.external.invoke('loaded');
    };
"#;

fn options(debug: bool, backend: BackendKind) -> EngineOptions {
    EngineOptions {
        backend,
        ..EngineOptions::new(debug, None)
    }
}

/// Start the loop and stop it from a dispatched closure
pub fn terminate(backend: BackendKind) -> anyhow::Result<()> {
    let mut engine = BrowserEngine::new(options(false, backend), IgnoreMessages)
        .context("failed to create webview")?;
    engine.dispatch(|w| w.terminate());
    engine.run()?;
    ensure!(engine.is_terminated(), "run() returned without termination");
    Ok(())
}

thread_local! {
    static C_CALLBACKS_FIRED: Cell<u32> = const { Cell::new(0) };
}

unsafe extern "C" fn cb_assert_arg(w: webview_t, arg: *mut c_void) {
    assert!(!w.is_null());
    assert!(!arg.is_null());
    // SAFETY: dispatched with a pointer to the static bytes "arg".
    let bytes = unsafe { std::slice::from_raw_parts(arg as *const u8, 3) };
    assert_eq!(bytes, b"arg");
    C_CALLBACKS_FIRED.with(|fired| fired.set(fired.get() + 1));
}

unsafe extern "C" fn cb_terminate(w: webview_t, arg: *mut c_void) {
    assert!(arg.is_null());
    C_CALLBACKS_FIRED.with(|fired| fired.set(fired.get() + 1));
    // SAFETY: `w` is the live webview running this callback.
    unsafe { webview_terminate(w) };
}

/// Drive a window through the C facade.
///
/// `webview_create` picks its backend from `PANE_BACKEND` itself.
pub fn c_api(backend: BackendKind) -> anyhow::Result<()> {
    ensure!(
        BackendKind::from_env() == backend,
        "webview_create would not use the {backend:?} backend"
    );
    C_CALLBACKS_FIRED.with(|fired| fired.set(0));

    // SAFETY: no parent window.
    let w = unsafe { webview_create(0, ptr::null_mut()) };
    ensure!(!w.is_null(), "webview_create returned null");

    // SAFETY: `w` is live until webview_destroy below; the dispatched
    // argument points at static data.
    let status = unsafe {
        webview_set_size(w, 480, 320, 0);
        webview_set_title(w, c"Test".as_ptr());
        webview_init(w, c"window.x = 42;".as_ptr());
        webview_navigate(w, c"https://github.com/zserge/webview".as_ptr());
        webview_dispatch(w, Some(cb_assert_arg), c"arg".as_ptr() as *mut c_void);
        webview_dispatch(w, Some(cb_terminate), ptr::null_mut());
        webview_run(w)
    };
    let fired = C_CALLBACKS_FIRED.with(Cell::get);
    // SAFETY: created above and not used afterwards.
    unsafe { webview_destroy(w) };

    ensure!(status == 0, "webview_run reported failure ({status})");
    ensure!(fired == 2, "expected both callbacks before destroy, saw {fired}");
    Ok(())
}

fn bidir_handler(w: &mut Webview, msg: &Message) -> Result<(), HandlerError> {
    match msg.index {
        0 => {
            if msg.as_str() != "loaded" {
                return Err(HandlerError::failed(format!(
                    "expected \"loaded\", got {:?}",
                    msg.payload
                )));
            }
            w.eval("window.external.invoke('exiting ' + window.x)")
                .map_err(|e| HandlerError::failed(e.to_string()))
        }
        1 => {
            if msg.as_str() != "exiting 42" {
                return Err(HandlerError::failed(format!(
                    "expected \"exiting 42\", got {:?}",
                    msg.payload
                )));
            }
            w.terminate();
            Ok(())
        }
        index => Err(HandlerError::Unexpected {
            index,
            payload: msg.payload.clone(),
        }),
    }
}

/// Script calls native code and native code calls script back
pub fn bidir_comms(backend: BackendKind) -> anyhow::Result<()> {
    let mut engine = match backend {
        BackendKind::Native => BrowserEngine::new(options(true, backend), bidir_handler),
        BackendKind::Headless => BrowserEngine::headless(ScriptedPage::default(), bidir_handler)
            .map(|(engine, _)| engine),
    }
    .context("failed to create webview")?;

    engine.init(BIDIR_INIT)?;
    engine.navigate("data:text/html,<html></html>")?;
    engine.run()?;
    Ok(())
}
