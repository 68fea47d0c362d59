#![allow(unsafe_code)]

//! `webview_create` choosing the headless backend from the environment.
//!
//! Kept in its own binary because it writes `PANE_BACKEND`.

use std::ffi::c_void;
use std::ptr;

use pane_capi::*;
use pane_config::BACKEND_ENV;

unsafe extern "C" fn stop(w: webview_t, _: *mut c_void) {
    unsafe { webview_terminate(w) };
}

#[test]
fn test_webview_create_runs_headless_from_env() {
    // SAFETY: the only test in this binary, so no other thread reads the
    // environment concurrently.
    unsafe { std::env::set_var(BACKEND_ENV, "headless") };

    unsafe {
        let w = webview_create(1, ptr::null_mut());
        assert!(!w.is_null());
        assert!(webview_get_window(w).is_null());

        webview_set_title(w, c"Created".as_ptr());
        webview_init(w, c"window.x = 42;".as_ptr());
        webview_navigate(w, c"data:text/html,<html></html>".as_ptr());
        webview_eval(w, c"window.external.invoke('ignored')".as_ptr());
        webview_dispatch(w, Some(stop), ptr::null_mut());
        assert_eq!(webview_run(w), 0);
        webview_destroy(w);
    }
}
