//! Event logging
//!
//! The host installs a C callback that receives NUL-terminated event strings.
//! With no callback installed, logging is a no-op.

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

static LOG_CALLBACK: AtomicPtr<std::ffi::c_void> = AtomicPtr::new(ptr::null_mut());

pub(crate) fn set_log_callback(cb: Option<extern "C" fn(*const c_char)>) {
    let ptr = cb.map(|f| f as *mut std::ffi::c_void).unwrap_or(ptr::null_mut());
    LOG_CALLBACK.store(ptr, Ordering::SeqCst);
}

/// Forward an event to the installed log callback
pub fn log_event(message: &str) {
    #[cfg(all(target_arch = "wasm32", feature = "wasm"))]
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(message));

    let cb_ptr = LOG_CALLBACK.load(Ordering::SeqCst);
    if !cb_ptr.is_null() {
        let cb: extern "C" fn(*const c_char) = unsafe { std::mem::transmute(cb_ptr) };
        if let Ok(cstr) = CString::new(message) {
            cb(cstr.as_ptr());
        }
    }
}
