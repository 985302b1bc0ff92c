// ─── Splash Callback Table ───
// C ABI view of the bridge, handed to an embedded runtime at registration.
// `context` points at a `SplashBridge` owned by the embedded session.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::Path;

use tracing::warn;

use super::bridge::SplashBridge;
use crate::core::error::LauncherError;

/// `show_splash` result codes.
pub const SHOW_OK: c_int = 0;
pub const SHOW_IMAGE_FAILED: c_int = 1;
pub const SHOW_INVALID_ARGUMENT: c_int = -1;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SplashCallbacks {
    pub context: *mut c_void,
    pub update_splash: extern "C" fn(*mut c_void),
    /// Native handle of the splash window, 0 when there is none.
    pub get_splash_handle: extern "C" fn(*mut c_void) -> i64,
    pub show_splash: extern "C" fn(*mut c_void, *const c_char) -> c_int,
    pub takedown_splash: extern "C" fn(*mut c_void),
    /// `(context, id or null, text)`.
    pub set_exit_data: extern "C" fn(*mut c_void, *const c_char, *const c_char),
}

impl SplashCallbacks {
    /// Table whose context is `bridge`. The bridge must stay in place until
    /// the runtime can no longer call back.
    pub fn new(bridge: &SplashBridge) -> Self {
        Self {
            context: bridge as *const SplashBridge as *mut c_void,
            update_splash,
            get_splash_handle,
            show_splash,
            takedown_splash,
            set_exit_data,
        }
    }
}

fn bridge<'a>(context: *mut c_void) -> Option<&'a SplashBridge> {
    // SAFETY: tables are only built by `SplashCallbacks::new`, whose caller
    // keeps the bridge alive while the runtime runs
    unsafe { (context as *const SplashBridge).as_ref() }
}

fn text<'a>(ptr: *const c_char) -> Option<std::borrow::Cow<'a, str>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null strings from the runtime are NUL-terminated
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy())
}

extern "C" fn update_splash(context: *mut c_void) {
    if let Some(bridge) = bridge(context) {
        bridge.request_repaint();
    }
}

extern "C" fn get_splash_handle(context: *mut c_void) -> i64 {
    bridge(context)
        .and_then(SplashBridge::query_window_handle)
        .map(|handle| handle.raw() as i64)
        .unwrap_or(0)
}

extern "C" fn show_splash(context: *mut c_void, image: *const c_char) -> c_int {
    let (Some(bridge), Some(image)) = (bridge(context), text(image)) else {
        return SHOW_INVALID_ARGUMENT;
    };
    match bridge.show(Path::new(image.as_ref())) {
        Ok(()) => SHOW_OK,
        Err(LauncherError::ImageLoad { .. }) => SHOW_IMAGE_FAILED,
        Err(_) => SHOW_INVALID_ARGUMENT,
    }
}

extern "C" fn takedown_splash(context: *mut c_void) {
    if let Some(bridge) = bridge(context) {
        bridge.take_down();
    }
}

extern "C" fn set_exit_data(context: *mut c_void, id: *const c_char, data: *const c_char) {
    let (Some(bridge), Some(data)) = (bridge(context), text(data)) else {
        return;
    };
    let id = text(id);
    if let Err(e) = bridge.set_exit_data(id.as_deref(), &data) {
        warn!("Failed to store exit data: {}", e);
    }
}
