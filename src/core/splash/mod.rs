pub mod bridge;
pub mod control;
pub mod exit_data;
pub mod ffi;
pub mod hooks;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::SplashBridge;
pub use control::{SplashControl, SplashState};
pub use exit_data::SharedDataChannel;
pub use ffi::SplashCallbacks;
pub use hooks::{DefaultHooks, SplashHooks};
pub use window::{HeadlessWindow, SplashWindow, WindowHandle};
