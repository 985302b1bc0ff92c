use std::path::Path;

use super::control::SplashControl;
use super::window::WindowHandle;
use crate::core::error::LauncherResult;

/// Behavior behind the five splash callbacks. Implementors override what
/// they need; the defaults drive [`SplashControl`] directly.
///
/// Hooks are fixed when the launcher context is built and are always called
/// with the control lock held.
pub trait SplashHooks: Send + Sync {
    fn update(&self, control: &mut SplashControl) {
        control.dispatch_messages();
    }

    fn window_handle(&self, control: &mut SplashControl) -> Option<WindowHandle> {
        control.handle()
    }

    fn show(&self, control: &mut SplashControl, image: &Path) -> LauncherResult<()> {
        control.show(image)
    }

    fn take_down(&self, control: &mut SplashControl) {
        control.take_down();
    }

    fn set_exit_data(
        &self,
        control: &mut SplashControl,
        id: Option<&str>,
        text: &str,
    ) -> LauncherResult<()> {
        control.store_exit_data(id, text)
    }
}

/// Hooks with no overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl SplashHooks for DefaultHooks {}
