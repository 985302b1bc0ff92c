use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::error::LauncherResult;
use crate::core::splash::control::{SplashControl, SplashState};
use crate::core::splash::exit_data::{host_channel, SharedDataChannel};
use crate::core::splash::hooks::{DefaultHooks, SplashHooks};
use crate::core::splash::window::{HeadlessWindow, SplashWindow};

/// Per-launch state shared by the launcher thread and the splash callbacks.
///
/// One instance exists per launch and is handed around as `Arc`. The mutable
/// part sits behind a single lock; the hooks are fixed at construction.
pub struct LauncherContext {
    control: Mutex<SplashControl>,
    hooks: Box<dyn SplashHooks>,
}

impl LauncherContext {
    pub fn new(window: Box<dyn SplashWindow>, channel: Box<dyn SharedDataChannel>) -> Self {
        Self {
            control: Mutex::new(SplashControl::new(window, channel)),
            hooks: Box::new(DefaultHooks),
        }
    }

    /// Context for the host with no display attached.
    pub fn headless() -> Self {
        Self::new(Box::new(HeadlessWindow::default()), host_channel())
    }

    pub fn with_hooks(mut self, hooks: Box<dyn SplashHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks(&self) -> &dyn SplashHooks {
        self.hooks.as_ref()
    }

    /// Lock the splash state. A panic in another holder does not make the
    /// state unusable, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, SplashControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn splash_state(&self) -> SplashState {
        self.lock().state()
    }

    /// Latest exit text recorded in this process.
    pub fn exit_data(&self) -> Option<String> {
        self.lock().exit_data().map(str::to_string)
    }

    pub fn take_exit_data(&self) -> Option<String> {
        self.lock().take_exit_data()
    }

    pub fn create_shared_exit_data(&self) -> LauncherResult<String> {
        self.lock().create_shared_slot()
    }

    pub fn collect_shared_exit_data(&self, id: &str) -> LauncherResult<Option<String>> {
        self.lock().collect_shared_slot(id)
    }
}

impl Default for LauncherContext {
    fn default() -> Self {
        Self::headless()
    }
}
