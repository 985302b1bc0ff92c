use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::exit_data::SharedDataChannel;
use super::window::{SplashWindow, WindowHandle};
use crate::core::error::LauncherResult;

/// Lifecycle of the splash window. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplashState {
    NotShown,
    Showing,
    TornDown,
}

/// Everything the splash callbacks mutate. Lives behind the context mutex so
/// runtime threads and the launcher thread never touch it concurrently.
pub struct SplashControl {
    state: SplashState,
    handle: Option<WindowHandle>,
    window: Box<dyn SplashWindow>,
    exit_data: Option<String>,
    channel: Box<dyn SharedDataChannel>,
}

impl SplashControl {
    pub fn new(window: Box<dyn SplashWindow>, channel: Box<dyn SharedDataChannel>) -> Self {
        Self {
            state: SplashState::NotShown,
            handle: None,
            window,
            exit_data: None,
            channel,
        }
    }

    pub fn state(&self) -> SplashState {
        self.state
    }

    /// Handle of the live window, `None` before show and after take-down.
    pub fn handle(&self) -> Option<WindowHandle> {
        self.handle
    }

    /// Pump UI events once. Nothing to pump without a window.
    pub fn dispatch_messages(&mut self) {
        if self.state == SplashState::Showing {
            self.window.dispatch_messages();
        }
    }

    /// Show the splash. A second call keeps the existing window, and a splash
    /// that was already taken down stays down.
    pub fn show(&mut self, image: &Path) -> LauncherResult<()> {
        match self.state {
            SplashState::Showing => {
                debug!("Splash already showing");
                Ok(())
            }
            SplashState::TornDown => {
                debug!("Splash already taken down, not showing {:?}", image);
                Ok(())
            }
            SplashState::NotShown => {
                let handle = self.window.open(image)?;
                self.handle = Some(handle);
                self.state = SplashState::Showing;
                self.window.dispatch_messages();
                Ok(())
            }
        }
    }

    /// Destroy the showing window. Terminal once a window was shown; does
    /// nothing otherwise.
    pub fn take_down(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.window.close(handle);
            self.state = SplashState::TornDown;
            info!("Splash taken down");
        }
    }

    /// Record exit text: into the process-local slot when `id` is `None`,
    /// else into the shared channel named `id`.
    pub fn store_exit_data(&mut self, id: Option<&str>, text: &str) -> LauncherResult<()> {
        match id {
            None => {
                self.exit_data = Some(text.to_string());
                Ok(())
            }
            Some(id) => self.channel.write(id, text),
        }
    }

    pub fn exit_data(&self) -> Option<&str> {
        self.exit_data.as_deref()
    }

    pub fn take_exit_data(&mut self) -> Option<String> {
        self.exit_data.take()
    }

    /// Create a shared slot for a child process to write into.
    pub fn create_shared_slot(&mut self) -> LauncherResult<String> {
        self.channel.create()
    }

    /// Move whatever a child wrote into `id` to the local slot, then remove
    /// the shared slot. Returns the collected text.
    pub fn collect_shared_slot(&mut self, id: &str) -> LauncherResult<Option<String>> {
        let data = self.channel.read(id)?;
        if let Err(e) = self.channel.destroy(id) {
            warn!("Failed to remove shared exit data {}: {}", id, e);
        }
        if let Some(text) = &data {
            self.exit_data = Some(text.clone());
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::splash::exit_data::TempFileChannel;
    use crate::core::splash::testing::RecordingWindow;

    fn control(window: RecordingWindow, dir: &Path) -> SplashControl {
        SplashControl::new(Box::new(window), Box::new(TempFileChannel::new(dir)))
    }

    #[test]
    fn show_twice_opens_one_window() {
        let dir = tempfile::tempdir().unwrap();
        let window = RecordingWindow::default();
        let mut control = control(window.clone(), dir.path());

        control.show(Path::new("splash.bmp")).unwrap();
        control.show(Path::new("splash.bmp")).unwrap();

        assert_eq!(window.opened(), 1);
        assert_eq!(control.state(), SplashState::Showing);
        assert!(control.handle().is_some());
    }

    #[test]
    fn take_down_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let window = RecordingWindow::default();
        let mut control = control(window.clone(), dir.path());

        control.show(Path::new("splash.bmp")).unwrap();
        control.take_down();
        control.take_down();
        control.show(Path::new("splash.bmp")).unwrap();

        assert_eq!(window.opened(), 1);
        assert_eq!(window.closed(), 1);
        assert_eq!(control.state(), SplashState::TornDown);
        assert_eq!(control.handle(), None);
    }

    #[test]
    fn take_down_before_show_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let window = RecordingWindow::default();
        let mut control = control(window.clone(), dir.path());

        control.take_down();
        assert_eq!(control.state(), SplashState::NotShown);
        assert_eq!(window.closed(), 0);

        control.show(Path::new("splash.bmp")).unwrap();
        assert_eq!(window.opened(), 1);
        assert_eq!(control.state(), SplashState::Showing);
        assert!(control.handle().is_some());
    }

    #[test]
    fn failed_show_leaves_splash_not_shown() {
        let dir = tempfile::tempdir().unwrap();
        let window = RecordingWindow::failing();
        let mut control = control(window.clone(), dir.path());

        assert!(control.show(Path::new("broken.bmp")).is_err());
        assert_eq!(control.state(), SplashState::NotShown);
        assert_eq!(control.handle(), None);
    }

    #[test]
    fn pumping_requires_a_window() {
        let dir = tempfile::tempdir().unwrap();
        let window = RecordingWindow::default();
        let mut control = control(window.clone(), dir.path());

        control.dispatch_messages();
        assert_eq!(window.pumped(), 0);

        control.show(Path::new("splash.bmp")).unwrap();
        control.dispatch_messages();
        assert_eq!(window.pumped(), 2);
    }

    #[test]
    fn local_exit_data_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut control = control(RecordingWindow::default(), dir.path());

        control.store_exit_data(None, "one").unwrap();
        control.store_exit_data(None, "two").unwrap();
        assert_eq!(control.exit_data(), Some("two"));
    }

    #[test]
    fn shared_exit_data_is_collected_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut control = control(RecordingWindow::default(), dir.path());

        let id = control.create_shared_slot().unwrap();
        control.store_exit_data(Some(&id), "-restart\n-clean").unwrap();
        assert_eq!(control.exit_data(), None);

        let collected = control.collect_shared_slot(&id).unwrap();
        assert_eq!(collected.as_deref(), Some("-restart\n-clean"));
        assert_eq!(control.exit_data(), Some("-restart\n-clean"));
        assert_eq!(control.collect_shared_slot(&id).unwrap(), None);
    }
}
