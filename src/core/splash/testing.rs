//! Test doubles shared by the splash and launch tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::window::{SplashWindow, WindowHandle};
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Default)]
struct Counters {
    opened: usize,
    closed: usize,
    pumped: usize,
}

/// Window that records calls. Clones share their counters.
#[derive(Debug, Clone, Default)]
pub struct RecordingWindow {
    counters: Arc<Mutex<Counters>>,
    fail_open: bool,
}

impl RecordingWindow {
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.counters.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.counters.lock().unwrap().closed
    }

    pub fn pumped(&self) -> usize {
        self.counters.lock().unwrap().pumped
    }
}

impl SplashWindow for RecordingWindow {
    fn open(&mut self, image: &Path) -> LauncherResult<WindowHandle> {
        if self.fail_open {
            return Err(LauncherError::ImageLoad {
                path: image.to_path_buf(),
                reason: "unsupported".into(),
            });
        }
        let mut counters = self.counters.lock().unwrap();
        counters.opened += 1;
        Ok(WindowHandle::new(0x1000 + counters.opened as u64).unwrap())
    }

    fn dispatch_messages(&mut self) {
        self.counters.lock().unwrap().pumped += 1;
    }

    fn close(&mut self, _handle: WindowHandle) {
        self.counters.lock().unwrap().closed += 1;
    }
}
