use std::num::NonZeroU64;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Native identity of the splash window. Never zero; zero is the "no window"
/// sentinel on the callback ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WindowHandle(NonZeroU64);

impl WindowHandle {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(WindowHandle)
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

/// Window position and size on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplashGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl SplashGeometry {
    /// Center an image of `image` size on a screen of `screen` size.
    pub fn centered(screen: (u32, u32), image: (u32, u32)) -> Self {
        let offset = |screen: u32, image: u32| (i64::from(screen) - i64::from(image)) / 2;
        Self {
            x: offset(screen.0, image.0) as i32,
            y: offset(screen.1, image.1) as i32,
            width: image.0,
            height: image.1,
        }
    }
}

/// The windowing toolkit as seen by the splash bridge.
pub trait SplashWindow: Send {
    /// Load `image`, create a window sized to it, center and show it.
    fn open(&mut self, image: &Path) -> LauncherResult<WindowHandle>;

    /// Process pending UI events once without blocking.
    fn dispatch_messages(&mut self);

    /// Destroy the window behind `handle`.
    fn close(&mut self, handle: WindowHandle);
}

/// Window backend with no display: validates and measures the image, computes
/// where the window would go and counts event pumps.
#[derive(Debug)]
pub struct HeadlessWindow {
    screen: (u32, u32),
    next_handle: u64,
    geometry: Option<SplashGeometry>,
    pumped: u64,
}

impl HeadlessWindow {
    pub fn new(screen: (u32, u32)) -> Self {
        Self {
            screen,
            next_handle: 1,
            geometry: None,
            pumped: 0,
        }
    }

    pub fn geometry(&self) -> Option<SplashGeometry> {
        self.geometry
    }

    pub fn pumped(&self) -> u64 {
        self.pumped
    }
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new((1920, 1080))
    }
}

impl SplashWindow for HeadlessWindow {
    fn open(&mut self, image: &Path) -> LauncherResult<WindowHandle> {
        let size = image::image_dimensions(image).map_err(|e| LauncherError::ImageLoad {
            path: image.to_path_buf(),
            reason: e.to_string(),
        })?;

        let geometry = SplashGeometry::centered(self.screen, size);
        let handle = WindowHandle::new(self.next_handle).ok_or_else(|| {
            LauncherError::Other("splash window handles exhausted".into())
        })?;
        self.next_handle += 1;
        self.geometry = Some(geometry);

        info!(
            "Splash {:?} ({}x{}) at {},{}",
            image, geometry.width, geometry.height, geometry.x, geometry.y
        );
        Ok(handle)
    }

    fn dispatch_messages(&mut self) {
        self.pumped += 1;
    }

    fn close(&mut self, handle: WindowHandle) {
        debug!("Closing splash window {}", handle.raw());
        self.geometry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn centers_on_screen() {
        let geometry = SplashGeometry::centered((1000, 800), (400, 200));
        assert_eq!((geometry.x, geometry.y), (300, 300));

        let oversized = SplashGeometry::centered((100, 100), (300, 100));
        assert_eq!(oversized.x, -100);
    }

    #[test]
    fn headless_window_measures_image() {
        let dir = tempfile::tempdir().unwrap();
        let splash = dir.path().join("splash.png");
        write_png(&splash, 40, 20);

        let mut window = HeadlessWindow::new((200, 100));
        let handle = window.open(&splash).unwrap();
        assert_eq!(handle.raw(), 1);
        assert_eq!(
            window.geometry(),
            Some(SplashGeometry {
                x: 80,
                y: 40,
                width: 40,
                height: 20
            })
        );

        window.close(handle);
        assert_eq!(window.geometry(), None);
    }

    #[test]
    fn unreadable_image_is_image_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("splash.bmp");
        std::fs::write(&bogus, b"not a bitmap").unwrap();

        let err = HeadlessWindow::default().open(&bogus).unwrap_err();
        assert!(matches!(err, LauncherError::ImageLoad { .. }));
    }

    #[test]
    fn zero_is_not_a_handle() {
        assert!(WindowHandle::new(0).is_none());
    }
}
