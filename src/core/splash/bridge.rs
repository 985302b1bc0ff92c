// ─── Splash Bridge ───
// The five operations a running runtime may call back into the launcher,
// plus restart. Every call goes through the context lock and its hooks.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::window::WindowHandle;
use crate::core::error::{LauncherError, LauncherResult, START_FAILED};
use crate::core::launch::command_line::build_command_line;
use crate::core::state::LauncherContext;

#[derive(Clone)]
pub struct SplashBridge {
    context: Arc<LauncherContext>,
}

impl SplashBridge {
    pub fn new(context: Arc<LauncherContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<LauncherContext> {
        &self.context
    }

    /// Pump the splash window's events once.
    pub fn request_repaint(&self) {
        let mut control = self.context.lock();
        self.context.hooks().update(&mut control);
    }

    pub fn query_window_handle(&self) -> Option<WindowHandle> {
        let mut control = self.context.lock();
        self.context.hooks().window_handle(&mut control)
    }

    pub fn show(&self, image: &Path) -> LauncherResult<()> {
        let mut control = self.context.lock();
        let result = self.context.hooks().show(&mut control, image);
        if let Err(e) = &result {
            warn!("Splash not shown: {}", e);
        }
        result
    }

    pub fn take_down(&self) {
        let mut control = self.context.lock();
        self.context.hooks().take_down(&mut control);
    }

    /// Record exit text locally (`id` is `None`) or in the shared slot `id`.
    pub fn set_exit_data(&self, id: Option<&str>, text: &str) -> LauncherResult<()> {
        debug!("Exit data set ({} bytes, shared: {:?})", text.len(), id);
        let mut control = self.context.lock();
        self.context.hooks().set_exit_data(&mut control, id, text)
    }

    /// Take the splash down, then start `program` detached from this process.
    /// Does not wait for it.
    pub fn restart(&self, program: &Path, args: &[String]) -> LauncherResult<()> {
        self.take_down();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        detach(&mut command);

        info!("Restarting: {}", build_command_line(program, args));
        let child = command.spawn().map_err(|e| LauncherError::Launch {
            program: program.to_path_buf(),
            code: e.raw_os_error().unwrap_or(START_FAILED),
        })?;
        debug!("Restarted process PID {}", child.id());
        Ok(())
    }
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_command: &mut Command) {}
