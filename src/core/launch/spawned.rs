// ─── Spawned Launch ───
// Start the runtime as a child process and supervise it on one thread:
// a current-thread tokio runtime drives an exit check and a splash pump.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::command_line::{build_command_line, configure_library_env};
use super::config::LaunchConfiguration;
use crate::core::error::{LauncherError, LauncherResult, START_FAILED};
use crate::core::splash::SplashBridge;

/// How often the child is checked for exit.
pub const EXIT_CHECK_INTERVAL: Duration = Duration::from_millis(50);
/// How often pending splash events are pumped.
pub const PUMP_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnedPhase {
    Idle,
    Spawned,
    Supervising,
    Terminated,
}

fn enter(phase: SpawnedPhase) {
    debug!("Spawned launch phase: {:?}", phase);
}

/// A running child and its exit code once observed.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    /// Start `config.runtime` with runtime then program arguments.
    pub fn spawn(config: &LaunchConfiguration) -> LauncherResult<Self> {
        let args = config.command_args();
        let mut cmd = Command::new(&config.runtime);
        cmd.args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        configure_library_env(&mut cmd, &config.library_path);

        info!("Launching runtime: {:?}", config.runtime);
        debug!("Command (copy/paste): {}", build_command_line(&config.runtime, &args));

        let child = cmd.spawn().map_err(|e| LauncherError::Launch {
            program: config.runtime.clone(),
            code: e.raw_os_error().unwrap_or(START_FAILED),
        })?;
        info!("Runtime started (PID {})", child.id());

        Ok(Self {
            child,
            exit_code: None,
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn is_alive(&self) -> bool {
        self.exit_code.is_none()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Check without blocking; records and returns the exit code once the
    /// child has ended.
    pub fn poll(&mut self) -> LauncherResult<Option<i32>> {
        if self.exit_code.is_none() {
            if let Some(status) = self.child.try_wait()? {
                self.exit_code = Some(exit_status_code(status));
            }
        }
        Ok(self.exit_code)
    }

    /// Block until the child ends and record its exit code.
    pub fn wait(&mut self) -> LauncherResult<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let code = exit_status_code(self.child.wait()?);
        self.exit_code = Some(code);
        Ok(code)
    }
}

/// Exit status as a process exit code. A Unix signal death maps to
/// `128 + signal`, as shells report it.
pub fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    START_FAILED
}

/// Spawn `config` and wait for it, pumping the splash meanwhile.
#[instrument(skip_all, fields(program = ?config.runtime))]
pub fn run_spawned(config: &LaunchConfiguration, bridge: &SplashBridge) -> LauncherResult<i32> {
    enter(SpawnedPhase::Idle);
    let mut process = ProcessHandle::spawn(config)?;
    enter(SpawnedPhase::Spawned);

    let scheduler = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| LauncherError::Other(format!("cannot start supervisor: {}", e)))?;

    enter(SpawnedPhase::Supervising);
    let code = scheduler.block_on(supervise(&mut process, bridge))?;
    enter(SpawnedPhase::Terminated);

    info!("Runtime exited with code {}", code);
    Ok(code)
}

async fn supervise(process: &mut ProcessHandle, bridge: &SplashBridge) -> LauncherResult<i32> {
    let mut exit_check = interval(EXIT_CHECK_INTERVAL);
    let mut pump = interval(PUMP_INTERVAL);
    exit_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    pump.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = exit_check.tick() => {
                match process.poll() {
                    Ok(Some(code)) => return Ok(code),
                    Ok(None) => {}
                    Err(e) => {
                        // the child must not outlive supervision
                        warn!("Cannot poll runtime (PID {}): {}; waiting for it", process.id(), e);
                        return process.wait();
                    }
                }
            }
            _ = pump.tick() => bridge.request_repaint(),
        }
    }
}
