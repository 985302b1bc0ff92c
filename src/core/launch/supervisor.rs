use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::config::LaunchConfiguration;
use super::embedded::{run_embedded, RuntimeLoader};
use super::native::NativeLoader;
use super::spawned::run_spawned;
use crate::core::error::LauncherResult;
use crate::core::splash::SplashBridge;
use crate::core::state::LauncherContext;

/// Program argument naming the shared exit-data slot of a spawned runtime.
pub const EXIT_DATA_ARG: &str = "-exitdata";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStrategy {
    /// Load the runtime library and call it on this thread.
    Embedded,
    /// Run the runtime executable as a child process.
    Spawned,
}

/// Result of one supervised run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchOutcome {
    pub strategy: LaunchStrategy,
    pub exit_code: i32,
    pub exit_data: Option<String>,
    /// Unhandled faults reported by an embedded runtime.
    pub fault: Option<String>,
}

/// Starts a runtime with one strategy and blocks until it ends.
pub struct LaunchSupervisor {
    context: Arc<LauncherContext>,
    loader: Box<dyn RuntimeLoader>,
}

impl LaunchSupervisor {
    pub fn new(context: Arc<LauncherContext>) -> Self {
        Self {
            context,
            loader: Box::new(NativeLoader),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn RuntimeLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn context(&self) -> &Arc<LauncherContext> {
        &self.context
    }

    pub fn bridge(&self) -> SplashBridge {
        SplashBridge::new(self.context.clone())
    }

    /// Run `config` with `strategy`. The splash is taken down when the run
    /// ends, successful or not.
    #[instrument(skip(self, config), fields(runtime = ?config.runtime))]
    pub fn launch(
        &self,
        strategy: LaunchStrategy,
        config: &LaunchConfiguration,
    ) -> LauncherResult<LaunchOutcome> {
        let bridge = self.bridge();
        let result = match strategy {
            LaunchStrategy::Embedded => run_embedded(self.loader.as_ref(), config, &bridge)
                .map(|outcome| (outcome.exit_code, outcome.fault.map(|fault| fault.to_string()))),
            LaunchStrategy::Spawned => self.launch_spawned(config, &bridge).map(|code| (code, None)),
        };
        bridge.take_down();

        let (exit_code, fault) = result?;
        let outcome = LaunchOutcome {
            strategy,
            exit_code,
            exit_data: self.context.exit_data(),
            fault,
        };
        info!("{:?} launch finished with exit code {}", strategy, exit_code);
        Ok(outcome)
    }

    /// A spawned runtime reports exit data through a shared slot created
    /// here and named on its command line, unless the arguments already name
    /// one owned by another process.
    fn launch_spawned(&self, config: &LaunchConfiguration, bridge: &SplashBridge) -> LauncherResult<i32> {
        let slot = if config.program_args.iter().any(|arg| arg == EXIT_DATA_ARG) {
            None
        } else {
            match self.context.create_shared_exit_data() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Spawned runtime cannot report exit data: {}", e);
                    None
                }
            }
        };

        let mut config = config.clone();
        if let Some(id) = &slot {
            config.program_args.push(EXIT_DATA_ARG.to_string());
            config.program_args.push(id.clone());
        }

        let result = run_spawned(&config, bridge);
        if let Some(id) = &slot {
            if let Err(e) = self.context.collect_shared_exit_data(id) {
                warn!("Failed to read exit data {}: {}", id, e);
            }
        }
        result
    }
}
