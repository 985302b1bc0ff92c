pub mod cli;
pub mod core;
pub mod launcher;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::cli::{parse_args, LauncherArgs};
use crate::core::error::LauncherResult;
use crate::core::launch::LaunchSupervisor;
use crate::core::state::LauncherContext;
use crate::launcher::Launcher;

const DEFAULT_FILTER: &str = "warn,runtime_launcher=info";
const DEBUG_FILTER: &str = "debug";

/// Run the launcher with this process's arguments and return the exit code.
pub fn run() -> i32 {
    let program = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("launcher"));
    let user_args: Vec<String> = std::env::args().skip(1).collect();

    let program_dir = match core::paths::program_dir() {
        Ok(dir) => dir,
        Err(e) => {
            init_logging(user_args.iter().any(|a| a == cli::args::DEBUG));
            tracing::error!("Cannot locate launcher directory: {}", e);
            return e.exit_code();
        }
    };
    let program_name = program
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "launcher".to_string());

    let ini_args = core::config::load_launcher_ini(&program_dir, &program_name);
    let args = ini_args
        .as_ref()
        .map(|ini| ini.iter().chain(&user_args).cloned().collect::<Vec<_>>())
        .unwrap_or_else(|_| user_args.clone());
    let parsed = parse_args(args);

    init_logging(parsed.as_ref().is_ok_and(|a| a.debug));
    tracing::info!("Launcher starting from {:?}", program_dir);
    if let Err(e) = &ini_args {
        tracing::warn!("Ignoring launcher ini: {}", e);
    }

    match parsed.and_then(|args| launch(program, program_dir, args)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Launch failed: {}", e);
            e.exit_code()
        }
    }
}

fn launch(program: PathBuf, program_dir: PathBuf, args: LauncherArgs) -> LauncherResult<i32> {
    if args.debug {
        tracing::debug!("Launcher arguments: {}", serde_json::to_string(&args)?);
    }
    let context = Arc::new(LauncherContext::headless());
    let launcher = Launcher::new(program, program_dir, LaunchSupervisor::new(context));
    launcher.run(args)
}

/// Structured logging to stderr. `RUST_LOG` wins over `-debug`.
fn init_logging(debug: bool) {
    let default = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .try_init();
}
