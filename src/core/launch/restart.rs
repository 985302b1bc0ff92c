use tracing::{error, info, warn};

use super::supervisor::LaunchOutcome;

/// Exit code asking for a relaunch with the same arguments.
pub const RESTART_LAST_EXIT_CODE: i32 = 23;
/// Exit code asking for a relaunch with the arguments in the exit data.
pub const RESTART_NEW_EXIT_CODE: i32 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Exit(i32),
    Relaunch,
    RelaunchWith(Vec<String>),
}

/// Decide what follows a finished run.
pub fn next_step(outcome: &LaunchOutcome) -> NextStep {
    match outcome.exit_code {
        RESTART_LAST_EXIT_CODE => {
            info!("Runtime requested a restart");
            NextStep::Relaunch
        }
        RESTART_NEW_EXIT_CODE => match outcome.exit_data.as_deref() {
            Some(data) => {
                let args = relaunch_args(data);
                info!("Runtime requested a restart with {} arguments", args.len());
                NextStep::RelaunchWith(args)
            }
            None => {
                warn!("Restart with new arguments requested but no exit data was set");
                NextStep::Exit(RESTART_NEW_EXIT_CODE)
            }
        },
        0 => NextStep::Exit(0),
        code => {
            match outcome.exit_data.as_deref().filter(|data| !data.trim().is_empty()) {
                Some(message) => error!("Runtime exited with code {}:\n{}", code, message),
                None => {
                    if let Some(fault) = &outcome.fault {
                        error!("Runtime exited with code {}: {}", code, fault);
                    }
                }
            }
            NextStep::Exit(code)
        }
    }
}

/// One argument per non-empty line.
pub fn relaunch_args(data: &str) -> Vec<String> {
    data.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
