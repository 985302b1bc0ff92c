pub mod command_line;
pub mod config;
pub mod embedded;
pub mod native;
pub mod restart;
pub mod spawned;
pub mod supervisor;

pub use config::LaunchConfiguration;
pub use embedded::{EmbeddedRuntime, RuntimeLoader};
pub use native::NativeLoader;
pub use restart::{next_step, NextStep};
pub use spawned::ProcessHandle;
pub use supervisor::{LaunchOutcome, LaunchStrategy, LaunchSupervisor};
