pub mod context;

pub use context::LauncherContext;
