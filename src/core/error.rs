use std::path::PathBuf;
use thiserror::Error;

/// Exit status reported when the runtime could not be started at all,
/// before the runtime itself produced any exit code.
pub const START_FAILED: i32 = -1;

/// Central error type for the launcher.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not found: {0:?}")]
    NotFound(PathBuf),

    // ── Runtime library ─────────────────────────────────
    #[error("Cannot load runtime library {path:?}: {reason}")]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("Runtime creation failed with code {0}")]
    VmInit(i32),

    #[error("Runtime reported an unhandled fault: {0}")]
    RuntimeFault(String),

    // ── Child process ───────────────────────────────────
    #[error("Failed to launch {program:?}: OS error {code}")]
    Launch { program: PathBuf, code: i32 },

    // ── Splash ──────────────────────────────────────────
    #[error("Cannot load splash image {path:?}: {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    // ── Configuration ───────────────────────────────────
    #[error("Invalid launch configuration: {0}")]
    InvalidConfiguration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// Process exit status for a launch that failed before the runtime
    /// could report its own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            LauncherError::Launch { code, .. } => *code,
            _ => START_FAILED,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_error_exit_code_is_os_code() {
        let err = LauncherError::Launch {
            program: PathBuf::from("/missing/java"),
            code: 2,
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn start_failures_use_sentinel_exit_code() {
        let err = LauncherError::LibraryLoad {
            path: PathBuf::from("libjvm.so"),
            reason: "missing symbol".into(),
        };
        assert_eq!(err.exit_code(), START_FAILED);
        assert_eq!(LauncherError::VmInit(-6).exit_code(), START_FAILED);
    }
}
