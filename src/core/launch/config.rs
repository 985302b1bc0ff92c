use std::path::PathBuf;

use serde::Serialize;

use crate::core::error::{LauncherError, LauncherResult};

/// What to start and with which arguments. Built once per launch attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LaunchConfiguration {
    /// Runtime library (embedded) or executable (spawned).
    pub runtime: PathBuf,
    /// Arguments for the runtime itself, before the program arguments.
    pub runtime_args: Vec<String>,
    pub program_args: Vec<String>,
    /// Native library search path handed to the runtime.
    pub library_path: Vec<PathBuf>,
}

impl LaunchConfiguration {
    pub fn new(runtime: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
            ..Self::default()
        }
    }

    pub fn with_runtime_args(mut self, args: Vec<String>) -> Self {
        self.runtime_args = args;
        self
    }

    pub fn with_program_args(mut self, args: Vec<String>) -> Self {
        self.program_args = args;
        self
    }

    pub fn with_library_path(mut self, path: Vec<PathBuf>) -> Self {
        self.library_path = path;
        self
    }

    /// Runtime arguments followed by program arguments.
    pub fn command_args(&self) -> Vec<String> {
        self.runtime_args
            .iter()
            .chain(&self.program_args)
            .cloned()
            .collect()
    }

    /// An embedded runtime needs at least one runtime argument, none of them
    /// empty or containing NUL.
    pub fn validate_embedded(&self) -> LauncherResult<()> {
        if self.runtime_args.is_empty() {
            return Err(LauncherError::InvalidConfiguration(
                "embedded launch requires at least one runtime argument".into(),
            ));
        }
        if let Some(bad) = self
            .runtime_args
            .iter()
            .chain(&self.program_args)
            .find(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(LauncherError::InvalidConfiguration(format!(
                "malformed argument {:?}",
                bad
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_runtime_args_is_invalid_for_embedding() {
        let config = LaunchConfiguration::new("/opt/vm/libvm.so")
            .with_program_args(vec!["-data".into()]);
        assert!(matches!(
            config.validate_embedded(),
            Err(LauncherError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let config = LaunchConfiguration::new("/opt/vm/libvm.so")
            .with_runtime_args(vec!["-Xmx1g".into(), "bad\0arg".into()]);
        assert!(config.validate_embedded().is_err());

        let ok = LaunchConfiguration::new("/opt/vm/libvm.so").with_runtime_args(vec!["-Xmx1g".into()]);
        assert!(ok.validate_embedded().is_ok());
    }

    #[test]
    fn command_args_keep_runtime_args_first() {
        let config = LaunchConfiguration::new("java")
            .with_runtime_args(vec!["-Xmx1g".into(), "-jar".into(), "startup.jar".into()])
            .with_program_args(vec!["-clean".into()]);
        assert_eq!(config.command_args(), vec!["-Xmx1g", "-jar", "startup.jar", "-clean"]);
    }

    #[test]
    fn plan_serializes_to_json() {
        let config = LaunchConfiguration::new("java").with_runtime_args(vec!["-Xmx1g".into()]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["runtime"], "java");
        assert_eq!(json["runtime_args"][0], "-Xmx1g");
    }
}
