// ─── Execution Environment Descriptors ───
// `.ee` files describe a runtime installation: which executable and library
// to use, its native library path, and extra runtime arguments.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::config::read_arg_file;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::{check_path, check_path_list, PATH_LIST_SEPARATOR};

const EE_HOME: &str = "${ee.home}";
const EE_EXECUTABLE: &str = "-Dee.executable=";
const EE_CONSOLE: &str = "-Dee.executable.console=";
const EE_VM_LIBRARY: &str = "-Dee.vm.library=";
const EE_LIBRARY_PATH: &str = "-Dee.library.path=";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionEnvironment {
    pub executable: Option<PathBuf>,
    pub console_executable: Option<PathBuf>,
    pub vm_library: Option<PathBuf>,
    pub library_path: Vec<PathBuf>,
    /// Every descriptor line, in order, after `${ee.home}` substitution.
    pub runtime_args: Vec<String>,
}

/// Read and interpret the descriptor at `path`.
#[instrument]
pub fn read_descriptor(path: &Path) -> LauncherResult<ExecutionEnvironment> {
    if !path.is_file() {
        return Err(LauncherError::NotFound(path.to_path_buf()));
    }
    let lines = read_arg_file(path)?;
    let ee_home = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(parse_descriptor(&lines, &ee_home))
}

/// Interpret descriptor lines relative to `ee_home`.
pub fn parse_descriptor(lines: &[String], ee_home: &Path) -> ExecutionEnvironment {
    let home = ee_home.to_string_lossy();
    let mut env = ExecutionEnvironment::default();

    for line in lines {
        let line = line.replace(EE_HOME, &home);

        // the console variant shares the executable prefix, test it first
        if let Some(value) = line.strip_prefix(EE_CONSOLE) {
            env.console_executable = Some(check_path(Path::new(value), ee_home, true));
        } else if let Some(value) = line.strip_prefix(EE_EXECUTABLE) {
            env.executable = Some(check_path(Path::new(value), ee_home, true));
        } else if let Some(value) = line.strip_prefix(EE_VM_LIBRARY) {
            env.vm_library = Some(check_path(Path::new(value), ee_home, true));
        } else if let Some(value) = line.strip_prefix(EE_LIBRARY_PATH) {
            env.library_path = check_path_list(value, ee_home, true)
                .split(PATH_LIST_SEPARATOR)
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        env.runtime_args.push(line);
    }

    debug!(
        "Descriptor at {:?}: executable={:?} library={:?}",
        ee_home, env.executable, env.vm_library
    );
    env
}
