use std::path::{Path, PathBuf};

use serde::Serialize;

/// Extension of execution-environment descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "ee";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Directory,
    Library,
    DescriptorFile,
    Executable,
    Other,
}

/// A path the user (or discovery) proposed as the runtime, with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeCandidate {
    path: PathBuf,
    kind: RuntimeKind,
}

impl RuntimeCandidate {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> RuntimeKind {
        self.kind
    }
}

/// Classify `path` by directory test, then extension, then file mode.
///
/// Missing paths are still classified from their name; launching them fails
/// later with `NotFound`.
pub fn classify(path: &Path) -> RuntimeCandidate {
    let metadata = std::fs::metadata(path).ok();

    let kind = if metadata.as_ref().is_some_and(|m| m.is_dir()) {
        RuntimeKind::Directory
    } else if is_library(path) {
        RuntimeKind::Library
    } else if is_descriptor(path) {
        RuntimeKind::DescriptorFile
    } else if metadata.as_ref().is_some_and(is_executable) {
        RuntimeKind::Executable
    } else {
        RuntimeKind::Other
    };

    RuntimeCandidate {
        path: path.to_path_buf(),
        kind,
    }
}

/// True when `path` carries the host's shared-library extension.
pub fn is_library(path: &Path) -> bool {
    has_extension(path, std::env::consts::DLL_EXTENSION)
}

/// True when `path` names an execution-environment descriptor.
pub fn is_descriptor(path: &Path) -> bool {
    has_extension(path, DESCRIPTOR_EXTENSION)
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected))
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    metadata.is_file()
}
