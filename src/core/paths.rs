// ─── Path Resolution ───
// Turns launcher-relative names into absolute, existing paths.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::core::error::{LauncherError, LauncherResult};

/// Separator used in path lists such as `ee.library.path`.
pub const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Directory containing the running launcher, with links resolved.
pub fn program_dir() -> LauncherResult<PathBuf> {
    let exe = std::env::current_exe()?;
    let exe = resolve_symlinks(&exe);
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| LauncherError::NotFound(exe.clone()))
}

/// Locate `name` the way a shell would, returning an absolute path with
/// symbolic links resolved.
pub fn resolve_command(name: &str) -> LauncherResult<PathBuf> {
    let cwd = std::env::current_dir()?;
    let path_var = std::env::var_os("PATH");
    resolve_command_in(name, path_var.as_deref(), &cwd)
}

/// [`resolve_command`] with an explicit `PATH` value and working directory.
#[instrument(skip(path_var, cwd))]
pub fn resolve_command_in(
    name: &str,
    path_var: Option<&OsStr>,
    cwd: &Path,
) -> LauncherResult<PathBuf> {
    let command = Path::new(name);

    let candidate = if command.is_absolute() {
        Some(with_exe_suffix(command.to_path_buf()))
    } else if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        Some(with_exe_suffix(cwd.join(command)))
    } else {
        let Some(path_var) = path_var else {
            debug!("PATH is not set, cannot resolve {}", name);
            return Err(LauncherError::NotFound(command.to_path_buf()));
        };
        std::env::split_paths(path_var)
            .map(|dir| {
                // empty and "." entries mean the working directory
                let dir = if dir.as_os_str().is_empty() || dir == Path::new(".") {
                    cwd.to_path_buf()
                } else {
                    dir
                };
                with_exe_suffix(dir.join(command))
            })
            .find(|path| path.is_file())
    };

    match candidate {
        Some(path) if path.is_file() => {
            let resolved = resolve_symlinks(&path);
            debug!("Resolved command {} to {:?}", name, resolved);
            Ok(resolved)
        }
        _ => Err(LauncherError::NotFound(command.to_path_buf())),
    }
}

/// Append the platform executable suffix when the bare path does not exist.
fn with_exe_suffix(path: PathBuf) -> PathBuf {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || path.is_file() {
        return path;
    }
    let already_suffixed = path
        .to_string_lossy()
        .to_ascii_lowercase()
        .ends_with(suffix);
    if already_suffixed {
        return path;
    }
    let mut raw = path.into_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Fully resolve symbolic links; a path that cannot be resolved is returned
/// unchanged.
pub fn resolve_symlinks(path: &Path) -> PathBuf {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    #[cfg(target_os = "windows")]
    {
        // canonicalize yields extended-length paths (`\\?\C:\...`) that many
        // runtimes reject on their command line.
        let text = resolved.to_string_lossy();
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return PathBuf::from(stripped);
        }
    }

    resolved
}

/// Make a relative `path` absolute by probing the working directory and
/// `base_dir` (base first when `prefer_base`). Returns `path` unchanged when
/// it is absolute or when neither location exists.
pub fn check_path(path: &Path, base_dir: &Path, prefer_base: bool) -> PathBuf {
    match std::env::current_dir() {
        Ok(cwd) => check_path_in(path, base_dir, prefer_base, &cwd),
        Err(_) => check_path_in(path, base_dir, prefer_base, base_dir),
    }
}

/// [`check_path`] with an explicit working directory.
pub fn check_path_in(path: &Path, base_dir: &Path, prefer_base: bool, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let order = if prefer_base {
        [base_dir, cwd]
    } else {
        [cwd, base_dir]
    };

    order
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Apply [`check_path`] to every entry of a separator-joined path list.
pub fn check_path_list(list: &str, base_dir: &Path, prefer_base: bool) -> String {
    match std::env::current_dir() {
        Ok(cwd) => check_path_list_in(list, base_dir, prefer_base, &cwd),
        Err(_) => check_path_list_in(list, base_dir, prefer_base, base_dir),
    }
}

/// [`check_path_list`] with an explicit working directory.
pub fn check_path_list_in(list: &str, base_dir: &Path, prefer_base: bool, cwd: &Path) -> String {
    list.split(PATH_LIST_SEPARATOR)
        .map(|entry| {
            if entry.is_empty() {
                return String::new();
            }
            check_path_in(Path::new(entry), base_dir, prefer_base, cwd)
                .to_string_lossy()
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join(&PATH_LIST_SEPARATOR.to_string())
}
