use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::core::error::{LauncherError, LauncherResult};

use super::compare::Version;

/// Separator between a package name and its version (`name_1.2.3`).
const VERSION_MARKER: char = '_';

/// Find `directory/prefix_<version>[...]` with the highest version.
///
/// Entries carrying an extra name segment after the prefix
/// (`prefix_extra_1.0`) are ignored. Entries are visited in file-name order
/// so that, among equal versions, the result does not depend on how the
/// filesystem happens to enumerate them.
#[instrument(skip(directory), fields(directory = %directory.display()))]
pub fn find_latest(directory: &Path, prefix: &str) -> LauncherResult<Option<PathBuf>> {
    if !directory.is_dir() {
        return Err(LauncherError::NotFound(directory.to_path_buf()));
    }

    let entries = std::fs::read_dir(directory).map_err(|source| LauncherError::Io {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| version_suffix(name, prefix).is_some())
        .collect();
    names.sort();

    let mut best: Option<(Version, &str)> = None;
    for name in &names {
        let Some(suffix) = version_suffix(name, prefix) else {
            continue;
        };
        let version = Version::parse(suffix);
        let newer = match &best {
            Some((current, _)) => version > *current,
            None => true,
        };
        if newer {
            best = Some((version, name.as_str()));
        }
    }

    let result = best.map(|(version, name)| {
        debug!("Latest {} is {} ({})", prefix, name, version);
        directory.join(name)
    });
    Ok(result)
}

/// The text after `prefix_` when `name` is a versioned entry for `prefix`.
fn version_suffix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    let suffix = rest.strip_prefix(VERSION_MARKER)?;
    if suffix.is_empty() {
        return None;
    }

    match suffix.find(VERSION_MARKER) {
        // a second marker is only allowed inside the version (after a dot)
        Some(marker) => match suffix.find('.') {
            Some(dot) if dot < marker => Some(suffix),
            _ => None,
        },
        None => Some(suffix),
    }
}
