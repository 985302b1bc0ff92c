// ─── Launcher Configuration Files ───
// `<program>.ini` next to the launcher (or in the user config dir) and `.ee`
// descriptors share one format: one argument per line.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Read an argument file: one argument per line, blank lines and `#`
/// comments skipped, trailing whitespace removed.
pub fn read_arg_file(path: &Path) -> LauncherResult<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(raw
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim_start().is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Locations probed for the launcher ini, in order.
pub fn ini_candidates(program_dir: &Path, program_name: &str) -> Vec<PathBuf> {
    let file_name = format!("{}.ini", program_name);
    let mut candidates = vec![program_dir.join(&file_name)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join(program_name).join(&file_name));
    }
    candidates
}

/// Arguments from the first launcher ini found; none when no ini exists.
pub fn load_launcher_ini(program_dir: &Path, program_name: &str) -> LauncherResult<Vec<String>> {
    for candidate in ini_candidates(program_dir, program_name) {
        if candidate.is_file() {
            let args = read_arg_file(&candidate)?;
            info!("Loaded {} arguments from {:?}", args.len(), candidate);
            return Ok(args);
        }
        debug!("No launcher ini at {:?}", candidate);
    }
    Ok(Vec::new())
}
