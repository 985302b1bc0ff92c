// ─── Installed Runtime Registry ───
// Second-tier discovery: runtimes the host knows about outside the
// launcher's own layout (Windows registry, well-known install roots).

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::core::version::Version;

/// Registry key listing installed runtimes on Windows.
pub const WINDOWS_RUNTIME_KEY: &str = r"HKLM\Software\JavaSoft\Java Runtime Environment";

/// One installed runtime as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRuntime {
    pub version: String,
    pub library: Option<PathBuf>,
}

/// Installed runtimes in registry enumeration order, plus the version the
/// host marks as current.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub current: Option<String>,
    pub entries: Vec<RegisteredRuntime>,
}

/// The minimum runtime version accepted from the registry.
pub fn default_minimum() -> Version {
    Version::new(1, 4, 0)
}

/// Pick the library of the current runtime, else of the first entry whose
/// version is at least `minimum`. Only libraries that exist as regular files
/// qualify.
pub fn select_registered_library(snapshot: &RegistrySnapshot, minimum: &Version) -> Option<PathBuf> {
    let usable = |entry: &RegisteredRuntime| {
        entry
            .library
            .as_ref()
            .filter(|library| library.is_file())
            .cloned()
    };

    if let Some(current) = &snapshot.current {
        let found = snapshot
            .entries
            .iter()
            .filter(|entry| &entry.version == current)
            .find_map(usable);
        if found.is_some() {
            return found;
        }
    }

    snapshot
        .entries
        .iter()
        .filter(|entry| Version::parse(&entry.version) >= *minimum)
        .find_map(usable)
}

/// Query the Windows registry through `reg.exe`.
pub fn query_windows_registry() -> RegistrySnapshot {
    let output = match Command::new("reg")
        .args(["query", WINDOWS_RUNTIME_KEY, "/s"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!("reg query exited with {}", output.status);
            return RegistrySnapshot::default();
        }
        Err(e) => {
            warn!("Cannot run reg query: {}", e);
            return RegistrySnapshot::default();
        }
    };

    parse_reg_query(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `reg query <key> /s` output: the root key's `CurrentVersion` value and
/// each version subkey's `RuntimeLib` value.
pub fn parse_reg_query(output: &str) -> RegistrySnapshot {
    let mut snapshot = RegistrySnapshot::default();
    let root = WINDOWS_RUNTIME_KEY
        .rsplit('\\')
        .next()
        .unwrap_or(WINDOWS_RUNTIME_KEY);
    let mut current_key: Option<String> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if !line.starts_with(char::is_whitespace) {
            // key header: `HKEY_LOCAL_MACHINE\...\Java Runtime Environment[\1.8]`
            let (parent, name) = line.trim().rsplit_once('\\').unwrap_or(("", line.trim()));
            current_key = if name == root {
                None
            } else if parent.ends_with(root) {
                snapshot.entries.push(RegisteredRuntime {
                    version: name.to_string(),
                    library: None,
                });
                Some(name.to_string())
            } else {
                // deeper subkeys (e.g. `1.8\MSI`) carry nothing we need
                Some(String::new())
            };
            continue;
        }

        let Some((value_name, value)) = split_reg_value(line) else {
            continue;
        };
        match (current_key.as_deref(), value_name) {
            (None, "CurrentVersion") => snapshot.current = Some(value.to_string()),
            (Some(version), "RuntimeLib") if !version.is_empty() => {
                if let Some(entry) = snapshot
                    .entries
                    .iter_mut()
                    .rev()
                    .find(|entry| entry.version == version)
                {
                    entry.library = Some(PathBuf::from(value));
                }
            }
            _ => {}
        }
    }

    snapshot
}

/// Split `    Name    REG_SZ    Value with spaces` into name and value.
fn split_reg_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    let type_start = trimmed.find("    REG_")?;
    let name = trimmed[..type_start].trim();
    let after_type = trimmed[type_start..].trim_start();
    let value = after_type
        .split_once(char::is_whitespace)
        .map(|(_, value)| value.trim())
        .unwrap_or("");
    Some((name, value))
}

/// Scan install roots whose children are runtime homes
/// (`/usr/lib/jvm/java-17-openjdk-amd64`). The version comes from the first
/// digit run of each directory name; `locate` maps a home to its library.
pub fn scan_install_roots<F>(roots: &[PathBuf], locate: F) -> RegistrySnapshot
where
    F: Fn(&Path) -> Option<PathBuf>,
{
    let mut entries = Vec::new();
    for root in roots {
        let Ok(dir) = std::fs::read_dir(root) else {
            continue;
        };
        let mut homes: Vec<PathBuf> = dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        homes.sort();

        for home in homes {
            let name = home
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let version = name
                .find(|c: char| c.is_ascii_digit())
                .map(|start| name[start..].to_string())
                .unwrap_or_default();
            entries.push(RegisteredRuntime {
                version,
                library: locate(&home),
            });
        }
    }

    // newest first so the first qualifying entry is also the best one
    entries.sort_by(|a, b| Version::parse(&b.version).cmp(&Version::parse(&a.version)));
    RegistrySnapshot {
        current: None,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REG_OUTPUT: &str = r"
HKEY_LOCAL_MACHINE\Software\JavaSoft\Java Runtime Environment
    CurrentVersion    REG_SZ    1.8
    BrowserJavaVersion    REG_SZ    11.201.2

HKEY_LOCAL_MACHINE\Software\JavaSoft\Java Runtime Environment\1.3
    JavaHome    REG_SZ    C:\Program Files\Java\j2re1.3
    RuntimeLib    REG_SZ    C:\Program Files\Java\j2re1.3\bin\hotspot\jvm.dll

HKEY_LOCAL_MACHINE\Software\JavaSoft\Java Runtime Environment\1.8
    JavaHome    REG_SZ    C:\Program Files\Java\jre1.8.0_201
    RuntimeLib    REG_SZ    C:\Program Files\Java\jre1.8.0_201\bin\server\jvm.dll

HKEY_LOCAL_MACHINE\Software\JavaSoft\Java Runtime Environment\1.8\MSI
    FullVersion    REG_SZ    1.8.0_201
";

    #[test]
    fn parses_reg_query_output() {
        let snapshot = parse_reg_query(REG_OUTPUT);
        assert_eq!(snapshot.current.as_deref(), Some("1.8"));
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.entries[0].version, "1.3");
        assert_eq!(
            snapshot.entries[1].library,
            Some(PathBuf::from(
                r"C:\Program Files\Java\jre1.8.0_201\bin\server\jvm.dll"
            ))
        );
    }

    fn entry(version: &str, library: Option<&Path>) -> RegisteredRuntime {
        RegisteredRuntime {
            version: version.to_string(),
            library: library.map(Path::to_path_buf),
        }
    }

    #[test]
    fn current_version_is_tried_first() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.lib");
        let current = dir.path().join("current.lib");
        std::fs::write(&old, b"").unwrap();
        std::fs::write(&current, b"").unwrap();

        let snapshot = RegistrySnapshot {
            current: Some("1.6".into()),
            entries: vec![entry("1.5", Some(&old)), entry("1.6", Some(&current))],
        };
        assert_eq!(
            select_registered_library(&snapshot, &default_minimum()),
            Some(current)
        );
    }

    #[test]
    fn falls_back_to_first_entry_above_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let too_old = dir.path().join("13.lib");
        let good = dir.path().join("15.lib");
        std::fs::write(&too_old, b"").unwrap();
        std::fs::write(&good, b"").unwrap();

        let snapshot = RegistrySnapshot {
            current: Some("9.9".into()),
            entries: vec![
                entry("1.3", Some(&too_old)),
                entry("1.4", Some(&dir.path().join("missing.lib"))),
                entry("1.5", Some(&good)),
            ],
        };
        assert_eq!(
            select_registered_library(&snapshot, &default_minimum()),
            Some(good)
        );
    }

    #[test]
    fn empty_registry_yields_nothing() {
        assert_eq!(
            select_registered_library(&RegistrySnapshot::default(), &default_minimum()),
            None
        );
    }

    #[test]
    fn install_roots_are_ordered_newest_first() {
        let root = tempfile::tempdir().unwrap();
        for name in ["java-11-openjdk", "java-17-openjdk", "default-runtime"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }

        let snapshot = scan_install_roots(&[root.path().to_path_buf()], |home| {
            Some(home.join("lib/server/libjvm.so"))
        });
        let versions: Vec<_> = snapshot.entries.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, ["17-openjdk", "11-openjdk", ""]);
    }
}
