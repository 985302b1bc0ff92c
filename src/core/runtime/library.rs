// ─── Runtime Library Resolution ───
// From an executable (`.../bin/java`) to the embeddable shared library next
// to it, with a host-specific fallback when the layout is unknown.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::classify::is_library;
use super::registry::{self, RegistrySnapshot};
use crate::core::version::Version;

/// Host-specific knowledge of where runtime libraries live.
pub trait RuntimeLocationStrategy: Send + Sync {
    /// File name of the embeddable library (`libjvm.so`, `jvm.dll`).
    fn library_name(&self) -> &str;

    /// Directories, relative to the executable's directory, probed in order.
    fn relative_locations(&self) -> Vec<String>;

    /// Installed runtimes known to the host, consulted after the fixed
    /// layout.
    fn registry(&self) -> RegistrySnapshot {
        RegistrySnapshot::default()
    }

    /// Minimum version accepted from [`RuntimeLocationStrategy::registry`].
    fn minimum_version(&self) -> Version {
        registry::default_minimum()
    }
}

/// Derives the embeddable runtime library for an executable.
pub struct RuntimeLibraryResolver {
    strategy: Box<dyn RuntimeLocationStrategy>,
}

impl RuntimeLibraryResolver {
    pub fn new(strategy: Box<dyn RuntimeLocationStrategy>) -> Self {
        Self { strategy }
    }

    /// Resolver for the platform this binary was built for.
    pub fn for_host() -> Self {
        Self::new(host_strategy())
    }

    pub fn library_name(&self) -> &str {
        self.strategy.library_name()
    }

    /// Return `executable` when it already is a library, else the first
    /// existing `<exe dir>/<location>/<library name>`, else the registry's
    /// choice.
    #[instrument(skip(self))]
    pub fn find_library(&self, executable: Option<&Path>) -> Option<PathBuf> {
        if let Some(executable) = executable {
            if is_library(executable) {
                return Some(executable.to_path_buf());
            }
            if let Some(found) = self.find_in_layout(executable) {
                info!("Runtime library found next to executable: {:?}", found);
                return Some(found);
            }
        }

        let snapshot = self.strategy.registry();
        let found = registry::select_registered_library(&snapshot, &self.strategy.minimum_version());
        match &found {
            Some(path) => info!("Runtime library found in registry: {:?}", path),
            None => debug!("No runtime library found"),
        }
        found
    }

    /// Probe only the fixed relative layout around `executable`.
    pub fn find_in_layout(&self, executable: &Path) -> Option<PathBuf> {
        let base = executable.parent()?;
        let library_name = self.strategy.library_name();
        self.strategy
            .relative_locations()
            .iter()
            .map(|location| base.join(location).join(library_name))
            .inspect(|candidate| debug!("Probing {:?}", candidate))
            .find(|candidate| candidate.is_file())
    }
}

/// VM implementation folders, each probed next to the executable and under
/// the sibling `jre/bin` of its parent.
const VM_FOLDERS: [&str; 5] = ["j9vm", "client", "server", "classic", "jrockit"];

fn sibling_and_jre_locations(separator: &str) -> Vec<String> {
    VM_FOLDERS
        .iter()
        .flat_map(|folder| {
            [
                folder.to_string(),
                format!("..{sep}jre{sep}bin{sep}{folder}", sep = separator),
            ]
        })
        .collect()
}

/// Windows: `jvm.dll` below `bin`, registry fallback.
pub struct WindowsLayout;

impl RuntimeLocationStrategy for WindowsLayout {
    fn library_name(&self) -> &str {
        "jvm.dll"
    }

    fn relative_locations(&self) -> Vec<String> {
        sibling_and_jre_locations("\\")
    }

    fn registry(&self) -> RegistrySnapshot {
        if cfg!(windows) {
            registry::query_windows_registry()
        } else {
            RegistrySnapshot::default()
        }
    }
}

/// Linux and other Unix: `libjvm.so` below `bin` (old layout) or
/// `lib[/<arch>]` (modern layout), install-root fallback.
pub struct UnixLayout {
    arch: String,
    install_roots: Vec<PathBuf>,
}

impl UnixLayout {
    pub fn new(arch: impl Into<String>, install_roots: Vec<PathBuf>) -> Self {
        Self {
            arch: arch.into(),
            install_roots,
        }
    }

    pub fn for_host() -> Self {
        let mut roots = Vec::new();
        if let Some(home) = std::env::var_os("JAVA_HOME") {
            // JAVA_HOME is a home, not a root; scan its parent
            if let Some(parent) = Path::new(&home).parent() {
                roots.push(parent.to_path_buf());
            }
        }
        roots.push(PathBuf::from("/usr/lib/jvm"));
        roots.push(PathBuf::from("/usr/java"));
        Self::new(arch_dir(), roots)
    }

    fn home_locations(&self) -> Vec<String> {
        let arch = &self.arch;
        vec![
            "lib/server".to_string(),
            format!("lib/{arch}/server"),
            format!("jre/lib/{arch}/server"),
            format!("lib/{arch}/client"),
            format!("jre/lib/{arch}/client"),
            format!("lib/{arch}/j9vm"),
            format!("jre/lib/{arch}/j9vm"),
        ]
    }
}

impl RuntimeLocationStrategy for UnixLayout {
    fn library_name(&self) -> &str {
        "libjvm.so"
    }

    fn relative_locations(&self) -> Vec<String> {
        let mut locations = sibling_and_jre_locations("/");
        locations.extend(
            self.home_locations()
                .into_iter()
                .map(|location| format!("../{location}")),
        );
        locations
    }

    fn registry(&self) -> RegistrySnapshot {
        let library_name = self.library_name().to_string();
        let locations = self.home_locations();
        registry::scan_install_roots(&self.install_roots, |home| {
            locations
                .iter()
                .map(|location| home.join(location).join(&library_name))
                .find(|candidate| candidate.is_file())
        })
    }
}

/// macOS: `libjvm.dylib` inside a JDK bundle, `JavaVirtualMachines` fallback.
pub struct MacLayout {
    install_roots: Vec<PathBuf>,
}

impl MacLayout {
    pub fn for_host() -> Self {
        Self {
            install_roots: vec![PathBuf::from("/Library/Java/JavaVirtualMachines")],
        }
    }
}

impl RuntimeLocationStrategy for MacLayout {
    fn library_name(&self) -> &str {
        "libjvm.dylib"
    }

    fn relative_locations(&self) -> Vec<String> {
        let mut locations = sibling_and_jre_locations("/");
        locations.push("../lib/server".to_string());
        locations.push("../jre/lib/server".to_string());
        locations
    }

    fn registry(&self) -> RegistrySnapshot {
        let library_name = self.library_name().to_string();
        registry::scan_install_roots(&self.install_roots, |bundle| {
            let candidate = bundle
                .join("Contents/Home/lib/server")
                .join(&library_name);
            candidate.is_file().then_some(candidate)
        })
    }
}

/// Strategy matching the build target.
pub fn host_strategy() -> Box<dyn RuntimeLocationStrategy> {
    if cfg!(target_os = "windows") {
        Box::new(WindowsLayout)
    } else if cfg!(target_os = "macos") {
        Box::new(MacLayout::for_host())
    } else {
        Box::new(UnixLayout::for_host())
    }
}

/// Architecture directory used by runtime layouts (`lib/amd64/server`).
fn arch_dir() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "powerpc64" => "ppc64",
        other => other,
    }
}
