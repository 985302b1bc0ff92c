// ─── Launcher Flow ───
// Find the startup archive and the runtime, choose a strategy, run it and
// follow restart requests.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cli::{parse_args, LauncherArgs};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::{
    next_step, LaunchConfiguration, LaunchOutcome, LaunchStrategy, LaunchSupervisor, NextStep,
};
use crate::core::paths::{check_path, resolve_command};
use crate::core::runtime::{classify, read_descriptor, RuntimeKind, RuntimeLibraryResolver};
use crate::core::version::find_latest;

/// Runtime executable looked up when none is configured.
pub const DEFAULT_EXECUTABLE: &str = if cfg!(windows) { "javaw.exe" } else { "java" };

const STARTUP_PREFIX: &str = "startup";
const PLUGINS_DIR: &str = "plugins";
const CLASS_PATH_PROPERTY: &str = "-Djava.class.path=";
const SPLASH_IMAGES: [&str; 3] = ["splash.bmp", "splash.png", "splash.gif"];

/// Startup archive: `-startup` when given, else the newest
/// `plugins/startup_<version>.jar`.
pub fn find_startup(program_dir: &Path, args: &LauncherArgs) -> LauncherResult<PathBuf> {
    if let Some(startup) = &args.startup {
        let path = check_path(startup, program_dir, true);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(LauncherError::NotFound(path))
        };
    }

    let plugins = program_dir.join(PLUGINS_DIR);
    find_latest(&plugins, STARTUP_PREFIX)?
        .ok_or_else(|| LauncherError::NotFound(plugins.join(STARTUP_PREFIX)))
}

/// The runtime a launch will use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedRuntime {
    pub executable: Option<PathBuf>,
    pub library: Option<PathBuf>,
    /// Arguments contributed by an execution-environment descriptor.
    pub runtime_args: Vec<String>,
    pub library_path: Vec<PathBuf>,
}

/// Work out executable and library from `-vm`, the shipped runtime or
/// `PATH`.
#[instrument(skip(resolver, args), fields(vm = ?args.vm))]
pub fn resolve_runtime(
    program_dir: &Path,
    args: &LauncherArgs,
    resolver: &RuntimeLibraryResolver,
) -> LauncherResult<ResolvedRuntime> {
    let mut resolved = ResolvedRuntime::default();

    match &args.vm {
        Some(vm) => {
            let candidate = classify(&check_path(vm, program_dir, true));
            debug!("-vm {:?} is {:?}", candidate.path(), candidate.kind());

            match candidate.kind() {
                RuntimeKind::Directory => {
                    let dir = candidate.path();
                    let executable = [
                        dir.join(DEFAULT_EXECUTABLE),
                        dir.join("bin").join(DEFAULT_EXECUTABLE),
                    ]
                    .into_iter()
                    .find(|path| path.is_file())
                    .ok_or_else(|| LauncherError::NotFound(dir.join(DEFAULT_EXECUTABLE)))?;
                    resolved.executable = Some(executable);
                }
                RuntimeKind::Library => {
                    resolved.library = Some(candidate.path().to_path_buf());
                }
                RuntimeKind::DescriptorFile => {
                    let env = read_descriptor(candidate.path())?;
                    resolved.executable = env.executable.or(env.console_executable);
                    resolved.library = env.vm_library;
                    resolved.library_path = env.library_path;
                    resolved.runtime_args = env.runtime_args;
                }
                RuntimeKind::Executable | RuntimeKind::Other => {
                    resolved.executable =
                        Some(resolve_command(&candidate.path().to_string_lossy())?);
                }
            }
        }
        None => {
            let shipped = program_dir.join("jre").join("bin").join(DEFAULT_EXECUTABLE);
            resolved.executable = Some(if shipped.is_file() {
                shipped
            } else {
                resolve_command(DEFAULT_EXECUTABLE)?
            });
        }
    }

    if resolved.library.is_none() {
        resolved.library = resolver.find_library(resolved.executable.as_deref());
    }
    info!(
        "Runtime: executable={:?} library={:?}",
        resolved.executable, resolved.library
    );
    Ok(resolved)
}

/// Strategy and configuration for one launch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    pub strategy: LaunchStrategy,
    pub configuration: LaunchConfiguration,
    /// Spawned configuration to retry with when the library cannot be loaded.
    pub fallback: Option<LaunchConfiguration>,
}

/// Embed when a library is known and spawning is not forced, else spawn.
pub fn plan_launch(
    startup: &Path,
    runtime: &ResolvedRuntime,
    args: &LauncherArgs,
) -> LauncherResult<LaunchPlan> {
    let mut runtime_args = runtime.runtime_args.clone();
    runtime_args.extend(args.vm_args.iter().flatten().cloned());
    let program_args = args.forwarded_args();

    let spawned = runtime.executable.as_ref().map(|executable| {
        let mut spawn_args = runtime_args.clone();
        spawn_args.push("-jar".to_string());
        spawn_args.push(startup.to_string_lossy().into_owned());
        LaunchConfiguration::new(executable)
            .with_runtime_args(spawn_args)
            .with_program_args(program_args.clone())
            .with_library_path(runtime.library_path.clone())
    });

    match &runtime.library {
        Some(library) if !args.force_spawn => {
            let mut embed_args = runtime_args;
            embed_args.push(format!("{}{}", CLASS_PATH_PROPERTY, startup.display()));
            Ok(LaunchPlan {
                strategy: LaunchStrategy::Embedded,
                configuration: LaunchConfiguration::new(library)
                    .with_runtime_args(embed_args)
                    .with_program_args(program_args)
                    .with_library_path(runtime.library_path.clone()),
                fallback: spawned,
            })
        }
        library => spawned
            .map(|configuration| LaunchPlan {
                strategy: LaunchStrategy::Spawned,
                configuration,
                fallback: None,
            })
            .ok_or_else(|| {
                LauncherError::NotFound(
                    library
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE)),
                )
            }),
    }
}

/// Drives launches for one launcher process.
pub struct Launcher {
    program: PathBuf,
    program_dir: PathBuf,
    resolver: RuntimeLibraryResolver,
    supervisor: LaunchSupervisor,
}

impl Launcher {
    pub fn new(program: PathBuf, program_dir: PathBuf, supervisor: LaunchSupervisor) -> Self {
        Self {
            program,
            program_dir,
            resolver: RuntimeLibraryResolver::for_host(),
            supervisor,
        }
    }

    pub fn with_resolver(mut self, resolver: RuntimeLibraryResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Launch until the runtime exits without asking for a restart. Returns
    /// the exit code for this process.
    pub fn run(&self, mut args: LauncherArgs) -> LauncherResult<i32> {
        if args.wants_splash() {
            self.show_splash(&args);
        }

        loop {
            let outcome = self.launch_once(&args)?;
            match next_step(&outcome) {
                NextStep::Exit(code) => return Ok(code),
                NextStep::Relaunch => continue,
                NextStep::RelaunchWith(raw) => {
                    let next = parse_args(raw.iter().cloned())?;
                    if next.vm != args.vm {
                        // a different runtime needs a fresh launcher process
                        info!("Runtime changed, restarting launcher");
                        self.supervisor.bridge().restart(&self.program, &raw)?;
                        return Ok(0);
                    }
                    args = next;
                }
            }
        }
    }

    /// Plan and run one launch, retrying with the spawned configuration when
    /// the runtime library cannot be loaded.
    pub fn launch_once(&self, args: &LauncherArgs) -> LauncherResult<LaunchOutcome> {
        self.supervisor.context().take_exit_data();

        let startup = find_startup(&self.program_dir, args)?;
        let runtime = resolve_runtime(&self.program_dir, args, &self.resolver)?;
        let plan = plan_launch(&startup, &runtime, args)?;
        debug!("Launch plan: {}", serde_json::to_string_pretty(&plan)?);

        match self.supervisor.launch(plan.strategy, &plan.configuration) {
            Err(e @ LauncherError::LibraryLoad { .. }) => match &plan.fallback {
                Some(fallback) => {
                    warn!("{}; falling back to {:?}", e, fallback.runtime);
                    self.supervisor.launch(LaunchStrategy::Spawned, fallback)
                }
                None => Err(e),
            },
            result => result,
        }
    }

    fn show_splash(&self, args: &LauncherArgs) {
        let image = match &args.splash_image {
            Some(image) => Some(check_path(image, &self.program_dir, true)),
            None => SPLASH_IMAGES
                .iter()
                .map(|name| self.program_dir.join(name))
                .find(|path| path.is_file()),
        };
        match image {
            // failures are logged by the bridge; the launch goes on without one
            Some(image) => {
                let _ = self.supervisor.bridge().show(&image);
            }
            None => debug!("No splash image in {:?}", self.program_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::launch::embedded::fake::{FakeLoader, Script};
    use crate::core::runtime::RuntimeLocationStrategy;
    use crate::core::splash::exit_data::TempFileChannel;
    use crate::core::splash::testing::RecordingWindow;
    use crate::core::state::LauncherContext;

    struct NoLibraries;

    impl RuntimeLocationStrategy for NoLibraries {
        fn library_name(&self) -> &str {
            "libvm.so"
        }

        fn relative_locations(&self) -> Vec<String> {
            vec!["server".to_string()]
        }
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    fn args(list: &[&str]) -> LauncherArgs {
        parse_args(list.iter().map(|a| a.to_string())).unwrap()
    }

    fn library_name() -> String {
        format!("libvm.{}", std::env::consts::DLL_EXTENSION)
    }

    #[test]
    fn newest_startup_archive_is_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("plugins/startup_1.0.0.jar"));
        touch(&dir.path().join("plugins/startup_1.2.0.jar"));
        touch(&dir.path().join("plugins/startup_1.1.9.jar"));

        let found = find_startup(dir.path(), &LauncherArgs::default()).unwrap();
        assert_eq!(found, dir.path().join("plugins/startup_1.2.0.jar"));
    }

    #[test]
    fn explicit_startup_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_startup(dir.path(), &args(&["-startup", "boot.jar"])).unwrap_err();
        assert!(matches!(err, LauncherError::NotFound(_)));

        touch(&dir.path().join("boot.jar"));
        let found = find_startup(dir.path(), &args(&["-startup", "boot.jar"])).unwrap();
        assert_eq!(found, dir.path().join("boot.jar"));
    }

    #[test]
    fn vm_directory_probes_bin() {
        let dir = tempfile::tempdir().unwrap();
        let java = dir.path().join("vm/bin").join(DEFAULT_EXECUTABLE);
        touch(&java);
        let resolver = RuntimeLibraryResolver::new(Box::new(NoLibraries));

        let runtime = resolve_runtime(dir.path(), &args(&["-vm", "vm"]), &resolver).unwrap();
        assert_eq!(runtime.executable, Some(java));
        assert_eq!(runtime.library, None);
    }

    #[test]
    fn vm_library_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join(library_name());
        touch(&library);
        let resolver = RuntimeLibraryResolver::new(Box::new(NoLibraries));

        let vm = library.to_string_lossy().into_owned();
        let runtime = resolve_runtime(dir.path(), &args(&["-vm", &vm]), &resolver).unwrap();
        let plan = plan_launch(Path::new("/app/startup.jar"), &runtime, &args(&["-vm", &vm])).unwrap();

        assert_eq!(plan.strategy, LaunchStrategy::Embedded);
        assert_eq!(plan.configuration.runtime, library);
        assert_eq!(
            plan.configuration.runtime_args,
            vec![format!("-Djava.class.path={}", Path::new("/app/startup.jar").display())]
        );
        assert_eq!(plan.fallback, None);
    }

    #[test]
    fn descriptor_supplies_runtime_and_arguments() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("vm/bin/java"));
        std::fs::write(
            dir.path().join("vm/vm.ee"),
            "-Dee.executable=bin/java\n-Xmx256m\n",
        )
        .unwrap();
        let resolver = RuntimeLibraryResolver::new(Box::new(NoLibraries));

        let runtime = resolve_runtime(dir.path(), &args(&["-vm", "vm/vm.ee"]), &resolver).unwrap();
        assert_eq!(runtime.executable, Some(dir.path().join("vm/bin/java")));
        assert_eq!(runtime.runtime_args.len(), 2);

        let plan = plan_launch(Path::new("startup.jar"), &runtime, &args(&["-vmargs", "-Dx=1"])).unwrap();
        assert_eq!(plan.strategy, LaunchStrategy::Spawned);
        assert_eq!(
            plan.configuration.runtime_args,
            vec!["-Dee.executable=bin/java", "-Xmx256m", "-Dx=1", "-jar", "startup.jar"]
        );
    }

    #[test]
    fn forced_spawn_keeps_library_out() {
        let runtime = ResolvedRuntime {
            executable: Some(PathBuf::from("/opt/vm/bin/java")),
            library: Some(PathBuf::from("/opt/vm/lib/server/libjvm.so")),
            ..ResolvedRuntime::default()
        };

        let embedded = plan_launch(Path::new("s.jar"), &runtime, &args(&["-clean"])).unwrap();
        assert_eq!(embedded.strategy, LaunchStrategy::Embedded);
        assert_eq!(
            embedded.fallback.map(|f| f.runtime),
            Some(PathBuf::from("/opt/vm/bin/java"))
        );

        let spawned = plan_launch(Path::new("s.jar"), &runtime, &args(&["--launcher.spawn"])).unwrap();
        assert_eq!(spawned.strategy, LaunchStrategy::Spawned);
        assert_eq!(spawned.configuration.runtime, PathBuf::from("/opt/vm/bin/java"));
    }

    #[test]
    fn no_runtime_at_all_is_not_found() {
        let err = plan_launch(Path::new("s.jar"), &ResolvedRuntime::default(), &LauncherArgs::default())
            .unwrap_err();
        assert!(matches!(err, LauncherError::NotFound(_)));
    }

    fn launcher(dir: &Path, script: Script) -> (Launcher, FakeLoader, RecordingWindow) {
        touch(&dir.join("plugins/startup_1.0.0.jar"));
        touch(&dir.join(library_name()));
        let window = RecordingWindow::default();
        let loader = FakeLoader::new(script);
        let context = Arc::new(LauncherContext::new(
            Box::new(window.clone()),
            Box::new(TempFileChannel::new(dir.join("slots"))),
        ));
        let supervisor = LaunchSupervisor::new(context).with_loader(Box::new(loader.clone()));
        let launcher = Launcher::new(dir.join("launcher"), dir.to_path_buf(), supervisor)
            .with_resolver(RuntimeLibraryResolver::new(Box::new(NoLibraries)));
        (launcher, loader, window)
    }

    #[test]
    fn restart_code_relaunches_with_same_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, loader, _) = launcher(
            dir.path(),
            Script {
                exit_codes: vec![23, 0],
                ..Script::default()
            },
        );

        let code = launcher.run(args(&["-vm", &library_name(), "-clean"])).unwrap();
        assert_eq!(code, 0);
        let runs: Vec<_> = loader.calls().into_iter().filter(|c| c.starts_with("run")).collect();
        assert_eq!(runs, vec!["run -clean", "run -clean"]);
    }

    #[test]
    fn exit_data_arguments_replace_the_old_ones() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, loader, _) = launcher(
            dir.path(),
            Script {
                exit_codes: vec![24, 5],
                exit_data: Some(format!("-vm\n{}\n-refresh", library_name())),
                ..Script::default()
            },
        );

        let code = launcher.run(args(&["-vm", &library_name(), "-clean"])).unwrap();
        assert_eq!(code, 5);
        let runs: Vec<_> = loader.calls().into_iter().filter(|c| c.starts_with("run")).collect();
        assert_eq!(runs, vec!["run -clean", "run -refresh"]);
    }

    #[test]
    fn splash_is_shown_before_launch_and_taken_down_after() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, _, window) = launcher(dir.path(), Script::default());
        touch(&dir.path().join("splash.bmp"));

        let code = launcher.run(args(&["-vm", &library_name(), "-showsplash"])).unwrap();
        assert_eq!(code, 0);
        assert_eq!(window.opened(), 1);
        assert_eq!(window.closed(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn library_load_failure_falls_back_to_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let (launcher, loader, _) = launcher(
            dir.path(),
            Script {
                fail_load: true,
                ..Script::default()
            },
        );
        // descriptor lines lead the runtime arguments, so the shell runs them
        std::fs::write(
            dir.path().join("vm.ee"),
            format!(
                "-c\nexit 9\n-Dee.executable=/bin/sh\n-Dee.vm.library={}\n",
                library_name()
            ),
        )
        .unwrap();

        let outcome = launcher.launch_once(&args(&["-vm", "vm.ee"])).unwrap();
        assert_eq!(outcome.strategy, LaunchStrategy::Spawned);
        assert_eq!(outcome.exit_code, 9);
        assert_eq!(loader.calls(), vec!["load"]);
    }
}
