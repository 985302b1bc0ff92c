// ─── Embedded Launch ───
// Load the runtime library into this process, create the runtime, register
// the splash callbacks, call its entry point and shut it down again.

use std::path::Path;

use tracing::{debug, error, info, instrument};

use super::config::LaunchConfiguration;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::splash::SplashBridge;

/// Opens a runtime library.
pub trait RuntimeLoader {
    fn load(&self, library: &Path) -> LauncherResult<Box<dyn EmbeddedRuntime>>;
}

/// A loaded runtime library, driven through its lifecycle in order:
/// `create`, `register_bridge`, `run`, then shutdown and `destroy`.
pub trait EmbeddedRuntime {
    /// Create the runtime instance. Fails with `VmInit`.
    fn create(&mut self, runtime_args: &[String]) -> LauncherResult<()>;

    /// Hand the splash callbacks to the runtime. The runtime keeps the
    /// bridge until `destroy`.
    fn register_bridge(&mut self, bridge: SplashBridge) -> LauncherResult<()>;

    /// Call the entry point; blocks until it returns its exit code.
    fn run(&mut self, program_args: &[String]) -> i32;

    /// Next unhandled fault the runtime recorded, if any.
    fn take_fault(&mut self) -> Option<String>;

    /// Whether the runtime wants the launcher to request a graceful exit.
    fn should_shutdown(&self) -> bool {
        true
    }

    fn request_exit(&mut self, code: i32);

    /// Release the runtime instance. Called exactly once per created runtime.
    fn destroy(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedPhase {
    Idle,
    LibraryLoaded,
    RuntimeCreated,
    EntryInvoked,
    Terminated,
}

#[derive(Debug)]
pub struct EmbeddedOutcome {
    pub exit_code: i32,
    /// `RuntimeFault` carrying the faults drained after the entry point
    /// returned, newline separated.
    pub fault: Option<LauncherError>,
}

fn enter(phase: EmbeddedPhase) {
    debug!("Embedded launch phase: {:?}", phase);
}

/// Run `config` inside this process.
#[instrument(skip_all, fields(library = ?config.runtime))]
pub fn run_embedded(
    loader: &dyn RuntimeLoader,
    config: &LaunchConfiguration,
    bridge: &SplashBridge,
) -> LauncherResult<EmbeddedOutcome> {
    enter(EmbeddedPhase::Idle);
    config.validate_embedded()?;

    let mut runtime = loader.load(&config.runtime)?;
    enter(EmbeddedPhase::LibraryLoaded);

    runtime.create(&config.runtime_args)?;
    enter(EmbeddedPhase::RuntimeCreated);

    if let Err(e) = runtime.register_bridge(bridge.clone()) {
        runtime.destroy();
        enter(EmbeddedPhase::Terminated);
        return Err(e);
    }

    info!(
        "Starting embedded runtime with {} runtime and {} program arguments",
        config.runtime_args.len(),
        config.program_args.len()
    );
    enter(EmbeddedPhase::EntryInvoked);
    let exit_code = runtime.run(&config.program_args);

    let faults: Vec<String> = std::iter::from_fn(|| runtime.take_fault()).collect();
    for fault in &faults {
        error!("Embedded runtime fault: {}", fault);
    }

    if runtime.should_shutdown() {
        debug!("Requesting runtime exit with code {}", exit_code);
        runtime.request_exit(exit_code);
    }
    runtime.destroy();
    enter(EmbeddedPhase::Terminated);

    info!("Embedded runtime finished with exit code {}", exit_code);
    Ok(EmbeddedOutcome {
        exit_code,
        fault: (!faults.is_empty()).then(|| LauncherError::RuntimeFault(faults.join("\n"))),
    })
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fake::{FakeLoader, Script};
    use super::*;
    use crate::core::error::LauncherError;
    use crate::core::splash::exit_data::TempFileChannel;
    use crate::core::splash::testing::RecordingWindow;
    use crate::core::state::LauncherContext;

    fn bridge(dir: &Path) -> SplashBridge {
        SplashBridge::new(Arc::new(LauncherContext::new(
            Box::new(RecordingWindow::default()),
            Box::new(TempFileChannel::new(dir)),
        )))
    }

    fn config() -> LaunchConfiguration {
        LaunchConfiguration::new("/opt/vm/libvm.so")
            .with_runtime_args(vec!["-Djava.class.path=startup.jar".into()])
            .with_program_args(vec!["-clean".into()])
    }

    #[test]
    fn zero_runtime_args_rejected_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::new(Script::default());
        let config = LaunchConfiguration::new("/opt/vm/libvm.so");

        let err = run_embedded(&loader, &config, &bridge(dir.path())).unwrap_err();
        assert!(matches!(err, LauncherError::InvalidConfiguration(_)));
        assert!(loader.calls().is_empty());
    }

    #[test]
    fn lifecycle_runs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::new(Script {
            exit_code: 13,
            ..Script::default()
        });

        let outcome = run_embedded(&loader, &config(), &bridge(dir.path())).unwrap();
        assert_eq!(outcome.exit_code, 13);
        assert!(outcome.fault.is_none());
        assert_eq!(
            loader.calls(),
            vec![
                "load",
                "create -Djava.class.path=startup.jar",
                "register",
                "run -clean",
                "exit 13",
                "destroy"
            ]
        );
    }

    #[test]
    fn faults_are_drained_and_shutdown_still_runs() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::new(Script {
            exit_code: 1,
            faults: vec!["NullPointerException".into(), "at Main.main".into()],
            ..Script::default()
        });

        let outcome = run_embedded(&loader, &config(), &bridge(dir.path())).unwrap();
        assert!(matches!(
            outcome.fault,
            Some(LauncherError::RuntimeFault(ref text)) if text == "NullPointerException\nat Main.main"
        ));
        assert_eq!(loader.calls().last().map(String::as_str), Some("destroy"));
    }

    #[test]
    fn opting_out_skips_exit_request_but_not_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::new(Script {
            opt_out_of_shutdown: true,
            ..Script::default()
        });

        run_embedded(&loader, &config(), &bridge(dir.path())).unwrap();
        let calls = loader.calls();
        assert!(!calls.iter().any(|c| c.starts_with("exit")));
        assert_eq!(calls.last().map(String::as_str), Some("destroy"));
    }

    #[test]
    fn creation_failure_is_vm_init() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::new(Script {
            create_code: -6,
            ..Script::default()
        });

        let err = run_embedded(&loader, &config(), &bridge(dir.path())).unwrap_err();
        assert!(matches!(err, LauncherError::VmInit(-6)));
        assert!(!loader.calls().iter().any(|c| c.starts_with("run")));
    }

    #[test]
    fn load_failure_is_library_load() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::new(Script {
            fail_load: true,
            ..Script::default()
        });

        let err = run_embedded(&loader, &config(), &bridge(dir.path())).unwrap_err();
        assert!(matches!(err, LauncherError::LibraryLoad { .. }));
    }
}
