// ─── Native Runtime Library ───
// C ABI exported by an embeddable runtime:
//
//   int  launcher_runtime_create(int argc, const char **argv, void **out);
//   int  launcher_runtime_register(void *rt, const SplashCallbacks *table);
//   int  launcher_runtime_run(void *rt, int argc, const char **argv);
//   int  launcher_runtime_fault(void *rt, char *buf, size_t len);
//   int  launcher_runtime_should_shutdown(void *rt);
//   void launcher_runtime_exit(void *rt, int code);
//   void launcher_runtime_destroy(void *rt);
//
// create, run and destroy are required; the rest are optional.

use std::path::Path;

use super::embedded::{EmbeddedRuntime, RuntimeLoader};
use crate::core::error::LauncherResult;

/// Loads runtime libraries with the host's dynamic loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLoader;

impl RuntimeLoader for NativeLoader {
    fn load(&self, library: &Path) -> LauncherResult<Box<dyn EmbeddedRuntime>> {
        imp::load(library)
    }
}

#[cfg(unix)]
mod imp {
    use std::ffi::{c_char, c_int, c_void, CStr, CString};
    use std::os::unix::ffi::OsStrExt;
    use std::path::{Path, PathBuf};
    use std::ptr;

    use tracing::{debug, warn};

    use super::super::embedded::EmbeddedRuntime;
    use crate::core::error::{LauncherError, LauncherResult};
    use crate::core::splash::{SplashBridge, SplashCallbacks};

    type CreateFn = unsafe extern "C" fn(c_int, *const *const c_char, *mut *mut c_void) -> c_int;
    type RegisterFn = unsafe extern "C" fn(*mut c_void, *const SplashCallbacks) -> c_int;
    type RunFn = unsafe extern "C" fn(*mut c_void, c_int, *const *const c_char) -> c_int;
    type FaultFn = unsafe extern "C" fn(*mut c_void, *mut c_char, usize) -> c_int;
    type ShouldShutdownFn = unsafe extern "C" fn(*mut c_void) -> c_int;
    type ExitFn = unsafe extern "C" fn(*mut c_void, c_int);
    type DestroyFn = unsafe extern "C" fn(*mut c_void);

    const FAULT_BUFFER: usize = 4096;

    struct Symbols {
        create: CreateFn,
        register: Option<RegisterFn>,
        run: RunFn,
        fault: Option<FaultFn>,
        should_shutdown: Option<ShouldShutdownFn>,
        exit: Option<ExitFn>,
        destroy: DestroyFn,
    }

    struct NativeRuntime {
        path: PathBuf,
        library: *mut c_void,
        symbols: Symbols,
        instance: *mut c_void,
        // Boxed so the table's context pointer stays valid until destroy.
        bridge: Option<Box<SplashBridge>>,
        callbacks: Option<Box<SplashCallbacks>>,
    }

    fn last_dl_error() -> String {
        let message = unsafe { libc::dlerror() };
        if message.is_null() {
            "unknown dynamic loader error".to_string()
        } else {
            unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
        }
    }

    fn lookup(library: *mut c_void, name: &str) -> Option<*mut c_void> {
        let symbol = CString::new(name).ok()?;
        let address = unsafe { libc::dlsym(library, symbol.as_ptr()) };
        (!address.is_null()).then_some(address)
    }

    fn required(library: *mut c_void, path: &Path, name: &str) -> LauncherResult<*mut c_void> {
        lookup(library, name).ok_or_else(|| LauncherError::LibraryLoad {
            path: path.to_path_buf(),
            reason: format!("missing entry point {}", name),
        })
    }

    fn resolve(library: *mut c_void, path: &Path) -> LauncherResult<Symbols> {
        // SAFETY: the symbols are declared with these signatures by the ABI
        unsafe {
            Ok(Symbols {
                create: std::mem::transmute::<*mut c_void, CreateFn>(required(
                    library,
                    path,
                    "launcher_runtime_create",
                )?),
                run: std::mem::transmute::<*mut c_void, RunFn>(required(
                    library,
                    path,
                    "launcher_runtime_run",
                )?),
                destroy: std::mem::transmute::<*mut c_void, DestroyFn>(required(
                    library,
                    path,
                    "launcher_runtime_destroy",
                )?),
                register: lookup(library, "launcher_runtime_register")
                    .map(|f| std::mem::transmute::<*mut c_void, RegisterFn>(f)),
                fault: lookup(library, "launcher_runtime_fault")
                    .map(|f| std::mem::transmute::<*mut c_void, FaultFn>(f)),
                should_shutdown: lookup(library, "launcher_runtime_should_shutdown")
                    .map(|f| std::mem::transmute::<*mut c_void, ShouldShutdownFn>(f)),
                exit: lookup(library, "launcher_runtime_exit")
                    .map(|f| std::mem::transmute::<*mut c_void, ExitFn>(f)),
            })
        }
    }

    pub(super) fn load(path: &Path) -> LauncherResult<Box<dyn EmbeddedRuntime>> {
        if !path.is_file() {
            return Err(LauncherError::LibraryLoad {
                path: path.to_path_buf(),
                reason: "no such file".into(),
            });
        }
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| {
            LauncherError::LibraryLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let library = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if library.is_null() {
            return Err(LauncherError::LibraryLoad {
                path: path.to_path_buf(),
                reason: last_dl_error(),
            });
        }

        let symbols = match resolve(library, path) {
            Ok(symbols) => symbols,
            Err(e) => {
                unsafe { libc::dlclose(library) };
                return Err(e);
            }
        };
        debug!("Loaded runtime library {:?}", path);

        Ok(Box::new(NativeRuntime {
            path: path.to_path_buf(),
            library,
            symbols,
            instance: ptr::null_mut(),
            bridge: None,
            callbacks: None,
        }))
    }

    /// Owned C strings plus the pointer array referencing them.
    struct CArgs {
        _owned: Vec<CString>,
        pointers: Vec<*const c_char>,
    }

    impl CArgs {
        fn new(args: &[String]) -> LauncherResult<Self> {
            let owned = args
                .iter()
                .map(|arg| {
                    CString::new(arg.as_str()).map_err(|_| {
                        LauncherError::InvalidConfiguration(format!("argument {:?} contains NUL", arg))
                    })
                })
                .collect::<LauncherResult<Vec<_>>>()?;
            let mut pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
            pointers.push(ptr::null());
            Ok(Self {
                _owned: owned,
                pointers,
            })
        }

        fn argc(&self) -> c_int {
            (self.pointers.len() - 1) as c_int
        }
    }

    impl EmbeddedRuntime for NativeRuntime {
        fn create(&mut self, runtime_args: &[String]) -> LauncherResult<()> {
            let args = CArgs::new(runtime_args)?;
            let mut instance = ptr::null_mut();
            let code = unsafe { (self.symbols.create)(args.argc(), args.pointers.as_ptr(), &mut instance) };
            if code != 0 || instance.is_null() {
                return Err(LauncherError::VmInit(code));
            }
            self.instance = instance;
            Ok(())
        }

        fn register_bridge(&mut self, bridge: SplashBridge) -> LauncherResult<()> {
            let Some(register) = self.symbols.register else {
                debug!("{:?} takes no splash callbacks", self.path);
                return Ok(());
            };

            let bridge = Box::new(bridge);
            let callbacks = Box::new(SplashCallbacks::new(&bridge));
            let code = unsafe { register(self.instance, callbacks.as_ref()) };
            self.bridge = Some(bridge);
            self.callbacks = Some(callbacks);
            if code != 0 {
                warn!("Runtime rejected splash callbacks (code {})", code);
            }
            Ok(())
        }

        fn run(&mut self, program_args: &[String]) -> i32 {
            let args = match CArgs::new(program_args) {
                Ok(args) => args,
                Err(e) => {
                    warn!("Cannot pass program arguments: {}", e);
                    return crate::core::error::START_FAILED;
                }
            };
            unsafe { (self.symbols.run)(self.instance, args.argc(), args.pointers.as_ptr()) }
        }

        fn take_fault(&mut self) -> Option<String> {
            let fault = self.symbols.fault?;
            let mut buffer = vec![0 as c_char; FAULT_BUFFER];
            let found = unsafe { fault(self.instance, buffer.as_mut_ptr(), buffer.len()) };
            if found == 0 {
                return None;
            }
            if let Some(last) = buffer.last_mut() {
                *last = 0;
            }
            let message = unsafe { CStr::from_ptr(buffer.as_ptr()) };
            Some(message.to_string_lossy().into_owned())
        }

        fn should_shutdown(&self) -> bool {
            match self.symbols.should_shutdown {
                Some(should_shutdown) => unsafe { should_shutdown(self.instance) != 0 },
                None => true,
            }
        }

        fn request_exit(&mut self, code: i32) {
            if let Some(exit) = self.symbols.exit {
                unsafe { exit(self.instance, code) };
            }
        }

        fn destroy(&mut self) {
            if !self.instance.is_null() {
                unsafe { (self.symbols.destroy)(self.instance) };
                self.instance = ptr::null_mut();
            }
            self.callbacks = None;
            self.bridge = None;
        }
    }

    impl Drop for NativeRuntime {
        fn drop(&mut self) {
            self.destroy();
            unsafe { libc::dlclose(self.library) };
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn missing_library_is_library_load() {
            let dir = tempfile::tempdir().unwrap();
            let err = load(&dir.path().join("libvm.so")).err().unwrap();
            assert!(matches!(err, LauncherError::LibraryLoad { .. }));
        }

        #[test]
        fn non_library_file_is_library_load() {
            let dir = tempfile::tempdir().unwrap();
            let fake = dir.path().join("libvm.so");
            std::fs::write(&fake, b"not an object file").unwrap();

            let err = load(&fake).err().unwrap();
            assert!(matches!(err, LauncherError::LibraryLoad { .. }));
        }

        #[test]
        fn c_args_are_null_terminated() {
            let args = CArgs::new(&["-a".to_string(), "-b".to_string()]).unwrap();
            assert_eq!(args.argc(), 2);
            assert!(args.pointers[2].is_null());
            assert!(CArgs::new(&["bad\0".to_string()]).is_err());
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::path::Path;

    use super::super::embedded::EmbeddedRuntime;
    use crate::core::error::{LauncherError, LauncherResult};

    pub(super) fn load(path: &Path) -> LauncherResult<Box<dyn EmbeddedRuntime>> {
        Err(LauncherError::LibraryLoad {
            path: path.to_path_buf(),
            reason: "embedding is not supported on this host".into(),
        })
    }
}
