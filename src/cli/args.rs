// ─── Launcher Arguments ───
// Single-dash options consumed by the launcher. Everything else passes
// through, in order, to the program.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::error::{LauncherError, LauncherResult};

pub const VM: &str = "-vm";
pub const VM_ARGS: &str = "-vmargs";
pub const STARTUP: &str = "-startup";
pub const NAME: &str = "-name";
pub const SHOW_SPLASH: &str = "-showsplash";
pub const NO_SPLASH: &str = "-nosplash";
pub const DEBUG: &str = "-debug";
pub const EXIT_DATA: &str = "-exitdata";
pub const FORCE_SPAWN: &str = "--launcher.spawn";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LauncherArgs {
    pub vm: Option<PathBuf>,
    /// Runtime arguments after `-vmargs`, replacing any defaults.
    pub vm_args: Option<Vec<String>>,
    pub startup: Option<PathBuf>,
    pub name: Option<String>,
    pub show_splash: bool,
    pub splash_image: Option<PathBuf>,
    pub no_splash: bool,
    pub debug: bool,
    /// Shared exit-data slot owned by whoever started this launcher.
    pub exit_data: Option<String>,
    pub force_spawn: bool,
    pub program_args: Vec<String>,
}

impl LauncherArgs {
    pub fn wants_splash(&self) -> bool {
        self.show_splash && !self.no_splash
    }

    /// Arguments handed to the program. `-name` and `-exitdata` are
    /// forwarded so the program sees them too.
    pub fn forwarded_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(name) = &self.name {
            args.push(NAME.to_string());
            args.push(name.clone());
        }
        if let Some(id) = &self.exit_data {
            args.push(EXIT_DATA.to_string());
            args.push(id.clone());
        }
        args.extend(self.program_args.iter().cloned());
        args
    }
}

/// Parse launcher arguments. The ini arguments come first, then the user's.
pub fn parse_args<I>(args: I) -> LauncherResult<LauncherArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = LauncherArgs::default();
    let mut args = args.into_iter().peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            VM => parsed.vm = Some(PathBuf::from(value(VM, args.next())?)),
            STARTUP => parsed.startup = Some(PathBuf::from(value(STARTUP, args.next())?)),
            NAME => parsed.name = Some(value(NAME, args.next())?),
            EXIT_DATA => parsed.exit_data = Some(value(EXIT_DATA, args.next())?),
            SHOW_SPLASH => {
                parsed.show_splash = true;
                if args.peek().is_some_and(|next| !next.starts_with('-')) {
                    parsed.splash_image = args.next().map(PathBuf::from);
                }
            }
            NO_SPLASH => parsed.no_splash = true,
            DEBUG => {
                parsed.debug = true;
                parsed.program_args.push(arg);
            }
            FORCE_SPAWN => parsed.force_spawn = true,
            VM_ARGS => {
                parsed.vm_args = Some(args.by_ref().collect());
            }
            _ => parsed.program_args.push(arg),
        }
    }

    Ok(parsed)
}

fn value(option: &str, next: Option<String>) -> LauncherResult<String> {
    next.ok_or_else(|| LauncherError::InvalidConfiguration(format!("missing value for {}", option)))
}
