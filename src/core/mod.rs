// ─── Launcher Core ───
// Runtime discovery and supervision for a native bootstrap launcher.
//
// Architecture:
//   core/
//     version/  Lenient version parsing, newest versioned file lookup
//     paths     Command and relative path resolution
//     runtime/  Candidate classification, library lookup, .ee descriptors
//     launch/   Embedded and spawned strategies, supervisor, restart codes
//     splash/   Splash window seam, callback bridge, exit-data channel
//     state/    Per-launch context shared with the callbacks
//     config    Launcher ini and argument files

pub mod config;
pub mod error;
pub mod launch;
pub mod paths;
pub mod runtime;
pub mod splash;
pub mod state;
pub mod version;
