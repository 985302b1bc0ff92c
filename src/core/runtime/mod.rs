pub mod classify;
pub mod descriptor;
pub mod library;
pub mod registry;

pub use classify::{classify, is_descriptor, is_library, RuntimeCandidate, RuntimeKind};
pub use descriptor::{read_descriptor, ExecutionEnvironment};
pub use library::{host_strategy, RuntimeLibraryResolver, RuntimeLocationStrategy};
pub use registry::{select_registered_library, RegisteredRuntime, RegistrySnapshot};
