pub mod compare;
pub mod locate;

pub use compare::{compare_versions, Version};
pub use locate::find_latest;
