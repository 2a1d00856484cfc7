//! In-process adapters for local runs and tests.

mod clock_manual;
mod kv_store_memory;
mod notifier_memory;
mod post_repo_memory;
mod user_directory_memory;

pub use clock_manual::*;
pub use kv_store_memory::*;
pub use notifier_memory::*;
pub use post_repo_memory::*;
pub use user_directory_memory::*;
