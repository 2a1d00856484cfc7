// store

mod clock;
mod kv_store;

pub use clock::*;
pub use kv_store::*;

// repo

mod credential_repo;
mod post_repo;
mod user_directory;

pub use credential_repo::*;
pub use post_repo::*;
pub use user_directory::*;

// outbound

mod moderation_notifier;

pub use moderation_notifier::*;
