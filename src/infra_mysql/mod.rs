mod post_repo_mysql;
mod user_directory_mysql;

pub use post_repo_mysql::*;
pub use user_directory_mysql::*;

mod column;
