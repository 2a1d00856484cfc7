mod post;
mod token;
mod user;

pub use post::*;
pub use token::*;
pub use user::*;
