//! Process configuration.
//! Settings come from a TOML file picked with `--settings`, overridable from the environment.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
