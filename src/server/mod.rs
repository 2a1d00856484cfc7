mod notifier_kafka;
mod server;

pub use notifier_kafka::*;
pub use server::*;
