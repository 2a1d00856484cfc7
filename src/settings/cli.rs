use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "bazaar", about = "Marketplace auth and listing moderation service")]
pub struct Cli {
    /// Settings file; defaults to the build profile's file under `settings/`.
    #[arg(long)]
    pub settings: Option<String>,

    /// Replaces `log.filter` from the settings file.
    #[arg(long)]
    pub log_filter: Option<String>,
}
