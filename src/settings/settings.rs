use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub jwt: Jwt,
    pub registry: Registry,
    pub directory: Directory,
    pub notify: Notify,
    #[serde(default)]
    pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    /// TLS is enabled when both paths are set.
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Jwt {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    /// First entry signs new tokens.
    pub allowed_algorithms: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Registry {
    pub backend: String, // "redis" or "memory"
    pub redis_url: Option<String>,
    pub prefix: String,
    pub op_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Directory {
    pub backend: String, // "mysql" or "memory"
    pub mysql_url: Option<String>,
    pub op_timeout_ms: u64,
    /// Accounts loaded into the in-memory directory at startup.
    #[serde(default)]
    pub seed: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: i64,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub authorities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Notify {
    pub backend: String, // "kafka" or "log"
    pub brokers: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    #[serde(default = "default_true")]
    pub logout_revokes_refresh: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            logout_revokes_refresh: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the settings file, then lets `BAZAAR__<SECTION>__<KEY>` variables override it.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("BAZAAR").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
