use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub timezone: Option<String>,

    // Integrations, only required by the commands that talk to them
    pub spotify: Option<SpotifyFileConfig>,
    pub mail: Option<MailFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyFileConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub token_cache_path: Option<String>,
    pub recently_played_limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MailFileConfig {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    /// Defaults to the sender address.
    pub username: Option<String>,
    pub password: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
