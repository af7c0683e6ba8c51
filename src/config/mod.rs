mod file_config;

pub use file_config::{FileConfig, MailFileConfig, SpotifyFileConfig};

use crate::report::MailSettings;
use crate::spotify::{OAuthApp, MAX_RECENTLY_PLAYED};
use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use std::path::PathBuf;

pub const DEFAULT_TIMEZONE: &str = "US/Pacific";
pub const DEFAULT_SCOPE: &str = "user-read-recently-played";
pub const DEFAULT_TOKEN_CACHE_PATH: &str = ".cache";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// CLI arguments that can be used for config resolution.
/// TOML values override these where present.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub app: OAuthApp,
    pub token_cache_path: PathBuf,
    pub recently_played_limit: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub timezone: Tz,
    spotify: Option<SpotifySettings>,
    mail: Option<MailSettings>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| anyhow!("db_path must be specified via --db-path or in config file"))?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let timezone_name = file
            .timezone
            .or_else(|| cli.timezone.clone())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = parse_timezone(&timezone_name)?;

        let spotify = file
            .spotify
            .map(resolve_spotify)
            .transpose()
            .context("Invalid [spotify] section")?;
        let mail = file
            .mail
            .map(resolve_mail)
            .transpose()
            .context("Invalid [mail] section")?;

        Ok(Self {
            db_path,
            timezone,
            spotify,
            mail,
        })
    }

    pub fn spotify(&self) -> Result<&SpotifySettings> {
        self.spotify
            .as_ref()
            .context("A [spotify] section is required in the config file for this command")
    }

    pub fn mail(&self) -> Result<&MailSettings> {
        self.mail
            .as_ref()
            .context("A [mail] section is required in the config file for this command")
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow!("Invalid timezone {:?}: {}", name, e))
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} must be specified", field),
    }
}

fn resolve_spotify(file: SpotifyFileConfig) -> Result<SpotifySettings> {
    let recently_played_limit = file.recently_played_limit.unwrap_or(MAX_RECENTLY_PLAYED);
    if !(1..=MAX_RECENTLY_PLAYED).contains(&recently_played_limit) {
        bail!(
            "recently_played_limit must be between 1 and {}, got {}",
            MAX_RECENTLY_PLAYED,
            recently_played_limit
        );
    }

    Ok(SpotifySettings {
        app: OAuthApp {
            client_id: required(file.client_id, "client_id")?,
            client_secret: required(file.client_secret, "client_secret")?,
            redirect_uri: required(file.redirect_uri, "redirect_uri")?,
            scope: file.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        },
        token_cache_path: PathBuf::from(
            file.token_cache_path
                .unwrap_or_else(|| DEFAULT_TOKEN_CACHE_PATH.to_string()),
        ),
        recently_played_limit,
    })
}

fn resolve_mail(file: MailFileConfig) -> Result<MailSettings> {
    let sender = required(file.sender, "sender")?;
    Ok(MailSettings {
        username: file.username.unwrap_or_else(|| sender.clone()),
        sender,
        recipient: required(file.recipient, "recipient")?,
        password: required(file.password, "password")?,
        smtp_host: file
            .smtp_host
            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        smtp_port: file.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
    })
}
