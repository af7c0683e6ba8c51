use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use spotify_recap::config::{AppConfig, CliConfig, FileConfig};
use spotify_recap::report::smtp_transport;
use spotify_recap::spotify::{authorization_request, extract_code, CachedTokenProvider};
use spotify_recap::{
    local_today, run_ingest, run_report, IngestSettings, MusicStore, SpotifyClient,
    TransformSettings,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(about = "Collects Spotify listening history and mails a weekly recap")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the options below.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite listening-history database.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// IANA time zone the play dates are recorded in (default US/Pacific).
    #[clap(long, global = true)]
    pub timezone: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch recent plays and merge them into the database.
    Ingest,
    /// Send the weekly recap email.
    Report,
    /// Authorize the app with Spotify and write the token cache.
    Authorize,
    /// Create the database, or validate an existing one.
    InitDb,
}

fn ingest(config: &AppConfig) -> Result<()> {
    let spotify = config.spotify()?;
    let tokens = CachedTokenProvider::new(&spotify.token_cache_path, spotify.app.clone())?;
    let client = SpotifyClient::new(tokens)?;

    let settings = IngestSettings {
        limit: spotify.recently_played_limit,
        transform: TransformSettings {
            timezone: config.timezone,
            recorded_on: local_today(config.timezone, Utc::now()),
        },
    };
    let summary = run_ingest(&client, &config.db_path, &settings)?;
    info!(
        "Ingest finished: {} play events fetched, {} tables merged",
        summary.fetched,
        summary.load.tables.len()
    );
    Ok(())
}

fn report(config: &AppConfig) -> Result<()> {
    let mail = config.mail()?;
    let transport = smtp_transport(mail)?;
    let today = local_today(config.timezone, Utc::now());
    let summary = run_report(&config.db_path, mail, &transport, today)?;
    info!("Sent \"{}\" to {}", summary.subject, summary.recipient);
    Ok(())
}

fn authorize(config: &AppConfig) -> Result<()> {
    let spotify = config.spotify()?;
    let request = authorization_request(&spotify.app);

    println!("Open this URL in a browser and approve access:\n\n{}\n", request.url);
    print!("Paste the URL you were redirected to: ");
    std::io::stdout().flush()?;

    let mut redirected = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut redirected)
        .context("Failed to read the redirected URL")?;

    let code = extract_code(&redirected, &request.state)?;
    let tokens = CachedTokenProvider::new(&spotify.token_cache_path, spotify.app.clone())?;
    let token = tokens.exchange_code(&code)?;
    info!(
        "Token cache written to {:?}, valid until {}",
        tokens.cache_path(),
        token.expires_at
    );
    Ok(())
}

fn init_db(config: &AppConfig) -> Result<()> {
    MusicStore::open(&config.db_path)?;
    info!("Database ready at {:?}", config.db_path);
    Ok(())
}

fn run(cli_args: CliArgs) -> Result<()> {
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        timezone: cli_args.timezone.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    match cli_args.command {
        Command::Ingest => ingest(&config),
        Command::Report => report(&config),
        Command::Authorize => authorize(&config),
        Command::InitDb => init_db(&config),
    }
}

fn main() {
    let cli_args = CliArgs::parse();

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init();

    if let Err(err) = run(cli_args) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
