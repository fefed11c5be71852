use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use lotwatch::config::{DEFAULT_CONFIG_PATH, NettikoneAuth};
use lotwatch::makes::{MakeTable, MakeTableError};
use lotwatch::nettikone::NettikoneScraper;
use lotwatch::source::http_client;
use lotwatch::tori::ToriScraper;
use lotwatch::utils::ListingStats;
use lotwatch::{Config, DiscordNotifier, ListingSource, SeenStore, Source, Watcher};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "lotwatch")]
#[command(about = "Announces new Nettikone and Tori listings on Discord", long_about = None)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        default_value = DEFAULT_CONFIG_PATH,
        global = true,
        help = "Path to the JSON config file"
    )]
    config: PathBuf,

    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll both marketplaces every `delay` seconds until interrupted (default)
    Run,
    /// Run a single scrape and notify cycle, then exit
    Once,
    /// Print the listings a source currently returns, without notifying or recording them
    List {
        #[arg(long, value_parser = parse_source, help = "Source to query (nettikone or tori)")]
        source: Source,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Print the Nettikone make table
    Makes {
        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_source(s: &str) -> Result<Source, String> {
    Source::from_str(s).map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

/// A missing table only disables make filtering on Nettikone; a broken one is fatal.
fn load_makes(path: &str) -> anyhow::Result<MakeTable> {
    match MakeTable::load(path) {
        Ok(table) => Ok(table),
        Err(MakeTableError::Io { path, source })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            log::warn!(
                "Make table {} not found, Nettikone searches will not filter by make",
                path
            );
            Ok(MakeTable::default())
        }
        Err(e) => Err(e.into()),
    }
}

async fn nettikone_source(
    config: &Config,
    client: &Client,
    makes: &MakeTable,
) -> anyhow::Result<Option<NettikoneScraper>> {
    let token = match config.nettikone_auth() {
        Some(NettikoneAuth::ApiKey(key)) => key,
        Some(NettikoneAuth::Credentials { username, password }) => {
            NettikoneScraper::request_access_token(client, &username, &password)
                .await
                .context("Failed to obtain Nettikone API token")?
        }
        None => {
            log::warn!("No api_key or netti_login/netti_pass configured, Nettikone is disabled");
            return Ok(None);
        }
    };

    Ok(Some(
        NettikoneScraper::new(client.clone(), token, makes.clone()).with_rows(config.nettix_rows),
    ))
}

fn tori_source(client: &Client, makes: &MakeTable) -> ToriScraper {
    ToriScraper::new(client.clone()).with_known_makes(makes.clone())
}

async fn build_watcher(
    config: &Config,
    client: &Client,
    makes: &MakeTable,
) -> anyhow::Result<Watcher<DiscordNotifier>> {
    let notifier =
        DiscordNotifier::new(client.clone(), config.bot_token.clone(), config.channel_id);
    notifier
        .verify()
        .await
        .context("Failed to log in to Discord")?;

    let store = SeenStore::open(&config.database)
        .await
        .with_context(|| format!("Failed to open listing store {}", config.database))?;
    log::info!("{} listing(s) already seen", store.count().await?);

    let mut watcher = Watcher::new(config.search(), store, notifier);
    if let Some(nettikone) = nettikone_source(config, client, makes).await? {
        watcher = watcher.with_source(nettikone);
    }
    watcher = watcher.with_source(tori_source(client, makes));

    log::info!(
        "Watching {} source(s) for makes [{}]",
        watcher.source_count(),
        config.makes.join(", ")
    );
    Ok(watcher)
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let makes = load_makes(&config.makes_table)?;
    let client = http_client(config.request_timeout()).context("Failed to build HTTP client")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Makes { format } => match format {
            OutputFormat::Json => serialize_json(makes.entries()),
            OutputFormat::Text => {
                if makes.is_empty() {
                    println!("No makes loaded.");
                }
                for entry in makes.entries() {
                    println!("{:>6}  {}", entry.id, entry.name);
                }
            }
        },

        Commands::List { source, format } => {
            let scraper: Box<dyn ListingSource> = match source {
                Source::Nettikone => Box::new(
                    nettikone_source(&config, &client, &makes)
                        .await?
                        .context("Nettikone is not configured")?,
                ),
                Source::Tori => Box::new(tori_source(&client, &makes)),
            };

            let listings = scraper
                .fetch(&config.search())
                .await
                .with_context(|| format!("Failed to fetch {} listings", source))?;

            match format {
                OutputFormat::Json => serialize_json(&listings),
                OutputFormat::Text => {
                    if listings.is_empty() {
                        println!("No entries to display.");
                    } else {
                        for (i, listing) in listings.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, listing);
                        }
                        print!("{}", ListingStats::from_listings(&listings));
                    }
                }
            }
        }

        Commands::Once => {
            let watcher = build_watcher(&config, &client, &makes).await?;
            let report = watcher.run_cycle().await;
            log::info!("Cycle finished: {}", report);
            watcher.store().close().await;
        }

        Commands::Run => {
            let watcher = build_watcher(&config, &client, &makes).await?;

            let shutdown = CancellationToken::new();
            let trigger = shutdown.clone();
            tokio::spawn(async move {
                wait_for_shutdown_signal().await;
                log::info!("Shutdown requested, finishing the current cycle...");
                trigger.cancel();
            });

            log::info!("Polling every {} second(s)", config.delay);
            watcher.run(config.delay(), shutdown).await;
            watcher.store().close().await;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        log::error!("Error loading {}: {}", cli.config.display(), e);
        process::exit(1);
    });

    if let Err(e) = run(cli, config).await {
        log::error!("{:#}", e);
        process::exit(1);
    }
}
