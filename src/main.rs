use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use pastego_rs::pastego::config::Settings;
use pastego_rs::pastego::feed::ScrapeClient;
use pastego_rs::pastego::search::SearchSet;
use pastego_rs::pastego::server::{self, AppState};
use pastego_rs::pastego::store::ResultStore;
use pastego_rs::pastego::watcher::Watcher;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SearchOptions {
    /// Strings to search with optional bool operators (&&, ||, ~), comma separated,
    /// e.g. "password, some || (thing && ~maybenot)"
    #[arg(short, long)]
    search: Option<String>,

    /// Folder to save the matched pastes
    #[arg(short, long)]
    output: Option<String>,

    /// Search for case-insensitive strings
    #[arg(short, long)]
    insensitive: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the paste feed and save matches
    Watch {
        #[command(flatten)]
        options: SearchOptions,

        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,

        /// Pastes requested per poll
        #[arg(long)]
        limit: Option<u32>,

        /// Also serve the review API on this port
        #[arg(long)]
        serve: Option<u16>,
    },
    /// Serve the review API over saved matches
    Serve {
        /// Folder holding the matched pastes
        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Evaluate search expressions against a file or stdin
    Check {
        /// Expressions to evaluate, comma separated
        #[arg(short, long)]
        search: String,

        /// File to search, stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Search for case-insensitive strings
        #[arg(short, long)]
        insensitive: bool,
    },
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // HTTP request traces are emitted through `tracing`
    let subscriber = tracing_subscriber::fmt().with_target(false).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::warn!("A tracing subscriber was already installed");
    }
}

fn load_settings(config: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_env();
    Ok(settings)
}

fn apply_search_options(settings: &mut Settings, options: SearchOptions) {
    if let Some(search) = options.search {
        settings.search = search;
    }
    if let Some(output) = options.output {
        settings.output_dir = output;
    }
    if options.insensitive {
        settings.case_insensitive = true;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_ref())?;

    match cli.command {
        Commands::Watch {
            options,
            interval,
            limit,
            serve,
        } => {
            apply_search_options(&mut settings, options);
            if let Some(interval) = interval {
                settings.interval_secs = interval;
            }
            if let Some(limit) = limit {
                settings.limit = limit;
            }
            settings.validate()?;

            let searches = SearchSet::parse(&settings.search, settings.case_insensitive)?;
            for term in searches.terms() {
                log::info!("Searching for: {}", term.expression());
            }

            let store = ResultStore::open(&settings.output_dir).await?;
            log::info!("Saving matches to {}", store.root().display());

            let source = Arc::new(ScrapeClient::from_settings(&settings)?);
            let watcher = Watcher::new(source, searches, store.clone(), &settings);

            if let Some(port) = serve {
                let state = AppState::new(store, watcher.events());
                tokio::spawn(async move {
                    if let Err(e) = server::serve(port, state, shutdown_signal()).await {
                        log::error!("Review server failed: {}", e);
                    }
                });
            }

            watcher.run(shutdown_signal()).await;
        }
        Commands::Serve { output, port } => {
            if let Some(output) = output {
                settings.output_dir = output;
            }
            let store = ResultStore::open(&settings.output_dir).await?;
            let (events, _) = broadcast::channel(16);
            server::serve(port, AppState::new(store, events), shutdown_signal()).await?;
        }
        Commands::Check {
            search,
            file,
            insensitive,
        } => {
            let searches = SearchSet::parse(&search, insensitive || settings.case_insensitive)?;
            let body = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            match searches.find_match(&body) {
                Some(found) => println!("match: {} ({})", found.label, found.expression),
                None => {
                    println!("no match");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
