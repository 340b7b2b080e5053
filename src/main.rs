//! quakedash - earthquake map dashboard.
//!
//! Shows recent earthquakes on a map with place search, requests heuristic
//! risk forecasts for the region or a country, and lists related news.
//! Runs as a local web UI or as one-shot terminal commands.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod client;
mod dashboard;
mod errors;
mod loader;
mod map;
mod models;
mod output;
mod prediction;
mod search;
mod server;
mod store;
#[cfg(test)]
mod testing;
mod viewport;

use cli::{BackendArgs, Cli, Command};
use client::{ApiClient, CounterClient};
use dashboard::Dashboard;
use store::{LocalStore, ThemeStore};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let backend = cli.backend;
    match cli.command {
        Command::Quakes(args) => block_on(cmd_quakes(&backend, args)),
        Command::Predict(args) => block_on(cmd_predict(&backend, args)),
        Command::PredictCountry(args) => block_on(cmd_predict_country(&backend, args)),
        Command::News(args) => block_on(cmd_news(&backend, args)),
        Command::Visitors => block_on(cmd_visitors(&backend)),
        Command::Theme(args) => cmd_theme(&backend, &args),
        Command::Ui(args) => cmd_ui(&backend, &args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(future)
}

fn open_storage(backend: &BackendArgs) -> Result<Arc<LocalStore>> {
    let dir = backend.state_dir();
    let storage = LocalStore::in_dir(&dir)
        .with_context(|| format!("failed to open state directory {}", dir.display()))?;
    Ok(Arc::new(storage))
}

fn build_dashboard(backend: &BackendArgs) -> Result<Dashboard<ApiClient, CounterClient>> {
    let api = ApiClient::new(&backend.api_url).context("failed to create API client")?;
    let counter =
        CounterClient::new(&backend.counter_url).context("failed to create counter client")?;
    Ok(Dashboard::new(api, counter, open_storage(backend)?))
}

/// Execute the `quakes` command - fetch recent events, optionally searched.
async fn cmd_quakes(backend: &BackendArgs, args: cli::QuakesArgs) -> Result<()> {
    let dashboard = build_dashboard(backend)?;
    dashboard.load_quakes().await;

    let events = dashboard.quakes.events();
    if events.is_empty() {
        anyhow::bail!("no earthquake data available from {}", backend.api_url);
    }

    let shown: Vec<&models::Feature> = match &args.search {
        Some(query) => search::filter_events(&events, query),
        None => events.iter().take(args.limit).collect(),
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &shown, args.format)?;
    Ok(())
}

/// Execute the `predict` command - whole-region forecast.
async fn cmd_predict(backend: &BackendArgs, args: cli::FormatArgs) -> Result<()> {
    let dashboard = build_dashboard(backend)?;
    let state = dashboard.predict_region().await;

    if let Some(message) = state.error {
        anyhow::bail!(message);
    }
    let prediction = state.result.context("backend returned no forecast")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_region(&mut handle, &prediction, args.format)?;
    Ok(())
}

/// Execute the `predict-country` command.
async fn cmd_predict_country(backend: &BackendArgs, args: cli::CountryArgs) -> Result<()> {
    let dashboard = build_dashboard(backend)?;
    let state = dashboard.predict_country(&args.country).await;

    if let Some(message) = state.error {
        anyhow::bail!(message);
    }
    let prediction = state.result.context("backend returned no forecast")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_country(&mut handle, &prediction, args.format)?;
    Ok(())
}

/// Execute the `news` command.
async fn cmd_news(backend: &BackendArgs, args: cli::FormatArgs) -> Result<()> {
    let dashboard = build_dashboard(backend)?;
    dashboard.load_news().await;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_news(&mut handle, &dashboard.news.items(), args.format)?;
    Ok(())
}

/// Execute the `visitors` command.
async fn cmd_visitors(backend: &BackendArgs) -> Result<()> {
    let dashboard = build_dashboard(backend)?;
    let count = dashboard.register_visit().await;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "👥 {count} জন ভিজিটর")?;
    Ok(())
}

/// Execute the `theme` command.
fn cmd_theme(backend: &BackendArgs, args: &cli::ThemeArgs) -> Result<()> {
    let themes = ThemeStore::load(open_storage(backend)?);

    let action = args.action().map_err(anyhow::Error::msg)?;
    match action {
        None => {}
        Some(None) => {
            themes.toggle().context("failed to save theme")?;
        }
        Some(Some(theme)) => themes.set(theme).context("failed to save theme")?,
    }

    println!("{}", themes.current().as_str());
    Ok(())
}

/// Execute the `ui` command - start web server.
fn cmd_ui(backend: &BackendArgs, args: &cli::UiArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
    };
    let dashboard = Arc::new(build_dashboard(backend)?);

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakedash Web UI\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  API:     {}", backend.api_url);
    println!("  Theme:   {}", dashboard.themes.current().as_str());
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    block_on(server::run_server(config, dashboard))
}
