//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::{DEFAULT_API_URL, DEFAULT_COUNTER_URL};
use crate::output::Format;
use crate::store::Theme;

/// Earthquake map dashboard with search, risk predictions and news.
#[derive(Parser, Debug)]
#[command(name = "quakedash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Where to find the backend and where to keep local state.
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Dashboard backend base URL
    #[arg(long, global = true, env = "QUAKEDASH_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Visitor counter service base URL
    #[arg(long, global = true, env = "QUAKEDASH_COUNTER_URL", default_value = DEFAULT_COUNTER_URL)]
    pub counter_url: String,

    /// Directory for persisted state (theme, visitor fallback count)
    #[arg(long, global = true, env = "QUAKEDASH_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

impl BackendArgs {
    /// State directory, defaulting to `~/.quakedash`.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".quakedash")
        })
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List recent earthquakes, optionally filtered by place
    Quakes(QuakesArgs),

    /// Forecast for the whole region
    Predict(FormatArgs),

    /// Forecast for one country
    PredictCountry(CountryArgs),

    /// Latest earthquake news
    News(FormatArgs),

    /// Register a visit and print the visitor count
    Visitors,

    /// Show, set or toggle the dashboard theme
    Theme(ThemeArgs),

    /// Start the web dashboard
    Ui(UiArgs),
}

/// Arguments for the `quakes` command.
#[derive(Parser, Debug)]
pub struct QuakesArgs {
    /// Only events whose place contains this text (at most 5 results)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Maximum number of events to show without a search
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `predict-country` command.
#[derive(Parser, Debug)]
pub struct CountryArgs {
    /// Country name, e.g. Japan or Indonesia
    #[arg(default_value = "")]
    pub country: String,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Output format only.
#[derive(Parser, Debug)]
pub struct FormatArgs {
    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `theme` command.
#[derive(Parser, Debug)]
pub struct ThemeArgs {
    /// `light`, `dark` or `toggle`; omitted prints the current theme
    pub value: Option<String>,
}

impl ThemeArgs {
    /// Parsed action: `None` prints, `Some(None)` toggles, `Some(Some(t))` sets.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown theme name.
    pub fn action(&self) -> Result<Option<Option<Theme>>, String> {
        match self.value.as_deref() {
            None => Ok(None),
            Some("toggle") => Ok(Some(None)),
            Some(other) => other.parse().map(|t| Some(Some(t))),
        }
    }
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["quakedash", "news"]).unwrap();
        assert_eq!(cli.backend.api_url, DEFAULT_API_URL);
        assert!(matches!(cli.command, Command::News(FormatArgs { format: Format::Human })));
    }

    #[test]
    fn test_global_api_url_after_subcommand() {
        let cli = Cli::try_parse_from([
            "quakedash",
            "predict-country",
            "Japan",
            "--api-url",
            "http://backend:9000",
            "-f",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.backend.api_url, "http://backend:9000");
        let Command::PredictCountry(args) = cli.command else {
            panic!("expected predict-country");
        };
        assert_eq!(args.country, "Japan");
        assert_eq!(args.format, Format::Json);
    }

    #[test]
    fn test_theme_actions() {
        let print = ThemeArgs { value: None };
        assert_eq!(print.action(), Ok(None));
        let toggle = ThemeArgs {
            value: Some("toggle".into()),
        };
        assert_eq!(toggle.action(), Ok(Some(None)));
        let dark = ThemeArgs {
            value: Some("dark".into()),
        };
        assert_eq!(dark.action(), Ok(Some(Some(Theme::Dark))));
        assert!(ThemeArgs { value: Some("sepia".into()) }.action().is_err());
    }

    #[test]
    fn test_state_dir_override() {
        let cli = Cli::try_parse_from(["quakedash", "visitors", "--state-dir", "/tmp/qd"]).unwrap();
        assert_eq!(cli.backend.state_dir(), PathBuf::from("/tmp/qd"));
    }
}
