use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use tokio_util::sync::CancellationToken;
use weather_core::{
    Config, FetchOptions, FetchSettings, OpenWeatherProvider, fetch_all, fetch_sequential,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current temperatures for a list of cities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and fetch defaults.
    Configure,

    /// Show the current temperature for each city.
    Fetch(FetchArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Comma-separated list of cities to request weather for.
    #[arg(long)]
    pub cities: Option<String>,

    /// The API key used for the API; falls back to the config file.
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Fetch one city at a time and keep going past failures.
    #[arg(long)]
    pub sequential: bool,

    /// Maximum number of requests in flight at once.
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Give up on the whole run after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Fetch(args) => fetch(args).await,
        }
    }
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let settings = FetchSettings::resolve(args.cities.as_deref(), args.api_key.as_deref(), &config)?
        .with_max_concurrency(args.max_concurrency)
        .with_timeout(args.timeout_secs.map(Duration::from_secs));

    let cancel = CancellationToken::new();
    if let Some(timeout) = settings.timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(?timeout, "timed out, cancelling outstanding requests");
            cancel.cancel();
        });
    }

    let provider = OpenWeatherProvider::new(settings.api_key.clone());

    if args.sequential {
        let outcomes = fetch_sequential(&provider, &settings.cities, &cancel).await?;
        for (city, outcome) in outcomes {
            if let Ok(report) = outcome {
                println!("The temperature in {city} is {} degrees C", report.temperature);
            }
        }
        return Ok(());
    }

    let options = FetchOptions { max_concurrency: settings.max_concurrency, cancel };
    let reports = fetch_all(Arc::new(provider), &settings.cities, &options)
        .await
        .context("Failed to get weather")?;

    for report in reports {
        println!("{report}");
    }

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let help = if config.api_key().is_some() {
        "Leave empty to keep the stored key"
    } else {
        "Get one at https://home.openweathermap.org/api_keys"
    };
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message(help)
        .prompt()?;

    let api_key = api_key.trim();
    if !api_key.is_empty() {
        config.api_key = Some(api_key.to_string());
    } else if config.api_key().is_none() {
        bail!("API key is required");
    }

    config.max_concurrency = prompt_optional(
        "Max concurrent requests (empty for no limit):",
        config.max_concurrency,
    )?;
    config.timeout_secs =
        prompt_optional("Timeout in seconds (empty for none):", config.timeout_secs)?;

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

fn prompt_optional<T>(message: &str, current: Option<T>) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let default = current.map(|v| v.to_string()).unwrap_or_default();
    let answer = Text::new(message).with_default(&default).prompt()?;
    let answer = answer.trim();

    if answer.is_empty() {
        return Ok(None);
    }

    let value = answer.parse().with_context(|| format!("Invalid number: {answer}"))?;
    Ok(Some(value))
}
