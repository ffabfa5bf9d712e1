use anyhow::Context;
use clap::{Parser, Subcommand};
use dashboard_core::{
    CityId, CityQuery, Config, Dashboard, Fetcher, Reading, ReadingSource, TrackedCity,
    mock_weather, provider_from_config,
};
use std::time::Duration;

use crate::{render, watch};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Terminal weather dashboard")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Skip the live API and show mock data only.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an OpenWeatherMap API key.
    Configure,

    /// Show current weather for one city.
    Show {
        /// City name, e.g. "Tokyo".
        city: String,

        /// Optional ISO country code, e.g. "JP".
        #[arg(long)]
        country: Option<String>,
    },

    /// Show the deterministic mock reading for a city.
    Mock {
        city: String,
    },

    /// Track the configured cities and refresh them periodically.
    Watch {
        /// Override the refresh interval from the config file.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure().await,
            Command::Show { city, country } => {
                let config = Config::load()?;
                let fetcher = build_fetcher(&config, self.offline);

                let query = CityQuery::new(city.trim(), country);
                let outcome = fetcher.fetch(&query).await?;

                let tracked =
                    TrackedCity::new(CityId::new(&query.name), &query.name, query.country_code);
                let reading = Reading {
                    record: outcome.record,
                    source: outcome.source,
                    updated_at: chrono::Utc::now(),
                };
                println!("{}", render::card(&tracked, Some(&reading)));
                Ok(())
            }
            Command::Mock { city } => {
                let name = city.trim();
                let tracked = TrackedCity::new(CityId::new(name), name, None);
                let reading = Reading {
                    record: mock_weather(name),
                    source: ReadingSource::Mock,
                    updated_at: chrono::Utc::now(),
                };
                println!("{}", render::card(&tracked, Some(&reading)));
                Ok(())
            }
            Command::Watch { interval_secs } => {
                let config = Config::load()?;
                let interval = interval_secs
                    .map(|secs| Duration::from_secs(secs.max(1)))
                    .unwrap_or_else(|| config.refresh_interval());

                let dashboard =
                    Dashboard::new(build_fetcher(&config, self.offline), config.tracked_cities());
                watch::run(dashboard, interval).await
            }
        }
    }
}

fn build_fetcher(config: &Config, offline: bool) -> Fetcher {
    if offline {
        return Fetcher::offline();
    }

    match provider_from_config(config) {
        Ok(provider) => Fetcher::new(provider),
        Err(err) => {
            tracing::warn!("{err:#}\nShowing mock data.");
            Fetcher::offline()
        }
    }
}

async fn configure() -> anyhow::Result<()> {
    // Read the file directly so environment overrides aren't persisted.
    let mut config = Config::load_from(&Config::config_file_path()?)?;

    let api_key = tokio::task::spawn_blocking(|| {
        inquire::Password::new("OpenWeatherMap API key:")
            .without_confirmation()
            .with_help_message("Get one at https://openweathermap.org/api")
            .prompt()
    })
    .await
    .context("Prompt task failed")??;

    let api_key = api_key.trim().to_string();
    anyhow::ensure!(!api_key.is_empty(), "API key must not be empty");

    config.set_api_key(api_key);
    let path = config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}
