//! CLI argument definitions for Skyfeed.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Collect one record from a source right now |
//! | `run` | Run the periodic collection scheduler |
//! | `sources` | List source capabilities and credential status |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--config` | none | Path to the JSON application config |
//!
//! # Examples
//!
//! ```bash
//! # Fetch current conditions for Seoul from OpenWeatherMap
//! skyfeed fetch openweather --lat 37.5665 --lon 126.9780
//!
//! # Run the scheduler with a job file
//! skyfeed run --config skyfeed.json --jobs-file jobs.json
//!
//! # List sources and whether their API keys are configured
//! skyfeed sources --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Skyfeed - multi-provider weather data collector
///
/// Collect weather observations and forecasts from multiple providers
/// (OpenWeatherMap, WeatherAPI, AccuWeather, NOAA) with caching, retries,
/// quality validation, and periodic scheduling.
#[derive(Debug, Parser)]
#[command(
    name = "skyfeed",
    author,
    version,
    about = "Multi-provider weather data collector",
    long_about = "Skyfeed collects weather data from multiple upstream providers into a \
canonical record format. Features include:\n\
\n\
  • Multi-provider support (OpenWeatherMap, WeatherAPI, AccuWeather, NOAA)\n\
  • TTL caching with stale fallback during outages\n\
  • Retry with jittered exponential backoff and circuit breaking\n\
  • Quality scoring of every collected record\n\
  • A periodic scheduler for named collection jobs\n\
\n\
Use 'skyfeed <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Path to the JSON application config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect one record from a source right now.
    Fetch(FetchArgs),
    /// Run the periodic collection scheduler until interrupted.
    Run(RunArgs),
    /// List source capabilities and credential status.
    Sources(SourcesArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Source to fetch from (openweather, weatherapi, accuweather, noaa).
    pub source: String,

    /// Latitude in decimal degrees, [-90, 90].
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees, [-180, 180].
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Data type to request.
    #[arg(long, default_value = "current")]
    pub data_type: String,

    /// Bypass the cache for this call.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path for persisting job definitions across restarts.
    #[arg(long)]
    pub jobs_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Include quota policies in the listing.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}
