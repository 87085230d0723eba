mod fetch;
mod run;
mod sources;

use serde_json::Value;
use skyfeed_core::config::build_default_registry;
use skyfeed_core::{AppConfig, CacheStore, Collector, Credentials};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let config = load_config(cli)?;
    let credentials = Credentials::from_env();

    match &cli.command {
        Command::Fetch(args) => fetch::run(args, &config, &credentials).await,
        Command::Run(args) => run::run(args, &config, &credentials).await,
        Command::Sources(args) => sources::run(args, &credentials),
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig, CliError> {
    match &cli.config {
        Some(path) => Ok(AppConfig::load(path)?),
        None => Ok(AppConfig::default()),
    }
}

/// Collector wired to the full adapter set and the config's tuning knobs.
fn build_collector(config: &AppConfig, credentials: &Credentials, use_cache: bool) -> Collector {
    let cache = if use_cache {
        CacheStore::new(config.cache_ttl())
    } else {
        CacheStore::disabled()
    };
    Collector::with_components(
        build_default_registry(credentials),
        cache,
        config.retry_config(),
        config.quality_config(),
    )
}
