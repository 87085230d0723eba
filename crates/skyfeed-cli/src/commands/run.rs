use serde_json::{json, Value};
use tracing::{info, warn};

use skyfeed_core::{AppConfig, CollectionScheduler, Credentials};

use crate::cli::RunArgs;
use crate::error::CliError;

use super::build_collector;

/// Run the scheduler until Ctrl-C. Jobs come from the config file; a jobs
/// file, when given, restores due times from the previous run and is
/// rewritten on shutdown.
pub async fn run(
    args: &RunArgs,
    config: &AppConfig,
    credentials: &Credentials,
) -> Result<Value, CliError> {
    let collector = build_collector(config, credentials, true);
    let scheduler = CollectionScheduler::new(collector.clone(), config.scheduler_config());

    for job in config.collection_jobs()? {
        scheduler.add_job(job).await;
    }

    if let Some(path) = &args.jobs_file {
        if path.exists() {
            let restored = scheduler.load_jobs(path).await?;
            info!(count = restored, path = %path.display(), "restored persisted jobs");
        }
    }

    let job_count = scheduler.job_count().await;
    if job_count == 0 {
        return Err(CliError::Command(
            "no jobs configured; add a `jobs` list to the config or pass --jobs-file".into(),
        ));
    }
    info!(jobs = job_count, "starting collection scheduler");

    tokio::select! {
        _ = scheduler.run() => unreachable!("scheduler loop does not return"),
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutdown signal received");
        }
    }

    if let Some(path) = &args.jobs_file {
        if let Err(error) = scheduler.save_jobs(path).await {
            warn!(path = %path.display(), %error, "failed to persist jobs on shutdown");
        } else {
            info!(path = %path.display(), "persisted jobs");
        }
    }

    let stats: Value = collector
        .statistics()
        .into_iter()
        .map(|(source, stats)| (source.to_string(), json!(stats)))
        .collect::<serde_json::Map<String, Value>>()
        .into();

    Ok(json!({
        "jobs": scheduler.snapshots().await,
        "statistics": stats,
    }))
}
