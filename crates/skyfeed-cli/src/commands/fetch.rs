use serde::Serialize;
use serde_json::Value;

use skyfeed_core::{
    AppConfig, Credentials, DataType, Location, ProviderId, QualityVerdict, RecordOrigin,
    WeatherRecord,
};

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::build_collector;

#[derive(Debug, Serialize)]
struct FetchResponseData {
    record: WeatherRecord,
    origin: &'static str,
    accepted: bool,
    latency_ms: u64,
}

pub async fn run(
    args: &FetchArgs,
    config: &AppConfig,
    credentials: &Credentials,
) -> Result<Value, CliError> {
    let source: ProviderId = args.source.parse()?;
    let data_type: DataType = args.data_type.parse()?;
    let location = Location::new(args.lat, args.lon)?;

    let collector = build_collector(config, credentials, !args.no_cache);
    let result = collector.collect(source, location, data_type).await?;

    let origin = match result.origin {
        RecordOrigin::CacheHit => "cache",
        RecordOrigin::Fetched => "fetched",
        RecordOrigin::StaleFallback => "stale_cache",
    };

    Ok(serde_json::to_value(FetchResponseData {
        record: result.record,
        origin,
        accepted: result.verdict == QualityVerdict::Accepted,
        latency_ms: result.latency.as_millis() as u64,
    })?)
}
