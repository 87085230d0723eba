use serde::Serialize;
use serde_json::Value;

use skyfeed_core::config::build_default_registry;
use skyfeed_core::{Credentials, ProviderId, ProviderPolicy};

use crate::cli::SourcesArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: ProviderId,
    capabilities: Vec<&'static str>,
    requires_api_key: bool,
    key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    quota: Option<QuotaInfo>,
}

#[derive(Debug, Serialize)]
struct QuotaInfo {
    limit: u32,
    window_secs: u64,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceStatus>,
}

pub fn run(args: &SourcesArgs, credentials: &Credentials) -> Result<Value, CliError> {
    let registry = build_default_registry(credentials);

    let sources = ProviderId::ALL
        .into_iter()
        .map(|id| {
            let capabilities = registry
                .get(id)
                .map(|adapter| adapter.capabilities().supported_types())
                .unwrap_or_default();
            let quota = args.verbose.then(|| {
                let policy = ProviderPolicy::default_for(id);
                QuotaInfo {
                    limit: policy.quota_limit,
                    window_secs: policy.quota_window.as_secs(),
                }
            });
            SourceStatus {
                id,
                capabilities,
                requires_api_key: id.requires_api_key(),
                key_configured: !id.requires_api_key() || credentials.api_key(id).is_some(),
                quota,
            }
        })
        .collect::<Vec<_>>();

    Ok(serde_json::to_value(SourcesResponseData { sources })?)
}
