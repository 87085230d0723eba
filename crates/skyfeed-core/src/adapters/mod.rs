//! Provider adapters translating upstream responses into canonical records.
//!
//! | Adapter | Data types | Auth |
//! |---------|-----------|------|
//! | [`OpenWeatherAdapter`] | current, forecast | API key (query param) |
//! | [`WeatherApiAdapter`] | current, forecast, historical | API key (query param) |
//! | [`AccuWeatherAdapter`] | current | API key (query param) |
//! | [`NoaaAdapter`] | forecast | none |

mod accuweather;
mod noaa;
mod openweather;
mod weatherapi;

pub use accuweather::AccuWeatherAdapter;
pub use noaa::NoaaAdapter;
pub use openweather::OpenWeatherAdapter;
pub use weatherapi::WeatherApiAdapter;

use serde::de::DeserializeOwned;

use crate::circuit_breaker::CircuitBreaker;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::{ProviderId, SourceError};

/// One breaker-gated upstream round with the shared HTTP status
/// classification: 429 is rate-limited, 5xx is transient transport,
/// 401/403 is an authentication failure, any other 4xx is fatal.
pub(crate) async fn execute_provider_call(
    provider: ProviderId,
    http_client: &dyn HttpClient,
    circuit_breaker: &CircuitBreaker,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    if !circuit_breaker.allow_request() {
        return Err(SourceError::transport(format!(
            "{provider} circuit breaker is open; skipping upstream call"
        )));
    }

    let response = http_client.execute(request).await.map_err(|error| {
        circuit_breaker.record_failure();
        if error.retryable() {
            SourceError::transport(format!("{provider} transport error: {}", error.message()))
        } else {
            SourceError::provider(format!("{provider} transport error: {}", error.message()))
        }
    })?;

    if !response.is_success() {
        circuit_breaker.record_failure();
        return Err(classify_status(provider, response.status));
    }

    circuit_breaker.record_success();
    Ok(response)
}

fn classify_status(provider: ProviderId, status: u16) -> SourceError {
    match status {
        429 => SourceError::rate_limited(format!("{provider} returned status 429")),
        500..=599 => {
            SourceError::transport(format!("{provider} upstream returned status {status}"))
        }
        401 | 403 => SourceError::provider(format!(
            "{provider} rejected credentials with status {status}"
        )),
        _ => SourceError::provider(format!("{provider} returned status {status}")),
    }
}

/// Deserialize a provider body; a body that does not match the expected
/// shape is a fatal malformed-response error.
pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: ProviderId,
    body: &str,
) -> Result<T, SourceError> {
    serde_json::from_str(body)
        .map_err(|error| SourceError::provider(format!("{provider} malformed response: {error}")))
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::ScriptedHttpClient;
    use super::*;
    use crate::http_client::HttpError;
    use crate::SourceErrorKind;

    #[tokio::test]
    async fn status_classification_drives_error_kinds() {
        let cases = [
            (429, SourceErrorKind::RateLimited),
            (500, SourceErrorKind::Transport),
            (503, SourceErrorKind::Transport),
            (401, SourceErrorKind::Provider),
            (404, SourceErrorKind::Provider),
        ];

        for (status, expected_kind) in cases {
            let client = ScriptedHttpClient::status(status);
            let breaker = CircuitBreaker::default();

            let error = execute_provider_call(
                ProviderId::Openweather,
                &client,
                &breaker,
                HttpRequest::get("https://example.test"),
            )
            .await
            .expect_err("non-2xx must fail");

            assert_eq!(error.kind(), expected_kind, "status {status}");
        }
    }

    #[tokio::test]
    async fn open_breaker_fails_fast_without_a_network_call() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Err(HttpError::new("connection refused")),
            Err(HttpError::new("connection refused")),
        ]));
        let breaker = CircuitBreaker::new(crate::circuit_breaker::CircuitBreakerConfig {
            failure_threshold: 2,
            open_timeout: std::time::Duration::from_secs(60),
        });

        for _ in 0..2 {
            let _ = execute_provider_call(
                ProviderId::Noaa,
                client.as_ref(),
                &breaker,
                HttpRequest::get("https://example.test"),
            )
            .await;
        }
        assert_eq!(client.request_count(), 2);

        let error = execute_provider_call(
            ProviderId::Noaa,
            client.as_ref(),
            &breaker,
            HttpRequest::get("https://example.test"),
        )
        .await
        .expect_err("breaker is open");

        assert_eq!(error.kind(), SourceErrorKind::Transport);
        assert_eq!(client.request_count(), 2, "no call while the breaker is open");
    }

    #[test]
    fn malformed_bodies_are_fatal() {
        let error = parse_json::<serde_json::Value>(ProviderId::Weatherapi, "not json")
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Provider);
        assert!(!error.retryable());
    }
}
