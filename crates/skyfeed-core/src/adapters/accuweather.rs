//! AccuWeather adapter (current conditions only). Every fetch is a two-step
//! sequence: resolve the coordinate to an AccuWeather location key, then
//! query current conditions for that key. Resolved keys are memoized per
//! coordinate bucket since they never change.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use super::{execute_provider_call, parse_json};
use crate::circuit_breaker::CircuitBreaker;
use crate::domain::LocationKey;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{
    CapabilitySet, FetchRequest, ProviderId, SourceAdapter, SourceError, UtcDateTime,
    WeatherFields, WeatherRecord,
};

const BASE_URL: &str = "https://dataservice.accuweather.com";

pub struct AccuWeatherAdapter {
    api_key: Option<String>,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: CircuitBreaker,
    location_keys: Mutex<HashMap<LocationKey, String>>,
}

impl AccuWeatherAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_http_client(api_key, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(api_key: Option<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            api_key,
            http_client,
            circuit_breaker: CircuitBreaker::default(),
            location_keys: Mutex::new(HashMap::new()),
        }
    }

    async fn resolve_location_key(
        &self,
        req: FetchRequest,
        api_key: &str,
    ) -> Result<String, SourceError> {
        let bucket = req.location.key();
        if let Some(key) = self
            .location_keys
            .lock()
            .expect("location key cache lock")
            .get(&bucket)
        {
            return Ok(key.clone());
        }

        let url = format!(
            "{BASE_URL}/locations/v1/cities/geoposition/search?apikey={}&q={},{}",
            urlencoding::encode(api_key),
            req.location.lat(),
            req.location.lon(),
        );
        let response = execute_provider_call(
            self.id(),
            self.http_client.as_ref(),
            &self.circuit_breaker,
            HttpRequest::get(url),
        )
        .await?;

        let payload: LocationPayload = parse_json(self.id(), &response.body)?;
        let key = payload.key.ok_or_else(|| {
            SourceError::provider("accuweather location search returned no key")
        })?;

        self.location_keys
            .lock()
            .expect("location key cache lock")
            .insert(bucket, key.clone());
        Ok(key)
    }

    async fn fetch_inner(&self, req: FetchRequest) -> Result<WeatherRecord, SourceError> {
        if !self.capabilities().supports(req.data_type) {
            return Err(SourceError::unsupported_data_type(self.id(), req.data_type));
        }
        let api_key = self
            .api_key
            .as_deref()
            .map(str::to_owned)
            .ok_or_else(|| SourceError::missing_credentials(self.id()))?;

        let location_key = self.resolve_location_key(req, &api_key).await?;

        let url = format!(
            "{BASE_URL}/currentconditions/v1/{location_key}?apikey={}&details=true",
            urlencoding::encode(&api_key),
        );
        let response = execute_provider_call(
            self.id(),
            self.http_client.as_ref(),
            &self.circuit_breaker,
            HttpRequest::get(url),
        )
        .await?;

        // Current conditions come back as a single-element array.
        let conditions: Vec<ConditionsPayload> = parse_json(self.id(), &response.body)?;
        let item = conditions.into_iter().next().ok_or_else(|| {
            SourceError::provider("accuweather returned no current conditions")
        })?;

        let observed_at = match item.epoch_time {
            Some(seconds) => UtcDateTime::from_unix_timestamp(seconds).map_err(|error| {
                SourceError::provider(format!("accuweather returned a bad timestamp: {error}"))
            })?,
            None => UtcDateTime::now(),
        };

        let fields = WeatherFields {
            temperature_c: item.temperature.and_then(|m| m.metric_value()),
            humidity_pct: item.relative_humidity,
            wind_speed_ms: item
                .wind
                .and_then(|w| w.speed)
                .and_then(|m| m.metric_value())
                .map(|kmh| kmh / 3.6),
            precipitation_mm: item.precip_1hr.and_then(|m| m.metric_value()).or(Some(0.0)),
            pressure_hpa: item.pressure.and_then(|m| m.metric_value()),
            condition: item.weather_text,
        };

        Ok(WeatherRecord::new(
            self.id(),
            req.location,
            req.data_type,
            observed_at,
            fields,
        ))
    }
}

impl SourceAdapter for AccuWeatherAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Accuweather
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, false, false)
    }

    fn fetch<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<WeatherRecord, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_inner(req))
    }
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    #[serde(rename = "Key")]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConditionsPayload {
    #[serde(rename = "EpochTime")]
    epoch_time: Option<i64>,
    #[serde(rename = "WeatherText")]
    weather_text: Option<String>,
    #[serde(rename = "Temperature")]
    temperature: Option<MetricUnitPayload>,
    #[serde(rename = "RelativeHumidity")]
    relative_humidity: Option<f64>,
    #[serde(rename = "Wind")]
    wind: Option<WindPayload>,
    #[serde(rename = "Pressure")]
    pressure: Option<MetricUnitPayload>,
    #[serde(rename = "Precip1hr")]
    precip_1hr: Option<MetricUnitPayload>,
}

#[derive(Debug, Deserialize)]
struct WindPayload {
    #[serde(rename = "Speed")]
    speed: Option<MetricUnitPayload>,
}

#[derive(Debug, Deserialize)]
struct MetricUnitPayload {
    #[serde(rename = "Metric")]
    metric: Option<UnitValuePayload>,
}

impl MetricUnitPayload {
    fn metric_value(self) -> Option<f64> {
        self.metric.and_then(|m| m.value)
    }
}

#[derive(Debug, Deserialize)]
struct UnitValuePayload {
    #[serde(rename = "Value")]
    value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::ScriptedHttpClient;
    use crate::{DataType, Location, SourceErrorKind};

    fn seoul() -> Location {
        Location::new(37.5665, 126.9780).expect("valid location")
    }

    fn location_body() -> String {
        r#"{"Key": "226081", "LocalizedName": "Seoul"}"#.to_owned()
    }

    fn conditions_body() -> String {
        r#"[{
            "EpochTime": 1723200000,
            "WeatherText": "Sunny",
            "Temperature": {"Metric": {"Value": 27.8}},
            "RelativeHumidity": 48,
            "Wind": {"Speed": {"Metric": {"Value": 10.8}}},
            "Pressure": {"Metric": {"Value": 1014.0}},
            "Precip1hr": {"Metric": {"Value": 0.0}}
        }]"#
        .to_owned()
    }

    #[tokio::test]
    async fn fetch_resolves_a_location_key_then_reads_conditions() {
        let client = Arc::new(ScriptedHttpClient::bodies(vec![
            location_body(),
            conditions_body(),
        ]));
        let adapter = AccuWeatherAdapter::with_http_client(Some("test-key".into()), client.clone());

        let record = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Current))
            .await
            .expect("fetch succeeds");

        let urls = client.requested_urls();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("/locations/v1/cities/geoposition/search?"));
        assert!(urls[1].contains("/currentconditions/v1/226081?"));

        assert_eq!(record.fields.temperature_c, Some(27.8));
        assert_eq!(record.fields.humidity_pct, Some(48.0));
        let wind = record.fields.wind_speed_ms.expect("wind present");
        assert!((wind - 3.0).abs() < 1e-9, "10.8 km/h is 3 m/s, got {wind}");
        assert_eq!(record.fields.condition.as_deref(), Some("Sunny"));
    }

    #[tokio::test]
    async fn resolved_location_keys_are_memoized() {
        let client = Arc::new(ScriptedHttpClient::bodies(vec![
            location_body(),
            conditions_body(),
            conditions_body(),
        ]));
        let adapter = AccuWeatherAdapter::with_http_client(Some("test-key".into()), client.clone());

        for _ in 0..2 {
            adapter
                .fetch(FetchRequest::new(seoul(), DataType::Current))
                .await
                .expect("fetch succeeds");
        }

        // One geoposition lookup then two conditions reads.
        assert_eq!(client.request_count(), 3);
        assert_eq!(
            client
                .requested_urls()
                .iter()
                .filter(|u| u.contains("/locations/"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn forecast_is_unsupported() {
        let adapter = AccuWeatherAdapter::with_http_client(
            Some("test-key".into()),
            Arc::new(ScriptedHttpClient::body("{}")),
        );

        let error = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Forecast))
            .await
            .expect_err("current-only provider");

        assert_eq!(error.kind(), SourceErrorKind::UnsupportedDataType);
    }

    #[tokio::test]
    async fn missing_location_key_is_a_provider_error() {
        let adapter = AccuWeatherAdapter::with_http_client(
            Some("test-key".into()),
            Arc::new(ScriptedHttpClient::body(r#"{"LocalizedName": "Nowhere"}"#)),
        );

        let error = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Current))
            .await
            .expect_err("no key in payload");

        assert_eq!(error.kind(), SourceErrorKind::Provider);
    }
}
