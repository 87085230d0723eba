//! OpenWeatherMap adapter (current conditions and 5-day/3-hour forecast).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use super::{execute_provider_call, parse_json};
use crate::circuit_breaker::CircuitBreaker;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{
    CapabilitySet, DataType, FetchRequest, ProviderId, SourceAdapter, SourceError, UtcDateTime,
    WeatherFields, WeatherRecord,
};

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

pub struct OpenWeatherAdapter {
    api_key: Option<String>,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: CircuitBreaker,
}

impl OpenWeatherAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_http_client(api_key, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(api_key: Option<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            api_key,
            http_client,
            circuit_breaker: CircuitBreaker::default(),
        }
    }

    fn request_url(&self, req: FetchRequest, api_key: &str) -> String {
        let path = match req.data_type {
            DataType::Current => "weather",
            DataType::Forecast => "forecast",
            DataType::Historical => unreachable!("rejected by capability check"),
        };
        format!(
            "{BASE_URL}/{path}?lat={}&lon={}&units=metric&appid={}",
            req.location.lat(),
            req.location.lon(),
            urlencoding::encode(api_key),
        )
    }

    async fn fetch_inner(&self, req: FetchRequest) -> Result<WeatherRecord, SourceError> {
        if !self.capabilities().supports(req.data_type) {
            return Err(SourceError::unsupported_data_type(self.id(), req.data_type));
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::missing_credentials(self.id()))?;

        let request = HttpRequest::get(self.request_url(req, api_key));
        let response =
            execute_provider_call(self.id(), self.http_client.as_ref(), &self.circuit_breaker, request)
                .await?;

        let item = match req.data_type {
            DataType::Forecast => {
                let payload: ForecastPayload = parse_json(self.id(), &response.body)?;
                payload.list.into_iter().next().ok_or_else(|| {
                    SourceError::provider("openweather returned an empty forecast list")
                })?
            }
            _ => parse_json(self.id(), &response.body)?,
        };

        let observed_at = match item.dt {
            Some(seconds) => UtcDateTime::from_unix_timestamp(seconds).map_err(|error| {
                SourceError::provider(format!("openweather returned a bad timestamp: {error}"))
            })?,
            None => UtcDateTime::now(),
        };

        let fields = WeatherFields {
            temperature_c: item.main.temp,
            humidity_pct: item.main.humidity,
            wind_speed_ms: item.wind.and_then(|w| w.speed),
            // A missing rain block means no precipitation, not unknown.
            precipitation_mm: item
                .rain
                .and_then(|r| r.one_h.or(r.three_h))
                .or(Some(0.0)),
            pressure_hpa: item.main.pressure,
            condition: item
                .weather
                .and_then(|entries| entries.into_iter().next())
                .and_then(|entry| entry.description),
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

impl SourceAdapter for OpenWeatherAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Openweather
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false)
    }

    fn fetch<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<WeatherRecord, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_inner(req))
    }
}

/// Shared shape of a current-conditions body and a forecast list entry.
#[derive(Debug, Deserialize)]
struct ObservationPayload {
    main: MainPayload,
    wind: Option<WindPayload>,
    rain: Option<RainPayload>,
    weather: Option<Vec<ConditionPayload>>,
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MainPayload {
    temp: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindPayload {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RainPayload {
    #[serde(rename = "1h")]
    one_h: Option<f64>,
    #[serde(rename = "3h")]
    three_h: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ConditionPayload {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastPayload {
    list: Vec<ObservationPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::ScriptedHttpClient;
    use crate::{Location, SourceErrorKind};

    fn seoul() -> Location {
        Location::new(37.5665, 126.9780).expect("valid location")
    }

    fn adapter(client: ScriptedHttpClient) -> OpenWeatherAdapter {
        OpenWeatherAdapter::with_http_client(Some("test-key".into()), Arc::new(client))
    }

    #[tokio::test]
    async fn current_response_maps_to_canonical_fields() {
        let body = r#"{
            "main": {"temp": 21.4, "humidity": 63, "pressure": 1013},
            "wind": {"speed": 3.1},
            "rain": {"1h": 0.2},
            "weather": [{"description": "light rain"}],
            "dt": 1723200000
        }"#;
        let client = ScriptedHttpClient::body(body);
        let adapter = adapter(client);

        let record = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Current))
            .await
            .expect("fetch succeeds");

        assert_eq!(record.source, ProviderId::Openweather);
        assert_eq!(record.fields.temperature_c, Some(21.4));
        assert_eq!(record.fields.humidity_pct, Some(63.0));
        assert_eq!(record.fields.wind_speed_ms, Some(3.1));
        assert_eq!(record.fields.precipitation_mm, Some(0.2));
        assert_eq!(record.fields.pressure_hpa, Some(1013.0));
        assert_eq!(record.fields.condition.as_deref(), Some("light rain"));
        assert!(record.quality_score.is_none());
    }

    #[tokio::test]
    async fn missing_rain_block_means_zero_precipitation() {
        let body = r#"{"main": {"temp": 18.0, "humidity": 40, "pressure": 1020}}"#;
        let adapter = adapter(ScriptedHttpClient::body(body));

        let record = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Current))
            .await
            .expect("fetch succeeds");

        assert_eq!(record.fields.precipitation_mm, Some(0.0));
        assert_eq!(record.fields.wind_speed_ms, None);
    }

    #[tokio::test]
    async fn forecast_takes_the_first_list_entry() {
        let body = r#"{
            "list": [
                {"main": {"temp": 19.5, "humidity": 70, "pressure": 1008},
                 "wind": {"speed": 4.2}, "rain": {"3h": 1.1}, "dt": 1723210800},
                {"main": {"temp": 17.0, "humidity": 80, "pressure": 1005}, "dt": 1723221600}
            ]
        }"#;
        let adapter = adapter(ScriptedHttpClient::body(body));

        let record = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Forecast))
            .await
            .expect("fetch succeeds");

        assert_eq!(record.data_type, DataType::Forecast);
        assert_eq!(record.fields.temperature_c, Some(19.5));
        assert_eq!(record.fields.precipitation_mm, Some(1.1));
    }

    #[tokio::test]
    async fn empty_forecast_list_is_a_provider_error() {
        let adapter = adapter(ScriptedHttpClient::body(r#"{"list": []}"#));

        let error = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Forecast))
            .await
            .expect_err("empty list must fail");

        assert_eq!(error.kind(), SourceErrorKind::Provider);
    }

    #[tokio::test]
    async fn historical_is_unsupported() {
        let client = ScriptedHttpClient::body("{}");
        let adapter = adapter(client);

        let error = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Historical))
            .await
            .expect_err("no historical capability");

        assert_eq!(error.kind(), SourceErrorKind::UnsupportedDataType);
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_network_call() {
        let client = Arc::new(ScriptedHttpClient::body("{}"));
        let adapter = OpenWeatherAdapter::with_http_client(None, client.clone());

        let error = adapter
            .fetch(FetchRequest::new(seoul(), DataType::Current))
            .await
            .expect_err("no key configured");

        assert_eq!(error.kind(), SourceErrorKind::MissingCredentials);
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn api_key_is_url_encoded_into_the_query() {
        let client = Arc::new(ScriptedHttpClient::body(
            r#"{"main": {"temp": 10.0, "humidity": 50, "pressure": 1000}}"#,
        ));
        let adapter =
            OpenWeatherAdapter::with_http_client(Some("k&y=1".into()), client.clone());

        adapter
            .fetch(FetchRequest::new(seoul(), DataType::Current))
            .await
            .expect("fetch succeeds");

        let urls = client.requested_urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("appid=k%26y%3D1"), "url: {}", urls[0]);
        assert!(urls[0].starts_with("https://api.openweathermap.org/data/2.5/weather?"));
    }
}
