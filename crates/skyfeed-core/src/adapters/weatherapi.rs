//! WeatherAPI.com adapter. The only provider in the set that serves all
//! three data types; historical requests fetch the previous calendar day.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;

use super::{execute_provider_call, parse_json};
use crate::circuit_breaker::CircuitBreaker;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{
    CapabilitySet, DataType, FetchRequest, ProviderId, SourceAdapter, SourceError, UtcDateTime,
    WeatherFields, WeatherRecord,
};

const BASE_URL: &str = "https://api.weatherapi.com/v1";

pub struct WeatherApiAdapter {
    api_key: Option<String>,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: CircuitBreaker,
}

impl WeatherApiAdapter {
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
        let query = format!(
            "key={}&q={},{}",
            urlencoding::encode(api_key),
            req.location.lat(),
            req.location.lon(),
        );
        match req.data_type {
            DataType::Current => format!("{BASE_URL}/current.json?{query}"),
            DataType::Forecast => format!("{BASE_URL}/forecast.json?{query}&days=1"),
            DataType::Historical => {
                format!("{BASE_URL}/history.json?{query}&dt={}", previous_day())
            }
        }
    }

    async fn fetch_inner(&self, req: FetchRequest) -> Result<WeatherRecord, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::missing_credentials(self.id()))?;

        let request = HttpRequest::get(self.request_url(req, api_key));
        let response =
            execute_provider_call(self.id(), self.http_client.as_ref(), &self.circuit_breaker, request)
                .await?;

        let item = match req.data_type {
            DataType::Current => {
                let payload: CurrentEnvelope = parse_json(self.id(), &response.body)?;
                payload.current
            }
            DataType::Forecast | DataType::Historical => {
                let payload: ForecastEnvelope = parse_json(self.id(), &response.body)?;
                payload
                    .forecast
                    .forecastday
                    .into_iter()
                    .next()
                    .and_then(|day| day.hour.into_iter().next())
                    .ok_or_else(|| {
                        SourceError::provider("weatherapi returned no forecast hours")
                    })?
            }
        };

        let observed_at = match item.epoch {
            Some(seconds) => UtcDateTime::from_unix_timestamp(seconds).map_err(|error| {
                SourceError::provider(format!("weatherapi returned a bad timestamp: {error}"))
            })?,
            None => UtcDateTime::now(),
        };

        let fields = WeatherFields {
            temperature_c: item.temp_c,
            humidity_pct: item.humidity,
            wind_speed_ms: item.wind_kph.map(|kph| kph / 3.6),
            precipitation_mm: item.precip_mm,
            pressure_hpa: item.pressure_mb,
            condition: item.condition.and_then(|c| c.text),
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

impl SourceAdapter for WeatherApiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Weatherapi
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn fetch<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<WeatherRecord, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_inner(req))
    }
}

fn previous_day() -> String {
    let date = (OffsetDateTime::now_utc() - time::Duration::days(1)).date();
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Shared shape of a current-conditions block and a forecast hour entry;
/// the two differ only in the epoch field name.
#[derive(Debug, Deserialize)]
struct ObservationPayload {
    #[serde(alias = "last_updated_epoch", alias = "time_epoch")]
    epoch: Option<i64>,
    temp_c: Option<f64>,
    humidity: Option<f64>,
    wind_kph: Option<f64>,
    precip_mm: Option<f64>,
    pressure_mb: Option<f64>,
    condition: Option<ConditionPayload>,
}

#[derive(Debug, Deserialize)]
struct ConditionPayload {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentEnvelope {
    current: ObservationPayload,
}

#[derive(Debug, Deserialize)]
struct ForecastEnvelope {
    forecast: ForecastPayload,
}

#[derive(Debug, Deserialize)]
struct ForecastPayload {
    forecastday: Vec<ForecastDayPayload>,
}

#[derive(Debug, Deserialize)]
struct ForecastDayPayload {
    #[serde(default)]
    hour: Vec<ObservationPayload>,
}
