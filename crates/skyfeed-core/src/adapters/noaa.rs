//! NOAA / National Weather Service adapter (forecast only, no API key).
//! Each fetch resolves the coordinate through the points endpoint to a
//! gridpoint forecast URL, then takes the first forecast period. NWS
//! reports imperial units, so temperature and wind are converted here.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use super::{execute_provider_call, parse_json};
use crate::circuit_breaker::CircuitBreaker;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{
    CapabilitySet, FetchRequest, ProviderId, SourceAdapter, SourceError, UtcDateTime,
    WeatherFields, WeatherRecord,
};

const BASE_URL: &str = "https://api.weather.gov";

pub struct NoaaAdapter {
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: CircuitBreaker,
}

impl NoaaAdapter {
    pub fn new() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            circuit_breaker: CircuitBreaker::default(),
        }
    }

    async fn fetch_inner(&self, req: FetchRequest) -> Result<WeatherRecord, SourceError> {
        if !self.capabilities().supports(req.data_type) {
            return Err(SourceError::unsupported_data_type(self.id(), req.data_type));
        }

        let points_url = format!(
            "{BASE_URL}/points/{:.4},{:.4}",
            req.location.lat(),
            req.location.lon(),
        );
        let response = execute_provider_call(
            self.id(),
            self.http_client.as_ref(),
            &self.circuit_breaker,
            HttpRequest::get(points_url),
        )
        .await?;

        let points: PointsEnvelope = parse_json(self.id(), &response.body)?;
        let forecast_url = points.properties.forecast.ok_or_else(|| {
            SourceError::provider("noaa points response carried no forecast url")
        })?;

        let response = execute_provider_call(
            self.id(),
            self.http_client.as_ref(),
            &self.circuit_breaker,
            HttpRequest::get(forecast_url),
        )
        .await?;

        let forecast: ForecastEnvelope = parse_json(self.id(), &response.body)?;
        let period = forecast
            .properties
            .periods
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::provider("noaa returned no forecast periods"))?;

        let observed_at = match period.start_time.as_deref() {
            Some(raw) => parse_period_start(raw)?,
            None => UtcDateTime::now(),
        };

        let temperature_c = period.temperature.map(|value| {
            if period.temperature_unit.as_deref() == Some("C") {
                value
            } else {
                (value - 32.0) * 5.0 / 9.0
            }
        });

        let fields = WeatherFields {
            temperature_c,
            humidity_pct: period.relative_humidity.and_then(|h| h.value),
            wind_speed_ms: period.wind_speed.as_deref().and_then(parse_wind_speed_mph),
            precipitation_mm: None,
            pressure_hpa: None,
            condition: period.short_forecast,
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

impl Default for NoaaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAdapter for NoaaAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Noaa
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, true, false)
    }

    fn fetch<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<WeatherRecord, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_inner(req))
    }
}

/// Period start times carry the gridpoint's local offset; normalize to UTC.
fn parse_period_start(raw: &str) -> Result<UtcDateTime, SourceError> {
    let parsed = OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|error| {
            SourceError::provider(format!("noaa returned a bad period start time: {error}"))
        })?
        .to_offset(UtcOffset::UTC);
    UtcDateTime::from_offset_datetime(parsed).map_err(|error| {
        SourceError::provider(format!("noaa returned a bad period start time: {error}"))
    })
}

/// NWS wind speeds are strings such as "10 mph" or "5 to 10 mph"; take the
/// upper bound and convert to m/s.
fn parse_wind_speed_mph(raw: &str) -> Option<f64> {
    let mph = raw
        .split_whitespace()
        .filter_map(|token| token.parse::<f64>().ok())
        .last()?;
    Some(mph * 0.44704)
}

#[derive(Debug, Deserialize)]
struct PointsEnvelope {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastEnvelope {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<PeriodPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodPayload {
    start_time: Option<String>,
    temperature: Option<f64>,
    temperature_unit: Option<String>,
    wind_speed: Option<String>,
    relative_humidity: Option<HumidityPayload>,
    short_forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HumidityPayload {
    value: Option<f64>,
}
