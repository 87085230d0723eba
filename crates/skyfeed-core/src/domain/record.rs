use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Location, ProviderId, UtcDateTime, ValidationError};

/// Category of requested data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Current,
    Forecast,
    Historical,
}

impl DataType {
    pub const ALL: [Self; 3] = [Self::Current, Self::Forecast, Self::Historical];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
            Self::Historical => "historical",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "forecast" => Ok(Self::Forecast),
            "historical" => Ok(Self::Historical),
            other => Err(ValidationError::InvalidDataType {
                value: other.to_owned(),
            }),
        }
    }
}

/// Canonical observation fields. Providers differ in coverage, so every
/// field is optional; units are normalized at the adapter boundary
/// (°C, %, m/s, mm, hPa).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherFields {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub pressure_hpa: Option<f64>,
    /// Free-text condition summary; not counted toward completeness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl WeatherFields {
    /// The numeric fields a complete record is expected to carry, in a
    /// stable order: (name, value, sane range).
    pub fn expected(&self) -> [(&'static str, Option<f64>, (f64, f64)); 5] {
        [
            ("temperature_c", self.temperature_c, (-90.0, 60.0)),
            ("humidity_pct", self.humidity_pct, (0.0, 100.0)),
            ("wind_speed_ms", self.wind_speed_ms, (0.0, 120.0)),
            ("precipitation_mm", self.precipitation_mm, (0.0, 500.0)),
            ("pressure_hpa", self.pressure_hpa, (870.0, 1085.0)),
        ]
    }
}

/// A single validated observation or forecast point from one provider.
///
/// Immutable once created: a corrected re-fetch produces a new record, and
/// quality scoring consumes the unscored value rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub source: ProviderId,
    pub location: Location,
    pub data_type: DataType,
    pub observed_at: UtcDateTime,
    pub fields: WeatherFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    pub fetched_at: UtcDateTime,
}

impl WeatherRecord {
    pub fn new(
        source: ProviderId,
        location: Location,
        data_type: DataType,
        observed_at: UtcDateTime,
        fields: WeatherFields,
    ) -> Self {
        Self {
            source,
            location,
            data_type,
            observed_at,
            fields,
            quality_score: None,
            fetched_at: UtcDateTime::now(),
        }
    }

    /// Attach a quality score, producing the scored record.
    pub fn with_quality_score(self, score: f64) -> Self {
        Self {
            quality_score: Some(score),
            ..self
        }
    }
}
