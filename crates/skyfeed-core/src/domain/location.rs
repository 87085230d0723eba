use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Geographic coordinate pair in decimal degrees, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation", into = "RawLocation")]
pub struct Location {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawLocation {
    lat: f64,
    lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "lat" });
        }
        if !lon.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "lon" });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange { value: lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange { value: lon });
        }

        Ok(Self { lat, lon })
    }

    pub const fn lat(self) -> f64 {
        self.lat
    }

    pub const fn lon(self) -> f64 {
        self.lon
    }

    /// Bucket to the cache-key resolution (3 decimal degrees, ~110 m).
    pub fn key(self) -> LocationKey {
        LocationKey {
            lat_milli: bucket_millidegrees(self.lat),
            lon_milli: bucket_millidegrees(self.lon),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat, self.lon)
    }
}

impl TryFrom<RawLocation> for Location {
    type Error = ValidationError;

    fn try_from(value: RawLocation) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lon)
    }
}

impl From<Location> for RawLocation {
    fn from(value: Location) -> Self {
        Self {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

/// Coordinates rounded to integer milli-degrees. Near-duplicate coordinates
/// collapse onto the same key so they share one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub lat_milli: i32,
    pub lon_milli: i32,
}

impl Display for LocationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.lat_milli, self.lon_milli)
    }
}

fn bucket_millidegrees(degrees: f64) -> i32 {
    (degrees * 1000.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(matches!(
            Location::new(90.5, 0.0),
            Err(ValidationError::LatitudeOutOfRange { .. })
        ));
        assert!(matches!(
            Location::new(0.0, -180.5),
            Err(ValidationError::LongitudeOutOfRange { .. })
        ));
        assert!(matches!(
            Location::new(f64::NAN, 0.0),
            Err(ValidationError::NonFiniteValue { field: "lat" })
        ));
    }

    #[test]
    fn nearby_coordinates_share_a_key() {
        let seoul = Location::new(37.5667, 126.9780).expect("valid");
        let nearby = Location::new(37.56672, 126.97802).expect("valid");
        let elsewhere = Location::new(37.5680, 126.9780).expect("valid");

        assert_eq!(seoul.key(), nearby.key());
        assert_ne!(seoul.key(), elsewhere.key());
    }

    #[test]
    fn key_rounds_rather_than_truncates() {
        let location = Location::new(10.0006, -10.0006).expect("valid");
        let key = location.key();
        assert_eq!(key.lat_milli, 10_001);
        assert_eq!(key.lon_milli, -10_001);
    }

    #[test]
    fn serde_rejects_invalid_payloads() {
        let err = serde_json::from_str::<Location>(r#"{"lat": 120.0, "lon": 0.0}"#);
        assert!(err.is_err());

        let ok: Location =
            serde_json::from_str(r#"{"lat": 37.5665, "lon": 126.978}"#).expect("valid");
        assert_eq!(ok.lat(), 37.5665);
    }
}
