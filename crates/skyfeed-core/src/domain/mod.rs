//! Canonical domain types: locations, timestamps, and weather records.

mod location;
mod record;
mod timestamp;

pub use location::{Location, LocationKey};
pub use record::{DataType, WeatherFields, WeatherRecord};
pub use timestamp::UtcDateTime;
