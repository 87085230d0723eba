use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in cache keys, jobs, and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Openweather,
    Weatherapi,
    Accuweather,
    Noaa,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [
        Self::Openweather,
        Self::Weatherapi,
        Self::Accuweather,
        Self::Noaa,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Openweather => "openweather",
            Self::Weatherapi => "weatherapi",
            Self::Accuweather => "accuweather",
            Self::Noaa => "noaa",
        }
    }

    /// Whether the provider requires an API key at all.
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Noaa)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openweather" => Ok(Self::Openweather),
            "weatherapi" => Ok(Self::Weatherapi),
            "accuweather" => Ok(Self::Accuweather),
            "noaa" => Ok(Self::Noaa),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_providers_through_strings() {
        for provider in ProviderId::ALL {
            let parsed: ProviderId = provider.as_str().parse().expect("parsable");
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(matches!(
            "kma".parse::<ProviderId>(),
            Err(ValidationError::InvalidSource { .. })
        ));
    }

    #[test]
    fn only_noaa_is_keyless() {
        assert!(!ProviderId::Noaa.requires_api_key());
        assert!(ProviderId::Openweather.requires_api_key());
        assert!(ProviderId::Weatherapi.requires_api_key());
        assert!(ProviderId::Accuweather.requires_api_key());
    }
}
