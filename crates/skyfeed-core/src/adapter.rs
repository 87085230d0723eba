//! Source adapter contract and the error taxonomy shared by the whole
//! collection pipeline.
//!
//! Every provider implements [`SourceAdapter`]; the retry layer decides
//! whether to re-attempt a call purely from [`SourceError::retryable`],
//! which each adapter sets when classifying upstream failures.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{DataType, Location, ProviderId, WeatherRecord};

/// Request payload for a single provider fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRequest {
    pub location: Location,
    pub data_type: DataType,
}

impl FetchRequest {
    pub const fn new(location: Location, data_type: DataType) -> Self {
        Self {
            location,
            data_type,
        }
    }
}

/// Supported data-type matrix for a source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub current: bool,
    pub forecast: bool,
    pub historical: bool,
}

impl CapabilitySet {
    pub const fn new(current: bool, forecast: bool, historical: bool) -> Self {
        Self {
            current,
            forecast,
            historical,
        }
    }

    pub const fn full() -> Self {
        Self::new(true, true, true)
    }

    pub const fn supports(self, data_type: DataType) -> bool {
        match data_type {
            DataType::Current => self.current,
            DataType::Forecast => self.forecast,
            DataType::Historical => self.historical,
        }
    }

    pub fn supported_types(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(3);
        if self.current {
            values.push("current");
        }
        if self.forecast {
            values.push("forecast");
        }
        if self.historical {
            values.push("historical");
        }
        values
    }
}

/// Adapter-level error classification. The `Transport` and `RateLimited`
/// kinds are transient and drive retries; everything else is terminal for
/// the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Transport,
    RateLimited,
    Provider,
    MissingCredentials,
    InvalidRequest,
    UnsupportedDataType,
    AdapterNotRegistered,
    RetryExhausted,
}

/// Structured source error carried through retry, scheduling, and statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Provider,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn missing_credentials(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::MissingCredentials,
            message: format!("no API key configured for source '{provider}'"),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unsupported_data_type(provider: ProviderId, data_type: DataType) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedDataType,
            message: format!("source '{provider}' does not provide {data_type} data"),
            retryable: false,
        }
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::AdapterNotRegistered,
            message: format!("source adapter '{provider}' is not registered"),
            retryable: false,
        }
    }

    /// Terminal outcome after the retry budget is spent. The job is not dead;
    /// it runs again at its next scheduled tick.
    pub fn retry_exhausted(attempts: u32, last_cause: &SourceError) -> Self {
        Self {
            kind: SourceErrorKind::RetryExhausted,
            message: format!(
                "gave up after {attempts} attempts; last error: {}",
                last_cause.message
            ),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Provider => "source.provider",
            SourceErrorKind::MissingCredentials => "source.missing_credentials",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::UnsupportedDataType => "source.unsupported_data_type",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
            SourceErrorKind::RetryExhausted => "source.retry_exhausted",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Source adapter contract.
///
/// One implementation per provider, translating that provider's response
/// into a canonical [`WeatherRecord`]. A `fetch` performs the provider's
/// network round (or mandated round sequence) every time it is invoked;
/// caching lives one layer up in the collector.
///
/// Implementations must be `Send + Sync`; the scheduler shares them across
/// concurrently running jobs.
pub trait SourceAdapter: Send + Sync {
    /// Unique provider identifier.
    fn id(&self) -> ProviderId;

    /// The data types this provider can serve.
    fn capabilities(&self) -> CapabilitySet;

    /// Fetch one canonical record for the requested location and data type.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] classified as transient (`Transport`,
    /// `RateLimited`) or fatal (`Provider`, `MissingCredentials`,
    /// `InvalidRequest`, `UnsupportedDataType`); the retry layer acts on
    /// that classification.
    fn fetch<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<WeatherRecord, SourceError>> + Send + 'a>>;
}

impl std::fmt::Debug for dyn SourceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceAdapter").field("id", &self.id()).finish()
    }
}
