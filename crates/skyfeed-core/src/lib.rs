//! # Skyfeed Core
//!
//! Core contracts and collection pipeline for the Skyfeed weather data
//! toolkit.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Skyfeed:
//!
//! - **Canonical domain models** for locations, observations, and forecasts
//! - **Source adapters** for OpenWeatherMap, WeatherAPI, AccuWeather, and NOAA
//! - **Collection pipeline** with caching, retries, throttling, and quality
//!   validation
//! - **Periodic scheduler** running named collection jobs with overlap
//!   protection and crash-safe job persistence
//!
//! ## Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `default` | Standard feature set |
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Source adapter trait and structured errors |
//! | [`adapters`] | Provider adapters (OpenWeatherMap, WeatherAPI, AccuWeather, NOAA) |
//! | [`cache`] | TTL record cache with lazy expiry |
//! | [`circuit_breaker`] | Circuit breaker for resilient upstream calls |
//! | [`collector`] | Collection pipeline tying the layers together |
//! | [`config`] | Credentials and application configuration |
//! | [`domain`] | Domain models (Location, WeatherRecord, timestamps) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`provider_policy`] | Per-provider quota and backoff policies |
//! | [`quality`] | Quality scoring and admission gate |
//! | [`registry`] | Explicit source adapter registry |
//! | [`retry`] | Retry executor with jittered backoff |
//! | [`scheduler`] | Periodic collection scheduler |
//! | [`source`] | Provider identifiers |
//! | [`stats`] | Per-source collection statistics |
//! | [`throttling`] | Rate limiting support |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skyfeed_core::config::{build_default_registry, Credentials};
//! use skyfeed_core::{Collector, DataType, Location, ProviderId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = build_default_registry(&Credentials::from_env());
//!     let collector = Collector::new(registry);
//!
//!     let seoul = Location::new(37.5665, 126.9780)?;
//!     let result = collector
//!         .collect(ProviderId::Openweather, seoul, DataType::Current)
//!         .await?;
//!
//!     println!(
//!         "{:?}: {:?} (score {:.2})",
//!         result.origin,
//!         result.record.fields.temperature_c,
//!         result.record.quality_score.unwrap_or(0.0),
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Jobs     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Scheduler     │────▶│ Concurrency Cap  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Collector     │────▶│ Cache / Stats    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Throttle, Retry │────▶│ Circuit Breaker  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Source Adapter  │────▶│ HTTP Client      │
//! └────────┬────────┘     │ (reqwest/none)   │
//!          │              └──────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Quality Gate    │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result` types with structured errors:
//!
//! ```rust
//! use skyfeed_core::{SourceError, SourceErrorKind};
//!
//! fn handle_error(error: SourceError) {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => {
//!             // Wait and retry
//!         }
//!         SourceErrorKind::Transport => {
//!             // Transient; the retry layer already backed off
//!         }
//!         SourceErrorKind::MissingCredentials => {
//!             // Report to user
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables only (never logged)
//! - All HTTP requests use TLS
//! - Input validation on all domain types

pub mod adapter;
pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod provider_policy;
pub mod quality;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod stats;
pub mod throttling;

// Re-export commonly used types at crate root for convenience

// Adapter contract and structured errors
pub use adapter::{CapabilitySet, FetchRequest, SourceAdapter, SourceError, SourceErrorKind};

// Adapter implementations
pub use adapters::{AccuWeatherAdapter, NoaaAdapter, OpenWeatherAdapter, WeatherApiAdapter};

// Caching
pub use cache::{CacheKey, CacheStore, Cached};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Collection pipeline
pub use collector::{CollectionResult, Collector, RecordOrigin};

// Configuration
pub use config::{build_default_registry, AppConfig, Credentials};

// Domain models
pub use domain::{
    DataType, Location, LocationKey, UtcDateTime, WeatherFields, WeatherRecord,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Policies and throttling
pub use provider_policy::{BackoffPolicy, ProviderPolicy};
pub use throttling::ThrottlingQueue;

// Quality validation
pub use quality::{QualityConfig, QualityValidator, QualityVerdict};

// Registry
pub use registry::AdapterRegistry;

// Retry
pub use retry::{Backoff, RetryConfig, RetryExecutor};

// Scheduling
pub use scheduler::{
    CollectionJob, CollectionScheduler, JobSnapshot, JobStatus, SchedulerConfig,
};

// Provider identifiers
pub use source::ProviderId;

// Statistics
pub use stats::{SourceStats, StatsRegistry};
