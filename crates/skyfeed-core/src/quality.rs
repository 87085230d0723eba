//! Scored admission gate for ingested records.
//!
//! A record is scored on three components, each in `[0, 1]`:
//!
//! | Component | Meaning |
//! |---|---|
//! | completeness | expected fields present, non-null, and in sane range |
//! | plausibility | of the fields present, the fraction in sane range |
//! | staleness | recency of `observed_at` for `current` records |
//!
//! Out-of-range values count as absent for completeness, so an implausible
//! field is penalized on both axes and is never treated as valid downstream.
//! Components compose multiplicatively with their weights as exponents;
//! equal weights by default, a zero weight disables a component.
//!
//! Records below the threshold are flagged, not discarded: they are still
//! cached and served, carrying their score for consumers to act on.

use std::time::Duration;

use crate::{DataType, UtcDateTime, WeatherRecord};

/// Verdict of the admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityVerdict {
    Accepted,
    Flagged,
}

impl QualityVerdict {
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Scoring weights and thresholds.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Scores below this are flagged.
    pub threshold: f64,
    pub completeness_weight: f64,
    pub plausibility_weight: f64,
    pub staleness_weight: f64,
    /// Recency window for `current` observations. The staleness component
    /// is 1.0 inside the window and decays linearly to 0.0 at twice it.
    pub max_observation_age: Duration,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.70,
            completeness_weight: 1.0,
            plausibility_weight: 1.0,
            staleness_weight: 1.0,
            max_observation_age: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Scores records for completeness and physical plausibility.
#[derive(Debug, Clone, Default)]
pub struct QualityValidator {
    config: QualityConfig,
}

impl QualityValidator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Score a record against the current wall clock.
    pub fn score(&self, record: &WeatherRecord) -> f64 {
        self.score_at(record, UtcDateTime::now())
    }

    /// Score with an explicit `now`, for deterministic evaluation.
    pub fn score_at(&self, record: &WeatherRecord, now: UtcDateTime) -> f64 {
        let expected = record.fields.expected();
        let expected_total = expected.len() as f64;

        let mut present = 0_u32;
        let mut present_in_range = 0_u32;
        for (_, value, (lo, hi)) in expected {
            if let Some(value) = value {
                present += 1;
                if value.is_finite() && value >= lo && value <= hi {
                    present_in_range += 1;
                }
            }
        }

        let completeness = f64::from(present_in_range) / expected_total;
        let plausibility = if present == 0 {
            0.0
        } else {
            f64::from(present_in_range) / f64::from(present)
        };
        let staleness = self.staleness_component(record, now);

        let score = completeness.powf(self.config.completeness_weight)
            * plausibility.powf(self.config.plausibility_weight)
            * staleness.powf(self.config.staleness_weight);

        score.clamp(0.0, 1.0)
    }

    /// Score the record and classify it against the threshold. The scored
    /// record is returned; flagged records stay available to consumers.
    pub fn validate(&self, record: WeatherRecord) -> (WeatherRecord, QualityVerdict) {
        self.validate_at(record, UtcDateTime::now())
    }

    pub fn validate_at(
        &self,
        record: WeatherRecord,
        now: UtcDateTime,
    ) -> (WeatherRecord, QualityVerdict) {
        let score = self.score_at(&record, now);
        let verdict = if score >= self.config.threshold {
            QualityVerdict::Accepted
        } else {
            QualityVerdict::Flagged
        };
        (record.with_quality_score(score), verdict)
    }

    fn staleness_component(&self, record: &WeatherRecord, now: UtcDateTime) -> f64 {
        // Forecast and historical records are timestamped by their subject
        // period, not by collection time; only current data has a recency
        // requirement.
        if record.data_type != DataType::Current {
            return 1.0;
        }

        let window = self.config.max_observation_age.as_secs_f64();
        if window <= 0.0 {
            return 1.0;
        }

        let age = record.observed_at.age_from(now).as_secs_f64();
        if age <= window {
            1.0
        } else {
            (2.0 - age / window).clamp(0.0, 1.0)
        }
    }
}
