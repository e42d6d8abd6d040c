//! Normalization Engine
//!
//! One pure transform per domain, turning a [`ResultEnvelope`] into unified
//! records:
//!
//! - **Workout**: Activity lookup, distance precedence, events and laps
//! - **Sleep**: Stage accumulation, efficiency, latency and scores
//! - **Samples**: Statistics-window totals and point-sample aggregates
//! - **Route**: Ordered location traces
//! - **Summary**: Characteristics and daily activity summaries
//! - **Clinical**: Blood glucose and electrocardiograms
//! - **Canonical**: Canonical-unit resolution
//!
//! ```text
//! Fetched { envelope, range } ─▶ Normalizer::normalize(data_type) ─▶ Vec<NormalizedRecord>
//! ```
//!
//! Transforms never mutate their input and hold no state between calls. A
//! single unconvertible sample is skipped and logged; it never fails the
//! batch.

pub mod activity;
pub mod canonical;
pub mod clinical;
pub mod route;
pub mod samples;
pub mod sleep;
pub mod summary;
pub mod workout;

pub use samples::{CumulativeDomain, PointDomain};
pub use sleep::SleepOptions;

use crate::logging::Logger;
use crate::query::Fetched;
use crate::schema::{DataType, NormalizedRecord};
use crate::store::{ResultEnvelope, TimeRange};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use thiserror::Error;

/// Normalization errors
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("{data_type} cannot be normalized from a {found} envelope")]
    UnexpectedEnvelope {
        data_type: DataType,
        found: &'static str,
    },

    #[error("Data type not supported: {0}")]
    Unsupported(DataType),
}

/// Result type for normalization
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Dispatches envelopes to the transform of their domain
#[derive(Debug, Clone)]
pub struct Normalizer {
    logger: Logger,
    offset: FixedOffset,
    sleep: SleepOptions,
    reference: Option<DateTime<Utc>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            logger: Logger::current(),
            offset: Utc.fix(),
            sleep: SleepOptions::default(),
            reference: None,
        }
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Caller's calendar offset
    pub fn offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn sleep_options(mut self, options: SleepOptions) -> Self {
        self.sleep = options;
        self
    }

    /// Pin the instant used as "now" when computing characteristic ages
    pub fn reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference.unwrap_or_else(Utc::now)
    }

    /// Normalize one fetch result
    pub fn normalize(
        &self,
        data_type: DataType,
        fetched: &Fetched,
    ) -> NormalizeResult<Vec<NormalizedRecord>> {
        self.normalize_envelope(data_type, &fetched.envelope, &fetched.range)
    }

    /// Normalize an envelope whose effective range is `range`
    pub fn normalize_envelope(
        &self,
        data_type: DataType,
        envelope: &ResultEnvelope,
        range: &TimeRange,
    ) -> NormalizeResult<Vec<NormalizedRecord>> {
        self.logger.in_scope(|| {
            let records = self.dispatch(data_type, envelope, range)?;
            tracing::debug!(
                data_type = %data_type,
                items = envelope.len(),
                records = records.len(),
                "Normalized envelope"
            );
            Ok(records)
        })
    }

    fn dispatch(
        &self,
        data_type: DataType,
        envelope: &ResultEnvelope,
        range: &TimeRange,
    ) -> NormalizeResult<Vec<NormalizedRecord>> {
        if !data_type.is_supported() {
            return Err(NormalizeError::Unsupported(data_type));
        }
        let unexpected = || NormalizeError::UnexpectedEnvelope {
            data_type,
            found: envelope.kind(),
        };

        if let Some(domain) = CumulativeDomain::from_data_type(data_type) {
            return match envelope {
                ResultEnvelope::Statistics(collection) => {
                    Ok(vec![samples::window_totals(domain, collection, range)])
                }
                _ => Err(unexpected()),
            };
        }
        if let Some(domain) = PointDomain::from_data_type(data_type) {
            return match envelope {
                ResultEnvelope::QuantitySamples(items) => {
                    Ok(samples::point_series(domain, items).into_iter().collect())
                }
                _ => Err(unexpected()),
            };
        }

        let records = match (data_type, envelope) {
            (DataType::Workouts, ResultEnvelope::Workouts(items)) => {
                workout::workouts(items, self.offset)
            }
            (DataType::WorkoutRoute, ResultEnvelope::Locations(items)) => {
                vec![route::route(items)]
            }
            (DataType::Sleep, ResultEnvelope::CategorySamples(items)) => {
                sleep::sleep_sessions(items, self.offset, &self.sleep)
            }
            (DataType::Heart, ResultEnvelope::QuantitySamples(items)) => {
                samples::heart_rate(items).into_iter().collect()
            }
            (DataType::Characteristic, ResultEnvelope::Characteristics { values, kinds }) => {
                let today = self.now().with_timezone(&self.offset).date_naive();
                summary::characteristics(values, kinds, today)
            }
            (DataType::ActivitiesSummary, ResultEnvelope::ActivitySummaries(items)) => items
                .iter()
                .map(|s| summary::activity_summary(s, self.offset))
                .collect(),
            (DataType::Glucose, ResultEnvelope::QuantitySamples(items)) => {
                clinical::glucose(items).into_iter().collect()
            }
            (DataType::Electrocardiogram, ResultEnvelope::Electrocardiograms(items)) => {
                clinical::electrocardiograms(items, self.offset)
            }
            _ => return Err(unexpected()),
        };
        Ok(records)
    }
}
