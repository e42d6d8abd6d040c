//! Health Store
//!
//! The external health-data store is a collaborator: the pipeline only reads
//! from it and never persists anything it reads.
//!
//! - **types**: Raw data model (samples, workouts, statistics windows, routes)
//! - **units**: Physical units and quantity conversion
//! - **interval**: Statistics bucket sizes
//! - **predicate**: Compound query predicates
//! - **profile**: Characteristics and activity summaries
//! - **envelope**: Typed result envelopes
//! - **memory**: In-process store backed by JSON snapshots
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use vitalis::store::{HealthStore, MemoryStore, Predicate, SampleType, SortOrder, TimeRange};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::load("snapshot.json").await?;
//!     let predicate = Predicate::time_range(TimeRange::last_days(7));
//!     let samples = store
//!         .quantity_samples(SampleType::HeartRate, &predicate, SortOrder::Descending, None)
//!         .await?;
//!     println!("{} heart rate samples", samples.len());
//!     Ok(())
//! }
//! ```

mod envelope;
mod error;
mod interval;
mod memory;
mod predicate;
mod profile;
mod types;
pub mod units;

pub use envelope::ResultEnvelope;
pub use error::{StoreError, StoreResult};
pub use interval::{ParseIntervalError, StatisticsInterval};
pub use memory::{InjectedFailure, MemoryStore, RouteRecord, Snapshot};
pub use predicate::{Matchable, Predicate};
pub use profile::{
    ActivitySummary, BiologicalSex, BloodType, CharacteristicKind, Characteristics, MoveMode,
    SkinType,
};
pub use types::*;
pub use units::{Dimension, Quantity, Unit};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Sort order of sample queries, by start date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    /// Newest first
    #[default]
    Descending,
}

/// Aggregations computed for each statistics window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsOptions {
    pub sum: bool,
    pub average: bool,
    pub minimum: bool,
    pub maximum: bool,
    pub duration: bool,
}

impl StatisticsOptions {
    /// Running sum, for cumulative quantities (steps, distance, energy)
    pub fn cumulative_sum() -> Self {
        Self {
            sum: true,
            ..Default::default()
        }
    }

    /// Average, minimum and maximum, for discrete quantities
    pub fn discrete() -> Self {
        Self {
            average: true,
            minimum: true,
            maximum: true,
            ..Default::default()
        }
    }
}

/// A statistics-collection query
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsQuery {
    pub sample_type: SampleType,
    pub predicate: Predicate,
    pub options: StatisticsOptions,
    /// Aligned anchor every window boundary derives from
    pub anchor: DateTime<Utc>,
    pub interval: StatisticsInterval,
}

/// Object types the store can grant read access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Sample(SampleType),
    Characteristic(CharacteristicKind),
    ActivitySummary,
    WorkoutRoute,
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectType::Sample(t) => write!(f, "{}", t),
            ObjectType::Characteristic(k) => write!(f, "{}", k.name()),
            ObjectType::ActivitySummary => write!(f, "activitySummary"),
            ObjectType::WorkoutRoute => write!(f, "workoutRoute"),
        }
    }
}

/// Read access to a health-data store
///
/// Implementations may fail, return empty or partial results, or require
/// re-authorization at any time.
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Whether health data exists on this device at all
    fn is_available(&self) -> bool;

    /// Ask the user for read access; Ok(false) means the request was declined
    async fn request_authorization(&self, read: &BTreeSet<ObjectType>) -> StoreResult<bool>;

    async fn quantity_samples(
        &self,
        sample_type: SampleType,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<QuantitySample>>;

    async fn category_samples(
        &self,
        sample_type: SampleType,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<CategorySample>>;

    async fn workouts(
        &self,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Workout>>;

    /// All workouts carrying the given identifier
    async fn lookup_workout(&self, id: Uuid) -> StoreResult<Vec<Workout>>;

    async fn statistics_collection(
        &self,
        query: &StatisticsQuery,
    ) -> StoreResult<StatisticsCollection>;

    /// Routes recorded for a workout, in recording order
    async fn workout_routes(&self, workout_id: Uuid) -> StoreResult<Vec<WorkoutRoute>>;

    /// One page of a route's locations starting at `cursor`
    async fn route_locations(
        &self,
        route: &WorkoutRoute,
        cursor: usize,
        page_size: usize,
    ) -> StoreResult<LocationPage>;

    async fn characteristics(&self) -> StoreResult<Characteristics>;

    /// Activity summaries for the days inside `range`
    async fn activity_summaries(&self, range: &TimeRange) -> StoreResult<Vec<ActivitySummary>>;

    async fn electrocardiograms(
        &self,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Electrocardiogram>>;
}
