//! In-process health store
//!
//! `MemoryStore` holds a [`Snapshot`] of store contents and answers every
//! `HealthStore` query from it. Snapshots are plain JSON so they can be
//! exported from a device once and replayed by the CLI, tests and benches.
//!
//! Thread-safe via Tokio's async RwLock for concurrent access.

use crate::store::error::{StoreError, StoreResult};
use crate::store::predicate::{Matchable, Predicate};
use crate::store::profile::{ActivitySummary, Characteristics};
use crate::store::types::{
    CategorySample, Electrocardiogram, Location, LocationPage, QuantitySample, SampleType,
    SourceInfo, StatisticsCollection, StatisticsWindow, TimeRange, Workout, WorkoutRoute,
};
use crate::store::units::{Quantity, Unit};
use crate::store::{HealthStore, ObjectType, SortOrder, StatisticsQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A recorded route with all of its locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub workout_id: Uuid,
    #[serde(default)]
    pub locations: Vec<Location>,
}

/// Full contents of a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub quantity_samples: Vec<QuantitySample>,
    #[serde(default)]
    pub category_samples: Vec<CategorySample>,
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
    #[serde(default)]
    pub characteristics: Characteristics,
    #[serde(default)]
    pub activity_summaries: Vec<ActivitySummary>,
    #[serde(default)]
    pub electrocardiograms: Vec<Electrocardiogram>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a quantity sample
    pub fn quantity(mut self, sample: QuantitySample) -> Self {
        self.quantity_samples.push(sample);
        self
    }

    /// Builder method: add a category sample
    pub fn category(mut self, sample: CategorySample) -> Self {
        self.category_samples.push(sample);
        self
    }

    /// Builder method: add a workout
    pub fn workout(mut self, workout: Workout) -> Self {
        self.workouts.push(workout);
        self
    }

    /// Builder method: add a route for a workout
    pub fn route(mut self, workout_id: Uuid, locations: Vec<Location>) -> Self {
        self.routes.push(RouteRecord {
            id: Uuid::new_v4(),
            workout_id,
            locations,
        });
        self
    }

    /// Builder method: set the characteristics
    pub fn characteristics(mut self, characteristics: Characteristics) -> Self {
        self.characteristics = characteristics;
        self
    }

    /// Builder method: add an activity summary
    pub fn activity_summary(mut self, summary: ActivitySummary) -> Self {
        self.activity_summaries.push(summary);
        self
    }

    /// Builder method: add an electrocardiogram
    pub fn electrocardiogram(mut self, ecg: Electrocardiogram) -> Self {
        self.electrocardiograms.push(ecg);
        self
    }
}

/// Failure the store reports for every query until cleared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    Inaccessible,
    Backend(String),
}

impl InjectedFailure {
    fn to_error(&self) -> StoreError {
        match self {
            InjectedFailure::Inaccessible => StoreError::Inaccessible,
            InjectedFailure::Backend(msg) => StoreError::Backend(msg.clone()),
        }
    }
}

/// Health store backed by an in-memory snapshot
#[derive(Clone)]
pub struct MemoryStore {
    snapshot: Arc<RwLock<Snapshot>>,
    available: bool,
    grant_access: bool,
    failure: Arc<RwLock<Option<InjectedFailure>>>,
    authorization_log: Arc<RwLock<Vec<BTreeSet<ObjectType>>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
            available: true,
            grant_access: true,
            failure: Arc::new(RwLock::new(None)),
            authorization_log: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A store reporting that health data is unavailable on this device
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Builder method: decline every authorization request
    pub fn deny_authorization(mut self) -> Self {
        self.grant_access = false;
        self
    }

    /// Load a snapshot from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;

        tracing::debug!(
            path = %path.as_ref().display(),
            quantity_samples = snapshot.quantity_samples.len(),
            category_samples = snapshot.category_samples.len(),
            workouts = snapshot.workouts.len(),
            "Loaded store snapshot"
        );

        Ok(Self::from_snapshot(snapshot))
    }

    /// Save the current snapshot as pretty JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = {
            let snapshot = self.snapshot.read().await;
            serde_json::to_string_pretty(&*snapshot)?
        };
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }

    /// Replace the snapshot contents
    pub async fn replace(&self, snapshot: Snapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Make every subsequent query fail until `clear_failure` is called
    pub async fn inject_failure(&self, failure: InjectedFailure) {
        *self.failure.write().await = Some(failure);
    }

    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Read sets passed to `request_authorization`, in call order
    pub async fn authorization_requests(&self) -> Vec<BTreeSet<ObjectType>> {
        self.authorization_log.read().await.clone()
    }

    async fn check(&self) -> StoreResult<()> {
        if !self.available {
            return Err(StoreError::Unavailable);
        }
        match self.failure.read().await.as_ref() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

fn select<T: Matchable + Clone>(
    items: impl Iterator<Item = T>,
    predicate: &Predicate,
    sort: SortOrder,
    limit: Option<usize>,
) -> Vec<T> {
    let mut selected: Vec<T> = items.filter(|item| predicate.matches(item)).collect();
    match sort {
        SortOrder::Ascending => selected.sort_by_key(|item| item.start()),
        SortOrder::Descending => selected.sort_by_key(|item| std::cmp::Reverse(item.start())),
    }
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

/// Running aggregate for one statistics window
#[derive(Default)]
struct WindowAccumulator {
    sum: f64,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
    seconds: f64,
    sources: Vec<SourceInfo>,
}

impl WindowAccumulator {
    fn add(&mut self, value: f64, seconds: f64, source: Option<&SourceInfo>) {
        self.sum += value;
        self.count += 1;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.seconds += seconds;
        if let Some(source) = source {
            if !self.sources.contains(source) {
                self.sources.push(source.clone());
            }
        }
    }
}

fn build_collection(samples: &[QuantitySample], query: &StatisticsQuery) -> StatisticsCollection {
    let step = query.interval.duration();
    let mut buckets: BTreeMap<DateTime<Utc>, WindowAccumulator> = BTreeMap::new();

    for sample in samples {
        let unit = query
            .sample_type
            .preferred_unit()
            .unwrap_or(sample.quantity.unit);
        let Some(value) = sample.quantity.value_in(unit) else {
            tracing::debug!(
                sample_type = %query.sample_type,
                unit = %sample.quantity.unit,
                "Skipping sample with incompatible unit"
            );
            continue;
        };
        let seconds = (sample.end - sample.start).num_milliseconds() as f64 / 1000.0;
        let start = query.interval.window_start(&query.anchor, &sample.start);
        buckets
            .entry(start)
            .or_default()
            .add(value, seconds, sample.source.as_ref());
    }

    let (Some(first), Some(last)) = (buckets.keys().next().copied(), buckets.keys().last().copied())
    else {
        return StatisticsCollection::empty(query.anchor);
    };

    let Some(span) = TimeRange::try_new(first, last + step) else {
        return StatisticsCollection::empty(query.anchor);
    };

    let options = query.options;
    let windows = query
        .interval
        .windows(query.anchor, &span)
        .into_iter()
        .map(|TimeRange { start, end }| match buckets.get(&start) {
            Some(acc) => {
                let unit = query
                    .sample_type
                    .preferred_unit()
                    .unwrap_or(Unit::Count);
                let wrap = |v: f64| Quantity::new(v, unit);
                StatisticsWindow {
                    start,
                    end,
                    sum: options.sum.then(|| wrap(acc.sum)),
                    average: (options.average && acc.count > 0)
                        .then(|| wrap(acc.sum / acc.count as f64)),
                    minimum: if options.minimum { acc.min.map(wrap) } else { None },
                    maximum: if options.maximum { acc.max.map(wrap) } else { None },
                    duration: options
                        .duration
                        .then(|| Quantity::new(acc.seconds, Unit::Second)),
                    sources: acc.sources.clone(),
                }
            }
            None => StatisticsWindow::empty(start, end),
        })
        .collect();

    StatisticsCollection {
        anchor: query.anchor,
        windows,
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn request_authorization(&self, read: &BTreeSet<ObjectType>) -> StoreResult<bool> {
        self.check().await?;
        self.authorization_log.write().await.push(read.clone());
        Ok(self.grant_access)
    }

    async fn quantity_samples(
        &self,
        sample_type: SampleType,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<QuantitySample>> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        let candidates = snapshot
            .quantity_samples
            .iter()
            .filter(|s| s.sample_type == sample_type)
            .cloned();
        Ok(select(candidates, predicate, sort, limit))
    }

    async fn category_samples(
        &self,
        sample_type: SampleType,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<CategorySample>> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        let candidates = snapshot
            .category_samples
            .iter()
            .filter(|s| s.sample_type == sample_type)
            .cloned();
        Ok(select(candidates, predicate, sort, limit))
    }

    async fn workouts(
        &self,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Workout>> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        Ok(select(snapshot.workouts.iter().cloned(), predicate, sort, limit))
    }

    async fn lookup_workout(&self, id: Uuid) -> StoreResult<Vec<Workout>> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .workouts
            .iter()
            .filter(|w| w.id == id)
            .cloned()
            .collect())
    }

    async fn statistics_collection(
        &self,
        query: &StatisticsQuery,
    ) -> StoreResult<StatisticsCollection> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        let samples: Vec<QuantitySample> = snapshot
            .quantity_samples
            .iter()
            .filter(|s| s.sample_type == query.sample_type && query.predicate.matches(*s))
            .cloned()
            .collect();
        Ok(build_collection(&samples, query))
    }

    async fn workout_routes(&self, workout_id: Uuid) -> StoreResult<Vec<WorkoutRoute>> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .routes
            .iter()
            .filter(|r| r.workout_id == workout_id)
            .map(|r| WorkoutRoute {
                id: r.id,
                workout_id: r.workout_id,
            })
            .collect())
    }

    async fn route_locations(
        &self,
        route: &WorkoutRoute,
        cursor: usize,
        page_size: usize,
    ) -> StoreResult<LocationPage> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        let record = snapshot
            .routes
            .iter()
            .find(|r| r.id == route.id)
            .ok_or_else(|| StoreError::Backend(format!("Unknown route: {}", route.id)))?;

        let page_size = page_size.max(1);
        let total = record.locations.len();
        let start = cursor.min(total);
        let end = (start + page_size).min(total);
        Ok(LocationPage {
            locations: record.locations[start..end].to_vec(),
            next: (end < total).then_some(end),
        })
    }

    async fn characteristics(&self) -> StoreResult<Characteristics> {
        self.check().await?;
        Ok(self.snapshot.read().await.characteristics.clone())
    }

    async fn activity_summaries(&self, range: &TimeRange) -> StoreResult<Vec<ActivitySummary>> {
        self.check().await?;
        let first_day = range.start.date_naive();
        let last_day = range.end.date_naive();
        let snapshot = self.snapshot.read().await;
        let mut summaries: Vec<ActivitySummary> = snapshot
            .activity_summaries
            .iter()
            .filter(|s| s.date >= first_day && s.date <= last_day)
            .cloned()
            .collect();
        summaries.sort_by_key(|s| s.date);
        Ok(summaries)
    }

    async fn electrocardiograms(
        &self,
        predicate: &Predicate,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Electrocardiogram>> {
        self.check().await?;
        let snapshot = self.snapshot.read().await;
        Ok(select(
            snapshot.electrocardiograms.iter().cloned(),
            predicate,
            sort,
            limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StatisticsInterval, StatisticsOptions};
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, d, h, m, 0).unwrap()
    }

    fn steps(d: u32, h: u32, count: f64) -> QuantitySample {
        QuantitySample::new(SampleType::StepCount, at(d, h, 0), Quantity::new(count, Unit::Count))
            .ending(at(d, h, 10))
            .source("Watch")
    }

    fn whole_april() -> Predicate {
        Predicate::time_range(TimeRange::try_new(at(1, 0, 0), at(30, 0, 0)).unwrap())
    }

    #[tokio::test]
    async fn test_quantity_samples_sorted_and_limited() {
        let store = MemoryStore::from_snapshot(
            Snapshot::new()
                .quantity(steps(20, 8, 100.0))
                .quantity(steps(20, 10, 300.0))
                .quantity(steps(20, 9, 200.0)),
        );

        let newest = store
            .quantity_samples(SampleType::StepCount, &whole_april(), SortOrder::Descending, Some(2))
            .await
            .unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].quantity.value, 300.0);
        assert_eq!(newest[1].quantity.value, 200.0);

        let oldest = store
            .quantity_samples(SampleType::StepCount, &whole_april(), SortOrder::Ascending, None)
            .await
            .unwrap();
        assert_eq!(oldest[0].quantity.value, 100.0);
    }

    #[tokio::test]
    async fn test_statistics_windows_are_contiguous() {
        let store = MemoryStore::from_snapshot(
            Snapshot::new()
                .quantity(steps(15, 8, 100.0))
                .quantity(steps(15, 20, 50.0))
                .quantity(steps(17, 9, 400.0)),
        );
        let query = StatisticsQuery {
            sample_type: SampleType::StepCount,
            predicate: whole_april(),
            options: StatisticsOptions::cumulative_sum(),
            anchor: at(15, 0, 0),
            interval: StatisticsInterval::Days(1),
        };

        let collection = store.statistics_collection(&query).await.unwrap();
        assert_eq!(collection.windows.len(), 3);
        assert_eq!(collection.windows[0].sum.map(|q| q.value), Some(150.0));
        // Gap day is present but empty
        assert_eq!(collection.windows[1].sum, None);
        assert_eq!(collection.windows[2].sum.map(|q| q.value), Some(400.0));
        for pair in collection.windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[0].end - pair[0].start, Duration::days(1));
        }
        assert_eq!(collection.windows[0].sources, vec![SourceInfo::new("Watch")]);
    }

    #[tokio::test]
    async fn test_route_pagination() {
        let workout = Workout::new(37, at(20, 8, 0), at(20, 9, 0));
        let locations: Vec<Location> = (0..5)
            .map(|i| Location {
                timestamp: at(20, 8, i),
                latitude: 54.0 + i as f64 * 0.001,
                longitude: 25.0,
                altitude: 110.0,
            })
            .collect();
        let store =
            MemoryStore::from_snapshot(Snapshot::new().route(workout.id, locations.clone()));

        let routes = store.workout_routes(workout.id).await.unwrap();
        assert_eq!(routes.len(), 1);

        let first = store.route_locations(&routes[0], 0, 2).await.unwrap();
        assert_eq!(first.locations, locations[0..2].to_vec());
        assert_eq!(first.next, Some(2));

        let last = store.route_locations(&routes[0], 4, 2).await.unwrap();
        assert_eq!(last.locations.len(), 1);
        assert_eq!(last.next, None);
    }

    #[tokio::test]
    async fn test_unavailable_and_injected_failures() {
        let store = MemoryStore::unavailable();
        assert!(!store.is_available());
        let err = store.characteristics().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable));

        let store = MemoryStore::new();
        store.inject_failure(InjectedFailure::Inaccessible).await;
        let err = store.lookup_workout(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_transient());

        store.clear_failure().await;
        assert!(store.lookup_workout(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_is_recorded() {
        let store = MemoryStore::new().deny_authorization();
        let read: BTreeSet<ObjectType> = [ObjectType::Sample(SampleType::HeartRate)].into();

        assert!(!store.request_authorization(&read).await.unwrap());
        assert_eq!(store.authorization_requests().await, vec![read]);
    }

    #[tokio::test]
    async fn test_snapshot_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshot.json");

        let store = MemoryStore::from_snapshot(Snapshot::new().quantity(steps(20, 8, 100.0)));
        store.save(&path).await.unwrap();

        let reloaded = MemoryStore::load(&path).await.unwrap();
        let samples = reloaded
            .quantity_samples(SampleType::StepCount, &whole_april(), SortOrder::Ascending, None)
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].quantity.value, 100.0);
    }

    #[tokio::test]
    async fn test_load_rejects_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = MemoryStore::load(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Snapshot(_)));
    }
}
