//! Query Orchestrator
//!
//! Issues bounded fetches against the health store and wraps every result
//! in a [`ResultEnvelope`]:
//!
//! 1. Check that a store is configured and reports health data
//! 2. Resolve the workout scope, if any (first round trip)
//! 3. Build the compound predicate and align the statistics anchor
//! 4. Issue the query (second round trip for workout-scoped queries)
//! 5. Absorb the transient "inaccessible" condition into an empty result
//!
//! ```text
//! request ─▶ scope? ─▶ resolve_workout ─▶ predicate + anchor ─▶ store ─▶ envelope
//! ```
//!
//! The orchestrator holds no mutable state: concurrent fetches are
//! independent and resolved workouts are never cached.

use crate::logging::Logger;
use crate::query::anchor::{align_anchor, start_of_week, AnchorBoundary};
use crate::query::error::{QueryError, QueryResult};
use crate::query::request::{SampleRequest, StatisticsRequest};
use crate::store::{
    CharacteristicKind, Characteristics, HealthStore, Location, ObjectType, Predicate,
    ResultEnvelope, SampleShape, StatisticsCollection, StatisticsQuery, StoreError, StoreResult,
    TimeRange, Workout,
};
use chrono::{FixedOffset, Offset, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Locations requested per route page by default
pub const DEFAULT_ROUTE_PAGE_SIZE: usize = 500;

/// One fetch result with the range it effectively covers
///
/// For workout-scoped queries the range is the workout's bounds rather
/// than the range the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub envelope: ResultEnvelope,
    pub range: TimeRange,
}

impl Fetched {
    pub fn new(envelope: ResultEnvelope, range: TimeRange) -> Self {
        Self { envelope, range }
    }
}

/// Issues fetches against a health store
#[derive(Clone)]
pub struct QueryOrchestrator {
    store: Option<Arc<dyn HealthStore>>,
    offset: FixedOffset,
    boundary: AnchorBoundary,
    route_page_size: usize,
    logger: Logger,
}

impl std::fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("has_store", &self.store.is_some())
            .field("offset", &self.offset)
            .field("boundary", &self.boundary)
            .field("route_page_size", &self.route_page_size)
            .finish()
    }
}

impl QueryOrchestrator {
    /// Create an orchestrator over `store`; None means no store is present
    pub fn new(store: Option<Arc<dyn HealthStore>>) -> Self {
        Self {
            store,
            offset: Utc.fix(),
            boundary: AnchorBoundary::default(),
            route_page_size: DEFAULT_ROUTE_PAGE_SIZE,
            logger: Logger::current(),
        }
    }

    /// Calendar offset anchors are aligned in
    pub fn offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn boundary(mut self, boundary: AnchorBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn route_page_size(mut self, size: usize) -> Self {
        self.route_page_size = size.max(1);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    fn store(&self) -> QueryResult<&Arc<dyn HealthStore>> {
        match &self.store {
            Some(store) if store.is_available() => Ok(store),
            _ => {
                tracing::error!("Health data is not available");
                Err(QueryError::StoreUnavailable)
            }
        }
    }

    /// Resolve a workout identifier to exactly one workout
    pub async fn resolve_workout(&self, id: &str) -> QueryResult<Workout> {
        self.logger
            .instrument(async {
                let store = self.store()?;
                let uuid = Uuid::parse_str(id.trim())
                    .map_err(|_| QueryError::InvalidIdentifier(id.to_string()))?;

                let mut workouts = store.lookup_workout(uuid).await.map_err(lift)?;
                if workouts.len() != 1 {
                    tracing::warn!(
                        workout_id = %uuid,
                        matches = workouts.len(),
                        "Workout identifier did not resolve to one workout"
                    );
                    return Err(QueryError::NotFound(id.to_string()));
                }
                Ok(workouts.remove(0))
            })
            .await
    }

    /// Resolve the optional workout scope of a request
    async fn scope(&self, workout_id: Option<&str>) -> QueryResult<Scope> {
        let Some(id) = workout_id else {
            return Ok(Scope::Unscoped);
        };
        match self.resolve_workout(id).await {
            Ok(workout) => Ok(Scope::Workout(workout)),
            Err(QueryError::Store(StoreError::Inaccessible)) => {
                tracing::warn!(workout_id = id, "Health store inaccessible while resolving workout");
                Ok(Scope::Inaccessible)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch raw samples of one type
    pub async fn fetch_samples(&self, request: &SampleRequest) -> QueryResult<Fetched> {
        self.logger
            .instrument(async {
                let store = self.store()?;
                let empty = empty_samples(request);

                let (range, base) = match self.scope(request.workout_id.as_deref()).await? {
                    Scope::Unscoped => (request.range, Predicate::time_range(request.range)),
                    Scope::Workout(workout) => scoped(&workout)?,
                    Scope::Inaccessible => return Ok(Fetched::new(empty, request.range)),
                };
                let predicate = match request.subpredicate.clone() {
                    Some(sub) => base.and(sub),
                    None => base,
                };

                tracing::debug!(
                    sample_type = %request.sample_type,
                    predicate = %predicate,
                    "Fetching samples"
                );

                let (sort, limit) = (request.sort, request.limit);
                let result = match request.sample_type.shape() {
                    SampleShape::Quantity => store
                        .quantity_samples(request.sample_type, &predicate, sort, limit)
                        .await
                        .map(ResultEnvelope::QuantitySamples),
                    SampleShape::Category => store
                        .category_samples(request.sample_type, &predicate, sort, limit)
                        .await
                        .map(ResultEnvelope::CategorySamples),
                    SampleShape::Workout => store
                        .workouts(&predicate, sort, limit)
                        .await
                        .map(ResultEnvelope::Workouts),
                    SampleShape::Electrocardiogram => store
                        .electrocardiograms(&predicate, sort, limit)
                        .await
                        .map(ResultEnvelope::Electrocardiograms),
                };

                let envelope = absorb(result, || empty, "samples")?;
                tracing::debug!(
                    sample_type = %request.sample_type,
                    items = envelope.len(),
                    "Fetched samples"
                );
                Ok(Fetched::new(envelope, range))
            })
            .await
    }

    /// Fetch anchor-aligned statistics windows
    pub async fn fetch_statistics(&self, request: &StatisticsRequest) -> QueryResult<Fetched> {
        self.logger
            .instrument(async {
                let store = self.store()?;
                let raw_anchor = request
                    .anchor
                    .unwrap_or_else(|| start_of_week(Utc::now(), self.offset));

                let (range, base, raw_anchor) = match self.scope(request.workout_id.as_deref()).await? {
                    Scope::Unscoped => (request.range, Predicate::time_range(request.range), raw_anchor),
                    Scope::Workout(workout) => {
                        let (range, predicate) = scoped(&workout)?;
                        (range, predicate, workout.end)
                    }
                    Scope::Inaccessible => {
                        let anchor = align_anchor(raw_anchor, self.offset, self.boundary);
                        let empty = ResultEnvelope::Statistics(StatisticsCollection::empty(anchor));
                        return Ok(Fetched::new(empty, request.range));
                    }
                };
                let predicate = match request.subpredicate.clone() {
                    Some(sub) => base.and(sub),
                    None => base,
                };
                let anchor = align_anchor(raw_anchor, self.offset, self.boundary);

                tracing::debug!(
                    sample_type = %request.sample_type,
                    anchor = %anchor,
                    interval = %request.interval,
                    predicate = %predicate,
                    "Fetching statistics"
                );

                let query = StatisticsQuery {
                    sample_type: request.sample_type,
                    predicate,
                    options: request.options,
                    anchor,
                    interval: request.interval,
                };
                let collection = absorb(
                    store.statistics_collection(&query).await,
                    || StatisticsCollection::empty(anchor),
                    "statistics",
                )?;
                Ok(Fetched::new(ResultEnvelope::Statistics(collection), range))
            })
            .await
    }

    /// Fetch every location of every route recorded for a workout
    ///
    /// All pages are accumulated before returning.
    pub async fn fetch_route(&self, workout_id: &str) -> QueryResult<ResultEnvelope> {
        self.logger
            .instrument(async {
                let store = self.store()?;
                let workout = match self.scope(Some(workout_id)).await? {
                    Scope::Workout(workout) => workout,
                    _ => return Ok(ResultEnvelope::Locations(Vec::new())),
                };
                let locations = absorb(
                    self.drain_routes(store.as_ref(), workout.id).await,
                    Vec::new,
                    "route",
                )?;

                tracing::debug!(
                    workout_id = %workout.id,
                    locations = locations.len(),
                    "Fetched route"
                );
                Ok(ResultEnvelope::Locations(locations))
            })
            .await
    }

    async fn drain_routes(
        &self,
        store: &dyn HealthStore,
        workout_id: Uuid,
    ) -> StoreResult<Vec<Location>> {
        let mut locations = Vec::new();
        for route in store.workout_routes(workout_id).await? {
            let mut cursor = 0;
            loop {
                let page = store
                    .route_locations(&route, cursor, self.route_page_size)
                    .await?;
                locations.extend(page.locations);
                match page.next {
                    Some(next) if next > cursor => cursor = next,
                    Some(next) => {
                        tracing::warn!(route_id = %route.id, cursor, next, "Route cursor did not advance");
                        break;
                    }
                    None => break,
                }
            }
        }
        Ok(locations)
    }

    /// Read the requested user characteristics
    pub async fn fetch_characteristics(
        &self,
        kinds: &[CharacteristicKind],
    ) -> QueryResult<ResultEnvelope> {
        self.logger
            .instrument(async {
                let store = self.store()?;
                let values = absorb(
                    store.characteristics().await,
                    Characteristics::default,
                    "characteristics",
                )?;
                Ok(ResultEnvelope::Characteristics {
                    values,
                    kinds: kinds.to_vec(),
                })
            })
            .await
    }

    /// Fetch daily activity summaries for the days inside `range`
    pub async fn fetch_activity_summaries(&self, range: TimeRange) -> QueryResult<Fetched> {
        self.logger
            .instrument(async {
                let store = self.store()?;
                let summaries = absorb(
                    store.activity_summaries(&range).await,
                    Vec::new,
                    "activity summaries",
                )?;
                Ok(Fetched::new(ResultEnvelope::ActivitySummaries(summaries), range))
            })
            .await
    }

    /// Ask the store for read access; Ok(false) means declined
    pub async fn request_authorization(&self, read: &BTreeSet<ObjectType>) -> QueryResult<bool> {
        self.logger
            .instrument(async {
                let store = self.store()?;
                let granted = store.request_authorization(read).await.map_err(lift)?;
                tracing::info!(types = read.len(), granted, "Authorization requested");
                Ok(granted)
            })
            .await
    }
}

/// Outcome of resolving a request's workout scope
enum Scope {
    Unscoped,
    Workout(Workout),
    /// The store was inaccessible; the fetch comes back empty
    Inaccessible,
}

/// Range and predicate restricting a query to a workout's bounds
fn scoped(workout: &Workout) -> QueryResult<(TimeRange, Predicate)> {
    let predicate = Predicate::for_workout(workout).ok_or_else(|| {
        QueryError::InvalidTimeRange(format!("workout {} has empty bounds", workout.id))
    })?;
    let range = match &predicate {
        Predicate::Workout { bounds, .. } => *bounds,
        _ => return Err(QueryError::InvalidTimeRange(workout.id.to_string())),
    };
    Ok((range, predicate))
}

fn empty_samples(request: &SampleRequest) -> ResultEnvelope {
    match request.sample_type.shape() {
        SampleShape::Quantity => ResultEnvelope::QuantitySamples(Vec::new()),
        SampleShape::Category => ResultEnvelope::CategorySamples(Vec::new()),
        SampleShape::Workout => ResultEnvelope::Workouts(Vec::new()),
        SampleShape::Electrocardiogram => ResultEnvelope::Electrocardiograms(Vec::new()),
    }
}

/// Map a store error without absorbing anything
fn lift(err: StoreError) -> QueryError {
    match err {
        StoreError::Unavailable => QueryError::StoreUnavailable,
        other => QueryError::Store(other),
    }
}

/// Turn the transient "inaccessible" condition into an empty result
fn absorb<T>(result: StoreResult<T>, empty: impl FnOnce() -> T, what: &str) -> QueryResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(StoreError::Inaccessible) => {
            tracing::warn!(query = what, "Health store inaccessible, returning empty result");
            Ok(empty())
        }
        Err(err) => {
            tracing::error!(query = what, error = %err, "Health store query failed");
            Err(lift(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        InjectedFailure, MemoryStore, Quantity, QuantitySample, SampleType, Snapshot,
        StatisticsInterval, StatisticsOptions, StatisticsWindow, Unit,
    };
    use chrono::{DateTime, Duration, TimeZone};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, d, h, m, 0).unwrap()
    }

    fn range(from: DateTime<Utc>, to: DateTime<Utc>) -> TimeRange {
        TimeRange::try_new(from, to).unwrap()
    }

    fn steps(d: u32, h: u32, value: f64) -> QuantitySample {
        QuantitySample::new(SampleType::StepCount, at(d, h, 0), Quantity::new(value, Unit::Count))
            .ending(at(d, h, 30))
            .source("Watch")
    }

    fn run() -> Workout {
        Workout::new(37, at(20, 8, 0), at(20, 9, 0))
    }

    fn orchestrator(store: MemoryStore) -> QueryOrchestrator {
        QueryOrchestrator::new(Some(Arc::new(store))).logger(Logger::disabled())
    }

    #[tokio::test]
    async fn test_no_store_fails_fast() {
        let orch = QueryOrchestrator::new(None).logger(Logger::disabled());
        let request = SampleRequest::new(SampleType::HeartRate, TimeRange::last_days(1));
        assert!(matches!(
            orch.fetch_samples(&request).await,
            Err(QueryError::StoreUnavailable)
        ));

        let orch = orchestrator(MemoryStore::unavailable());
        assert!(matches!(
            orch.fetch_samples(&request).await,
            Err(QueryError::StoreUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_samples_sorted_newest_first() {
        let store = MemoryStore::from_snapshot(
            Snapshot::new()
                .quantity(steps(20, 8, 100.0))
                .quantity(steps(20, 10, 300.0))
                .quantity(steps(20, 9, 200.0)),
        );
        let request = SampleRequest::new(SampleType::StepCount, range(at(20, 0, 0), at(21, 0, 0)));
        let fetched = orchestrator(store).fetch_samples(&request).await.unwrap();

        match fetched.envelope {
            ResultEnvelope::QuantitySamples(samples) => {
                let values: Vec<f64> = samples.iter().map(|s| s.quantity.value).collect();
                assert_eq!(values, vec![300.0, 200.0, 100.0]);
            }
            other => panic!("unexpected envelope {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_inaccessible_store_is_absorbed() {
        let store = MemoryStore::from_snapshot(Snapshot::new().quantity(steps(20, 8, 100.0)));
        store.inject_failure(InjectedFailure::Inaccessible).await;
        let orch = orchestrator(store);

        let request = SampleRequest::new(SampleType::StepCount, range(at(20, 0, 0), at(21, 0, 0)));
        let fetched = orch.fetch_samples(&request).await.unwrap();
        assert!(fetched.envelope.is_empty());

        let request = StatisticsRequest::new(
            SampleType::StepCount,
            range(at(20, 0, 0), at(21, 0, 0)),
            StatisticsOptions::cumulative_sum(),
        );
        let fetched = orch.fetch_statistics(&request).await.unwrap();
        assert!(fetched.envelope.is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_surfaces() {
        let store = MemoryStore::new();
        store
            .inject_failure(InjectedFailure::Backend("disk full".into()))
            .await;
        let request = SampleRequest::new(SampleType::StepCount, TimeRange::last_days(1));
        assert!(matches!(
            orchestrator(store).fetch_samples(&request).await,
            Err(QueryError::Store(StoreError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn test_resolve_workout() {
        let workout = run();
        let id = workout.id.to_string();
        let orch = orchestrator(MemoryStore::from_snapshot(Snapshot::new().workout(workout)));

        assert_eq!(orch.resolve_workout(&id).await.unwrap().activity_type, 37);
        assert!(matches!(
            orch.resolve_workout(&Uuid::new_v4().to_string()).await,
            Err(QueryError::NotFound(_))
        ));
        assert!(matches!(
            orch.resolve_workout("not-a-uuid").await,
            Err(QueryError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_workout_scope_restricts_samples() {
        let workout = run();
        let id = workout.id.to_string();
        let store = MemoryStore::from_snapshot(
            Snapshot::new()
                .workout(workout)
                .quantity(steps(20, 7, 50.0))
                .quantity(steps(20, 8, 900.0)),
        );
        let request = SampleRequest::new(SampleType::StepCount, range(at(19, 0, 0), at(21, 0, 0)))
            .workout(&id);
        let fetched = orchestrator(store).fetch_samples(&request).await.unwrap();

        assert_eq!(fetched.range, range(at(20, 8, 0), at(20, 9, 0)));
        assert_eq!(fetched.envelope.len(), 1);
    }

    #[tokio::test]
    async fn test_workout_scoped_statistics_anchor_on_workout_end() {
        let workout = Workout::new(37, at(20, 8, 0), at(20, 9, 40));
        let id = workout.id.to_string();
        let store = MemoryStore::from_snapshot(
            Snapshot::new().workout(workout).quantity(steps(20, 8, 900.0)),
        );
        let request = StatisticsRequest::new(
            SampleType::StepCount,
            range(at(13, 0, 0), at(21, 0, 0)),
            StatisticsOptions::cumulative_sum(),
        )
        .interval(StatisticsInterval::Hours(1))
        .anchor(at(15, 0, 0))
        .workout(&id);

        let fetched = orchestrator(store).fetch_statistics(&request).await.unwrap();
        match fetched.envelope {
            // 09:40 aligns back to 09:00
            ResultEnvelope::Statistics(collection) => assert_eq!(collection.anchor, at(20, 9, 0)),
            other => panic!("unexpected envelope {}", other.kind()),
        }
        assert_eq!(fetched.range, range(at(20, 8, 0), at(20, 9, 40)));
    }

    #[tokio::test]
    async fn test_statistics_anchor_aligned_to_hour() {
        let store = MemoryStore::from_snapshot(Snapshot::new().quantity(steps(20, 15, 10.0)));
        let request = StatisticsRequest::new(
            SampleType::StepCount,
            range(at(20, 0, 0), at(21, 0, 0)),
            StatisticsOptions::cumulative_sum(),
        )
        .interval(StatisticsInterval::Hours(1))
        .anchor(at(20, 15, 37));

        let fetched = orchestrator(store).fetch_statistics(&request).await.unwrap();
        match fetched.envelope {
            ResultEnvelope::Statistics(collection) => {
                assert_eq!(collection.anchor, at(20, 15, 0));
                let windows: Vec<&StatisticsWindow> = collection.windows.iter().collect();
                assert!(windows
                    .iter()
                    .all(|w| w.end - w.start == Duration::hours(1)));
            }
            other => panic!("unexpected envelope {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_route_drains_all_pages() {
        let workout = run();
        let id = workout.id;
        let points: Vec<Location> = (0..7)
            .map(|i| Location {
                timestamp: at(20, 8, i),
                latitude: 52.0 + i as f64 * 0.001,
                longitude: 4.0,
                altitude: 1.0,
            })
            .collect();
        let store = MemoryStore::from_snapshot(
            Snapshot::new()
                .workout(workout)
                .route(id, points[..4].to_vec())
                .route(id, points[4..].to_vec()),
        );
        let orch = orchestrator(store).route_page_size(3);

        let envelope = orch.fetch_route(&id.to_string()).await.unwrap();
        match envelope {
            ResultEnvelope::Locations(locations) => assert_eq!(locations, points),
            other => panic!("unexpected envelope {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_request_authorization_denied() {
        let orch = orchestrator(MemoryStore::new().deny_authorization());
        let read: BTreeSet<ObjectType> = [ObjectType::Sample(SampleType::HeartRate)].into();
        assert!(!orch.request_authorization(&read).await.unwrap());
    }
}
