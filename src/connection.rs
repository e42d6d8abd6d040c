//! Connection Facade
//!
//! Sequences the pipeline for one caller:
//!
//! ```text
//! FetchRequest ─▶ QueryOrchestrator ─▶ Fetched ─▶ Normalizer ─▶ records ─▶ webhook (spawned)
//! ```
//!
//! Every operation has an awaitable form and a callback form. The callback
//! form spawns the awaitable one on the current runtime and hands its
//! result to the completion exactly once.
//!
//! A connection holds no query state. After [`Connection::close`] every
//! fetch fails with [`PipelineError::ConnectionClosed`].

use crate::config::{validate_callback_url, Config, QueryConfig, Region};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::Logger;
use crate::normalize::{CumulativeDomain, Normalizer, PointDomain, SleepOptions};
use crate::query::{Fetched, QueryError, QueryFilter, QueryOrchestrator, SampleRequest, StatisticsRequest};
use crate::schema::{encode_records, DataType, NormalizedRecord};
use crate::store::{
    CharacteristicKind, HealthStore, ObjectType, SampleType, SortOrder, StatisticsInterval,
    StatisticsOptions, TimeRange,
};
use crate::webhook::WebhookClient;
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// One fetch as the caller describes it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub data_type: DataType,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Workout the fetch is scoped to; required for routes
    pub workout_id: Option<String>,
    /// Raw statistics anchor, aligned before use
    pub anchor: Option<DateTime<Utc>>,
    pub filter: QueryFilter,
}

impl FetchRequest {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            from: None,
            to: None,
            workout_id: None,
            anchor: None,
            filter: QueryFilter::default(),
        }
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn between(self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from(from).to(to)
    }

    pub fn workout(mut self, id: impl Into<String>) -> Self {
        self.workout_id = Some(id.into());
        self
    }

    pub fn anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Records returned by fetch-and-post, with the spawned delivery
///
/// The delivery resolves to whether the callback accepted the records.
/// Dropping the handle detaches the delivery; it still runs.
#[derive(Debug)]
pub struct Posted {
    pub records: Vec<NormalizedRecord>,
    pub delivery: JoinHandle<bool>,
}

/// Builder for [`Connection`]
pub struct ConnectionBuilder {
    config: Config,
    store: Option<Arc<dyn HealthStore>>,
    logger: Option<Logger>,
    sleep: SleepOptions,
}

impl ConnectionBuilder {
    /// Health store the connection reads from
    pub fn store(mut self, store: Arc<dyn HealthStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn sleep_options(mut self, options: SleepOptions) -> Self {
        self.sleep = options;
        self
    }

    /// Override the configured callback URL
    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.config.connection.callback_url = Some(url.into());
        self
    }

    /// Validate the configuration and open the connection
    pub fn build(self) -> PipelineResult<Connection> {
        let logger = self.logger.unwrap_or_else(Logger::current);
        let config = self.config;

        if let Err(e) = config.validate() {
            logger.in_scope(|| tracing::error!(error = %e, "Connection is not configured"));
            return Err(e.into());
        }

        let offset = config.query.offset()?;
        let interval = config.query.interval()?;
        let callback_url = config
            .connection
            .callback_url
            .as_deref()
            .map(validate_callback_url)
            .transpose()?;
        let webhook = WebhookClient::new(&config.webhook)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let orchestrator = QueryOrchestrator::new(self.store)
            .offset(offset)
            .route_page_size(config.query.route_page_size)
            .logger(logger.clone());
        let normalizer = Normalizer::new()
            .offset(offset)
            .sleep_options(self.sleep)
            .logger(logger.clone());

        logger.in_scope(|| {
            tracing::info!(
                app_id = %config.connection.app_id,
                region = ?config.connection.region,
                callback = callback_url.is_some(),
                "Connection opened"
            )
        });

        Ok(Connection {
            inner: Arc::new(Inner {
                app_id: config.connection.app_id,
                end_user_id: config.connection.end_user_id,
                region: config.connection.region,
                query: config.query,
                interval,
                callback_url,
                orchestrator,
                normalizer,
                webhook,
                logger,
                connected: AtomicBool::new(true),
            }),
        })
    }
}

#[derive(Debug)]
struct Inner {
    app_id: String,
    end_user_id: Option<String>,
    region: Region,
    query: QueryConfig,
    interval: StatisticsInterval,
    callback_url: Option<Url>,
    orchestrator: QueryOrchestrator,
    normalizer: Normalizer,
    webhook: WebhookClient,
    logger: Logger,
    connected: AtomicBool,
}

/// Facade over the fetch, normalize and deliver pipeline
///
/// Cheap to clone; clones share the open/closed state.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    pub fn builder(config: Config) -> ConnectionBuilder {
        ConnectionBuilder {
            config,
            store: None,
            logger: None,
            sleep: SleepOptions::default(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.inner.app_id
    }

    pub fn end_user_id(&self) -> Option<&str> {
        self.inner.end_user_id.as_deref()
    }

    pub fn region(&self) -> Region {
        self.inner.region
    }

    pub fn callback_url(&self) -> Option<&Url> {
        self.inner.callback_url.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Close the connection; it cannot be reopened
    pub fn close(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner
            .logger
            .in_scope(|| tracing::info!(app_id = %self.inner.app_id, "Connection closed"));
    }

    fn ensure_open(&self, operation: &str) -> PipelineResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        tracing::error!(operation, "Connection used after it was closed");
        Err(PipelineError::ConnectionClosed)
    }

    /// Effective range of a request, filling in the configured defaults
    fn range_for(&self, request: &FetchRequest) -> PipelineResult<TimeRange> {
        let to = request.to.unwrap_or_else(Utc::now);
        let from = match request.from {
            Some(from) => from,
            None => {
                let span = match request.data_type {
                    DataType::Sleep => Duration::try_hours(self.inner.query.sleep_range_hours),
                    _ => Duration::try_days(self.inner.query.default_range_days),
                };
                span.and_then(|span| to.checked_sub_signed(span))
                    .ok_or_else(|| {
                        QueryError::InvalidTimeRange(format!(
                            "default range before {} is out of bounds",
                            to
                        ))
                    })?
            }
        };

        TimeRange::try_new(from, to).ok_or_else(|| {
            QueryError::InvalidTimeRange(format!("{} is not before {}", from, to)).into()
        })
    }

    fn sample_request(
        &self,
        sample_type: SampleType,
        range: TimeRange,
        request: &FetchRequest,
    ) -> SampleRequest {
        let sample = SampleRequest::new(sample_type, range)
            .subpredicate(request.filter.subpredicate())
            .sort(SortOrder::Ascending);
        match &request.workout_id {
            Some(id) => sample.workout(id.as_str()),
            None => sample,
        }
    }

    fn statistics_request(
        &self,
        sample_type: SampleType,
        range: TimeRange,
        request: &FetchRequest,
    ) -> StatisticsRequest {
        let mut statistics =
            StatisticsRequest::new(sample_type, range, StatisticsOptions::cumulative_sum())
                .interval(self.inner.interval)
                .subpredicate(request.filter.subpredicate());
        if let Some(anchor) = request.anchor {
            statistics = statistics.anchor(anchor);
        }
        match &request.workout_id {
            Some(id) => statistics.workout(id.as_str()),
            None => statistics,
        }
    }

    /// Fetch the raw envelope for a request
    pub async fn fetch_raw(&self, request: &FetchRequest) -> PipelineResult<Fetched> {
        self.inner
            .logger
            .instrument(async {
                self.ensure_open("fetch_raw")?;
                tracing::info!(data_type = %request.data_type, "Fetching raw data");
                self.dispatch(request).await
            })
            .await
    }

    async fn dispatch(&self, request: &FetchRequest) -> PipelineResult<Fetched> {
        let data_type = request.data_type;
        if !data_type.is_supported() {
            tracing::error!(data_type = %data_type, "Fetch called with an unsupported data type");
            return Err(PipelineError::UnsupportedType(data_type));
        }

        let range = self.range_for(request)?;
        let orchestrator = &self.inner.orchestrator;

        if let Some(domain) = CumulativeDomain::from_data_type(data_type) {
            let statistics = self.statistics_request(domain.sample_type(), range, request);
            return Ok(orchestrator.fetch_statistics(&statistics).await?);
        }
        if let Some(domain) = PointDomain::from_data_type(data_type) {
            let samples = self.sample_request(domain.sample_type(), range, request);
            return Ok(orchestrator.fetch_samples(&samples).await?);
        }

        let fetched = match data_type {
            DataType::Workouts => {
                // Workouts are listed, never scoped to themselves
                let samples = SampleRequest::new(SampleType::Workout, range)
                    .subpredicate(request.filter.subpredicate())
                    .sort(SortOrder::Ascending);
                orchestrator.fetch_samples(&samples).await?
            }
            DataType::WorkoutRoute => {
                let id = request
                    .workout_id
                    .as_deref()
                    .ok_or(PipelineError::MissingIdentifier(data_type))?;
                Fetched::new(orchestrator.fetch_route(id).await?, range)
            }
            DataType::Sleep => {
                let samples = self.sample_request(SampleType::SleepAnalysis, range, request);
                orchestrator.fetch_samples(&samples).await?
            }
            DataType::Heart => {
                let samples = self.sample_request(SampleType::HeartRate, range, request);
                orchestrator.fetch_samples(&samples).await?
            }
            DataType::Glucose => {
                let samples = self.sample_request(SampleType::BloodGlucose, range, request);
                orchestrator.fetch_samples(&samples).await?
            }
            DataType::Electrocardiogram => {
                let samples = self.sample_request(SampleType::Electrocardiogram, range, request);
                orchestrator.fetch_samples(&samples).await?
            }
            DataType::Characteristic => {
                let kinds = &request.filter.characteristics;
                if kinds.is_empty() {
                    tracing::error!("Characteristic fetch needs at least one characteristic");
                    return Err(PipelineError::MissingFilter(data_type));
                }
                Fetched::new(orchestrator.fetch_characteristics(kinds).await?, range)
            }
            DataType::ActivitiesSummary => orchestrator.fetch_activity_summaries(range).await?,
            _ => return Err(PipelineError::UnsupportedType(data_type)),
        };
        Ok(fetched)
    }

    /// Fetch and normalize
    pub async fn fetch_normalized(
        &self,
        request: &FetchRequest,
    ) -> PipelineResult<Vec<NormalizedRecord>> {
        let fetched = self.fetch_raw(request).await?;
        let records = self.inner.normalizer.normalize(request.data_type, &fetched)?;

        self.inner.logger.in_scope(|| {
            tracing::info!(
                data_type = %request.data_type,
                items = fetched.envelope.len(),
                records = records.len(),
                "Normalized data"
            )
        });
        Ok(records)
    }

    /// Fetch, normalize, and deliver to the callback URL without waiting
    pub async fn fetch_and_post(&self, request: &FetchRequest) -> PipelineResult<Posted> {
        let Some(url) = self.inner.callback_url.clone() else {
            self.inner
                .logger
                .in_scope(|| tracing::error!("Fetch-and-post needs a callback URL"));
            return Err(PipelineError::CallbackUrlNotProvided);
        };

        let records = self.fetch_normalized(request).await?;
        let body = encode_records(&records).map_err(|e| {
            self.inner
                .logger
                .in_scope(|| tracing::error!(error = %e, "Failed to encode records"));
            PipelineError::from(e)
        })?;

        let delivery = self.spawn_delivery(url, body, request.data_type, records.len());
        Ok(Posted { records, delivery })
    }

    fn spawn_delivery(
        &self,
        url: Url,
        body: Vec<u8>,
        data_type: DataType,
        records: usize,
    ) -> JoinHandle<bool> {
        let webhook = self.inner.webhook.clone();
        tokio::spawn(self.inner.logger.instrument(async move {
            match webhook.deliver(&url, body).await {
                Ok(()) => {
                    tracing::info!(data_type = %data_type, records, url = %url, "Delivered records");
                    true
                }
                Err(e) => {
                    tracing::error!(data_type = %data_type, url = %url, error = %e, "Delivery failed");
                    false
                }
            }
        }))
    }

    /// Ask the store for read access to everything `data_types` needs
    pub async fn ensure_permissions(&self, data_types: &[DataType]) -> PipelineResult<()> {
        self.inner
            .logger
            .instrument(async {
                self.ensure_open("ensure_permissions")?;
                let read: BTreeSet<ObjectType> =
                    data_types.iter().flat_map(|t| read_set(*t)).collect();
                for unsupported in data_types.iter().filter(|t| !t.is_supported()) {
                    tracing::warn!(data_type = %unsupported, "No read access defined for data type");
                }
                if read.is_empty() {
                    return Ok(());
                }

                if self.inner.orchestrator.request_authorization(&read).await? {
                    Ok(())
                } else {
                    let names: Vec<String> = read.iter().map(|t| t.to_string()).collect();
                    Err(PipelineError::Authorization(names.join(", ")))
                }
            })
            .await
    }

    /// Callback form of [`Connection::fetch_raw`]
    pub fn fetch_raw_with<F>(&self, request: FetchRequest, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(PipelineResult<Fetched>) + Send + 'static,
    {
        let connection = self.clone();
        tokio::spawn(async move { completion(connection.fetch_raw(&request).await) })
    }

    /// Callback form of [`Connection::fetch_normalized`]
    pub fn fetch_normalized_with<F>(&self, request: FetchRequest, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(PipelineResult<Vec<NormalizedRecord>>) + Send + 'static,
    {
        let connection = self.clone();
        tokio::spawn(async move { completion(connection.fetch_normalized(&request).await) })
    }

    /// Callback form of [`Connection::fetch_and_post`]
    pub fn fetch_and_post_with<F>(&self, request: FetchRequest, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(PipelineResult<Posted>) + Send + 'static,
    {
        let connection = self.clone();
        tokio::spawn(async move { completion(connection.fetch_and_post(&request).await) })
    }

    /// Callback form of [`Connection::ensure_permissions`]
    pub fn ensure_permissions_with<F>(&self, data_types: Vec<DataType>, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(PipelineResult<()>) + Send + 'static,
    {
        let connection = self.clone();
        tokio::spawn(async move { completion(connection.ensure_permissions(&data_types).await) })
    }
}

/// Store object types a data type needs read access to
pub fn read_set(data_type: DataType) -> Vec<ObjectType> {
    use ObjectType::{Characteristic, Sample};

    match data_type {
        DataType::Workouts | DataType::WorkoutRoute => {
            vec![Sample(SampleType::Workout), ObjectType::WorkoutRoute]
        }
        DataType::Sleep => vec![
            Sample(SampleType::SleepAnalysis),
            Sample(SampleType::OxygenSaturation),
        ],
        DataType::Heart => vec![Sample(SampleType::HeartRate)],
        DataType::Steps => vec![Sample(SampleType::StepCount)],
        DataType::Distance => vec![
            Sample(SampleType::DistanceCycling),
            Sample(SampleType::DistanceWalkingRunning),
            Sample(SampleType::DistanceSwimming),
        ],
        DataType::Calories => vec![
            Sample(SampleType::ActiveEnergyBurned),
            Sample(SampleType::BasalEnergyBurned),
        ],
        DataType::FlightsClimbed => vec![Sample(SampleType::FlightsClimbed)],
        DataType::Vo2Max => vec![Sample(SampleType::Vo2Max)],
        DataType::OxygenSaturation => vec![Sample(SampleType::OxygenSaturation)],
        DataType::Characteristic => CharacteristicKind::all()
            .iter()
            .map(|k| Characteristic(*k))
            .collect(),
        DataType::ActivitiesSummary => vec![ObjectType::ActivitySummary],
        DataType::Glucose => vec![Sample(SampleType::BloodGlucose)],
        DataType::Electrocardiogram => vec![Sample(SampleType::Electrocardiogram)],
        DataType::WorkoutSplits | DataType::Body | DataType::Breathing => Vec::new(),
    }
}
