//! Raw data model of the health store
//!
//! These are read-only projections of store state, produced fresh by every
//! query and never mutated afterwards:
//! - `QuantitySample` / `CategorySample`: single timestamped measurements
//! - `Workout`: a workout header with nested events, activities and statistics
//! - `StatisticsWindow` / `StatisticsCollection`: aggregated buckets
//! - `Location`: one point of a workout route
//! - `TimeRange`: a half-open query interval

use crate::store::units::{Quantity, Unit};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Time range for queries (half-open interval: [start, end))
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start instant (inclusive)
    pub start: DateTime<Utc>,
    /// End instant (exclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, returning None if start >= end
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Create a range for the last N hours from now
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::hours(hours),
            end,
        }
    }

    /// Create a range for the last N days from now
    pub fn last_days(days: i64) -> Self {
        Self::last_hours(days * 24)
    }

    /// Check if an instant falls within this range
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Check if `[start, end]` lies fully inside this range
    pub fn encloses(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= self.start && end <= self.end
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Get intersection with another range, if any
    pub fn intersection(&self, other: &TimeRange) -> Option<Self> {
        Self::try_new(self.start.max(other.start), self.end.min(other.end))
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Kind of data the store can be queried for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SampleType {
    HeartRate,
    OxygenSaturation,
    Vo2Max,
    StepCount,
    DistanceWalkingRunning,
    DistanceCycling,
    DistanceSwimming,
    ActiveEnergyBurned,
    BasalEnergyBurned,
    FlightsClimbed,
    SwimmingStrokeCount,
    BloodGlucose,
    SleepAnalysis,
    Workout,
    Electrocardiogram,
}

/// Raw result shape a sample type is stored as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleShape {
    Quantity,
    Category,
    Workout,
    Electrocardiogram,
}

impl SampleType {
    pub fn shape(&self) -> SampleShape {
        match self {
            Self::SleepAnalysis => SampleShape::Category,
            Self::Workout => SampleShape::Workout,
            Self::Electrocardiogram => SampleShape::Electrocardiogram,
            _ => SampleShape::Quantity,
        }
    }

    /// Unit the store records this type in by default
    pub fn preferred_unit(&self) -> Option<Unit> {
        match self {
            Self::HeartRate => Some(Unit::CountPerMinute),
            Self::OxygenSaturation => Some(Unit::Percent),
            Self::Vo2Max => Some(Unit::MilliliterPerKilogramMinute),
            Self::StepCount | Self::FlightsClimbed | Self::SwimmingStrokeCount => Some(Unit::Count),
            Self::DistanceWalkingRunning | Self::DistanceCycling | Self::DistanceSwimming => {
                Some(Unit::Meter)
            }
            Self::ActiveEnergyBurned | Self::BasalEnergyBurned => Some(Unit::Kilocalorie),
            Self::BloodGlucose => Some(Unit::MilligramPerDeciliter),
            Self::SleepAnalysis | Self::Workout | Self::Electrocardiogram => None,
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HeartRate => "heartRate",
            Self::OxygenSaturation => "oxygenSaturation",
            Self::Vo2Max => "vo2Max",
            Self::StepCount => "stepCount",
            Self::DistanceWalkingRunning => "distanceWalkingRunning",
            Self::DistanceCycling => "distanceCycling",
            Self::DistanceSwimming => "distanceSwimming",
            Self::ActiveEnergyBurned => "activeEnergyBurned",
            Self::BasalEnergyBurned => "basalEnergyBurned",
            Self::FlightsClimbed => "flightsClimbed",
            Self::SwimmingStrokeCount => "swimmingStrokeCount",
            Self::BloodGlucose => "bloodGlucose",
            Self::SleepAnalysis => "sleepAnalysis",
            Self::Workout => "workout",
            Self::Electrocardiogram => "electrocardiogram",
        };
        write!(f, "{}", name)
    }
}

/// App or device that recorded a sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    #[serde(default)]
    pub bundle_identifier: Option<String>,
}

impl SourceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bundle_identifier: None,
        }
    }
}

/// Well-known metadata keys
pub mod metadata_keys {
    pub const WAS_USER_ENTERED: &str = "was_user_entered";
    pub const TIME_ZONE: &str = "time_zone";
    pub const WEATHER_TEMPERATURE: &str = "weather_temperature";
    pub const WEATHER_HUMIDITY: &str = "weather_humidity";
    pub const WEATHER_CONDITION: &str = "weather_condition";
    pub const AVERAGE_METS: &str = "average_mets";
    pub const LAP_LENGTH: &str = "lap_length";
    pub const AVERAGE_SPEED: &str = "average_speed";
    pub const MAXIMUM_SPEED: &str = "maximum_speed";
    pub const ELEVATION_ASCENDED: &str = "elevation_ascended";
    pub const ELEVATION_DESCENDED: &str = "elevation_descended";
    pub const HEART_RATE_MOTION_CONTEXT: &str = "heart_rate_motion_context";
}

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Quantity(Quantity),
    Text(String),
}

/// Metadata bag attached to samples and workouts
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Typed accessors over a metadata bag
pub trait MetadataExt {
    fn bool_value(&self, key: &str) -> Option<bool>;
    fn int_value(&self, key: &str) -> Option<i64>;
    fn number_value(&self, key: &str) -> Option<f64>;
    fn text_value(&self, key: &str) -> Option<&str>;
    fn quantity_value(&self, key: &str) -> Option<Quantity>;
}

impl MetadataExt for Metadata {
    fn bool_value(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            MetadataValue::Bool(b) => Some(*b),
            MetadataValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    fn int_value(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn number_value(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            MetadataValue::Int(i) => Some(*i as f64),
            MetadataValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    fn text_value(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            MetadataValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn quantity_value(&self, key: &str) -> Option<Quantity> {
        match self.get(key)? {
            MetadataValue::Quantity(q) => Some(*q),
            _ => None,
        }
    }
}

/// A timestamped physical measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySample {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub sample_type: SampleType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quantity: Quantity,
    #[serde(default)]
    pub source: Option<SourceInfo>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl QuantitySample {
    /// Create a point-in-time sample (start == end)
    pub fn new(sample_type: SampleType, at: DateTime<Utc>, quantity: Quantity) -> Self {
        Self {
            id: Uuid::new_v4(),
            sample_type,
            start: at,
            end: at,
            quantity,
            source: None,
            device: None,
            metadata: Metadata::new(),
        }
    }

    /// Builder method: set the end instant
    pub fn ending(mut self, end: DateTime<Utc>) -> Self {
        self.end = end;
        self
    }

    /// Builder method: set the source
    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(SourceInfo::new(name));
        self
    }

    /// Builder method: add a metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A timestamped enumerated observation (sleep stages)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySample {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub sample_type: SampleType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Raw category code
    pub value: i32,
    #[serde(default)]
    pub source: Option<SourceInfo>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CategorySample {
    pub fn new(
        sample_type: SampleType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        value: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sample_type,
            start,
            end,
            value,
            source: None,
            metadata: Metadata::new(),
        }
    }

    /// Convenience constructor for a sleep-analysis sample
    pub fn sleep(stage: SleepStage, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(SampleType::SleepAnalysis, start, end, stage.code())
    }

    /// Builder method: set the source
    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(SourceInfo::new(name));
        self
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

/// Sleep phase classification carried by sleep-analysis category samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SleepStage {
    InBed,
    /// Asleep, stage not determined
    Unspecified,
    Awake,
    /// Light (core) sleep
    Light,
    Deep,
    Rem,
}

impl SleepStage {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::InBed),
            1 => Some(Self::Unspecified),
            2 => Some(Self::Awake),
            3 => Some(Self::Light),
            4 => Some(Self::Deep),
            5 => Some(Self::Rem),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::InBed => 0,
            Self::Unspecified => 1,
            Self::Awake => 2,
            Self::Light => 3,
            Self::Deep => 4,
            Self::Rem => 5,
        }
    }

    /// Whether this stage counts towards total sleep
    pub fn is_asleep(&self) -> bool {
        matches!(self, Self::Unspecified | Self::Light | Self::Deep | Self::Rem)
    }

    /// Label used in normalized sleep levels
    pub fn label(&self) -> &'static str {
        match self {
            Self::InBed => "InBed",
            Self::Light => "Core",
            Self::Awake => "Awake",
            Self::Deep => "Deep",
            Self::Unspecified => "Asleep Unspecified",
            Self::Rem => "REM",
        }
    }
}

/// Discrete marker kinds within a workout timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutEventType {
    Pause,
    Resume,
    Lap,
    Marker,
    MotionPaused,
    MotionResumed,
    Segment,
    PauseOrResumeRequest,
}

impl WorkoutEventType {
    /// String representation used on the wire
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::MotionPaused => "Motion Paused",
            Self::MotionResumed => "Motion Resumed",
            Self::PauseOrResumeRequest => "Pause Or Resume Request",
            Self::Lap => "Lap",
            Self::Segment => "Segment",
            Self::Marker => "Marker",
        }
    }
}

/// A discrete event within a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEvent {
    pub event_type: WorkoutEventType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl WorkoutEvent {
    pub fn new(event_type: WorkoutEventType, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            event_type,
            start,
            end,
            metadata: Metadata::new(),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Check if this event's interval lies fully inside `outer`'s interval
    pub fn is_within(&self, outer: &WorkoutEvent) -> bool {
        self.start >= outer.start && self.end <= outer.end
    }
}

/// One leg of a multi-sport workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutActivity {
    pub activity_type: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Aggregated statistics for one quantity type over a workout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutStatistics {
    #[serde(default)]
    pub sum: Option<Quantity>,
    #[serde(default)]
    pub average: Option<Quantity>,
    #[serde(default)]
    pub minimum: Option<Quantity>,
    #[serde(default)]
    pub maximum: Option<Quantity>,
}

impl WorkoutStatistics {
    pub fn with_sum(sum: Quantity) -> Self {
        Self {
            sum: Some(sum),
            ..Default::default()
        }
    }

    pub fn with_range(average: Quantity, minimum: Quantity, maximum: Quantity) -> Self {
        Self {
            sum: None,
            average: Some(average),
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }
}

/// A recorded workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Activity-type code
    pub activity_type: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Duration in seconds, excluding pauses
    pub duration_secs: f64,
    #[serde(default)]
    pub total_distance: Option<Quantity>,
    #[serde(default)]
    pub total_energy_burned: Option<Quantity>,
    #[serde(default)]
    pub events: Vec<WorkoutEvent>,
    #[serde(default)]
    pub activities: Vec<WorkoutActivity>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub statistics: BTreeMap<SampleType, WorkoutStatistics>,
    #[serde(default)]
    pub source: Option<SourceInfo>,
}

impl Workout {
    pub fn new(activity_type: u32, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_type,
            start,
            end,
            duration_secs: (end - start).num_milliseconds() as f64 / 1000.0,
            total_distance: None,
            total_energy_burned: None,
            events: Vec::new(),
            activities: Vec::new(),
            metadata: Metadata::new(),
            statistics: BTreeMap::new(),
            source: None,
        }
    }

    /// Builder method: attach statistics for a quantity type
    pub fn statistic(mut self, sample_type: SampleType, stats: WorkoutStatistics) -> Self {
        self.statistics.insert(sample_type, stats);
        self
    }

    /// Builder method: add an event
    pub fn event(mut self, event: WorkoutEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Builder method: add a metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builder method: set the source
    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(SourceInfo::new(name));
        self
    }

    pub fn statistics_for(&self, sample_type: SampleType) -> Option<&WorkoutStatistics> {
        self.statistics.get(&sample_type)
    }

    /// The workout's bounds as a query range, if non-empty
    pub fn range(&self) -> Option<TimeRange> {
        TimeRange::try_new(self.start, self.end)
    }

    pub fn was_user_entered(&self) -> bool {
        self.metadata
            .bool_value(metadata_keys::WAS_USER_ENTERED)
            .unwrap_or(false)
    }
}

/// One aggregated bucket of a statistics query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub sum: Option<Quantity>,
    #[serde(default)]
    pub average: Option<Quantity>,
    #[serde(default)]
    pub minimum: Option<Quantity>,
    #[serde(default)]
    pub maximum: Option<Quantity>,
    /// Total time covered by contributing samples
    #[serde(default)]
    pub duration: Option<Quantity>,
    #[serde(default)]
    pub sources: Vec<SourceInfo>,
}

impl StatisticsWindow {
    /// An empty bucket covering `[start, end)`
    pub fn empty(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            sum: None,
            average: None,
            minimum: None,
            maximum: None,
            duration: None,
            sources: Vec::new(),
        }
    }

    pub fn range(&self) -> Option<TimeRange> {
        TimeRange::try_new(self.start, self.end)
    }
}

/// Result of a statistics query: windows derived from one aligned anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsCollection {
    /// Aligned anchor all window boundaries derive from
    pub anchor: DateTime<Utc>,
    pub windows: Vec<StatisticsWindow>,
}

impl StatisticsCollection {
    pub fn empty(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            windows: Vec::new(),
        }
    }

    /// Windows over `[from, to)`, clipped to that range
    ///
    /// The result is ordered, contiguous where the underlying windows are,
    /// non-overlapping, and fully contained in `range`.
    pub fn enumerate(&self, range: &TimeRange) -> Vec<StatisticsWindow> {
        let mut windows: Vec<StatisticsWindow> = self
            .windows
            .iter()
            .filter_map(|w| {
                let clipped = w.range()?.intersection(range)?;
                let mut window = w.clone();
                window.start = clipped.start;
                window.end = clipped.end;
                Some(window)
            })
            .collect();
        windows.sort_by_key(|w| w.start);
        windows
    }
}

/// One point of a workout route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub altitude: f64,
}

/// A route recorded for a workout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRoute {
    pub id: Uuid,
    pub workout_id: Uuid,
}

/// One page of route locations
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPage {
    pub locations: Vec<Location>,
    /// Cursor for the next page, None once the route is exhausted
    pub next: Option<usize>,
}

/// ECG rhythm classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EcgClassification {
    NotSet,
    SinusRhythm,
    AtrialFibrillation,
    InconclusiveLowHeartRate,
    InconclusiveHighHeartRate,
    InconclusivePoorReading,
    InconclusiveOther,
    Unrecognized,
}

impl EcgClassification {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotSet => "na",
            Self::SinusRhythm => "Sinus rhytm",
            Self::AtrialFibrillation => "Atrial fibrillation",
            Self::InconclusiveLowHeartRate => "Inconclusive low heart rate",
            Self::InconclusiveHighHeartRate => "Inconclusive high heart rate",
            Self::InconclusivePoorReading => "Inconclusive poor reading",
            Self::InconclusiveOther => "Inconclusive other",
            Self::Unrecognized => "Unrecognized",
        }
    }
}

/// A single-lead electrocardiogram recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electrocardiogram {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub sampling_frequency: Option<Quantity>,
    #[serde(default)]
    pub average_heart_rate: Option<Quantity>,
    pub classification: EcgClassification,
    /// Lead-I voltage measurements in recording order
    #[serde(default)]
    pub voltages: Vec<Quantity>,
    #[serde(default)]
    pub source: Option<SourceInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, h, m, 0).unwrap()
    }

    #[test]
    fn test_time_range_contains() {
        let range = TimeRange::try_new(at(10, 0), at(11, 0)).unwrap();

        assert!(!range.contains(at(9, 59)));
        assert!(range.contains(at(10, 0)));
        assert!(range.contains(at(10, 59)));
        assert!(!range.contains(at(11, 0)));
        assert!(range.encloses(at(10, 0), at(11, 0)));
        assert!(!range.encloses(at(10, 30), at(11, 1)));
    }

    #[test]
    fn test_time_range_rejects_empty() {
        assert!(TimeRange::try_new(at(10, 0), at(10, 0)).is_none());
        assert!(TimeRange::try_new(at(11, 0), at(10, 0)).is_none());
    }

    #[test]
    fn test_time_range_overlaps() {
        let a = TimeRange::try_new(at(10, 0), at(11, 0)).unwrap();
        let b = TimeRange::try_new(at(10, 30), at(11, 30)).unwrap();
        let c = TimeRange::try_new(at(11, 0), at(12, 0)).unwrap();

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // Adjacent, not overlapping
        assert_eq!(
            a.intersection(&b),
            TimeRange::try_new(at(10, 30), at(11, 0))
        );
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_sleep_stage_codes() {
        for code in 0..6 {
            let stage = SleepStage::from_code(code).unwrap();
            assert_eq!(stage.code(), code);
        }
        assert_eq!(SleepStage::from_code(9), None);
        assert!(SleepStage::Rem.is_asleep());
        assert!(!SleepStage::Awake.is_asleep());
        assert!(!SleepStage::InBed.is_asleep());
    }

    #[test]
    fn test_metadata_accessors() {
        let mut metadata = Metadata::new();
        metadata.insert("flag".into(), MetadataValue::Int(1));
        metadata.insert("tz".into(), MetadataValue::Text("Europe/Vilnius".into()));
        metadata.insert(
            "temp".into(),
            MetadataValue::Quantity(Quantity::new(20.0, Unit::DegreeCelsius)),
        );

        assert_eq!(metadata.bool_value("flag"), Some(true));
        assert_eq!(metadata.text_value("tz"), Some("Europe/Vilnius"));
        assert_eq!(metadata.quantity_value("temp").map(|q| q.value), Some(20.0));
        assert_eq!(metadata.number_value("tz"), None);
    }

    #[test]
    fn test_metadata_value_untagged_json() {
        let json = r#"{"a": true, "b": 3, "c": 2.5, "d": {"value": 1.0, "unit": "m"}, "e": "x"}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();

        assert_eq!(metadata["a"], MetadataValue::Bool(true));
        assert_eq!(metadata["b"], MetadataValue::Int(3));
        assert_eq!(metadata["c"], MetadataValue::Double(2.5));
        assert_eq!(
            metadata["d"],
            MetadataValue::Quantity(Quantity::new(1.0, Unit::Meter))
        );
        assert_eq!(metadata["e"], MetadataValue::Text("x".into()));
    }

    #[test]
    fn test_enumerate_clips_to_range() {
        let collection = StatisticsCollection {
            anchor: at(0, 0),
            windows: vec![
                StatisticsWindow::empty(at(9, 0), at(10, 0)),
                StatisticsWindow::empty(at(10, 0), at(11, 0)),
                StatisticsWindow::empty(at(11, 0), at(12, 0)),
            ],
        };
        let range = TimeRange::try_new(at(9, 30), at(11, 0)).unwrap();

        let windows = collection.enumerate(&range);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, at(9, 30));
        assert_eq!(windows[0].end, at(10, 0));
        assert_eq!(windows[1].start, at(10, 0));
        assert_eq!(windows[1].end, at(11, 0));
    }

    #[test]
    fn test_workout_event_containment() {
        let segment = WorkoutEvent::new(WorkoutEventType::Segment, at(10, 0), at(10, 30));
        let inside = WorkoutEvent::new(WorkoutEventType::Lap, at(10, 5), at(10, 10));
        let straddling = WorkoutEvent::new(WorkoutEventType::Lap, at(10, 25), at(10, 35));

        assert!(inside.is_within(&segment));
        assert!(!straddling.is_within(&segment));
    }
}
