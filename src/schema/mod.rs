//! Unified Schema
//!
//! Every normalized record shares one envelope and carries exactly one
//! domain payload, distinguished by the `dataType` discriminant:
//!
//! ```text
//! {
//!   "date": "2024-04-20T00:00:00Z",
//!   "source": "Watch",
//!   "dataType": "steps",
//!   "total": 8412.0, "unit": "count", "samples": [...]
//! }
//! ```
//!
//! Decoding checks the discriminant against [`DataType`] before the payload
//! is decoded, so an unknown or missing tag is reported as such rather than
//! as a generic parse failure.

mod records;

pub use records::{
    timestamp, ActivitiesSummaryRecord, CharacteristicRecord, Coordinate, EcgRecord,
    GlucosePoint, GlucoseRecord, RouteRecord, SamplePoint, SamplesRecord, SleepLevel,
    SleepRecord, WorkoutEventRecord, WorkoutLap, WorkoutRecord,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Wire name of the discriminant field
pub const DISCRIMINANT: &str = "dataType";

/// Every data type a caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Workouts,
    WorkoutRoute,
    WorkoutSplits,
    Sleep,
    Heart,
    Steps,
    Distance,
    Calories,
    FlightsClimbed,
    Vo2Max,
    OxygenSaturation,
    Characteristic,
    ActivitiesSummary,
    Glucose,
    Electrocardiogram,
    Body,
    Breathing,
}

impl DataType {
    pub fn all() -> &'static [DataType] {
        &[
            DataType::Workouts,
            DataType::WorkoutRoute,
            DataType::WorkoutSplits,
            DataType::Sleep,
            DataType::Heart,
            DataType::Steps,
            DataType::Distance,
            DataType::Calories,
            DataType::FlightsClimbed,
            DataType::Vo2Max,
            DataType::OxygenSaturation,
            DataType::Characteristic,
            DataType::ActivitiesSummary,
            DataType::Glucose,
            DataType::Electrocardiogram,
            DataType::Body,
            DataType::Breathing,
        ]
    }

    /// Wire name
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Workouts => "workouts",
            DataType::WorkoutRoute => "workoutRoute",
            DataType::WorkoutSplits => "workoutSplits",
            DataType::Sleep => "sleep",
            DataType::Heart => "heart",
            DataType::Steps => "steps",
            DataType::Distance => "distance",
            DataType::Calories => "calories",
            DataType::FlightsClimbed => "flightsClimbed",
            DataType::Vo2Max => "vo2Max",
            DataType::OxygenSaturation => "oxygenSaturation",
            DataType::Characteristic => "characteristic",
            DataType::ActivitiesSummary => "activitiesSummary",
            DataType::Glucose => "glucose",
            DataType::Electrocardiogram => "electrocardiogram",
            DataType::Body => "body",
            DataType::Breathing => "breathing",
        }
    }

    /// Whether a normalized payload exists for this type
    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            DataType::WorkoutSplits | DataType::Body | DataType::Breathing
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SchemaError::UnknownDiscriminant(s.to_string()))
    }
}

/// Domain payload of a record, tagged by `dataType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataType", rename_all = "camelCase")]
pub enum RecordPayload {
    Workouts(WorkoutRecord),
    WorkoutRoute(RouteRecord),
    Sleep(SleepRecord),
    Heart(SamplesRecord),
    Steps(SamplesRecord),
    Distance(SamplesRecord),
    Calories(SamplesRecord),
    FlightsClimbed(SamplesRecord),
    Vo2Max(SamplesRecord),
    OxygenSaturation(SamplesRecord),
    Characteristic(CharacteristicRecord),
    ActivitiesSummary(ActivitiesSummaryRecord),
    Glucose(GlucoseRecord),
    Electrocardiogram(EcgRecord),
}

impl RecordPayload {
    pub fn data_type(&self) -> DataType {
        match self {
            RecordPayload::Workouts(_) => DataType::Workouts,
            RecordPayload::WorkoutRoute(_) => DataType::WorkoutRoute,
            RecordPayload::Sleep(_) => DataType::Sleep,
            RecordPayload::Heart(_) => DataType::Heart,
            RecordPayload::Steps(_) => DataType::Steps,
            RecordPayload::Distance(_) => DataType::Distance,
            RecordPayload::Calories(_) => DataType::Calories,
            RecordPayload::FlightsClimbed(_) => DataType::FlightsClimbed,
            RecordPayload::Vo2Max(_) => DataType::Vo2Max,
            RecordPayload::OxygenSaturation(_) => DataType::OxygenSaturation,
            RecordPayload::Characteristic(_) => DataType::Characteristic,
            RecordPayload::ActivitiesSummary(_) => DataType::ActivitiesSummary,
            RecordPayload::Glucose(_) => DataType::Glucose,
            RecordPayload::Electrocardiogram(_) => DataType::Electrocardiogram,
        }
    }
}

/// One normalized record: common envelope plus one domain payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(default, with = "timestamp::option")]
    pub date: Option<DateTime<Utc>>,
    pub source: Option<String>,
    #[serde(flatten)]
    pub payload: RecordPayload,
}

impl NormalizedRecord {
    pub fn new(date: Option<DateTime<Utc>>, source: Option<String>, payload: RecordPayload) -> Self {
        Self {
            date: date.map(timestamp::whole_seconds),
            source,
            payload,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.payload.data_type()
    }
}

/// Errors raised while encoding or decoding records
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Record has no 'dataType' field")]
    MissingDiscriminant,

    #[error("Unknown data type: {0}")]
    UnknownDiscriminant(String),

    #[error("No record payload exists for data type: {0}")]
    Unsupported(DataType),

    #[error("Malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Encode one record to JSON
pub fn encode_record(record: &NormalizedRecord) -> SchemaResult<String> {
    Ok(serde_json::to_string(record)?)
}

/// Encode a batch of records as one JSON array
pub fn encode_records(records: &[NormalizedRecord]) -> SchemaResult<Vec<u8>> {
    Ok(serde_json::to_vec(records)?)
}

/// Read and check the discriminant of a wire value
pub fn discriminant(value: &serde_json::Value) -> SchemaResult<DataType> {
    let tag = value
        .get(DISCRIMINANT)
        .and_then(|t| t.as_str())
        .ok_or(SchemaError::MissingDiscriminant)?;
    let data_type: DataType = tag.parse()?;
    // Parsing is case-insensitive, the wire tag is not
    if data_type.name() != tag {
        return Err(SchemaError::UnknownDiscriminant(tag.to_string()));
    }
    if !data_type.is_supported() {
        return Err(SchemaError::Unsupported(data_type));
    }
    Ok(data_type)
}

fn decode_value(value: serde_json::Value) -> SchemaResult<NormalizedRecord> {
    discriminant(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Decode one record, checking its discriminant first
pub fn decode_record(json: &str) -> SchemaResult<NormalizedRecord> {
    decode_value(serde_json::from_str(json)?)
}

/// Decode a JSON array of records
pub fn decode_records(json: &[u8]) -> SchemaResult<Vec<NormalizedRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(json)?;
    values.into_iter().map(decode_value).collect()
}
