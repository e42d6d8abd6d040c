//! Per-domain record payloads
//!
//! Field names are the wire names (snake_case). Timestamps travel as
//! ISO-8601 strings, see [`timestamp`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ISO-8601 timestamps
///
/// Fractional seconds are written only when present, so whole-second
/// instants read `2024-04-20T07:00:00Z`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Timelike, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Drop sub-second precision; record dates always carry whole seconds
    pub fn whole_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
        instant.with_nanosecond(0).unwrap_or(instant)
    }

    pub fn format(instant: &DateTime<Utc>) -> String {
        instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(instant))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            instant: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match instant {
                Some(instant) => super::serialize(instant, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| Some(dt.with_timezone(&Utc)))
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

/// One point of a sample series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    #[serde(with = "timestamp")]
    pub time_start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub time_end: DateTime<Utc>,
    pub value: Option<f64>,
    /// Secondary value, e.g. the heart-rate motion context
    pub value2: Option<f64>,
}

/// Aggregate over a sample series (steps, distance, heart rate, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplesRecord {
    pub total: Option<f64>,
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<String>,
    #[serde(default)]
    pub samples: Vec<SamplePoint>,
}

/// A workout event on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEventRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(with = "timestamp")]
    pub time_start: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub time_end: Option<DateTime<Utc>>,
    /// Seconds, rounded
    pub timer_duration: Option<f64>,
}

/// A segment of a lap-based workout with the laps it contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLap {
    #[serde(with = "timestamp")]
    pub time_start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub time_end: DateTime<Utc>,
    pub timer_duration: Option<f64>,
    /// Lap count times lap length, in meters
    pub distance: Option<f64>,
    #[serde(default)]
    pub events: Vec<WorkoutEventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: String,
    pub workout_name: String,
    pub common_name: String,
    pub icon: String,
    pub emoji: Option<String>,
    pub workout_type_id: Option<u32>,
    #[serde(with = "timestamp")]
    pub time_start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub time_end: DateTime<Utc>,
    /// Minutes east of UTC
    pub timezone_offset: Option<i32>,
    pub timezone: Option<String>,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub min_hr: Option<f64>,
    pub total_energy_burned: Option<f64>,
    pub active_energy_burned: Option<f64>,
    /// Whole seconds
    pub duration: Option<i64>,
    pub elevation_ascended: Option<f64>,
    pub elevation_descended: Option<f64>,
    pub distance: Option<f64>,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub swimming_stroke_count: Option<f64>,
    pub weather_humidity: Option<f64>,
    pub weather_temperature: Option<f64>,
    pub weather_condition: Option<String>,
    pub avg_mets: Option<f64>,
    #[serde(default)]
    pub laps: Vec<WorkoutLap>,
    #[serde(default)]
    pub events: Vec<WorkoutEventRecord>,
    pub manual: Option<bool>,
    pub activities: Option<usize>,
}

/// One staged interval of a sleep session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepLevel {
    #[serde(with = "timestamp")]
    pub date_time: DateTime<Utc>,
    pub level: String,
    pub seconds: f64,
}

/// Durations are in seconds, scores in [0, 100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    #[serde(with = "timestamp")]
    pub bedtime_start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub bedtime_end: DateTime<Utc>,
    /// Hours east of UTC
    pub timezone_offset: Option<f64>,
    pub bedtime_duration: f64,
    pub total_sleep: f64,
    pub in_bed: f64,
    pub awake: f64,
    pub light: f64,
    pub rem: f64,
    pub deep: f64,
    pub efficiency: Option<f64>,
    pub awakenings: usize,
    pub latency: f64,
    pub consistency_score: Option<f64>,
    pub standardized_sleep_score: f64,
    /// Weighted duration, efficiency and consistency score
    pub source_specific_sleep_score: f64,
    #[serde(default)]
    pub levels: Vec<SleepLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
    pub altitude: f64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(default)]
    pub coordinates: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicRecord {
    /// Characteristic name, e.g. `bloodType`
    pub kind: String,
    pub value: Option<String>,
}

/// Daily ring summary; energy in kcal, times in minutes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitiesSummaryRecord {
    /// Move value: active energy, or move time in move-time mode
    pub calories_active: Option<f64>,
    /// Move goal in the same mode
    pub daily_movement: Option<f64>,
    /// Exercise minutes
    pub high: Option<f64>,
    pub high_goal: Option<f64>,
    pub stand_hours: Option<f64>,
    pub stand_hours_goal: Option<f64>,
    pub move_mode: String,
    pub provider_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucosePoint {
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Blood glucose in mg/dL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseRecord {
    pub avg_value: Option<f64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub unit: Option<String>,
    #[serde(default)]
    pub intraday_data: Vec<GlucosePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgRecord {
    /// Sampling frequency in Hz
    pub frequency: Option<f64>,
    pub avg_hr: Option<i64>,
    pub classification: String,
    pub lead: Option<String>,
    #[serde(with = "timestamp")]
    pub time_start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub time_end: DateTime<Utc>,
    pub timezone_offset: Option<i32>,
    pub unit: Option<String>,
    #[serde(default)]
    pub samples: Vec<f64>,
}
