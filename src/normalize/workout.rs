//! Workout transform
//!
//! One [`WorkoutRecord`] per workout. Derived values come from the embedded
//! statistics and the metadata bag:
//!
//! - **Distance**: first *present* statistic of cycling, walking/running,
//!   swimming; the header's total distance only when none is present. A
//!   present statistic wins even when its sum is zero.
//! - **Energy**: active-energy statistic, falling back to basal energy
//! - **Heart rate**: avg/min/max of the heart-rate statistic, rounded
//! - **Laps**: with a declared lap length, lap events are grouped under the
//!   segment events that enclose them

use crate::normalize::{activity, canonical};
use crate::schema::{
    NormalizedRecord, RecordPayload, WorkoutEventRecord, WorkoutLap, WorkoutRecord,
};
use crate::store::{
    metadata_keys, MetadataExt, MetadataValue, Quantity, SampleType, Unit, Workout, WorkoutEvent,
    WorkoutEventType,
};
use chrono::FixedOffset;

/// Distance statistics in selection order
pub const DISTANCE_PRECEDENCE: [SampleType; 3] = [
    SampleType::DistanceCycling,
    SampleType::DistanceWalkingRunning,
    SampleType::DistanceSwimming,
];

/// Normalize workouts, preserving input order
pub fn workouts(workouts: &[Workout], offset: FixedOffset) -> Vec<NormalizedRecord> {
    workouts
        .iter()
        .map(|w| {
            NormalizedRecord::new(
                Some(w.start),
                w.source.as_ref().map(|s| s.name.clone()),
                RecordPayload::Workouts(workout_record(w, offset)),
            )
        })
        .collect()
}

/// Distance in meters following [`DISTANCE_PRECEDENCE`]
pub fn select_distance(workout: &Workout) -> Option<f64> {
    let present = DISTANCE_PRECEDENCE
        .iter()
        .find_map(|t| workout.statistics_for(*t));
    match present {
        Some(stats) => stats.sum.and_then(|q| q.value_in(Unit::Meter)),
        None => workout.total_distance.and_then(|q| q.value_in(Unit::Meter)),
    }
}

fn statistic_sum(workout: &Workout, sample_type: SampleType, unit: Unit) -> Option<f64> {
    workout
        .statistics_for(sample_type)?
        .sum
        .and_then(|q| q.value_in(unit))
}

fn rounded(q: Option<Quantity>, unit: Unit) -> Option<f64> {
    q.and_then(|q| q.value_in(unit)).map(f64::round)
}

/// Metadata quantity in its canonical unit, if that unit is `expected`
fn canonical_meta(workout: &Workout, key: &str, expected: Unit) -> Option<f64> {
    let quantity = workout.metadata.quantity_value(key)?;
    canonical::resolve(&quantity)
        .filter(|c| c.unit == expected)
        .map(|c| c.value)
}

/// Metadata value in `unit`, accepting quantities or bare numbers
fn meta_in(workout: &Workout, key: &str, unit: Unit) -> Option<f64> {
    match workout.metadata.get(key)? {
        MetadataValue::Quantity(q) => q.value_in(unit),
        _ => workout.metadata.number_value(key),
    }
}

fn weather_condition(workout: &Workout) -> Option<String> {
    let key = metadata_keys::WEATHER_CONDITION;
    if let Some(text) = workout.metadata.text_value(key) {
        return Some(text.to_string());
    }
    workout
        .metadata
        .int_value(key)
        .map(|code| weather_label(code).map_or_else(|| code.to_string(), str::to_string))
}

/// Display label of a weather-condition code
pub fn weather_label(code: i64) -> Option<&'static str> {
    const LABELS: [&str; 28] = [
        "",
        "Clear",
        "Fair",
        "Partly Cloudy",
        "Mostly Cloudy",
        "Cloudy",
        "Foggy",
        "Haze",
        "Wind",
        "Bluster",
        "Smoky",
        "Dust",
        "Snow",
        "Hail",
        "Sleet",
        "Freezing Drizzle",
        "Freezing Rain",
        "Mixed Rain And Hail",
        "Mixed Rain And Snow",
        "Mixed Rain And Sleet",
        "Mixed Snow And Sleet",
        "Drizzle",
        "Scattered Showers",
        "Showers",
        "Thunderstorms",
        "Tropical Storm",
        "Hurricane",
        "Tornado",
    ];
    usize::try_from(code).ok().and_then(|i| LABELS.get(i)).copied()
}

fn event_record(event: &WorkoutEvent) -> WorkoutEventRecord {
    WorkoutEventRecord {
        event_type: event.event_type.label().to_string(),
        time_start: event.start,
        time_end: Some(event.end),
        timer_duration: Some(event.duration_secs().round()),
    }
}

/// Segments with the laps they enclose; empty without a lap length
pub fn group_laps(workout: &Workout) -> Vec<WorkoutLap> {
    let Some(lap_length) = canonical_meta(workout, metadata_keys::LAP_LENGTH, Unit::Meter) else {
        return Vec::new();
    };

    let of_type = |t: WorkoutEventType| workout.events.iter().filter(move |e| e.event_type == t);

    of_type(WorkoutEventType::Segment)
        .map(|segment| {
            let laps: Vec<WorkoutEventRecord> = of_type(WorkoutEventType::Lap)
                .filter(|lap| lap.is_within(segment))
                .map(event_record)
                .collect();
            WorkoutLap {
                time_start: segment.start,
                time_end: segment.end,
                timer_duration: Some(segment.duration_secs()),
                distance: Some(lap_length * laps.len() as f64),
                events: laps,
            }
        })
        .collect()
}

/// Build the record payload for one workout
pub fn workout_record(workout: &Workout, offset: FixedOffset) -> WorkoutRecord {
    let activity = activity::lookup(workout.activity_type);
    let heart = workout.statistics_for(SampleType::HeartRate);
    let active = statistic_sum(workout, SampleType::ActiveEnergyBurned, Unit::Kilocalorie);
    let basal = statistic_sum(workout, SampleType::BasalEnergyBurned, Unit::Kilocalorie);
    let manual = workout.was_user_entered();

    let record = WorkoutRecord {
        id: workout.id.to_string(),
        workout_name: activity.name.to_string(),
        common_name: activity.common_name.to_string(),
        icon: activity.icon.to_string(),
        emoji: activity.emoji.map(str::to_string),
        workout_type_id: Some(workout.activity_type),
        time_start: workout.start,
        time_end: workout.end,
        timezone_offset: Some(offset.local_minus_utc() / 60),
        timezone: workout
            .metadata
            .text_value(metadata_keys::TIME_ZONE)
            .map(str::to_string),
        avg_hr: rounded(heart.and_then(|h| h.average), Unit::CountPerMinute),
        max_hr: rounded(heart.and_then(|h| h.maximum), Unit::CountPerMinute),
        min_hr: rounded(heart.and_then(|h| h.minimum), Unit::CountPerMinute),
        total_energy_burned: active.or(basal),
        active_energy_burned: active,
        duration: Some(workout.duration_secs as i64),
        elevation_ascended: canonical_meta(workout, metadata_keys::ELEVATION_ASCENDED, Unit::Meter),
        elevation_descended: canonical_meta(
            workout,
            metadata_keys::ELEVATION_DESCENDED,
            Unit::Meter,
        ),
        distance: select_distance(workout),
        avg_speed: canonical_meta(workout, metadata_keys::AVERAGE_SPEED, Unit::MeterPerSecond),
        max_speed: canonical_meta(workout, metadata_keys::MAXIMUM_SPEED, Unit::MeterPerSecond),
        swimming_stroke_count: statistic_sum(workout, SampleType::SwimmingStrokeCount, Unit::Count)
            .map(f64::round),
        weather_humidity: meta_in(workout, metadata_keys::WEATHER_HUMIDITY, Unit::Percent),
        weather_temperature: meta_in(
            workout,
            metadata_keys::WEATHER_TEMPERATURE,
            Unit::DegreeCelsius,
        ),
        weather_condition: weather_condition(workout),
        avg_mets: canonical_meta(
            workout,
            metadata_keys::AVERAGE_METS,
            Unit::KilocaloriePerHourKilogram,
        ),
        laps: group_laps(workout),
        events: workout.events.iter().map(event_record).collect(),
        manual: Some(manual),
        activities: Some(workout.activities.len()),
    };

    tracing::debug!(
        workout_id = %workout.id,
        activity = activity.name,
        distance = ?record.distance,
        "Workout normalized"
    );
    record
}
