//! Characteristics and daily activity summaries

use crate::schema::{ActivitiesSummaryRecord, CharacteristicRecord, NormalizedRecord, RecordPayload};
use crate::store::{ActivitySummary, CharacteristicKind, Characteristics, MoveMode, Unit};
use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

pub const SUMMARY_SOURCE: &str = "HealthKit";

/// One record per requested characteristic; unset values stay empty
pub fn characteristics(
    values: &Characteristics,
    kinds: &[CharacteristicKind],
    today: NaiveDate,
) -> Vec<NormalizedRecord> {
    kinds
        .iter()
        .map(|kind| {
            NormalizedRecord::new(
                None,
                Some(SUMMARY_SOURCE.to_string()),
                RecordPayload::Characteristic(CharacteristicRecord {
                    kind: kind.name().to_string(),
                    value: values.value_of(*kind, today),
                }),
            )
        })
        .collect()
}

fn move_mode_name(mode: MoveMode) -> &'static str {
    match mode {
        MoveMode::ActiveEnergy => "activeEnergy",
        MoveMode::MoveTime => "moveTime",
    }
}

/// Summary record; dated at local midnight of the summary day
pub fn activity_summary(summary: &ActivitySummary, offset: FixedOffset) -> NormalizedRecord {
    let (moved, goal) = match summary.move_mode {
        MoveMode::ActiveEnergy => (
            summary.active_energy_burned.value_in(Unit::Kilocalorie),
            summary.active_energy_burned_goal.value_in(Unit::Kilocalorie),
        ),
        MoveMode::MoveTime => (
            summary.move_time.and_then(|q| q.value_in(Unit::Minute)),
            summary.move_time_goal.and_then(|q| q.value_in(Unit::Minute)),
        ),
    };

    let date = summary
        .date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .map(|local| local.with_timezone(&Utc));

    NormalizedRecord::new(
        date,
        Some(SUMMARY_SOURCE.to_string()),
        RecordPayload::ActivitiesSummary(ActivitiesSummaryRecord {
            calories_active: moved,
            daily_movement: goal,
            high: summary.exercise_time.value_in(Unit::Minute),
            high_goal: summary
                .exercise_time_goal
                .and_then(|q| q.value_in(Unit::Minute)),
            stand_hours: summary.stand_hours.value_in(Unit::Count),
            stand_hours_goal: summary.stand_hours_goal.and_then(|q| q.value_in(Unit::Count)),
            move_mode: move_mode_name(summary.move_mode).to_string(),
            provider_timestamp: Some(summary.date.format("%Y-%m-%d").to_string()),
        }),
    )
}
