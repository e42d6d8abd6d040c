//! Sleep staging and scoring
//!
//! Staged sleep-analysis samples become one [`SleepRecord`] per session.
//! Durations accumulate per stage:
//!
//! ```text
//! stage        total_sleep   own field
//! -----------  -----------   ---------
//! light/core   yes           light
//! deep         yes           deep
//! rem          yes           rem
//! unspecified  yes           -
//! awake        no            awake
//! inBed        no            in_bed
//! ```
//!
//! By default every call yields a single session regardless of gaps in the
//! input. [`SleepOptions::split_on_gap`] opts into splitting.

use crate::schema::{NormalizedRecord, RecordPayload, SleepLevel, SleepRecord};
use crate::store::{CategorySample, SleepStage};
use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Sleep hours that earn a full duration score
pub const IDEAL_SLEEP_HOURS: f64 = 8.0;

/// Level label for stage codes outside the known set
pub const UNKNOWN_LEVEL: &str = "unknown";

const DURATION_WEIGHT: f64 = 0.5;
const EFFICIENCY_WEIGHT: f64 = 0.3;
const CONSISTENCY_WEIGHT: f64 = 0.2;

/// Session handling options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SleepOptions {
    /// Start a new session when this much time separates two samples
    pub split_gap: Option<Duration>,
}

impl SleepOptions {
    pub fn single_session() -> Self {
        Self::default()
    }

    pub fn split_on_gap(gap: Duration) -> Self {
        Self {
            split_gap: Some(gap),
        }
    }
}

/// Duration score: share of the ideal sleep, in [0, 100]
pub fn duration_score(sleep_hours: f64) -> f64 {
    (sleep_hours / IDEAL_SLEEP_HOURS * 100.0).clamp(0.0, 100.0)
}

/// 100 minus the standard deviation of `starts` in minutes, in [0, 100]
///
/// None when there are no start times.
pub fn consistency_score(starts: &[DateTime<Utc>]) -> Option<f64> {
    if starts.is_empty() {
        return None;
    }
    let n = starts.len() as f64;
    let secs: Vec<f64> = starts
        .iter()
        .map(|t| t.timestamp_millis() as f64 / 1000.0)
        .collect();
    let mean = secs.iter().sum::<f64>() / n;
    let variance = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let std_dev_minutes = variance.sqrt() / 60.0;
    Some((100.0 - std_dev_minutes).clamp(0.0, 100.0))
}

/// Weighted duration, efficiency and consistency score, in [0, 100]
///
/// Missing efficiency or consistency counts as zero.
pub fn weighted_score(sleep_hours: f64, efficiency: Option<f64>, consistency: Option<f64>) -> f64 {
    let duration = (sleep_hours / IDEAL_SLEEP_HOURS * 100.0).min(100.0);
    let score = duration * DURATION_WEIGHT
        + efficiency.unwrap_or(0.0) * EFFICIENCY_WEIGHT
        + consistency.unwrap_or(0.0) * CONSISTENCY_WEIGHT;
    score.clamp(0.0, 100.0)
}

/// Normalize staged samples into sleep sessions
///
/// Empty input yields no sessions. Samples are ordered by start time before
/// staging; the input slice is left untouched.
pub fn sleep_sessions(
    samples: &[CategorySample],
    offset: FixedOffset,
    options: &SleepOptions,
) -> Vec<NormalizedRecord> {
    let mut sorted: Vec<&CategorySample> = samples.iter().collect();
    sorted.sort_by_key(|s| s.start);

    split(&sorted, options.split_gap)
        .into_iter()
        .filter_map(|session| session_record(session, offset))
        .collect()
}

fn split<'a>(
    sorted: &'a [&'a CategorySample],
    gap: Option<Duration>,
) -> Vec<&'a [&'a CategorySample]> {
    let Some(gap) = gap else {
        return vec![sorted];
    };

    let mut sessions = Vec::new();
    let mut begin = 0;
    let mut latest_end: Option<DateTime<Utc>> = None;
    for (i, sample) in sorted.iter().enumerate() {
        if let Some(end) = latest_end {
            if sample.start - end > gap {
                sessions.push(&sorted[begin..i]);
                begin = i;
                latest_end = None;
            }
        }
        latest_end = Some(latest_end.map_or(sample.end, |e| e.max(sample.end)));
    }
    sessions.push(&sorted[begin..]);
    sessions
}

#[derive(Default)]
struct StageTotals {
    total_sleep: f64,
    in_bed: f64,
    awake: f64,
    light: f64,
    deep: f64,
    rem: f64,
    awakenings: usize,
}

impl StageTotals {
    fn add(&mut self, stage: SleepStage, seconds: f64) {
        match stage {
            SleepStage::InBed => self.in_bed += seconds,
            SleepStage::Awake => {
                self.awake += seconds;
                self.awakenings += 1;
            }
            SleepStage::Light => self.light += seconds,
            SleepStage::Deep => self.deep += seconds,
            SleepStage::Rem => self.rem += seconds,
            SleepStage::Unspecified => {}
        }
        if stage.is_asleep() {
            self.total_sleep += seconds;
        }
    }
}

fn session_record(session: &[&CategorySample], offset: FixedOffset) -> Option<NormalizedRecord> {
    let first = session.first()?;
    let bedtime_start = first.start;
    // Latest end, not the last sample's end; samples can overlap
    let bedtime_end = session.iter().map(|s| s.end).max()?;

    let mut totals = StageTotals::default();
    let mut asleep_starts = Vec::new();
    let mut levels = Vec::with_capacity(session.len());

    for sample in session {
        let seconds = sample.duration_secs();
        let level = match SleepStage::from_code(sample.value) {
            Some(stage) => {
                totals.add(stage, seconds);
                if stage.is_asleep() {
                    asleep_starts.push(sample.start);
                }
                stage.label()
            }
            None => {
                tracing::debug!(code = sample.value, "Unknown sleep stage code");
                UNKNOWN_LEVEL
            }
        };
        levels.push(SleepLevel {
            date_time: sample.start,
            level: level.to_string(),
            seconds,
        });
    }

    let bedtime_duration = (bedtime_end - bedtime_start).num_milliseconds() as f64 / 1000.0;
    let sleep_hours = totals.total_sleep / 3600.0;
    let efficiency = (totals.in_bed > 0.0).then(|| totals.total_sleep / totals.in_bed * 100.0);
    let consistency = consistency_score(&asleep_starts);

    let record = SleepRecord {
        bedtime_start,
        bedtime_end,
        timezone_offset: Some(offset.local_minus_utc() as f64 / 3600.0),
        bedtime_duration,
        total_sleep: totals.total_sleep,
        in_bed: totals.in_bed,
        awake: totals.awake,
        light: totals.light,
        rem: totals.rem,
        deep: totals.deep,
        efficiency,
        awakenings: totals.awakenings,
        latency: bedtime_duration - totals.total_sleep,
        consistency_score: consistency,
        standardized_sleep_score: duration_score(sleep_hours),
        source_specific_sleep_score: weighted_score(sleep_hours, efficiency, consistency),
        levels,
    };

    tracing::debug!(
        bedtime_start = %bedtime_start,
        total_sleep = record.total_sleep,
        score = record.source_specific_sleep_score,
        "Sleep session normalized"
    );

    Some(NormalizedRecord::new(
        Some(bedtime_start),
        first.source.as_ref().map(|s| s.name.clone()),
        RecordPayload::Sleep(record),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SampleType;
    use chrono::{Offset, TimeZone};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, d, h, m, 0).unwrap()
    }

    fn stage(stage: SleepStage, start: DateTime<Utc>, end: DateTime<Utc>) -> CategorySample {
        CategorySample::sleep(stage, start, end).source("Watch")
    }

    fn night() -> Vec<CategorySample> {
        vec![
            stage(SleepStage::InBed, at(19, 23, 0), at(20, 7, 0)),
            stage(SleepStage::Light, at(19, 23, 10), at(20, 1, 0)),
            stage(SleepStage::Awake, at(20, 1, 0), at(20, 1, 10)),
            stage(SleepStage::Deep, at(20, 1, 10), at(20, 3, 0)),
            stage(SleepStage::Rem, at(20, 3, 0), at(20, 4, 0)),
            stage(SleepStage::Light, at(20, 4, 0), at(20, 7, 0)),
        ]
    }

    fn sleep_of(record: &NormalizedRecord) -> &SleepRecord {
        match &record.payload {
            RecordPayload::Sleep(sleep) => sleep,
            other => panic!("expected sleep payload, got {:?}", other.data_type()),
        }
    }

    #[test]
    fn test_night_totals() {
        let records = sleep_sessions(&night(), Utc.fix(), &SleepOptions::default());
        assert_eq!(records.len(), 1);
        let sleep = sleep_of(&records[0]);

        assert_eq!(sleep.total_sleep, (7 * 3600 + 40 * 60) as f64);
        assert_eq!(sleep.in_bed, (8 * 3600) as f64);
        assert_eq!(sleep.light, (4 * 3600 + 50 * 60) as f64);
        assert_eq!(sleep.deep, (3600 + 50 * 60) as f64);
        assert_eq!(sleep.rem, 3600.0);
        assert_eq!(sleep.awake, 600.0);
        assert_eq!(sleep.awakenings, 1);

        let efficiency = sleep.efficiency.unwrap();
        assert!((efficiency - 95.833).abs() < 0.01, "efficiency {}", efficiency);

        assert_eq!(sleep.bedtime_start, at(19, 23, 0));
        assert_eq!(sleep.bedtime_end, at(20, 7, 0));
        assert_eq!(sleep.bedtime_duration, (8 * 3600) as f64);
        assert_eq!(sleep.latency, 20.0 * 60.0);
        assert_eq!(records[0].date, Some(at(19, 23, 0)));
        assert_eq!(records[0].source.as_deref(), Some("Watch"));
    }

    #[test]
    fn test_bedtime_end_is_latest_end() {
        // Last-starting sample ends before the enclosing in-bed interval
        let samples = vec![
            stage(SleepStage::InBed, at(19, 23, 0), at(20, 7, 30)),
            stage(SleepStage::Light, at(19, 23, 10), at(20, 5, 0)),
            stage(SleepStage::Rem, at(20, 5, 0), at(20, 6, 0)),
        ];
        let records = sleep_sessions(&samples, Utc.fix(), &SleepOptions::default());
        let sleep = sleep_of(&records[0]);
        assert_eq!(sleep.bedtime_end, at(20, 7, 30));
        assert_eq!(sleep.bedtime_duration, (8 * 3600 + 30 * 60) as f64);
    }

    #[test]
    fn test_levels_follow_start_order() {
        let mut samples = night();
        samples.reverse();
        let records = sleep_sessions(&samples, Utc.fix(), &SleepOptions::default());
        let levels: Vec<&str> = sleep_of(&records[0])
            .levels
            .iter()
            .map(|l| l.level.as_str())
            .collect();
        assert_eq!(levels, vec!["InBed", "Core", "Awake", "Deep", "REM", "Core"]);
    }

    #[test]
    fn test_scores_in_range() {
        let records = sleep_sessions(&night(), Utc.fix(), &SleepOptions::default());
        let sleep = sleep_of(&records[0]);
        for score in [
            sleep.standardized_sleep_score,
            sleep.source_specific_sleep_score,
            sleep.consistency_score.unwrap(),
        ] {
            assert!((0.0..=100.0).contains(&score), "score {}", score);
        }

        for hours in [0.0, 0.5, 7.9, 8.0, 14.0, 1e9] {
            let score = duration_score(hours);
            assert!((0.0..=100.0).contains(&score));
        }
        assert_eq!(duration_score(4.0), 50.0);
        assert_eq!(duration_score(12.0), 100.0);
    }

    #[test]
    fn test_weighted_score() {
        assert_eq!(weighted_score(8.0, Some(100.0), Some(100.0)), 100.0);
        assert_eq!(weighted_score(4.0, None, None), 25.0);
        assert_eq!(weighted_score(20.0, Some(400.0), Some(100.0)), 100.0);
    }

    #[test]
    fn test_consistency_score() {
        assert_eq!(consistency_score(&[]), None);
        assert_eq!(consistency_score(&[at(20, 1, 0), at(20, 1, 0)]), Some(100.0));
        // Starts 20 minutes apart: stddev is 10 minutes
        assert_eq!(consistency_score(&[at(20, 1, 0), at(20, 1, 20)]), Some(90.0));
        // Days apart: floor at zero
        assert_eq!(consistency_score(&[at(1, 0, 0), at(20, 0, 0)]), Some(0.0));
    }

    #[test]
    fn test_no_in_bed_leaves_efficiency_empty() {
        let samples = vec![stage(SleepStage::Deep, at(20, 1, 0), at(20, 3, 0))];
        let records = sleep_sessions(&samples, Utc.fix(), &SleepOptions::default());
        let sleep = sleep_of(&records[0]);
        assert_eq!(sleep.efficiency, None);
        assert_eq!(sleep.total_sleep, 7200.0);
    }

    #[test]
    fn test_unknown_stage_labelled() {
        let samples = vec![
            CategorySample::new(SampleType::SleepAnalysis, at(20, 1, 0), at(20, 2, 0), 42),
            stage(SleepStage::Unspecified, at(20, 2, 0), at(20, 3, 0)),
        ];
        let records = sleep_sessions(&samples, Utc.fix(), &SleepOptions::default());
        let sleep = sleep_of(&records[0]);
        assert_eq!(sleep.levels[0].level, UNKNOWN_LEVEL);
        assert_eq!(sleep.levels[1].level, "Asleep Unspecified");
        assert_eq!(sleep.total_sleep, 3600.0);
        assert_eq!(sleep.light, 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(sleep_sessions(&[], Utc.fix(), &SleepOptions::default()).is_empty());
    }

    #[test]
    fn test_gaps_kept_in_one_session_by_default() {
        let mut samples = night();
        samples.push(stage(SleepStage::Light, at(20, 14, 0), at(20, 15, 0)));

        let single = sleep_sessions(&samples, Utc.fix(), &SleepOptions::single_session());
        assert_eq!(single.len(), 1);
        assert_eq!(sleep_of(&single[0]).bedtime_end, at(20, 15, 0));

        let split = sleep_sessions(
            &samples,
            Utc.fix(),
            &SleepOptions::split_on_gap(Duration::hours(1)),
        );
        assert_eq!(split.len(), 2);
        assert_eq!(sleep_of(&split[0]).bedtime_end, at(20, 7, 0));
        assert_eq!(sleep_of(&split[1]).total_sleep, 3600.0);
    }

    #[test]
    fn test_timezone_offset_in_hours() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let records = sleep_sessions(&night(), offset, &SleepOptions::default());
        assert_eq!(sleep_of(&records[0]).timezone_offset, Some(3.0));
    }

    #[test]
    fn test_input_untouched_and_idempotent() {
        let samples = night();
        let before = samples.clone();
        let a = sleep_sessions(&samples, Utc.fix(), &SleepOptions::default());
        let b = sleep_sessions(&samples, Utc.fix(), &SleepOptions::default());
        assert_eq!(a, b);
        assert_eq!(samples, before);
    }
}
