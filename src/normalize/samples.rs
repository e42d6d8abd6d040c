//! Sample-series transforms
//!
//! - **Cumulative domains** (steps, distance, calories, flights climbed) read
//!   anchor-aligned statistics windows and carry a running total
//! - **Heart rate** aggregates point samples into avg/min/max in count/min
//! - **Point domains** (VO2max, oxygen saturation) carry per-sample values
//!   only; no total applies to them
//!
//! A window or sample whose value cannot be converted is skipped.

use crate::normalize::canonical;
use crate::schema::{DataType, NormalizedRecord, RecordPayload, SamplePoint, SamplesRecord};
use crate::store::{
    metadata_keys, MetadataExt, QuantitySample, SampleType, StatisticsCollection, TimeRange, Unit,
};

/// Source reported when a window carries none
pub const DEFAULT_WINDOW_SOURCE: &str = "HealthKit";

/// Source reported for point domains
pub const POINT_SOURCE: &str = "healthkit";

/// Domains summed over statistics windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CumulativeDomain {
    Steps,
    Distance,
    Calories,
    FlightsClimbed,
}

impl CumulativeDomain {
    pub fn from_data_type(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Steps => Some(Self::Steps),
            DataType::Distance => Some(Self::Distance),
            DataType::Calories => Some(Self::Calories),
            DataType::FlightsClimbed => Some(Self::FlightsClimbed),
            _ => None,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Steps => DataType::Steps,
            Self::Distance => DataType::Distance,
            Self::Calories => DataType::Calories,
            Self::FlightsClimbed => DataType::FlightsClimbed,
        }
    }

    /// Store type the windows are computed over
    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::Steps => SampleType::StepCount,
            Self::Distance => SampleType::DistanceWalkingRunning,
            Self::Calories => SampleType::ActiveEnergyBurned,
            Self::FlightsClimbed => SampleType::FlightsClimbed,
        }
    }

    /// Canonical unit of the domain
    pub fn unit(&self) -> Unit {
        match self {
            Self::Steps | Self::FlightsClimbed => Unit::Count,
            Self::Distance => Unit::Meter,
            Self::Calories => Unit::Kilocalorie,
        }
    }

    fn payload(&self, record: SamplesRecord) -> RecordPayload {
        match self {
            Self::Steps => RecordPayload::Steps(record),
            Self::Distance => RecordPayload::Distance(record),
            Self::Calories => RecordPayload::Calories(record),
            Self::FlightsClimbed => RecordPayload::FlightsClimbed(record),
        }
    }
}

/// Sum statistics windows over `range` into one record
///
/// Every window with a convertible sum contributes one sample. The record
/// is dated at the range start; its source is the first source of the last
/// window enumerated, except for distance, which always reports the
/// default source.
pub fn window_totals(
    domain: CumulativeDomain,
    collection: &StatisticsCollection,
    range: &TimeRange,
) -> NormalizedRecord {
    let unit = domain.unit();
    let mut total = 0.0;
    let mut samples = Vec::new();
    let mut source = None;

    for window in collection.enumerate(range) {
        source = window.sources.first().map(|s| s.name.clone());

        let Some(sum) = window.sum else {
            continue;
        };
        let value = match canonical::resolve(&sum) {
            Some(c) if c.unit == unit => c.value,
            _ => {
                tracing::debug!(
                    data_type = %domain.data_type(),
                    unit = %sum.unit,
                    window_start = %window.start,
                    "Skipping window with unconvertible sum"
                );
                continue;
            }
        };

        total += value;
        samples.push(SamplePoint {
            time_start: window.start,
            time_end: window.end,
            value: Some(value),
            value2: None,
        });
    }

    let source = match domain {
        CumulativeDomain::Distance => None,
        _ => source,
    }
    .unwrap_or_else(|| DEFAULT_WINDOW_SOURCE.to_string());

    NormalizedRecord::new(
        Some(range.start),
        Some(source),
        domain.payload(SamplesRecord {
            total: Some(total),
            avg: None,
            min: None,
            max: None,
            unit: Some(unit.symbol().to_string()),
            samples,
        }),
    )
}

/// Aggregate heart-rate samples; None when nothing converts
///
/// `value2` of each point carries the motion context recorded with the
/// sample, if any.
pub fn heart_rate(samples: &[QuantitySample]) -> Option<NormalizedRecord> {
    let mut points = Vec::with_capacity(samples.len());
    let mut min = f64::MAX;
    let mut max = 0.0_f64;
    let mut sum = 0.0;

    for sample in samples {
        let Some(bpm) = sample.quantity.value_in(Unit::CountPerMinute) else {
            tracing::debug!(unit = %sample.quantity.unit, "Skipping heart rate sample");
            continue;
        };
        min = min.min(bpm);
        max = max.max(bpm);
        sum += bpm;
        points.push(SamplePoint {
            time_start: sample.start,
            time_end: sample.end,
            value: Some(bpm),
            value2: sample
                .metadata
                .number_value(metadata_keys::HEART_RATE_MOTION_CONTEXT),
        });
    }

    let first = points.first()?;
    let date = first.time_start;
    let source = samples
        .first()
        .and_then(|s| s.source.as_ref())
        .map(|s| s.name.clone());
    let avg = sum / points.len() as f64;

    Some(NormalizedRecord::new(
        Some(date),
        source,
        RecordPayload::Heart(SamplesRecord {
            total: None,
            avg: Some(avg),
            min: Some(min),
            max: Some(max),
            unit: Some(Unit::CountPerMinute.symbol().to_string()),
            samples: points,
        }),
    ))
}

/// Domains carrying per-sample values without aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointDomain {
    Vo2Max,
    OxygenSaturation,
}

impl PointDomain {
    pub fn from_data_type(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Vo2Max => Some(Self::Vo2Max),
            DataType::OxygenSaturation => Some(Self::OxygenSaturation),
            _ => None,
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::Vo2Max => SampleType::Vo2Max,
            Self::OxygenSaturation => SampleType::OxygenSaturation,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Self::Vo2Max => Unit::MilliliterPerKilogramMinute,
            Self::OxygenSaturation => Unit::Percent,
        }
    }
}

/// Per-sample values of a point domain; None when nothing converts
pub fn point_series(domain: PointDomain, samples: &[QuantitySample]) -> Option<NormalizedRecord> {
    let unit = domain.unit();
    let points: Vec<SamplePoint> = samples
        .iter()
        .filter_map(|sample| {
            let value = sample.quantity.value_in(unit)?;
            Some(SamplePoint {
                time_start: sample.start,
                time_end: sample.end,
                value: Some(value),
                // VO2max has a single rate unit, so both columns agree
                value2: match domain {
                    PointDomain::Vo2Max => Some(value),
                    PointDomain::OxygenSaturation => None,
                },
            })
        })
        .collect();

    let date = points.first()?.time_start;
    let record = SamplesRecord {
        total: None,
        avg: None,
        min: None,
        max: None,
        unit: Some(unit.symbol().to_string()),
        samples: points,
    };
    let payload = match domain {
        PointDomain::Vo2Max => RecordPayload::Vo2Max(record),
        PointDomain::OxygenSaturation => RecordPayload::OxygenSaturation(record),
    };

    Some(NormalizedRecord::new(
        Some(date),
        Some(POINT_SOURCE.to_string()),
        payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MetadataValue, Quantity, SourceInfo, StatisticsWindow};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, d, h, 0, 0).unwrap()
    }

    fn window(d: u32, sum: Option<Quantity>, source: Option<&str>) -> StatisticsWindow {
        let mut w = StatisticsWindow::empty(at(d, 0), at(d + 1, 0));
        w.sum = sum;
        w.sources = source.map(SourceInfo::new).into_iter().collect();
        w
    }

    fn collection(windows: Vec<StatisticsWindow>) -> StatisticsCollection {
        StatisticsCollection {
            anchor: at(1, 0),
            windows,
        }
    }

    #[test]
    fn test_steps_totals() {
        let stats = collection(vec![
            window(18, Some(Quantity::new(4000.0, Unit::Count)), Some("Phone")),
            window(19, None, None),
            window(20, Some(Quantity::new(6000.0, Unit::Count)), Some("Watch")),
        ]);
        let range = TimeRange::try_new(at(18, 0), at(21, 0)).unwrap();

        let record = window_totals(CumulativeDomain::Steps, &stats, &range);
        assert_eq!(record.date, Some(at(18, 0)));
        assert_eq!(record.source.as_deref(), Some("Watch"));

        let RecordPayload::Steps(steps) = record.payload else {
            panic!("expected steps payload");
        };
        assert_eq!(steps.total, Some(10000.0));
        assert_eq!(steps.unit.as_deref(), Some("count"));
        assert_eq!(steps.samples.len(), 2);
        assert_eq!(steps.samples[1].time_start, at(20, 0));
    }

    #[test]
    fn test_distance_converts_and_ignores_window_source() {
        let stats = collection(vec![window(
            18,
            Some(Quantity::new(1.5, Unit::Kilometer)),
            Some("Watch"),
        )]);
        let range = TimeRange::try_new(at(18, 0), at(19, 0)).unwrap();

        let record = window_totals(CumulativeDomain::Distance, &stats, &range);
        assert_eq!(record.source.as_deref(), Some(DEFAULT_WINDOW_SOURCE));
        let RecordPayload::Distance(distance) = record.payload else {
            panic!("expected distance payload");
        };
        assert_eq!(distance.total, Some(1500.0));
        assert_eq!(distance.unit.as_deref(), Some("m"));
    }

    #[test]
    fn test_windows_clipped_to_range() {
        let stats = collection(vec![
            window(17, Some(Quantity::new(100.0, Unit::Kilocalorie)), None),
            window(18, Some(Quantity::new(200.0, Unit::Kilocalorie)), None),
        ]);
        let range = TimeRange::try_new(at(18, 0), at(19, 0)).unwrap();

        let record = window_totals(CumulativeDomain::Calories, &stats, &range);
        let RecordPayload::Calories(calories) = record.payload else {
            panic!("expected calories payload");
        };
        assert_eq!(calories.total, Some(200.0));
        for s in &calories.samples {
            assert!(range.encloses(s.time_start, s.time_end));
        }
    }

    #[test]
    fn test_unconvertible_window_skipped() {
        let stats = collection(vec![
            window(18, Some(Quantity::new(3.0, Unit::Kilogram)), None),
            window(19, Some(Quantity::new(12.0, Unit::Count)), None),
        ]);
        let range = TimeRange::try_new(at(18, 0), at(20, 0)).unwrap();

        let record = window_totals(CumulativeDomain::FlightsClimbed, &stats, &range);
        let RecordPayload::FlightsClimbed(flights) = record.payload else {
            panic!("expected flights payload");
        };
        assert_eq!(flights.total, Some(12.0));
        assert_eq!(flights.samples.len(), 1);
    }

    #[test]
    fn test_empty_collection_yields_zero_total() {
        let range = TimeRange::try_new(at(18, 0), at(20, 0)).unwrap();
        let record = window_totals(CumulativeDomain::Steps, &collection(vec![]), &range);
        assert_eq!(record.source.as_deref(), Some(DEFAULT_WINDOW_SOURCE));
        let RecordPayload::Steps(steps) = record.payload else {
            panic!("expected steps payload");
        };
        assert_eq!(steps.total, Some(0.0));
        assert!(steps.samples.is_empty());
    }

    #[test]
    fn test_heart_rate_aggregates() {
        let samples = vec![
            QuantitySample::new(
                SampleType::HeartRate,
                at(18, 8),
                Quantity::new(60.0, Unit::CountPerMinute),
            )
            .source("Watch")
            .meta(
                metadata_keys::HEART_RATE_MOTION_CONTEXT,
                MetadataValue::Int(1),
            ),
            QuantitySample::new(
                SampleType::HeartRate,
                at(18, 9),
                Quantity::new(90.0, Unit::CountPerMinute),
            ),
            QuantitySample::new(
                SampleType::HeartRate,
                at(18, 10),
                Quantity::new(1.0, Unit::Meter),
            ),
        ];

        let record = heart_rate(&samples).unwrap();
        assert_eq!(record.date, Some(at(18, 8)));
        assert_eq!(record.source.as_deref(), Some("Watch"));
        let RecordPayload::Heart(heart) = record.payload else {
            panic!("expected heart payload");
        };
        assert_eq!(heart.samples.len(), 2);
        assert_eq!(heart.min, Some(60.0));
        assert_eq!(heart.max, Some(90.0));
        assert_eq!(heart.avg, Some(75.0));
        assert_eq!(heart.samples[0].value2, Some(1.0));
        assert_eq!(heart.samples[1].value2, None);
    }

    #[test]
    fn test_empty_point_input_yields_nothing() {
        assert!(heart_rate(&[]).is_none());
        assert!(point_series(PointDomain::Vo2Max, &[]).is_none());
        assert!(point_series(PointDomain::OxygenSaturation, &[]).is_none());
    }

    #[test]
    fn test_point_series() {
        let samples = vec![QuantitySample::new(
            SampleType::Vo2Max,
            at(18, 7),
            Quantity::new(42.5, Unit::MilliliterPerKilogramMinute),
        )];
        let record = point_series(PointDomain::Vo2Max, &samples).unwrap();
        assert_eq!(record.source.as_deref(), Some(POINT_SOURCE));
        let RecordPayload::Vo2Max(vo2) = record.payload else {
            panic!("expected vo2max payload");
        };
        assert_eq!(vo2.total, None);
        assert_eq!(vo2.samples[0].value, Some(42.5));
        assert_eq!(vo2.samples[0].value2, Some(42.5));
    }
}
