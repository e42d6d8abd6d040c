//! Blood glucose and electrocardiograms

use crate::schema::{EcgRecord, GlucosePoint, GlucoseRecord, NormalizedRecord, RecordPayload};
use crate::store::{Electrocardiogram, QuantitySample, Unit};
use chrono::FixedOffset;

/// Lead every recording is taken on
pub const ECG_LEAD: &str = "Apple Watch (similar to lead I)";

/// Aggregate glucose samples in mg/dL; None when nothing converts
pub fn glucose(samples: &[QuantitySample]) -> Option<NormalizedRecord> {
    let unit = Unit::MilligramPerDeciliter;
    let intraday: Vec<GlucosePoint> = samples
        .iter()
        .filter_map(|s| {
            Some(GlucosePoint {
                time: s.start,
                value: Some(s.quantity.value_in(unit)?),
            })
        })
        .collect();

    let values: Vec<f64> = intraday.iter().filter_map(|p| p.value).collect();
    let first = intraday.first()?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;

    Some(NormalizedRecord::new(
        Some(first.time),
        samples
            .first()
            .and_then(|s| s.source.as_ref())
            .map(|s| s.name.clone()),
        RecordPayload::Glucose(GlucoseRecord {
            avg_value: Some(avg),
            min_value: Some(min),
            max_value: Some(max),
            unit: Some(unit.symbol().to_string()),
            intraday_data: intraday,
        }),
    ))
}

/// One record per recording; voltages are passed through unconverted
pub fn electrocardiograms(
    recordings: &[Electrocardiogram],
    offset: FixedOffset,
) -> Vec<NormalizedRecord> {
    recordings
        .iter()
        .map(|ecg| {
            NormalizedRecord::new(
                Some(ecg.start),
                ecg.source.as_ref().map(|s| s.name.clone()),
                RecordPayload::Electrocardiogram(EcgRecord {
                    frequency: ecg.sampling_frequency.and_then(|q| q.value_in(Unit::Hertz)),
                    avg_hr: ecg
                        .average_heart_rate
                        .and_then(|q| q.value_in(Unit::CountPerMinute))
                        .map(|bpm| bpm.round() as i64),
                    classification: ecg.classification.label().to_string(),
                    lead: Some(ECG_LEAD.to_string()),
                    time_start: ecg.start,
                    time_end: ecg.end,
                    timezone_offset: Some(offset.local_minus_utc() / 60),
                    unit: ecg.voltages.first().map(|v| v.unit.symbol().to_string()),
                    samples: ecg.voltages.iter().map(|v| v.value).collect(),
                }),
            )
        })
        .collect()
}
