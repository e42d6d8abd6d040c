//! Query requests
//!
//! Builders describing one fetch against the store. A request names the
//! sample type, the range, and optionally a workout the query is scoped to
//! and an extra predicate that narrows the result.

use crate::store::{
    CharacteristicKind, Predicate, SampleType, SortOrder, StatisticsInterval, StatisticsOptions,
    TimeRange,
};
use chrono::{DateTime, Utc};

/// Request for raw samples of one type
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub sample_type: SampleType,
    pub range: TimeRange,
    /// Workout the query is scoped to, as the caller supplied it
    pub workout_id: Option<String>,
    pub subpredicate: Option<Predicate>,
    pub sort: SortOrder,
    pub limit: Option<usize>,
}

impl SampleRequest {
    pub fn new(sample_type: SampleType, range: TimeRange) -> Self {
        Self {
            sample_type,
            range,
            workout_id: None,
            subpredicate: None,
            sort: SortOrder::default(),
            limit: None,
        }
    }

    /// Scope the query to a workout
    pub fn workout(mut self, id: impl Into<String>) -> Self {
        self.workout_id = Some(id.into());
        self
    }

    /// Narrow the result with an extra predicate
    pub fn subpredicate(mut self, predicate: Option<Predicate>) -> Self {
        self.subpredicate = predicate;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Request for anchor-aligned statistics windows
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRequest {
    pub sample_type: SampleType,
    pub range: TimeRange,
    pub options: StatisticsOptions,
    /// Raw anchor; Monday 00:00 of the current week when absent
    pub anchor: Option<DateTime<Utc>>,
    pub interval: StatisticsInterval,
    pub workout_id: Option<String>,
    pub subpredicate: Option<Predicate>,
}

impl StatisticsRequest {
    pub fn new(sample_type: SampleType, range: TimeRange, options: StatisticsOptions) -> Self {
        Self {
            sample_type,
            range,
            options,
            anchor: None,
            interval: StatisticsInterval::default(),
            workout_id: None,
            subpredicate: None,
        }
    }

    pub fn anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn interval(mut self, interval: StatisticsInterval) -> Self {
        self.interval = interval;
        self
    }

    /// Scope the query to a workout; the anchor then becomes the workout end
    pub fn workout(mut self, id: impl Into<String>) -> Self {
        self.workout_id = Some(id.into());
        self
    }

    pub fn subpredicate(mut self, predicate: Option<Predicate>) -> Self {
        self.subpredicate = predicate;
        self
    }
}

/// Caller-facing filter options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Drop samples and workouts entered by hand
    pub exclude_manual: bool,
    /// Keep only objects recorded by these sources
    pub sources: Vec<String>,
    /// Characteristics to read
    pub characteristics: Vec<CharacteristicKind>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_manual(mut self) -> Self {
        self.exclude_manual = true;
        self
    }

    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.sources.push(name.into());
        self
    }

    pub fn characteristic(mut self, kind: CharacteristicKind) -> Self {
        self.characteristics.push(kind);
        self
    }

    /// Predicate narrowing sample queries, if any option applies
    pub fn subpredicate(&self) -> Option<Predicate> {
        let mut parts = Vec::new();
        if self.exclude_manual {
            parts.push(Predicate::ExcludeUserEntered);
        }
        if !self.sources.is_empty() {
            parts.push(Predicate::Sources(self.sources.clone()));
        }
        Predicate::all(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_subpredicate() {
        assert_eq!(QueryFilter::new().subpredicate(), None);

        let filter = QueryFilter::new().exclude_manual();
        assert_eq!(filter.subpredicate(), Some(Predicate::ExcludeUserEntered));

        let filter = QueryFilter::new().exclude_manual().source("Watch");
        assert_eq!(
            filter.subpredicate(),
            Some(Predicate::And(vec![
                Predicate::ExcludeUserEntered,
                Predicate::Sources(vec!["Watch".into()]),
            ]))
        );
    }

    #[test]
    fn test_characteristics_do_not_narrow_samples() {
        let filter = QueryFilter::new().characteristic(CharacteristicKind::BloodType);
        assert_eq!(filter.subpredicate(), None);
    }

    #[test]
    fn test_statistics_request_defaults() {
        let range = TimeRange::last_days(7);
        let request =
            StatisticsRequest::new(SampleType::StepCount, range, StatisticsOptions::cumulative_sum());
        assert_eq!(request.interval, StatisticsInterval::Days(1));
        assert!(request.anchor.is_none());
        assert!(request.workout_id.is_none());
    }
}
