//! Compound query predicates
//!
//! A predicate is built by the orchestrator and evaluated by the store.
//! In-process stores evaluate it with [`Predicate::matches`].

use crate::store::types::{
    metadata_keys, CategorySample, Electrocardiogram, Metadata, MetadataExt, QuantitySample,
    TimeRange, Workout,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Anything a predicate can be evaluated against
pub trait Matchable {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;
    fn source_name(&self) -> Option<&str>;
    fn metadata(&self) -> Option<&Metadata>;
}

impl Matchable for QuantitySample {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }
    fn end(&self) -> DateTime<Utc> {
        self.end
    }
    fn source_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.name.as_str())
    }
    fn metadata(&self) -> Option<&Metadata> {
        Some(&self.metadata)
    }
}

impl Matchable for CategorySample {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }
    fn end(&self) -> DateTime<Utc> {
        self.end
    }
    fn source_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.name.as_str())
    }
    fn metadata(&self) -> Option<&Metadata> {
        Some(&self.metadata)
    }
}

impl Matchable for Workout {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }
    fn end(&self) -> DateTime<Utc> {
        self.end
    }
    fn source_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.name.as_str())
    }
    fn metadata(&self) -> Option<&Metadata> {
        Some(&self.metadata)
    }
}

impl Matchable for Electrocardiogram {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }
    fn end(&self) -> DateTime<Utc> {
        self.end
    }
    fn source_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.name.as_str())
    }
    fn metadata(&self) -> Option<&Metadata> {
        None
    }
}

/// Filter applied by the store to every candidate object
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Object lies fully inside the range (strict start and strict end)
    TimeRange(TimeRange),
    /// Object belongs to the given workout
    Workout { id: Uuid, bounds: TimeRange },
    /// Object was recorded by one of the named sources
    Sources(Vec<String>),
    /// Object was not entered manually
    ExcludeUserEntered,
    /// Every sub-predicate matches
    And(Vec<Predicate>),
}

impl Predicate {
    /// Predicate over a range with strict start and end dates
    pub fn time_range(range: TimeRange) -> Self {
        Predicate::TimeRange(range)
    }

    /// Predicate selecting the objects recorded during a workout
    ///
    /// Returns None for a workout with empty bounds.
    pub fn for_workout(workout: &Workout) -> Option<Self> {
        Some(Predicate::Workout {
            id: workout.id,
            bounds: workout.range()?,
        })
    }

    /// Combine with another predicate, flattening nested conjunctions
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Predicate::And(parts)
    }

    /// Conjunction of an optional list of predicates
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
        predicates.into_iter().reduce(Predicate::and)
    }

    /// Check if an object matches this predicate
    pub fn matches<T: Matchable + ?Sized>(&self, item: &T) -> bool {
        match self {
            Predicate::TimeRange(range) | Predicate::Workout { bounds: range, .. } => {
                range.encloses(item.start(), item.end())
            }
            Predicate::Sources(names) => item
                .source_name()
                .map(|name| names.iter().any(|n| n == name))
                .unwrap_or(false),
            Predicate::ExcludeUserEntered => !item
                .metadata()
                .and_then(|m| m.bool_value(metadata_keys::WAS_USER_ENTERED))
                .unwrap_or(false),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(item)),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::TimeRange(range) => write!(f, "time in {}", range),
            Predicate::Workout { id, .. } => write!(f, "workout = {}", id),
            Predicate::Sources(names) => write!(f, "source in [{}]", names.join(", ")),
            Predicate::ExcludeUserEntered => write!(f, "not user entered"),
            Predicate::And(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", rendered.join(" AND "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{MetadataValue, SampleType};
    use crate::store::units::{Quantity, Unit};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, h, m, 0).unwrap()
    }

    fn heart(h: u32, m: u32) -> QuantitySample {
        QuantitySample::new(
            SampleType::HeartRate,
            at(h, m),
            Quantity::new(72.0, Unit::CountPerMinute),
        )
    }

    #[test]
    fn test_strict_time_range() {
        let range = TimeRange::try_new(at(10, 0), at(11, 0)).unwrap();
        let predicate = Predicate::time_range(range);

        assert!(predicate.matches(&heart(10, 0)));
        assert!(predicate.matches(&heart(10, 30)));
        assert!(!predicate.matches(&heart(9, 59)));
        // Straddles the end boundary
        assert!(!predicate.matches(&heart(10, 50).ending(at(11, 10))));
    }

    #[test]
    fn test_sources_and_manual_filter() {
        let watch = heart(10, 0).source("Watch");
        let manual = heart(10, 0)
            .source("Phone")
            .meta(metadata_keys::WAS_USER_ENTERED, MetadataValue::Bool(true));

        let by_source = Predicate::Sources(vec!["Watch".into()]);
        assert!(by_source.matches(&watch));
        assert!(!by_source.matches(&manual));

        assert!(Predicate::ExcludeUserEntered.matches(&watch));
        assert!(!Predicate::ExcludeUserEntered.matches(&manual));
    }

    #[test]
    fn test_and_flattens() {
        let range = TimeRange::try_new(at(10, 0), at(11, 0)).unwrap();
        let combined = Predicate::time_range(range)
            .and(Predicate::ExcludeUserEntered)
            .and(Predicate::Sources(vec!["Watch".into()]));

        match &combined {
            Predicate::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunction, got {:?}", other),
        }
        assert!(combined.matches(&heart(10, 15).source("Watch")));
        assert!(!combined.matches(&heart(11, 15).source("Watch")));
    }
}
