//! Result envelopes
//!
//! Every fetch returns exactly one envelope whose variant is decided at the
//! fetch boundary. Downstream code switches on the variant and never
//! re-inspects the raw shape of the items.

use crate::store::profile::{ActivitySummary, CharacteristicKind, Characteristics};
use crate::store::types::{
    CategorySample, Electrocardiogram, Location, QuantitySample, StatisticsCollection, Workout,
};
use serde::{Deserialize, Serialize};

/// Typed wrapper around one raw store result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "camelCase")]
pub enum ResultEnvelope {
    QuantitySamples(Vec<QuantitySample>),
    CategorySamples(Vec<CategorySample>),
    Statistics(StatisticsCollection),
    Workouts(Vec<Workout>),
    Locations(Vec<Location>),
    Characteristics {
        values: Characteristics,
        kinds: Vec<CharacteristicKind>,
    },
    ActivitySummaries(Vec<ActivitySummary>),
    Electrocardiograms(Vec<Electrocardiogram>),
}

impl ResultEnvelope {
    /// Short name of the variant, used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QuantitySamples(_) => "quantitySamples",
            Self::CategorySamples(_) => "categorySamples",
            Self::Statistics(_) => "statistics",
            Self::Workouts(_) => "workouts",
            Self::Locations(_) => "locations",
            Self::Characteristics { .. } => "characteristics",
            Self::ActivitySummaries(_) => "activitySummaries",
            Self::Electrocardiograms(_) => "electrocardiograms",
        }
    }

    /// Number of raw items carried
    pub fn len(&self) -> usize {
        match self {
            Self::QuantitySamples(items) => items.len(),
            Self::CategorySamples(items) => items.len(),
            Self::Statistics(collection) => collection.windows.len(),
            Self::Workouts(items) => items.len(),
            Self::Locations(items) => items.len(),
            Self::Characteristics { kinds, .. } => kinds.len(),
            Self::ActivitySummaries(items) => items.len(),
            Self::Electrocardiograms(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
