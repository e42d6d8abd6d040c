//! User characteristics and daily activity summaries
//!
//! Characteristics are slow-changing facts about the user (date of birth,
//! blood type, ...). Activity summaries are the per-day move/exercise/stand
//! rings.

use crate::store::units::Quantity;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Characteristic that can be requested from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CharacteristicKind {
    DateOfBirth,
    AgeYears,
    BiologicalSex,
    BloodType,
    SkinType,
    WheelchairUse,
}

impl CharacteristicKind {
    pub fn all() -> &'static [CharacteristicKind] {
        &[
            Self::DateOfBirth,
            Self::AgeYears,
            Self::BiologicalSex,
            Self::BloodType,
            Self::SkinType,
            Self::WheelchairUse,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DateOfBirth => "dateOfBirth",
            Self::AgeYears => "ageYears",
            Self::BiologicalSex => "biologicalSex",
            Self::BloodType => "bloodType",
            Self::SkinType => "skinType",
            Self::WheelchairUse => "wheelchairUse",
        }
    }
}

impl std::str::FromStr for CharacteristicKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown characteristic: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BiologicalSex {
    NotSet,
    Female,
    Male,
    Other,
}

impl BiologicalSex {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotSet => "notSet",
            Self::Female => "female",
            Self::Male => "male",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BloodType {
    NotSet,
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
}

impl BloodType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotSet => "notSet",
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }
}

/// Fitzpatrick skin type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkinType {
    #[serde(rename = "notSet")]
    NotSet,
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl SkinType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotSet => "notSet",
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
            Self::IV => "IV",
            Self::V => "V",
            Self::VI => "VI",
        }
    }
}

/// Characteristics recorded for the user; absent fields were never set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Characteristics {
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub biological_sex: Option<BiologicalSex>,
    #[serde(default)]
    pub blood_type: Option<BloodType>,
    #[serde(default)]
    pub skin_type: Option<SkinType>,
    #[serde(default)]
    pub wheelchair_use: Option<bool>,
}

impl Characteristics {
    /// String value of one characteristic, evaluated on `today`
    pub fn value_of(&self, kind: CharacteristicKind, today: NaiveDate) -> Option<String> {
        match kind {
            CharacteristicKind::DateOfBirth => self
                .date_of_birth
                .map(|d| d.format("%Y-%m-%d").to_string()),
            // Calendar-year difference, not completed years
            CharacteristicKind::AgeYears => self
                .date_of_birth
                .map(|d| (today.year() - d.year()).to_string()),
            CharacteristicKind::BiologicalSex => self.biological_sex.map(|s| s.label().to_string()),
            CharacteristicKind::BloodType => self.blood_type.map(|b| b.label().to_string()),
            CharacteristicKind::SkinType => self.skin_type.map(|s| s.label().to_string()),
            CharacteristicKind::WheelchairUse => self
                .wheelchair_use
                .map(|w| if w { "yes" } else { "no" }.to_string()),
        }
    }
}

/// How the move ring is measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveMode {
    #[default]
    ActiveEnergy,
    MoveTime,
}

/// Daily activity ring summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub date: NaiveDate,
    #[serde(default)]
    pub move_mode: MoveMode,
    pub active_energy_burned: Quantity,
    pub active_energy_burned_goal: Quantity,
    #[serde(default)]
    pub move_time: Option<Quantity>,
    #[serde(default)]
    pub move_time_goal: Option<Quantity>,
    pub exercise_time: Quantity,
    #[serde(default)]
    pub exercise_time_goal: Option<Quantity>,
    pub stand_hours: Quantity,
    #[serde(default)]
    pub stand_hours_goal: Option<Quantity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Characteristics {
        Characteristics {
            date_of_birth: NaiveDate::from_ymd_opt(1990, 11, 3),
            biological_sex: Some(BiologicalSex::Female),
            blood_type: Some(BloodType::AbNegative),
            skin_type: Some(SkinType::III),
            wheelchair_use: Some(false),
        }
    }

    #[test]
    fn test_characteristic_values() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let p = profile();

        assert_eq!(
            p.value_of(CharacteristicKind::DateOfBirth, today).as_deref(),
            Some("1990-11-03")
        );
        // Birthday not yet reached this year still counts the calendar year
        assert_eq!(
            p.value_of(CharacteristicKind::AgeYears, today).as_deref(),
            Some("34")
        );
        assert_eq!(
            p.value_of(CharacteristicKind::BloodType, today).as_deref(),
            Some("AB-")
        );
        assert_eq!(
            p.value_of(CharacteristicKind::WheelchairUse, today).as_deref(),
            Some("no")
        );
    }

    #[test]
    fn test_unset_characteristics() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let empty = Characteristics::default();
        for kind in CharacteristicKind::all() {
            assert_eq!(empty.value_of(*kind, today), None);
        }
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "bloodType".parse::<CharacteristicKind>(),
            Ok(CharacteristicKind::BloodType)
        );
        assert_eq!(
            "AGEYEARS".parse::<CharacteristicKind>(),
            Ok(CharacteristicKind::AgeYears)
        );
        assert!("height".parse::<CharacteristicKind>().is_err());
    }
}
