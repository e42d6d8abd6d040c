//! Canonical-unit resolution
//!
//! A quantity of unknown kind is expressed in the first compatible unit of a
//! fixed priority list. Quantities no candidate accepts are dropped; callers
//! see `None`, never an error.
//!
//! ```text
//! %  ->  s  ->  kcal  ->  count  ->  m  ->  IU  ->  Hz  ->  dBHL  ->  m/s  ->  kcal/hr·kg
//! ```

use crate::store::{Quantity, Unit};

/// Candidate units in priority order
pub const CANONICAL_UNITS: [Unit; 10] = [
    Unit::Percent,
    Unit::Second,
    Unit::Kilocalorie,
    Unit::Count,
    Unit::Meter,
    Unit::InternationalUnit,
    Unit::Hertz,
    Unit::DecibelHearingLevel,
    Unit::MeterPerSecond,
    Unit::KilocaloriePerHourKilogram,
];

/// A quantity re-expressed in its canonical unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canonical {
    pub value: f64,
    pub unit: Unit,
}

/// First canonical unit `quantity` can be expressed in
pub fn canonical_unit(quantity: &Quantity) -> Option<Unit> {
    CANONICAL_UNITS
        .iter()
        .copied()
        .find(|unit| quantity.is_compatible_with(*unit))
}

/// Convert `quantity` to its canonical unit, or drop it
pub fn resolve(quantity: &Quantity) -> Option<Canonical> {
    let unit = canonical_unit(quantity)?;
    let value = quantity.value_in(unit)?;
    if !value.is_finite() {
        return None;
    }
    Some(Canonical { value, unit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_compatible_unit_wins() {
        let km = Quantity::new(5.0, Unit::Kilometer);
        assert_eq!(
            resolve(&km),
            Some(Canonical {
                value: 5000.0,
                unit: Unit::Meter
            })
        );

        let kj = Quantity::new(4.184, Unit::Kilojoule);
        let energy = resolve(&kj).unwrap();
        assert_eq!(energy.unit, Unit::Kilocalorie);
        assert!((energy.value - 1.0).abs() < 1e-9);

        let minutes = Quantity::new(2.0, Unit::Minute);
        assert_eq!(resolve(&minutes).map(|c| c.value), Some(120.0));
    }

    #[test]
    fn test_frequency_resolves_to_hertz() {
        let bpm = Quantity::new(120.0, Unit::CountPerMinute);
        assert_eq!(
            resolve(&bpm),
            Some(Canonical {
                value: 2.0,
                unit: Unit::Hertz
            })
        );
    }

    #[test]
    fn test_unmatched_quantity_is_dropped() {
        assert_eq!(resolve(&Quantity::new(20.0, Unit::DegreeCelsius)), None);
        assert_eq!(resolve(&Quantity::new(80.0, Unit::Kilogram)), None);
        assert_eq!(
            resolve(&Quantity::new(45.0, Unit::MilliliterPerKilogramMinute)),
            None
        );
    }
}
