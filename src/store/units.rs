//! Physical units and quantities
//!
//! Every raw measurement read from the store carries a [`Quantity`]: a value
//! tagged with the [`Unit`] it was recorded in. Units belong to a
//! [`Dimension`]; two units are compatible when they share one, and a
//! quantity can be re-expressed in any compatible unit.

use serde::{Deserialize, Serialize};

/// Physical dimension a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Dimensionless ratio (oxygen saturation, humidity)
    Fraction,
    Time,
    Energy,
    /// Plain counts (steps, flights, strokes)
    Scalar,
    Length,
    Mass,
    InternationalUnit,
    /// Events per unit of time (heart rate, sampling frequency)
    Frequency,
    HearingLevel,
    Velocity,
    /// Energy per hour per body mass (METs)
    MetabolicRate,
    /// Oxygen volume per body mass per minute (VO2max)
    OxygenUptake,
    Temperature,
    BloodGlucose,
    Voltage,
}

/// A unit of measurement
///
/// Serialized as its conventional symbol, e.g. `"kcal"` or `"count/min"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "ms")]
    Millisecond,
    #[serde(rename = "min")]
    Minute,
    #[serde(rename = "hr")]
    Hour,
    #[serde(rename = "kcal")]
    Kilocalorie,
    #[serde(rename = "cal")]
    SmallCalorie,
    #[serde(rename = "kJ")]
    Kilojoule,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "km")]
    Kilometer,
    #[serde(rename = "ft")]
    Foot,
    #[serde(rename = "yd")]
    Yard,
    #[serde(rename = "mi")]
    Mile,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "IU")]
    InternationalUnit,
    #[serde(rename = "Hz")]
    Hertz,
    #[serde(rename = "count/min")]
    CountPerMinute,
    #[serde(rename = "dBHL")]
    DecibelHearingLevel,
    #[serde(rename = "m/s")]
    MeterPerSecond,
    #[serde(rename = "km/hr")]
    KilometerPerHour,
    #[serde(rename = "kcal/hr·kg")]
    KilocaloriePerHourKilogram,
    #[serde(rename = "ml/kg·min")]
    MilliliterPerKilogramMinute,
    #[serde(rename = "degC")]
    DegreeCelsius,
    #[serde(rename = "degF")]
    DegreeFahrenheit,
    #[serde(rename = "mg/dL")]
    MilligramPerDeciliter,
    #[serde(rename = "mmol/L")]
    MillimolePerLiter,
    #[serde(rename = "V")]
    Volt,
    #[serde(rename = "mV")]
    Millivolt,
    #[serde(rename = "µV")]
    Microvolt,
}

/// Glucose molar mass factor between mmol/L and mg/dL
const GLUCOSE_MG_DL_PER_MMOL_L: f64 = 18.0156;

impl Unit {
    /// Conventional symbol, identical to the serialized form
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Second => "s",
            Self::Millisecond => "ms",
            Self::Minute => "min",
            Self::Hour => "hr",
            Self::Kilocalorie => "kcal",
            Self::SmallCalorie => "cal",
            Self::Kilojoule => "kJ",
            Self::Count => "count",
            Self::Meter => "m",
            Self::Centimeter => "cm",
            Self::Kilometer => "km",
            Self::Foot => "ft",
            Self::Yard => "yd",
            Self::Mile => "mi",
            Self::Kilogram => "kg",
            Self::Gram => "g",
            Self::Pound => "lb",
            Self::InternationalUnit => "IU",
            Self::Hertz => "Hz",
            Self::CountPerMinute => "count/min",
            Self::DecibelHearingLevel => "dBHL",
            Self::MeterPerSecond => "m/s",
            Self::KilometerPerHour => "km/hr",
            Self::KilocaloriePerHourKilogram => "kcal/hr·kg",
            Self::MilliliterPerKilogramMinute => "ml/kg·min",
            Self::DegreeCelsius => "degC",
            Self::DegreeFahrenheit => "degF",
            Self::MilligramPerDeciliter => "mg/dL",
            Self::MillimolePerLiter => "mmol/L",
            Self::Volt => "V",
            Self::Millivolt => "mV",
            Self::Microvolt => "µV",
        }
    }

    /// Dimension this unit measures
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::Percent => Dimension::Fraction,
            Self::Second | Self::Millisecond | Self::Minute | Self::Hour => Dimension::Time,
            Self::Kilocalorie | Self::SmallCalorie | Self::Kilojoule => Dimension::Energy,
            Self::Count => Dimension::Scalar,
            Self::Meter
            | Self::Centimeter
            | Self::Kilometer
            | Self::Foot
            | Self::Yard
            | Self::Mile => Dimension::Length,
            Self::Kilogram | Self::Gram | Self::Pound => Dimension::Mass,
            Self::InternationalUnit => Dimension::InternationalUnit,
            Self::Hertz | Self::CountPerMinute => Dimension::Frequency,
            Self::DecibelHearingLevel => Dimension::HearingLevel,
            Self::MeterPerSecond | Self::KilometerPerHour => Dimension::Velocity,
            Self::KilocaloriePerHourKilogram => Dimension::MetabolicRate,
            Self::MilliliterPerKilogramMinute => Dimension::OxygenUptake,
            Self::DegreeCelsius | Self::DegreeFahrenheit => Dimension::Temperature,
            Self::MilligramPerDeciliter | Self::MillimolePerLiter => Dimension::BloodGlucose,
            Self::Volt | Self::Millivolt | Self::Microvolt => Dimension::Voltage,
        }
    }

    /// Linear mapping onto the dimension's base unit: `base = value * factor + offset`
    fn scale(&self) -> (f64, f64) {
        match self {
            Self::Percent => (1.0, 0.0),
            Self::Second => (1.0, 0.0),
            Self::Millisecond => (0.001, 0.0),
            Self::Minute => (60.0, 0.0),
            Self::Hour => (3600.0, 0.0),
            Self::Kilocalorie => (1.0, 0.0),
            Self::SmallCalorie => (0.001, 0.0),
            Self::Kilojoule => (1.0 / 4.184, 0.0),
            Self::Count => (1.0, 0.0),
            Self::Meter => (1.0, 0.0),
            Self::Centimeter => (0.01, 0.0),
            Self::Kilometer => (1000.0, 0.0),
            Self::Foot => (0.3048, 0.0),
            Self::Yard => (0.9144, 0.0),
            Self::Mile => (1609.344, 0.0),
            Self::Kilogram => (1.0, 0.0),
            Self::Gram => (0.001, 0.0),
            Self::Pound => (0.453_592_37, 0.0),
            Self::InternationalUnit => (1.0, 0.0),
            Self::Hertz => (1.0, 0.0),
            Self::CountPerMinute => (1.0 / 60.0, 0.0),
            Self::DecibelHearingLevel => (1.0, 0.0),
            Self::MeterPerSecond => (1.0, 0.0),
            Self::KilometerPerHour => (1000.0 / 3600.0, 0.0),
            Self::KilocaloriePerHourKilogram => (1.0, 0.0),
            Self::MilliliterPerKilogramMinute => (1.0, 0.0),
            Self::DegreeCelsius => (1.0, 0.0),
            Self::DegreeFahrenheit => (5.0 / 9.0, -32.0 * 5.0 / 9.0),
            Self::MilligramPerDeciliter => (1.0, 0.0),
            Self::MillimolePerLiter => (GLUCOSE_MG_DL_PER_MMOL_L, 0.0),
            Self::Volt => (1.0, 0.0),
            Self::Millivolt => (0.001, 0.0),
            Self::Microvolt => (0.000_001, 0.0),
        }
    }

    /// Parse a unit from its symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|u| u.symbol() == s)
    }

    /// Every known unit
    pub fn all() -> &'static [Unit] {
        &[
            Self::Percent,
            Self::Second,
            Self::Millisecond,
            Self::Minute,
            Self::Hour,
            Self::Kilocalorie,
            Self::SmallCalorie,
            Self::Kilojoule,
            Self::Count,
            Self::Meter,
            Self::Centimeter,
            Self::Kilometer,
            Self::Foot,
            Self::Yard,
            Self::Mile,
            Self::Kilogram,
            Self::Gram,
            Self::Pound,
            Self::InternationalUnit,
            Self::Hertz,
            Self::CountPerMinute,
            Self::DecibelHearingLevel,
            Self::MeterPerSecond,
            Self::KilometerPerHour,
            Self::KilocaloriePerHourKilogram,
            Self::MilliliterPerKilogramMinute,
            Self::DegreeCelsius,
            Self::DegreeFahrenheit,
            Self::MilligramPerDeciliter,
            Self::MillimolePerLiter,
            Self::Volt,
            Self::Millivolt,
            Self::Microvolt,
        ]
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A measured value in a specific unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Check whether this quantity can be expressed in `unit`
    pub fn is_compatible_with(&self, unit: Unit) -> bool {
        self.unit.dimension() == unit.dimension()
    }

    /// Express this quantity in `unit`, if the dimensions agree
    pub fn value_in(&self, unit: Unit) -> Option<f64> {
        if !self.is_compatible_with(unit) {
            return None;
        }
        if self.unit == unit {
            return Some(self.value);
        }

        let (from_factor, from_offset) = self.unit.scale();
        let (to_factor, to_offset) = unit.scale();
        let base = self.value * from_factor + from_offset;
        Some((base - to_offset) / to_factor)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
