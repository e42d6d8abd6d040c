//! Statistics bucket sizes
//!
//! Intervals are written as `<n><unit>` with unit one of `m` (minutes),
//! `h` (hours), `d` (days) or `w` (weeks), e.g. `15m`, `1h`, `1d`.

use crate::store::types::TimeRange;
use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Size of one statistics window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticsInterval {
    Minutes(u32),
    Hours(u32),
    Days(u32),
    Weeks(u32),
}

impl Default for StatisticsInterval {
    fn default() -> Self {
        StatisticsInterval::Days(1)
    }
}

impl StatisticsInterval {
    /// Fixed length of the interval
    pub fn duration(&self) -> Duration {
        match *self {
            Self::Minutes(n) => Duration::minutes(n as i64),
            Self::Hours(n) => Duration::hours(n as i64),
            Self::Days(n) => Duration::days(n as i64),
            Self::Weeks(n) => Duration::weeks(n as i64),
        }
    }

    /// Start of the window containing `instant`, for windows derived from `anchor`
    pub fn window_start<Tz: TimeZone>(&self, anchor: &DateTime<Tz>, instant: &DateTime<Tz>) -> DateTime<Tz> {
        let step = self.duration().num_seconds().max(1);
        let offset = (instant.clone() - anchor.clone()).num_seconds();
        let buckets = offset.div_euclid(step);
        anchor.clone() + Duration::seconds(buckets * step)
    }

    /// Windows derived from `anchor` that cover `range`, clipped to it
    ///
    /// The windows are contiguous, non-overlapping and fully contained in
    /// `range`; only the first and last can be shorter than the interval.
    pub fn windows(&self, anchor: DateTime<Utc>, range: &TimeRange) -> Vec<TimeRange> {
        let step = self.duration();
        let mut windows = Vec::new();
        let mut start = self.window_start(&anchor, &range.start);
        while start < range.end {
            let end = start + step;
            if let Some(window) = TimeRange::try_new(start, end).and_then(|w| w.intersection(range)) {
                windows.push(window);
            }
            start = end;
        }
        windows
    }
}

/// Error returned when an interval string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid statistics interval '{0}': expected <n><m|h|d|w>, e.g. 1d")]
pub struct ParseIntervalError(pub String);

impl FromStr for StatisticsInterval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let re = Regex::new(r"^(\d+)([mhdw])$").map_err(|_| ParseIntervalError(s.to_string()))?;
        let caps = re
            .captures(trimmed)
            .ok_or_else(|| ParseIntervalError(s.to_string()))?;
        let n: u32 = caps[1]
            .parse()
            .map_err(|_| ParseIntervalError(s.to_string()))?;
        if n == 0 {
            return Err(ParseIntervalError(s.to_string()));
        }
        match &caps[2] {
            "m" => Ok(Self::Minutes(n)),
            "h" => Ok(Self::Hours(n)),
            "d" => Ok(Self::Days(n)),
            "w" => Ok(Self::Weeks(n)),
            _ => Err(ParseIntervalError(s.to_string())),
        }
    }
}

impl fmt::Display for StatisticsInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(n) => write!(f, "{}m", n),
            Self::Hours(n) => write!(f, "{}h", n),
            Self::Days(n) => write!(f, "{}d", n),
            Self::Weeks(n) => write!(f, "{}w", n),
        }
    }
}

impl Serialize for StatisticsInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatisticsInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intervals() {
        assert_eq!("15m".parse(), Ok(StatisticsInterval::Minutes(15)));
        assert_eq!("1h".parse(), Ok(StatisticsInterval::Hours(1)));
        assert_eq!(" 1d ".parse(), Ok(StatisticsInterval::Days(1)));
        assert_eq!("2w".parse(), Ok(StatisticsInterval::Weeks(2)));

        assert!("0d".parse::<StatisticsInterval>().is_err());
        assert!("1y".parse::<StatisticsInterval>().is_err());
        assert!("d".parse::<StatisticsInterval>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for raw in ["30m", "6h", "1d", "1w"] {
            let interval: StatisticsInterval = raw.parse().unwrap();
            assert_eq!(interval.to_string(), raw);
        }
    }

    #[test]
    fn test_window_start_relative_to_anchor() {
        let anchor = Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap();
        let interval = StatisticsInterval::Days(1);

        let inside = Utc.with_ymd_and_hms(2024, 4, 20, 15, 37, 0).unwrap();
        assert_eq!(
            interval.window_start(&anchor, &inside),
            Utc.with_ymd_and_hms(2024, 4, 20, 0, 0, 0).unwrap()
        );

        // Instants before the anchor land in earlier windows
        let before = Utc.with_ymd_and_hms(2024, 4, 14, 23, 0, 0).unwrap();
        assert_eq!(
            interval.window_start(&anchor, &before),
            Utc.with_ymd_and_hms(2024, 4, 14, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_windows_contiguous_and_contained() {
        let anchor = Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap();
        let range = TimeRange::try_new(
            Utc.with_ymd_and_hms(2024, 4, 16, 6, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 19, 18, 0, 0).unwrap(),
        )
        .unwrap();

        let windows = StatisticsInterval::Days(1).windows(anchor, &range);
        assert_eq!(windows.len(), 4);
        assert_eq!(windows.first().map(|w| w.start), Some(range.start));
        assert_eq!(windows.last().map(|w| w.end), Some(range.end));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(windows.iter().all(|w| range.encloses(w.start, w.end)));
    }
}
