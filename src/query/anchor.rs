//! Anchor alignment
//!
//! Statistics windows are derived from an anchor instant. The caller's
//! anchor is first moved backward to the nearest boundary in the caller's
//! calendar (top of hour by default), so repeated calls with jittered
//! anchors produce identical window boundaries.
//!
//! ```text
//! 2024-04-20T15:37:00 ──align(Hour)──▶ 2024-04-20T15:00:00
//! ```

use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc};

/// Boundary an anchor is aligned to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnchorBoundary {
    /// minute = 0, second = 0
    #[default]
    Hour,
    /// hour = 0, minute = 0, second = 0
    Day,
}

/// Move `anchor` backward to the nearest boundary in the `offset` calendar
///
/// An anchor already on a boundary is returned unchanged.
pub fn align_anchor(
    anchor: DateTime<Utc>,
    offset: FixedOffset,
    boundary: AnchorBoundary,
) -> DateTime<Utc> {
    let local = anchor.with_timezone(&offset);
    let truncated = match boundary {
        AnchorBoundary::Hour => local
            .with_minute(0)
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0)),
        AnchorBoundary::Day => local
            .with_hour(0)
            .and_then(|d| d.with_minute(0))
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0)),
    };
    truncated.map(|d| d.with_timezone(&Utc)).unwrap_or(anchor)
}

/// Monday 00:00 of the ISO week containing `now`, in the `offset` calendar
pub fn start_of_week(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let days_since_monday = local.weekday().num_days_from_monday() as i64;
    let monday = local - Duration::days(days_since_monday);
    align_anchor(monday.with_timezone(&Utc), offset, AnchorBoundary::Day)
}

/// Parse a `+HH:MM` / `-HH:MM` / `Z` offset string
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_align_to_top_of_hour() {
        let anchor = Utc.with_ymd_and_hms(2024, 4, 20, 15, 37, 0).unwrap();
        assert_eq!(
            align_anchor(anchor, utc(), AnchorBoundary::Hour),
            Utc.with_ymd_and_hms(2024, 4, 20, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_jittered_anchors_align_identically() {
        let base = Utc.with_ymd_and_hms(2024, 4, 20, 15, 0, 0).unwrap();
        let aligned: Vec<_> = [0, 1, 59 * 60 + 59]
            .iter()
            .map(|s| align_anchor(base + Duration::seconds(*s), utc(), AnchorBoundary::Hour))
            .collect();
        assert!(aligned.iter().all(|a| *a == base));
    }

    #[test]
    fn test_align_uses_caller_calendar() {
        // 10:20 UTC is 15:50 in +05:30; the local top of hour is 15:00 local
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let anchor = Utc.with_ymd_and_hms(2024, 4, 20, 10, 20, 0).unwrap();
        assert_eq!(
            align_anchor(anchor, offset, AnchorBoundary::Hour),
            Utc.with_ymd_and_hms(2024, 4, 20, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_start_of_week() {
        // Saturday
        let now = Utc.with_ymd_and_hms(2024, 4, 20, 15, 37, 0).unwrap();
        assert_eq!(
            start_of_week(now, utc()),
            Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+00:00"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("+05:30"), FixedOffset::east_opt(19800));
        assert_eq!(parse_offset("-03:00"), FixedOffset::west_opt(10800));
        assert_eq!(parse_offset("05:30"), None);
        assert_eq!(parse_offset("+25:00"), None);
    }
}
