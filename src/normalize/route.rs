//! Route transform

use crate::schema::{Coordinate, NormalizedRecord, RecordPayload, RouteRecord};
use crate::store::Location;

pub const ROUTE_SOURCE: &str = "HealthKit";

/// Map an ordered location trace to coordinates, dated at its first fix
///
/// Order is preserved; nothing is resampled or dropped. An empty trace has
/// no date.
pub fn route(locations: &[Location]) -> NormalizedRecord {
    let coordinates = locations
        .iter()
        .map(|l| Coordinate {
            time: l.timestamp,
            altitude: l.altitude,
            latitude: l.latitude,
            longitude: l.longitude,
        })
        .collect();

    NormalizedRecord::new(
        locations.first().map(|l| l.timestamp),
        Some(ROUTE_SOURCE.to_string()),
        RecordPayload::WorkoutRoute(RouteRecord { coordinates }),
    )
}
