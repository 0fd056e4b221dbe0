//! Trip arithmetic: great-circle distance between checkins, ride duration
//! and average velocity.

use chrono::{DateTime, Utc};

use crate::models::location::Position;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: Position, b: Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 60_000.0
}

/// Average velocity in km/h; zero-length rides report zero rather than
/// dividing by nothing.
pub fn velocity_kmh(distance_km: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let hours = duration_minutes(start, end) / 60.0;
    if hours <= 0.0 {
        return 0.0;
    }
    distance_km / hours
}
