use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::location::Position;

/// A time-bounded association between a rider and a vehicle. Open while
/// end_ts is null; closing populates the end markers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ride {
    pub id: String,
    pub vehicle_id: String,
    pub user_email: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: Option<DateTime<Utc>>,
    pub start_longitude: f64,
    pub start_latitude: f64,
    pub end_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_battery: Option<i32>,
}

impl Ride {
    pub fn open(
        vehicle_id: impl Into<String>,
        user_email: impl Into<String>,
        start_ts: DateTime<Utc>,
        start: Position,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vehicle_id: vehicle_id.into(),
            user_email: user_email.into(),
            start_ts,
            end_ts: None,
            start_longitude: start.longitude,
            start_latitude: start.latitude,
            end_longitude: None,
            end_latitude: None,
            end_battery: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_ts.is_none()
    }

    pub fn start_position(&self) -> Position {
        Position {
            longitude: self.start_longitude,
            latitude: self.start_latitude,
        }
    }
}

/// Listing row for "rides by user": ride markers plus the vehicle's current
/// state, newest end first.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RideWithVehicle {
    pub id: String,
    pub vehicle_id: String,
    pub user_email: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: Option<DateTime<Utc>>,
    pub in_use: bool,
    pub vehicle_type: String,
}

/// The open ride for a (vehicle, rider) pair with the vehicle's current
/// state.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRide {
    pub ride: Ride,
    pub vehicle: crate::models::vehicle::Vehicle,
}

/// Summary returned by end-ride: the closed ride plus the trip numbers.
#[derive(Debug, Clone, Serialize)]
pub struct EndRideOutcome {
    pub ride: Ride,
    pub duration_minutes: f64,
    pub distance_km: f64,
    pub avg_velocity_kmh: f64,
    pub battery: i32,
}
