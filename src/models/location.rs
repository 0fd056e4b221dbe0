use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A WGS84 decimal-degree coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
}

/// One observed vehicle position. Entries are written by registration,
/// start-ride and end-ride, and are immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationHistory {
    pub id: String,
    pub vehicle_id: String,
    pub ts: DateTime<Utc>,
    pub longitude: f64,
    pub latitude: f64,
}

impl LocationHistory {
    pub fn new(vehicle_id: impl Into<String>, ts: DateTime<Utc>, position: Position) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vehicle_id: vehicle_id.into(),
            ts,
            longitude: position.longitude,
            latitude: position.latitude,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}
