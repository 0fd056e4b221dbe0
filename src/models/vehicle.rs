use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::LocationHistory;

/// A rentable unit tracked by the system. The id is assigned at registration
/// and never changes; everything else mutates through the checked setters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: String,
    pub battery: i32,
    pub in_use: bool,
    pub vehicle_type: String,
}

impl Vehicle {
    pub fn new(battery: i32, vehicle_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            battery,
            in_use: false,
            vehicle_type: vehicle_type.into(),
        }
    }

    pub fn set_battery(&mut self, battery: i32) -> Result<(), AppError> {
        if !(0..=100).contains(&battery) {
            return Err(AppError::invalid_argument(
                "battery",
                "battery (percent) must be between 0 and 100",
            ));
        }
        self.battery = battery;
        Ok(())
    }

    pub fn set_vehicle_type(&mut self, tag: &str, recognized: &[String]) -> Result<(), AppError> {
        let tag = tag.trim();
        if tag.is_empty() || !recognized.iter().any(|t| t == tag) {
            return Err(AppError::invalid_argument(
                "vehicle_type",
                format!("vehicle type must be one of: {}", recognized.join(", ")),
            ));
        }
        self.vehicle_type = tag.to_string();
        Ok(())
    }

    /// Available -> InUse. Any other starting state is a conflict.
    pub fn begin_ride(&mut self) -> Result<(), AppError> {
        if self.in_use {
            return Err(AppError::Conflict(format!(
                "vehicle {} is already in use",
                self.id
            )));
        }
        self.in_use = true;
        Ok(())
    }

    /// InUse -> Available. Any other starting state is a conflict.
    pub fn finish_ride(&mut self) -> Result<(), AppError> {
        if !self.in_use {
            return Err(AppError::Conflict(format!(
                "vehicle {} is not in use",
                self.id
            )));
        }
        self.in_use = false;
        Ok(())
    }
}

/// Row shape for the vehicle listing: current state joined with the latest
/// location-history entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VehicleWithLocation {
    pub id: String,
    pub battery: i32,
    pub in_use: bool,
    pub vehicle_type: String,
    pub last_checkin: chrono::DateTime<chrono::Utc>,
    pub last_longitude: f64,
    pub last_latitude: f64,
}

/// Aggregate view for one vehicle: a plain value, children carry the parent
/// id rather than back-pointers.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleWithHistory {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub location_history: Vec<LocationHistory>,
}
