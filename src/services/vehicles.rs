//! Vehicle registry: registration, listing, aggregate views and retirement.

use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::location::LocationHistory;
use crate::models::requests::RegisterVehicleCommand;
use crate::models::vehicle::{Vehicle, VehicleWithHistory, VehicleWithLocation};

#[derive(Clone)]
pub struct VehicleService {
    db: DbPool,
    recognized_types: Vec<String>,
}

impl VehicleService {
    pub fn new(db: DbPool, recognized_types: Vec<String>) -> Self {
        Self {
            db,
            recognized_types,
        }
    }

    pub fn recognized_types(&self) -> &[String] {
        &self.recognized_types
    }

    /// Inserts the vehicle and seeds its first location-history entry in one
    /// transaction.
    pub async fn register(
        &self,
        cmd: RegisterVehicleCommand,
        deadline: Duration,
    ) -> Result<Vehicle, AppError> {
        match tokio::time::timeout(deadline, self.register_tx(cmd)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::TimedOut),
        }
    }

    async fn register_tx(&self, cmd: RegisterVehicleCommand) -> Result<Vehicle, AppError> {
        let vehicle = Vehicle::new(cmd.battery, cmd.vehicle_type);
        let checkin = LocationHistory::new(&vehicle.id, Utc::now(), cmd.position);

        let mut tx = self.db.begin().await.map_err(AppError::from_store)?;
        sqlx::query("INSERT INTO vehicles (id, battery, in_use, vehicle_type) VALUES (?, ?, 0, ?)")
            .bind(&vehicle.id)
            .bind(vehicle.battery)
            .bind(&vehicle.vehicle_type)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_store)?;
        sqlx::query(
            "INSERT INTO location_history (id, vehicle_id, ts, longitude, latitude)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&checkin.id)
        .bind(&checkin.vehicle_id)
        .bind(checkin.ts)
        .bind(checkin.longitude)
        .bind(checkin.latitude)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_store)?;
        tx.commit().await.map_err(AppError::from_store)?;

        info!(vehicle_id = %vehicle.id, vehicle_type = %vehicle.vehicle_type, "vehicle registered");
        Ok(vehicle)
    }

    /// Up to `max_vehicles` vehicles joined with their latest checkin.
    pub async fn list_with_location(
        &self,
        max_vehicles: i64,
    ) -> Result<Vec<VehicleWithLocation>, AppError> {
        if max_vehicles <= 0 {
            return Err(AppError::invalid_argument(
                "max_vehicles",
                "max_vehicles must be a positive number",
            ));
        }

        let vehicles: Vec<VehicleWithLocation> = sqlx::query_as(
            "SELECT v.id, v.battery, v.in_use, v.vehicle_type,
                    lh.ts AS last_checkin,
                    lh.longitude AS last_longitude,
                    lh.latitude AS last_latitude
             FROM (SELECT * FROM vehicles LIMIT ?) AS v
             JOIN location_history lh ON lh.vehicle_id = v.id
             JOIN (SELECT vehicle_id, MAX(ts) AS max_ts
                   FROM location_history
                   GROUP BY vehicle_id) AS grouped
               ON grouped.vehicle_id = lh.vehicle_id AND grouped.max_ts = lh.ts
             ORDER BY v.id",
        )
        .bind(max_vehicles)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::from_store)?;
        Ok(vehicles)
    }

    /// Loads the vehicle together with its full history, newest entry first.
    pub async fn get_with_history(&self, vehicle_id: &str) -> Result<VehicleWithHistory, AppError> {
        let mut tx = self.db.begin().await.map_err(AppError::from_store)?;

        let vehicle: Option<Vehicle> = sqlx::query_as(
            "SELECT id, battery, in_use, vehicle_type FROM vehicles WHERE id = ?",
        )
        .bind(vehicle_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from_store)?;
        let vehicle = vehicle
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} does not exist")))?;

        let location_history: Vec<LocationHistory> = sqlx::query_as(
            "SELECT * FROM location_history WHERE vehicle_id = ? ORDER BY ts DESC",
        )
        .bind(vehicle_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from_store)?;

        tx.commit().await.map_err(AppError::from_store)?;

        Ok(VehicleWithHistory {
            vehicle,
            location_history,
        })
    }

    /// Retires a vehicle. Refused while the vehicle is in use.
    pub async fn remove(&self, vehicle_id: &str, deadline: Duration) -> Result<(), AppError> {
        match tokio::time::timeout(deadline, self.remove_tx(vehicle_id)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::TimedOut),
        }
    }

    async fn remove_tx(&self, vehicle_id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await.map_err(AppError::from_store)?;

        let vehicle: Option<Vehicle> = sqlx::query_as(
            "SELECT id, battery, in_use, vehicle_type FROM vehicles WHERE id = ?",
        )
        .bind(vehicle_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from_store)?;
        let vehicle = vehicle
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} does not exist")))?;
        if vehicle.in_use {
            return Err(AppError::Conflict(format!(
                "vehicle {vehicle_id} is currently in use"
            )));
        }

        sqlx::query("DELETE FROM location_history WHERE vehicle_id = ?")
            .bind(vehicle_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_store)?;
        sqlx::query("DELETE FROM rides WHERE vehicle_id = ?")
            .bind(vehicle_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_store)?;
        sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(vehicle_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_store)?;

        tx.commit().await.map_err(AppError::from_store)?;

        info!(vehicle_id = %vehicle_id, "vehicle removed");
        Ok(())
    }
}
