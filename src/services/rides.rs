//! Ride lifecycle: start-ride and end-ride, each inside one transaction.
//!
//! Both mutations guard the `in_use` transition with a conditional write as
//! the first statement of the transaction. Under concurrent calls on the
//! same vehicle exactly one caller's guard matches; the others block on the
//! store's busy handler, then match zero rows and surface a conflict.

use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::db::DbPool;
use crate::error::AppError;
use crate::geo;
use crate::models::location::LocationHistory;
use crate::models::requests::{EndRideCommand, StartRideCommand};
use crate::models::ride::{ActiveRide, EndRideOutcome, Ride, RideWithVehicle};
use crate::models::vehicle::Vehicle;

#[derive(Clone)]
pub struct RideService {
    db: DbPool,
}

impl RideService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Opens a ride: vehicle goes Available -> InUse, a location-history
    /// entry is appended at the vehicle's last known position, and the open
    /// ride row is inserted.
    pub async fn start_ride(
        &self,
        cmd: StartRideCommand,
        deadline: Duration,
    ) -> Result<Ride, AppError> {
        match tokio::time::timeout(deadline, self.start_ride_tx(cmd)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::TimedOut),
        }
    }

    async fn start_ride_tx(&self, cmd: StartRideCommand) -> Result<Ride, AppError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await.map_err(AppError::from_store)?;

        let updated = sqlx::query("UPDATE vehicles SET in_use = 1 WHERE id = ? AND in_use = 0")
            .bind(&cmd.vehicle_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_store)?;
        if updated.rows_affected() == 0 {
            return Err(self.vehicle_guard_error(&mut tx, &cmd.vehicle_id, true).await?);
        }

        let last: Option<LocationHistory> = sqlx::query_as(
            "SELECT * FROM location_history WHERE vehicle_id = ? ORDER BY ts DESC LIMIT 1",
        )
        .bind(&cmd.vehicle_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from_store)?;
        // Registration seeds the first entry, so an empty history means the
        // store has been tampered with.
        let last = last.ok_or_else(|| {
            AppError::Internal(format!("vehicle {} has no location history", cmd.vehicle_id))
        })?;

        let checkin = LocationHistory::new(&cmd.vehicle_id, now, last.position());
        insert_location(&mut tx, &checkin).await?;

        let ride = Ride::open(&cmd.vehicle_id, &cmd.email, now, last.position());
        sqlx::query(
            "INSERT INTO rides (id, vehicle_id, user_email, start_ts, start_longitude, start_latitude)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&ride.id)
        .bind(&ride.vehicle_id)
        .bind(&ride.user_email)
        .bind(ride.start_ts)
        .bind(ride.start_longitude)
        .bind(ride.start_latitude)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_store)?;

        tx.commit().await.map_err(AppError::from_store)?;

        info!(ride_id = %ride.id, vehicle_id = %ride.vehicle_id, "ride started");
        Ok(ride)
    }

    /// Closes the open ride for (vehicle, user): battery and position are
    /// taken from the validated command, the vehicle goes InUse -> Available,
    /// and the trip numbers are computed from the ride's start markers.
    pub async fn end_ride(
        &self,
        cmd: EndRideCommand,
        deadline: Duration,
    ) -> Result<EndRideOutcome, AppError> {
        match tokio::time::timeout(deadline, self.end_ride_tx(cmd)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::TimedOut),
        }
    }

    async fn end_ride_tx(&self, cmd: EndRideCommand) -> Result<EndRideOutcome, AppError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await.map_err(AppError::from_store)?;

        let updated = sqlx::query(
            "UPDATE vehicles SET battery = ?, in_use = 0 WHERE id = ? AND in_use = 1",
        )
        .bind(cmd.battery)
        .bind(&cmd.vehicle_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_store)?;
        if updated.rows_affected() == 0 {
            return Err(self.vehicle_guard_error(&mut tx, &cmd.vehicle_id, false).await?);
        }

        let ride = load_open_ride(&mut tx, &cmd.vehicle_id, &cmd.email).await?;

        let checkin = LocationHistory::new(&cmd.vehicle_id, now, cmd.position);
        insert_location(&mut tx, &checkin).await?;

        sqlx::query(
            "UPDATE rides SET end_ts = ?, end_longitude = ?, end_latitude = ?, end_battery = ?
             WHERE id = ?",
        )
        .bind(now)
        .bind(cmd.position.longitude)
        .bind(cmd.position.latitude)
        .bind(cmd.battery)
        .bind(&ride.id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_store)?;

        tx.commit().await.map_err(AppError::from_store)?;

        let distance_km = geo::haversine_km(ride.start_position(), cmd.position);
        let duration = geo::duration_minutes(ride.start_ts, now);
        let velocity = geo::velocity_kmh(distance_km, ride.start_ts, now);

        let closed = Ride {
            end_ts: Some(now),
            end_longitude: Some(cmd.position.longitude),
            end_latitude: Some(cmd.position.latitude),
            end_battery: Some(cmd.battery),
            ..ride
        };
        info!(
            ride_id = %closed.id,
            vehicle_id = %closed.vehicle_id,
            distance_km,
            "ride ended"
        );

        Ok(EndRideOutcome {
            ride: closed,
            duration_minutes: duration,
            distance_km,
            avg_velocity_kmh: velocity,
            battery: cmd.battery,
        })
    }

    /// All rides for one rider, joined with vehicle info, newest end first.
    pub async fn rides_for_user(&self, email: &str) -> Result<Vec<RideWithVehicle>, AppError> {
        let rides: Vec<RideWithVehicle> = sqlx::query_as(
            "SELECT r.id, r.vehicle_id, r.user_email, r.start_ts, r.end_ts,
                    v.in_use, v.vehicle_type
             FROM rides r
             JOIN vehicles v ON v.id = r.vehicle_id
             WHERE r.user_email = ?
             ORDER BY r.end_ts DESC",
        )
        .bind(email)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::from_store)?;
        Ok(rides)
    }

    /// The open ride for (vehicle, rider) with the vehicle's current state.
    pub async fn active_ride(&self, vehicle_id: &str, email: &str) -> Result<ActiveRide, AppError> {
        let vehicle: Option<Vehicle> = sqlx::query_as(
            "SELECT id, battery, in_use, vehicle_type FROM vehicles WHERE id = ?",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::from_store)?;
        let vehicle = vehicle
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} does not exist")))?;

        let mut tx = self.db.begin().await.map_err(AppError::from_store)?;
        let ride = load_open_ride(&mut tx, vehicle_id, email).await?;
        tx.commit().await.map_err(AppError::from_store)?;

        Ok(ActiveRide { vehicle, ride })
    }

    /// A guard update that matched nothing means either the vehicle is gone
    /// or its in_use flag is already on the requested side.
    async fn vehicle_guard_error(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        vehicle_id: &str,
        starting: bool,
    ) -> Result<AppError, AppError> {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM vehicles WHERE id = ?")
            .bind(vehicle_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(AppError::from_store)?;
        Ok(match exists {
            None => AppError::NotFound(format!("vehicle {vehicle_id} does not exist")),
            Some(_) if starting => {
                AppError::Conflict(format!("vehicle {vehicle_id} is already in use"))
            }
            Some(_) => AppError::Conflict(format!("vehicle {vehicle_id} is not in use")),
        })
    }
}

async fn load_open_ride(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    vehicle_id: &str,
    email: &str,
) -> Result<Ride, AppError> {
    let open: Vec<Ride> = sqlx::query_as(
        "SELECT * FROM rides WHERE vehicle_id = ? AND user_email = ? AND end_ts IS NULL",
    )
    .bind(vehicle_id)
    .bind(email)
    .fetch_all(&mut **tx)
    .await
    .map_err(AppError::from_store)?;

    let mut open = open.into_iter();
    match (open.next(), open.next()) {
        (Some(ride), None) => Ok(ride),
        (None, _) => Err(AppError::NotFound(format!(
            "no active ride for {email} on vehicle {vehicle_id}"
        ))),
        (Some(_), Some(_)) => Err(AppError::Conflict(format!(
            "multiple open rides for {email} on vehicle {vehicle_id}"
        ))),
    }
}

async fn insert_location(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &LocationHistory,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO location_history (id, vehicle_id, ts, longitude, latitude)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(&entry.vehicle_id)
    .bind(entry.ts)
    .bind(entry.longitude)
    .bind(entry.latitude)
    .execute(&mut **tx)
    .await
    .map_err(AppError::from_store)?;
    Ok(())
}
