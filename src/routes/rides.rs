use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::requests::{EndRideRequest, StartRideRequest},
    models::ride::{ActiveRide, EndRideOutcome, Ride, RideWithVehicle},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rides_by_user))
        .route("/start", post(start_ride))
        .route("/end", post(end_ride))
        .route("/active", get(active_ride))
}

async fn start_ride(
    State(state): State<AppState>,
    Json(payload): Json<StartRideRequest>,
) -> Result<Json<Ride>, AppError> {
    let cmd = payload.normalize()?;
    let ride = state
        .rides
        .start_ride(cmd, state.config.request_deadline)
        .await?;
    Ok(Json(ride))
}

async fn end_ride(
    State(state): State<AppState>,
    Json(payload): Json<EndRideRequest>,
) -> Result<Json<EndRideOutcome>, AppError> {
    let cmd = payload.normalize()?;
    let outcome = state
        .rides
        .end_ride(cmd, state.config.request_deadline)
        .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct UserQuery {
    email: Option<String>,
}

async fn rides_by_user(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<RideWithVehicle>>, AppError> {
    let email = require_param(query.email, "email")?;
    Ok(Json(state.rides.rides_for_user(&email).await?))
}

#[derive(Deserialize)]
struct ActiveQuery {
    vehicle_id: Option<String>,
    email: Option<String>,
}

async fn active_ride(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<ActiveRide>, AppError> {
    let vehicle_id = require_param(query.vehicle_id, "vehicle_id")?;
    let email = require_param(query.email, "email")?;
    Ok(Json(state.rides.active_ride(&vehicle_id, &email).await?))
}

fn require_param(value: Option<String>, field: &'static str) -> Result<String, AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::invalid_argument(field, "missing required parameter")),
    }
}
