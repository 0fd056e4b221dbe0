use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::requests::RegisterVehicleRequest,
    models::vehicle::{Vehicle, VehicleWithHistory, VehicleWithLocation},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(register_vehicle))
        .route("/:vehicle_id", get(get_vehicle).delete(remove_vehicle))
}

#[derive(Deserialize)]
struct ListQuery {
    max_vehicles: Option<i64>,
}

async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<VehicleWithLocation>>, AppError> {
    let max = query.max_vehicles.unwrap_or(20);
    Ok(Json(state.vehicles.list_with_location(max).await?))
}

async fn register_vehicle(
    State(state): State<AppState>,
    Json(payload): Json<RegisterVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    let cmd = payload.normalize(state.vehicles.recognized_types())?;
    let vehicle = state
        .vehicles
        .register(cmd, state.config.request_deadline)
        .await?;
    Ok(Json(vehicle))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<VehicleWithHistory>, AppError> {
    Ok(Json(state.vehicles.get_with_history(&vehicle_id).await?))
}

async fn remove_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .vehicles
        .remove(&vehicle_id, state.config.request_deadline)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
