use crate::{
    config::AppConfig,
    db::DbPool,
    services::{rides::RideService, vehicles::VehicleService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub vehicles: VehicleService,
    pub rides: RideService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let vehicles = VehicleService::new(db.clone(), config.vehicle_types.clone());
        let rides = RideService::new(db.clone());
        Self {
            config,
            db,
            vehicles,
            rides,
        }
    }
}
