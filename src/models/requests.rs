//! Wire payloads for the ride and vehicle endpoints.
//!
//! Clients send battery and coordinates as strings or numbers; the raw
//! payload stays untyped and a single `normalize` step produces the typed,
//! range-checked command the services consume. Unknown fields are ignored.

use serde::Deserialize;

use crate::error::AppError;
use crate::models::location::Position;

/// A numeric wire field that tolerates both `"55"` and `55`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    fn as_f64(&self, field: &'static str) -> Result<f64, AppError> {
        match self {
            RawNumber::Number(value) => Ok(*value),
            RawNumber::Text(raw) => raw.trim().parse::<f64>().map_err(|_| {
                AppError::invalid_argument(field, format!("cannot parse {raw:?} as a number"))
            }),
        }
    }

    fn as_i32(&self, field: &'static str) -> Result<i32, AppError> {
        let value = self.as_f64(field)?;
        if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
            return Err(AppError::invalid_argument(
                field,
                format!("{value} is not an integer"),
            ));
        }
        Ok(value as i32)
    }
}

fn require_number<'a>(
    raw: &'a Option<RawNumber>,
    field: &'static str,
) -> Result<&'a RawNumber, AppError> {
    raw.as_ref()
        .ok_or_else(|| AppError::invalid_argument(field, "missing required field"))
}

fn require_text(raw: &Option<String>, field: &'static str) -> Result<String, AppError> {
    match raw.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::invalid_argument(field, "missing required field")),
    }
}

fn parse_battery(raw: &Option<RawNumber>) -> Result<i32, AppError> {
    let battery = require_number(raw, "battery")?.as_i32("battery")?;
    if !(0..=100).contains(&battery) {
        return Err(AppError::invalid_argument(
            "battery",
            "battery (percent) must be between 0 and 100",
        ));
    }
    Ok(battery)
}

fn parse_position(
    longitude: &Option<RawNumber>,
    latitude: &Option<RawNumber>,
) -> Result<Position, AppError> {
    let longitude = require_number(longitude, "longitude")?.as_f64("longitude")?;
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::invalid_argument(
            "longitude",
            "longitude must be between -180 and 180",
        ));
    }
    let latitude = require_number(latitude, "latitude")?.as_f64("latitude")?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::invalid_argument(
            "latitude",
            "latitude must be between -90 and 90",
        ));
    }
    Ok(Position {
        longitude,
        latitude,
    })
}

/// Start-ride payload: which vehicle, which rider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRideRequest {
    pub vehicle_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartRideCommand {
    pub vehicle_id: String,
    pub email: String,
}

impl StartRideRequest {
    pub fn normalize(&self) -> Result<StartRideCommand, AppError> {
        Ok(StartRideCommand {
            vehicle_id: require_text(&self.vehicle_id, "vehicle_id")?,
            email: require_text(&self.email, "email")?,
        })
    }
}

/// End-ride payload: the start-ride identifiers plus the telemetry submitted
/// when the rider returns the vehicle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndRideRequest {
    #[serde(flatten)]
    pub start: StartRideRequest,
    pub battery: Option<RawNumber>,
    pub longitude: Option<RawNumber>,
    pub latitude: Option<RawNumber>,
}

#[derive(Debug, Clone)]
pub struct EndRideCommand {
    pub vehicle_id: String,
    pub email: String,
    pub battery: i32,
    pub position: Position,
}

impl EndRideRequest {
    pub fn normalize(&self) -> Result<EndRideCommand, AppError> {
        let start = self.start.normalize()?;
        Ok(EndRideCommand {
            vehicle_id: start.vehicle_id,
            email: start.email,
            battery: parse_battery(&self.battery)?,
            position: parse_position(&self.longitude, &self.latitude)?,
        })
    }
}

/// Vehicle registration payload: battery, type tag and the initial position
/// seeded into the location history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterVehicleRequest {
    pub battery: Option<RawNumber>,
    pub vehicle_type: Option<String>,
    pub longitude: Option<RawNumber>,
    pub latitude: Option<RawNumber>,
}

#[derive(Debug, Clone)]
pub struct RegisterVehicleCommand {
    pub battery: i32,
    pub vehicle_type: String,
    pub position: Position,
}

impl RegisterVehicleRequest {
    pub fn normalize(&self, recognized: &[String]) -> Result<RegisterVehicleCommand, AppError> {
        let vehicle_type = require_text(&self.vehicle_type, "vehicle_type")?;
        if !recognized.iter().any(|tag| tag == &vehicle_type) {
            return Err(AppError::invalid_argument(
                "vehicle_type",
                format!("vehicle type must be one of: {}", recognized.join(", ")),
            ));
        }
        Ok(RegisterVehicleCommand {
            battery: parse_battery(&self.battery)?,
            vehicle_type,
            position: parse_position(&self.longitude, &self.latitude)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_request(battery: &str, longitude: &str, latitude: &str) -> EndRideRequest {
        EndRideRequest {
            start: StartRideRequest {
                vehicle_id: Some("1e4b-v1".to_string()),
                email: Some("rider@example.com".to_string()),
            },
            battery: Some(RawNumber::Text(battery.to_string())),
            longitude: Some(RawNumber::Text(longitude.to_string())),
            latitude: Some(RawNumber::Text(latitude.to_string())),
        }
    }

    fn invalid_field(result: Result<EndRideCommand, AppError>) -> &'static str {
        match result {
            Err(AppError::InvalidArgument { field, .. }) => field,
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn normalize_parses_textual_values() {
        let cmd = end_request("55", "-73.9857", "40.7484")
            .normalize()
            .expect("valid payload");
        assert_eq!(cmd.vehicle_id, "1e4b-v1");
        assert_eq!(cmd.email, "rider@example.com");
        assert_eq!(cmd.battery, 55);
        assert_eq!(cmd.position.longitude, -73.9857);
        assert_eq!(cmd.position.latitude, 40.7484);
    }

    #[test]
    fn normalize_accepts_json_numbers() {
        let request: EndRideRequest = serde_json::from_value(serde_json::json!({
            "vehicle_id": "v1",
            "email": "rider@example.com",
            "battery": 55,
            "longitude": -73.9857,
            "latitude": 40.7484,
            "extra": "ignored"
        }))
        .expect("deserialize");
        let cmd = request.normalize().expect("valid payload");
        assert_eq!(cmd.battery, 55);
    }

    #[test]
    fn battery_bounds_are_inclusive() {
        assert_eq!(
            end_request("0", "0", "0").normalize().unwrap().battery,
            0
        );
        assert_eq!(
            end_request("100", "0", "0").normalize().unwrap().battery,
            100
        );
        assert_eq!(invalid_field(end_request("-1", "0", "0").normalize()), "battery");
        assert_eq!(invalid_field(end_request("101", "0", "0").normalize()), "battery");
        assert_eq!(invalid_field(end_request("120", "0", "0").normalize()), "battery");
    }

    #[test]
    fn unparseable_values_name_the_field() {
        assert_eq!(invalid_field(end_request("full", "0", "0").normalize()), "battery");
        assert_eq!(invalid_field(end_request("50", "east", "0").normalize()), "longitude");
        assert_eq!(invalid_field(end_request("50", "0", "north").normalize()), "latitude");
        assert_eq!(invalid_field(end_request("54.5", "0", "0").normalize()), "battery");
    }

    #[test]
    fn coordinate_ranges_are_enforced() {
        assert!(end_request("50", "180", "90").normalize().is_ok());
        assert!(end_request("50", "-180", "-90").normalize().is_ok());
        assert_eq!(invalid_field(end_request("50", "180.1", "0").normalize()), "longitude");
        assert_eq!(invalid_field(end_request("50", "0", "-90.5").normalize()), "latitude");
    }

    #[test]
    fn missing_identifiers_fail_before_telemetry() {
        let mut request = end_request("50", "0", "0");
        request.start.vehicle_id = None;
        assert_eq!(invalid_field(request.normalize()), "vehicle_id");

        let mut request = end_request("50", "0", "0");
        request.start.email = Some("   ".to_string());
        assert_eq!(invalid_field(request.normalize()), "email");

        let mut request = end_request("50", "0", "0");
        request.battery = None;
        assert_eq!(invalid_field(request.normalize()), "battery");
    }

    #[test]
    fn register_checks_the_recognized_tag_set() {
        let recognized = vec!["scooter".to_string(), "bike".to_string()];
        let request: RegisterVehicleRequest = serde_json::from_value(serde_json::json!({
            "battery": "90",
            "vehicle_type": "scooter",
            "longitude": "12.5",
            "latitude": "55.7"
        }))
        .expect("deserialize");
        let cmd = request.normalize(&recognized).expect("valid payload");
        assert_eq!(cmd.vehicle_type, "scooter");
        assert_eq!(cmd.battery, 90);

        let unknown = RegisterVehicleRequest {
            vehicle_type: Some("hoverboard".to_string()),
            ..request.clone()
        };
        match unknown.normalize(&recognized) {
            Err(AppError::InvalidArgument { field, .. }) => assert_eq!(field, "vehicle_type"),
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }
}
