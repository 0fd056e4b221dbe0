use std::{env, net::SocketAddr, time::Duration};

use crate::error::AppError;

pub const DEFAULT_VEHICLE_TYPES: &[&str] = &["scooter", "bike", "skateboard"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    /// Recognized vehicle type tags; anything else is rejected at registration.
    pub vehicle_types: Vec<String>,
    /// Deadline for one transactional unit; expiry before commit rolls back.
    pub request_deadline: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://movr.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let vehicle_types = match env::var("VEHICLE_TYPES") {
            Ok(raw) => {
                let tags: Vec<String> = raw
                    .split(',')
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect();
                if tags.is_empty() {
                    return Err(AppError::Config(
                        "VEHICLE_TYPES must name at least one tag".to_string(),
                    ));
                }
                tags
            }
            Err(_) => DEFAULT_VEHICLE_TYPES
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
        };

        let request_deadline = match env::var("REQUEST_DEADLINE_MS") {
            Ok(raw) => {
                let millis: u64 = raw
                    .parse()
                    .map_err(|err| AppError::Config(format!("invalid REQUEST_DEADLINE_MS: {err}")))?;
                Duration::from_millis(millis)
            }
            Err(_) => Duration::from_millis(5_000),
        };

        Ok(Self {
            database_url,
            listen_addr,
            vehicle_types,
            request_deadline,
        })
    }
}
