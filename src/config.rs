use std::time::Duration;

use crate::errors::ServiceError;

/// Immutable runtime configuration, loaded from the environment once at
/// startup and passed by reference afterwards.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub cleanup_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig, ServiceError> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")?
            .parse::<u16>()
            .map_err(|_| ServiceError::Environment)?;
        let database_url = std::env::var("DATABASE_URL")?;
        let cleanup_interval = std::env::var("CLEANUP_INTERVAL")
            .unwrap_or_else(|_| "2700".to_string())
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ServiceError::Environment)?;

        Ok(AppConfig {
            port,
            database_url,
            cleanup_interval,
        })
    }
}
