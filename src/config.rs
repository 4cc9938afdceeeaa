//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

use crate::es::DEFAULT_SNAPSHOT_FREQUENCY;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Events between snapshots
    pub snapshot_frequency: i64,

    /// Prefix of bus topic names ("<prefix>_<aggregate_type>")
    pub topic_prefix: String,

    /// Bus partitions; batches are keyed by aggregate id
    pub bus_partitions: usize,

    /// Projection consumers (one per partition)
    pub projection_workers: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let snapshot_frequency: i64 = env::var("SNAPSHOT_FREQUENCY")
            .unwrap_or_else(|_| DEFAULT_SNAPSHOT_FREQUENCY.to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SNAPSHOT_FREQUENCY"))?;
        if snapshot_frequency < 1 {
            return Err(ConfigError::InvalidValue("SNAPSHOT_FREQUENCY"));
        }

        let topic_prefix = env::var("EVENT_TOPIC_PREFIX").unwrap_or_else(|_| "eventstore".to_string());

        let bus_partitions: usize = env::var("BUS_PARTITIONS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BUS_PARTITIONS"))?;
        if bus_partitions == 0 {
            return Err(ConfigError::InvalidValue("BUS_PARTITIONS"));
        }

        let projection_workers = env::var("PROJECTION_WORKERS")
            .unwrap_or_else(|_| bus_partitions.to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PROJECTION_WORKERS"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            snapshot_frequency,
            topic_prefix,
            bus_partitions,
            projection_workers,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
