//! Configuration management for the Paddy Season Planner
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with PSP_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::FertilizerRates;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// JWT verification settings
    pub jwt: JwtConfig,

    /// Paddy variety catalog service
    pub catalog: ServiceEndpointConfig,

    /// Farm registry service, used to pre-fill plan inputs
    pub farm_registry: ServiceEndpointConfig,

    /// Remark image storage
    pub storage: StorageConfig,

    pub logging: LoggingConfig,

    /// Agronomy reference data and write behaviour
    pub agronomy: AgronomyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceEndpointConfig {
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded remark images
    pub upload_dir: String,

    /// Largest accepted image upload in bytes
    pub max_image_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgronomyConfig {
    /// JSON leaf color chart table; the built-in table is used when unset
    pub lcc_table_path: Option<String>,

    /// Attempts made when a concurrent write wins the version race
    pub max_write_retries: u32,

    /// Seasonal kg per acre
    pub urea_per_acre: Decimal,
    pub tsp_per_acre: Decimal,
    pub mop_per_acre: Decimal,
    pub zinc_sulphate_per_acre: Decimal,
}

impl AgronomyConfig {
    pub fn fertilizer_rates(&self) -> FertilizerRates {
        FertilizerRates {
            urea_per_acre: self.urea_per_acre,
            tsp_per_acre: self.tsp_per_acre,
            mop_per_acre: self.mop_per_acre,
            zinc_sulphate_per_acre: self.zinc_sulphate_per_acre,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("PSP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let rates = FertilizerRates::default();

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("catalog.base_url", "http://localhost:4001")?
            .set_default("catalog.timeout_secs", 10)?
            .set_default("farm_registry.base_url", "http://localhost:4002")?
            .set_default("farm_registry.timeout_secs", 10)?
            .set_default("storage.upload_dir", "uploads")?
            .set_default("storage.max_image_bytes", 5 * 1024 * 1024)?
            .set_default("logging.format", "pretty")?
            .set_default("agronomy.max_write_retries", 5)?
            .set_default("agronomy.urea_per_acre", rates.urea_per_acre.to_string())?
            .set_default("agronomy.tsp_per_acre", rates.tsp_per_acre.to_string())?
            .set_default("agronomy.mop_per_acre", rates.mop_per_acre.to_string())?
            .set_default(
                "agronomy.zinc_sulphate_per_acre",
                rates.zinc_sulphate_per_acre.to_string(),
            )?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PSP_ prefix)
            .add_source(
                Environment::with_prefix("PSP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config
            .agronomy
            .fertilizer_rates()
            .validate()
            .map_err(|m| ConfigError::Message(m.to_string()))?;
        Ok(config)
    }
}
