//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `STOREFORGE`
//! prefix and `__` (double underscore) separating nested sections.
//!
//! # Example
//!
//! ```no_run
//! use storeforge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Listening on {}", config.server.socket_addr());
//! ```

mod billing;
mod database;
mod error;
mod scheduler;
mod server;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use scheduler::SchedulerConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, base domain)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Billing configuration (price table, grace window, callback secret)
    #[serde(default)]
    pub billing: BillingConfig,

    /// Reconciliation scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `STOREFORGE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `STOREFORGE__BILLING__GRACE_PERIOD_DAYS=7` -> `billing.grace_period_days = 7`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("STOREFORGE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.billing.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "STOREFORGE__DATABASE__URL",
            "postgresql://test@localhost/storeforge",
        );
    }

    fn clear_env() {
        env::remove_var("STOREFORGE__DATABASE__URL");
        env::remove_var("STOREFORGE__SERVER__PORT");
        env::remove_var("STOREFORGE__SERVER__ENVIRONMENT");
        env::remove_var("STOREFORGE__BILLING__GRACE_PERIOD_DAYS");
        env::remove_var("STOREFORGE__SCHEDULER__INTERVAL_MS");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/storeforge");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn section_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.billing.grace_period_days, 7);
        assert_eq!(config.scheduler.interval_ms, 3_600_000);
    }

    #[test]
    fn nested_overrides_are_read() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("STOREFORGE__BILLING__GRACE_PERIOD_DAYS", "14");
        env::set_var("STOREFORGE__SCHEDULER__INTERVAL_MS", "60000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.billing.grace_period_days, 14);
        assert_eq!(config.scheduler.interval_ms, 60_000);
    }

    #[test]
    fn is_production_follows_server_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("STOREFORGE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }
}
