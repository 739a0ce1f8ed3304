// =============================================================================
// Farmstead Backend - Configuration
// =============================================================================

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "127.0.0.1:7100")
    pub bind_address: String,

    /// Database URL (SQLite path)
    pub database_url: String,

    /// JWT secret for signing tokens
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:7100".into()),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:farmstead.db".into()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()
                .unwrap_or(24),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults() {
        env::set_var("JWT_SECRET", "test-secret");
        env::remove_var("BIND_ADDRESS");
        env::remove_var("DATABASE_URL");
        env::remove_var("JWT_EXPIRY_HOURS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:7100");
        assert_eq!(config.database_url, "sqlite:farmstead.db");
        assert_eq!(config.jwt_secret, "test-secret");
        assert_eq!(config.jwt_expiry_hours, 24);
    }
}
