use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

/// Shortest token the QR codec will ever emit. Anything below this is too
/// cheap to brute-force within a validity window.
pub const MIN_TOKEN_LENGTH: usize = 16;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// The socket address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// How long a QR redemption session stays redeemable, in seconds.
    pub validity_window_secs: i64,
    /// Length of generated QR tokens, in alphanumeric characters.
    pub token_length: usize,
    /// How many security events the in-memory ledger retains.
    pub max_security_events: usize,
    /// How long a login session lives in Redis, in seconds.
    pub auth_session_ttl_secs: u64,
    /// Whether to seed a demo instructor, students and class on startup.
    pub seed_demo_data: bool,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
                .parse()
                .context("Invalid LISTEN_ADDR")?,
            validity_window_secs: env::var("QR_VALIDITY_WINDOW_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid QR_VALIDITY_WINDOW_SECS")?,
            token_length: env::var("QR_TOKEN_LENGTH")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .context("Invalid QR_TOKEN_LENGTH")?,
            max_security_events: env::var("MAX_SECURITY_EVENTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid MAX_SECURITY_EVENTS")?,
            auth_session_ttl_secs: env::var("AUTH_SESSION_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("Invalid AUTH_SESSION_TTL_SECS")?,
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would weaken the redemption protocol.
    pub fn validate(&self) -> Result<()> {
        if self.validity_window_secs <= 0 {
            anyhow::bail!("QR_VALIDITY_WINDOW_SECS must be positive");
        }
        if self.token_length < MIN_TOKEN_LENGTH {
            anyhow::bail!("QR_TOKEN_LENGTH must be at least {MIN_TOKEN_LENGTH}");
        }
        if self.max_security_events == 0 {
            anyhow::bail!("MAX_SECURITY_EVENTS must be positive");
        }
        if self.auth_session_ttl_secs == 0 {
            anyhow::bail!("AUTH_SESSION_TTL_SECS must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/rollcall".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            listen_addr: "127.0.0.1:8000".parse().unwrap(),
            validity_window_secs: 300,
            token_length: 16,
            max_security_events: 100,
            auth_session_ttl_secs: 3600,
            seed_demo_data: false,
        }
    }

    #[test]
    fn accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_short_tokens() {
        let mut config = base_config();
        config.token_length = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_window() {
        let mut config = base_config();
        config.validity_window_secs = 0;
        assert!(config.validate().is_err());
    }
}
