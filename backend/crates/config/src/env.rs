use std::env;
use std::str::FromStr;

use serde::Deserialize;
use tally_common::error::{TallyError, TallyResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> TallyResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: parse_var_or("PORT", 8080)?,
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional env var, falling back to `default` when unset.
/// A value that is set but unparseable is a configuration error.
pub fn parse_var_or<T>(key: &str, default: T) -> TallyResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TallyError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn get_var(key: &str) -> TallyResult<String> {
    env::var(key).map_err(|_| TallyError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_from_env_succeeds_with_required_vars() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/tally_test");
        env::remove_var("PORT");

        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.database_url, "postgres://localhost/tally_test");
        assert_eq!(cfg.port, 8080);

        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn config_from_env_fails_without_database_url() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::remove_var("DATABASE_URL");
        let result = AppConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn config_from_env_rejects_bad_port() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/tally_test");
        env::set_var("PORT", "eighty");
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"), "got: {err}");

        env::remove_var("PORT");
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn parse_var_or_uses_default_when_unset() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::remove_var("_TALLY_TEST_NUM");
        let value: u64 = parse_var_or("_TALLY_TEST_NUM", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_var_or_trims_and_parses() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("_TALLY_TEST_NUM2", " 17 ");
        let value: u64 = parse_var_or("_TALLY_TEST_NUM2", 0).unwrap();
        assert_eq!(value, 17);
        env::remove_var("_TALLY_TEST_NUM2");
    }

    #[test]
    fn bind_addr_formats_correctly() {
        let cfg = AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".to_owned(),
            port: 3000,
            log_level: "debug".to_owned(),
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");
    }
}
