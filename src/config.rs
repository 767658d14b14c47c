use std::env;
use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_GEOCODING_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    /// Missing key is not a startup error: the gateway reports it per request.
    pub geocoding_api_key: Option<String>,
    pub geocoding_endpoint: String,
    pub geocoding_timeout_secs: u64,
    pub geocode_rate_limit: u32,

    pub photo_storage_dir: PathBuf,
    pub photo_public_base_url: String,
    pub photo_target_width: u32,
    /// Largest photo part kept from a form; bigger ones are dropped.
    pub photo_max_bytes: usize,
    /// Body limit for the multipart log routes.
    pub upload_max_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            geocoding_api_key: env::var("GEOCODING_API_KEY").ok().filter(|s| !s.is_empty()),
            geocoding_endpoint: env::var("GEOCODING_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_GEOCODING_ENDPOINT.into()),
            geocoding_timeout_secs: env::var("GEOCODING_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .context("GEOCODING_TIMEOUT_SECS must be a number")?,
            geocode_rate_limit: env::var("GEOCODE_RATE_LIMIT")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .context("GEOCODE_RATE_LIMIT must be a number")?,

            photo_storage_dir: env::var("PHOTO_STORAGE_DIR")
                .unwrap_or_else(|_| "./data".into())
                .into(),
            photo_public_base_url: env::var("PHOTO_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/photos".into()),
            photo_target_width: env::var("PHOTO_TARGET_WIDTH")
                .unwrap_or_else(|_| "600".into())
                .parse()
                .context("PHOTO_TARGET_WIDTH must be a number")?,
            photo_max_bytes: env::var("PHOTO_MAX_BYTES")
                .unwrap_or_else(|_| (20 * 1024 * 1024).to_string())
                .parse()
                .context("PHOTO_MAX_BYTES must be a number")?,
            upload_max_bytes: env::var("UPLOAD_MAX_BYTES")
                .unwrap_or_else(|_| (64 * 1024 * 1024).to_string())
                .parse()
                .context("UPLOAD_MAX_BYTES must be a number")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl Config {
    /// Settings for router tests; nothing here is dialed.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/deepsleeping_test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            geocoding_api_key: Some("test-key".into()),
            geocoding_endpoint: DEFAULT_GEOCODING_ENDPOINT.into(),
            geocoding_timeout_secs: 1,
            geocode_rate_limit: 30,
            photo_storage_dir: std::env::temp_dir().join("deepsleeping-test-photos"),
            photo_public_base_url: "http://localhost:8080/photos".into(),
            photo_target_width: 600,
            photo_max_bytes: 1024 * 1024,
            upload_max_bytes: 8 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_settings_are_checked() {
        env::set_var("DATABASE_URL", "postgres://localhost/deepsleeping_test");

        env::set_var("GEOCODE_RATE_LIMIT", "lots");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("GEOCODE_RATE_LIMIT"));

        env::set_var("GEOCODE_RATE_LIMIT", "5");
        env::set_var("PHOTO_MAX_BYTES", "big");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("PHOTO_MAX_BYTES"));

        env::remove_var("PHOTO_MAX_BYTES");
        let config = Config::from_env().unwrap();
        assert_eq!(config.geocode_rate_limit, 5);
        assert_eq!(config.photo_max_bytes, 20 * 1024 * 1024);

        env::remove_var("GEOCODE_RATE_LIMIT");
        env::remove_var("DATABASE_URL");
    }
}
