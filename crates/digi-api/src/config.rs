//! API configuration.

use std::time::Duration;

/// Debounce applied to autosave requests when `AUTOSAVE_DEBOUNCE_MS` is unset.
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 2000;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins (`*` for any)
    pub cors_origins: Vec<String>,
    /// Sustained requests per second per client IP
    pub rate_limit_rps: u32,
    /// Requests a client may burst above the sustained rate
    pub rate_limit_burst: u32,
    pub request_timeout: Duration,
    /// Max request body size, uploads included
    pub max_body_size: usize,
    /// Delay between the last draft edit and the autosave write
    pub autosave_debounce: Duration,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
    /// development or production
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            request_timeout: Duration::from_secs(30),
            max_body_size: 8 * 1024 * 1024,
            autosave_debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            metrics_enabled: true,
            environment: "development".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            autosave_debounce: env_parse("AUTOSAVE_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.autosave_debounce),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.metrics_enabled),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 6] = [
        "API_PORT",
        "CORS_ORIGINS",
        "AUTOSAVE_DEBOUNCE_MS",
        "METRICS_ENABLED",
        "ENVIRONMENT",
        "RATE_LIMIT_BURST",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ApiConfig::from_env();
        assert_eq!(config.port, 8000);
        assert_eq!(config.autosave_debounce, Duration::from_millis(2000));
        assert!(config.metrics_enabled);
        assert!(!config.is_production());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("API_PORT", "9001");
        std::env::set_var("CORS_ORIGINS", "https://a.example, https://b.example,");
        std::env::set_var("AUTOSAVE_DEBOUNCE_MS", "500");
        std::env::set_var("METRICS_ENABLED", "false");
        std::env::set_var("ENVIRONMENT", "Production");
        std::env::set_var("RATE_LIMIT_BURST", "not-a-number");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 9001);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.autosave_debounce, Duration::from_millis(500));
        assert!(!config.metrics_enabled);
        assert!(config.is_production());
        assert_eq!(config.rate_limit_burst, 20);
        clear_env();
    }
}
