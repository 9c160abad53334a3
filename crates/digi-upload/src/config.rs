//! Upload server configuration.

use std::path::PathBuf;

/// Upload server configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub host: String,
    pub port: u16,
    /// Root directory uploads are written to and served from
    pub upload_dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            upload_dir: PathBuf::from("./uploads"),
        }
    }
}

impl UploadConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        }
    }

    /// `host:port` used to build file URLs when a request has no Host header.
    pub fn public_host(&self) -> String {
        let host = if self.host == "0.0.0.0" {
            "localhost"
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("UPLOAD_DIR");

        let config = UploadConfig::from_env();
        assert_eq!(config.port, 3001);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.public_host(), "localhost:3001");
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("HOST", "127.0.0.1");
        std::env::set_var("PORT", "4100");
        std::env::set_var("UPLOAD_DIR", "/srv/uploads");

        let config = UploadConfig::from_env();
        assert_eq!(config.public_host(), "127.0.0.1:4100");
        assert_eq!(config.upload_dir, PathBuf::from("/srv/uploads"));

        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("UPLOAD_DIR");
    }

    #[test]
    #[serial]
    fn test_bad_port_falls_back() {
        std::env::set_var("PORT", "not-a-port");
        assert_eq!(UploadConfig::from_env().port, 3001);
        std::env::remove_var("PORT");
    }
}
