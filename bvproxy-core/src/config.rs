use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub bilibili: BilibiliConfig,
    pub rate_limit: RateLimitConfig,
    pub cdn: CdnConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted `Host` header values. `*` accepts any host, `*.example.com`
    /// accepts subdomains.
    pub allowed_hosts: Vec<String>,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_proxy_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_hosts: vec!["*".to_string()],
            trust_proxy_headers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Upstream endpoints and the local session token file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BilibiliConfig {
    pub www_base: String,
    pub api_base: String,
    pub live_base: String,
    /// JSON file holding an optional `SESSDATA` token, read on every video request
    pub session_file: String,
}

impl Default for BilibiliConfig {
    fn default() -> Self {
        Self {
            www_base: "https://www.bilibili.com".to_string(),
            api_base: "https://api.bilibili.com".to_string(),
            live_base: "https://api.live.bilibili.com".to_string(),
            session_file: "data.json".to_string(),
        }
    }
}

/// Per client, per route request budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    /// Swap the host of resolved video URLs for a random upos mirror
    pub rewrite: bool,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self { rewrite: true }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Load config file if provided
        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (BVPROXY_SERVER__PORT, etc.)
        builder = builder.add_source(
            Environment::with_prefix("BVPROXY")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_hosts")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check for misconfigurations. Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }
        if self.server.allowed_hosts.is_empty() {
            errors.push("server.allowed_hosts must contain at least one entry (use \"*\" for any)".to_string());
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            ));
        }
        if self.rate_limit.max_requests == 0 {
            errors.push("rate_limit.max_requests must be non-zero".to_string());
        }
        if self.rate_limit.window_seconds == 0 {
            errors.push("rate_limit.window_seconds must be non-zero".to_string());
        }
        for (name, base) in [
            ("bilibili.www_base", &self.bilibili.www_base),
            ("bilibili.api_base", &self.bilibili.api_base),
            ("bilibili.live_base", &self.bilibili.live_base),
        ] {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                errors.push(format!("{name} must be an http(s) URL, got \"{base}\""));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.allowed_hosts, vec!["*".to_string()]);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert_eq!(config.bilibili.session_file, "data.json");
        assert!(config.cdn.rewrite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_address() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                ..ServerConfig::default()
            },
            ..Config::default()
        };

        assert_eq!(config.http_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.server.port = 0;
        config.logging.format = "xml".to_string();
        config.rate_limit.max_requests = 0;
        config.bilibili.api_base = "ftp://nope".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("server.port")));
        assert!(errors.iter().any(|e| e.contains("bilibili.api_base")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 9000\n  allowed_hosts: [\"b.example.com\"]\nrate_limit:\n  max_requests: 3\ncdn:\n  rewrite: false"
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.allowed_hosts, vec!["b.example.com".to_string()]);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert!(!config.cdn.rewrite);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::from_file("/nonexistent/bvproxy.yaml").unwrap();
        assert_eq!(config.server.port, 5000);
    }
}
