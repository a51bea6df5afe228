//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_permissive: true,
        }
    }
}

/// Configuration for the inference service client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the Ollama instance.
    pub base_url: String,
    /// Model to answer with.
    pub model: String,
    /// Wall-clock bound on one streaming call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "tinyllama".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Response cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached answers.
    pub capacity: usize,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl_secs: 3600,
        }
    }
}

/// Per-category retention windows, in days, plus the daily cleanup hour (UTC).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub chat_days: u32,
    pub query_days: u32,
    pub analytics_days: u32,
    pub feedback_days: u32,
    pub cleanup_hour: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            chat_days: 7,
            query_days: 7,
            analytics_days: 30,
            feedback_days: 90,
            cleanup_hour: 2,
        }
    }
}

/// Top-level kiosk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub cache: CacheConfig,
    pub retention: RetentionConfig,
    /// Path to the interaction database; defaults to the platform data dir.
    pub database_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KioskConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.inference.base_url, "http://localhost:11434");
        assert_eq!(config.inference.model, "tinyllama");
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.retention.chat_days, 7);
        assert_eq!(config.retention.query_days, 7);
        assert_eq!(config.retention.analytics_days, 30);
        assert_eq!(config.retention.feedback_days, 90);
        assert_eq!(config.retention.cleanup_hour, 2);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let toml = r#"
            [server]
            port = 8080

            [inference]
            model = "llama3.2:3b"

            [retention]
            analytics_days = 14
        "#;
        let config: KioskConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.inference.model, "llama3.2:3b");
        assert_eq!(config.retention.analytics_days, 14);
        assert_eq!(config.retention.feedback_days, 90);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = KioskConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: KioskConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.cache.capacity, config.cache.capacity);
    }
}
