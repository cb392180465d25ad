use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SolarAdvisorError};

/// Main configuration structure for the solar advisor service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub session: SessionConfig,
    pub generation: GenerationConfig,
    pub estimator: EstimatorConfig,
    pub panels: PanelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: u8,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeout_seconds: u64,
    pub create_timeout_seconds: u64,
    pub recycle_timeout_seconds: u64,
}

/// Where sessions live and how long they survive without a write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `redis` or `memory`
    pub backend: String,
    pub ttl_seconds: u64,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub api_key: String,
    /// OpenAI-compatible chat completions endpoint
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub csv_path: String,
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Always returns a config; call `validate` before serving.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("Loaded .env from: {}", path.display()),
            Err(_) => tracing::warn!("No .env file found - continuing with env vars only"),
        }

        let config_path =
            env::var("SOLAR_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(&config_path);
        config.apply_env_overrides();
        config
    }

    fn from_file(config_path: &str) -> Self {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    config_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = env::var("SOLAR_HTTP_BIND") {
            self.server.bind = bind;
        }

        // Redis overrides
        if let Ok(host) = env::var("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Ok(port) = env::var("REDIS_PORT") {
            if let Ok(port_num) = port.parse() {
                self.redis.port = port_num;
            }
        }
        if let Ok(db) = env::var("REDIS_DB") {
            if let Ok(db_num) = db.parse() {
                self.redis.database = db_num;
            }
        }

        // Session overrides
        if let Ok(backend) = env::var("SOLAR_SESSION_BACKEND") {
            self.session.backend = backend;
        }
        if let Ok(ttl) = env::var("SOLAR_SESSION_TTL_SECONDS") {
            if let Ok(secs) = ttl.parse() {
                self.session.ttl_seconds = secs;
            }
        }

        // Generation overrides
        if let Ok(api_key) = env::var("GEMINI_KEY") {
            self.generation.api_key = api_key;
        }
        if let Ok(base_url) = env::var("SOLAR_GENERATION_BASE_URL") {
            self.generation.base_url = base_url;
        }
        if let Ok(model) = env::var("SOLAR_GENERATION_MODEL") {
            self.generation.model = model;
        }

        if let Ok(url) = env::var("SOLAR_ESTIMATOR_URL") {
            self.estimator.base_url = url;
        }
        if let Ok(path) = env::var("SOLAR_PANEL_CSV") {
            self.panels.csv_path = path;
        }
    }

    /// Validate configuration. A missing generation key is fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.generation.api_key.trim().is_empty() {
            return Err(SolarAdvisorError::Config(
                "Missing GEMINI_KEY environment variable".to_string(),
            ));
        }
        if self.session.ttl_seconds == 0 {
            return Err(SolarAdvisorError::Config(
                "session.ttl_seconds cannot be 0".to_string(),
            ));
        }
        if !matches!(self.session.backend.as_str(), "redis" | "memory") {
            return Err(SolarAdvisorError::Config(format!(
                "Unknown session backend '{}' (expected redis or memory)",
                self.session.backend
            )));
        }
        if self.session.backend == "redis" && self.redis.port == 0 {
            return Err(SolarAdvisorError::Config(
                "Redis port cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get Redis URL with password from environment
    pub fn get_redis_url(&self) -> String {
        let password = env::var("REDIS_PASSWORD")
            .or_else(|_| env::var("REDIS_PASS"))
            .unwrap_or_default();

        if password.is_empty() {
            format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.database
            )
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis.host, self.redis.port, self.redis.database
            )
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_seconds)
    }

    /// Get pool timeout as Duration
    pub fn get_pool_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.timeout_seconds)
    }

    /// Get pool create timeout as Duration
    pub fn get_pool_create_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.create_timeout_seconds)
    }

    /// Get pool recycle timeout as Duration
    pub fn get_pool_recycle_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.recycle_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8000".to_string(),
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                    "http://localhost:3001".to_string(),
                    "http://127.0.0.1:3001".to_string(),
                ],
            },
            redis: RedisConfig {
                host: "localhost".to_string(),
                port: 6379,
                database: 0,
                pool: PoolConfig {
                    max_size: 16,
                    timeout_seconds: 5,
                    create_timeout_seconds: 5,
                    recycle_timeout_seconds: 5,
                },
            },
            session: SessionConfig {
                backend: "redis".to_string(),
                ttl_seconds: 3600,
                key_prefix: "solar:context".to_string(),
            },
            generation: GenerationConfig {
                api_key: String::new(),
                base_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
                    .to_string(),
                model: "gemini-2.5-flash".to_string(),
                temperature: 0.4,
                max_tokens: 512,
            },
            estimator: EstimatorConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
            },
            panels: PanelConfig {
                csv_path: "module_pv/module_data.csv".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_rejects_missing_api_key() {
        let cfg = Config::default();
        let err = cfg.validate().expect_err("empty key must be fatal");
        assert!(matches!(err, SolarAdvisorError::Config(_)));
        assert!(err.to_string().contains("GEMINI_KEY"));
    }

    #[test]
    fn test_validate_accepts_key_and_rejects_unknown_backend() {
        let mut cfg = Config::default();
        cfg.generation.api_key = "test-key".to_string();
        assert!(cfg.validate().is_ok());

        cfg.session.backend = "sqlite".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_file_reads_yaml_and_falls_back_on_garbage() {
        let mut cfg = Config::default();
        cfg.session.ttl_seconds = 120;
        cfg.generation.model = "custom-model".to_string();
        let yaml = serde_yaml::to_string(&cfg).expect("config serializes");

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(yaml.as_bytes()).expect("write yaml");
        let loaded = Config::from_file(&file.path().to_string_lossy());
        assert_eq!(loaded.session.ttl_seconds, 120);
        assert_eq!(loaded.generation.model, "custom-model");

        let mut broken = tempfile::NamedTempFile::new().expect("temp file");
        broken.write_all(b"server: [not, a, map").expect("write yaml");
        let fallback = Config::from_file(&broken.path().to_string_lossy());
        assert_eq!(fallback.session.ttl_seconds, 3600);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = Config::from_file("/definitely/not/here/config.yaml");
        assert_eq!(cfg.session.key_prefix, "solar:context");
        assert_eq!(cfg.session_ttl(), Duration::from_secs(3600));
    }
}
