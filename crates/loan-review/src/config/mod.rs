use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::loan_review::{OllamaSettings, PolicyThresholds};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub review: ReviewConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            review: ReviewConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Data locations, narrative backend and policy thresholds for reviews.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub data_dir: PathBuf,
    pub policy_path: PathBuf,
    pub prompt_template: Option<PathBuf>,
    pub narrative_enabled: bool,
    pub ollama: OllamaSettings,
    pub thresholds: PolicyThresholds,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            policy_path: PathBuf::from("docs/policies/policy.md"),
            prompt_template: None,
            narrative_enabled: true,
            ollama: OllamaSettings::default(),
            thresholds: PolicyThresholds::default(),
        }
    }
}

impl ReviewConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = env::var("LOAN_REVIEW_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let policy_path = env::var("LOAN_REVIEW_POLICY_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.policy_path);
        let prompt_template = env::var("LOAN_REVIEW_PROMPT_TEMPLATE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let narrative_enabled = parse_bool("NARRATIVE_ENABLED")?.unwrap_or(true);

        let ollama = OllamaSettings {
            base_url: env::var("OLLAMA_BASE_URL").unwrap_or(defaults.ollama.base_url),
            model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama.model),
            timeout: parse_var::<u64>("NARRATIVE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.ollama.timeout),
        };

        let base = defaults.thresholds;
        let thresholds = PolicyThresholds {
            minimum_credit_score: parse_var("POLICY_MIN_CREDIT_SCORE")?
                .unwrap_or(base.minimum_credit_score),
            maximum_dti: parse_var("POLICY_MAX_DTI")?.unwrap_or(base.maximum_dti),
            delinquency_warning_count: parse_var("POLICY_DELINQUENCY_WARN_AT")?
                .unwrap_or(base.delinquency_warning_count),
            affordability_multiple: parse_var("POLICY_AFFORDABILITY_MULTIPLE")?
                .unwrap_or(base.affordability_multiple),
            flag_warning_count: parse_var("POLICY_FLAG_WARN_COUNT")?
                .unwrap_or(base.flag_warning_count),
        };

        Ok(Self {
            data_dir,
            policy_path,
            prompt_template,
            narrative_enabled,
            ollama,
            thresholds,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        _ => Ok(None),
    }
}

fn parse_bool(name: &'static str) -> Result<Option<bool>, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const VARS: [&str; 16] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "LOAN_REVIEW_DATA_DIR",
        "LOAN_REVIEW_POLICY_PATH",
        "LOAN_REVIEW_PROMPT_TEMPLATE",
        "NARRATIVE_ENABLED",
        "NARRATIVE_TIMEOUT_SECS",
        "OLLAMA_BASE_URL",
        "OLLAMA_MODEL",
        "POLICY_MIN_CREDIT_SCORE",
        "POLICY_MAX_DTI",
        "POLICY_DELINQUENCY_WARN_AT",
        "POLICY_AFFORDABILITY_MULTIPLE",
        "POLICY_FLAG_WARN_COUNT",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in VARS {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.review.data_dir, PathBuf::from("data"));
        assert!(config.review.narrative_enabled);
        assert_eq!(config.review.ollama.model, "tinyllama");
        assert_eq!(config.review.ollama.timeout, Duration::from_secs(60));
        assert_eq!(config.review.thresholds, PolicyThresholds::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn threshold_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("POLICY_MIN_CREDIT_SCORE", "650");
        env::set_var("POLICY_AFFORDABILITY_MULTIPLE", "15");
        env::set_var("NARRATIVE_ENABLED", "off");
        env::set_var("NARRATIVE_TIMEOUT_SECS", "5");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.review.thresholds.minimum_credit_score, 650);
        assert_eq!(config.review.thresholds.affordability_multiple, 15.0);
        assert_eq!(config.review.thresholds.maximum_dti, 0.45);
        assert!(!config.review.narrative_enabled);
        assert_eq!(config.review.ollama.timeout, Duration::from_secs(5));
        reset_env();
    }

    #[test]
    fn rejects_unparseable_threshold() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("POLICY_MAX_DTI", "high");

        match AppConfig::load() {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, "POLICY_MAX_DTI");
                assert_eq!(value, "high");
            }
            other => panic!("expected invalid value error, got {other:?}"),
        }
        reset_env();
    }
}
