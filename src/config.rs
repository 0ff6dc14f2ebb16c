//! Configuration loading.
//!
//! Settings come from `airlens.toml` (every field optional, every section
//! defaulted) and may be overridden from the environment or a `.env` file:
//!
//! | variable            | overrides            |
//! |---------------------|----------------------|
//! | `AIRLENS_API_URL`   | `api.base_url`       |
//! | `AIRLENS_TOP_N`     | `api.top_n`          |
//! | `AIRLENS_METRIC`    | `api.default_metric` |
//! | `AIRLENS_LOG_LEVEL` | `logging.level`      |
//! | `AIRLENS_LOG_FILE`  | `logging.file`       |

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::classify::{ScaleError, SeverityScale};
use crate::highlight::{FLY_ALTITUDE, FLY_DURATION_MS};
use crate::ingest::airlens::DEFAULT_BASE_URL;
use crate::logging::LogLevel;
use crate::model::Metric;
use crate::store::DEFAULT_TOP_N;

pub const DEFAULT_CONFIG_PATH: &str = "./airlens.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub severity: SeverityScale,
    pub globe: GlobeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Length of the "most polluted" list.
    pub top_n: usize,
    pub default_metric: Metric,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            top_n: DEFAULT_TOP_N,
            default_metric: Metric::Composite,
        }
    }
}

/// Presentation constants handed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub point_radius: f64,
    pub highlight_radius: f64,
    pub point_altitude: f64,
    pub camera_altitude: f64,
    pub fly_duration_ms: u32,
    pub ring_color: String,
    pub ring_max_radius: f64,
    pub ring_propagation_speed: f64,
    pub ring_repeat_period_ms: u32,
    /// Snapshot age after which a stale notice is shown.
    pub stale_after_minutes: u64,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            point_radius: 0.3,
            highlight_radius: 1.0,
            point_altitude: 0.01,
            camera_altitude: FLY_ALTITUDE,
            fly_duration_ms: FLY_DURATION_MS,
            ring_color: "yellow".to_string(),
            ring_max_radius: 10.0,
            ring_propagation_speed: 6.0,
            ring_repeat_period_ms: 1000,
            stale_after_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            timestamps: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse(String),
    InvalidScale(ScaleError),
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "Cannot read {}: {}", path, message),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::InvalidScale(e) => write!(f, "Invalid severity scale: {}", e),
            ConfigError::InvalidValue { key, message } => write!(f, "Invalid value for {}: {}", key, message),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.severity.validate().map_err(ConfigError::InvalidScale)?;

        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("api.base_url", format!("'{}' is not an http(s) URL", url)));
        }
        if self.api.top_n == 0 {
            return Err(invalid("api.top_n", "must be at least 1"));
        }
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be at least 1"));
        }
        if !(self.globe.point_radius > 0.0 && self.globe.highlight_radius > 0.0) {
            return Err(invalid("globe.point_radius", "point radii must be positive"));
        }
        if !(self.globe.camera_altitude > 0.0) {
            return Err(invalid("globe.camera_altitude", "must be positive"));
        }
        Ok(())
    }

    /// Applies environment overrides. `lookup` is injected so tests need not
    /// touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("AIRLENS_API_URL") {
            self.api.base_url = url;
        }
        if let Some(top) = lookup("AIRLENS_TOP_N") {
            self.api.top_n = top
                .trim()
                .parse()
                .map_err(|_| invalid("AIRLENS_TOP_N", format!("'{}' is not a number", top)))?;
        }
        if let Some(metric) = lookup("AIRLENS_METRIC") {
            self.api.default_metric = metric.parse().map_err(|e: String| invalid("AIRLENS_METRIC", e))?;
        }
        if let Some(level) = lookup("AIRLENS_LOG_LEVEL") {
            self.logging.level = level.parse().map_err(|e: String| invalid("AIRLENS_LOG_LEVEL", e))?;
        }
        if let Some(file) = lookup("AIRLENS_LOG_FILE") {
            self.logging.file = Some(file).filter(|f| !f.trim().is_empty());
        }
        self.validate()
    }
}

/// Parses and validates a TOML document.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_config(&text)
}

/// Loads `path` if it exists, otherwise starts from defaults; then applies
/// `.env` and process environment overrides.
pub fn load_from_env(path: &Path) -> Result<Config, ConfigError> {
    dotenv::dotenv().ok();

    let mut config = if path.exists() {
        load_config(path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Pollutant;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = parse_config("").expect("empty config is valid");
        assert_eq!(config, Config::default());
        assert_eq!(config.api.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.api.top_n, 10);
        assert_eq!(config.globe.fly_duration_ms, 1500);
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"
            [api]
            base_url = "https://airlens.example.org"
            default_metric = "NO2"

            [severity]
            severe = 0.9

            [logging]
            level = "debug"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.api.base_url, "https://airlens.example.org");
        assert_eq!(config.api.default_metric, Metric::Gas(Pollutant::No2));
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.severity.severe, 0.9);
        assert_eq!(config.severity.moderate, 0.2);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_out_of_order_severity_scale_is_rejected() {
        let result = parse_config(
            r#"
            [severity]
            moderate = 0.5
            poor = 0.4
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidScale(_))), "got {:?}", result);
    }

    #[test]
    fn test_unknown_metric_is_a_parse_error() {
        let result = parse_config("[api]\ndefault_metric = \"PM25\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))), "got {:?}", result);
    }

    #[test]
    fn test_zero_top_n_is_rejected() {
        assert!(matches!(
            parse_config("[api]\ntop_n = 0\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AIRLENS_API_URL", "http://10.0.0.5:5000"),
            ("AIRLENS_TOP_N", "25"),
            ("AIRLENS_METRIC", "so2"),
            ("AIRLENS_LOG_FILE", "/tmp/airlens.log"),
        ]);
        let mut config = Config::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .expect("valid overrides");

        assert_eq!(config.api.base_url, "http://10.0.0.5:5000");
        assert_eq!(config.api.top_n, 25);
        assert_eq!(config.api.default_metric, Metric::Gas(Pollutant::So2));
        assert_eq!(config.logging.file.as_deref(), Some("/tmp/airlens.log"));
    }

    #[test]
    fn test_non_numeric_top_n_override_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|k| (k == "AIRLENS_TOP_N").then(|| "ten".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = load_config(Path::new("./definitely-not-here/airlens.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
