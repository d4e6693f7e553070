use crate::session::PolicyConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub motion: Option<MotionSection>,
    #[serde(default)]
    pub polling: Option<PollingSection>,
    #[serde(default)]
    pub sensor: Option<SensorSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MotionSection {
    pub threshold: Option<f32>,
    pub alpha: Option<f32>,
    pub start_stability: Option<u32>,
    pub stop_stability: Option<u32>,
    pub sampling_period_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PollingSection {
    pub moving_interval_ms: Option<u64>,
    pub stationary_interval_ms: Option<u64>,
    pub max_fix_accuracy_m: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorSection {
    /// IIO device directory holding `in_accel_*_raw` channels
    pub iio_device: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("configuration rejected: {0}")]
    Rejected(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    /// Builds the session policy, falling back to defaults for missing fields.
    ///
    /// Stability counts and the sampling period are clamped rather than rejected;
    /// a smoothing factor outside `[0, 1)` or a negative threshold is an error.
    pub fn policy_config(&self) -> Result<PolicyConfig, ConfigError> {
        let defaults = PolicyConfig::default();
        let motion = self.motion.clone().unwrap_or_default();
        let polling = self.polling.clone().unwrap_or_default();

        let alpha = motion.alpha.unwrap_or(defaults.alpha);
        if !(0.0..1.0).contains(&alpha) {
            return Err(ConfigError::Rejected(format!(
                "motion.alpha must be in [0, 1), got {alpha}"
            )));
        }

        let motion_threshold = motion.threshold.unwrap_or(defaults.motion_threshold);
        if !motion_threshold.is_finite() || motion_threshold < 0.0 {
            return Err(ConfigError::Rejected(format!(
                "motion.threshold must be a non-negative number, got {motion_threshold}"
            )));
        }

        let max_fix_accuracy_m = polling
            .max_fix_accuracy_m
            .unwrap_or(defaults.max_fix_accuracy_m);
        if max_fix_accuracy_m.is_nan() || max_fix_accuracy_m <= 0.0 {
            return Err(ConfigError::Rejected(format!(
                "polling.max_fix_accuracy_m must be positive, got {max_fix_accuracy_m}"
            )));
        }

        let moving_interval = polling
            .moving_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.moving_interval);
        let stationary_interval = polling
            .stationary_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.stationary_interval);
        if moving_interval.is_zero() || stationary_interval.is_zero() {
            return Err(ConfigError::Rejected(
                "polling intervals must be non-zero".to_string(),
            ));
        }

        let config = PolicyConfig {
            motion_threshold,
            alpha,
            moving_interval,
            stationary_interval,
            max_fix_accuracy_m,
            ..defaults
        }
        .with_stability(
            motion.start_stability.unwrap_or(defaults.start_stability),
            motion.stop_stability.unwrap_or(defaults.stop_stability),
        )
        .with_sampling_period(
            motion
                .sampling_period_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.sampling_period),
        );

        Ok(config)
    }

    /// Returns the configured IIO device, or None to autodetect.
    pub fn iio_device(&self) -> Option<&Path> {
        let path = self.sensor.as_ref()?.iio_device.as_deref()?;
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Returns the configured log level, or None if it is not a valid level name.
    pub fn log_level(&self) -> Option<tracing::Level> {
        self.logging.level.parse().ok()
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn write_temp_config(tag: &str, contents: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("geo-activity-{tag}-{unique}.toml"));
        fs::write(&path, contents)?;
        Ok(path)
    }

    const MINIMAL: &str = r#"
[app]
name = "geo-activity"

[logging]
level = "debug"
"#;

    #[test]
    fn default_config_matches_documented_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_default()?;
        let policy = config.policy_config()?;

        assert_eq!(policy, PolicyConfig::default());
        assert!(config.iio_device().is_none());
        assert_eq!(config.server_port(), 8080);
        assert_eq!(config.log_level(), Some(tracing::Level::INFO));
        Ok(())
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp_config("minimal", MINIMAL)?;

        let result = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(result.policy_config()?, PolicyConfig::default());
        assert_eq!(result.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(result.log_level(), Some(tracing::Level::DEBUG));
        Ok(())
    }

    #[test]
    fn stability_and_sampling_period_are_clamped() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!(
            "{MINIMAL}\n[motion]\nstart_stability = 0\nstop_stability = 0\nsampling_period_ms = 5\n"
        );
        let path = write_temp_config("clamped", &contents)?;

        let result = load_from_path(&path)?;
        let _ = fs::remove_file(&path);
        let policy = result.policy_config()?;

        assert_eq!(policy.start_stability, 1);
        assert_eq!(policy.stop_stability, 1);
        assert_eq!(policy.sampling_period, Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn alpha_out_of_range_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[motion]\nalpha = 1.0\n");
        let path = write_temp_config("alpha", &contents)?;

        let result = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert!(matches!(
            result.policy_config(),
            Err(ConfigError::Rejected(_))
        ));
        Ok(())
    }

    #[test]
    fn zero_polling_interval_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[polling]\nmoving_interval_ms = 0\n");
        let path = write_temp_config("interval", &contents)?;

        let result = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert!(matches!(
            result.policy_config(),
            Err(ConfigError::Rejected(_))
        ));
        Ok(())
    }

    #[test]
    fn configured_iio_device_is_returned() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[sensor]\niio_device = \"/sys/bus/iio/devices/iio:device3\"\n");
        let path = write_temp_config("iio", &contents)?;

        let result = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(
            result.iio_device(),
            Some(Path::new("/sys/bus/iio/devices/iio:device3"))
        );
        Ok(())
    }

    #[test]
    fn missing_config_file_returns_read_error() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("geo-activity-missing-{unique}.toml"));

        let result = load_from_path(&path);

        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn invalid_toml_returns_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp_config("invalid", "not = [valid")?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }
}
