//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::axis::sampler::FilterPolicy;
use crate::error::{MotionPadError, Result};
use crate::input::classifier::ActionPolicy;
use crate::packet::protocol::ButtonId;
use crate::pipeline::aggregator::{AggregationMode, JoinStrategy};

/// Baud rates accepted on the serial link
pub const VALID_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

/// Where [`Config::load_or_default`] got its values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub axis: AxisConfig,

    #[serde(default)]
    pub orientation: OrientationConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; empty auto-detects
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Aggregator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_mode")]
    pub mode: AggregationMode,

    #[serde(default = "default_join")]
    pub join: JoinStrategy,

    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
}

/// Button input configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_action_policy")]
    pub action_policy: ActionPolicy,

    #[serde(default = "default_primary_fire_pin")]
    pub primary_fire_pin: u32,

    #[serde(default = "default_secondary_fire_pin")]
    pub secondary_fire_pin: u32,

    #[serde(default = "default_interact_pin")]
    pub interact_pin: u32,

    #[serde(default = "default_jump_pin")]
    pub jump_pin: u32,
}

/// Joystick sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AxisConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_filter")]
    pub filter: FilterPolicy,

    #[serde(default = "default_x_channel")]
    pub x_channel: u8,

    #[serde(default = "default_y_channel")]
    pub y_channel: u8,
}

/// Inertial sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OrientationConfig {
    /// Task period, also used as the fusion sample period
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_fusion_gain")]
    pub fusion_gain: f32,
}

/// Pipeline statistics log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_stats_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file; stderr only when unset
    #[serde(default)]
    pub file_dir: Option<String>,
}

/// Host-side simulated peripherals
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Time between scripted button presses
    #[serde(default = "default_button_interval_ms")]
    pub button_interval_ms: u64,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }

fn default_mode() -> AggregationMode { AggregationMode::Combined }
fn default_join() -> JoinStrategy { JoinStrategy::Concurrent }
fn default_receive_timeout_ms() -> u64 { 1000 }

fn default_period_ms() -> u64 { 10 }
fn default_action_policy() -> ActionPolicy { ActionPolicy::FixedRate }
fn default_primary_fire_pin() -> u32 { 2 }
fn default_secondary_fire_pin() -> u32 { 3 }
fn default_interact_pin() -> u32 { 4 }
fn default_jump_pin() -> u32 { 5 }

fn default_filter() -> FilterPolicy { FilterPolicy::Classification }
fn default_x_channel() -> u8 { 0 }
fn default_y_channel() -> u8 { 1 }

fn default_fusion_gain() -> f32 { 0.98 }

fn default_stats_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_stats_interval_ms() -> u64 { 1000 }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_button_interval_ms() -> u64 { 500 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            join: default_join(),
            receive_timeout_ms: default_receive_timeout_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            action_policy: default_action_policy(),
            primary_fire_pin: default_primary_fire_pin(),
            secondary_fire_pin: default_secondary_fire_pin(),
            interact_pin: default_interact_pin(),
            jump_pin: default_jump_pin(),
        }
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            filter: default_filter(),
            x_channel: default_x_channel(),
            y_channel: default_y_channel(),
        }
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            fusion_gain: default_fusion_gain(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            log_dir: default_log_dir(),
            interval_ms: default_stats_interval_ms(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            button_interval_ms: default_button_interval_ms(),
        }
    }
}

impl InputConfig {
    /// GPIO pin for each button, in action-code order
    pub fn button_lines(&self) -> [(u32, ButtonId); 4] {
        [
            (self.primary_fire_pin, ButtonId::PrimaryFire),
            (self.secondary_fire_pin, ButtonId::SecondaryFire),
            (self.interact_pin, ButtonId::Interact),
            (self.jump_pin, ButtonId::Jump),
        ]
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl AxisConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl OrientationConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl PipelineConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

fn config_error(msg: impl std::fmt::Display) -> MotionPadError {
    MotionPadError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use motionpad::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    ///
    /// Nothing is logged here; the caller reports the [`ConfigSource`] once
    /// logging is up.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be parsed or is invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::load(path)?, ConfigSource::File))
        } else {
            Ok((Self::default(), ConfigSource::Defaults))
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial port may be empty (auto-detect)
        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(config_error(format!(
                "baud_rate must be one of {:?}",
                VALID_BAUD_RATES
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(config_error("timeout_ms must be between 1 and 10000"));
        }

        if self.pipeline.receive_timeout_ms == 0 || self.pipeline.receive_timeout_ms > 60000 {
            return Err(config_error("receive_timeout_ms must be between 1 and 60000"));
        }

        // Task periods
        for (name, value) in [
            ("input.period_ms", self.input.period_ms),
            ("axis.period_ms", self.axis.period_ms),
            ("orientation.period_ms", self.orientation.period_ms),
        ] {
            if value == 0 || value > 1000 {
                return Err(config_error(format!("{} must be between 1 and 1000", name)));
            }
        }

        let lines = self.input.button_lines();
        for (i, (pin, button)) in lines.iter().enumerate() {
            if lines[..i].iter().any(|(other, _)| other == pin) {
                return Err(config_error(format!(
                    "GPIO {} assigned to more than one button ({:?})",
                    pin, button
                )));
            }
        }

        if self.axis.x_channel == self.axis.y_channel {
            return Err(config_error("x_channel and y_channel must differ"));
        }

        if !(0.0..=1.0).contains(&self.orientation.fusion_gain) {
            return Err(config_error("fusion_gain must be between 0.0 and 1.0"));
        }

        if self.stats.enabled && self.stats.log_dir.is_empty() {
            return Err(config_error("stats log_dir cannot be empty when enabled"));
        }

        if self.stats.interval_ms == 0 || self.stats.interval_ms > 60000 {
            return Err(config_error("interval_ms must be between 1 and 60000"));
        }

        if self.stats.max_records_per_file == 0 {
            return Err(config_error("max_records_per_file must be greater than 0"));
        }

        if self.stats.max_files_to_keep == 0 {
            return Err(config_error("max_files_to_keep must be greater than 0"));
        }

        if self.simulation.button_interval_ms == 0 {
            return Err(config_error("button_interval_ms must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.pipeline.mode, AggregationMode::Combined);
        assert_eq!(config.pipeline.join, JoinStrategy::Concurrent);
        assert_eq!(config.pipeline.receive_timeout(), Duration::from_millis(1000));
        assert_eq!(config.input.period(), Duration::from_millis(10));
        assert_eq!(config.axis.period(), Duration::from_millis(10));
        assert_eq!(config.orientation.period(), Duration::from_millis(10));
        assert_eq!(config.axis.filter, FilterPolicy::Classification);
        assert_eq!(config.input.action_policy, ActionPolicy::FixedRate);
        assert!(config.logging.file_dir.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            [pipeline]
            mode = "simple"

            [input]
            action_policy = "edge_triggered"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pipeline.mode, AggregationMode::Simple);
        assert_eq!(config.pipeline.join, JoinStrategy::Concurrent);
        assert_eq!(config.input.action_policy, ActionPolicy::EdgeTriggered);
        assert_eq!(config.input.jump_pin, 5);
        assert_eq!(config.stats.max_files_to_keep, 10);
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let toml_str = r#"
            [axis]
            filter = "kalman"
        "#;
        let result: std::result::Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [serial]
            port = "/dev/ttyACM1"
            baud_rate = 921600

            [pipeline]
            mode = "combined"
            join = "sequential"
            receive_timeout_ms = 250

            [axis]
            filter = "moving_average"

            [logging]
            file_dir = "/tmp/motionpad"
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM1");
        assert_eq!(config.serial.baud_rate, 921600);
        assert_eq!(config.pipeline.join, JoinStrategy::Sequential);
        assert_eq!(config.pipeline.receive_timeout_ms, 250);
        assert_eq!(config.axis.filter, FilterPolicy::MovingAverage);
        assert_eq!(config.logging.file_dir.as_deref(), Some("/tmp/motionpad"));
    }

    #[test]
    fn test_load_invalid_file_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[input]\nperiod_ms = 0").unwrap();

        assert!(matches!(
            Config::load(file.path()),
            Err(MotionPadError::Config(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, source) = Config::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_load_or_default_existing_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[serial]\nbaud_rate = 9600").unwrap();

        let (config, source) = Config::load_or_default(file.path()).unwrap();
        assert_eq!(source, ConfigSource::File);
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(dir.path().join("missing.toml")),
            Err(MotionPadError::Io(_))
        ));
    }

    #[test]
    fn test_button_lines_order() {
        let lines = InputConfig::default().button_lines();
        assert_eq!(
            lines,
            [
                (2, ButtonId::PrimaryFire),
                (3, ButtonId::SecondaryFire),
                (4, ButtonId::Interact),
                (5, ButtonId::Jump),
            ]
        );
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_empty_serial_port_allowed() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in VALID_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_receive_timeout_zero() {
        let mut config = Config::default();
        config.pipeline.receive_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_period_bounds() {
        let mut config = Config::default();
        config.axis.period_ms = 1001;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.orientation.period_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input.period_ms = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_button_pin() {
        let mut config = Config::default();
        config.input.jump_pin = config.input.primary_fire_pin;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_adc_channel_for_both_axes() {
        let mut config = Config::default();
        config.axis.y_channel = config.axis.x_channel;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fusion_gain_out_of_range() {
        let mut config = Config::default();
        config.orientation.fusion_gain = 1.5;
        assert!(config.validate().is_err());
        config.orientation.fusion_gain = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.stats.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.stats.enabled = false;
        config.stats.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stats_limits_zero() {
        let mut config = Config::default();
        config.stats.max_records_per_file = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stats.max_files_to_keep = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stats.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_button_interval_zero() {
        let mut config = Config::default();
        config.simulation.button_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyUSB0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_timeout_ms(), 100);
        assert_eq!(default_receive_timeout_ms(), 1000);
        assert_eq!(default_period_ms(), 10);
        assert_eq!(default_primary_fire_pin(), 2);
        assert_eq!(default_secondary_fire_pin(), 3);
        assert_eq!(default_interact_pin(), 4);
        assert_eq!(default_jump_pin(), 5);
        assert_eq!(default_x_channel(), 0);
        assert_eq!(default_y_channel(), 1);
        assert_eq!(default_fusion_gain(), 0.98);
        assert!(default_stats_enabled());
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_stats_interval_ms(), 1000);
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_button_interval_ms(), 500);
    }
}
