//! # Display Configuration
//!
//! Loaded from TOML at startup and again on reload. Every key is optional;
//! missing keys fall back to the defaults in `companion_shared::constants`.
//!
//! ```toml
//! label_template = "%player%'s %pet% (Lvl. %level%)"
//! tick_period = 1
//!
//! [pose]
//! bob_amplitude = 0.2
//! ```

use std::path::Path;

use companion_shared::constants::{
    BOB_AMPLITUDE, BOB_FREQUENCY, DEFAULT_INITIAL_DELAY, DEFAULT_TICK_PERIOD,
    MIN_HORIZONTAL_OFFSET, SIDE_ANGLE_DEGREES, SPIN_DEGREES,
};
use serde::{Deserialize, Serialize};

use crate::error::{DisplayError, DisplayResult};

/// Label shown above a companion when the config does not set one.
pub const DEFAULT_LABEL_TEMPLATE: &str = "%player%'s %pet% (Lvl. %level%)";

/// Default size of the mutation worker's command channel.
pub const DEFAULT_MUTATION_QUEUE_CAPACITY: usize = 4096;

/// Geometry of the companion pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Rotation of the offset around the vertical axis (degrees).
    pub side_angle_degrees: f64,
    /// Minimum magnitude of each horizontal offset component.
    pub min_horizontal_offset: f64,
    /// Height of the vertical bob.
    pub bob_amplitude: f64,
    /// Phase multiplier of the vertical bob.
    pub bob_frequency: f64,
    /// Yaw advance factor (degrees per 2π ticks).
    pub spin_degrees: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            side_angle_degrees: SIDE_ANGLE_DEGREES,
            min_horizontal_offset: MIN_HORIZONTAL_OFFSET,
            bob_amplitude: BOB_AMPLITUDE,
            bob_frequency: BOB_FREQUENCY,
            spin_degrees: SPIN_DEGREES,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Label template; `%player%`, `%pet%` and `%level%` are substituted.
    pub label_template: String,
    /// Ticks before a new task's first invocation.
    pub initial_delay: u32,
    /// Ticks between invocations of an actor's task.
    pub tick_period: u32,
    /// Capacity of the mutation worker's command channel.
    pub mutation_queue_capacity: usize,
    /// Pose geometry.
    pub pose: PoseConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            label_template: DEFAULT_LABEL_TEMPLATE.to_string(),
            initial_delay: DEFAULT_INITIAL_DELAY,
            tick_period: DEFAULT_TICK_PERIOD,
            mutation_queue_capacity: DEFAULT_MUTATION_QUEUE_CAPACITY,
            pose: PoseConfig::default(),
        }
    }
}

impl DisplayConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` for malformed TOML and `InvalidConfig` for
    /// values that fail [`DisplayConfig::validate`].
    pub fn from_toml_str(text: &str) -> DisplayResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| DisplayError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigRead` if the file cannot be read, otherwise the errors
    /// of [`DisplayConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> DisplayResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DisplayError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending key.
    pub fn validate(&self) -> DisplayResult<()> {
        if self.label_template.trim().is_empty() {
            return Err(DisplayError::InvalidConfig(
                "label_template must not be empty".to_string(),
            ));
        }
        if self.tick_period == 0 {
            return Err(DisplayError::InvalidConfig(
                "tick_period must be at least 1".to_string(),
            ));
        }
        if self.mutation_queue_capacity == 0 {
            return Err(DisplayError::InvalidConfig(
                "mutation_queue_capacity must be at least 1".to_string(),
            ));
        }

        let pose = &self.pose;
        for (key, value) in [
            ("pose.side_angle_degrees", pose.side_angle_degrees),
            ("pose.min_horizontal_offset", pose.min_horizontal_offset),
            ("pose.bob_amplitude", pose.bob_amplitude),
            ("pose.bob_frequency", pose.bob_frequency),
            ("pose.spin_degrees", pose.spin_degrees),
        ] {
            if !value.is_finite() {
                return Err(DisplayError::InvalidConfig(format!("{key} must be finite")));
            }
        }
        if pose.min_horizontal_offset < 0.0 || pose.bob_amplitude < 0.0 {
            return Err(DisplayError::InvalidConfig(
                "pose offsets and amplitudes must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DisplayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_period, 1);
        assert_eq!(config.pose.side_angle_degrees, 30.0);
        assert_eq!(config.pose.bob_amplitude, 0.15);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DisplayConfig::from_toml_str(
            r#"
            label_template = "%pet% of %player%"

            [pose]
            bob_amplitude = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.label_template, "%pet% of %player%");
        assert_eq!(config.pose.bob_amplitude, 0.25);
        assert_eq!(config.pose.min_horizontal_offset, 0.5);
        assert_eq!(config.initial_delay, 1);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = DisplayConfig::from_toml_str("").unwrap();
        assert_eq!(config, DisplayConfig::default());
    }

    #[test]
    fn test_rejects_zero_period() {
        let err = DisplayConfig::from_toml_str("tick_period = 0").unwrap_err();
        assert!(matches!(err, DisplayError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = DisplayConfig::from_toml_str("tick_period = \"fast\"").unwrap_err();
        assert!(matches!(err, DisplayError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("companion_display_missing_config.toml");
        let err = DisplayConfig::load(&path).unwrap_err();
        assert!(matches!(err, DisplayError::ConfigRead { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("companion_display_{id}.toml"));
        std::fs::write(&path, "tick_period = 2\n").unwrap();

        let config = DisplayConfig::load(&path).unwrap();
        assert_eq!(config.tick_period, 2);

        std::fs::remove_file(&path).ok();
    }
}
