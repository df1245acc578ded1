//! Capture session configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_OUT_DIR: &str = "captures";
pub const DEFAULT_ROTATE_SECONDS: u64 = 300;
pub const DEFAULT_MAX_PAIRS: usize = 48;

/// Settings for one capture session. Immutable once the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSessionConfig {
    /// Interface the frames are captured on (recorded in every metadata line)
    pub interface: String,
    /// Directory holding the capture pairs
    pub out_dir: PathBuf,
    /// Maximum age of a pair before it is rotated
    pub rotate_interval: Duration,
    /// Number of pairs retention aims to keep
    pub max_pairs: usize,
    /// Whether the JSONL sidecar is written
    pub metadata: bool,
}

impl CaptureSessionConfig {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Self::default()
        }
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn with_rotate_seconds(mut self, seconds: u64) -> Self {
        self.rotate_interval = Duration::from_secs(seconds);
        self
    }

    pub fn with_max_pairs(mut self, max_pairs: usize) -> Self {
        self.max_pairs = max_pairs;
        self
    }

    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.metadata = enabled;
        self
    }

    /// Check the values a session cannot run with.
    #[must_use = "validation result must be checked"]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interface.trim().is_empty() {
            return Err(ConfigError::MissingInterface);
        }
        if self.rotate_interval < Duration::from_secs(1) {
            return Err(ConfigError::InvalidRotateInterval);
        }
        if self.max_pairs == 0 {
            return Err(ConfigError::InvalidMaxPairs);
        }
        Ok(())
    }

    /// Apply `ROTOCAP_*` environment variable overrides.
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var("ROTOCAP_OUT_DIR") {
            self.out_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("ROTOCAP_ROTATE_SECONDS") {
            let seconds = val.parse().map_err(|_| ConfigError::InvalidValue {
                key: "ROTOCAP_ROTATE_SECONDS",
                value: val.clone(),
            })?;
            self.rotate_interval = Duration::from_secs(seconds);
        }
        if let Ok(val) = std::env::var("ROTOCAP_MAX_FILES") {
            self.max_pairs = val.parse().map_err(|_| ConfigError::InvalidValue {
                key: "ROTOCAP_MAX_FILES",
                value: val.clone(),
            })?;
        }
        if let Ok(val) = std::env::var("ROTOCAP_NO_META") {
            match val.as_str() {
                "1" | "true" | "yes" => self.metadata = false,
                "0" | "false" | "no" | "" => {}
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "ROTOCAP_NO_META",
                        value: val,
                    })
                }
            }
        }
        Ok(self)
    }
}

impl Default for CaptureSessionConfig {
    fn default() -> Self {
        Self {
            interface: String::new(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            rotate_interval: Duration::from_secs(DEFAULT_ROTATE_SECONDS),
            max_pairs: DEFAULT_MAX_PAIRS,
            metadata: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "ROTOCAP_OUT_DIR",
            "ROTOCAP_ROTATE_SECONDS",
            "ROTOCAP_MAX_FILES",
            "ROTOCAP_NO_META",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_match_collector_defaults() {
        let config = CaptureSessionConfig::new("eth0");
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.out_dir, PathBuf::from("captures"));
        assert_eq!(config.rotate_interval, Duration::from_secs(300));
        assert_eq!(config.max_pairs, 48);
        assert!(config.metadata);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_interface() {
        let config = CaptureSessionConfig::new("  ");
        assert_eq!(config.validate(), Err(ConfigError::MissingInterface));
    }

    #[test]
    fn validate_rejects_zero_rotation() {
        let config = CaptureSessionConfig::new("eth0").with_rotate_seconds(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidRotateInterval));
    }

    #[test]
    fn validate_rejects_zero_max_pairs() {
        let config = CaptureSessionConfig::new("eth0").with_max_pairs(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxPairs));
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        clear_env();
        std::env::set_var("ROTOCAP_OUT_DIR", "/tmp/caps");
        std::env::set_var("ROTOCAP_ROTATE_SECONDS", "60");
        std::env::set_var("ROTOCAP_MAX_FILES", "3");
        std::env::set_var("ROTOCAP_NO_META", "1");

        let config = CaptureSessionConfig::new("eth0")
            .apply_env_overrides()
            .unwrap();
        clear_env();

        assert_eq!(config.out_dir, PathBuf::from("/tmp/caps"));
        assert_eq!(config.rotate_interval, Duration::from_secs(60));
        assert_eq!(config.max_pairs, 3);
        assert!(!config.metadata);
    }

    #[test]
    #[serial]
    fn env_override_rejects_garbage() {
        clear_env();
        std::env::set_var("ROTOCAP_MAX_FILES", "many");
        let result = CaptureSessionConfig::new("eth0").apply_env_overrides();
        clear_env();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "ROTOCAP_MAX_FILES",
                ..
            })
        ));
    }
}
