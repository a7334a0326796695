use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Upper bound of the input delay setting, in seconds.
pub const MAX_INPUT_DELAY_SECS: f64 = 10.0;
/// Default joystick dead zone, in percent of the full axis range.
pub const DEFAULT_DEAD_ZONE: u8 = 25;
/// Gap under which a key release counts as part of a virtual-keyboard
/// burst. Tuned on real devices; the first tuning used
/// [`LEGACY_BURST_THRESHOLD_MS`].
pub const DEFAULT_BURST_THRESHOLD_MS: u32 = 80;
/// Two PAL frames: the minimum for the MSX to see a key in its matrix.
pub const LEGACY_BURST_THRESHOLD_MS: u32 = 40;
const MAX_BURST_THRESHOLD_MS: u32 = 1000;

/// Input pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct InputConfig {
    /// Delay applied to input events before the machine sees them, seconds.
    pub input_delay: f64,
    /// Whether the emulator takes exclusive mouse and keyboard capture.
    pub grab_input: bool,
    /// Dead zone for joysticks without an explicit entry.
    pub default_dead_zone: u8,
    /// Per-joystick dead zone, keyed by 1-based joystick number.
    pub joystick_dead_zones: BTreeMap<u32, u8>,
    pub burst: BurstConfig,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            input_delay: 0.0,
            grab_input: false,
            default_dead_zone: DEFAULT_DEAD_ZONE,
            joystick_dead_zones: BTreeMap::new(),
            burst: BurstConfig::default(),
        }
    }
}

/// Re-timing of key releases that follow their press implausibly fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct BurstConfig {
    pub enabled: bool,
    pub threshold_ms: u32,
    /// Stamp each deferred release of one sync cycle 1 ms later than the
    /// previous one, so no two share a timestamp.
    pub restamp_increment: bool,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_ms: DEFAULT_BURST_THRESHOLD_MS,
            restamp_increment: true,
        }
    }
}

impl InputConfig {
    /// Clamp every value into its valid range.
    pub fn validate(&mut self) {
        self.input_delay = clamp_input_delay(self.input_delay);
        self.default_dead_zone = self.default_dead_zone.min(100);
        for zone in self.joystick_dead_zones.values_mut() {
            *zone = (*zone).min(100);
        }
        self.burst.threshold_ms = self.burst.threshold_ms.min(MAX_BURST_THRESHOLD_MS);
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut config: InputConfig =
            serde_json::from_str(content).context("Failed to parse input config")?;
        config.validate();
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no input config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Clamp an input delay to `[0, MAX_INPUT_DELAY_SECS]`. NaN becomes 0.
pub fn clamp_input_delay(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_INPUT_DELAY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = InputConfig::default();
        assert_eq!(config.input_delay, 0.0);
        assert!(!config.grab_input);
        assert_eq!(config.default_dead_zone, 25);
        assert!(config.burst.enabled);
        assert_eq!(config.burst.threshold_ms, DEFAULT_BURST_THRESHOLD_MS);
        assert!(config.burst.restamp_increment);
    }

    #[test]
    fn validate_clamps_ranges() {
        let mut config = InputConfig {
            input_delay: 42.0,
            default_dead_zone: 150,
            ..InputConfig::default()
        };
        config.joystick_dead_zones.insert(2, 200);
        config.burst.threshold_ms = 60_000;
        config.validate();

        assert_eq!(config.input_delay, 10.0);
        assert_eq!(config.default_dead_zone, 100);
        assert_eq!(config.joystick_dead_zones.get(&2), Some(&100));
        assert_eq!(config.burst.threshold_ms, 1000);
    }

    #[test]
    fn clamp_input_delay_edges() {
        assert_eq!(clamp_input_delay(-1.0), 0.0);
        assert_eq!(clamp_input_delay(f64::NAN), 0.0);
        assert_eq!(clamp_input_delay(0.25), 0.25);
        assert_eq!(clamp_input_delay(10.5), 10.0);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config =
            InputConfig::from_json_str(r#"{"inputDelay": 0.5, "burst": {"thresholdMs": 40}}"#)
                .unwrap();
        assert_eq!(config.input_delay, 0.5);
        assert_eq!(config.burst.threshold_ms, LEGACY_BURST_THRESHOLD_MS);
        assert!(config.burst.enabled);
        assert_eq!(config.default_dead_zone, 25);
    }

    #[test]
    fn out_of_range_json_is_clamped() {
        let config = InputConfig::from_json_str(r#"{"inputDelay": -3}"#).unwrap();
        assert_eq!(config.input_delay, 0.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(InputConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("input.json");

        let mut config = InputConfig {
            input_delay: 0.08,
            grab_input: true,
            ..InputConfig::default()
        };
        config.joystick_dead_zones.insert(1, 40);
        config.save(&path).unwrap();

        let loaded = InputConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = InputConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, InputConfig::default());
    }
}
