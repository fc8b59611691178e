//! # Settings Module
//!
//! ## Purpose
//! Run configuration of a simulation: RNG seed, volume and molar-factor scale,
//! rescheduling tolerance, reaction-generation depth and the run limits.
//!
//! ## Key Features
//! - **Serde persistence**: `SimConfig` is read from and written to pretty JSON
//! - **Defaults**: a missing file or a missing field falls back to the defaults
//! - **Exact by default**: the tolerance band defaults to 1.0/1.0, i.e. every
//!   change of propensity reschedules the reaction
//!
//! ## Configuration Format
//! ```json
//! {
//!   "seed": 42,
//!   "volume": 1.0,
//!   "avogadro_scale": 6.02214076e23,
//!   "tolerance": { "low": 1.0, "high": 1.0 },
//!   "generate_depth": 0,
//!   "wall_clock_limit_secs": null,
//!   "max_events": null
//! }
//! ```
use crate::simulation::SimError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const AVOGADRO: f64 = 6.02214076e23;

/// Relative band inside which a changed propensity keeps the pending firing time.
///
/// A reaction is rescheduled when `new > last * high` or `new < last * low`.
/// With `low = high = 1.0` any change reschedules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBand {
    pub low: f64,
    pub high: f64,
}

impl Default for ToleranceBand {
    fn default() -> Self {
        Self::exact()
    }
}

impl ToleranceBand {
    pub fn exact() -> Self {
        Self {
            low: 1.0,
            high: 1.0,
        }
    }

    /// symmetric band of relative width `slack`, e.g. 0.05 for +-5%
    pub fn relative(slack: f64) -> Self {
        Self {
            low: 1.0 - slack,
            high: 1.0 + slack,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.low == 1.0 && self.high == 1.0
    }
}

/// Simulation configuration.
///
/// # Fields
/// * `seed` - seed of the ChaCha RNG driving firing times
/// * `volume` - initial volume
/// * `avogadro_scale` - molar factor is `avogadro_scale * volume`
/// * `tolerance` - rescheduling tolerance band
/// * `generate_depth` - notification depth of newly populated species
/// * `wall_clock_limit_secs` - optional real-time budget of `run`
/// * `max_events` - optional cap on executed events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub volume: f64,
    pub avogadro_scale: f64,
    pub tolerance: ToleranceBand,
    pub generate_depth: i32,
    pub wall_clock_limit_secs: Option<f64>,
    pub max_events: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            volume: 1.0,
            avogadro_scale: AVOGADRO,
            tolerance: ToleranceBand::exact(),
            generate_depth: 0,
            wall_clock_limit_secs: None,
            max_events: None,
        }
    }
}

impl SimConfig {
    /// configuration whose molar factor is exactly `volume`; handy for unit-free models
    pub fn unit_molar(volume: f64) -> Self {
        Self {
            volume,
            avogadro_scale: 1.0,
            ..Self::default()
        }
    }

    pub fn molar_factor(&self) -> f64 {
        self.avogadro_scale * self.volume
    }

    /// Loads a configuration from a JSON file, falling back to the defaults
    /// when the file does not exist. A file that exists but does not parse is an error.
    pub fn load_config(config_file: &str) -> Result<SimConfig, SimError> {
        if Path::new(config_file).exists() {
            let content = fs::read_to_string(config_file)?;
            let config: SimConfig = serde_json::from_str(&content)?;
            info!("configuration loaded from {}", config_file);
            Ok(config)
        } else {
            warn!("{} not found, using default configuration", config_file);
            Ok(SimConfig::default())
        }
    }

    pub fn save_config(&self, config_file: &str) -> Result<(), SimError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_file, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_exact() {
        let config = SimConfig::default();
        assert!(config.tolerance.is_exact());
        assert_eq!(config.seed, 42);
        assert_relative_eq!(config.molar_factor(), AVOGADRO);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let mut config = SimConfig::unit_molar(2.0);
        config.tolerance = ToleranceBand::relative(0.1);
        config.max_events = Some(500);
        config.save_config(&path).unwrap();
        let loaded = SimConfig::load_config(&path).unwrap();
        assert_eq!(loaded, config);
        assert_relative_eq!(loaded.molar_factor(), 2.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"seed\": 7, \"generate_depth\": 2}}").unwrap();
        let config = SimConfig::load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.generate_depth, 2);
        assert_relative_eq!(config.volume, 1.0);
        assert!(config.tolerance.is_exact());
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = SimConfig::load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_broken_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let result = SimConfig::load_config(file.path().to_str().unwrap());
        assert!(matches!(result, Err(SimError::Json(_))));
    }
}
