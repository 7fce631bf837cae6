//! Scene configuration: scale, gravity, tick bound and table/floor layout.
//!
//! ```yaml
//! px_per_meter: 400.0
//! gravity: 9.81
//! max_dt: 0.05
//! table_width_fraction: 0.65
//! table_top: 440.0
//! floor: 720.0
//! track_mass: 1.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Scene pixels per meter.
    pub px_per_meter: f64,
    /// Gravitational acceleration (m/s²).
    pub gravity: f64,
    /// Longest tick the integrator accepts (s). Longer frames are clamped.
    pub max_dt: f64,
    /// Share of the playable width covered by the centered table.
    pub table_width_fraction: f64,
    /// y of the table top (px).
    pub table_top: f64,
    /// y of the floor (px).
    pub floor: f64,
    /// Mass of a bare track, used for centre-of-mass checks (kg).
    pub track_mass: f64,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            px_per_meter: 400.0,
            gravity: 9.81,
            max_dt: 0.05,
            table_width_fraction: 0.65,
            table_top: 440.0,
            floor: 720.0,
            track_mass: 1.0,
        }
    }
}

impl LabConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: LabConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.px_per_meter <= 0.0 {
            return Err(ConfigError::Invalid("px_per_meter must be positive".into()));
        }
        if self.max_dt <= 0.0 {
            return Err(ConfigError::Invalid("max_dt must be positive".into()));
        }
        if !(self.table_width_fraction > 0.0 && self.table_width_fraction <= 1.0) {
            return Err(ConfigError::Invalid(
                "table_width_fraction must be in (0, 1]".into(),
            ));
        }
        if self.floor < self.table_top {
            return Err(ConfigError::Invalid("floor must lie below the table top".into()));
        }
        Ok(())
    }

    /// Gravity in px/s².
    pub fn gravity_px(&self) -> f64 {
        self.gravity * self.px_per_meter
    }

    /// Clamp a frame duration to `[0, max_dt]`.
    pub fn clamp_dt(&self, dt: f64) -> f64 {
        if dt.is_finite() {
            dt.clamp(0.0, self.max_dt)
        } else {
            0.0
        }
    }
}

/// Horizontal extent and height of the table plus the floor height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub floor: f64,
}

impl TableBounds {
    /// Table centered in a playable area of `stage_width` px.
    pub fn centered(stage_width: f64, config: &LabConfig) -> Self {
        let width = stage_width * config.table_width_fraction;
        let left = (stage_width - width) * 0.5;
        Self {
            left,
            right: left + width,
            top: config.table_top,
            floor: config.floor,
        }
    }

    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.left && x <= self.right
    }
}
