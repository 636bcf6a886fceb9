//! Forecaster configuration.
//!
//! Configuration is read from TOML.
//!
//! # Example:
//! ```toml
//! kind = "lim"
//!
//! [calibration]
//! filename = "/data/calib/air.mon.mean.nc"
//! varname = "air"
//! dataformat = "NCD"
//! regrid_factor = 2
//!
//! [lim]
//! wsize = 12
//! fcast_times = [1.0]
//! fcast_num_pcs = 10
//! detrend = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::forecast::ForecasterKind;
use crate::operator::OperatorTolerances;
use crate::types::LimError;

/// Top-level forecaster configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Which forecasting strategy to build.
    pub kind: ForecasterKind,

    /// Where the calibration data lives and how to regrid it.
    pub calibration: CalibrationConfig,

    /// LIM fitting and forecasting parameters.
    pub lim: LimConfig,
}

/// Calibration data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Path to the calibration file
    pub filename: PathBuf,

    /// Variable to read from the file
    pub varname: String,

    /// File format tag; only "NCD" (NetCDF) is recognized
    pub dataformat: String,

    /// Block-averaging factor applied to the lat/lon grid before fitting
    pub regrid_factor: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            filename: PathBuf::new(),
            varname: String::new(),
            dataformat: "NCD".to_string(),
            regrid_factor: 1,
        }
    }
}

/// LIM parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimConfig {
    /// Lag window τ, in calibration time steps
    pub wsize: usize,

    /// Forecast lead times, in calibration time steps
    pub fcast_times: Vec<f64>,

    /// Number of retained EOF components
    pub fcast_num_pcs: usize,

    /// Remove a linear trend from each PC before estimating covariances
    pub detrend: bool,

    /// Tolerated imaginary part of log G(τ), relative to max(1, max |Re L|)
    pub imag_tolerance: f64,

    /// Reciprocal condition number below which C(0) is singular
    pub singular_tolerance: f64,
}

impl Default for LimConfig {
    fn default() -> Self {
        let tol = OperatorTolerances::default();
        Self {
            wsize: 1,
            fcast_times: vec![1.0],
            fcast_num_pcs: 10,
            detrend: true,
            imag_tolerance: tol.imag_tolerance,
            singular_tolerance: tol.singular_tolerance,
        }
    }
}

impl LimConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), LimError> {
        if self.wsize == 0 {
            return Err(LimError::InvalidInput("wsize must be at least 1".into()));
        }
        if self.fcast_times.is_empty() {
            return Err(LimError::InvalidInput(
                "at least one forecast lead time is required".into(),
            ));
        }
        if let Some(bad) = self.fcast_times.iter().find(|t| !t.is_finite()) {
            return Err(LimError::InvalidInput(format!(
                "forecast lead times must be finite, got {bad}"
            )));
        }
        if self.fcast_num_pcs == 0 {
            return Err(LimError::InvalidInput(
                "fcast_num_pcs must be at least 1".into(),
            ));
        }
        if !(self.imag_tolerance > 0.0) || !(self.singular_tolerance > 0.0) {
            return Err(LimError::InvalidInput(
                "numerical tolerances must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn tolerances(&self) -> OperatorTolerances {
        OperatorTolerances {
            imag_tolerance: self.imag_tolerance,
            singular_tolerance: self.singular_tolerance,
        }
    }
}

impl ForecasterConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    IoError(PathBuf, String),

    #[error("failed to parse config: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ForecasterConfig::default();
        assert_eq!(config.kind, ForecasterKind::Lim);
        assert_eq!(config.calibration.dataformat, "NCD");
        assert!(config.lim.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
kind = "lim"

[calibration]
filename = "/data/calib.nc"
varname = "tas"
dataformat = "NCD"
regrid_factor = 2

[lim]
wsize = 12
fcast_times = [1.0, 2.0]
fcast_num_pcs = 15
detrend = false
"#;
        let config = ForecasterConfig::from_toml(toml).unwrap();
        assert_eq!(config.calibration.varname, "tas");
        assert_eq!(config.calibration.regrid_factor, 2);
        assert_eq!(config.lim.wsize, 12);
        assert_eq!(config.lim.fcast_times, vec![1.0, 2.0]);
        assert_eq!(config.lim.fcast_num_pcs, 15);
        assert!(!config.lim.detrend);
        // unspecified fields fall back to defaults
        assert_eq!(config.lim.imag_tolerance, 1e-6);
    }

    #[test]
    fn test_parse_persistence_kind() {
        let config = ForecasterConfig::from_toml("kind = \"persistence\"").unwrap();
        assert_eq!(config.kind, ForecasterKind::Persistence);
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert!(matches!(
            ForecasterConfig::from_toml("kind = \"analog\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = ForecasterConfig::default();
        config.lim.fcast_times = vec![0.5, 3.0];
        let text = config.to_toml().unwrap();
        let back = ForecasterConfig::from_toml(&text).unwrap();
        assert_eq!(back.lim.fcast_times, vec![0.5, 3.0]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut lim = LimConfig {
            wsize: 0,
            ..Default::default()
        };
        assert!(lim.validate().is_err());
        lim.wsize = 1;
        lim.fcast_times = vec![];
        assert!(lim.validate().is_err());
        lim.fcast_times = vec![f64::INFINITY];
        assert!(lim.validate().is_err());
        lim.fcast_times = vec![1.0];
        lim.imag_tolerance = 0.0;
        assert!(lim.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ForecasterConfig::load("/nonexistent/lim.toml"),
            Err(ConfigError::IoError(_, _))
        ));
    }
}
