//! Gridded calibration data and the loader seam that supplies it.
//!
//! File readers live outside this crate. A [`CalibrationLoader`] hands over a
//! [`GriddedDataset`] shaped (time, lat, lon); everything downstream works on
//! its flattened (space × time) state matrix.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use faer::Mat;

use crate::types::LimError;

pub const TIME_AXIS: usize = 0;
pub const LAT_AXIS: usize = 1;
pub const LON_AXIS: usize = 2;

/// A named dimension coordinate: its axis index and its values.
#[derive(Debug, Clone, PartialEq)]
pub struct DimCoord {
    pub axis: usize,
    pub values: Vec<f64>,
}

impl DimCoord {
    pub fn new(axis: usize, values: Vec<f64>) -> Self {
        Self { axis, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A 3-D field indexed (time, lat, lon), stored row-major.
#[derive(Debug, Clone)]
pub struct GriddedDataset {
    values: Vec<f64>,
    time: DimCoord,
    lat: DimCoord,
    lon: DimCoord,
}

impl GriddedDataset {
    /// Build a dataset from row-major values and coordinate vectors.
    ///
    /// `values.len()` must equal `time.len() * lat.len() * lon.len()` and
    /// every axis must be non-empty.
    pub fn new(
        values: Vec<f64>,
        time: Vec<f64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
    ) -> Result<Self, LimError> {
        if time.is_empty() || lat.is_empty() || lon.is_empty() {
            return Err(LimError::InvalidInput(
                "gridded dataset axes must be non-empty".into(),
            ));
        }
        let expected = time.len() * lat.len() * lon.len();
        if values.len() != expected {
            return Err(LimError::DimensionMismatch {
                context: "gridded dataset values",
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            values,
            time: DimCoord::new(TIME_AXIS, time),
            lat: DimCoord::new(LAT_AXIS, lat),
            lon: DimCoord::new(LON_AXIS, lon),
        })
    }

    /// Build a dataset from a state matrix (n_lat·n_lon × n_time), the inverse
    /// of [`GriddedDataset::state_matrix`].
    pub fn from_state_matrix(
        x: &Mat<f64>,
        time: Vec<f64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
    ) -> Result<Self, LimError> {
        let n_space = lat.len() * lon.len();
        if x.nrows() != n_space {
            return Err(LimError::DimensionMismatch {
                context: "state matrix rows",
                expected: n_space,
                got: x.nrows(),
            });
        }
        if x.ncols() != time.len() {
            return Err(LimError::DimensionMismatch {
                context: "state matrix columns",
                expected: time.len(),
                got: x.ncols(),
            });
        }
        let mut values = Vec::with_capacity(n_space * time.len());
        for t in 0..x.ncols() {
            for s in 0..n_space {
                values.push(x[(s, t)]);
            }
        }
        Self::new(values, time, lat, lon)
    }

    /// Look up a coordinate by name: `"time"`, `"lat"` or `"lon"`.
    pub fn dim_coord(&self, name: &str) -> Result<&DimCoord, LimError> {
        match name {
            "time" => Ok(&self.time),
            "lat" => Ok(&self.lat),
            "lon" => Ok(&self.lon),
            other => Err(LimError::InvalidInput(format!(
                "unknown dimension coordinate '{other}'"
            ))),
        }
    }

    /// Look up several coordinates at once.
    pub fn dim_coords<'a>(
        &'a self,
        names: &[&'a str],
    ) -> Result<HashMap<&'a str, &'a DimCoord>, LimError> {
        names
            .iter()
            .map(|&name| self.dim_coord(name).map(|c| (name, c)))
            .collect()
    }

    /// Shape as (n_time, n_lat, n_lon).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.time.len(), self.lat.len(), self.lon.len())
    }

    pub fn n_time(&self) -> usize {
        self.time.len()
    }

    /// Number of grid points per time slice.
    pub fn n_space(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    pub(crate) fn value(&self, t: usize, i_lat: usize, i_lon: usize) -> f64 {
        let (_, n_lat, n_lon) = self.shape();
        self.values[(t * n_lat + i_lat) * n_lon + i_lon]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Flatten to a state matrix (n_space × n_time), one column per time step.
    /// Space index is `i_lat * n_lon + i_lon`.
    pub fn state_matrix(&self) -> Mat<f64> {
        let n_space = self.n_space();
        let n_time = self.n_time();
        let mut x = Mat::<f64>::zeros(n_space, n_time);
        for t in 0..n_time {
            let slice = &self.values[t * n_space..(t + 1) * n_space];
            for (s, &v) in slice.iter().enumerate() {
                x[(s, t)] = v;
            }
        }
        x
    }

    /// Coarsen the horizontal grid by block-averaging `factor × factor` cells.
    ///
    /// Blocks at the trailing lat/lon edges may be partial and are averaged over
    /// the cells they contain. Coordinates are block-averaged the same way.
    pub fn coarsen(&self, factor: usize) -> Result<Self, LimError> {
        if factor == 0 {
            return Err(LimError::InvalidInput(
                "regrid factor must be at least 1".into(),
            ));
        }
        if factor == 1 {
            return Ok(self.clone());
        }

        let (n_time, n_lat, n_lon) = self.shape();
        if n_lat % factor != 0 || n_lon % factor != 0 {
            tracing::warn!(
                n_lat,
                n_lon,
                factor,
                "grid is not divisible by regrid factor; edge blocks are partial"
            );
        }

        let lat = block_mean(&self.lat.values, factor);
        let lon = block_mean(&self.lon.values, factor);
        let (m_lat, m_lon) = (lat.len(), lon.len());

        let mut values = vec![0.0; n_time * m_lat * m_lon];
        for t in 0..n_time {
            for bi in 0..m_lat {
                let lat_range = bi * factor..((bi + 1) * factor).min(n_lat);
                for bj in 0..m_lon {
                    let lon_range = bj * factor..((bj + 1) * factor).min(n_lon);
                    let mut sum = 0.0;
                    let mut count = 0usize;
                    for i in lat_range.clone() {
                        for j in lon_range.clone() {
                            sum += self.value(t, i, j);
                            count += 1;
                        }
                    }
                    values[(t * m_lat + bi) * m_lon + bj] = sum / count as f64;
                }
            }
        }

        Self::new(values, self.time.values.clone(), lat, lon)
    }
}

fn block_mean(values: &[f64], factor: usize) -> Vec<f64> {
    values
        .chunks(factor)
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect()
}

/// Calibration file formats the loader recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationFormat {
    /// NetCDF gridded output, tagged `"NCD"` in configuration.
    NetCdf,
}

impl FromStr for CalibrationFormat {
    type Err = LimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NCD" => Ok(CalibrationFormat::NetCdf),
            other => Err(LimError::UnsupportedCalibrationFormat(other.to_string())),
        }
    }
}

/// Where calibration data comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSource {
    pub path: PathBuf,
    pub varname: String,
    pub format: CalibrationFormat,
}

/// Supplies gridded calibration data to the forecaster builders.
pub trait CalibrationLoader {
    fn load(&self, source: &CalibrationSource) -> Result<GriddedDataset, LimError>;
}

/// Serves datasets that are already in memory, keyed by (path, varname).
#[derive(Debug, Default)]
pub struct InMemoryLoader {
    datasets: HashMap<(PathBuf, String), GriddedDataset>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        path: impl AsRef<Path>,
        varname: impl Into<String>,
        dataset: GriddedDataset,
    ) {
        self.datasets
            .insert((path.as_ref().to_path_buf(), varname.into()), dataset);
    }

    pub fn with(
        mut self,
        path: impl AsRef<Path>,
        varname: impl Into<String>,
        dataset: GriddedDataset,
    ) -> Self {
        self.insert(path, varname, dataset);
        self
    }
}

impl CalibrationLoader for InMemoryLoader {
    fn load(&self, source: &CalibrationSource) -> Result<GriddedDataset, LimError> {
        self.datasets
            .get(&(source.path.clone(), source.varname.clone()))
            .cloned()
            .ok_or_else(|| {
                LimError::InvalidInput(format!(
                    "no calibration data for '{}' in {}",
                    source.varname,
                    source.path.display()
                ))
            })
    }
}
