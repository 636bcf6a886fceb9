//! # lim-forecast
//!
//! Linear Inverse Model (LIM) forecasting of gridded climate-field ensembles.
//!
//! A LIM is fitted once from calibration data and then applied to any
//! number of initial ensembles:
//!
//! - **EOF reduction** ([`ReducedBasis`]): truncated orthonormal basis of the
//!   calibration anomalies
//! - **Lag covariances** ([`LagCovariancePair`]): C(0) and C(τ) of the
//!   training PCs, optionally detrended
//! - **Generator** ([`LimOperator`]): L = log(C(τ) C(0)⁻¹) / τ, with
//!   propagators G(t) = exp(tL) for arbitrary lead times
//! - **Forecasters** ([`Forecaster`], [`LimForecaster`]): project, propagate,
//!   reconstruct
//!
//! ## Quick Start
//!
//! ```rust
//! use lim_forecast::{Forecaster, GriddedDataset, LimConfig, LimForecaster};
//!
//! // A travelling wave on a 3 × 8 grid, 24 steps per cycle
//! let (n_time, n_lat, n_lon) = (240, 3, 8);
//! let mut values = Vec::with_capacity(n_time * n_lat * n_lon);
//! for t in 0..n_time {
//!     let phase = 2.0 * std::f64::consts::PI * t as f64 / 24.0;
//!     for i in 0..n_lat {
//!         for j in 0..n_lon {
//!             let k = 2.0 * std::f64::consts::PI * j as f64 / n_lon as f64;
//!             values.push((1.0 + i as f64) * (k - phase).cos());
//!         }
//!     }
//! }
//! let time = (0..n_time).map(|t| t as f64).collect();
//! let lat = vec![-30.0, 0.0, 30.0];
//! let lon = (0..n_lon).map(|j| 45.0 * j as f64).collect();
//! let dataset = GriddedDataset::new(values, time, lat, lon).unwrap();
//!
//! let config = LimConfig {
//!     wsize: 1,
//!     fcast_times: vec![6.0],
//!     fcast_num_pcs: 2,
//!     detrend: false,
//!     ..Default::default()
//! };
//! let lim = LimForecaster::build(&dataset, &config).unwrap();
//!
//! // Forecast a 5-member ensemble 6 steps ahead
//! let x0 = faer::Mat::<f64>::zeros(lim.state_dim(), 5);
//! let fcast = lim.forecast_single(&x0).unwrap();
//! assert_eq!(fcast.ncols(), 5);
//! ```
//!
//! ## References
//!
//! - Penland & Sardeshmukh (1995), *J. Climate*, 8, 1999-2024
//! - Penland (1989), *Mon. Wea. Rev.*, 117, 2165-2185
//! - Perkins & Hakim (2017), *Clim. Past*, 13, 421-436

pub mod config;
pub mod types;

pub mod covariance;
pub mod dataset;
pub mod eof;
pub mod forecast;
pub mod linalg;
pub mod operator;
pub mod utils;

pub use config::{CalibrationConfig, ConfigError, ForecasterConfig, LimConfig};
pub use covariance::{remove_linear_trend, remove_mean, LagCovariancePair};
pub use dataset::{
    CalibrationFormat, CalibrationLoader, CalibrationSource, DimCoord, GriddedDataset,
    InMemoryLoader,
};
pub use eof::{BasisFit, ReducedBasis};
pub use forecast::{
    build_forecaster, Forecaster, ForecasterKind, LimForecaster, PersistenceForecaster,
};
pub use operator::{LimOperator, OperatorTolerances};
pub use types::{LimError, ModeInfo, Stability, C64};
