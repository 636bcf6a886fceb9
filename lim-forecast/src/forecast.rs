use std::str::FromStr;

use faer::Mat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ForecasterConfig, LimConfig};
use crate::covariance::LagCovariancePair;
use crate::dataset::{CalibrationFormat, CalibrationLoader, CalibrationSource, GriddedDataset};
use crate::eof::{BasisFit, ReducedBasis};
use crate::operator::LimOperator;
use crate::types::LimError;
use crate::utils::all_finite;

/// Forecasting strategies that can be built from a [`ForecasterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecasterKind {
    /// Linear Inverse Model.
    #[default]
    Lim,
    /// Initial state carried unchanged to every lead time.
    Persistence,
}

impl FromStr for ForecasterKind {
    type Err = LimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lim" => Ok(ForecasterKind::Lim),
            "persistence" => Ok(ForecasterKind::Persistence),
            other => Err(LimError::InvalidInput(format!(
                "unknown forecaster kind '{other}'"
            ))),
        }
    }
}

/// A calibrated forecaster mapping an initial ensemble to forecast ensembles.
///
/// Ensembles are (state_dim × n_ens) matrices in physical space, one column
/// per member. Implementations hold no mutable state, so one instance can
/// serve concurrent callers.
pub trait Forecaster: Send + Sync {
    /// Calibrate the strategy on gridded data.
    fn build(dataset: &GriddedDataset, config: &LimConfig) -> Result<Self, LimError>
    where
        Self: Sized;

    fn kind(&self) -> ForecasterKind;

    /// Configured lead times, in calibration time steps.
    fn lead_times(&self) -> &[f64];

    /// Physical-space dimension expected on input and produced on output.
    fn state_dim(&self) -> usize;

    /// Forecast the ensemble at every configured lead time, in order.
    fn forecast(&self, initial_ensemble: &Mat<f64>) -> Result<Vec<Mat<f64>>, LimError>;

    /// Forecast at the first configured lead time only.
    fn forecast_single(&self, initial_ensemble: &Mat<f64>) -> Result<Mat<f64>, LimError> {
        self.forecast(initial_ensemble)?
            .into_iter()
            .next()
            .ok_or_else(|| LimError::InvalidInput("no forecast lead times configured".into()))
    }
}

fn validate_ensemble(x: &Mat<f64>, state_dim: usize) -> Result<(), LimError> {
    if x.nrows() != state_dim {
        return Err(LimError::DimensionMismatch {
            context: "initial ensemble state dimension",
            expected: state_dim,
            got: x.nrows(),
        });
    }
    if x.ncols() == 0 {
        return Err(LimError::InvalidInput(
            "initial ensemble has no members".into(),
        ));
    }
    if !all_finite(x) {
        return Err(LimError::InvalidInput(
            "initial ensemble contains NaN or Inf values".into(),
        ));
    }
    Ok(())
}

/// LIM forecaster: EOF basis plus fitted generator.
#[derive(Debug, Clone)]
pub struct LimForecaster {
    basis: ReducedBasis,
    operator: LimOperator,
    lead_times: Vec<f64>,
}

impl LimForecaster {
    /// Assemble a forecaster from an existing basis and operator.
    pub fn from_parts(
        basis: ReducedBasis,
        operator: LimOperator,
        lead_times: Vec<f64>,
    ) -> Result<Self, LimError> {
        if basis.n_pcs() != operator.dim() {
            return Err(LimError::DimensionMismatch {
                context: "generator size vs retained components",
                expected: basis.n_pcs(),
                got: operator.dim(),
            });
        }
        if lead_times.is_empty() || lead_times.iter().any(|t| !t.is_finite()) {
            return Err(LimError::InvalidInput(
                "lead times must be non-empty and finite".into(),
            ));
        }
        Ok(Self {
            basis,
            operator,
            lead_times,
        })
    }

    pub fn basis(&self) -> &ReducedBasis {
        &self.basis
    }

    pub fn operator(&self) -> &LimOperator {
        &self.operator
    }

    /// Forecast many independent initial ensembles in parallel.
    pub fn forecast_many(&self, ensembles: &[Mat<f64>]) -> Vec<Result<Vec<Mat<f64>>, LimError>> {
        ensembles.par_iter().map(|x| self.forecast(x)).collect()
    }
}

impl Forecaster for LimForecaster {
    /// Calibrate a LIM on gridded data.
    ///
    /// # Algorithm
    /// 1. EOF basis of the flattened field, keeping `fcast_num_pcs` components
    /// 2. C(0), C(τ) of the training PCs with τ = `wsize`, optionally detrended
    /// 3. Generator L = log(C(τ) C(0)⁻¹) / τ
    fn build(dataset: &GriddedDataset, config: &LimConfig) -> Result<Self, LimError> {
        config.validate()?;
        let n_time = dataset.n_time();
        if n_time <= config.wsize {
            return Err(LimError::InsufficientTrainingData {
                n_time,
                wsize: config.wsize,
            });
        }

        let x = dataset.state_matrix();
        let BasisFit { basis, pcs } = ReducedBasis::fit(&x, config.fcast_num_pcs)?;
        let pair = LagCovariancePair::estimate(&pcs, config.wsize, config.detrend)?;
        let operator = LimOperator::fit(pair, &config.tolerances())?;

        let (_, n_lat, n_lon) = dataset.shape();
        tracing::info!(
            n_lat,
            n_lon,
            n_time,
            n_pcs = basis.n_pcs(),
            explained = 1.0 - basis.unexplained_variance(),
            wsize = config.wsize,
            "calibrated LIM forecaster"
        );

        Ok(Self {
            basis,
            operator,
            lead_times: config.fcast_times.clone(),
        })
    }

    fn kind(&self) -> ForecasterKind {
        ForecasterKind::Lim
    }

    fn lead_times(&self) -> &[f64] {
        &self.lead_times
    }

    fn state_dim(&self) -> usize {
        self.basis.n_space()
    }

    fn forecast(&self, initial_ensemble: &Mat<f64>) -> Result<Vec<Mat<f64>>, LimError> {
        validate_ensemble(initial_ensemble, self.state_dim())?;
        let z0 = self.basis.project(initial_ensemble)?;

        tracing::debug!(
            n_ens = initial_ensemble.ncols(),
            n_leads = self.lead_times.len(),
            "LIM forecast"
        );

        self.lead_times
            .iter()
            .map(|&lead| {
                let g = self.operator.propagator(lead)?;
                let zt = &g * &z0;
                self.basis.reconstruct(&zt)
            })
            .collect()
    }
}

/// Persistence baseline: the forecast equals the initial state.
#[derive(Debug, Clone)]
pub struct PersistenceForecaster {
    state_dim: usize,
    lead_times: Vec<f64>,
}

impl PersistenceForecaster {
    pub fn new(state_dim: usize, lead_times: Vec<f64>) -> Result<Self, LimError> {
        if state_dim == 0 {
            return Err(LimError::InvalidInput("state dimension must be positive".into()));
        }
        if lead_times.is_empty() || lead_times.iter().any(|t| !t.is_finite()) {
            return Err(LimError::InvalidInput(
                "lead times must be non-empty and finite".into(),
            ));
        }
        Ok(Self {
            state_dim,
            lead_times,
        })
    }
}

impl Forecaster for PersistenceForecaster {
    /// Size the baseline to a calibration grid.
    fn build(dataset: &GriddedDataset, config: &LimConfig) -> Result<Self, LimError> {
        Self::new(dataset.n_space(), config.fcast_times.clone())
    }

    fn kind(&self) -> ForecasterKind {
        ForecasterKind::Persistence
    }

    fn lead_times(&self) -> &[f64] {
        &self.lead_times
    }

    fn state_dim(&self) -> usize {
        self.state_dim
    }

    fn forecast(&self, initial_ensemble: &Mat<f64>) -> Result<Vec<Mat<f64>>, LimError> {
        validate_ensemble(initial_ensemble, self.state_dim)?;
        Ok(self
            .lead_times
            .iter()
            .map(|_| initial_ensemble.clone())
            .collect())
    }
}

/// Load, regrid, and calibrate the forecaster named by `config.kind`.
///
/// Fails with [`LimError::UnsupportedCalibrationFormat`] before touching the
/// loader when `dataformat` is not recognized.
pub fn build_forecaster(
    config: &ForecasterConfig,
    loader: &dyn CalibrationLoader,
) -> Result<Box<dyn Forecaster>, LimError> {
    let format: CalibrationFormat = config.calibration.dataformat.parse()?;
    let source = CalibrationSource {
        path: config.calibration.filename.clone(),
        varname: config.calibration.varname.clone(),
        format,
    };

    let raw = loader.load(&source)?;
    let dataset = raw.coarsen(config.calibration.regrid_factor)?;
    tracing::info!(
        kind = ?config.kind,
        varname = %source.varname,
        regrid_factor = config.calibration.regrid_factor,
        "building forecaster"
    );

    match config.kind {
        ForecasterKind::Lim => Ok(Box::new(LimForecaster::build(&dataset, &config.lim)?)),
        ForecasterKind::Persistence => Ok(Box::new(PersistenceForecaster::build(
            &dataset,
            &config.lim,
        )?)),
    }
}
