use std::f64::consts::PI;

use faer::Mat;

use crate::covariance::LagCovariancePair;
use crate::linalg::{complex_inverse, expm, real_eigen, svd_solve};
use crate::types::{LimError, ModeInfo, Stability, C64};
use crate::utils::{all_finite, scale_in_place};

/// Growth rates within this distance of zero are classified as neutral.
const NEUTRAL_TOLERANCE: f64 = 1e-6;

/// Numerical thresholds used while fitting the generator.
#[derive(Debug, Clone, Copy)]
pub struct OperatorTolerances {
    /// Largest imaginary part allowed in log G(τ), relative to max(1, max |Re L|).
    pub imag_tolerance: f64,
    /// Reciprocal condition number below which C(0) is treated as singular.
    pub singular_tolerance: f64,
}

impl Default for OperatorTolerances {
    fn default() -> Self {
        Self {
            imag_tolerance: 1e-6,
            singular_tolerance: 1e-10,
        }
    }
}

/// Continuous-time LIM generator L with G(t) = exp(tL).
///
/// Only L is kept; finite-horizon propagators are rebuilt on every request.
#[derive(Debug, Clone)]
pub struct LimOperator {
    generator: Mat<f64>,
    lag: usize,
    eigenvalues: Vec<C64>,
}

impl LimOperator {
    /// Fit the generator from lagged covariances. The pair is consumed.
    ///
    /// # Algorithm
    /// 1. G(τ) = C(τ) C(0)⁻¹, from the SVD solve C(0) Gᵀ = C(τ)ᵀ
    /// 2. Eigendecomposition: G(τ) W = W Λ
    /// 3. L = W diag(log λ / τ) W⁻¹ (principal logarithm)
    /// 4. Reject L if its imaginary part is not negligible
    pub fn fit(pair: LagCovariancePair, tol: &OperatorTolerances) -> Result<Self, LimError> {
        let r = pair.dim();
        if pair.c0.ncols() != r || pair.ctau.nrows() != r || pair.ctau.ncols() != r {
            return Err(LimError::DimensionMismatch {
                context: "lag covariance pair",
                expected: r,
                got: pair.ctau.nrows(),
            });
        }
        if !all_finite(&pair.c0) || !all_finite(&pair.ctau) {
            return Err(LimError::SingularCovariance(
                "lag covariances contain NaN or Inf values".into(),
            ));
        }
        let tau = pair.lag as f64;

        let ctau_t = pair.ctau.transpose().to_owned();
        let g_t = svd_solve(&pair.c0, &ctau_t, tol.singular_tolerance)
            .map_err(|e| LimError::SingularCovariance(format!("C(0): {e}")))?;
        let g = g_t.transpose().to_owned();

        let (lambda, w) = real_eigen(&g).map_err(LimError::SingularCovariance)?;

        let mut beta = Vec::with_capacity(r);
        for (j, l) in lambda.iter().enumerate() {
            if !(l.norm() > 0.0) || !l.re.is_finite() || !l.im.is_finite() {
                return Err(LimError::UnstableOperator(format!(
                    "propagator eigenvalue {j} is {:.3e}{:+.3e}i; G({}) has no logarithm",
                    l.re, l.im, pair.lag
                )));
            }
            beta.push(l.ln() / tau);
        }

        let w_inv = complex_inverse(&w).ok_or_else(|| {
            LimError::UnstableOperator(format!(
                "G({}) is not diagonalizable; eigenvectors are linearly dependent",
                pair.lag
            ))
        })?;

        let mut generator = Mat::<f64>::zeros(r, r);
        let mut max_imag = 0.0_f64;
        let mut max_real = 0.0_f64;
        for i in 0..r {
            for k in 0..r {
                let mut val = C64::zero();
                for j in 0..r {
                    val += w[i][j] * beta[j] * w_inv[j][k];
                }
                generator[(i, k)] = val.re;
                max_imag = max_imag.max(val.im.abs());
                max_real = max_real.max(val.re.abs());
            }
        }

        let limit = tol.imag_tolerance * max_real.max(1.0);
        if !(max_imag <= limit) {
            return Err(LimError::UnstableOperator(format!(
                "log G({}) has imaginary part {max_imag:.3e} (limit {limit:.3e}); lag choice is unsuitable for the data",
                pair.lag
            )));
        }
        tracing::debug!(max_imag, limit, "discarded imaginary part of matrix logarithm");

        let op = Self {
            generator,
            lag: pair.lag,
            eigenvalues: beta,
        };
        if !op.is_stable() {
            tracing::warn!(
                lag = op.lag,
                "fitted generator has growing modes; long-lead forecasts will diverge"
            );
        }
        Ok(op)
    }

    /// Wrap a known generator, e.g. one fitted elsewhere.
    pub fn from_generator(generator: Mat<f64>, lag: usize) -> Result<Self, LimError> {
        let r = generator.nrows();
        if generator.ncols() != r {
            return Err(LimError::DimensionMismatch {
                context: "generator columns",
                expected: r,
                got: generator.ncols(),
            });
        }
        if r == 0 || !all_finite(&generator) {
            return Err(LimError::InvalidInput(
                "generator must be non-empty and finite".into(),
            ));
        }
        let (eigenvalues, _) = real_eigen(&generator).map_err(LimError::InvalidInput)?;
        Ok(Self {
            generator,
            lag,
            eigenvalues,
        })
    }

    /// Finite-horizon propagator G(t) = exp(tL), computed fresh.
    ///
    /// `lead` is in calibration time steps and need not be an integer.
    pub fn propagator(&self, lead: f64) -> Result<Mat<f64>, LimError> {
        if !lead.is_finite() {
            return Err(LimError::InvalidInput(format!(
                "lead time must be finite, got {lead}"
            )));
        }
        let mut a = self.generator.clone();
        scale_in_place(&mut a, lead);
        let g = expm(&a);
        if !all_finite(&g) {
            return Err(LimError::UnstableOperator(format!(
                "propagator overflows at lead {lead}; growing modes exceed f64 range"
            )));
        }
        Ok(g)
    }

    pub fn generator(&self) -> &Mat<f64> {
        &self.generator
    }

    /// Lag τ (time steps) the generator was fitted at.
    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn dim(&self) -> usize {
        self.generator.nrows()
    }

    /// Eigenvalues of L.
    pub fn eigenvalues(&self) -> &[C64] {
        &self.eigenvalues
    }

    /// Per-mode growth rates, e-folding times, and periods of L.
    pub fn spectrum(&self) -> Vec<ModeInfo> {
        self.eigenvalues
            .iter()
            .enumerate()
            .map(|(index, &beta)| {
                let efolding_time = if beta.re.abs() > 1e-14 {
                    Some(-1.0 / beta.re)
                } else {
                    None
                };
                let period = if beta.im.abs() > 1e-14 {
                    2.0 * PI / beta.im.abs()
                } else {
                    f64::INFINITY
                };
                ModeInfo {
                    index,
                    eigenvalue: beta,
                    growth_rate: beta.re,
                    efolding_time,
                    period,
                    stability: classify_growth_rate(beta.re, NEUTRAL_TOLERANCE),
                }
            })
            .collect()
    }

    /// Whether no mode of L grows.
    pub fn is_stable(&self) -> bool {
        self.eigenvalues
            .iter()
            .all(|b| classify_growth_rate(b.re, NEUTRAL_TOLERANCE) != Stability::Growing)
    }
}

fn classify_growth_rate(rate: f64, tol: f64) -> Stability {
    if rate < -tol {
        Stability::Decaying
    } else if rate > tol {
        Stability::Growing
    } else {
        Stability::Neutral
    }
}
