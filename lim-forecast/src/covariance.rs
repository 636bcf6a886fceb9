use faer::Mat;

use crate::types::LimError;
use crate::utils::{row_means, validate_matrix};

/// Zero-lag and lag-τ covariance of a reduced state series.
#[derive(Debug, Clone)]
pub struct LagCovariancePair {
    /// C(0) = ⟨x(t) x(t)ᵀ⟩ over the full series (r × r).
    pub c0: Mat<f64>,
    /// C(τ) = ⟨x(t+τ) x(t)ᵀ⟩ over the usable pairs (r × r).
    pub ctau: Mat<f64>,
    /// Lag τ in time steps.
    pub lag: usize,
}

impl LagCovariancePair {
    /// Estimate C(0) and C(τ) from a reduced series.
    ///
    /// # Arguments
    /// * `series` - Reduced states (r components × n time steps), time-ordered.
    /// * `lag` - Window size τ in time steps.
    /// * `detrend` - Remove a least-squares line per component instead of
    ///   only the mean. Applied before estimation.
    ///
    /// Both matrices are normalized by the number of samples that enter them:
    /// n for C(0), n − τ for C(τ).
    pub fn estimate(series: &Mat<f64>, lag: usize, detrend: bool) -> Result<Self, LimError> {
        if lag == 0 {
            return Err(LimError::InvalidInput("lag window must be at least 1".into()));
        }
        let n_time = series.ncols();
        if n_time <= lag {
            return Err(LimError::InsufficientTrainingData { n_time, wsize: lag });
        }
        validate_matrix(series, 1, 2)?;

        let x = if detrend {
            remove_linear_trend(series)
        } else {
            remove_mean(series)
        };

        let r = x.nrows();
        let n_pairs = n_time - lag;

        let mut c0 = Mat::<f64>::zeros(r, r);
        let mut ctau = Mat::<f64>::zeros(r, r);
        for t in 0..n_time {
            for j in 0..r {
                let xj = x[(j, t)];
                for i in 0..r {
                    c0[(i, j)] += x[(i, t)] * xj;
                    if t < n_pairs {
                        ctau[(i, j)] += x[(i, t + lag)] * xj;
                    }
                }
            }
        }

        let inv_n = 1.0 / n_time as f64;
        let inv_pairs = 1.0 / n_pairs as f64;
        for j in 0..r {
            for i in 0..r {
                c0[(i, j)] *= inv_n;
                ctau[(i, j)] *= inv_pairs;
            }
        }

        tracing::debug!(components = r, n_time, lag, n_pairs, detrend, "estimated lag covariances");

        Ok(Self { c0, ctau, lag })
    }

    pub fn dim(&self) -> usize {
        self.c0.nrows()
    }
}

/// Subtract each row's mean.
pub fn remove_mean(x: &Mat<f64>) -> Mat<f64> {
    let means = row_means(x);
    let mut out = x.clone();
    for j in 0..x.ncols() {
        for (i, m) in means.iter().enumerate() {
            out[(i, j)] -= m;
        }
    }
    out
}

/// Subtract each row's least-squares linear trend over the column index.
pub fn remove_linear_trend(x: &Mat<f64>) -> Mat<f64> {
    let n = x.ncols();
    let t_mean = (n as f64 - 1.0) / 2.0;
    let sxx: f64 = (0..n).map(|t| (t as f64 - t_mean).powi(2)).sum();
    let means = row_means(x);

    let mut out = x.clone();
    for (i, &mean) in means.iter().enumerate() {
        let slope = if sxx > 0.0 {
            let sxy: f64 = (0..n).map(|t| (t as f64 - t_mean) * (x[(i, t)] - mean)).sum();
            sxy / sxx
        } else {
            0.0
        };
        for t in 0..n {
            out[(i, t)] -= mean + slope * (t as f64 - t_mean);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    fn make_series() -> Mat<f64> {
        // x0 alternates ±1, x1 = x0 delayed by one step
        let n = 10;
        let mut x = Mat::<f64>::zeros(2, n);
        for t in 0..n {
            let v = if t % 2 == 0 { 1.0 } else { -1.0 };
            x[(0, t)] = v;
            x[(1, t)] = if t == 0 { 1.0 } else { x[(0, t - 1)] };
        }
        x
    }

    #[test]
    fn test_c0_symmetric() {
        let pair = LagCovariancePair::estimate(&make_series(), 1, false).unwrap();
        assert_eq!(pair.dim(), 2);
        assert_near(pair.c0[(0, 1)], pair.c0[(1, 0)], 1e-14);
        assert!(pair.c0[(0, 0)] > 0.0);
    }

    #[test]
    fn test_lag_one_alternating() {
        let pair = LagCovariancePair::estimate(&make_series(), 1, false).unwrap();
        // x0(t+1) = -x0(t), so C(1) mirrors C(0) with opposite sign
        assert_near(pair.c0[(0, 0)], 1.0, 1e-12);
        assert_near(pair.ctau[(0, 0)], -1.0, 1e-12);
        assert_eq!(pair.lag, 1);
    }

    #[test]
    fn test_insufficient_data() {
        let x = make_series();
        assert!(matches!(
            LagCovariancePair::estimate(&x, 10, false),
            Err(LimError::InsufficientTrainingData {
                n_time: 10,
                wsize: 10
            })
        ));
        // exactly one usable pair is enough
        assert!(LagCovariancePair::estimate(&x, 9, false).is_ok());
    }

    #[test]
    fn test_zero_lag_rejected() {
        assert!(matches!(
            LagCovariancePair::estimate(&make_series(), 0, false),
            Err(LimError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_remove_linear_trend() {
        let mut x = Mat::<f64>::zeros(1, 20);
        for t in 0..20 {
            x[(0, t)] = 3.0 + 0.5 * t as f64;
        }
        let d = remove_linear_trend(&x);
        for t in 0..20 {
            assert_near(d[(0, t)], 0.0, 1e-12);
        }
    }

    #[test]
    fn test_detrend_applied_before_estimation() {
        // a pure ramp has large covariance unless detrended
        let mut x = Mat::<f64>::zeros(1, 30);
        for t in 0..30 {
            x[(0, t)] = t as f64 + if t % 2 == 0 { 0.1 } else { -0.1 };
        }
        let raw = LagCovariancePair::estimate(&x, 1, false).unwrap();
        let detrended = LagCovariancePair::estimate(&x, 1, true).unwrap();
        assert!(raw.c0[(0, 0)] > 10.0);
        assert!(detrended.c0[(0, 0)] < 0.1);
        assert!(detrended.ctau[(0, 0)] < 0.0);
    }
}
