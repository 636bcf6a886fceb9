use faer::Mat;

use crate::types::LimError;
use crate::utils::{row_means, validate_matrix};

/// Singular values below this fraction of the leading one count as zero.
const NEGLIGIBLE_SINGULAR_RATIO: f64 = 1e-10;

/// Truncated EOF basis of a gridded field.
///
/// Columns of `eofs` are orthonormal spatial patterns ordered by explained
/// variance. Projection and reconstruction are plain matrix products, so
/// both operate on anomalies.
#[derive(Debug, Clone)]
pub struct ReducedBasis {
    /// EOFs E (n_space × n_pcs), columns are orthonormal.
    eofs: Mat<f64>,
    /// Variance captured by each retained component, s²/(n_time − 1).
    variance: Vec<f64>,
    /// Fraction of total variance per retained component.
    variance_fraction: Vec<f64>,
    /// Calibration time mean per grid point.
    climatology: Vec<f64>,
}

/// Result of fitting a basis: the basis plus the training data in PC space.
#[derive(Debug, Clone)]
pub struct BasisFit {
    pub basis: ReducedBasis,
    /// Training anomalies projected on the basis (n_pcs × n_time).
    pub pcs: Mat<f64>,
}

impl ReducedBasis {
    /// Fit an EOF basis to a state matrix.
    ///
    /// # Arguments
    /// * `x` - Calibration data (n_space × n_time), columns are time-ordered.
    /// * `n_pcs` - Number of components to retain.
    ///
    /// # Algorithm
    /// 1. Anomalies A = X − time mean
    /// 2. Thin SVD: A = U Σ Vᵀ (U spans the eigenvectors of the spatial covariance)
    /// 3. EOFs E = U[:, 0..n_pcs], PCs = Eᵀ A
    pub fn fit(x: &Mat<f64>, n_pcs: usize) -> Result<BasisFit, LimError> {
        validate_matrix(x, 1, 2)?;
        let (n_space, n_time) = (x.nrows(), x.ncols());

        let max_pcs = n_space.min(n_time);
        if n_pcs == 0 || n_pcs > max_pcs {
            return Err(LimError::InvalidInput(format!(
                "cannot retain {n_pcs} components from a {n_space} x {n_time} field (max {max_pcs})"
            )));
        }

        let climatology = row_means(x);
        let mut anomalies = x.clone();
        for j in 0..n_time {
            for i in 0..n_space {
                anomalies[(i, j)] -= climatology[i];
            }
        }

        let svd = anomalies
            .thin_svd()
            .map_err(|e| LimError::SingularCovariance(format!("SVD of calibration field failed: {e:?}")))?;
        let s_col = svd.S().column_vector();
        let s: Vec<f64> = (0..s_col.nrows()).map(|i| s_col[i]).collect();

        let total: f64 = s.iter().map(|v| v * v).sum();
        if !(total > 0.0) {
            return Err(LimError::SingularCovariance(
                "calibration field has zero variance".into(),
            ));
        }
        let floor = s[0] * NEGLIGIBLE_SINGULAR_RATIO;
        if s[n_pcs - 1] <= floor {
            return Err(LimError::SingularCovariance(format!(
                "component {} of {n_pcs} carries no variance (σ = {:.3e})",
                n_pcs,
                s[n_pcs - 1]
            )));
        }

        let eofs = svd.U().subcols(0, n_pcs).to_owned();
        let denom = (n_time - 1) as f64;
        let variance: Vec<f64> = s[..n_pcs].iter().map(|v| v * v / denom).collect();
        let variance_fraction: Vec<f64> = s[..n_pcs].iter().map(|v| v * v / total).collect();

        let pcs = eofs.transpose() * &anomalies;

        Ok(BasisFit {
            basis: ReducedBasis {
                eofs,
                variance,
                variance_fraction,
                climatology,
            },
            pcs,
        })
    }

    /// Project physical-space columns onto the basis: Z = Eᵀ X.
    pub fn project(&self, x: &Mat<f64>) -> Result<Mat<f64>, LimError> {
        if x.nrows() != self.n_space() {
            return Err(LimError::DimensionMismatch {
                context: "projection onto EOF basis",
                expected: self.n_space(),
                got: x.nrows(),
            });
        }
        Ok(self.eofs.transpose() * x)
    }

    /// Map reduced-space columns back to physical space: X = E Z.
    pub fn reconstruct(&self, z: &Mat<f64>) -> Result<Mat<f64>, LimError> {
        if z.nrows() != self.n_pcs() {
            return Err(LimError::DimensionMismatch {
                context: "reconstruction from EOF basis",
                expected: self.n_pcs(),
                got: z.nrows(),
            });
        }
        Ok(&self.eofs * z)
    }

    pub fn eofs(&self) -> &Mat<f64> {
        &self.eofs
    }

    pub fn n_space(&self) -> usize {
        self.eofs.nrows()
    }

    pub fn n_pcs(&self) -> usize {
        self.eofs.ncols()
    }

    pub fn variance(&self) -> &[f64] {
        &self.variance
    }

    pub fn variance_fraction(&self) -> &[f64] {
        &self.variance_fraction
    }

    pub fn climatology(&self) -> &[f64] {
        &self.climatology
    }

    /// Fraction of calibration variance left out by the truncation.
    pub fn unexplained_variance(&self) -> f64 {
        (1.0 - self.variance_fraction.iter().sum::<f64>()).max(0.0)
    }
}
