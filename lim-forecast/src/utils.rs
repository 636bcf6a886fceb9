use faer::Mat;

use crate::types::LimError;

/// Validate that a matrix meets minimum dimension requirements and contains no NaN/Inf.
pub fn validate_matrix(x: &Mat<f64>, min_rows: usize, min_cols: usize) -> Result<(), LimError> {
    let (rows, cols) = (x.nrows(), x.ncols());
    if rows < min_rows {
        return Err(LimError::InvalidInput(format!(
            "matrix has {rows} rows, need at least {min_rows}"
        )));
    }
    if cols < min_cols {
        return Err(LimError::InvalidInput(format!(
            "matrix has {cols} columns, need at least {min_cols}"
        )));
    }
    if !all_finite(x) {
        return Err(LimError::InvalidInput(
            "matrix contains NaN or Inf values".to_string(),
        ));
    }
    Ok(())
}

/// Whether every entry of the matrix is finite.
pub fn all_finite(x: &Mat<f64>) -> bool {
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            if !x[(i, j)].is_finite() {
                return false;
            }
        }
    }
    true
}

/// Compute row means of a matrix.
pub fn row_means(x: &Mat<f64>) -> Vec<f64> {
    let (nrows, ncols) = (x.nrows(), x.ncols());
    let mut means = vec![0.0; nrows];
    for i in 0..nrows {
        let mut sum = 0.0;
        for j in 0..ncols {
            sum += x[(i, j)];
        }
        means[i] = sum / ncols as f64;
    }
    means
}

/// Maximum absolute column sum ‖A‖₁.
pub fn one_norm(a: &Mat<f64>) -> f64 {
    let mut best = 0.0_f64;
    for j in 0..a.ncols() {
        let mut sum = 0.0;
        for i in 0..a.nrows() {
            sum += a[(i, j)].abs();
        }
        best = best.max(sum);
    }
    best
}

/// Multiply every entry of `a` by `k` in place.
pub fn scale_in_place(a: &mut Mat<f64>, k: f64) {
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            a[(i, j)] *= k;
        }
    }
}
