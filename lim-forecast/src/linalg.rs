//! Dense linear-algebra helpers layered over faer.
//!
//! Complex matrices are kept as row-major `Vec<Vec<C64>>`, matching the
//! layout of eigenvector data pulled out of faer.

use faer::Mat;

use crate::types::C64;
use crate::utils::{one_norm, scale_in_place};

/// Hard cap on Taylor terms in [`expm`]; the scaled argument has ‖A‖₁ ≤ 1/2,
/// so convergence to machine precision takes far fewer.
const TAYLOR_MAX_TERMS: usize = 40;

/// Cap on scaling-and-squaring steps in [`expm`].
const MAX_SQUARINGS: u32 = 1024;

/// Solve `A X = B` for square `A` through its SVD, `X = V Σ⁻¹ Uᵀ B`.
///
/// Fails when `A` is numerically singular, that is when
/// `σ_min ≤ rcond · σ_max` or the largest singular value is zero.
pub fn svd_solve(a: &Mat<f64>, b: &Mat<f64>, rcond: f64) -> Result<Mat<f64>, String> {
    let n = a.nrows();
    if a.ncols() != n || b.nrows() != n {
        return Err(format!(
            "svd_solve shape mismatch: A is {}x{}, B is {}x{}",
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols()
        ));
    }

    let svd = a.svd().map_err(|e| format!("SVD failed: {e:?}"))?;
    let u = svd.U();
    let v = svd.V();
    let s_col = svd.S().column_vector();

    let s: Vec<f64> = (0..s_col.nrows()).map(|i| s_col[i]).collect();
    let s_max = s.iter().copied().fold(0.0_f64, f64::max);
    let s_min = s.iter().copied().fold(f64::INFINITY, f64::min);
    if !(s_max > 0.0) || !s_min.is_finite() || s_min <= rcond * s_max {
        return Err(format!(
            "matrix is numerically singular (σ_min = {s_min:.3e}, σ_max = {s_max:.3e}, rcond = {rcond:.1e})"
        ));
    }

    // X = V Σ⁻¹ Uᵀ B
    let mut ut_b = u.transpose() * b;
    for k in 0..n {
        let inv = 1.0 / s[k];
        for j in 0..ut_b.ncols() {
            ut_b[(k, j)] *= inv;
        }
    }
    Ok(v * &ut_b)
}

/// Eigendecomposition of a real square matrix.
///
/// Returns the eigenvalues and the eigenvectors as a row-major complex
/// matrix whose column `j` pairs with eigenvalue `j`.
pub fn real_eigen(a: &Mat<f64>) -> Result<(Vec<C64>, Vec<Vec<C64>>), String> {
    let n = a.nrows();
    let eigen = a
        .as_ref()
        .eigen()
        .map_err(|e| format!("eigendecomposition failed: {e:?}"))?;

    let values_diag = eigen.S().column_vector();
    let vectors = eigen.U();

    let mut values = Vec::with_capacity(n);
    let mut w = vec![vec![C64::zero(); n]; n];
    for j in 0..n {
        let ev = values_diag[j];
        values.push(C64::new(ev.re, ev.im));
        for (i, row) in w.iter_mut().enumerate() {
            let v = vectors[(i, j)];
            row[j] = C64::new(v.re, v.im);
        }
    }
    Ok((values, w))
}

/// Solve a complex linear system Ax = b using Gaussian elimination with
/// partial pivoting. Returns `None` when a pivot vanishes.
pub fn complex_solve(a: &[Vec<C64>], b: &[C64]) -> Option<Vec<C64>> {
    let n = b.len();
    let mut aug: Vec<Vec<C64>> = a
        .iter()
        .zip(b)
        .map(|(row, &rhs)| {
            let mut new_row = row.clone();
            new_row.push(rhs);
            new_row
        })
        .collect();

    let scale = a
        .iter()
        .flat_map(|row| row.iter().map(C64::norm))
        .fold(0.0_f64, f64::max);
    let pivot_floor = scale * n as f64 * f64::EPSILON;

    for col in 0..n {
        let mut max_norm = aug[col][col].norm();
        let mut max_row = col;
        for (row, r) in aug.iter().enumerate().skip(col + 1) {
            let norm = r[col].norm();
            if norm > max_norm {
                max_norm = norm;
                max_row = row;
            }
        }
        if !(max_norm > pivot_floor) {
            return None;
        }
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            for j in col..=n {
                let sub = factor * aug[col][j];
                aug[row][j] = aug[row][j] - sub;
            }
        }
    }

    let mut x = vec![C64::zero(); n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum = sum - aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }
    Some(x)
}

/// Inverse of a square complex matrix, column by column.
pub fn complex_inverse(a: &[Vec<C64>]) -> Option<Vec<Vec<C64>>> {
    let n = a.len();
    let mut inv = vec![vec![C64::zero(); n]; n];
    for col in 0..n {
        let mut e = vec![C64::zero(); n];
        e[col] = C64::one();
        let x = complex_solve(a, &e)?;
        for (i, xi) in x.into_iter().enumerate() {
            inv[i][col] = xi;
        }
    }
    Some(inv)
}

/// Matrix exponential by scaling and squaring with a truncated Taylor series.
///
/// `A` is scaled by 2⁻ˢ so that ‖A‖₁ ≤ 1/2, the series is summed until
/// the next term falls below machine precision, and the result is squared
/// `s` times.
pub fn expm(a: &Mat<f64>) -> Mat<f64> {
    let n = a.nrows();
    let norm = one_norm(a);
    let squarings = if norm > 0.5 {
        ((norm / 0.5).log2().ceil() as u32).min(MAX_SQUARINGS)
    } else {
        0
    };

    let mut scaled = a.clone();
    scale_in_place(&mut scaled, 0.5_f64.powi(squarings as i32));

    let mut result = Mat::<f64>::identity(n, n);
    let mut term = Mat::<f64>::identity(n, n);
    for k in 1..=TAYLOR_MAX_TERMS {
        term = &term * &scaled;
        scale_in_place(&mut term, 1.0 / k as f64);
        result = &result + &term;
        if one_norm(&term) <= f64::EPSILON * one_norm(&result) {
            break;
        }
    }

    for _ in 0..squarings {
        result = &result * &result;
    }
    result
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

    #[test]
    fn test_svd_solve_identity() {
        let a = Mat::<f64>::identity(3, 3);
        let mut b = Mat::<f64>::zeros(3, 1);
        b[(0, 0)] = 1.0;
        b[(1, 0)] = 2.0;
        b[(2, 0)] = 3.0;
        let x = svd_solve(&a, &b, 1e-12).unwrap();
        for i in 0..3 {
            assert_near(x[(i, 0)], b[(i, 0)], 1e-12);
        }
    }

    #[test]
    fn test_svd_solve_general() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 4.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 3.0;
        let mut b = Mat::<f64>::zeros(2, 2);
        b[(0, 0)] = 1.0;
        b[(1, 1)] = 1.0;
        let x = svd_solve(&a, &b, 1e-12).unwrap();
        let prod = &a * &x;
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(prod[(i, j)], expected, 1e-10);
            }
        }
    }

    #[test]
    fn test_svd_solve_singular() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 2.0;
        a[(1, 1)] = 4.0;
        let b = Mat::<f64>::identity(2, 2);
        assert!(svd_solve(&a, &b, 1e-10).is_err());
        assert!(svd_solve(&Mat::<f64>::zeros(2, 2), &b, 1e-10).is_err());
    }

    #[test]
    fn test_complex_inverse() {
        let a = vec![
            vec![C64::new(1.0, 1.0), C64::new(2.0, 0.0)],
            vec![C64::new(0.0, -1.0), C64::new(3.0, 0.5)],
        ];
        let inv = complex_inverse(&a).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let mut val = C64::zero();
                for k in 0..2 {
                    val += a[i][k] * inv[k][j];
                }
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(val.re, expected, 1e-12);
                assert_near(val.im, 0.0, 1e-12);
            }
        }
    }

    #[test]
    fn test_complex_solve_singular() {
        let a = vec![
            vec![C64::real(1.0), C64::real(2.0)],
            vec![C64::real(2.0), C64::real(4.0)],
        ];
        assert!(complex_solve(&a, &[C64::one(), C64::one()]).is_none());
    }

    #[test]
    fn test_expm_zero_is_identity() {
        let e = expm(&Mat::<f64>::zeros(3, 3));
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(e[(i, j)], expected, 1e-15);
            }
        }
    }

    #[test]
    fn test_expm_rotation() {
        // exp([[0, -θ], [θ, 0]]) is the rotation by θ
        let theta = 2.5;
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 1)] = -theta;
        a[(1, 0)] = theta;
        let e = expm(&a);
        assert_near(e[(0, 0)], theta.cos(), 1e-12);
        assert_near(e[(0, 1)], -theta.sin(), 1e-12);
        assert_near(e[(1, 0)], theta.sin(), 1e-12);
        assert_near(e[(1, 1)], theta.cos(), 1e-12);
    }

    #[test]
    fn test_expm_diagonal() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = -3.0;
        a[(1, 1)] = 0.7;
        let e = expm(&a);
        assert_near(e[(0, 0)], (-3.0_f64).exp(), 1e-12);
        assert_near(e[(1, 1)], 0.7_f64.exp(), 1e-12);
        assert_near(e[(0, 1)], 0.0, 1e-15);
    }

    #[test]
    fn test_real_eigen_diagonal() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 2.0;
        a[(1, 1)] = 5.0;
        let (values, _) = real_eigen(&a).unwrap();
        let mut re: Vec<f64> = values.iter().map(|v| v.re).collect();
        re.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_near(re[0], 2.0, 1e-12);
        assert_near(re[1], 5.0, 1e-12);
    }
}
