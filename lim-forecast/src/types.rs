use crate::config::ConfigError;

/// Error types for LIM calibration and forecasting.
#[derive(Debug, thiserror::Error)]
pub enum LimError {
    #[error("unsupported calibration data format for LIM: {0}")]
    UnsupportedCalibrationFormat(String),

    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("insufficient training data: {n_time} time steps cannot support a lag of {wsize}")]
    InsufficientTrainingData { n_time: usize, wsize: usize },

    #[error("singular covariance: {0}")]
    SingularCovariance(String),

    #[error("unstable operator: {0}")]
    UnstableOperator(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Complex number type (re, im).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct C64 {
    pub re: f64,
    pub im: f64,
}

impl C64 {
    /// Create a new complex number.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// A purely real complex number.
    pub fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    /// The zero complex number (0 + 0i).
    pub fn zero() -> Self {
        Self { re: 0.0, im: 0.0 }
    }

    /// The multiplicative identity (1 + 0i).
    pub fn one() -> Self {
        Self { re: 1.0, im: 0.0 }
    }

    /// Magnitude |z|.
    pub fn norm(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Squared magnitude re² + im².
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Phase angle atan2(im, re), in (-π, π].
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Principal natural logarithm: ln|z| + i·arg(z).
    pub fn ln(&self) -> Self {
        Self {
            re: self.norm().ln(),
            im: self.arg(),
        }
    }

    /// Complex exponential: e^re (cos im + i sin im).
    pub fn exp(&self) -> Self {
        let r = self.re.exp();
        Self {
            re: r * self.im.cos(),
            im: r * self.im.sin(),
        }
    }
}

impl std::ops::Add for C64 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl std::ops::AddAssign for C64 {
    fn add_assign(&mut self, rhs: Self) {
        self.re += rhs.re;
        self.im += rhs.im;
    }
}

impl std::ops::Sub for C64 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl std::ops::Mul for C64 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl std::ops::Mul<f64> for C64 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            re: self.re * rhs,
            im: self.im * rhs,
        }
    }
}

impl std::ops::Div for C64 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.norm_sqr();
        Self {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}

impl std::ops::Div<f64> for C64 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self {
            re: self.re / rhs,
            im: self.im / rhs,
        }
    }
}

/// Stability classification of a generator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Decaying,
    Neutral,
    Growing,
}

impl std::fmt::Display for Stability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stability::Decaying => write!(f, "decaying"),
            Stability::Neutral => write!(f, "neutral"),
            Stability::Growing => write!(f, "growing"),
        }
    }
}

/// Information about a single eigenmode of the LIM generator.
#[derive(Debug, Clone)]
pub struct ModeInfo {
    /// Mode index.
    pub index: usize,
    /// Generator eigenvalue β (continuous time).
    pub eigenvalue: C64,
    /// Growth rate Re(β), per calibration time step.
    pub growth_rate: f64,
    /// e-folding time -1/Re(β). None for neutral modes; negative for growing ones.
    pub efolding_time: Option<f64>,
    /// Oscillation period 2π/|Im(β)|, infinite for non-oscillatory modes.
    pub period: f64,
    /// Stability classification.
    pub stability: Stability,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    #[test]
    fn test_ln_exp_inverse() {
        let z = C64::new(0.3, -1.2);
        let back = z.ln().exp();
        assert_near(back.re, z.re, 1e-12);
        assert_near(back.im, z.im, 1e-12);
    }

    #[test]
    fn test_ln_negative_real_is_principal() {
        let z = C64::real(-2.0);
        let l = z.ln();
        assert_near(l.re, 2.0_f64.ln(), 1e-12);
        assert_near(l.im, PI, 1e-12);
    }

    #[test]
    fn test_div_roundtrip() {
        let a = C64::new(1.5, 2.0);
        let b = C64::new(-0.5, 0.25);
        let q = (a / b) * b;
        assert_near(q.re, a.re, 1e-12);
        assert_near(q.im, a.im, 1e-12);
    }

    #[test]
    fn test_stability_display() {
        assert_eq!(Stability::Decaying.to_string(), "decaying");
        assert_eq!(Stability::Growing.to_string(), "growing");
    }
}
