//! Property-based tests for LIM forecasts.

use faer::Mat;
use lim_forecast::*;
use proptest::prelude::*;
use std::f64::consts::PI;

/// Damped rotation of two spatial patterns on a 2 × 6 grid.
fn make_forecaster(lead_times: Vec<f64>) -> LimForecaster {
    let (n_time, n_lat, n_lon) = (360, 2, 6);
    let omega = 2.0 * PI / 36.0;
    let mut values = Vec::with_capacity(n_time * n_lat * n_lon);
    for t in 0..n_time {
        let phase = omega * t as f64;
        let wobble = 1.0 + 0.2 * (0.05 * t as f64).sin();
        for i in 0..n_lat {
            for j in 0..n_lon {
                let k = 2.0 * PI * j as f64 / n_lon as f64;
                values.push(wobble * (1.0 + i as f64) * (k - phase).cos());
            }
        }
    }
    let dataset = GriddedDataset::new(
        values,
        (0..n_time).map(|t| t as f64).collect(),
        vec![-20.0, 20.0],
        (0..n_lon).map(|j| 60.0 * j as f64).collect(),
    )
    .unwrap();
    let config = LimConfig {
        wsize: 1,
        fcast_times: lead_times,
        fcast_num_pcs: 2,
        detrend: false,
        ..Default::default()
    };
    LimForecaster::build(&dataset, &config).unwrap()
}

fn ensemble(n_rows: usize, members: &[f64]) -> Mat<f64> {
    let n_ens = members.len();
    let mut x = Mat::<f64>::zeros(n_rows, n_ens);
    for (j, &m) in members.iter().enumerate() {
        for i in 0..n_rows {
            x[(i, j)] = m * ((i + 1) as f64).sin();
        }
    }
    x
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Output ensembles keep the input's shape at every lead time.
    #[test]
    fn forecast_preserves_shape(
        members in prop::collection::vec(-5.0f64..5.0, 1..40),
        leads in prop::collection::vec(0.0f64..20.0, 1..4),
    ) {
        let lim = make_forecaster(leads.clone());
        let x0 = ensemble(lim.state_dim(), &members);
        let out = lim.forecast(&x0).unwrap();
        prop_assert_eq!(out.len(), leads.len());
        for m in &out {
            prop_assert_eq!(m.nrows(), lim.state_dim());
            prop_assert_eq!(m.ncols(), members.len());
        }
    }

    /// exp(t₁L) exp(t₂L) = exp((t₁+t₂)L).
    #[test]
    fn propagators_compose(t1 in 0.0f64..15.0, t2 in 0.0f64..15.0) {
        let lim = make_forecaster(vec![1.0]);
        let op = lim.operator();
        let lhs = &op.propagator(t1).unwrap() * &op.propagator(t2).unwrap();
        let rhs = op.propagator(t1 + t2).unwrap();
        for i in 0..op.dim() {
            for j in 0..op.dim() {
                prop_assert!((lhs[(i, j)] - rhs[(i, j)]).abs() < 1e-9);
            }
        }
    }

    /// Forecasts are linear in the initial ensemble.
    #[test]
    fn forecast_is_linear(a in -3.0f64..3.0, lead in 0.0f64..10.0) {
        let lim = make_forecaster(vec![lead]);
        let x = ensemble(lim.state_dim(), &[1.0]);
        let mut ax = x.clone();
        for i in 0..ax.nrows() {
            ax[(i, 0)] *= a;
        }
        let fx = lim.forecast_single(&x).unwrap();
        let fax = lim.forecast_single(&ax).unwrap();
        for i in 0..fx.nrows() {
            prop_assert!((fax[(i, 0)] - a * fx[(i, 0)]).abs() < 1e-9);
        }
    }
}
