//! Basic LIM example: calibrate on a travelling wave and forecast an ensemble.

use lim_forecast::{Forecaster, GriddedDataset, LimConfig, LimForecaster};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lim_forecast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Damped eastward wave on a 6 x 12 grid, 24 steps per cycle
    let (n_time, n_lat, n_lon) = (480, 6, 12);
    let mut values = Vec::with_capacity(n_time * n_lat * n_lon);
    for t in 0..n_time {
        let phase = 2.0 * std::f64::consts::PI * t as f64 / 24.0;
        let envelope = 1.0 + 0.3 * (0.01 * t as f64).sin();
        for i in 0..n_lat {
            for j in 0..n_lon {
                let k = 2.0 * std::f64::consts::PI * j as f64 / n_lon as f64;
                values.push(envelope * (1.0 + 0.2 * i as f64) * (k - phase).cos());
            }
        }
    }
    let dataset = GriddedDataset::new(
        values,
        (0..n_time).map(|t| t as f64).collect(),
        (0..n_lat).map(|i| -75.0 + 30.0 * i as f64).collect(),
        (0..n_lon).map(|j| 30.0 * j as f64).collect(),
    )
    .unwrap();

    let config = LimConfig {
        wsize: 1,
        fcast_times: vec![1.0, 6.0, 12.0],
        fcast_num_pcs: 2,
        detrend: false,
        ..Default::default()
    };
    let lim = LimForecaster::build(&dataset, &config).unwrap();

    println!("LIM calibration");
    println!("  Grid points: {}", lim.state_dim());
    println!(
        "  Explained variance: {:.4}",
        1.0 - lim.basis().unexplained_variance()
    );

    println!("\nGenerator spectrum:");
    for m in lim.operator().spectrum() {
        println!(
            "  Mode {}: growth={:.4}, period={:.2}, stability={}",
            m.index, m.growth_rate, m.period, m.stability
        );
    }

    // 3-member ensemble seeded from the leading EOF
    let e = lim.basis().eofs();
    let mut x0 = faer::Mat::<f64>::zeros(lim.state_dim(), 3);
    for j in 0..3 {
        for i in 0..lim.state_dim() {
            x0[(i, j)] = (1.0 + 0.1 * j as f64) * e[(i, 0)];
        }
    }

    let forecasts = lim.forecast(&x0).unwrap();
    println!("\nForecasts of member 0, grid point 0:");
    for (lead, f) in lim.lead_times().iter().zip(&forecasts) {
        println!("  lead {lead:>5.1}: {:.4}", f[(0, 0)]);
    }
}
