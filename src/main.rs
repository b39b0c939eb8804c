use anyhow::{Context, Result};
use aquiflow::io::read_config;
use aquiflow::{Conductivity, Grid, ModelInputs, SolverConfig, simulate};
use ndarray as nd;
use std::f64::consts::PI;
use std::path::Path;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Pumping well in a confined aquifer with a fixed-head outer ring.
///
/// Usage: `aquiflow [config.json] [log-level]`
fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let level = match args.get(1).map(|s| s.to_lowercase()).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match args.first() {
        Some(path) => read_config(Path::new(path))?,
        None => SolverConfig::default(),
    };
    info!(?config, "solver configuration");

    // Aquifer
    let kh = 10.0; // m/d
    let thickness = 20.0; // m
    let ss = 1e-4; // 1/m
    let q_well = -1200.0; // m3/d, extraction

    let mut r = vec![0.0];
    r.extend((0..=50).map(|i| 10f64.powf(-1.0 + 5.0 * i as f64 / 50.0)));
    let grid = Grid::axial(&r, &[0.0, -thickness])?;
    let shape = grid.shape();
    let nx = grid.nx();

    let mut fq = nd::Array3::<f64>::zeros(shape);
    fq[[0, 0, 0]] = q_well;
    let mut ibound = nd::Array3::<i32>::ones(shape);
    ibound[[0, 0, nx - 1]] = -1;

    let mut times = vec![0.0];
    times.extend((0..=40).map(|i| 10f64.powf(-3.0 + 5.0 * i as f64 / 40.0)));

    let inputs = ModelInputs::new(grid.clone(), Conductivity::uniform(&grid, kh), times)
        .with_storage(nd::Array3::from_elem(shape, ss))
        .with_sources(fq)
        .with_ibound(ibound);

    let solution = simulate(&inputs, &config).context("Simulation failed")?;

    let xm = grid.xm();
    let r_fixed = xm[nx - 1];
    let heads = solution.final_heads();
    println!("t = {:.1} d", solution.times[solution.n_steps()]);
    println!("{:>12} {:>14} {:>14}", "r [m]", "drawdown [m]", "Thiem [m]");
    for j in (0..nx).step_by(5) {
        let thiem = -q_well / (2.0 * PI * kh * thickness) * (r_fixed / xm[j]).ln();
        println!("{:>12.3} {:>14.4} {:>14.4}", xm[j], -heads[[0, 0, j]], thiem);
    }

    if let Some(budget) = solution.budgets.last() {
        println!(
            "budget: in {:.3}, out {:.3}, discrepancy {:.2e} %",
            budget.total_in(),
            budget.total_out(),
            budget.percent_discrepancy()
        );
    }

    Ok(())
}
