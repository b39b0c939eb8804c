use ndarray as nd;
use tracing::{debug, info, trace, warn};

use super::adjacency::Adjacency;
use super::budget::WaterBudget;
use super::conductance::{Conductances, build_conductances};
use super::config::{PcgConfig, SolverConfig};
use super::fields::{CellKind, ModelInputs, classify};
use super::flows::{FaceFlows, face_flows, net_flow, storage_release};
use super::matrix::{CsrMatrix, assemble_conductance_matrix};
use super::pcg::{PcgOutcome, pcg_solve};
use super::result::FlowSolution;
use crate::error::{FlowError, FlowResult};
use crate::grid::Grid;

/// Budget discrepancy above which a step is logged as a warning.
const DISCREPANCY_WARN_PERCENT: f64 = 1.0;

/// PCG may always take this many iterations per active cell, even when the
/// configured cap is lower.
const ITERATIONS_PER_UNKNOWN: usize = 4;

/// Flows of one completed time step.
#[derive(Debug, Clone)]
pub struct StepFlows {
    pub step: usize,
    pub dt: f64,
    /// Net cell outflow `A h` in node order.
    pub net_flow: Vec<f64>,
    /// Storage release in node order.
    pub storage_release: Vec<f64>,
    pub face: FaceFlows,
    pub budget: WaterBudget,
    pub pcg: PcgOutcome,
}

/// Step matrix `M = A + diag(Cs / dt)` and its restriction to active cells.
///
/// Kept between steps while `dt` does not change.
#[derive(Debug, Clone)]
struct StepSystem {
    dt: f64,
    full: CsrMatrix,
    reduced: CsrMatrix,
    /// Node number of every reduced row.
    nodes: Vec<usize>,
}

impl StepSystem {
    fn new(
        a: &CsrMatrix,
        storage: &[f64],
        active: &[bool],
        fixed: &[bool],
        step: usize,
        dt: f64,
    ) -> FlowResult<Self> {
        let diag: Vec<f64> = storage.iter().map(|cs| cs / dt).collect();
        let full = a.with_added_diagonal(&diag);
        let (reduced, nodes) = full.submatrix(active);

        for (r, d) in reduced.diagonal().into_iter().enumerate() {
            if !(d > 0.0 && d.is_finite()) {
                return Err(FlowError::singular(
                    step,
                    format!(
                        "active cell {} has diagonal {d}; it is isolated and has no storage",
                        nodes[r]
                    ),
                ));
            }
        }

        let system = Self {
            dt,
            full,
            reduced,
            nodes,
        };
        system.check_grounded(storage, fixed, step)?;
        Ok(system)
    }

    /// Every connected group of active cells needs storage or a link to a
    /// fixed head, otherwise its heads are only known up to a constant.
    fn check_grounded(&self, storage: &[f64], fixed: &[bool], step: usize) -> FlowResult<()> {
        let n = self.reduced.n();
        let grounded_cell = |r: usize| {
            let node = self.nodes[r];
            storage[node] > 0.0 || self.full.row(node).any(|(j, v)| fixed[j] && v != 0.0)
        };

        let mut visited = vec![false; n];
        let mut stack = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            stack.push(start);

            let mut size = 0;
            let mut grounded = false;
            while let Some(r) = stack.pop() {
                size += 1;
                grounded |= grounded_cell(r);
                for (c, v) in self.reduced.row(r) {
                    if c != r && v != 0.0 && !visited[c] {
                        visited[c] = true;
                        stack.push(c);
                    }
                }
            }

            if !grounded {
                return Err(FlowError::singular(
                    step,
                    format!(
                        "{size} connected active cell(s) from node {} have no storage and no fixed-head neighbor",
                        self.nodes[start]
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Implicit transient groundwater solver.
///
/// Holds the assembled conductance matrix and the current heads; every call
/// to [`GroundwaterSolver::step`] advances the heads by one time step.
#[derive(Debug, Clone)]
pub struct GroundwaterSolver {
    grid: Grid,
    config: SolverConfig,
    kinds: Vec<CellKind>,
    active: Vec<bool>,
    fixed: Vec<bool>,
    conductances: Conductances,
    matrix: CsrMatrix,
    /// `Ss * V / epsilon` per node.
    storage: Vec<f64>,
    sources: Vec<f64>,
    heads: Vec<f64>,
    system: Option<StepSystem>,
}

impl GroundwaterSolver {
    /// Validates the inputs and assembles the conductance matrix.
    pub fn new(inputs: &ModelInputs, config: &SolverConfig) -> FlowResult<Self> {
        config.validate()?;
        inputs.validate()?;

        let grid = inputs.grid.clone();
        let kinds = classify(&inputs.ibound);
        let active: Vec<bool> = kinds.iter().map(|k| *k == CellKind::Active).collect();
        let fixed: Vec<bool> = kinds.iter().map(|k| *k == CellKind::FixedHead).collect();

        let (kx, ky, kz) = inputs.conductivity.components();
        let conductances = build_conductances(&grid, kx, ky, kz, &kinds, config.conductivity_floor);
        let matrix = assemble_conductance_matrix(&Adjacency::from_grid(&grid), &conductances);

        let storage: Vec<f64> = inputs
            .ss
            .iter()
            .zip(grid.volumes().iter())
            .map(|(ss, v)| ss * v / config.epsilon)
            .collect();
        let sources: Vec<f64> = inputs.fq.iter().copied().collect();
        let heads: Vec<f64> = inputs
            .hi
            .iter()
            .zip(&kinds)
            .map(|(&h, kind)| if *kind == CellKind::Inactive { f64::NAN } else { h })
            .collect();

        info!(
            shape = ?grid.shape(),
            active = active.iter().filter(|a| **a).count(),
            fixed = fixed.iter().filter(|f| **f).count(),
            nnz = matrix.nnz(),
            epsilon = config.epsilon,
            "groundwater model assembled"
        );
        if grid.is_axial() {
            info!("axial mode: columns are rings, row direction ignored");
        }

        Ok(Self {
            grid,
            config: *config,
            kinds,
            active,
            fixed,
            conductances,
            matrix,
            storage,
            sources,
            heads,
            system: None,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn kinds(&self) -> &[CellKind] {
        &self.kinds
    }

    /// Conductance matrix `A`.
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    pub fn conductances(&self) -> &Conductances {
        &self.conductances
    }

    /// Current heads in node order.
    pub fn heads(&self) -> &[f64] {
        &self.heads
    }

    /// Current heads in grid shape.
    pub fn heads_array(&self) -> nd::Array3<f64> {
        self.to_grid(&self.heads)
    }

    /// Advances the heads by `dt`.
    ///
    /// `step` is only used for reporting.
    pub fn step(&mut self, step: usize, dt: f64) -> FlowResult<StepFlows> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(FlowError::InvalidTimeVector(format!(
                "time step {step} has non-positive length {dt}"
            )));
        }

        let system = match self.system.take() {
            Some(system) if system.dt == dt => system,
            _ => {
                debug!(step, dt, "assembling step matrix");
                StepSystem::new(&self.matrix, &self.storage, &self.active, &self.fixed, step, dt)?
            }
        };

        let old = self.heads.clone();
        let coupled = system.full.mul_vec_columns(&old, &self.fixed);
        let rhs: Vec<f64> = system
            .nodes
            .iter()
            .map(|&n| self.sources[n] - coupled[n] + self.storage[n] / dt * old[n])
            .collect();
        let x0: Vec<f64> = system.nodes.iter().map(|&n| old[n]).collect();

        let pcg = PcgConfig {
            max_iterations: self
                .config
                .pcg
                .max_iterations
                .max(ITERATIONS_PER_UNKNOWN * system.nodes.len()),
            ..self.config.pcg
        };
        let (x, outcome) = pcg_solve(&system.reduced, &rhs, &x0, pcg);
        if !outcome.converged {
            return Err(FlowError::NotConverged {
                step,
                iterations: outcome.iterations,
                residual: outcome.residual,
                tolerance: outcome.tolerance,
            });
        }
        trace!(
            step,
            iterations = outcome.iterations,
            residual = outcome.residual,
            "pcg converged"
        );

        // Provisional heads: fixed cells keep their value, inactive stay NaN
        let mut new = old.clone();
        for (&n, &h) in system.nodes.iter().zip(&x) {
            new[n] = h;
        }

        let q = net_flow(&self.matrix, &new, &self.kinds);
        let qs = storage_release(&self.storage, dt, &new, &old, &self.kinds);
        let face = face_flows(&self.to_grid(&new), &self.conductances);
        let budget = WaterBudget::from_flows(step, &q, &qs, &self.sources, &self.kinds);

        if budget.percent_discrepancy().abs() > DISCREPANCY_WARN_PERCENT {
            warn!(
                step,
                discrepancy = budget.discrepancy(),
                percent = budget.percent_discrepancy(),
                "water budget does not close"
            );
        }

        let epsilon = self.config.epsilon;
        if epsilon != 1.0 {
            for &n in &system.nodes {
                new[n] = old[n] + (new[n] - old[n]) / epsilon;
            }
        }
        self.heads = new;
        self.system = Some(system);

        debug!(step, dt, iterations = outcome.iterations, "time step done");

        Ok(StepFlows {
            step,
            dt,
            net_flow: q,
            storage_release: qs,
            face,
            budget,
            pcg: outcome,
        })
    }

    /// Node-ordered values rearranged into grid shape.
    pub fn to_grid(&self, values: &[f64]) -> nd::Array3<f64> {
        nd::Array3::from_shape_fn(self.grid.shape(), |(k, i, j)| {
            values[self.grid.node(k, i, j)]
        })
    }
}

/// Runs the whole transient simulation over `inputs.times`.
pub fn simulate(inputs: &ModelInputs, config: &SolverConfig) -> FlowResult<FlowSolution> {
    let mut solver = GroundwaterSolver::new(inputs, config)?;
    let mut solution = FlowSolution::allocate(inputs.times.clone(), inputs.grid.shape());

    solution
        .heads
        .index_axis_mut(nd::Axis(0), 0)
        .assign(&solver.heads_array());

    for (step, w) in inputs.times.windows(2).enumerate() {
        let flows = solver.step(step, w[1] - w[0])?;
        solution
            .heads
            .index_axis_mut(nd::Axis(0), step + 1)
            .assign(&solver.heads_array());
        solution
            .net_flow
            .index_axis_mut(nd::Axis(0), step)
            .assign(&solver.to_grid(&flows.net_flow));
        solution
            .storage_release
            .index_axis_mut(nd::Axis(0), step)
            .assign(&solver.to_grid(&flows.storage_release));
        solution.qx.index_axis_mut(nd::Axis(0), step).assign(&flows.face.qx);
        solution.qy.index_axis_mut(nd::Axis(0), step).assign(&flows.face.qy);
        solution.qz.index_axis_mut(nd::Axis(0), step).assign(&flows.face.qz);
        solution.budgets.push(flows.budget);
    }

    info!(steps = solution.n_steps(), "simulation finished");
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::groundwater::fields::Conductivity;

    fn row_model(n: usize) -> ModelInputs {
        let x: Vec<f64> = (0..=n).map(|j| j as f64).collect();
        let grid = Grid::new(&x, &[0.0, 1.0], &[0.0, -1.0], false).unwrap();
        let k = Conductivity::uniform(&grid, 1.0);
        ModelInputs::new(grid, k, vec![0.0, 1.0])
    }

    #[test]
    fn test_inactive_heads_are_nan_from_start() {
        let mut ibound = nd::Array3::<i32>::ones((1, 1, 4));
        ibound[[0, 0, 3]] = 0;
        ibound[[0, 0, 0]] = -1;
        let inputs = row_model(4)
            .with_ibound(ibound)
            .with_storage(nd::Array3::from_elem((1, 1, 4), 1e-3));
        let mut solver = GroundwaterSolver::new(&inputs, &SolverConfig::default()).unwrap();
        assert!(solver.heads()[3].is_nan());

        let flows = solver.step(0, 1.0).unwrap();
        assert!(solver.heads()[3].is_nan());
        assert_eq!(flows.net_flow[3], 0.0);
        assert_eq!(flows.storage_release[3], 0.0);
        assert_eq!(flows.face.qx[[0, 0, 2]], 0.0);
    }

    #[test]
    fn test_isolated_cell_without_storage_is_singular() {
        let mut ibound = nd::Array3::<i32>::ones((1, 1, 3));
        ibound[[0, 0, 1]] = 0;
        ibound[[0, 0, 0]] = -1;
        let inputs = row_model(3).with_ibound(ibound);
        let mut solver = GroundwaterSolver::new(&inputs, &SolverConfig::default()).unwrap();
        let err = solver.step(7, 1.0).unwrap_err();
        assert!(matches!(err, FlowError::SingularSystem { step: 7, .. }), "{err}");
    }

    #[test]
    fn test_floating_pair_without_storage_is_singular() {
        // fixed | inactive | active | active: the pair has no path to a fixed head
        let ibound = nd::Array3::from_shape_vec((1, 1, 4), vec![-1, 0, 1, 1]).unwrap();
        let hi = nd::Array3::from_shape_vec((1, 1, 4), vec![0.0, 0.0, 1.0, 3.0]).unwrap();
        let inputs = row_model(4).with_ibound(ibound.clone()).with_initial_heads(hi.clone());
        let err = simulate(&inputs, &SolverConfig::default()).unwrap_err();
        match err {
            FlowError::SingularSystem { step, reason } => {
                assert_eq!(step, 0);
                assert!(reason.contains("2 connected active cell"), "{reason}");
            }
            other => panic!("expected a singular system, got {other}"),
        }

        // Storage in the pair is enough to pin its heads
        let mut ss = nd::Array3::<f64>::zeros((1, 1, 4));
        ss[[0, 0, 3]] = 1e-3;
        let inputs = row_model(4)
            .with_ibound(ibound)
            .with_initial_heads(hi)
            .with_storage(ss);
        let solution = simulate(&inputs, &SolverConfig::default()).unwrap();
        assert!(solution.heads[[1, 0, 0, 1]].is_nan());
        assert!(solution.heads[[1, 0, 0, 2]].is_finite());
    }

    #[test]
    fn test_long_steady_column_converges() {
        let n = 6000;
        let mut ibound = nd::Array3::<i32>::ones((1, 1, n));
        ibound[[0, 0, 0]] = -1;
        ibound[[0, 0, n - 1]] = -1;
        let mut hi = nd::Array3::<f64>::zeros((1, 1, n));
        hi[[0, 0, 0]] = 10.0;
        let inputs = row_model(n).with_ibound(ibound).with_initial_heads(hi);

        let mut solver = GroundwaterSolver::new(&inputs, &SolverConfig::default()).unwrap();
        let flows = solver.step(0, 1.0).unwrap();
        assert!(flows.pcg.iterations > SolverConfig::default().pcg.max_iterations);

        let h = solver.heads();
        for j in (0..n).step_by(500) {
            let expected = 10.0 * (n - 1 - j) as f64 / (n - 1) as f64;
            assert!((h[j] - expected).abs() < 1e-2, "cell {j}: {} vs {expected}", h[j]);
        }
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let mut ibound = nd::Array3::<i32>::ones((1, 1, 50));
        ibound[[0, 0, 0]] = -1;
        ibound[[0, 0, 49]] = -1;
        let mut hi = nd::Array3::<f64>::zeros((1, 1, 50));
        hi[[0, 0, 0]] = 5.0;
        hi[[0, 0, 49]] = -2.0;
        let inputs = row_model(50).with_ibound(ibound).with_initial_heads(hi);
        let mut solver = GroundwaterSolver::new(&inputs, &SolverConfig::default()).unwrap();
        // Unreachable tolerance, so only the cap stops PCG
        solver.config.pcg = PcgConfig {
            max_iterations: 1,
            rel_tolerance: 1e-300,
            abs_tolerance: 1e-300,
        };
        let err = solver.step(3, 1.0).unwrap_err();
        match err {
            FlowError::NotConverged { step, iterations, .. } => {
                assert_eq!(step, 3);
                assert!(iterations > 1 && iterations <= ITERATIONS_PER_UNKNOWN * 48);
            }
            other => panic!("expected non-convergence, got {other}"),
        }
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        let mut solver = GroundwaterSolver::new(&row_model(2), &SolverConfig::default()).unwrap();
        assert!(matches!(
            solver.step(0, 0.0),
            Err(FlowError::InvalidTimeVector(_))
        ));
    }

    #[test]
    fn test_step_matrix_reused_for_equal_dt() {
        let mut ibound = nd::Array3::<i32>::ones((1, 1, 3));
        ibound[[0, 0, 0]] = -1;
        let mut hi = nd::Array3::<f64>::zeros((1, 1, 3));
        hi[[0, 0, 0]] = 1.0;
        let inputs = row_model(3)
            .with_ibound(ibound)
            .with_initial_heads(hi)
            .with_storage(nd::Array3::from_elem((1, 1, 3), 0.1));
        let mut solver = GroundwaterSolver::new(&inputs, &SolverConfig::default()).unwrap();
        solver.step(0, 0.5).unwrap();
        let cached = solver.system.as_ref().map(|s| s.dt);
        solver.step(1, 0.5).unwrap();
        assert_eq!(cached, Some(0.5));
        assert_eq!(solver.system.as_ref().map(|s| s.dt), Some(0.5));
        solver.step(2, 2.0).unwrap();
        assert_eq!(solver.system.as_ref().map(|s| s.dt), Some(2.0));
        // Heads rise towards the fixed head and stay below it
        let h = solver.heads();
        assert!(h[1] > h[2] && h[1] < 1.0);
    }

    #[test]
    fn test_invalid_epsilon_rejected_before_assembly() {
        let config = SolverConfig::new().with_epsilon(1.5);
        let err = GroundwaterSolver::new(&row_model(2), &config).unwrap_err();
        assert!(matches!(err, FlowError::InvalidConfiguration(_)));
    }
}
