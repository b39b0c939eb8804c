use ndarray as nd;

use super::budget::WaterBudget;

/// Output of a full transient run.
///
/// Heads have one entry per time (`times.len()`), flows one entry per step
/// (`times.len() - 1`). Inactive cells hold NaN heads and zero flows.
#[derive(Debug, Clone)]
pub struct FlowSolution {
    pub times: Vec<f64>,
    /// Heads `[time, layer, row, col]`.
    pub heads: nd::Array4<f64>,
    /// Net cell outflow `A h` per step.
    pub net_flow: nd::Array4<f64>,
    /// Storage release per step.
    pub storage_release: nd::Array4<f64>,
    /// Column face flows `[step, layer, row, col < nx - 1]`.
    pub qx: nd::Array4<f64>,
    /// Row face flows `[step, layer, row < ny - 1, col]`.
    pub qy: nd::Array4<f64>,
    /// Layer face flows `[step, layer < nz - 1, row, col]`.
    pub qz: nd::Array4<f64>,
    pub budgets: Vec<WaterBudget>,
}

impl FlowSolution {
    pub(crate) fn allocate(times: Vec<f64>, shape: (usize, usize, usize)) -> Self {
        let (nz, ny, nx) = shape;
        let nt = times.len() - 1;
        Self {
            heads: nd::Array4::from_elem((nt + 1, nz, ny, nx), f64::NAN),
            net_flow: nd::Array4::zeros((nt, nz, ny, nx)),
            storage_release: nd::Array4::zeros((nt, nz, ny, nx)),
            qx: nd::Array4::zeros((nt, nz, ny, nx.saturating_sub(1))),
            qy: nd::Array4::zeros((nt, nz, ny.saturating_sub(1), nx)),
            qz: nd::Array4::zeros((nt, nz.saturating_sub(1), ny, nx)),
            budgets: Vec::with_capacity(nt),
            times,
        }
    }

    pub fn n_steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Heads at `times[it]`.
    pub fn heads_at(&self, it: usize) -> nd::ArrayView3<'_, f64> {
        self.heads.index_axis(nd::Axis(0), it)
    }

    pub fn final_heads(&self) -> nd::ArrayView3<'_, f64> {
        self.heads_at(self.n_steps())
    }

    pub fn budget(&self, step: usize) -> Option<&WaterBudget> {
        self.budgets.get(step)
    }
}
