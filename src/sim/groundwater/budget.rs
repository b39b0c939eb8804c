use serde::Serialize;

use super::fields::CellKind;

/// Volumetric water budget [L3/T] of one time step, MODFLOW style.
///
/// All terms are non-negative rates; "in" means water entering the flow
/// system of active cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterBudget {
    pub step: usize,
    /// Prescribed injection at active cells.
    pub sources_in: f64,
    /// Prescribed extraction at active cells.
    pub sources_out: f64,
    /// Water released from storage.
    pub storage_in: f64,
    /// Water taken into storage.
    pub storage_out: f64,
    /// Flow entering the model from fixed-head cells.
    pub fixed_head_in: f64,
    /// Flow leaving the model into fixed-head cells.
    pub fixed_head_out: f64,
}

impl WaterBudget {
    /// Aggregates one step from per-cell net flow `q`, storage release `qs`
    /// and prescribed flows `fq`.
    pub fn from_flows(step: usize, q: &[f64], qs: &[f64], fq: &[f64], kinds: &[CellKind]) -> Self {
        let mut budget = Self {
            step,
            sources_in: 0.0,
            sources_out: 0.0,
            storage_in: 0.0,
            storage_out: 0.0,
            fixed_head_in: 0.0,
            fixed_head_out: 0.0,
        };

        for (n, kind) in kinds.iter().enumerate() {
            match kind {
                CellKind::Active => {
                    split(fq[n], &mut budget.sources_in, &mut budget.sources_out);
                    split(qs[n], &mut budget.storage_in, &mut budget.storage_out);
                }
                CellKind::FixedHead => {
                    // A fixed cell's net outflow feeds its active neighbors
                    split(q[n], &mut budget.fixed_head_in, &mut budget.fixed_head_out);
                }
                CellKind::Inactive => {}
            }
        }
        budget
    }

    pub fn total_in(&self) -> f64 {
        self.sources_in + self.storage_in + self.fixed_head_in
    }

    pub fn total_out(&self) -> f64 {
        self.sources_out + self.storage_out + self.fixed_head_out
    }

    /// `total_in - total_out`; zero up to solver tolerance.
    pub fn discrepancy(&self) -> f64 {
        self.total_in() - self.total_out()
    }

    /// Discrepancy relative to the mean of inflow and outflow, in percent.
    pub fn percent_discrepancy(&self) -> f64 {
        let mean = 0.5 * (self.total_in() + self.total_out());
        if mean > 0.0 {
            100.0 * self.discrepancy() / mean
        } else {
            0.0
        }
    }
}

fn split(value: f64, pos: &mut f64, neg: &mut f64) {
    if value >= 0.0 {
        *pos += value;
    } else {
        *neg -= value;
    }
}
