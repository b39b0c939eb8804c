//! Flows derived from a solved head field.
//!
//! Sign conventions:
//! - `qx[[k, i, j]]` is the flow from column `j` to column `j + 1`.
//! - `qy[[k, i, j]]` is the flow from row `i + 1` to row `i`.
//! - `qz[[k, i, j]]` is the flow from layer `k + 1` up to layer `k`.

use ndarray as nd;
use ndarray::s;

use super::conductance::Conductances;
use super::fields::CellKind;
use super::matrix::CsrMatrix;

/// Face flows [L3/T] along the three axes.
#[derive(Debug, Clone)]
pub struct FaceFlows {
    pub qx: nd::Array3<f64>,
    pub qy: nd::Array3<f64>,
    pub qz: nd::Array3<f64>,
}

/// Net flow leaving each cell through its faces, `A h`.
///
/// Inactive cells contribute nothing and get zero.
pub fn net_flow(a: &CsrMatrix, heads: &[f64], kinds: &[CellKind]) -> Vec<f64> {
    let h: Vec<f64> = heads
        .iter()
        .zip(kinds)
        .map(|(&h, kind)| if *kind == CellKind::Inactive { 0.0 } else { h })
        .collect();
    let mut q = vec![0.0; h.len()];
    a.mul_vec(&h, &mut q);
    q
}

/// Water released from storage during a step, `-(Cs / dt) (h_new - h_old)`.
pub fn storage_release(
    storage: &[f64],
    dt: f64,
    new: &[f64],
    old: &[f64],
    kinds: &[CellKind],
) -> Vec<f64> {
    (0..storage.len())
        .map(|n| match kinds[n] {
            CellKind::Active => -storage[n] / dt * (new[n] - old[n]),
            _ => 0.0,
        })
        .collect()
}

/// Face flows from heads in grid shape.
///
/// Faces with zero conductance report zero flow, so NaN heads of inactive
/// cells do not leak into the result.
pub fn face_flows(heads: &nd::Array3<f64>, c: &Conductances) -> FaceFlows {
    let flow = |lo: nd::ArrayView3<f64>, hi: nd::ArrayView3<f64>, cond: &nd::Array3<f64>, sign: f64| {
        nd::Zip::from(lo)
            .and(hi)
            .and(cond)
            .map_collect(|&l, &h, &c| if c == 0.0 { 0.0 } else { sign * (h - l) * c })
    };

    FaceFlows {
        qx: flow(heads.slice(s![.., .., ..-1]), heads.slice(s![.., .., 1..]), &c.cx, -1.0),
        qy: flow(heads.slice(s![.., ..-1, ..]), heads.slice(s![.., 1.., ..]), &c.cy, 1.0),
        qz: flow(heads.slice(s![..-1, .., ..]), heads.slice(s![1.., .., ..]), &c.cz, 1.0),
    }
}

/// Net outflow of every cell summed from its face flows.
///
/// For active cells this equals [`net_flow`] up to solver tolerance.
pub fn net_face_outflow(flows: &FaceFlows) -> nd::Array3<f64> {
    let (nz, ny, _) = flows.qx.dim();
    let nx = flows.qy.dim().2;
    let mut out = nd::Array3::<f64>::zeros((nz, ny, nx));

    for ((k, i, j), &q) in flows.qx.indexed_iter() {
        out[[k, i, j]] += q;
        out[[k, i, j + 1]] -= q;
    }
    for ((k, i, j), &q) in flows.qy.indexed_iter() {
        out[[k, i + 1, j]] += q;
        out[[k, i, j]] -= q;
    }
    for ((k, i, j), &q) in flows.qz.indexed_iter() {
        out[[k + 1, i, j]] += q;
        out[[k, i, j]] -= q;
    }
    out
}
