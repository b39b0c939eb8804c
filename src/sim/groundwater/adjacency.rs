use ndarray as nd;
use ndarray::s;

use crate::grid::Grid;

/// Grid axis in `(layer, row, column)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Pair of neighboring nodes; `lo` has the lower index along the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePair {
    pub lo: usize,
    pub hi: usize,
}

/// Neighbor node pairs per axis.
///
/// Pairs are listed in the same row-major order as the faces in
/// [`Conductances`](super::conductance::Conductances), so `x[n]` belongs to
/// `cx.iter().nth(n)`.
#[derive(Debug, Clone)]
pub struct Adjacency {
    n_nodes: usize,
    x: Vec<NodePair>,
    y: Vec<NodePair>,
    z: Vec<NodePair>,
}

impl Adjacency {
    pub fn from_grid(grid: &Grid) -> Self {
        let nod = grid.nod_array();
        Self {
            n_nodes: grid.nod(),
            // west / east
            x: pairs(nod.slice(s![.., .., ..-1]), nod.slice(s![.., .., 1..])),
            // north / south
            y: pairs(nod.slice(s![.., ..-1, ..]), nod.slice(s![.., 1.., ..])),
            // top / bottom
            z: pairs(nod.slice(s![..-1, .., ..]), nod.slice(s![1.., .., ..])),
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn pairs(&self, axis: Axis) -> &[NodePair] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

fn pairs(lo: nd::ArrayView3<usize>, hi: nd::ArrayView3<usize>) -> Vec<NodePair> {
    lo.iter()
        .zip(hi.iter())
        .map(|(&lo, &hi)| NodePair { lo, hi })
        .collect()
}
