use rayon::prelude::*;
use std::collections::BTreeMap;

use super::adjacency::{Adjacency, Axis};
use super::conductance::Conductances;

/// Row count above which matrix-vector products run on the rayon pool.
const PARALLEL_ROWS: usize = 20_000;

/// Square sparse matrix in compressed sparse row format.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

/// Accumulating builder for [`CsrMatrix`].
///
/// Repeated `add` calls on the same `(row, col)` are summed.
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    pub fn new(n: usize) -> Self {
        Self {
            rows: vec![BTreeMap::new(); n],
        }
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            row < self.rows.len() && col < self.rows.len(),
            "entry ({row}, {col}) out of range for {n}x{n} matrix",
            n = self.rows.len()
        );
        *self.rows[row].entry(col).or_insert(0.0) += value;
    }

    pub fn build(self) -> CsrMatrix {
        let n = self.rows.len();
        let nnz = self.rows.iter().map(|r| r.len()).sum();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for row in self.rows {
            for (col, val) in row {
                col_idx.push(col);
                values.push(val);
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            n,
            row_ptr,
            col_idx,
            values,
        }
    }
}

impl CsrMatrix {
    /// Number of rows (and columns).
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterator over `(col, value)` of one row.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Value at `(row, col)`, zero if not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[range.clone()].binary_search(&col) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => 0.0,
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.get(i, i)).collect()
    }

    pub fn row_sum(&self, row: usize) -> f64 {
        self.row(row).map(|(_, v)| v).sum()
    }

    /// `y = A x`.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n, "x length must match matrix size");
        assert_eq!(y.len(), self.n, "y length must match matrix size");
        if self.n >= PARALLEL_ROWS {
            y.par_iter_mut()
                .enumerate()
                .for_each(|(i, yi)| *yi = self.row_dot(i, x));
        } else {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = self.row_dot(i, x);
            }
        }
    }

    /// `A x` restricted to the columns where `columns[j]` is true.
    ///
    /// Entries of `x` outside the mask are never read, so they may be NaN.
    pub fn mul_vec_columns(&self, x: &[f64], columns: &[bool]) -> Vec<f64> {
        (0..self.n)
            .map(|i| {
                self.row(i)
                    .filter(|(j, _)| columns[*j])
                    .map(|(j, v)| v * x[j])
                    .sum::<f64>()
            })
            .collect()
    }

    fn row_dot(&self, row: usize, x: &[f64]) -> f64 {
        self.row(row).map(|(j, v)| v * x[j]).sum()
    }

    /// Returns `A + diag(d)`.
    pub fn with_added_diagonal(&self, d: &[f64]) -> CsrMatrix {
        assert_eq!(d.len(), self.n, "diagonal length must match matrix size");
        let mut builder = CsrBuilder::new(self.n);
        for i in 0..self.n {
            for (j, v) in self.row(i) {
                builder.add(i, j, v);
            }
            if d[i] != 0.0 {
                builder.add(i, i, d[i]);
            }
        }
        builder.build()
    }

    /// Restriction to the rows and columns where `keep` is true.
    ///
    /// Returns the reduced matrix and, for each reduced index, the original
    /// index.
    pub fn submatrix(&self, keep: &[bool]) -> (CsrMatrix, Vec<usize>) {
        assert_eq!(keep.len(), self.n, "mask length must match matrix size");
        let kept: Vec<usize> = (0..self.n).filter(|&i| keep[i]).collect();
        let mut reduced = vec![usize::MAX; self.n];
        for (r, &i) in kept.iter().enumerate() {
            reduced[i] = r;
        }

        let mut row_ptr = Vec::with_capacity(kept.len() + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for &i in &kept {
            // Columns stay sorted because the index map is monotonic.
            for (j, v) in self.row(i) {
                if keep[j] {
                    col_idx.push(reduced[j]);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }

        let matrix = CsrMatrix {
            n: kept.len(),
            row_ptr,
            col_idx,
            values,
        };
        (matrix, kept)
    }
}

/// Assembles the conductance matrix `A`.
///
/// Off-diagonal entries are `-C` for every coupled pair, in both directions;
/// the diagonal holds the sum of the conductances of each cell, so every row
/// sums to zero. Faces with zero conductance are not stored.
pub fn assemble_conductance_matrix(adjacency: &Adjacency, conductances: &Conductances) -> CsrMatrix {
    let mut builder = CsrBuilder::new(adjacency.n_nodes());

    let faces = [
        (Axis::X, &conductances.cx),
        (Axis::Y, &conductances.cy),
        (Axis::Z, &conductances.cz),
    ];
    for (axis, c) in faces {
        let pairs = adjacency.pairs(axis);
        assert_eq!(
            pairs.len(),
            c.len(),
            "{axis:?}: {} node pairs but {} conductances",
            pairs.len(),
            c.len()
        );
        for (pair, &cond) in pairs.iter().zip(c.iter()) {
            if cond == 0.0 {
                continue;
            }
            builder.add(pair.lo, pair.hi, -cond);
            builder.add(pair.hi, pair.lo, -cond);
            builder.add(pair.lo, pair.lo, cond);
            builder.add(pair.hi, pair.hi, cond);
        }
    }

    builder.build()
}
