//! Block-centered finite-difference grid.
//!
//! The grid is a geometry provider only: it takes cell boundary coordinates
//! from the caller and derives spacing, volumes and node numbering. Layer 0 is
//! the top layer and row 0 is the row with the largest `y`, as in MODFLOW.
//!
//! In axial mode `x` holds radii, the single row represents a full ring
//! around the axis, and `y` only sets the row count.

use crate::error::{FlowError, FlowResult};
use ndarray as nd;
use std::f64::consts::PI;

/// Rectilinear 3D grid with shape `(nz, ny, nx)`.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Column boundaries, ascending (radii in axial mode).
    x: Vec<f64>,
    /// Row boundaries, descending.
    y: Vec<f64>,
    /// Layer elevations, descending (top first).
    z: Vec<f64>,
    axial: bool,
}

impl Grid {
    /// Creates a grid from cell boundary coordinates.
    ///
    /// Coordinates may be given in any order; duplicates are removed.
    /// Each axis needs at least two distinct values.
    pub fn new(x: &[f64], y: &[f64], z: &[f64], axial: bool) -> FlowResult<Self> {
        let x = unique_sorted("x", x)?;
        let mut y = unique_sorted("y", y)?;
        let mut z = unique_sorted("z", z)?;
        y.reverse();
        z.reverse();

        if axial && x[0] < 0.0 {
            return Err(FlowError::InvalidGrid(format!(
                "radial coordinates must be non-negative, got x[0] = {}",
                x[0]
            )));
        }

        Ok(Self { x, y, z, axial })
    }

    /// Axisymmetric grid with a single row: `r` are ring boundaries, `z` layer
    /// elevations.
    pub fn axial(r: &[f64], z: &[f64]) -> FlowResult<Self> {
        Self::new(r, &[-0.5, 0.5], z, true)
    }

    pub fn nx(&self) -> usize {
        self.x.len() - 1
    }

    pub fn ny(&self) -> usize {
        self.y.len() - 1
    }

    pub fn nz(&self) -> usize {
        self.z.len() - 1
    }

    /// Grid shape as `(nz, ny, nx)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nz(), self.ny(), self.nx())
    }

    /// Total number of cells.
    pub fn nod(&self) -> usize {
        self.nz() * self.ny() * self.nx()
    }

    pub fn is_axial(&self) -> bool {
        self.axial
    }

    /// Flat node number of cell `(layer, row, col)`.
    pub fn node(&self, layer: usize, row: usize, col: usize) -> usize {
        (layer * self.ny() + row) * self.nx() + col
    }

    /// Inverse of [`Grid::node`].
    pub fn lrc(&self, node: usize) -> (usize, usize, usize) {
        let nx = self.nx();
        let ny = self.ny();
        (node / (nx * ny), (node / nx) % ny, node % nx)
    }

    /// Node numbers arranged in grid shape.
    pub fn nod_array(&self) -> nd::Array3<usize> {
        nd::Array3::from_shape_fn(self.shape(), |(k, i, j)| self.node(k, i, j))
    }

    /// Column boundaries (radii in axial mode).
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Column widths.
    pub fn dx(&self) -> Vec<f64> {
        self.x.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Row widths.
    pub fn dy(&self) -> Vec<f64> {
        self.y.windows(2).map(|w| w[0] - w[1]).collect()
    }

    /// Layer thicknesses.
    pub fn dz(&self) -> Vec<f64> {
        self.z.windows(2).map(|w| w[0] - w[1]).collect()
    }

    /// Column centers (ring center radii in axial mode).
    pub fn xm(&self) -> Vec<f64> {
        self.x.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Layer center elevations.
    pub fn zm(&self) -> Vec<f64> {
        self.z.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Horizontal cell area per column and row.
    ///
    /// In axial mode this is the ring area `π (r_outer² - r_inner²)`.
    pub fn horizontal_area(&self, row: usize, col: usize) -> f64 {
        if self.axial {
            PI * (self.x[col + 1].powi(2) - self.x[col].powi(2))
        } else {
            (self.x[col + 1] - self.x[col]) * (self.y[row] - self.y[row + 1])
        }
    }

    /// Cell volumes in grid shape.
    pub fn volumes(&self) -> nd::Array3<f64> {
        let dz = self.dz();
        nd::Array3::from_shape_fn(self.shape(), |(k, i, j)| {
            self.horizontal_area(i, j) * dz[k]
        })
    }
}

fn unique_sorted(axis: &str, values: &[f64]) -> FlowResult<Vec<f64>> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(FlowError::InvalidGrid(format!(
            "{axis} contains a non-finite coordinate ({bad})"
        )));
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v.dedup();
    if v.len() < 2 {
        return Err(FlowError::InvalidGrid(format!(
            "{axis} needs at least two distinct coordinates, got {}",
            v.len()
        )));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_spacing() {
        let grid = Grid::new(&[0.0, 1.0, 3.0, 6.0], &[0.0, 2.0], &[0.0, -5.0, -10.0], false)
            .unwrap();
        assert_eq!(grid.shape(), (2, 1, 3));
        assert_eq!(grid.nod(), 6);
        assert_eq!(grid.dx(), vec![1.0, 2.0, 3.0]);
        assert_eq!(grid.dy(), vec![2.0]);
        assert_eq!(grid.dz(), vec![5.0, 5.0]);
        assert_eq!(grid.xm(), vec![0.5, 2.0, 4.5]);
    }

    #[test]
    fn test_coordinates_are_sorted_and_deduplicated() {
        let grid = Grid::new(&[3.0, 0.0, 1.0, 1.0], &[1.0, 0.0], &[-10.0, 0.0], false).unwrap();
        assert_eq!(grid.x(), &[0.0, 1.0, 3.0]);
        assert_eq!(grid.y(), &[1.0, 0.0]);
        assert_eq!(grid.z(), &[0.0, -10.0]);
    }

    #[test]
    fn test_node_numbering_roundtrip() {
        let grid = Grid::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0], false).unwrap();
        let nod = grid.nod_array();
        for ((k, i, j), &n) in nod.indexed_iter() {
            assert_eq!(grid.lrc(n), (k, i, j));
        }
        assert_eq!(nod[[0, 2, 1]], 5);
    }

    #[test]
    fn test_axial_volumes_are_rings() {
        let grid = Grid::axial(&[0.0, 1.0, 2.0], &[0.0, -2.0]).unwrap();
        let vol = grid.volumes();
        assert!((vol[[0, 0, 0]] - PI * 2.0).abs() < 1e-12);
        assert!((vol[[0, 0, 1]] - PI * 3.0 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_degenerate_axis() {
        let err = Grid::new(&[1.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap_err();
        assert!(matches!(err, FlowError::InvalidGrid(_)));
    }

    #[test]
    fn test_rejects_negative_radius() {
        assert!(Grid::axial(&[-1.0, 1.0], &[0.0, 1.0]).is_err());
    }
}
