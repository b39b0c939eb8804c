use ndarray as nd;
use std::f64::consts::PI;

use super::fields::CellKind;
use crate::grid::Grid;

/// Half-cell flow resistances [T/L2] in grid shape.
///
/// For every axis the cell is split at its center: `*_lo` is the half facing
/// the neighbor with the lower index (west, north, top), `*_hi` the half
/// facing the higher index. In axial mode `x_lo` is the inner half of the ring.
#[derive(Debug, Clone)]
pub struct HalfResistances {
    pub x_lo: nd::Array3<f64>,
    pub x_hi: nd::Array3<f64>,
    pub y_lo: nd::Array3<f64>,
    pub y_hi: nd::Array3<f64>,
    pub z_lo: nd::Array3<f64>,
    pub z_hi: nd::Array3<f64>,
}

/// Conductances [L2/T] between adjacent cells.
///
/// `cx[[k, i, j]]` couples `(k, i, j)` with `(k, i, j + 1)`, and likewise for
/// `cy` along rows and `cz` along layers.
#[derive(Debug, Clone)]
pub struct Conductances {
    pub cx: nd::Array3<f64>,
    pub cy: nd::Array3<f64>,
    pub cz: nd::Array3<f64>,
}

/// Returns a copy of `k` with values below `floor` raised to `floor`.
pub fn floor_conductivity(k: &nd::Array3<f64>, floor: f64) -> nd::Array3<f64> {
    k.mapv(|v| v.max(floor))
}

/// Half-cell resistances for Cartesian or axial geometry.
///
/// Conductivities must already be floored. Inactive cells get infinite
/// resistance on every side.
pub fn half_resistances(
    grid: &Grid,
    kx: &nd::Array3<f64>,
    ky: &nd::Array3<f64>,
    kz: &nd::Array3<f64>,
    kinds: &[CellKind],
) -> HalfResistances {
    let shape = grid.shape();
    let dx = grid.dx();
    let dy = grid.dy();
    let dz = grid.dz();

    let mut res = if grid.is_axial() {
        let x = grid.x();
        let xm = grid.xm();
        // ln(xm / 0) is infinite; the inner face of the innermost ring never
        // carries flow, so any positive proxy will do.
        let x_inner0 = if x[0] > 0.0 { x[0] } else { 0.1 * x[1] };

        let x_hi = nd::Array3::from_shape_fn(shape, |(k, i, j)| {
            (x[j + 1] / xm[j]).ln() / (2.0 * PI * kx[[k, i, j]] * dz[k])
        });
        let x_lo = nd::Array3::from_shape_fn(shape, |(k, i, j)| {
            let inner = if j == 0 { x_inner0 } else { x[j] };
            (xm[j] / inner).ln() / (2.0 * PI * kx[[k, i, j]] * dz[k])
        });
        let y = nd::Array3::from_elem(shape, f64::INFINITY);
        let z = nd::Array3::from_shape_fn(shape, |(k, i, j)| {
            0.5 * dz[k] / (grid.horizontal_area(i, j) * kz[[k, i, j]])
        });
        HalfResistances {
            x_lo,
            x_hi,
            y_lo: y.clone(),
            y_hi: y,
            z_lo: z.clone(),
            z_hi: z,
        }
    } else {
        let rx = nd::Array3::from_shape_fn(shape, |(k, i, j)| {
            0.5 * dx[j] / (dy[i] * dz[k]) / kx[[k, i, j]]
        });
        let ry = nd::Array3::from_shape_fn(shape, |(k, i, j)| {
            0.5 * dy[i] / (dz[k] * dx[j]) / ky[[k, i, j]]
        });
        let rz = nd::Array3::from_shape_fn(shape, |(k, i, j)| {
            0.5 * dz[k] / (dx[j] * dy[i]) / kz[[k, i, j]]
        });
        HalfResistances {
            x_lo: rx.clone(),
            x_hi: rx,
            y_lo: ry.clone(),
            y_hi: ry,
            z_lo: rz.clone(),
            z_hi: rz,
        }
    };

    for (node, kind) in kinds.iter().enumerate() {
        if *kind != CellKind::Inactive {
            continue;
        }
        let idx = grid.lrc(node);
        for r in [
            &mut res.x_lo,
            &mut res.x_hi,
            &mut res.y_lo,
            &mut res.y_hi,
            &mut res.z_lo,
            &mut res.z_hi,
        ] {
            r[[idx.0, idx.1, idx.2]] = f64::INFINITY;
        }
    }

    res
}

/// Series conductance of adjacent half cells: `1 / (R_hi(a) + R_lo(b))`.
///
/// An infinite half resistance yields zero conductance.
pub fn conductances(res: &HalfResistances) -> Conductances {
    use ndarray::s;

    let series = |hi: nd::ArrayView3<f64>, lo: nd::ArrayView3<f64>| {
        nd::Zip::from(hi).and(lo).map_collect(|&a, &b| 1.0 / (a + b))
    };

    Conductances {
        cx: series(res.x_hi.slice(s![.., .., ..-1]), res.x_lo.slice(s![.., .., 1..])),
        cy: series(res.y_hi.slice(s![.., ..-1, ..]), res.y_lo.slice(s![.., 1.., ..])),
        cz: series(res.z_hi.slice(s![..-1, .., ..]), res.z_lo.slice(s![1.., .., ..])),
    }
}

/// Floors the conductivities and computes all inter-cell conductances.
pub fn build_conductances(
    grid: &Grid,
    kx: &nd::Array3<f64>,
    ky: &nd::Array3<f64>,
    kz: &nd::Array3<f64>,
    kinds: &[CellKind],
    floor: f64,
) -> Conductances {
    let kx = floor_conductivity(kx, floor);
    let ky = floor_conductivity(ky, floor);
    let kz = floor_conductivity(kz, floor);
    conductances(&half_resistances(grid, &kx, &ky, &kz, kinds))
}
