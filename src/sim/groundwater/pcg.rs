use super::config::PcgConfig;
use super::matrix::CsrMatrix;

/// Convergence report of one PCG solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcgOutcome {
    pub iterations: usize,
    /// Final residual 2-norm.
    pub residual: f64,
    /// Residual norm that counts as converged.
    pub tolerance: f64,
    pub converged: bool,
}

/// Solves `A x = b` for symmetric positive definite `A` with Jacobi
/// preconditioned conjugate gradients, starting from `x0`.
///
/// Returns the last iterate together with the convergence report; the caller
/// decides what to do when `converged` is false.
pub fn pcg_solve(a: &CsrMatrix, b: &[f64], x0: &[f64], config: PcgConfig) -> (Vec<f64>, PcgOutcome) {
    let n = b.len();
    assert_eq!(a.n(), n, "matrix and rhs sizes differ");
    assert_eq!(x0.len(), n, "initial guess and rhs sizes differ");

    let tolerance = config.abs_tolerance.max(config.rel_tolerance * l2_norm(b));
    let mut outcome = PcgOutcome {
        iterations: 0,
        residual: 0.0,
        tolerance,
        converged: true,
    };
    if n == 0 {
        return (Vec::new(), outcome);
    }

    let inv_diag: Vec<f64> = a
        .diagonal()
        .iter()
        .map(|&d| if d.abs() > 1e-300 { 1.0 / d } else { 1.0 })
        .collect();

    let mut x = x0.to_vec();
    let mut ax = vec![0.0; n];
    a.mul_vec(&x, &mut ax);
    let mut r: Vec<f64> = b.iter().zip(&ax).map(|(bi, ai)| bi - ai).collect();

    outcome.residual = l2_norm(&r);
    if outcome.residual <= tolerance {
        return (x, outcome);
    }

    let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(ri, di)| ri * di).collect();
    let mut p = z.clone();
    let mut rz_old = dot(&r, &z);
    let mut ap = vec![0.0; n];

    outcome.converged = false;
    for iter in 0..config.max_iterations {
        a.mul_vec(&p, &mut ap);
        let denom = dot(&p, &ap);
        if !(denom > 0.0) || !rz_old.is_finite() {
            // Not positive definite, or breakdown
            break;
        }

        let alpha = rz_old / denom;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }

        outcome.iterations = iter + 1;
        outcome.residual = l2_norm(&r);
        if outcome.residual <= tolerance {
            outcome.converged = true;
            break;
        }

        for i in 0..n {
            z[i] = r[i] * inv_diag[i];
        }
        let rz_new = dot(&r, &z);
        let beta = rz_new / rz_old;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
        rz_old = rz_new;
    }

    (x, outcome)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::groundwater::matrix::CsrBuilder;

    fn tridiagonal(n: usize, diag: f64, off: f64) -> CsrMatrix {
        let mut b = CsrBuilder::new(n);
        for i in 0..n {
            b.add(i, i, diag);
            if i + 1 < n {
                b.add(i, i + 1, off);
                b.add(i + 1, i, off);
            }
        }
        b.build()
    }

    #[test]
    fn test_pcg_solves_spd_system() {
        let a = tridiagonal(50, 2.0, -1.0);
        let x_true: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
        let mut b = vec![0.0; 50];
        a.mul_vec(&x_true, &mut b);

        let (x, outcome) = pcg_solve(&a, &b, &vec![0.0; 50], PcgConfig::default());
        assert!(outcome.converged, "{outcome:?}");
        for (xi, ti) in x.iter().zip(&x_true) {
            assert!((xi - ti).abs() < 1e-6, "x={xi}, expected {ti}");
        }
    }

    #[test]
    fn test_exact_initial_guess_needs_no_iterations() {
        let a = tridiagonal(4, 3.0, -1.0);
        let x0 = vec![1.0, 2.0, 3.0, 4.0];
        let mut b = vec![0.0; 4];
        a.mul_vec(&x0, &mut b);
        let (x, outcome) = pcg_solve(&a, &b, &x0, PcgConfig::default());
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.converged);
        assert_eq!(x, x0);
    }

    #[test]
    fn test_singular_matrix_does_not_converge() {
        // Pure Neumann Laplacian with inconsistent rhs has no solution.
        let mut bld = CsrBuilder::new(2);
        bld.add(0, 0, 1.0);
        bld.add(0, 1, -1.0);
        bld.add(1, 0, -1.0);
        bld.add(1, 1, 1.0);
        let a = bld.build();
        let config = PcgConfig {
            max_iterations: 20,
            ..PcgConfig::default()
        };
        let (_, outcome) = pcg_solve(&a, &[1.0, 1.0], &[0.0, 0.0], config);
        assert!(!outcome.converged);
    }

    #[test]
    fn test_empty_system() {
        let a = CsrBuilder::new(0).build();
        let (x, outcome) = pcg_solve(&a, &[], &[], PcgConfig::default());
        assert!(x.is_empty());
        assert!(outcome.converged);
    }
}
