//! Maximum-caliber transition-rate matrices over the density grid.
//!
//! Following the maximum-caliber construction, the unscaled rate between
//! grid points `i` and `j` within `d` bins of each other is fixed by the
//! stationary density alone:
//!
//! ```text
//! M[i][j] = -sqrt(p_i / p_j) / S      for 0 < |i - j| <= d
//! S       = sum over that band of sqrt(p_i * p_j)
//! ```
//!
//! Each diagonal entry balances its column, so columns sum to zero and the
//! eigenvalues of the resulting generator are relaxation rates (up to the
//! overall dynamical scale). The scale comes either from a caller-supplied
//! diffusivity or from counting neighbor transitions in a binned
//! trajectory.

use nalgebra::DMatrix;

/// Fraction of consecutive frame pairs that stay within `max_hop` bins.
///
/// This is the observed average transition rate used to scale the
/// unscaled caliber matrix. Fewer than two frames leave the rate
/// undefined and return NaN.
pub fn avg_neighbor_transitions(bins: &[usize], max_hop: usize) -> f64 {
    if bins.len() < 2 {
        return f64::NAN;
    }
    let neighbors = bins
        .windows(2)
        .filter(|pair| pair[0].abs_diff(pair[1]) <= max_hop)
        .count();
    neighbors as f64 / (bins.len() - 1) as f64
}

/// Unscaled maximum-caliber rate matrix for a stationary density.
///
/// Off-diagonal entries follow the band formula above; entries further
/// than `max_hop` bins from the diagonal stay zero. Vanishing density
/// values propagate as non-finite entries rather than errors.
pub fn probability_matrix(density: &[f64], max_hop: usize) -> DMatrix<f64> {
    let n = density.len();
    let mut caliber = 0.0;
    for i in 0..n {
        for j in 0..n {
            let hop = i.abs_diff(j);
            if hop > 0 && hop <= max_hop {
                caliber += (density[i] * density[j]).sqrt();
            }
        }
    }
    let mut matrix = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let hop = i.abs_diff(j);
            if hop > 0 && hop <= max_hop {
                matrix[(i, j)] = -(density[i] / density[j]).sqrt() / caliber;
            }
        }
    }
    for j in 0..n {
        let column_sum: f64 = (0..n).filter(|&i| i != j).map(|i| matrix[(i, j)]).sum();
        matrix[(j, j)] = -column_sum;
    }
    matrix
}

/// Scaled maximum-caliber generator for a density and a binned trajectory.
///
/// The unscaled matrix multiplies the dynamical rate: `diffusivity` when
/// given, otherwise the neighbor-transition rate observed in `binned`. An
/// undefined observed rate (under two frames) yields an all-NaN generator.
pub fn max_cal_matrix(
    density: &[f64],
    binned: &[usize],
    max_hop: usize,
    diffusivity: Option<f64>,
) -> DMatrix<f64> {
    let scale = diffusivity.unwrap_or_else(|| avg_neighbor_transitions(binned, max_hop));
    probability_matrix(density, max_hop) * scale
}
