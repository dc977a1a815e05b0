//! Eigenvalue extraction and spectral-gap scoring of rate generators.

use log::debug;
use nalgebra::{DMatrix, Schur};

/// Convergence threshold for the Schur reduction.
const SCHUR_EPS: f64 = 1e-12;
/// Iteration cap for the Schur reduction.
const SCHUR_MAX_ITER: usize = 10_000;

/// Real parts of the generator eigenvalues, sorted ascending.
///
/// A generator holding non-finite entries, or one whose Schur reduction
/// fails to converge within the iteration cap, yields an all-NaN spectrum
/// instead of an error so that degenerate candidates score as unusable
/// rather than aborting a search. An empty generator has an empty
/// spectrum.
pub fn sorted_eigenvalues(matrix: &DMatrix<f64>) -> Vec<f64> {
    let n = matrix.nrows();
    if n == 0 {
        return Vec::new();
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        debug!("rate generator holds non-finite entries, spectrum undefined");
        return vec![f64::NAN; n];
    }
    let schur = match Schur::try_new(matrix.clone(), SCHUR_EPS, SCHUR_MAX_ITER) {
        Some(schur) => schur,
        None => {
            debug!("Schur reduction did not converge within {SCHUR_MAX_ITER} iterations");
            return vec![f64::NAN; n];
        }
    };
    let mut eigenvalues: Vec<f64> = schur
        .complex_eigenvalues()
        .iter()
        .map(|ev| ev.re)
        .collect();
    eigenvalues.sort_by(f64::total_cmp);
    eigenvalues
}

/// Timescale separation between slow and fast relaxation modes.
///
/// With eigenvalues sorted ascending, a profile of `wells` metastable
/// basins keeps indices `0..wells` for slow inter-basin exchange. The gap
///
/// ```text
/// exp(-lambda[wells - 1]) - exp(-lambda[wells])
/// ```
///
/// grows with the separation between the slowest retained mode and the
/// fastest discarded one. A well count of zero, or one leaving no faster
/// mode, returns NaN.
pub fn spectral_gap(eigenvalues: &[f64], wells: usize) -> f64 {
    if wells == 0 || eigenvalues.len() <= wells {
        return f64::NAN;
    }
    (-eigenvalues[wells - 1]).exp() - (-eigenvalues[wells]).exp()
}
