//! Stationary probability estimation along a projected reaction coordinate.
//!
//! Two estimators are provided. The histogram estimator drops each sample
//! into one of `bins` equal-width intervals spanning the sampled range and
//! reports per-bin probability masses at the interval centers. The KDE
//! estimator places a Gaussian kernel of fixed bandwidth on every sample
//! and evaluates the mixture on an inclusive endpoint grid:
//!
//! ```text
//! pdf(g) = sum_i w_i * exp(-(g - x_i)^2 / (2 bw^2)) / (bw * sqrt(2 pi))
//! ```
//!
//! Sample weights are normalized to unit sum in either case, so biased
//! trajectories reweighted through [`bias_weights`] and unbiased ones flow
//! through the same code path.

use crate::trajectory::ShapeError;

/// Local result alias for this module.
pub type Result<T> = std::result::Result<T, ShapeError>;

/// A discretized probability density along the reaction coordinate.
///
/// `grid` holds the RC value of each point and `density` the matching
/// probability mass (histogram) or density value (KDE). Both vectors
/// always share a length.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution {
    /// RC value of each grid point, in ascending order
    pub grid: Vec<f64>,
    /// Estimated probability at each grid point
    pub density: Vec<f64>,
}

/// Importance weights undoing a metadynamics bias.
///
/// Each frame with bias `v = V(s) - c(t)` gets the unnormalized weight
/// `exp(v / kt)`; the estimators normalize afterwards.
pub fn bias_weights(v_minus_c: &[f64], kt: f64) -> Vec<f64> {
    v_minus_c.iter().map(|&v| (v / kt).exp()).collect()
}

/// Weighted histogram of the RC samples as probability masses.
///
/// The sampled range `[min, max]` splits into `bins` equal intervals and
/// the grid points sit at the interval centers. Samples on the upper edge
/// count toward the last bin. When every sample coincides the full mass
/// lands in the first bin. An empty sample set or zero bins produces an
/// empty distribution.
pub fn histogram_density(
    rc: &[f64],
    weights: Option<&[f64]>,
    bins: usize,
) -> Result<ProbabilityDistribution> {
    if rc.is_empty() || bins == 0 {
        return Ok(ProbabilityDistribution {
            grid: Vec::new(),
            density: Vec::new(),
        });
    }
    let weights = normalized_weights(rc.len(), weights)?;
    let lo = rc.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = rc.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (hi - lo) / bins as f64;
    let mut density = vec![0.0; bins];
    for (&x, &w) in rc.iter().zip(&weights) {
        let index = (((x - lo) / width) as usize).min(bins - 1);
        density[index] += w;
    }
    let grid = (0..bins)
        .map(|i| lo + width * (i as f64 + 0.5))
        .collect();
    Ok(ProbabilityDistribution { grid, density })
}

/// Weighted Gaussian kernel density of the RC samples.
///
/// The grid spans the sampled range with `bins` evenly spaced points,
/// endpoints included. `bandwidth` is the kernel standard deviation in RC
/// units. An empty sample set or zero bins produces an empty distribution.
pub fn kde_density(
    rc: &[f64],
    weights: Option<&[f64]>,
    bins: usize,
    bandwidth: f64,
) -> Result<ProbabilityDistribution> {
    if rc.is_empty() || bins == 0 {
        return Ok(ProbabilityDistribution {
            grid: Vec::new(),
            density: Vec::new(),
        });
    }
    let weights = normalized_weights(rc.len(), weights)?;
    let lo = rc.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = rc.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let grid = linspace(lo, hi, bins);
    let norm = bandwidth * (2.0 * std::f64::consts::PI).sqrt();
    let density = grid
        .iter()
        .map(|&g| {
            let mixture: f64 = rc
                .iter()
                .zip(&weights)
                .map(|(&x, &w)| {
                    let z = (g - x) / bandwidth;
                    w * (-0.5 * z * z).exp()
                })
                .sum();
            mixture / norm
        })
        .collect();
    Ok(ProbabilityDistribution { grid, density })
}

/// Evenly spaced points over `[lo, hi]`, endpoints included.
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

/// Per-sample weights scaled to unit sum; uniform when none are given.
fn normalized_weights(nsamples: usize, weights: Option<&[f64]>) -> Result<Vec<f64>> {
    match weights {
        Some(w) => {
            if w.len() != nsamples {
                return Err(ShapeError::WeightMismatch {
                    nweights: w.len(),
                    nframes: nsamples,
                });
            }
            let total: f64 = w.iter().sum();
            Ok(w.iter().map(|&x| x / total).collect())
        }
        None => Ok(vec![1.0 / nsamples as f64; nsamples]),
    }
}
