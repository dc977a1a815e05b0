//! Configuration structures for reaction-coordinate scoring and optimization.
//!
//! This module defines the records that control a run:
//!
//! - [`SgoopConfig`]: density estimation and rate-matrix parameters
//! - [`HoppingParams`]: basin-hopping and local-minimizer parameters
//! - [`RunMode`]: score a fixed RC or optimize its coefficients
//!
//! Values are normally filled in by [`parser`](crate::parser) from a
//! `key = value` input file; every field has a default matching the
//! reference parameterization of the method.

use serde::{Deserialize, Serialize};

/// Thermal energy kT in kJ/mol at 300 K (the PLUMED energy unit convention).
pub const DEFAULT_KT: f64 = 2.5;

/// Parameters for density estimation and maximum-caliber rate matrices.
///
/// The candidate reaction coordinate is a linear combination of the columns
/// named in `cv_cols`. Its stationary density is estimated on `rc_bins` grid
/// points, either as a weighted histogram or, with `kde = true`, as a
/// Gaussian kernel density of width `bandwidth`. Transitions between grid
/// points further than `d` bins apart carry no caliber weight.
///
/// Biased (metadynamics) data is reweighted through `v_minus_c_col` and
/// `kt`; since a biased trajectory has no usable dynamics, such runs need
/// either an unbiased companion trajectory or an explicit `diffusivity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgoopConfig {
    /// Number of grid points (histogram bins) along the reaction coordinate
    pub rc_bins: usize,
    /// Number of metastable basins expected in the free-energy profile
    pub wells: usize,
    /// Widest bin jump still counted as a single transition
    pub d: usize,
    /// Estimate the density with Gaussian kernels instead of a histogram
    pub kde: bool,
    /// Kernel bandwidth for KDE, in RC units
    pub bandwidth: f64,
    /// Thermal energy for bias reweighting, in the units of the bias column
    pub kt: f64,
    /// Table columns holding the candidate collective variables (0-based)
    pub cv_cols: Vec<usize>,
    /// Table column holding the metadynamics bias V(s) - c(t), if any
    pub v_minus_c_col: Option<usize>,
    /// Fixed dynamical rate standing in for observed transition counting
    pub diffusivity: Option<f64>,
}

impl Default for SgoopConfig {
    fn default() -> Self {
        Self {
            rc_bins: 20,
            wells: 2,
            d: 1,
            kde: false,
            bandwidth: 0.1,
            kt: DEFAULT_KT,
            cv_cols: Vec::new(),
            v_minus_c_col: None,
            diffusivity: None,
        }
    }
}

/// Parameters for the basin-hopping search over RC coefficients.
///
/// The outer loop displaces every coefficient uniformly in
/// `[-step_size, step_size]`, locally minimizes the negated spectral gap,
/// and accepts or rejects the hop by a Metropolis test at temperature
/// `annealing_temp` (zero temperature accepts improvements only).
///
/// The remaining fields tune the quasi-Newton local minimizer: step-norm
/// clamping, backtracking, finite-difference gradients, and termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoppingParams {
    /// Number of basin-hopping iterations
    pub niter: usize,
    /// Metropolis temperature for accepting uphill hops
    pub annealing_temp: f64,
    /// Half-width of the uniform random coefficient displacement
    pub step_size: f64,
    /// RNG seed for reproducible searches
    pub seed: Option<u64>,
    /// Iteration cap for each local minimization
    pub local_iters: usize,
    /// Norm cap on a single local-minimizer step
    pub max_step_size: f64,
    /// Step reduction factor for the backtracking line search
    pub reduced_factor: f64,
    /// Displacement for finite-difference gradients
    pub fd_step: f64,
    /// Gradient-norm threshold that ends a local minimization
    pub grad_tol: f64,
}

impl Default for HoppingParams {
    fn default() -> Self {
        Self {
            niter: 50,
            annealing_temp: 0.1,
            step_size: 0.5,
            seed: None,
            local_iters: 50,
            max_step_size: 0.5,
            reduced_factor: 0.5,
            fd_step: 1e-5,
            grad_tol: 1e-5,
        }
    }
}

/// Whether a run scores the starting coefficients or searches for better ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Score `rc0` once and report its spectral gap
    #[default]
    Evaluate,
    /// Basin-hop from `rc0` to maximize the spectral gap
    Optimize,
}
