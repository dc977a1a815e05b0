//! Basin-hopping maximization of the spectral gap over RC coefficients.
//!
//! The search minimizes the negated spectral gap. Every iteration
//! perturbs the current chain point, locally minimizes with a
//! quasi-Newton descent driven by finite-difference gradients, and runs
//! a Metropolis test on the locally minimized value. The best
//! coefficients ever seen are tracked separately from the Metropolis
//! chain and returned at the end, so the result never regresses below
//! the locally minimized starting point.

use std::fs;
use std::path::Path;

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::config::HoppingParams;
use crate::evaluate::{unit_coefficients, EvalContext, EvalError};

/// Cap on step reductions inside one backtracking line search.
const MAX_BACKTRACKS: usize = 8;

/// Errors raised before a basin-hopping search starts.
#[derive(Error, Debug)]
pub enum HopError {
    /// Hopping parameter outside the range the search loop can run with
    #[error("hopping parameter {name} = {value} must be {constraint}")]
    ParamOutOfRange {
        /// Name of the offending parameter
        name: &'static str,
        /// Value the run supplied
        value: f64,
        /// Range the parameter must lie in
        constraint: &'static str,
    },
    /// Scoring context rejected the starting coefficients
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// One basin-hopping iteration as seen by observers.
#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    /// Iteration number, starting at 1
    pub iteration: usize,
    /// Unit-normalized candidate coefficients
    pub coefficients: Vec<f64>,
    /// Spectral gap of the candidate
    pub spectral_gap: f64,
    /// Whether the Metropolis test accepted the candidate
    pub accepted: bool,
}

/// Callback receiving every basin-hopping step.
pub trait HopObserver {
    /// Called once per iteration with the locally minimized candidate.
    fn on_step(&mut self, event: &StepEvent);
}

impl HopObserver for () {
    fn on_step(&mut self, _event: &StepEvent) {}
}

/// Observer logging accepted steps at info level, rejected ones at debug.
#[derive(Debug, Default)]
pub struct LogObserver;

impl HopObserver for LogObserver {
    fn on_step(&mut self, event: &StepEvent) {
        if event.accepted {
            info!(
                "iter {:>4}: gap {:.6} accepted, rc {}",
                event.iteration,
                event.spectral_gap,
                format_rc(&event.coefficients)
            );
        } else {
            debug!(
                "iter {:>4}: gap {:.6} rejected",
                event.iteration, event.spectral_gap
            );
        }
    }
}

/// Outcome of a basin-hopping search.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResult {
    /// Best unit-normalized coefficients found
    pub coefficients: Vec<f64>,
    /// Spectral gap of the best coefficients
    pub spectral_gap: f64,
    /// Generator eigenvalues at the best coefficients, sorted ascending
    pub eigenvalues: Vec<f64>,
    /// Per-iteration history of the search
    pub trace: Vec<StepEvent>,
}

impl OptimizeResult {
    /// Saves the result as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Searches for coefficients maximizing the spectral gap.
///
/// The starting point is locally minimized first and seeds both the
/// Metropolis chain and the best-seen record. Candidates without a
/// finite score (collapsed density, undefined rates, an overflowed gap)
/// are never accepted and never displace a finite best, but they do not
/// abort the search. Structural errors in `initial` and out-of-range
/// parameters surface before the first iteration.
pub fn optimize_rc(
    context: &EvalContext,
    initial: &[f64],
    params: &HoppingParams,
    observer: &mut dyn HopObserver,
) -> Result<OptimizeResult, HopError> {
    ensure_params(params)?;
    context.evaluate(&unit_coefficients(initial))?;

    let objective = |x: &DVector<f64>| -> f64 {
        let unit = unit_coefficients(x.as_slice());
        match context.evaluate(&unit) {
            Ok(result) => -result.spectral_gap,
            Err(err) => {
                debug!("candidate dropped during search: {err}");
                f64::NAN
            }
        }
    };

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(
        "basin hopping over {} coefficients, {} iterations",
        initial.len(),
        params.niter
    );

    let x0 = DVector::from_column_slice(initial);
    let (mut x_chain, mut f_chain) = local_minimize(&objective, &x0, params);
    let mut x_best = x_chain.clone();
    let mut f_best = f_chain;
    let mut trace = Vec::with_capacity(params.niter);

    for iteration in 1..=params.niter {
        let mut x_trial = x_chain.clone();
        for value in x_trial.iter_mut() {
            *value += rng.gen_range(-params.step_size..=params.step_size);
        }
        let (x_candidate, f_candidate) = local_minimize(&objective, &x_trial, params);

        let accepted = metropolis_accept(f_candidate, f_chain, params.annealing_temp, &mut rng);
        if accepted {
            x_chain = x_candidate.clone();
            f_chain = f_candidate;
        }
        if improves(f_candidate, f_best) {
            x_best = x_candidate.clone();
            f_best = f_candidate;
        }

        let event = StepEvent {
            iteration,
            coefficients: unit_coefficients(x_candidate.as_slice()),
            spectral_gap: -f_candidate,
            accepted,
        };
        observer.on_step(&event);
        trace.push(event);
    }

    let coefficients = unit_coefficients(x_best.as_slice());
    let best = context.evaluate(&coefficients)?;
    info!(
        "basin hopping finished: gap {:.6} at rc {}",
        best.spectral_gap,
        format_rc(&coefficients)
    );
    Ok(OptimizeResult {
        coefficients,
        spectral_gap: best.spectral_gap,
        eigenvalues: best.eigenvalues,
        trace,
    })
}

/// Rejects parameter values the search loop cannot run with.
fn ensure_params(params: &HoppingParams) -> Result<(), HopError> {
    if !params.step_size.is_finite() || params.step_size < 0.0 {
        return Err(HopError::ParamOutOfRange {
            name: "step_size",
            value: params.step_size,
            constraint: "finite and non-negative",
        });
    }
    if !params.max_step_size.is_finite() || params.max_step_size <= 0.0 {
        return Err(HopError::ParamOutOfRange {
            name: "max_step_size",
            value: params.max_step_size,
            constraint: "finite and positive",
        });
    }
    if !(params.reduced_factor > 0.0 && params.reduced_factor < 1.0) {
        return Err(HopError::ParamOutOfRange {
            name: "reduced_factor",
            value: params.reduced_factor,
            constraint: "strictly between 0 and 1",
        });
    }
    Ok(())
}

/// Quasi-Newton minimization with finite-difference gradients.
///
/// Newton steps come from an LU solve against the running PSB Hessian
/// estimate, fall back to steepest descent when the solve fails, and are
/// clamped to `max_step_size` then backtracked until they descend. The
/// loop ends on a small gradient, a failed line search, or a non-finite
/// value. Returns the final point and its objective value.
fn local_minimize<F>(
    objective: &F,
    start: &DVector<f64>,
    params: &HoppingParams,
) -> (DVector<f64>, f64)
where
    F: Fn(&DVector<f64>) -> f64,
{
    let mut x = start.clone();
    let mut fx = objective(&x);
    if !fx.is_finite() || x.is_empty() {
        return (x, fx);
    }

    let n = x.len();
    let mut hessian = DMatrix::<f64>::identity(n, n);
    let mut gradient = fd_gradient(objective, &x, params.fd_step);

    for _ in 0..params.local_iters {
        if !gradient.iter().all(|g| g.is_finite()) || gradient.norm() < params.grad_tol {
            break;
        }

        let neg_g = -&gradient;
        let mut step = hessian
            .clone()
            .lu()
            .solve(&neg_g)
            .unwrap_or_else(|| neg_g.clone());

        let step_norm = step.norm();
        if !step_norm.is_finite() || step_norm == 0.0 {
            break;
        }
        if step_norm > params.max_step_size {
            step *= params.max_step_size / step_norm;
        }

        let mut improved = false;
        for _ in 0..MAX_BACKTRACKS {
            let x_new = &x + &step;
            let f_new = objective(&x_new);
            if f_new.is_finite() && f_new < fx {
                let g_new = fd_gradient(objective, &x_new, params.fd_step);
                let sk = &x_new - &x;
                hessian = psb_update(&hessian, &sk, &g_new, &gradient);
                x = x_new;
                fx = f_new;
                gradient = g_new;
                improved = true;
                break;
            }
            step *= params.reduced_factor;
        }
        if !improved {
            break;
        }
    }
    (x, fx)
}

/// Central finite-difference gradient.
fn fd_gradient<F>(objective: &F, x: &DVector<f64>, h: f64) -> DVector<f64>
where
    F: Fn(&DVector<f64>) -> f64,
{
    let mut gradient = DVector::zeros(x.len());
    for k in 0..x.len() {
        let mut forward = x.clone();
        let mut backward = x.clone();
        forward[k] += h;
        backward[k] -= h;
        gradient[k] = (objective(&forward) - objective(&backward)) / (2.0 * h);
    }
    gradient
}

/// PSB update of the Hessian estimate from one accepted step.
fn psb_update(
    hessian: &DMatrix<f64>,
    sk: &DVector<f64>,
    g_new: &DVector<f64>,
    g_old: &DVector<f64>,
) -> DMatrix<f64> {
    let yk = g_new - g_old;
    let sk_dot_sk = sk.dot(sk);
    if sk_dot_sk.abs() < 1e-10 {
        return hessian.clone();
    }
    let diff = &yk - &(hessian * sk);
    let term1 = (&diff * sk.transpose() + sk * diff.transpose()) / sk_dot_sk;
    let sk_diff = sk.dot(&diff);
    let term2 = (sk * sk.transpose()) * (sk_diff / (sk_dot_sk * sk_dot_sk));
    hessian + term1 - term2
}

/// Metropolis test on negated gaps.
///
/// Ties and downhill moves always pass; uphill moves pass with
/// probability `exp(-delta / temperature)`. A candidate without a finite
/// score never passes, an incumbent without one always yields.
fn metropolis_accept(candidate: f64, current: f64, temperature: f64, rng: &mut StdRng) -> bool {
    if !candidate.is_finite() {
        return false;
    }
    if !current.is_finite() || candidate <= current {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    rng.gen::<f64>() < ((current - candidate) / temperature).exp()
}

/// A non-finite value never improves; any finite value improves on one.
fn improves(candidate: f64, incumbent: f64) -> bool {
    if !candidate.is_finite() {
        false
    } else if !incumbent.is_finite() {
        true
    } else {
        candidate < incumbent
    }
}

fn format_rc(coeffs: &[f64]) -> String {
    let parts: Vec<String> = coeffs.iter().map(|c| format!("{c:.4}")).collect();
    format!("[{}]", parts.join(", "))
}
