//! End-to-end scoring of candidate reaction coordinates.
//!
//! An [`EvalContext`] gathers the CV columns, bias weights, and rate
//! source out of one or two trajectory tables once, then scores any
//! number of coefficient vectors against them. Each evaluation projects
//! the RC, estimates its stationary density, assembles the
//! maximum-caliber generator, and reports the spectral gap together with
//! the sorted eigenvalues.

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::config::SgoopConfig;
use crate::density::{self, bias_weights};
use crate::discretize::nearest_grid_indices;
use crate::rates::max_cal_matrix;
use crate::spectral::{sorted_eigenvalues, spectral_gap};
use crate::trajectory::{ColumnSource, ShapeError};

/// Errors raised while assembling or running an evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Well count incompatible with the RC grid
    #[error("{wells} wells cannot be resolved on a grid of {rc_bins} points")]
    WellsOutOfRange {
        /// Requested number of wells
        wells: usize,
        /// Number of RC grid points
        rc_bins: usize,
    },
    /// Reweighted density data with nothing to take the dynamics from
    #[error("biased data needs a companion trajectory or an explicit diffusivity")]
    NoRateSource,
    /// Table, column, or coefficient shapes disagree
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Local result alias for this module.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Score of one candidate reaction coordinate.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Spectral gap of the maximum-caliber generator
    pub spectral_gap: f64,
    /// Generator eigenvalues, sorted ascending
    pub eigenvalues: Vec<f64>,
}

/// Where the dynamical scale of the generator comes from.
enum RateSource {
    /// Count transitions in the density trajectory itself
    SameTrajectory,
    /// Count transitions in a companion unbiased trajectory
    Companion(CvTable),
    /// Fixed rate replacing transition counting
    Diffusivity(f64),
}

/// CV columns gathered out of a table, detached from its storage.
struct CvTable {
    columns: Vec<Vec<f64>>,
    nframes: usize,
}

impl CvTable {
    fn gather<S>(source: &S, cv_cols: &[usize]) -> std::result::Result<Self, ShapeError>
    where
        S: ColumnSource + ?Sized,
    {
        let nframes = source.len();
        let mut columns = Vec::with_capacity(cv_cols.len());
        for &col in cv_cols {
            let values = source.column(col)?;
            if values.len() != nframes {
                return Err(ShapeError::ColumnLength {
                    index: col,
                    len: values.len(),
                    nframes,
                });
            }
            columns.push(values.into_owned());
        }
        Ok(Self { columns, nframes })
    }

    fn project(&self, coeffs: &[f64]) -> std::result::Result<Vec<f64>, ShapeError> {
        if coeffs.len() != self.columns.len() {
            return Err(ShapeError::CoefficientMismatch {
                ncoeffs: coeffs.len(),
                ncols: self.columns.len(),
            });
        }
        let mut rc = vec![0.0; self.nframes];
        for (column, &coeff) in self.columns.iter().zip(coeffs) {
            for (r, &v) in rc.iter_mut().zip(column) {
                *r += coeff * v;
            }
        }
        Ok(rc)
    }
}

/// Reusable scoring context for one dataset and configuration.
pub struct EvalContext {
    cv_table: CvTable,
    weights: Option<Vec<f64>>,
    rate_source: RateSource,
    config: SgoopConfig,
}

impl EvalContext {
    /// Context over a single trajectory table.
    ///
    /// Without a bias column the table provides both the density and the
    /// dynamics. With one, the density is reweighted to the unbiased
    /// ensemble and the dynamics must come from an explicit diffusivity,
    /// since transition counts in biased data are meaningless.
    pub fn new<S>(table: &S, config: &SgoopConfig) -> Result<Self>
    where
        S: ColumnSource + ?Sized,
    {
        ensure_wells(config)?;
        let cv_table = CvTable::gather(table, &config.cv_cols)?;
        let weights = gather_weights(table, config)?;
        let rate_source = match (config.diffusivity, &weights) {
            (Some(rate), _) => RateSource::Diffusivity(rate),
            (None, None) => RateSource::SameTrajectory,
            (None, Some(_)) => return Err(EvalError::NoRateSource),
        };
        debug!(
            "scoring context: {} frames, {} CVs, {} grid points",
            cv_table.nframes,
            cv_table.columns.len(),
            config.rc_bins
        );
        Ok(Self {
            cv_table,
            weights,
            rate_source,
            config: config.clone(),
        })
    }

    /// Context pairing a density table with a companion trajectory that
    /// carries the dynamics.
    ///
    /// The companion must lay out the same CV columns at the same
    /// indices; it is projected with the same coefficients on each
    /// evaluation. An explicit diffusivity still takes precedence over
    /// counting its transitions.
    pub fn with_dynamics<S, M>(table: &S, dynamics: &M, config: &SgoopConfig) -> Result<Self>
    where
        S: ColumnSource + ?Sized,
        M: ColumnSource + ?Sized,
    {
        ensure_wells(config)?;
        let cv_table = CvTable::gather(table, &config.cv_cols)?;
        let weights = gather_weights(table, config)?;
        let rate_source = match config.diffusivity {
            Some(rate) => RateSource::Diffusivity(rate),
            None => RateSource::Companion(CvTable::gather(dynamics, &config.cv_cols)?),
        };
        debug!(
            "scoring context: {} density frames with companion dynamics, {} CVs",
            cv_table.nframes,
            cv_table.columns.len()
        );
        Ok(Self {
            cv_table,
            weights,
            rate_source,
            config: config.clone(),
        })
    }

    /// Number of collective variables a coefficient vector must cover.
    pub fn ncvs(&self) -> usize {
        self.cv_table.columns.len()
    }

    /// Scores one coefficient vector.
    ///
    /// Degenerate candidates (collapsed density, undefined rates) come
    /// back with a NaN gap rather than an error; only a coefficient
    /// count mismatch fails.
    pub fn evaluate(&self, coeffs: &[f64]) -> Result<Evaluation> {
        let rc = self.cv_table.project(coeffs)?;
        let dist = if self.config.kde {
            density::kde_density(
                &rc,
                self.weights.as_deref(),
                self.config.rc_bins,
                self.config.bandwidth,
            )?
        } else {
            density::histogram_density(&rc, self.weights.as_deref(), self.config.rc_bins)?
        };
        let (binned, diffusivity) = match &self.rate_source {
            RateSource::Diffusivity(rate) => (Vec::new(), Some(*rate)),
            RateSource::SameTrajectory => (nearest_grid_indices(&rc, &dist.grid), None),
            RateSource::Companion(table) => {
                let dynamics_rc = table.project(coeffs)?;
                (nearest_grid_indices(&dynamics_rc, &dist.grid), None)
            }
        };
        let generator = max_cal_matrix(&dist.density, &binned, self.config.d, diffusivity);
        let eigenvalues = sorted_eigenvalues(&generator);
        let gap = spectral_gap(&eigenvalues, self.config.wells);
        if !gap.is_finite() {
            debug!("degenerate candidate RC, spectral gap {gap}");
        }
        Ok(Evaluation {
            spectral_gap: gap,
            eigenvalues,
        })
    }
}

/// Unit-normalized copy of a coefficient vector.
///
/// The RC is a direction; fixing its norm makes the KDE bandwidth mean
/// the same thing for every candidate and keeps reported coefficients
/// comparable. A zero or non-finite norm leaves the coefficients as
/// given.
pub fn unit_coefficients(coeffs: &[f64]) -> Vec<f64> {
    let norm = coeffs.iter().map(|c| c * c).sum::<f64>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        coeffs.iter().map(|c| c / norm).collect()
    } else {
        coeffs.to_vec()
    }
}

fn ensure_wells(config: &SgoopConfig) -> Result<()> {
    if config.wells == 0 || config.wells >= config.rc_bins {
        return Err(EvalError::WellsOutOfRange {
            wells: config.wells,
            rc_bins: config.rc_bins,
        });
    }
    Ok(())
}

fn gather_weights<S>(
    table: &S,
    config: &SgoopConfig,
) -> std::result::Result<Option<Vec<f64>>, ShapeError>
where
    S: ColumnSource + ?Sized,
{
    match config.v_minus_c_col {
        Some(col) => {
            let bias = table.column(col)?;
            if bias.len() != table.len() {
                return Err(ShapeError::ColumnLength {
                    index: col,
                    len: bias.len(),
                    nframes: table.len(),
                });
            }
            Ok(Some(bias_weights(&bias, config.kt)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::Trajectory;

    fn hopping_table() -> Trajectory {
        let samples = [
            0.0, 0.1, 0.2, 0.1, 0.0, 3.8, 3.9, 4.0, 3.9, 3.8, 0.1, 0.0, 0.2, 3.9, 4.0, 3.8,
        ];
        Trajectory::new(samples.to_vec(), 1).unwrap()
    }

    fn test_config() -> SgoopConfig {
        SgoopConfig {
            rc_bins: 5,
            wells: 2,
            d: 1,
            kde: true,
            bandwidth: 0.8,
            cv_cols: vec![0],
            ..Default::default()
        }
    }

    #[test]
    fn test_unbiased_same_trajectory() {
        let context = EvalContext::new(&hopping_table(), &test_config()).unwrap();
        let result = context.evaluate(&[1.0]).unwrap();
        assert_eq!(result.eigenvalues.len(), 5);
        assert!(result.eigenvalues[0].abs() < 1e-8, "{}", result.eigenvalues[0]);
        assert!(result.spectral_gap.is_finite());
        assert!(result.spectral_gap > 0.0, "{}", result.spectral_gap);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let context = EvalContext::new(&hopping_table(), &test_config()).unwrap();
        let first = context.evaluate(&[1.0]).unwrap();
        let second = context.evaluate(&[1.0]).unwrap();
        assert_eq!(first.spectral_gap, second.spectral_gap);
        assert_eq!(first.eigenvalues, second.eigenvalues);
    }

    #[test]
    fn test_empty_table_scores_nan() {
        // a header-only COLVAR file loads as a zero-frame table
        let table = Trajectory::new(Vec::new(), 1).unwrap();
        let context = EvalContext::new(&table, &test_config()).unwrap();
        let result = context.evaluate(&[1.0]).unwrap();
        assert!(result.eigenvalues.is_empty());
        assert!(result.spectral_gap.is_nan());
    }

    #[test]
    fn test_companion_matches_same_trajectory() {
        let table = hopping_table();
        let config = test_config();
        let single = EvalContext::new(&table, &config).unwrap();
        let paired = EvalContext::with_dynamics(&table, &table, &config).unwrap();
        let a = single.evaluate(&[1.0]).unwrap();
        let b = paired.evaluate(&[1.0]).unwrap();
        assert_eq!(a.spectral_gap, b.spectral_gap);
    }

    #[test]
    fn test_wells_must_fit_grid() {
        let config = SgoopConfig {
            wells: 5,
            rc_bins: 5,
            cv_cols: vec![0],
            ..Default::default()
        };
        assert!(matches!(
            EvalContext::new(&hopping_table(), &config),
            Err(EvalError::WellsOutOfRange { wells: 5, rc_bins: 5 })
        ));
    }

    #[test]
    fn test_biased_data_needs_rate_source() {
        // second column plays the bias
        let table = Trajectory::new(vec![0.0, 1.0, 4.0, 2.0, 0.1, 1.5, 3.9, 2.5], 2).unwrap();
        let config = SgoopConfig {
            v_minus_c_col: Some(1),
            ..test_config()
        };
        assert!(matches!(
            EvalContext::new(&table, &config),
            Err(EvalError::NoRateSource)
        ));
    }

    #[test]
    fn test_biased_data_with_diffusivity() {
        let table = Trajectory::new(vec![0.0, 1.0, 4.0, 2.0, 0.1, 1.5, 3.9, 2.5], 2).unwrap();
        let config = SgoopConfig {
            rc_bins: 3,
            v_minus_c_col: Some(1),
            diffusivity: Some(1.0),
            ..test_config()
        };
        let context = EvalContext::new(&table, &config).unwrap();
        let result = context.evaluate(&[1.0]).unwrap();
        assert!(result.spectral_gap.is_finite());
    }

    #[test]
    fn test_coefficient_mismatch() {
        let context = EvalContext::new(&hopping_table(), &test_config()).unwrap();
        assert_eq!(context.ncvs(), 1);
        assert!(matches!(
            context.evaluate(&[1.0, 2.0]),
            Err(EvalError::Shape(ShapeError::CoefficientMismatch {
                ncoeffs: 2,
                ncols: 1
            }))
        ));
    }

    #[test]
    fn test_unit_coefficients() {
        let unit = unit_coefficients(&[3.0, 4.0]);
        assert!((unit[0] - 0.6).abs() < 1e-12);
        assert!((unit[1] - 0.8).abs() < 1e-12);
        assert_eq!(unit_coefficients(&[0.0, 0.0]), vec![0.0, 0.0]);
        let passthrough = unit_coefficients(&[f64::NAN, 1.0]);
        assert!(passthrough[0].is_nan());
        assert_eq!(passthrough[1], 1.0);
    }
}
