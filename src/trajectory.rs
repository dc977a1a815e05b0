//! Tables of collective-variable time series and RC projection.
//!
//! A trajectory is a frames-by-columns table of floats. The
//! [`ColumnSource`] trait is the only view the scoring code needs, so
//! alternative storage (memory-mapped files, column stores) can be plugged
//! in without touching the numerics. [`Trajectory`] is the bundled
//! row-major implementation filled by [`io::read_colvar`](crate::io::read_colvar).

use std::borrow::Cow;
use thiserror::Error;

/// Shape mismatches between tables, column selections, and coefficients.
#[derive(Error, Debug)]
pub enum ShapeError {
    /// Data length not divisible into whole rows
    #[error("table of {len} values cannot be divided into rows of {ncols} columns")]
    RaggedTable {
        /// Total number of values supplied
        len: usize,
        /// Requested number of columns
        ncols: usize,
    },
    /// Column index past the end of the table
    #[error("column {index} out of range for a table with {ncols} columns")]
    ColumnOutOfRange {
        /// Requested column index (0-based)
        index: usize,
        /// Number of columns in the table
        ncols: usize,
    },
    /// A column source produced a column of the wrong length
    #[error("column {index} holds {len} values for a table of {nframes} frames")]
    ColumnLength {
        /// Offending column index
        index: usize,
        /// Number of values the column held
        len: usize,
        /// Number of frames in the table
        nframes: usize,
    },
    /// Coefficient vector does not line up with the selected CV columns
    #[error("{ncoeffs} coefficients supplied for {ncols} collective variables")]
    CoefficientMismatch {
        /// Number of coefficients supplied
        ncoeffs: usize,
        /// Number of CV columns selected
        ncols: usize,
    },
    /// Weight vector does not line up with the samples
    #[error("{nweights} weights supplied for {nframes} samples")]
    WeightMismatch {
        /// Number of weights supplied
        nweights: usize,
        /// Number of samples
        nframes: usize,
    },
}

/// Local result alias for this module.
pub type Result<T> = std::result::Result<T, ShapeError>;

/// Columnar access to a time series table.
///
/// Implementors must hand back exactly [`len`](ColumnSource::len) values
/// per column, in frame order.
pub trait ColumnSource {
    /// Number of frames in the table.
    fn len(&self) -> usize;

    /// True when the table holds no frames.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of columns in the table.
    fn ncols(&self) -> usize;

    /// A single column as a contiguous slice, borrowed where possible.
    fn column(&self, index: usize) -> Result<Cow<'_, [f64]>>;
}

/// Row-major table of collective variables, one row per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl Trajectory {
    /// Wraps a flat row-major buffer as a table with `ncols` columns.
    pub fn new(data: Vec<f64>, ncols: usize) -> Result<Self> {
        if ncols == 0 || data.len() % ncols != 0 {
            return Err(ShapeError::RaggedTable {
                len: data.len(),
                ncols,
            });
        }
        let nrows = data.len() / ncols;
        Ok(Self { data, nrows, ncols })
    }

    /// One frame of the table.
    ///
    /// # Panics
    ///
    /// Panics when `index` is past the last frame.
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.ncols;
        &self.data[start..start + self.ncols]
    }
}

impl ColumnSource for Trajectory {
    fn len(&self) -> usize {
        self.nrows
    }

    fn ncols(&self) -> usize {
        self.ncols
    }

    fn column(&self, index: usize) -> Result<Cow<'_, [f64]>> {
        if index >= self.ncols {
            return Err(ShapeError::ColumnOutOfRange {
                index,
                ncols: self.ncols,
            });
        }
        let values: Vec<f64> = self
            .data
            .iter()
            .skip(index)
            .step_by(self.ncols)
            .copied()
            .collect();
        Ok(Cow::Owned(values))
    }
}

/// Projects a table onto a one-dimensional reaction coordinate.
///
/// Each frame maps to `sum_k coeffs[k] * table[frame, cv_cols[k]]`. The
/// coefficient vector must have one entry per selected column.
pub fn project_rc<S>(source: &S, cv_cols: &[usize], coeffs: &[f64]) -> Result<Vec<f64>>
where
    S: ColumnSource + ?Sized,
{
    if coeffs.len() != cv_cols.len() {
        return Err(ShapeError::CoefficientMismatch {
            ncoeffs: coeffs.len(),
            ncols: cv_cols.len(),
        });
    }
    let nframes = source.len();
    let mut rc = vec![0.0; nframes];
    for (&col, &coeff) in cv_cols.iter().zip(coeffs) {
        let values = source.column(col)?;
        if values.len() != nframes {
            return Err(ShapeError::ColumnLength {
                index: col,
                len: values.len(),
                nframes,
            });
        }
        for (r, &v) in rc.iter_mut().zip(values.iter()) {
            *r += coeff * v;
        }
    }
    Ok(rc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Trajectory {
        // three frames, two columns
        Trajectory::new(vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0], 2).unwrap()
    }

    #[test]
    fn test_trajectory_shape() {
        let traj = table();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.ncols(), 2);
        assert!(!traj.is_empty());
        assert_eq!(traj.row(1), &[2.0, 20.0]);
    }

    #[test]
    fn test_ragged_buffer_rejected() {
        assert!(matches!(
            Trajectory::new(vec![1.0, 2.0, 3.0], 2),
            Err(ShapeError::RaggedTable { len: 3, ncols: 2 })
        ));
        assert!(matches!(
            Trajectory::new(vec![], 0),
            Err(ShapeError::RaggedTable { .. })
        ));
    }

    #[test]
    fn test_column_access() {
        let traj = table();
        assert_eq!(traj.column(0).unwrap().as_ref(), &[1.0, 2.0, 3.0]);
        assert_eq!(traj.column(1).unwrap().as_ref(), &[10.0, 20.0, 30.0]);
        assert!(matches!(
            traj.column(2),
            Err(ShapeError::ColumnOutOfRange { index: 2, ncols: 2 })
        ));
    }

    #[test]
    fn test_project_rc() {
        let traj = table();
        let rc = project_rc(&traj, &[0, 1], &[1.0, 0.1]).unwrap();
        assert_eq!(rc, vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_project_rc_single_column() {
        let traj = table();
        let rc = project_rc(&traj, &[1], &[0.5]).unwrap();
        assert_eq!(rc, vec![5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_project_rc_coefficient_mismatch() {
        let traj = table();
        assert!(matches!(
            project_rc(&traj, &[0, 1], &[1.0]),
            Err(ShapeError::CoefficientMismatch {
                ncoeffs: 1,
                ncols: 2
            })
        ));
    }

    #[test]
    fn test_empty_table() {
        let traj = Trajectory::new(vec![], 3).unwrap();
        assert!(traj.is_empty());
        assert!(project_rc(&traj, &[0, 2], &[1.0, 1.0]).unwrap().is_empty());
    }
}
