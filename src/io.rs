//! COLVAR file reading.
//!
//! A COLVAR file, as written by PLUMED and compatible engines, is a
//! whitespace-separated table of per-frame values prefixed by a header
//! naming its columns:
//!
//! ```text
//! #! FIELDS time cv1 cv2 bias
//!  0.000  1.2345  -0.4567  3.21
//!  0.500  1.2388  -0.4501  3.19
//! ```
//!
//! `#! SET ...` metadata lines, blank lines, and other comment lines are
//! skipped. Every data row must hold exactly one value per named field.

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::trajectory::{ShapeError, Trajectory};

lazy_static! {
    static ref FIELDS_RE: Regex = Regex::new(r"^#!\s*FIELDS\s+(.+)$").unwrap();
    static ref SET_RE: Regex = Regex::new(r"^#!\s*SET\s").unwrap();
}

/// Errors raised while reading a COLVAR file.
#[derive(Error, Debug)]
pub enum ColvarError {
    /// Underlying file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// No `#! FIELDS` header before the data
    #[error("{path}: no '#! FIELDS' header names the columns")]
    MissingFields {
        /// Offending file
        path: String,
    },
    /// A malformed data row
    #[error("{path}:{line}: {message}")]
    Parse {
        /// Offending file
        path: String,
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// Header and data shapes disagree
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Local result alias for this module.
pub type Result<T> = std::result::Result<T, ColvarError>;

/// A parsed COLVAR table with its column names.
#[derive(Debug, Clone)]
pub struct ColvarData {
    /// Column names from the `#! FIELDS` header
    pub fields: Vec<String>,
    /// Per-frame values, one row per frame
    pub trajectory: Trajectory,
}

/// Reads a COLVAR file from disk.
///
/// # Errors
///
/// Fails when the file cannot be read, carries no `#! FIELDS` header, or
/// holds a row that does not parse into one number per field. Errors
/// name the file and, for row problems, the 1-based line.
///
/// # Examples
///
/// ```
/// use sgoop::io;
/// use sgoop::trajectory::ColumnSource;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     std::fs::write(
///         "quickstart.colvar",
///         "#! FIELDS time dist\n0.0 1.5\n0.5 1.8\n",
///     )?;
///     let colvar = io::read_colvar(Path::new("quickstart.colvar"))?;
///     std::fs::remove_file("quickstart.colvar")?;
///
///     assert_eq!(colvar.fields, vec!["time", "dist"]);
///     assert_eq!(colvar.trajectory.len(), 2);
///     Ok(())
/// }
/// ```
pub fn read_colvar(path: &Path) -> Result<ColvarData> {
    let content = fs::read_to_string(path)?;
    parse_colvar(&content, &path.display().to_string())
}

/// Parses COLVAR content; `path` appears only in diagnostics.
fn parse_colvar(content: &str, path: &str) -> Result<ColvarData> {
    let mut fields: Option<Vec<String>> = None;
    let mut data: Vec<f64> = Vec::new();
    let mut nrows = 0;

    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(captures) = FIELDS_RE.captures(trimmed) {
            let names: Vec<String> = captures[1]
                .split_whitespace()
                .map(str::to_string)
                .collect();
            fields = Some(names);
            continue;
        }
        if SET_RE.is_match(trimmed) || trimmed.starts_with('#') {
            continue;
        }

        let names = fields.as_ref().ok_or_else(|| ColvarError::MissingFields {
            path: path.to_string(),
        })?;
        let mut row = Vec::with_capacity(names.len());
        for token in trimmed.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| ColvarError::Parse {
                path: path.to_string(),
                line: lineno + 1,
                message: format!("'{token}' is not a number"),
            })?;
            row.push(value);
        }
        if row.len() != names.len() {
            return Err(ColvarError::Parse {
                path: path.to_string(),
                line: lineno + 1,
                message: format!("row holds {} values for {} fields", row.len(), names.len()),
            });
        }
        data.extend_from_slice(&row);
        nrows += 1;
    }

    let fields = fields.ok_or_else(|| ColvarError::MissingFields {
        path: path.to_string(),
    })?;
    if nrows == 0 {
        warn!("{path} holds no data rows");
    }
    let trajectory = Trajectory::new(data, fields.len())?;
    debug!("{path}: {nrows} frames, {} fields", fields.len());
    Ok(ColvarData { fields, trajectory })
}
