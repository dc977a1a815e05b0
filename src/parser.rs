//! Input file parsing for RC scoring and optimization runs.
//!
//! Run files use a flat `key = value` format: one setting per line, `#`
//! starting a comment anywhere on the line, blank lines ignored, keys
//! case-insensitive, list values comma-separated. Unknown keys and
//! unparseable values are rejected rather than silently skipped.
//!
//! # Input File Format
//!
//! ```text
//! # data tables
//! colvar = metad.colvar        # density table (required)
//! maxcal = unbiased.colvar     # companion dynamics table
//! cv_cols = 1, 2, 3            # CV columns, 0-based (required)
//! v_minus_c_col = 4            # bias column for reweighting
//! diffusivity = 0.5            # fixed rate replacing transition counting
//!
//! # run
//! mode = optimize              # evaluate (default) or optimize
//! rc0 = 1.0, 0.0, 0.0          # starting coefficients (required)
//!
//! # scoring
//! rc_bins = 20
//! wells = 2
//! d = 1
//! kde = true
//! bandwidth = 0.1
//! kt = 2.5
//!
//! # basin hopping
//! niter = 50
//! annealing_temp = 0.1
//! step_size = 0.5
//! seed = 1234
//! local_iters = 50
//! max_step_size = 0.5
//! reduced_factor = 0.5
//! fd_step = 1e-5
//! grad_tol = 1e-5
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use sgoop::parser::parse_input;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = parse_input(Path::new("sgoop.in"))?;
//!     println!("{} CVs from {}", spec.config.cv_cols.len(), spec.colvar.display());
//!     Ok(())
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::config::{HoppingParams, RunMode, SgoopConfig};

/// Error type for run-file parsing.
#[derive(Error, Debug)]
pub enum InputError {
    /// I/O error when reading the file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Format error with a descriptive message
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Type alias for parse operation results
type Result<T> = std::result::Result<T, InputError>;

/// A complete parsed run description.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Density and rate-matrix parameters
    pub config: SgoopConfig,
    /// Basin-hopping parameters
    pub hopping: HoppingParams,
    /// Density table path
    pub colvar: PathBuf,
    /// Companion trajectory carrying the dynamics, if any
    pub maxcal: Option<PathBuf>,
    /// Starting RC coefficients
    pub rc0: Vec<f64>,
    /// Whether to score `rc0` once or optimize from it
    pub mode: RunMode,
}

/// Parses a run file from disk.
pub fn parse_input(path: &Path) -> Result<RunSpec> {
    let content = fs::read_to_string(path)?;
    parse_run(&content)
}

/// Parses run-file content.
fn parse_run(content: &str) -> Result<RunSpec> {
    let mut config = SgoopConfig::default();
    let mut hopping = HoppingParams::default();
    let mut colvar: Option<PathBuf> = None;
    let mut maxcal: Option<PathBuf> = None;
    let mut rc0: Option<Vec<f64>> = None;
    let mut mode = RunMode::default();

    for raw_line in content.lines() {
        let line = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(InputError::Parse(format!(
                "expected 'key = value', found '{line}'"
            )));
        }
        let key = parts[0].trim().to_lowercase();
        let value = parts[1].trim();

        match key.as_str() {
            "colvar" => colvar = Some(PathBuf::from(value)),
            "maxcal" => maxcal = Some(PathBuf::from(value)),
            "mode" => mode = parse_mode(value)?,
            "cv_cols" => config.cv_cols = parse_list(&key, value)?,
            "v_minus_c_col" => config.v_minus_c_col = Some(parse_value(&key, value)?),
            "rc_bins" => config.rc_bins = parse_value(&key, value)?,
            "wells" => config.wells = parse_value(&key, value)?,
            "d" => config.d = parse_value(&key, value)?,
            "kde" => config.kde = parse_flag(&key, value)?,
            "bandwidth" => config.bandwidth = parse_value(&key, value)?,
            "kt" => config.kt = parse_value(&key, value)?,
            "diffusivity" => config.diffusivity = Some(parse_value(&key, value)?),
            "rc0" => rc0 = Some(parse_list(&key, value)?),
            "niter" => hopping.niter = parse_value(&key, value)?,
            "annealing_temp" => hopping.annealing_temp = parse_value(&key, value)?,
            "step_size" => hopping.step_size = parse_value(&key, value)?,
            "seed" => hopping.seed = Some(parse_value(&key, value)?),
            "local_iters" => hopping.local_iters = parse_value(&key, value)?,
            "max_step_size" => hopping.max_step_size = parse_value(&key, value)?,
            "reduced_factor" => hopping.reduced_factor = parse_value(&key, value)?,
            "fd_step" => hopping.fd_step = parse_value(&key, value)?,
            "grad_tol" => hopping.grad_tol = parse_value(&key, value)?,
            _ => return Err(InputError::Parse(format!("unknown key '{key}'"))),
        }
    }

    let colvar = colvar.ok_or_else(|| InputError::Parse("colvar file not set".to_string()))?;
    let rc0 = rc0.ok_or_else(|| InputError::Parse("rc0 coefficients not set".to_string()))?;
    if config.cv_cols.is_empty() {
        return Err(InputError::Parse("cv_cols not set".to_string()));
    }
    if rc0.len() != config.cv_cols.len() {
        return Err(InputError::Parse(format!(
            "rc0 holds {} coefficients for {} cv_cols",
            rc0.len(),
            config.cv_cols.len()
        )));
    }

    debug!(
        "run file: mode {:?}, {} CVs, colvar {}",
        mode,
        config.cv_cols.len(),
        colvar.display()
    );
    Ok(RunSpec {
        config,
        hopping,
        colvar,
        maxcal,
        rc0,
        mode,
    })
}

/// Writes a commented template run file.
pub fn write_template(path: &Path) -> std::io::Result<()> {
    let template = "\
# sgoop run file
# values shown are the defaults

# data tables
colvar = COLVAR                 # density table (required)
# maxcal = unbiased.colvar      # companion trajectory carrying the dynamics
cv_cols = 1, 2                  # CV columns, 0-based (required)
# v_minus_c_col = 3             # bias column V(s)-c(t) for reweighting
# diffusivity = 1.0             # fixed rate replacing transition counting

# run
mode = evaluate                 # evaluate or optimize
rc0 = 1.0, 0.0                  # starting coefficients (required)

# scoring
rc_bins = 20
wells = 2
d = 1
kde = false
bandwidth = 0.1
kt = 2.5

# basin hopping
niter = 50
annealing_temp = 0.1
step_size = 0.5
# seed = 1234
local_iters = 50
max_step_size = 0.5
reduced_factor = 0.5
fd_step = 1e-5
grad_tol = 1e-5
";
    fs::write(path, template)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| InputError::Parse(format!("invalid value for {key}: '{value}'")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(InputError::Parse(format!(
            "invalid flag for {key}: '{value}'"
        ))),
    }
}

fn parse_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| parse_value(key, token))
        .collect()
}

fn parse_mode(value: &str) -> Result<RunMode> {
    match value.to_lowercase().as_str() {
        "evaluate" => Ok(RunMode::Evaluate),
        "optimize" => Ok(RunMode::Optimize),
        _ => Err(InputError::Parse(format!("unknown mode '{value}'"))),
    }
}
