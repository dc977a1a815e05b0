#![deny(missing_docs)]

//! sgoop - Spectral Gap Optimization of Order Parameters
//!
//! sgoop is a Rust implementation of the SGOOP method of Tiwary and Berne
//! for scoring and optimizing one-dimensional reaction coordinates built
//! as linear combinations of molecular collective variables.
//!
//! # Overview
//!
//! Enhanced-sampling molecular dynamics needs a good low-dimensional
//! reaction coordinate (RC). SGOOP ranks candidate RCs by how cleanly
//! they separate slow barrier-crossing motion from fast in-basin noise:
//! a better RC exhibits a larger spectral gap in the eigenvalues of a
//! model transition-rate matrix built on it. This is useful for:
//! - Choosing the biasing coordinate for metadynamics or umbrella sampling
//! - Distilling many trial collective variables into one physical coordinate
//! - Post-processing biased runs into interpretable free-energy profiles
//!
//! # Algorithm
//!
//! Scoring one candidate RC runs through five stages:
//!
//! 1. **Projection**: each trajectory frame maps to `sum_k c_k * CV_k`
//! 2. **Density**: the stationary probability along the RC comes from a
//!    weighted histogram or Gaussian KDE, with metadynamics bias undone
//!    through `exp((V(s) - c(t)) / kT)` importance weights
//! 3. **Rates**: the maximum-caliber ansatz fixes the transition rates
//!    between nearby grid points from the density alone
//!    ```text
//!    M[i][j] = -sqrt(p_i / p_j) / S,   0 < |i - j| <= d
//!    ```
//!    scaled by an observed transition frequency or a fixed diffusivity
//! 4. **Spectrum**: the rate generator is eigendecomposed and the real
//!    eigenvalues sorted ascending
//! 5. **Gap**: with `n` metastable wells, the score is
//!    `exp(-lambda[n-1]) - exp(-lambda[n])`
//!
//! The basin-hopping optimizer in [`optimizer`] maximizes this score over
//! the coefficient vector.
//!
//! # Quick Start
//!
//! ```
//! use sgoop::config::SgoopConfig;
//! use sgoop::evaluate::EvalContext;
//! use sgoop::trajectory::Trajectory;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // six frames of two collective variables, one row per frame
//!     let table = Trajectory::new(
//!         vec![
//!             0.0, 0.1,
//!             1.0, 0.9,
//!             2.0, 2.1,
//!             3.0, 2.9,
//!             4.0, 4.2,
//!             0.1, 0.2,
//!         ],
//!         2,
//!     )?;
//!     let config = SgoopConfig {
//!         cv_cols: vec![0, 1],
//!         rc_bins: 5,
//!         ..Default::default()
//!     };
//!     let context = EvalContext::new(&table, &config)?;
//!     let score = context.evaluate(&[0.8, 0.6])?;
//!     println!("spectral gap: {:.4}", score.spectral_gap);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`](config/index.html) - Run configuration structures
//! - [`trajectory`](trajectory/index.html) - CV tables and RC projection
//! - [`density`](density/index.html) - Histogram and KDE density estimation
//! - [`discretize`](discretize/index.html) - Grid assignment of RC samples
//! - [`rates`](rates/index.html) - Maximum-caliber rate matrices
//! - [`spectral`](spectral/index.html) - Eigenvalues and the gap score
//! - [`evaluate`](evaluate/index.html) - End-to-end RC scoring
//! - [`optimizer`](optimizer/index.html) - Basin-hopping coefficient search
//! - [`io`](io/index.html) - COLVAR file reading
//! - [`parser`](parser/index.html) - Run file parsing
//!
//! # References
//!
//! - Tiwary, P.; Berne, B. J. Spectral gap optimization of order
//!   parameters for sampling complex molecular systems.
//!   *Proc. Natl. Acad. Sci. USA* **2016**, 113, 2839-2844.
//!   [DOI: 10.1073/pnas.1600917113](https://doi.org/10.1073/pnas.1600917113)

pub mod config;
pub mod density;
pub mod discretize;
pub mod evaluate;
pub mod io;
pub mod optimizer;
pub mod parser;
pub mod rates;
pub mod spectral;
pub mod trajectory;

pub use config::SgoopConfig;
pub use trajectory::Trajectory;
