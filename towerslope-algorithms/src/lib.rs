//! towerslope-algorithms: selection, accumulation and fitting.
//!
//! - **Selection** - spatial coincidence cut with phi wrap and eta veto
//! - **Accumulator** - per-event snapshot and per-channel histogram filling
//! - **Model** - gamma tower response and Gaussian seed
//! - **Fitter** - two-stage bounded chi2 fit per channel and over all towers
//!

#![warn(missing_docs)]

mod accumulator;
mod fitter;
pub mod minimizer;
pub mod model;
mod selection;

pub use accumulator::{EventSnapshot, EventStatus, SelectionCounts, TowerAccumulator};
pub use fitter::{
    fit_channels, fit_histogram, fit_seed, FitConfig, FitSummary, GammaFit, GaussianFit,
};
pub use minimizer::{minimize, FitData, FitParameter, MinimizerConfig, Minimum};
pub use model::{gamma_response, gaussian, GammaParams};
pub use selection::{passes_coincidence, select_towers};
