//! Two-stage tower response fit.
//!
//! 1. A Gaussian over the seed range locates the bulk of the spectrum.
//! 2. The gamma response is fitted over the refine range with bounded
//!    parameters, seeded with the Gaussian mean.
//!
//! Per-channel fits are independent; the all-tower spectrum is the bin-wise
//! sum of the channel histograms and gets the same treatment.

use crate::minimizer::{minimize, FitData, FitParameter, MinimizerConfig};
use crate::model::{gamma_response, gaussian, GammaParams, GAMMA_PARAM_NAMES, GAUSSIAN_PARAM_NAMES};
use log::{debug, info};
use rayon::prelude::*;
use towerslope_core::{ChannelHistograms, GridPos, Hist1D, Result, TowerGrid};

/// Fit ranges, bounds and starting values.
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Range of the Gaussian seed fit.
    pub seed_range: (f64, f64),
    /// Range of the gamma fit.
    pub refine_range: (f64, f64),
    /// Allowed range of the peak position.
    pub peak_bounds: (f64, f64),
    /// Allowed range of the shift.
    pub shift_bounds: (f64, f64),
    /// Allowed range of the scale.
    pub scale_bounds: (f64, f64),
    /// Allowed range of the normalization.
    pub normalization_bounds: (f64, f64),
    /// Starting shift.
    pub initial_shift: f64,
    /// Starting scale. Moved to the midpoint of its box when outside it.
    pub initial_scale: f64,
    /// Starting normalization.
    pub initial_normalization: f64,
    /// Settings shared by both stages.
    pub minimizer: MinimizerConfig,
    /// Fit channels in parallel.
    pub parallel: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            seed_range: (0.0, 10_000.0),
            refine_range: (1000.0, 5000.0),
            peak_bounds: (1000.0, 4000.0),
            shift_bounds: (500.0, 2000.0),
            scale_bounds: (200.0, 1000.0),
            normalization_bounds: (0.0, 1e9),
            initial_shift: 1300.0,
            initial_scale: 1300.0,
            initial_normalization: 1e6,
            minimizer: MinimizerConfig::default(),
            parallel: true,
        }
    }
}

impl FitConfig {
    /// Set whether channels are fitted in parallel.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Lower bounds in `[peak, shift, scale, N]` order.
    #[must_use]
    pub fn lower_bounds(&self) -> [f64; 4] {
        [
            self.peak_bounds.0,
            self.shift_bounds.0,
            self.scale_bounds.0,
            self.normalization_bounds.0,
        ]
    }

    /// Upper bounds in `[peak, shift, scale, N]` order.
    #[must_use]
    pub fn upper_bounds(&self) -> [f64; 4] {
        [
            self.peak_bounds.1,
            self.shift_bounds.1,
            self.scale_bounds.1,
            self.normalization_bounds.1,
        ]
    }

    fn gamma_parameters(&self, peak_seed: f64) -> [FitParameter; 4] {
        let lower = self.lower_bounds();
        let upper = self.upper_bounds();
        let start = [
            peak_seed,
            self.initial_shift,
            self.initial_scale,
            self.initial_normalization,
        ];
        std::array::from_fn(|i| FitParameter::bounded(GAMMA_PARAM_NAMES[i], start[i], lower[i], upper[i]))
    }
}

/// Result of the Gaussian seed fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    /// Height.
    pub constant: f64,
    /// Mean, the peak seed for the gamma stage.
    pub mean: f64,
    /// Width, always non-negative.
    pub sigma: f64,
    /// Chi-square at the minimum.
    pub chi2: f64,
    /// Degrees of freedom.
    pub ndf: usize,
    /// Whether the minimizer reached a minimum.
    pub converged: bool,
}

/// Result of the gamma response fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaFit {
    /// Fitted parameters, or the start values when the fit could not run.
    pub params: GammaParams,
    /// Lower bounds in `[peak, shift, scale, N]` order.
    pub lower_bounds: [f64; 4],
    /// Upper bounds in `[peak, shift, scale, N]` order.
    pub upper_bounds: [f64; 4],
    /// Chi-square at the minimum.
    pub chi2: f64,
    /// Non-empty bins in range minus free parameters.
    pub ndf: usize,
    /// Minimizer iterations used.
    pub iterations: usize,
    /// Whether the minimizer reached a minimum.
    pub converged: bool,
    /// The stage-1 fit that seeded this one.
    pub seed: GaussianFit,
}

impl GammaFit {
    /// Fitted peak position.
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.params.peak
    }
}

/// Fits of every channel plus the all-tower spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    /// Fit of every channel.
    pub fits: TowerGrid<GammaFit>,
    /// Fitted peak per tower.
    pub peak_map: TowerGrid<f64>,
    /// Sum of every channel histogram.
    pub all_towers: Hist1D,
    /// Fit of `all_towers`.
    pub all_towers_fit: GammaFit,
}

impl FitSummary {
    /// Number of channel fits flagged as converged.
    #[must_use]
    pub fn converged_channels(&self) -> usize {
        self.fits.iter().filter(|(_, f)| f.converged).count()
    }
}

/// Stage 1: Gaussian over `config.seed_range`.
///
/// Starting values follow the usual histogram heuristics: the largest bin
/// content, and the mean and RMS of the bins in range.
#[must_use]
pub fn fit_seed(hist: &Hist1D, config: &FitConfig) -> GaussianFit {
    let (low, high) = config.seed_range;
    let data = FitData::from_histogram(hist, low, high);

    let total: f64 = data.y.iter().sum();
    let (mean, rms) = if total > 0.0 {
        let mean = data.x.iter().zip(&data.y).map(|(x, y)| x * y).sum::<f64>() / total;
        let var = data
            .x
            .iter()
            .zip(&data.y)
            .map(|(x, y)| y * (x - mean).powi(2))
            .sum::<f64>()
            / total;
        (mean, var.max(0.0).sqrt())
    } else {
        (0.0, 0.0)
    };
    let sigma = if rms > 0.0 { rms } else { hist.binning().width() };
    let constant = data.y.iter().copied().fold(0.0, f64::max);

    let params = [
        FitParameter::free(GAUSSIAN_PARAM_NAMES[0], constant),
        FitParameter::free(GAUSSIAN_PARAM_NAMES[1], mean),
        FitParameter::free(GAUSSIAN_PARAM_NAMES[2], sigma),
    ];
    let min = minimize(gaussian, &data, &params, &config.minimizer);
    GaussianFit {
        constant: min.values[0],
        mean: min.values[1],
        sigma: min.values[2].abs(),
        chi2: min.chi2,
        ndf: min.ndf,
        converged: min.converged,
    }
}

/// Both stages on one histogram.
#[must_use]
pub fn fit_histogram(hist: &Hist1D, config: &FitConfig) -> GammaFit {
    let seed = fit_seed(hist, config);

    let (low, high) = config.refine_range;
    let data = FitData::from_histogram(hist, low, high);
    let params = config.gamma_parameters(seed.mean);
    let min = minimize(gamma_response, &data, &params, &config.minimizer);

    GammaFit {
        params: GammaParams::new(min.values[0], min.values[1], min.values[2], min.values[3]),
        lower_bounds: config.lower_bounds(),
        upper_bounds: config.upper_bounds(),
        chi2: min.chi2,
        ndf: min.ndf,
        iterations: min.iterations,
        converged: min.converged,
        seed,
    }
}

/// Fits every channel and the all-tower sum.
///
/// # Errors
/// Returns an error if the per-channel results cannot be assembled into a
/// tower grid.
pub fn fit_channels(hists: &ChannelHistograms, config: &FitConfig) -> Result<FitSummary> {
    let positions: Vec<GridPos> = GridPos::all().collect();
    let fit_one = |pos: &GridPos| {
        let fit = fit_histogram(hists.get(*pos), config);
        if !fit.converged {
            debug!(
                "channel ({}, {}) did not converge, keeping peak {:.1}",
                pos.eta,
                pos.phi,
                fit.peak()
            );
        }
        fit
    };
    let fits: Vec<GammaFit> = if config.parallel {
        positions.par_iter().map(fit_one).collect()
    } else {
        positions.iter().map(fit_one).collect()
    };
    let fits = TowerGrid::from_vec(fits)?;
    let peak_map = fits.map(GammaFit::peak);

    let all_towers = hists.sum();
    let all_towers_fit = fit_histogram(&all_towers, config);
    info!(
        "all-tower fit: peak {:.1} shift {:.1} scale {:.1} N {:.3e} (chi2/ndf {:.2}/{})",
        all_towers_fit.params.peak,
        all_towers_fit.params.shift,
        all_towers_fit.params.scale,
        all_towers_fit.params.normalization,
        all_towers_fit.chi2,
        all_towers_fit.ndf
    );

    Ok(FitSummary {
        fits,
        peak_map,
        all_towers,
        all_towers_fit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use towerslope_core::Binning;

    fn energy_binning() -> Binning {
        Binning::new(500, 0.0, 10_000.0).unwrap()
    }

    fn model_histogram(params: GammaParams) -> Hist1D {
        let binning = energy_binning();
        let mut hist = Hist1D::new(binning);
        for i in 0..binning.nbins() {
            hist.set_content(i, params.evaluate(binning.center(i)));
        }
        hist
    }

    #[test]
    fn test_seed_finds_gaussian_mean() {
        let binning = energy_binning();
        let mut hist = Hist1D::new(binning);
        for i in 0..binning.nbins() {
            let x = binning.center(i);
            hist.set_content(i, gaussian(x, &[500.0, 3000.0, 400.0]));
        }
        let seed = fit_seed(&hist, &FitConfig::default());
        assert!(seed.converged);
        assert_relative_eq!(seed.mean, 3000.0, epsilon = 1.0);
        assert_relative_eq!(seed.sigma, 400.0, epsilon = 1.0);
    }

    #[test]
    fn test_recovers_generating_peak() {
        let truth = GammaParams::new(2200.0, 1000.0, 400.0, 1.0e6);
        let hist = model_histogram(truth);
        let fit = fit_histogram(&hist, &FitConfig::default());
        assert_relative_eq!(fit.peak(), truth.peak, epsilon = 20.0);
        assert!(fit.params.scale >= 200.0 && fit.params.scale <= 1000.0);
        assert!(fit.params.shift >= 500.0 && fit.params.shift <= 2000.0);
    }

    #[test]
    fn test_empty_histogram_keeps_start_values() {
        let hist = Hist1D::new(energy_binning());
        let fit = fit_histogram(&hist, &FitConfig::default());
        assert!(!fit.converged);
        assert_eq!(fit.ndf, 0);
        // Seed mean 0 and scale 1300 lie outside their boxes.
        assert_relative_eq!(fit.params.peak, 2500.0);
        assert_relative_eq!(fit.params.scale, 600.0);
        assert_relative_eq!(fit.params.shift, 1300.0);
    }

    #[test]
    fn test_bounds_are_reported() {
        let config = FitConfig::default();
        assert_eq!(config.lower_bounds(), [1000.0, 500.0, 200.0, 0.0]);
        assert_eq!(config.upper_bounds(), [4000.0, 2000.0, 1000.0, 1e9]);
    }
}
