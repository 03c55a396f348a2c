//! Bounded Levenberg-Marquardt least squares on binned data.
//!
//! Double-bounded parameters are mapped to an unbounded internal variable
//! with the Minuit sine transform
//!
//! ```text
//! external = low + (high - low) / 2 * (sin(internal) + 1)
//! ```
//!
//! so every step stays inside the box. The Jacobian is taken by forward
//! differences in internal coordinates and the damped normal equations are
//! solved with nalgebra.
#![allow(clippy::cast_precision_loss)]

use nalgebra::{DMatrix, DVector};
use towerslope_core::Hist1D;

/// A fit parameter with an optional `[low, high]` box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParameter {
    /// Display name.
    pub name: &'static str,
    /// Requested starting value.
    pub value: f64,
    /// Inclusive box, `None` for a free parameter.
    pub bounds: Option<(f64, f64)>,
}

impl FitParameter {
    /// Unbounded parameter.
    #[must_use]
    pub fn free(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            bounds: None,
        }
    }

    /// Parameter limited to `[low, high]`.
    #[must_use]
    pub fn bounded(name: &'static str, value: f64, low: f64, high: f64) -> Self {
        Self {
            name,
            value,
            bounds: Some((low, high)),
        }
    }

    /// Starting value the minimizer will actually use.
    ///
    /// A value outside its box is moved to the middle of the box; a value
    /// sitting on an edge is nudged inside so the sine transform keeps a
    /// non-zero derivative.
    #[must_use]
    pub fn start_value(&self) -> f64 {
        match self.bounds {
            None => self.value,
            Some((low, high)) => {
                if !(low..=high).contains(&self.value) || self.value.is_nan() {
                    return low + 0.5 * (high - low);
                }
                let margin = 1e-3 * (high - low);
                self.value.clamp(low + margin, high - margin)
            }
        }
    }

    fn to_internal(&self, external: f64) -> f64 {
        match self.bounds {
            None => external,
            Some((low, high)) => {
                let unit = 2.0 * (external - low) / (high - low) - 1.0;
                unit.clamp(-1.0, 1.0).asin()
            }
        }
    }

    fn to_external(&self, internal: f64) -> f64 {
        match self.bounds {
            None => internal,
            Some((low, high)) => low + 0.5 * (high - low) * (internal.sin() + 1.0),
        }
    }
}

/// Minimizer limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizerConfig {
    /// Maximum accepted steps.
    pub max_iterations: usize,
    /// Converged when the relative chi2 decrease of an accepted step falls
    /// below this.
    pub tolerance: f64,
    /// Starting damping.
    pub initial_lambda: f64,
    /// Give up once damping exceeds this without an improving step.
    pub max_lambda: f64,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-9,
            initial_lambda: 1e-3,
            max_lambda: 1e12,
        }
    }
}

/// Points entering a chi2 fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitData {
    /// Bin centres.
    pub x: Vec<f64>,
    /// Bin contents.
    pub y: Vec<f64>,
    /// Errors on `y`.
    pub sigma: Vec<f64>,
}

impl FitData {
    /// Non-empty bins of `hist` whose centre lies in `[low, high]`, with
    /// Poisson errors `sqrt(content)`.
    #[must_use]
    pub fn from_histogram(hist: &Hist1D, low: f64, high: f64) -> Self {
        let binning = hist.binning();
        let mut data = Self::default();
        for (i, &content) in hist.counts().iter().enumerate() {
            let center = binning.center(i);
            if content <= 0.0 || center < low || center > high {
                continue;
            }
            data.x.push(center);
            data.y.push(content);
            data.sigma.push(content.sqrt());
        }
        data
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Result of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Final external parameter values.
    pub values: Vec<f64>,
    /// Chi2 at `values`.
    pub chi2: f64,
    /// Points minus parameters (0 if the fit could not run).
    pub ndf: usize,
    /// Iterations run, counting the one that found no downhill step.
    pub iterations: usize,
    /// True if the fit moved and then stopped on the tolerance or on a
    /// step that could not be improved.
    pub converged: bool,
}

/// Minimizes the chi2 of `model` against `data`.
///
/// Never fails: if there are fewer points than parameters, or no step
/// improves the starting chi2, the starting values are returned with
/// `converged == false` as appropriate.
pub fn minimize<F>(
    model: F,
    data: &FitData,
    params: &[FitParameter],
    config: &MinimizerConfig,
) -> Minimum
where
    F: Fn(f64, &[f64]) -> f64,
{
    let n_par = params.len();
    let start: Vec<f64> = params.iter().map(FitParameter::start_value).collect();

    if data.len() < n_par || n_par == 0 {
        let start_chi2 = chi2(&model, data, &start);
        return Minimum {
            values: start,
            chi2: start_chi2,
            ndf: 0,
            iterations: 0,
            converged: false,
        };
    }

    let to_external = |internal: &DVector<f64>| -> Vec<f64> {
        params
            .iter()
            .zip(internal.iter())
            .map(|(p, &v)| p.to_external(v))
            .collect()
    };

    let mut internal = DVector::from_iterator(
        n_par,
        params.iter().zip(&start).map(|(p, &v)| p.to_internal(v)),
    );
    let mut current = chi2(&model, data, &to_external(&internal));
    let mut lambda = config.initial_lambda;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        let external = to_external(&internal);
        let res = residuals(&model, data, &external);
        let jac = jacobian(&model, data, params, &internal, &res);

        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let rhs = -(&jt * &res);

        let mut improved = false;
        while lambda <= config.max_lambda {
            let mut damped = jtj.clone();
            for j in 0..n_par {
                let diag = jtj[(j, j)];
                damped[(j, j)] = diag + lambda * if diag > 0.0 { diag } else { 1.0 };
            }
            let Some(step) = damped.lu().solve(&rhs) else {
                lambda *= 10.0;
                continue;
            };
            let trial = &internal + step;
            let trial_chi2 = chi2(&model, data, &to_external(&trial));
            if trial_chi2.is_finite() && trial_chi2 < current {
                let decrease = current - trial_chi2;
                internal = trial;
                lambda = (lambda / 10.0).max(1e-12);
                improved = true;
                if decrease <= config.tolerance * current.max(f64::MIN_POSITIVE) {
                    converged = true;
                }
                current = trial_chi2;
                break;
            }
            lambda *= 10.0;
        }

        iterations += 1;
        if !improved {
            // No downhill step at any damping: a minimum only if we moved.
            converged = iterations > 1 && current.is_finite();
            break;
        }
        if converged {
            break;
        }
    }

    Minimum {
        values: to_external(&internal),
        chi2: current,
        ndf: data.len() - n_par,
        iterations,
        converged,
    }
}

fn chi2<F: Fn(f64, &[f64]) -> f64>(model: &F, data: &FitData, values: &[f64]) -> f64 {
    data.x
        .iter()
        .zip(&data.y)
        .zip(&data.sigma)
        .map(|((&x, &y), &s)| {
            let r = (y - model(x, values)) / s;
            r * r
        })
        .sum()
}

fn residuals<F: Fn(f64, &[f64]) -> f64>(model: &F, data: &FitData, values: &[f64]) -> DVector<f64> {
    DVector::from_iterator(
        data.len(),
        data.x
            .iter()
            .zip(&data.y)
            .zip(&data.sigma)
            .map(|((&x, &y), &s)| (y - model(x, values)) / s),
    )
}

/// d(residual_i)/d(internal_j) by forward differences.
fn jacobian<F: Fn(f64, &[f64]) -> f64>(
    model: &F,
    data: &FitData,
    params: &[FitParameter],
    internal: &DVector<f64>,
    base: &DVector<f64>,
) -> DMatrix<f64> {
    let n_par = params.len();
    let mut jac = DMatrix::zeros(data.len(), n_par);
    for j in 0..n_par {
        let h = f64::EPSILON.sqrt() * internal[j].abs().max(1.0);
        let mut shifted = internal.clone();
        shifted[j] += h;
        let values: Vec<f64> = params
            .iter()
            .zip(shifted.iter())
            .map(|(p, &v)| p.to_external(v))
            .collect();
        let shifted_res = residuals(model, data, &values);
        for i in 0..data.len() {
            let d = (shifted_res[i] - base[i]) / h;
            jac[(i, j)] = if d.is_finite() { d } else { 0.0 };
        }
    }
    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(x: f64, p: &[f64]) -> f64 {
        p[0] + p[1] * x
    }

    fn exact_data(f: impl Fn(f64) -> f64, xs: impl Iterator<Item = f64>) -> FitData {
        let mut data = FitData::default();
        for x in xs {
            data.x.push(x);
            data.y.push(f(x));
            data.sigma.push(1.0);
        }
        data
    }

    #[test]
    fn test_start_value_handling() {
        assert_relative_eq!(FitParameter::free("a", 5.0).start_value(), 5.0);
        let p = FitParameter::bounded("s", 1300.0, 200.0, 1000.0);
        assert_relative_eq!(p.start_value(), 600.0);
        let p = FitParameter::bounded("s", 200.0, 200.0, 1000.0);
        assert!(p.start_value() > 200.0);
        let p = FitParameter::bounded("s", 400.0, 200.0, 1000.0);
        assert_relative_eq!(p.start_value(), 400.0);
    }

    #[test]
    fn test_transform_roundtrip() {
        let p = FitParameter::bounded("p", 0.0, 1000.0, 4000.0);
        for v in [1000.5, 2000.0, 3999.0] {
            assert_relative_eq!(p.to_external(p.to_internal(v)), v, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_fits_line() {
        let data = exact_data(|x| 3.0 + 2.0 * x, (0..20).map(f64::from));
        let params = [FitParameter::free("a", 0.0), FitParameter::free("b", 0.0)];
        let min = minimize(line, &data, &params, &MinimizerConfig::default());
        assert!(min.converged);
        assert_relative_eq!(min.values[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(min.values[1], 2.0, epsilon = 1e-6);
        assert_eq!(min.ndf, 18);
    }

    #[test]
    fn test_respects_bounds() {
        // Unconstrained optimum of the slope is 2; the box caps it at 1.5.
        let data = exact_data(|x| 3.0 + 2.0 * x, (0..20).map(f64::from));
        let params = [
            FitParameter::free("a", 0.0),
            FitParameter::bounded("b", 1.0, 0.0, 1.5),
        ];
        let min = minimize(line, &data, &params, &MinimizerConfig::default());
        assert!(min.values[1] <= 1.5);
        assert!(min.values[1] > 1.45);
    }

    #[test]
    fn test_stalled_at_start_is_not_converged() {
        // Constant model: no parameter change can lower the chi2.
        let data = exact_data(|_| 2.0, (0..10).map(f64::from));
        let params = [FitParameter::free("a", 0.5), FitParameter::free("b", 0.25)];
        let min = minimize(|_, _| 1.0, &data, &params, &MinimizerConfig::default());
        assert!(!min.converged);
        assert_eq!(min.iterations, 1);
        assert_eq!(min.values, vec![0.5, 0.25]);
        assert_relative_eq!(min.chi2, 10.0);
    }

    #[test]
    fn test_too_few_points_returns_start() {
        let data = exact_data(|x| x, [1.0].into_iter());
        let params = [FitParameter::free("a", 0.5), FitParameter::free("b", 0.25)];
        let min = minimize(line, &data, &params, &MinimizerConfig::default());
        assert!(!min.converged);
        assert_eq!(min.values, vec![0.5, 0.25]);
        assert_eq!(min.ndf, 0);
    }

    #[test]
    fn test_fit_data_skips_empty_and_out_of_range() {
        let binning = towerslope_core::Binning::new(10, 0.0, 10.0).unwrap();
        let mut hist = Hist1D::new(binning);
        hist.fill(0.5);
        hist.fill(3.5);
        hist.fill(3.5);
        hist.fill(9.5);
        let data = FitData::from_histogram(&hist, 1.0, 8.0);
        assert_eq!(data.x, vec![3.5]);
        assert_eq!(data.y, vec![2.0]);
        assert_relative_eq!(data.sigma[0], 2.0_f64.sqrt());
    }
}
