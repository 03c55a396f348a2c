//! Tower response models.
//!
//! The MIP response of a tower is described by a gamma density in the
//! reduced variable `(x - shift) / scale`, parametrized by the position of
//! its mode (`peak`) rather than the shape:
//!
//! ```text
//! arg      = max((x - shift) / scale, 0)
//! peak_arg = (peak - shift) / scale
//! f(x)     = N * arg^peak_arg * exp(-arg) / (Γ(peak_arg + 1) * scale)
//! ```

use statrs::function::gamma::gamma;

/// Value returned when the gamma normalization vanishes.
pub const ZERO_DENOMINATOR_VALUE: f64 = 1e8;

/// Parameter names of the gamma response, in order.
pub const GAMMA_PARAM_NAMES: [&str; 4] = ["Peak(ADC)", "Shift", "Scale", "N"];

/// Parameter names of the Gaussian seed, in order.
pub const GAUSSIAN_PARAM_NAMES: [&str; 3] = ["Constant", "Mean", "Sigma"];

/// Parameters of the gamma response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaParams {
    /// Mode of the response.
    pub peak: f64,
    /// Onset of the response.
    pub shift: f64,
    /// Width scale.
    pub scale: f64,
    /// Normalization.
    pub normalization: f64,
}

impl GammaParams {
    /// Parameters from their four values.
    #[must_use]
    pub fn new(peak: f64, shift: f64, scale: f64, normalization: f64) -> Self {
        Self {
            peak,
            shift,
            scale,
            normalization,
        }
    }

    /// Builds parameters from `[peak, shift, scale, N]`.
    #[must_use]
    pub fn from_array(p: [f64; 4]) -> Self {
        Self::new(p[0], p[1], p[2], p[3])
    }

    /// Parameters as `[peak, shift, scale, N]`.
    #[must_use]
    pub fn to_array(&self) -> [f64; 4] {
        [self.peak, self.shift, self.scale, self.normalization]
    }

    /// Evaluates the response at `x`.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        gamma_response(x, &self.to_array())
    }
}

/// Gamma response at `x` for `params = [peak, shift, scale, N]`.
///
/// Degenerate inputs map to fixed values instead of propagating: zero
/// scale gives 0, a zero denominator gives [`ZERO_DENOMINATOR_VALUE`], and a
/// NaN result gives 0.
#[must_use]
pub fn gamma_response(x: f64, params: &[f64]) -> f64 {
    let (peak, shift, scale, norm) = (params[0], params[1], params[2], params[3]);

    if scale == 0.0 {
        return 0.0;
    }

    let arg = ((x - shift) / scale).max(0.0);
    let peak_arg = (peak - shift) / scale;
    let numerator = norm * arg.powf(peak_arg) * (-arg).exp();
    let denominator = gamma(peak_arg + 1.0) * scale;

    if denominator == 0.0 {
        return ZERO_DENOMINATOR_VALUE;
    }
    let value = numerator / denominator;
    if value.is_nan() {
        return 0.0;
    }
    value
}

/// Gaussian `A * exp(-0.5 * ((x - mean) / sigma)^2)` for
/// `params = [A, mean, sigma]`.
#[must_use]
pub fn gaussian(x: f64, params: &[f64]) -> f64 {
    let (amplitude, mean, sigma) = (params[0], params[1], params[2]);
    if sigma == 0.0 {
        return 0.0;
    }
    let z = (x - mean) / sigma;
    amplitude * (-0.5 * z * z).exp()
}
