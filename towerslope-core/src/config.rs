//! Accumulation configuration.

use crate::histogram::Binning;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Threshold set for one coincidence selection pass.
///
/// A tower passes when it is at least `tower`, both phi neighbours are at
/// least `vertical`, and no tower in the adjacent eta rows exceeds `veto`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoincidenceCuts {
    pub tower: f32,
    pub vertical: f32,
    pub veto: f32,
}

impl CoincidenceCuts {
    #[must_use]
    pub fn new(tower: f32, vertical: f32, veto: f32) -> Self {
        Self {
            tower,
            vertical,
            veto,
        }
    }

    /// Default cuts on calibrated energy.
    #[must_use]
    pub fn energy_defaults() -> Self {
        Self::new(500.0, 500.0, 350.0)
    }

    /// Default cuts on raw ADC.
    #[must_use]
    pub fn adc_defaults() -> Self {
        Self::new(1000.0, 1000.0, 700.0)
    }
}

/// Configuration for the tower accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmicsConfig {
    /// Prefix of the raw (ADC) tower source name.
    pub raw_prefix: String,
    /// Prefix of the calibrated tower source name.
    pub calib_prefix: String,
    /// Detector suffix shared by both sources.
    pub detector: String,
    /// Cuts applied to calibrated energy.
    pub energy_cuts: CoincidenceCuts,
    /// Cuts applied to raw ADC.
    pub adc_cuts: CoincidenceCuts,
    /// Energy histogram bin width (500 bins).
    pub bin_width: f64,
    /// ADC histogram bin width scale (500 bins over `16000 * raw_bin_width`).
    pub raw_bin_width: f64,
    /// Run the per-event selection passes in parallel.
    pub parallel: bool,
}

impl Default for CosmicsConfig {
    fn default() -> Self {
        Self {
            raw_prefix: "TOWERS_".to_string(),
            calib_prefix: "TOWERINFO_CALIB_".to_string(),
            detector: "HCALOUT".to_string(),
            energy_cuts: CoincidenceCuts::energy_defaults(),
            adc_cuts: CoincidenceCuts::adc_defaults(),
            bin_width: 20.0,
            raw_bin_width: 1.0,
            parallel: true,
        }
    }
}

impl CosmicsConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a JSON file; missing fields take defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON string; missing fields take defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON cannot be parsed or validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that bin widths are positive and finite.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("bin_width", self.bin_width),
            ("raw_bin_width", self.raw_bin_width),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Set the energy cuts.
    #[must_use]
    pub fn with_energy_cuts(mut self, cuts: CoincidenceCuts) -> Self {
        self.energy_cuts = cuts;
        self
    }

    /// Set the ADC cuts.
    #[must_use]
    pub fn with_adc_cuts(mut self, cuts: CoincidenceCuts) -> Self {
        self.adc_cuts = cuts;
        self
    }

    /// Set whether selection runs in parallel.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Name of the raw tower source.
    #[must_use]
    pub fn raw_source(&self) -> String {
        format!("{}{}", self.raw_prefix, self.detector)
    }

    /// Name of the calibrated tower source.
    #[must_use]
    pub fn calib_source(&self) -> String {
        format!("{}{}", self.calib_prefix, self.detector)
    }

    /// Binning of per-channel energy and `mip` histograms.
    ///
    /// # Errors
    /// Returns an error if `bin_width` is invalid.
    pub fn energy_binning(&self) -> Result<Binning> {
        Binning::new(500, 0.0, 500.0 * self.bin_width)
    }

    /// Binning of per-channel and aggregate ADC histograms.
    ///
    /// # Errors
    /// Returns an error if `raw_bin_width` is invalid.
    pub fn adc_binning(&self) -> Result<Binning> {
        Binning::new(500, 0.0, 16000.0 * self.raw_bin_width)
    }

    /// Binning of per-channel time histograms.
    ///
    /// # Errors
    /// Never fails for the fixed range; kept fallible for symmetry.
    pub fn time_binning(&self) -> Result<Binning> {
        Binning::new(100, -10.0, 10.0)
    }

    /// Peak axis of the chi2 diagnostics.
    ///
    /// # Errors
    /// Returns an error if `bin_width` is invalid.
    pub fn chi2_peak_binning(&self) -> Result<Binning> {
        Binning::new(1000, 0.0, 500.0 * self.bin_width)
    }

    /// Chi2 axis of the chi2 diagnostics.
    ///
    /// # Errors
    /// Never fails for the fixed range.
    pub fn chi2_binning(&self) -> Result<Binning> {
        Binning::new(1000, 0.0, 1_000_000.0)
    }

    /// Energy axis of the time-energy histogram.
    ///
    /// # Errors
    /// Returns an error if `bin_width` is invalid.
    pub fn time_energy_binning(&self) -> Result<Binning> {
        Binning::new(100, -10.0 * self.bin_width, 90.0 * self.bin_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = CosmicsConfig::default();
        assert_eq!(config.raw_source(), "TOWERS_HCALOUT");
        assert_eq!(config.calib_source(), "TOWERINFO_CALIB_HCALOUT");
        assert_relative_eq!(config.energy_binning().unwrap().high(), 10_000.0);
        assert_relative_eq!(config.adc_binning().unwrap().high(), 16_000.0);
        assert!(config.parallel);
    }

    #[test]
    fn test_json_partial_config() {
        let json = r#"{
            "detector": "HCALIN",
            "energy_cuts": { "tower": 400.0, "vertical": 300.0, "veto": 200.0 },
            "bin_width": 10.0
        }"#;
        let config = CosmicsConfig::from_json(json).unwrap();
        assert_eq!(config.detector, "HCALIN");
        assert_eq!(config.energy_cuts, CoincidenceCuts::new(400.0, 300.0, 200.0));
        assert_eq!(config.adc_cuts, CoincidenceCuts::adc_defaults());
        assert_relative_eq!(config.energy_binning().unwrap().high(), 5_000.0);
    }

    #[test]
    fn test_json_empty() {
        let config = CosmicsConfig::from_json("{}").unwrap();
        assert_eq!(config, CosmicsConfig::default());
    }

    #[test]
    fn test_invalid_bin_width() {
        let err = CosmicsConfig::from_json(r#"{ "bin_width": 0.0 }"#).unwrap_err();
        assert!(err.to_string().contains("bin_width"), "{err}");
        assert!(CosmicsConfig::from_json("{ not json").is_err());
    }
}
