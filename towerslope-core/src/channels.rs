//! Per-channel histogram stacks and the run-level histogram set.

use crate::config::CosmicsConfig;
use crate::grid::{GridPos, TowerGrid};
use crate::histogram::{Binning, Hist1D, Hist2D};
use crate::{Error, Result};

/// One [`Hist1D`] per tower, all sharing a binning.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelHistograms {
    binning: Binning,
    hists: TowerGrid<Hist1D>,
}

impl ChannelHistograms {
    /// Creates 1536 empty histograms.
    #[must_use]
    pub fn new(binning: Binning) -> Self {
        Self {
            binning,
            hists: TowerGrid::filled(Hist1D::new(binning)),
        }
    }

    /// Wraps existing histograms.
    ///
    /// # Errors
    /// Returns `Error::BinningMismatch` if any histogram differs from `binning`.
    pub fn from_grid(binning: Binning, hists: TowerGrid<Hist1D>) -> Result<Self> {
        if let Some((pos, _)) = hists.iter().find(|(_, h)| *h.binning() != binning) {
            return Err(Error::BinningMismatch(format!(
                "channel ({}, {}) does not share the stack binning",
                pos.eta, pos.phi
            )));
        }
        Ok(Self { binning, hists })
    }

    #[inline]
    #[must_use]
    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    #[inline]
    #[must_use]
    pub fn get(&self, pos: GridPos) -> &Hist1D {
        &self.hists[pos]
    }

    #[inline]
    pub fn get_mut(&mut self, pos: GridPos) -> &mut Hist1D {
        &mut self.hists[pos]
    }

    /// Fills the histogram at `pos`.
    #[inline]
    pub fn fill(&mut self, pos: GridPos, x: f64) {
        self.hists[pos].fill(x);
    }

    /// Iterates `(position, histogram)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, &Hist1D)> {
        self.hists.iter()
    }

    /// Underlying grid.
    #[must_use]
    pub fn grid(&self) -> &TowerGrid<Hist1D> {
        &self.hists
    }

    /// Bin-wise sum of every channel.
    #[must_use]
    pub fn sum(&self) -> Hist1D {
        let mut total = Hist1D::new(self.binning);
        for (_, hist) in self.iter() {
            // Binning is shared by construction.
            total.add_bins(hist);
        }
        total
    }

    /// Number of channels with at least one entry.
    #[must_use]
    pub fn populated_channels(&self) -> usize {
        self.iter().filter(|(_, h)| h.entries() > 0).count()
    }
}

/// Every histogram produced by one accumulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CosmicsHistograms {
    /// Calibrated energy of selected towers.
    pub channel_energy: ChannelHistograms,
    /// Raw ADC of selected towers.
    pub channel_adc: ChannelHistograms,
    /// Time of energy-selected towers.
    pub channel_time: ChannelHistograms,
    /// Peak vs chi2 before the bad-chi2 cut.
    pub waveform_chi2: Hist2D,
    /// Peak vs chi2 after the bad-chi2 cut.
    pub waveform_chi2_aftercut: Hist2D,
    /// Aggregate energy spectrum of selected towers.
    pub mip: Hist1D,
    /// Aggregate ADC spectrum of selected towers.
    pub adc: Hist1D,
    /// Single-bin event counter.
    pub event: Hist1D,
    /// Time vs energy of every tower.
    pub time_energy: Hist2D,
}

impl CosmicsHistograms {
    /// Builds the empty histogram set for `config`.
    ///
    /// # Errors
    /// Returns an error if the configured bin widths are invalid.
    pub fn new(config: &CosmicsConfig) -> Result<Self> {
        config.validate()?;
        let energy = config.energy_binning()?;
        let adc = config.adc_binning()?;
        Ok(Self {
            channel_energy: ChannelHistograms::new(energy),
            channel_adc: ChannelHistograms::new(adc),
            channel_time: ChannelHistograms::new(config.time_binning()?),
            waveform_chi2: Hist2D::new(config.chi2_peak_binning()?, config.chi2_binning()?),
            waveform_chi2_aftercut: Hist2D::new(
                config.chi2_peak_binning()?,
                config.chi2_binning()?,
            ),
            mip: Hist1D::new(energy),
            adc: Hist1D::new(adc),
            event: Hist1D::new(Binning::new(1, 0.0, 1.0)?),
            time_energy: Hist2D::new(config.time_binning()?, config.time_energy_binning()?),
        })
    }

    /// Number of events counted.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn events(&self) -> u64 {
        self.event.integral() as u64
    }
}
