//! Per-event tower accumulation.
//!
//! The accumulator owns the run's histogram set and a scratch snapshot of
//! the current event. Each call to [`TowerAccumulator::process_event`]
//! rebuilds the snapshot from scratch, then runs the energy and ADC
//! coincidence passes against it.

use crate::selection::select_towers;
use log::{info, warn};
use towerslope_core::{
    ChannelMap, CosmicsConfig, CosmicsHistograms, GridPos, Result, TowerGrid, TowerInfo,
};

/// Outcome of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Event processed, or skipped because a tower source was absent.
    Ok,
}

/// Working matrices for one event.
#[derive(Debug, Clone, Default)]
pub struct EventSnapshot {
    /// Calibrated energy, zeroed for bad-chi2 towers.
    pub peak: TowerGrid<f32>,
    /// Raw ADC.
    pub adc: TowerGrid<f32>,
    /// Tower time.
    pub time: TowerGrid<f32>,
    /// Waveform chi2.
    pub chi2: TowerGrid<f32>,
}

impl EventSnapshot {
    /// Zeroes every matrix.
    pub fn reset(&mut self) {
        self.peak.fill(0.0);
        self.adc.fill(0.0);
        self.time.fill(0.0);
        self.chi2.fill(0.0);
    }
}

/// Per-pass selection counts for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionCounts {
    /// Towers passing the energy cuts.
    pub energy: usize,
    /// Towers passing the ADC cuts.
    pub adc: usize,
}

/// Accumulates cosmic tower histograms event by event.
pub struct TowerAccumulator<M: ChannelMap> {
    config: CosmicsConfig,
    channel_map: M,
    histograms: CosmicsHistograms,
    snapshot: EventSnapshot,
    events: u64,
    last_selection: SelectionCounts,
}

impl<M: ChannelMap> TowerAccumulator<M> {
    /// Create an accumulator with empty histograms.
    ///
    /// # Errors
    /// Returns an error if the configured binning is invalid.
    pub fn new(config: CosmicsConfig, channel_map: M) -> Result<Self> {
        let histograms = CosmicsHistograms::new(&config)?;

        info!("raw ADC source: {}", config.raw_source());
        info!("calibrated energy source: {}", config.calib_source());
        info!(
            "energy thresholds: tower {} vertical {} veto {}",
            config.energy_cuts.tower, config.energy_cuts.vertical, config.energy_cuts.veto
        );
        info!(
            "ADC thresholds: tower {} vertical {} veto {}",
            config.adc_cuts.tower, config.adc_cuts.vertical, config.adc_cuts.veto
        );
        info!(
            "bin width: {} (raw {})",
            config.bin_width, config.raw_bin_width
        );

        Ok(Self {
            config,
            channel_map,
            histograms,
            snapshot: EventSnapshot::default(),
            events: 0,
            last_selection: SelectionCounts::default(),
        })
    }

    /// Processes one event.
    ///
    /// Either source may be absent; the event is then counted but otherwise
    /// skipped. `raw` and `calibrated` are index-aligned by channel.
    pub fn process_event(
        &mut self,
        raw: Option<&[TowerInfo]>,
        calibrated: Option<&[TowerInfo]>,
    ) -> EventStatus {
        self.last_selection = SelectionCounts::default();
        self.process_towers(raw, calibrated);
        self.events += 1;
        self.histograms.event.fill(0.0);
        EventStatus::Ok
    }

    fn process_towers(&mut self, raw: Option<&[TowerInfo]>, calibrated: Option<&[TowerInfo]>) {
        let Some(raw) = raw else {
            warn!("didn't find source {}", self.config.raw_source());
            return;
        };
        let Some(calibrated) = calibrated else {
            warn!("didn't find source {}", self.config.calib_source());
            return;
        };
        if raw.len() != calibrated.len() {
            warn!(
                "source length mismatch: {} raw vs {} calibrated towers",
                raw.len(),
                calibrated.len()
            );
        }
        let expected = self.channel_map.channel_count();
        if calibrated.len() > expected {
            warn!(
                "{} calibrated towers for {expected} mapped channels, ignoring the rest",
                calibrated.len()
            );
        }

        self.fill_snapshot(raw, calibrated);

        // Cuts read neighbours, so every tower must be in the snapshot first.
        let parallel = self.config.parallel;
        let energy_pass = select_towers(&self.snapshot.peak, &self.config.energy_cuts, parallel);
        for &pos in &energy_pass {
            let peak = f64::from(self.snapshot.peak[pos]);
            self.histograms.channel_energy.fill(pos, peak);
            self.histograms
                .channel_time
                .fill(pos, f64::from(self.snapshot.time[pos]));
            self.histograms.mip.fill(peak);
        }

        let adc_pass = select_towers(&self.snapshot.adc, &self.config.adc_cuts, parallel);
        for &pos in &adc_pass {
            let adc = f64::from(self.snapshot.adc[pos]);
            self.histograms.channel_adc.fill(pos, adc);
            self.histograms.adc.fill(adc);
        }

        self.last_selection = SelectionCounts {
            energy: energy_pass.len(),
            adc: adc_pass.len(),
        };
    }

    fn fill_snapshot(&mut self, raw: &[TowerInfo], calibrated: &[TowerInfo]) {
        self.snapshot.reset();
        let towers = calibrated.iter().zip(raw).take(self.channel_map.channel_count());
        for (channel, (tower, raw_tower)) in towers.enumerate() {
            let Some(pos) = self.channel_map.decode(channel) else {
                continue;
            };
            self.record_tower(pos, tower, raw_tower);
        }
    }

    fn record_tower(&mut self, pos: GridPos, tower: &TowerInfo, raw_tower: &TowerInfo) {
        let snapshot = &mut self.snapshot;
        snapshot.peak[pos] = tower.energy;
        snapshot.adc[pos] = raw_tower.energy;
        snapshot.chi2[pos] = tower.chi2;
        snapshot.time[pos] = tower.time;

        let chi2 = f64::from(tower.chi2);
        self.histograms
            .waveform_chi2
            .fill(f64::from(tower.energy), chi2);
        if tower.is_bad_chi2 {
            snapshot.peak[pos] = 0.0;
        }
        self.histograms
            .waveform_chi2_aftercut
            .fill(f64::from(snapshot.peak[pos]), chi2);
        self.histograms
            .time_energy
            .fill(f64::from(tower.time), f64::from(tower.energy));
    }

    /// Number of events handed to [`Self::process_event`].
    #[must_use]
    pub fn events_processed(&self) -> u64 {
        self.events
    }

    /// Selection counts of the most recent event.
    #[must_use]
    pub fn last_selection(&self) -> SelectionCounts {
        self.last_selection
    }

    /// Working matrices of the most recent event.
    #[must_use]
    pub fn snapshot(&self) -> &EventSnapshot {
        &self.snapshot
    }

    /// Histograms filled so far.
    #[must_use]
    pub fn histograms(&self) -> &CosmicsHistograms {
        &self.histograms
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &CosmicsConfig {
        &self.config
    }

    /// Ends the run, handing over the histogram set.
    #[must_use]
    pub fn finish(self) -> CosmicsHistograms {
        info!("accumulation finished after {} events", self.events);
        self.histograms
    }
}
