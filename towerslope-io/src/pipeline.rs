//! File-to-file drivers for the accumulate and fit phases.

use crate::events::EventFileReader;
use crate::hdf5::{read_channel_energy_hdf5, write_fit_hdf5, CosmicsHistogramSink};
use crate::Result;
use log::{debug, info};
use std::path::Path;
use towerslope_algorithms::{fit_channels, FitConfig, FitSummary, TowerAccumulator};
use towerslope_core::{ChannelMap, CosmicsConfig, CosmicsHistograms};

const PROGRESS_INTERVAL: u64 = 10_000;

/// Streams an event file through a [`TowerAccumulator`] and writes the
/// histogram file.
///
/// The output is created before the first event is read.
///
/// # Errors
/// Returns an error if either file cannot be opened, an event line is
/// malformed, or the histograms cannot be written.
pub fn accumulate_file<M, P, Q>(
    input: P,
    output: Q,
    config: CosmicsConfig,
    channel_map: M,
) -> Result<CosmicsHistograms>
where
    M: ChannelMap,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let reader = EventFileReader::open(input)?;
    let sink = CosmicsHistogramSink::create(output)?;
    let mut accumulator = TowerAccumulator::new(config, channel_map)?;

    for event in reader {
        let event = event?;
        accumulator.process_event(event.raw(), event.calib());
        let processed = accumulator.events_processed();
        if processed % PROGRESS_INTERVAL == 0 {
            debug!("processed {processed} events");
        }
    }

    let config = accumulator.config().clone();
    let histograms = accumulator.finish();
    sink.write(&histograms, &config)?;
    Ok(histograms)
}

/// Fits the channel energy histograms of `input` and writes `output`.
///
/// Nothing is written unless the input is read successfully.
///
/// # Errors
/// Returns an error if the input cannot be read, its channel energy
/// histograms are missing or malformed, or the output cannot be written.
pub fn fit_channels_file<P, Q>(input: P, output: Q, config: &FitConfig) -> Result<FitSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let hists = read_channel_energy_hdf5(input)?;
    info!(
        "fitting {} populated channels",
        hists.populated_channels()
    );
    let summary = fit_channels(&hists, config)?;
    info!(
        "{} of {} channel fits converged",
        summary.converged_channels(),
        towerslope_core::N_CHANNELS
    );
    write_fit_hdf5(output, &summary)?;
    Ok(summary)
}
