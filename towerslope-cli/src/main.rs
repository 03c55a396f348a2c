//! towerslope CLI: cosmic tower histogramming and gamma-peak fitting.
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use towerslope_algorithms::FitConfig;
use towerslope_core::{CosmicsConfig, RowMajorChannelMap};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    TowerslopeIo(#[from] towerslope_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] towerslope_core::Error),
}

/// Cosmic-ray tower response histogramming and fitting.
#[derive(Parser)]
#[command(name = "towerslope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select coincident towers from an event file and fill histograms
    Accumulate {
        /// Input JSON-lines event file
        input: PathBuf,

        /// Output HDF5 histogram file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration (missing fields take defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run the per-event selection on one thread
        #[arg(long)]
        serial: bool,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Fit the per-channel energy spectra of a histogram file
    Fit {
        /// Input HDF5 histogram file
        input: PathBuf,

        /// Output HDF5 fit file
        #[arg(short, long)]
        output: PathBuf,

        /// Fit channels on one thread
        #[arg(long)]
        serial: bool,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show a summary of a histogram file
    Info {
        /// Input HDF5 histogram file
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Accumulate {
            input,
            output,
            config,
            serial,
            verbose,
        } => {
            init_logging(verbose);
            let config = match config {
                Some(path) => CosmicsConfig::from_file(path)?,
                None => CosmicsConfig::default(),
            };
            let config = if serial { config.with_parallel(false) } else { config };

            let start = Instant::now();
            let hists =
                towerslope_io::accumulate_file(&input, &output, config, RowMajorChannelMap)?;
            info!(
                "accumulated {} events in {:.2}s",
                hists.events(),
                start.elapsed().as_secs_f64()
            );

            println!("Events: {}", hists.events());
            println!("Energy-selected towers: {}", hists.mip.entries());
            println!("ADC-selected towers: {}", hists.adc.entries());
            println!("Wrote: {}", output.display());
        }

        Commands::Fit {
            input,
            output,
            serial,
            verbose,
        } => {
            init_logging(verbose);
            let config = FitConfig::default().with_parallel(!serial);

            let start = Instant::now();
            let summary = towerslope_io::fit_channels_file(&input, &output, &config)?;
            info!("fitted in {:.2}s", start.elapsed().as_secs_f64());

            let fit = &summary.all_towers_fit;
            println!("All-tower peak: {:.1}", fit.params.peak);
            println!(
                "Shift: {:.1}  Scale: {:.1}  N: {:.3e}",
                fit.params.shift, fit.params.scale, fit.params.normalization
            );
            println!("Chi2/ndf: {:.2}/{}", fit.chi2, fit.ndf);
            println!(
                "Converged channels: {}/{}",
                summary.converged_channels(),
                towerslope_core::N_CHANNELS
            );
            println!("Wrote: {}", output.display());
        }

        Commands::Info { input } => {
            let file = towerslope_io::read_cosmics_hdf5(&input)?;
            let hists = &file.histograms;

            println!("File: {}", input.display());
            println!("Events: {}", file.events);
            println!("Bin width: {} (raw {})", file.bin_width, file.raw_bin_width);
            println!("MIP entries: {}", hists.mip.entries());
            println!("ADC entries: {}", hists.adc.entries());
            println!(
                "Channels with energy entries: {}",
                hists.channel_energy.populated_channels()
            );
            if hists.mip.entries() > 0 {
                println!(
                    "MIP mean: {:.1}  RMS: {:.1}",
                    hists.mip.mean(),
                    hists.mip.std_dev()
                );
            }
        }
    }

    Ok(())
}
