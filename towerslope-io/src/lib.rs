//! towerslope-io: event files and HDF5 persistence.
//!
//! - JSON-lines event reader feeding the accumulator
//! - HDF5/NeXus histogram and fit files (feature `hdf5`)
//! - File-to-file drivers for both phases (feature `hdf5`)
//!

mod error;
pub mod events;
#[cfg(feature = "hdf5")]
pub mod hdf5;
#[cfg(feature = "hdf5")]
mod pipeline;

pub use error::{Error, Result};
pub use events::{write_events, EventFileReader, TowerEvent};
#[cfg(feature = "hdf5")]
pub use hdf5::{
    read_channel_energy_hdf5, read_cosmics_hdf5, read_fit_hdf5, write_cosmics_hdf5,
    write_fit_hdf5, CosmicsHistogramSink, FitFile, FitRecord, HistogramFile,
};
#[cfg(feature = "hdf5")]
pub use pipeline::{accumulate_file, fit_channels_file};
