//! towerslope-core: Core types for calorimeter cosmics processing.
//!
//! This crate provides the tower grid geometry, per-channel tower records,
//! the channel-map abstraction, fixed-binning histograms and the run-level
//! histogram set shared by the accumulation and fitting phases.
//!

pub mod channels;
pub mod config;
pub mod error;
pub mod grid;
pub mod histogram;
pub mod tower;

pub use channels::{ChannelHistograms, CosmicsHistograms};
pub use config::{CoincidenceCuts, CosmicsConfig};
pub use error::{Error, Result};
pub use grid::{wrap_phi, GridPos, TowerGrid, N_CHANNELS, N_ETA, N_PHI};
pub use histogram::{BinSlot, Binning, Hist1D, Hist2D};
pub use tower::{ChannelMap, RowMajorChannelMap, TowerInfo};
