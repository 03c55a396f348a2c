//! Tower records and channel mapping.

use crate::grid::{GridPos, N_CHANNELS};
use serde::{Deserialize, Serialize};

/// Per-event reading of one tower channel.
///
/// For raw containers `energy` carries the uncalibrated ADC amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TowerInfo {
    /// Calibrated energy (or raw ADC for raw containers).
    pub energy: f32,
    /// Peak time from the waveform fit.
    #[serde(default)]
    pub time: f32,
    /// Waveform fit chi2.
    #[serde(default)]
    pub chi2: f32,
    /// Set upstream when the waveform fit is unreliable.
    #[serde(default)]
    pub is_bad_chi2: bool,
}

impl TowerInfo {
    /// Creates a tower reading.
    #[inline]
    #[must_use]
    pub fn new(energy: f32, time: f32, chi2: f32, is_bad_chi2: bool) -> Self {
        Self {
            energy,
            time,
            chi2,
            is_bad_chi2,
        }
    }

    /// Reading with only an amplitude set.
    #[inline]
    #[must_use]
    pub fn with_energy(energy: f32) -> Self {
        Self {
            energy,
            ..Self::default()
        }
    }
}

/// Maps readout channels to grid positions.
///
/// This is the detector-geometry capability the accumulator depends on;
/// implementations wrap whatever key encoding the readout uses.
pub trait ChannelMap: Send + Sync {
    /// Number of readout channels.
    fn channel_count(&self) -> usize;

    /// Grid position of `channel`, or `None` if the channel is not mapped.
    fn decode(&self, channel: usize) -> Option<GridPos>;
}

/// Channel `eta * 64 + phi`, 1536 channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowMajorChannelMap;

impl ChannelMap for RowMajorChannelMap {
    fn channel_count(&self) -> usize {
        N_CHANNELS
    }

    #[inline]
    fn decode(&self, channel: usize) -> Option<GridPos> {
        GridPos::from_index(channel)
    }
}

impl<M: ChannelMap + ?Sized> ChannelMap for &M {
    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn decode(&self, channel: usize) -> Option<GridPos> {
        (**self).decode(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_map() {
        let map = RowMajorChannelMap;
        assert_eq!(map.channel_count(), 1536);
        assert_eq!(map.decode(0), Some(GridPos { eta: 0, phi: 0 }));
        assert_eq!(map.decode(65), Some(GridPos { eta: 1, phi: 1 }));
        assert_eq!(map.decode(1535), Some(GridPos { eta: 23, phi: 63 }));
        assert_eq!(map.decode(1536), None);
    }

    #[test]
    fn test_tower_info_json_defaults() {
        let tower: TowerInfo = serde_json::from_str(r#"{"energy": 12.5}"#).unwrap();
        assert!((tower.energy - 12.5).abs() < f32::EPSILON);
        assert_eq!(tower.time, 0.0);
        assert_eq!(tower.chi2, 0.0);
        assert!(!tower.is_bad_chi2);
    }
}
