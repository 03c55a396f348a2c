//! HDF5/NeXus persistence of cosmic histogram sets and fit results.
//!
//! Histogram file:
//!
//! ```text
//! /entry                      NXentry, attrs bin_width raw_bin_width events
//! /entry/channel_{energy,adc,time}
//!     counts (24, 64, nbins) underflow/overflow/entries (24, 64) bin_edges
//! /entry/{mip,adc,event}
//!     counts (nbins) bin_edges, attrs underflow overflow entries
//! /entry/{waveform_chi2,waveform_chi2_aftercut,time_energy}
//!     counts (nx, ny) x_edges y_edges, attrs outside entries
//! ```
//!
//! Fit file:
//!
//! ```text
//! /entry/fit              peak_map parameters chi2 ndf converged, bounds
//! /entry/all_towers       1-D histogram group
//! /entry/all_towers_fit   parameters lower_bounds upper_bounds, attrs chi2 ndf converged
//! ```

use crate::{Error, Result};
use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{Dataset, File, Group};
use ndarray::{ArrayView, ArrayView1, Dimension, StrideShape};
use std::path::Path;
use std::str::FromStr;
use towerslope_algorithms::model::GAMMA_PARAM_NAMES;
use towerslope_algorithms::{FitSummary, GammaFit};
use towerslope_core::{
    Binning, ChannelHistograms, CosmicsConfig, CosmicsHistograms, Hist1D, Hist2D, TowerGrid,
    N_CHANNELS, N_ETA, N_PHI,
};

/// Version tag written to the root of every file.
pub const FORMAT_VERSION: &str = "0.1";
const FORMAT_ATTR: &str = "towerslope_format_version";

const CHANNEL_GROUPS: [&str; 3] = ["channel_energy", "channel_adc", "channel_time"];

/// Histogram file opened at run start and filled at run end.
///
/// The file is created (truncating) by [`Self::create`], so an unwritable
/// destination is reported before any event is processed.
pub struct CosmicsHistogramSink {
    file: File,
}

impl CosmicsHistogramSink {
    /// Create the output file.
    ///
    /// # Errors
    /// Returns an error if the HDF5 file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        set_attr_str_file(&file, FORMAT_ATTR, FORMAT_VERSION)?;
        Ok(Self { file })
    }

    /// Write the histogram set and close the file.
    ///
    /// # Errors
    /// Returns an error if any group, dataset or attribute cannot be written.
    pub fn write(self, hists: &CosmicsHistograms, config: &CosmicsConfig) -> Result<()> {
        let entry = self.file.create_group("entry")?;
        set_attr_str_group(&entry, "NX_class", "NXentry")?;
        set_attr(&entry, "bin_width", &config.bin_width)?;
        set_attr(&entry, "raw_bin_width", &config.raw_bin_width)?;
        set_attr(&entry, "events", &hists.events())?;

        let stacks = [&hists.channel_energy, &hists.channel_adc, &hists.channel_time];
        for (name, stack) in CHANNEL_GROUPS.iter().zip(stacks) {
            write_channel_group(&entry, name, stack)?;
        }

        write_hist1d_group(&entry, "mip", &hists.mip)?;
        write_hist1d_group(&entry, "adc", &hists.adc)?;
        write_hist1d_group(&entry, "event", &hists.event)?;

        write_hist2d_group(&entry, "waveform_chi2", &hists.waveform_chi2)?;
        write_hist2d_group(&entry, "waveform_chi2_aftercut", &hists.waveform_chi2_aftercut)?;
        write_hist2d_group(&entry, "time_energy", &hists.time_energy)?;

        self.file.flush()?;
        Ok(())
    }
}

/// Writes a histogram set in one call.
///
/// # Errors
/// Returns an error if HDF5 I/O fails.
pub fn write_cosmics_hdf5<P: AsRef<Path>>(
    path: P,
    hists: &CosmicsHistograms,
    config: &CosmicsConfig,
) -> Result<()> {
    CosmicsHistogramSink::create(path)?.write(hists, config)
}

/// Contents of a histogram file.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramFile {
    pub histograms: CosmicsHistograms,
    pub bin_width: f64,
    pub raw_bin_width: f64,
    pub events: u64,
}

/// Reads a complete histogram file.
///
/// # Errors
/// Returns an error if the file cannot be opened or a group is missing or
/// malformed.
pub fn read_cosmics_hdf5<P: AsRef<Path>>(path: P) -> Result<HistogramFile> {
    let file = File::open(path)?;
    let entry = open_group(&file, "entry")?;

    let histograms = CosmicsHistograms {
        channel_energy: read_channel_group(&entry, "channel_energy")?,
        channel_adc: read_channel_group(&entry, "channel_adc")?,
        channel_time: read_channel_group(&entry, "channel_time")?,
        waveform_chi2: read_hist2d_group(&entry, "waveform_chi2")?,
        waveform_chi2_aftercut: read_hist2d_group(&entry, "waveform_chi2_aftercut")?,
        mip: read_hist1d_group(&entry, "mip")?,
        adc: read_hist1d_group(&entry, "adc")?,
        event: read_hist1d_group(&entry, "event")?,
        time_energy: read_hist2d_group(&entry, "time_energy")?,
    };

    Ok(HistogramFile {
        histograms,
        bin_width: read_attr(&entry, "bin_width")?,
        raw_bin_width: read_attr(&entry, "raw_bin_width")?,
        events: read_attr(&entry, "events")?,
    })
}

/// Reads only the per-channel energy histograms.
///
/// # Errors
/// Returns an error if the file cannot be opened or the group is missing or
/// has the wrong shape.
pub fn read_channel_energy_hdf5<P: AsRef<Path>>(path: P) -> Result<ChannelHistograms> {
    let file = File::open(path)?;
    let entry = open_group(&file, "entry")?;
    read_channel_group(&entry, "channel_energy")
}

/// One stored gamma fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRecord {
    /// `[peak, shift, scale, N]`.
    pub parameters: [f64; 4],
    pub lower_bounds: [f64; 4],
    pub upper_bounds: [f64; 4],
    pub chi2: f64,
    pub ndf: u64,
    pub converged: bool,
}

impl From<&GammaFit> for FitRecord {
    fn from(fit: &GammaFit) -> Self {
        Self {
            parameters: fit.params.to_array(),
            lower_bounds: fit.lower_bounds,
            upper_bounds: fit.upper_bounds,
            chi2: fit.chi2,
            ndf: fit.ndf as u64,
            converged: fit.converged,
        }
    }
}

impl FitRecord {
    /// Fitted peak.
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.parameters[0]
    }
}

/// Contents of a fit file.
#[derive(Debug, Clone, PartialEq)]
pub struct FitFile {
    pub peak_map: TowerGrid<f64>,
    pub channels: TowerGrid<FitRecord>,
    pub all_towers: Hist1D,
    pub all_towers_fit: FitRecord,
}

/// Writes fit results.
///
/// # Errors
/// Returns an error if HDF5 I/O fails.
pub fn write_fit_hdf5<P: AsRef<Path>>(path: P, summary: &FitSummary) -> Result<()> {
    let file = File::create(path)?;
    set_attr_str_file(&file, FORMAT_ATTR, FORMAT_VERSION)?;

    let entry = file.create_group("entry")?;
    set_attr_str_group(&entry, "NX_class", "NXentry")?;

    let fit = entry.create_group("fit")?;
    set_attr_str_group(&fit, "NX_class", "NXdata")?;
    set_attr_str_group(&fit, "signal", "peak_map")?;
    set_str_list_attr(&fit, "parameter_names", &GAMMA_PARAM_NAMES)?;

    let grid = (N_ETA, N_PHI);
    write_array(&fit, "peak_map", grid, summary.peak_map.as_slice())?;

    let fits = summary.fits.as_slice();
    let parameters: Vec<f64> = fits.iter().flat_map(|f| f.params.to_array()).collect();
    write_array(&fit, "parameters", (N_ETA, N_PHI, 4), &parameters)?;
    let chi2: Vec<f64> = fits.iter().map(|f| f.chi2).collect();
    write_array(&fit, "chi2", grid, &chi2)?;
    let ndf: Vec<u64> = fits.iter().map(|f| f.ndf as u64).collect();
    write_array(&fit, "ndf", grid, &ndf)?;
    let converged: Vec<u8> = fits.iter().map(|f| u8::from(f.converged)).collect();
    write_array(&fit, "converged", grid, &converged)?;

    let aggregate = &summary.all_towers_fit;
    write_array(&fit, "lower_bounds", (4,), &aggregate.lower_bounds)?;
    write_array(&fit, "upper_bounds", (4,), &aggregate.upper_bounds)?;

    write_hist1d_group(&entry, "all_towers", &summary.all_towers)?;

    let all_fit = entry.create_group("all_towers_fit")?;
    set_attr_str_group(&all_fit, "NX_class", "NXcollection")?;
    set_str_list_attr(&all_fit, "parameter_names", &GAMMA_PARAM_NAMES)?;
    write_array(&all_fit, "parameters", (4,), &aggregate.params.to_array())?;
    write_array(&all_fit, "lower_bounds", (4,), &aggregate.lower_bounds)?;
    write_array(&all_fit, "upper_bounds", (4,), &aggregate.upper_bounds)?;
    set_attr(&all_fit, "chi2", &aggregate.chi2)?;
    set_attr(&all_fit, "ndf", &(aggregate.ndf as u64))?;
    set_attr(&all_fit, "converged", &u8::from(aggregate.converged))?;

    file.flush()?;
    Ok(())
}

/// Reads fit results.
///
/// # Errors
/// Returns an error if the file cannot be opened or a dataset is missing or
/// has the wrong size.
pub fn read_fit_hdf5<P: AsRef<Path>>(path: P) -> Result<FitFile> {
    let file = File::open(path)?;
    let entry = open_group(&file, "entry")?;
    let fit = open_group(&entry, "fit")?;

    let peak_map = TowerGrid::from_vec(read_dataset_len::<f64>(&fit, "peak_map", N_CHANNELS)?)?;
    let parameters = read_dataset_len::<f64>(&fit, "parameters", N_CHANNELS * 4)?;
    let chi2 = read_dataset_len::<f64>(&fit, "chi2", N_CHANNELS)?;
    let ndf = read_dataset_len::<u64>(&fit, "ndf", N_CHANNELS)?;
    let converged = read_dataset_len::<u8>(&fit, "converged", N_CHANNELS)?;
    let lower_bounds = read_quad(&fit, "lower_bounds")?;
    let upper_bounds = read_quad(&fit, "upper_bounds")?;

    let channels = TowerGrid::from_fn(|pos| {
        let i = pos.index();
        FitRecord {
            parameters: [
                parameters[4 * i],
                parameters[4 * i + 1],
                parameters[4 * i + 2],
                parameters[4 * i + 3],
            ],
            lower_bounds,
            upper_bounds,
            chi2: chi2[i],
            ndf: ndf[i],
            converged: converged[i] != 0,
        }
    });

    let all_towers = read_hist1d_group(&entry, "all_towers")?;
    let all_fit = open_group(&entry, "all_towers_fit")?;
    let all_towers_fit = FitRecord {
        parameters: read_quad(&all_fit, "parameters")?,
        lower_bounds: read_quad(&all_fit, "lower_bounds")?,
        upper_bounds: read_quad(&all_fit, "upper_bounds")?,
        chi2: read_attr(&all_fit, "chi2")?,
        ndf: read_attr(&all_fit, "ndf")?,
        converged: read_attr::<u8>(&all_fit, "converged")? != 0,
    };

    Ok(FitFile {
        peak_map,
        channels,
        all_towers,
        all_towers_fit,
    })
}

fn write_channel_group(parent: &Group, name: &str, stack: &ChannelHistograms) -> Result<()> {
    let group = parent.create_group(name)?;
    set_nxdata(&group)?;

    let binning = *stack.binning();
    let nbins = binning.nbins();
    let mut counts = Vec::with_capacity(N_CHANNELS * nbins);
    let mut underflow = Vec::with_capacity(N_CHANNELS);
    let mut overflow = Vec::with_capacity(N_CHANNELS);
    let mut entries = Vec::with_capacity(N_CHANNELS);
    for (_, hist) in stack.iter() {
        counts.extend_from_slice(hist.counts());
        underflow.push(hist.underflow());
        overflow.push(hist.overflow());
        entries.push(hist.entries());
    }

    let counts_ds = write_array(&group, "counts", (N_ETA, N_PHI, nbins), &counts)?;
    set_dataset_units(&counts_ds, "count")?;
    write_array(&group, "underflow", (N_ETA, N_PHI), &underflow)?;
    write_array(&group, "overflow", (N_ETA, N_PHI), &overflow)?;
    write_array(&group, "entries", (N_ETA, N_PHI), &entries)?;
    write_axis(&group, "bin_edges", "", &binning)
}

fn read_channel_group(parent: &Group, name: &str) -> Result<ChannelHistograms> {
    let group = open_group(parent, name)?;
    let counts_ds = open_dataset(&group, "counts")?;
    let shape = counts_ds.shape();
    if shape.len() != 3 || shape[0] != N_ETA || shape[1] != N_PHI {
        return Err(Error::InvalidFormat(format!(
            "{name}/counts must be ({N_ETA}, {N_PHI}, nbins), got {shape:?}"
        )));
    }
    let binning = read_axis(&group, "", shape[2])?;
    let nbins = binning.nbins();

    let counts = read_dataset_len::<f64>(&group, "counts", N_CHANNELS * nbins)?;
    let underflow = read_dataset_len::<f64>(&group, "underflow", N_CHANNELS)?;
    let overflow = read_dataset_len::<f64>(&group, "overflow", N_CHANNELS)?;
    let entries = read_dataset_len::<u64>(&group, "entries", N_CHANNELS)?;

    let cells = counts
        .chunks_exact(nbins)
        .enumerate()
        .map(|(i, chunk)| {
            Hist1D::from_parts(binning, chunk.to_vec(), underflow[i], overflow[i], entries[i])
        })
        .collect::<towerslope_core::Result<Vec<_>>>()?;
    Ok(ChannelHistograms::from_grid(binning, TowerGrid::from_vec(cells)?)?)
}

fn write_hist1d_group(parent: &Group, name: &str, hist: &Hist1D) -> Result<()> {
    let group = parent.create_group(name)?;
    set_nxdata(&group)?;
    let counts_ds = write_array(&group, "counts", (hist.counts().len(),), hist.counts())?;
    set_dataset_units(&counts_ds, "count")?;
    set_attr(&group, "underflow", &hist.underflow())?;
    set_attr(&group, "overflow", &hist.overflow())?;
    set_attr(&group, "entries", &hist.entries())?;
    write_axis(&group, "bin_edges", "", hist.binning())
}

fn read_hist1d_group(parent: &Group, name: &str) -> Result<Hist1D> {
    let group = open_group(parent, name)?;
    let counts = read_dataset_vec::<f64>(&group, "counts")?;
    let binning = read_axis(&group, "", counts.len())?;
    Ok(Hist1D::from_parts(
        binning,
        counts,
        read_attr(&group, "underflow")?,
        read_attr(&group, "overflow")?,
        read_attr(&group, "entries")?,
    )?)
}

fn write_hist2d_group(parent: &Group, name: &str, hist: &Hist2D) -> Result<()> {
    let group = parent.create_group(name)?;
    set_nxdata(&group)?;
    let shape = (hist.x_binning().nbins(), hist.y_binning().nbins());
    let counts_ds = write_array(&group, "counts", shape, hist.counts())?;
    set_dataset_units(&counts_ds, "count")?;
    set_attr(&group, "outside", &hist.outside())?;
    set_attr(&group, "entries", &hist.entries())?;
    write_axis(&group, "x_edges", "x_", hist.x_binning())?;
    write_axis(&group, "y_edges", "y_", hist.y_binning())
}

fn read_hist2d_group(parent: &Group, name: &str) -> Result<Hist2D> {
    let group = open_group(parent, name)?;
    let counts_ds = open_dataset(&group, "counts")?;
    let shape = counts_ds.shape();
    if shape.len() != 2 {
        return Err(Error::InvalidFormat(format!(
            "{name}/counts must be 2-D, got {shape:?}"
        )));
    }
    let x = read_axis(&group, "x_", shape[0])?;
    let y = read_axis(&group, "y_", shape[1])?;
    Ok(Hist2D::from_parts(
        x,
        y,
        counts_ds.read_raw::<f64>()?,
        read_attr(&group, "outside")?,
        read_attr(&group, "entries")?,
    )?)
}

/// Edges go into a dataset for plotting; the exact range is kept in
/// `{prefix}low` / `{prefix}high` attributes.
fn write_axis(group: &Group, edges_name: &str, prefix: &str, binning: &Binning) -> Result<()> {
    let edges = binning.edges();
    write_array(group, edges_name, (edges.len(),), &edges)?;
    set_attr(group, &format!("{prefix}low"), &binning.low())?;
    set_attr(group, &format!("{prefix}high"), &binning.high())?;
    Ok(())
}

fn read_axis(group: &Group, prefix: &str, nbins: usize) -> Result<Binning> {
    let low: f64 = read_attr(group, &format!("{prefix}low"))?;
    let high: f64 = read_attr(group, &format!("{prefix}high"))?;
    Ok(Binning::new(nbins, low, high)?)
}

fn set_nxdata(group: &Group) -> Result<()> {
    set_attr_str_group(group, "NX_class", "NXdata")?;
    set_attr_str_group(group, "signal", "counts")
}

fn write_array<T, D, S>(group: &Group, name: &str, shape: S, data: &[T]) -> Result<Dataset>
where
    T: H5Type,
    D: Dimension,
    S: Into<StrideShape<D>>,
{
    let view = ArrayView::from_shape(shape, data)
        .map_err(|e| Error::InvalidFormat(format!("{name} shape mismatch: {e}")))?;
    let dataset = group
        .new_dataset::<T>()
        .shape(view.shape().to_vec())
        .create(name)?;
    dataset.write(view)?;
    Ok(dataset)
}

fn open_group(parent: &Group, name: &str) -> Result<Group> {
    parent
        .group(name)
        .map_err(|_| Error::Missing(format!("group {name}")))
}

fn open_dataset(group: &Group, name: &str) -> Result<Dataset> {
    group
        .dataset(name)
        .map_err(|_| Error::Missing(format!("dataset {name}")))
}

fn read_dataset_vec<T: H5Type>(group: &Group, name: &str) -> Result<Vec<T>> {
    Ok(open_dataset(group, name)?.read_raw::<T>()?)
}

fn read_dataset_len<T: H5Type>(group: &Group, name: &str, len: usize) -> Result<Vec<T>> {
    let values = read_dataset_vec::<T>(group, name)?;
    if values.len() != len {
        return Err(Error::InvalidFormat(format!(
            "{name} holds {} values, expected {len}",
            values.len()
        )));
    }
    Ok(values)
}

fn read_quad(group: &Group, name: &str) -> Result<[f64; 4]> {
    let values = read_dataset_len::<f64>(group, name, 4)?;
    Ok([values[0], values[1], values[2], values[3]])
}

fn set_attr<T: H5Type>(group: &Group, name: &str, value: &T) -> Result<()> {
    group.new_attr::<T>().create(name)?.write_scalar(value)?;
    Ok(())
}

fn read_attr<T: H5Type>(group: &Group, name: &str) -> Result<T> {
    let attr = group
        .attr(name)
        .map_err(|_| Error::Missing(format!("attribute {name}")))?;
    Ok(attr.read_scalar::<T>()?)
}

fn set_str_list_attr(group: &Group, name: &str, values: &[&str]) -> Result<()> {
    let values: Vec<VarLenUnicode> = values
        .iter()
        .map(|value| to_var_len_unicode(value))
        .collect::<Result<Vec<_>>>()?;
    let attr = group
        .new_attr::<VarLenUnicode>()
        .shape((values.len(),))
        .create(name)?;
    attr.write(ArrayView1::from(values.as_slice()))?;
    Ok(())
}

fn set_dataset_units(dataset: &Dataset, units: &str) -> Result<()> {
    let value = to_var_len_unicode(units)?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("units")?
        .write_scalar(&value)?;
    Ok(())
}

fn set_attr_str_file(file: &File, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    file.new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn set_attr_str_group(group: &Group, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    group
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::{tempdir, NamedTempFile};
    use towerslope_algorithms::{fit_channels, FitConfig, GammaParams};
    use towerslope_core::GridPos;

    fn sample_histograms() -> (CosmicsHistograms, CosmicsConfig) {
        let config = CosmicsConfig::new();
        let mut hists = CosmicsHistograms::new(&config).unwrap();
        let pos = GridPos::new(5, 10).unwrap();
        hists.channel_energy.fill(pos, 2150.0);
        hists.channel_energy.fill(pos, 20_000.0);
        hists.channel_adc.fill(pos, 4000.0);
        hists.channel_time.fill(pos, 0.5);
        hists.mip.fill(2150.0);
        hists.mip.fill(-1.0);
        hists.adc.fill(4000.0);
        hists.event.fill(0.0);
        hists.event.fill(0.0);
        hists.waveform_chi2.fill(2150.0, 12.0);
        hists.waveform_chi2_aftercut.fill(0.0, 12.0);
        hists.time_energy.fill(0.5, 2150.0);
        hists.time_energy.fill(50.0, 2150.0);
        (hists, config)
    }

    #[test]
    fn test_histogram_roundtrip() {
        let (hists, config) = sample_histograms();
        let file = NamedTempFile::new().unwrap();
        write_cosmics_hdf5(file.path(), &hists, &config).unwrap();

        let loaded = read_cosmics_hdf5(file.path()).unwrap();
        assert_eq!(loaded.events, 2);
        assert_relative_eq!(loaded.bin_width, config.bin_width);
        assert_relative_eq!(loaded.raw_bin_width, config.raw_bin_width);
        assert_eq!(loaded.histograms, hists);

        let pos = GridPos::new(5, 10).unwrap();
        let energy = read_channel_energy_hdf5(file.path()).unwrap();
        assert_eq!(energy.get(pos).entries(), 2);
        assert_relative_eq!(energy.get(pos).overflow(), 1.0);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.h5");
        assert!(read_cosmics_hdf5(&path).is_err());
        assert!(read_channel_energy_hdf5(&path).is_err());
    }

    #[test]
    fn test_missing_group_is_error() {
        let file = NamedTempFile::new().unwrap();
        {
            let h5 = File::create(file.path()).unwrap();
            h5.create_group("entry").unwrap();
        }
        let err = read_channel_energy_hdf5(file.path()).unwrap_err();
        assert!(matches!(err, Error::Missing(_)));
    }

    #[test]
    fn test_wrong_channel_shape_is_error() {
        let file = NamedTempFile::new().unwrap();
        {
            let h5 = File::create(file.path()).unwrap();
            let entry = h5.create_group("entry").unwrap();
            let group = entry.create_group("channel_energy").unwrap();
            write_array(&group, "counts", (2, 3, 4), &[0.0; 24]).unwrap();
        }
        let err = read_channel_energy_hdf5(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_fit_roundtrip() {
        let config = CosmicsConfig::new();
        let binning = config.energy_binning().unwrap();
        let mut channels = ChannelHistograms::new(binning);
        let shape = GammaParams::new(2200.0, 1000.0, 400.0, 1.0e5);
        let pos = GridPos::new(12, 40).unwrap();
        for i in 0..binning.nbins() {
            channels.get_mut(pos).set_content(i, shape.evaluate(binning.center(i)));
        }
        let summary = fit_channels(&channels, &FitConfig::default()).unwrap();

        let file = NamedTempFile::new().unwrap();
        write_fit_hdf5(file.path(), &summary).unwrap();
        let loaded = read_fit_hdf5(file.path()).unwrap();

        assert_eq!(loaded.peak_map, summary.peak_map);
        assert_eq!(loaded.all_towers, summary.all_towers);
        assert_eq!(loaded.channels[pos], FitRecord::from(&summary.fits[pos]));
        assert_eq!(
            loaded.all_towers_fit,
            FitRecord::from(&summary.all_towers_fit)
        );
        assert_eq!(loaded.all_towers_fit.lower_bounds, [1000.0, 500.0, 200.0, 0.0]);
    }
}
