//! Fixed-binning 1D and 2D histograms.
//!
//! Binning is set at construction and never changes. Bin `i` covers
//! `[low + i * width, low + (i + 1) * width)`; values below `low` go to
//! underflow, values at or above `high` to overflow, NaN is ignored.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use crate::{Error, Result};

/// Uniform binning over `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    nbins: usize,
    low: f64,
    high: f64,
}

/// Where a value lands in a [`Binning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSlot {
    Underflow,
    Bin(usize),
    Overflow,
}

impl Binning {
    /// Creates a uniform binning.
    ///
    /// # Errors
    /// Returns `Error::InvalidBinning` for zero bins, non-finite edges or an
    /// empty range.
    pub fn new(nbins: usize, low: f64, high: f64) -> Result<Self> {
        if nbins == 0 {
            return Err(Error::InvalidBinning("zero bins".to_string()));
        }
        if !low.is_finite() || !high.is_finite() || high <= low {
            return Err(Error::InvalidBinning(format!(
                "range [{low}, {high}) is empty or not finite"
            )));
        }
        Ok(Self { nbins, low, high })
    }

    /// Recovers a uniform binning from its `nbins + 1` edges.
    ///
    /// # Errors
    /// Returns `Error::InvalidBinning` if there are fewer than two edges or
    /// the edges are not uniformly spaced.
    pub fn from_edges(edges: &[f64]) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::InvalidBinning(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        let binning = Self::new(edges.len() - 1, edges[0], edges[edges.len() - 1])?;
        let tolerance = binning.width() * 1e-6;
        for (i, &edge) in edges.iter().enumerate() {
            if (edge - binning.edge(i)).abs() > tolerance {
                return Err(Error::InvalidBinning(format!(
                    "edge {i} = {edge} breaks uniform spacing"
                )));
            }
        }
        Ok(binning)
    }

    #[inline]
    #[must_use]
    pub fn nbins(&self) -> usize {
        self.nbins
    }

    #[inline]
    #[must_use]
    pub fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    #[must_use]
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Width of one bin.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        (self.high - self.low) / self.nbins as f64
    }

    /// Lower edge of bin `i` (`edge(nbins)` is the upper edge).
    #[inline]
    #[must_use]
    pub fn edge(&self, i: usize) -> f64 {
        self.low + i as f64 * self.width()
    }

    /// Centre of bin `i`.
    #[inline]
    #[must_use]
    pub fn center(&self, i: usize) -> f64 {
        self.low + (i as f64 + 0.5) * self.width()
    }

    /// All `nbins + 1` edges.
    #[must_use]
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.nbins).map(|i| self.edge(i)).collect()
    }

    /// Locates `x`; `None` for NaN.
    #[inline]
    #[must_use]
    pub fn locate(&self, x: f64) -> Option<BinSlot> {
        if x.is_nan() {
            return None;
        }
        if x < self.low {
            return Some(BinSlot::Underflow);
        }
        if x >= self.high {
            return Some(BinSlot::Overflow);
        }
        let bin = ((x - self.low) / self.width()) as usize;
        // Rounding can push values just below `high` onto `nbins`.
        Some(BinSlot::Bin(bin.min(self.nbins - 1)))
    }
}

/// One-dimensional histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Hist1D {
    binning: Binning,
    counts: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
}

impl Hist1D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(binning: Binning) -> Self {
        Self {
            binning,
            counts: vec![0.0; binning.nbins()],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// Rebuilds a histogram from stored parts.
    ///
    /// # Errors
    /// Returns `Error::BinningMismatch` if `counts` does not match the binning.
    pub fn from_parts(
        binning: Binning,
        counts: Vec<f64>,
        underflow: f64,
        overflow: f64,
        entries: u64,
    ) -> Result<Self> {
        if counts.len() != binning.nbins() {
            return Err(Error::BinningMismatch(format!(
                "{} counts for {} bins",
                counts.len(),
                binning.nbins()
            )));
        }
        Ok(Self {
            binning,
            counts,
            underflow,
            overflow,
            entries,
        })
    }

    /// Adds one entry at `x`.
    #[inline]
    pub fn fill(&mut self, x: f64) {
        match self.binning.locate(x) {
            Some(BinSlot::Bin(i)) => self.counts[i] += 1.0,
            Some(BinSlot::Underflow) => self.underflow += 1.0,
            Some(BinSlot::Overflow) => self.overflow += 1.0,
            None => return,
        }
        self.entries += 1;
    }

    /// Overwrites the content of bin `i`.
    pub fn set_content(&mut self, i: usize, value: f64) {
        self.counts[i] = value;
    }

    /// Adds `other` bin by bin, including underflow, overflow and entries.
    ///
    /// # Errors
    /// Returns `Error::BinningMismatch` if the binnings differ.
    pub fn add(&mut self, other: &Hist1D) -> Result<()> {
        if self.binning != other.binning {
            return Err(Error::BinningMismatch(format!(
                "{:?} vs {:?}",
                self.binning, other.binning
            )));
        }
        self.add_bins(other);
        Ok(())
    }

    /// Adds `other` without comparing binnings; callers guarantee they match.
    pub(crate) fn add_bins(&mut self, other: &Hist1D) {
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
    }

    /// Clears contents, keeping the binning.
    pub fn reset(&mut self) {
        self.counts.fill(0.0);
        self.underflow = 0.0;
        self.overflow = 0.0;
        self.entries = 0;
    }

    #[inline]
    #[must_use]
    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    #[inline]
    #[must_use]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    #[inline]
    #[must_use]
    pub fn content(&self, i: usize) -> f64 {
        self.counts[i]
    }

    #[inline]
    #[must_use]
    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    #[inline]
    #[must_use]
    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Number of fills (including under/overflow).
    #[inline]
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of in-range bin contents.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Largest in-range bin content.
    #[must_use]
    pub fn max_content(&self) -> f64 {
        self.counts.iter().copied().fold(0.0, f64::max)
    }

    /// Content-weighted mean of bin centres (0 for an empty histogram).
    #[must_use]
    pub fn mean(&self) -> f64 {
        let total = self.integral();
        if total <= 0.0 {
            return 0.0;
        }
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| c * self.binning.center(i))
            .sum::<f64>()
            / total
    }

    /// Content-weighted standard deviation of bin centres.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        let total = self.integral();
        if total <= 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| c * (self.binning.center(i) - mean).powi(2))
            .sum::<f64>()
            / total;
        var.max(0.0).sqrt()
    }
}

/// Two-dimensional histogram, stored x-major (`ix * ny + iy`).
#[derive(Debug, Clone, PartialEq)]
pub struct Hist2D {
    x: Binning,
    y: Binning,
    counts: Vec<f64>,
    outside: f64,
    entries: u64,
}

impl Hist2D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(x: Binning, y: Binning) -> Self {
        Self {
            x,
            y,
            counts: vec![0.0; x.nbins() * y.nbins()],
            outside: 0.0,
            entries: 0,
        }
    }

    /// Rebuilds a histogram from stored parts.
    ///
    /// # Errors
    /// Returns `Error::BinningMismatch` if `counts` does not match the binning.
    pub fn from_parts(
        x: Binning,
        y: Binning,
        counts: Vec<f64>,
        outside: f64,
        entries: u64,
    ) -> Result<Self> {
        if counts.len() != x.nbins() * y.nbins() {
            return Err(Error::BinningMismatch(format!(
                "{} counts for {}x{} bins",
                counts.len(),
                x.nbins(),
                y.nbins()
            )));
        }
        Ok(Self {
            x,
            y,
            counts,
            outside,
            entries,
        })
    }

    /// Adds one entry at `(x, y)`.
    #[inline]
    pub fn fill(&mut self, x: f64, y: f64) {
        match (self.x.locate(x), self.y.locate(y)) {
            (Some(BinSlot::Bin(ix)), Some(BinSlot::Bin(iy))) => {
                self.counts[ix * self.y.nbins() + iy] += 1.0;
            }
            (Some(_), Some(_)) => self.outside += 1.0,
            _ => return,
        }
        self.entries += 1;
    }

    /// Overwrites the content of cell `(ix, iy)`.
    pub fn set_content(&mut self, ix: usize, iy: usize, value: f64) {
        let ny = self.y.nbins();
        self.counts[ix * ny + iy] = value;
    }

    #[inline]
    #[must_use]
    pub fn x_binning(&self) -> &Binning {
        &self.x
    }

    #[inline]
    #[must_use]
    pub fn y_binning(&self) -> &Binning {
        &self.y
    }

    #[inline]
    #[must_use]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    #[inline]
    #[must_use]
    pub fn content(&self, ix: usize, iy: usize) -> f64 {
        self.counts[ix * self.y.nbins() + iy]
    }

    /// Fills that landed outside the x or y range.
    #[inline]
    #[must_use]
    pub fn outside(&self) -> f64 {
        self.outside
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of in-range cell contents.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_binning_locate() {
        let b = Binning::new(10, 0.0, 100.0).unwrap();
        assert_relative_eq!(b.width(), 10.0);
        assert_eq!(b.locate(-0.1), Some(BinSlot::Underflow));
        assert_eq!(b.locate(0.0), Some(BinSlot::Bin(0)));
        assert_eq!(b.locate(99.99), Some(BinSlot::Bin(9)));
        assert_eq!(b.locate(100.0), Some(BinSlot::Overflow));
        assert_eq!(b.locate(f64::NAN), None);
    }

    #[test]
    fn test_binning_rejects_bad_ranges() {
        assert!(Binning::new(0, 0.0, 1.0).is_err());
        assert!(Binning::new(5, 1.0, 1.0).is_err());
        assert!(Binning::new(5, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_binning_from_edges() {
        let b = Binning::new(4, -10.0, 10.0).unwrap();
        assert_eq!(Binning::from_edges(&b.edges()).unwrap(), b);
        assert!(Binning::from_edges(&[0.0, 1.0, 3.0]).is_err());
        assert!(Binning::from_edges(&[0.0]).is_err());
    }

    #[test]
    fn test_hist1d_fill_and_stats() {
        let mut h = Hist1D::new(Binning::new(10, 0.0, 10.0).unwrap());
        h.fill(2.5);
        h.fill(2.7);
        h.fill(4.5);
        h.fill(-1.0);
        h.fill(11.0);
        h.fill(f64::NAN);

        assert_eq!(h.entries(), 5);
        assert_relative_eq!(h.content(2), 2.0);
        assert_relative_eq!(h.content(4), 1.0);
        assert_relative_eq!(h.underflow(), 1.0);
        assert_relative_eq!(h.overflow(), 1.0);
        assert_relative_eq!(h.integral(), 3.0);
        assert_relative_eq!(h.max_content(), 2.0);
        assert_relative_eq!(h.mean(), (2.5 * 2.0 + 4.5) / 3.0);
        assert!(h.std_dev() > 0.0);
    }

    #[test]
    fn test_hist1d_add() {
        let binning = Binning::new(5, 0.0, 5.0).unwrap();
        let mut a = Hist1D::new(binning);
        let mut b = Hist1D::new(binning);
        a.fill(1.5);
        b.fill(1.5);
        b.fill(3.5);
        b.fill(9.0);
        a.add(&b).unwrap();
        assert_relative_eq!(a.content(1), 2.0);
        assert_relative_eq!(a.content(3), 1.0);
        assert_relative_eq!(a.overflow(), 1.0);
        assert_eq!(a.entries(), 4);

        let other = Hist1D::new(Binning::new(6, 0.0, 5.0).unwrap());
        assert!(matches!(a.add(&other), Err(Error::BinningMismatch(_))));

        a.reset();
        assert_eq!(a.entries(), 0);
        assert_relative_eq!(a.integral(), 0.0);
    }

    #[test]
    fn test_hist2d_fill() {
        let mut h = Hist2D::new(
            Binning::new(4, 0.0, 4.0).unwrap(),
            Binning::new(2, 0.0, 2.0).unwrap(),
        );
        h.fill(1.5, 0.5);
        h.fill(1.5, 0.5);
        h.fill(3.5, 1.5);
        h.fill(5.0, 0.5);
        assert_relative_eq!(h.content(1, 0), 2.0);
        assert_relative_eq!(h.content(3, 1), 1.0);
        assert_relative_eq!(h.outside(), 1.0);
        assert_eq!(h.entries(), 4);
        assert_relative_eq!(h.integral(), 3.0);
    }

    #[test]
    fn test_from_parts_checks_length() {
        let binning = Binning::new(3, 0.0, 3.0).unwrap();
        assert!(Hist1D::from_parts(binning, vec![0.0; 2], 0.0, 0.0, 0).is_err());
        assert!(Hist2D::from_parts(binning, binning, vec![0.0; 8], 0.0, 0).is_err());
    }
}
