//! Tower grid geometry.
//!
//! Towers are addressed by `(eta, phi)` on a fixed 24x64 grid. Phi is
//! azimuthal and wraps around (toroidal); eta does not wrap.

use crate::{Error, Result};
use std::ops::{Index, IndexMut};

/// Number of eta bins.
pub const N_ETA: usize = 24;
/// Number of phi bins.
pub const N_PHI: usize = 64;
/// Total number of towers on the grid.
pub const N_CHANNELS: usize = N_ETA * N_PHI;

/// Wraps a signed phi index onto `[0, N_PHI)`.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn wrap_phi(phi: isize) -> usize {
    phi.rem_euclid(N_PHI as isize) as usize
}

/// Position of a tower on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    /// Eta bin, `[0, 24)`.
    pub eta: usize,
    /// Phi bin, `[0, 64)`.
    pub phi: usize,
}

impl GridPos {
    /// Creates a grid position, rejecting coordinates outside the grid.
    ///
    /// # Errors
    /// Returns `Error::InvalidGridPosition` if `eta >= 24` or `phi >= 64`.
    pub fn new(eta: usize, phi: usize) -> Result<Self> {
        if eta >= N_ETA || phi >= N_PHI {
            return Err(Error::InvalidGridPosition { eta, phi });
        }
        Ok(Self { eta, phi })
    }

    /// Position from a row-major flat index (`eta * 64 + phi`).
    #[inline]
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        (index < N_CHANNELS).then(|| Self {
            eta: index / N_PHI,
            phi: index % N_PHI,
        })
    }

    /// Row-major flat index.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.eta * N_PHI + self.phi
    }

    /// Phi bin above this one, wrapping 63 -> 0.
    #[inline]
    #[must_use]
    pub fn phi_up(&self) -> usize {
        wrap_phi(self.phi as isize + 1)
    }

    /// Phi bin below this one, wrapping 0 -> 63.
    #[inline]
    #[must_use]
    pub fn phi_down(&self) -> usize {
        wrap_phi(self.phi as isize - 1)
    }

    /// The neighbouring eta row towards eta 0, if any.
    #[inline]
    #[must_use]
    pub fn inner_eta(&self) -> Option<usize> {
        self.eta.checked_sub(1)
    }

    /// The neighbouring eta row away from eta 0, if any.
    #[inline]
    #[must_use]
    pub fn outer_eta(&self) -> Option<usize> {
        (self.eta + 1 < N_ETA).then_some(self.eta + 1)
    }

    /// Iterates every grid position in row-major order.
    pub fn all() -> impl Iterator<Item = GridPos> + Clone {
        (0..N_CHANNELS).map(|i| GridPos {
            eta: i / N_PHI,
            phi: i % N_PHI,
        })
    }
}

/// Dense 24x64 matrix indexed by [`GridPos`] or `(eta, phi)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TowerGrid<T> {
    cells: Vec<T>,
}

impl<T: Clone> TowerGrid<T> {
    /// Creates a grid with every cell set to `value`.
    #[must_use]
    pub fn filled(value: T) -> Self {
        Self {
            cells: vec![value; N_CHANNELS],
        }
    }

    /// Overwrites every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T: Clone + Default> Default for TowerGrid<T> {
    fn default() -> Self {
        Self::filled(T::default())
    }
}

impl<T> TowerGrid<T> {
    /// Builds a grid by evaluating `f` at every position.
    pub fn from_fn(f: impl FnMut(GridPos) -> T) -> Self {
        Self {
            cells: GridPos::all().map(f).collect(),
        }
    }

    /// Builds a grid from row-major cells.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if `cells.len() != 1536`.
    pub fn from_vec(cells: Vec<T>) -> Result<Self> {
        if cells.len() != N_CHANNELS {
            return Err(Error::ConfigError(format!(
                "tower grid needs {N_CHANNELS} cells, got {}",
                cells.len()
            )));
        }
        Ok(Self { cells })
    }

    /// Cell at `(eta, phi)`; panics outside the grid.
    #[inline]
    #[must_use]
    pub fn at(&self, eta: usize, phi: usize) -> &T {
        &self.cells[eta * N_PHI + phi]
    }

    /// Row-major view of the cells.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Iterates `(position, value)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, &T)> {
        GridPos::all().zip(self.cells.iter())
    }

    /// Maps every cell into a new grid.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> TowerGrid<U> {
        TowerGrid {
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

impl<T> Index<GridPos> for TowerGrid<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: GridPos) -> &T {
        &self.cells[pos.index()]
    }
}

impl<T> IndexMut<GridPos> for TowerGrid<T> {
    #[inline]
    fn index_mut(&mut self, pos: GridPos) -> &mut T {
        &mut self.cells[pos.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_phi_boundaries() {
        assert_eq!(wrap_phi(64), 0);
        assert_eq!(wrap_phi(-1), 63);
        assert_eq!(wrap_phi(63), 63);
        assert_eq!(wrap_phi(0), 0);
    }

    #[test]
    fn test_phi_neighbours_stay_on_grid() {
        for phi in 0..N_PHI {
            let pos = GridPos::new(3, phi).unwrap();
            assert!(pos.phi_up() < N_PHI);
            assert!(pos.phi_down() < N_PHI);
        }
        let top = GridPos::new(0, 63).unwrap();
        assert_eq!(top.phi_up(), 0);
        let bottom = GridPos::new(0, 0).unwrap();
        assert_eq!(bottom.phi_down(), 63);
    }

    #[test]
    fn test_eta_does_not_wrap() {
        let first = GridPos::new(0, 5).unwrap();
        assert_eq!(first.inner_eta(), None);
        assert_eq!(first.outer_eta(), Some(1));

        let last = GridPos::new(23, 5).unwrap();
        assert_eq!(last.inner_eta(), Some(22));
        assert_eq!(last.outer_eta(), None);
    }

    #[test]
    fn test_invalid_position() {
        assert!(GridPos::new(24, 0).is_err());
        assert!(GridPos::new(0, 64).is_err());
        assert!(GridPos::from_index(N_CHANNELS).is_none());
    }

    #[test]
    fn test_index_roundtrip() {
        let pos = GridPos::new(5, 10).unwrap();
        assert_eq!(pos.index(), 5 * 64 + 10);
        assert_eq!(GridPos::from_index(pos.index()), Some(pos));
        assert_eq!(GridPos::all().count(), N_CHANNELS);
    }

    #[test]
    fn test_tower_grid_indexing() {
        let mut grid = TowerGrid::filled(0.0_f32);
        let pos = GridPos::new(7, 63).unwrap();
        grid[pos] = 2.5;
        assert!((grid.at(7, 63) - 2.5).abs() < f32::EPSILON);

        grid.fill(0.0);
        assert!(grid.as_slice().iter().all(|&v| v == 0.0));
        assert!(TowerGrid::from_vec(vec![0u8; 10]).is_err());
    }
}
