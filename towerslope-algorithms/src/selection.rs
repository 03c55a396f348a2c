//! Spatial coincidence selection over the tower grid.
//!
//! A tower is kept when it is above the tower threshold, both of its phi
//! neighbours (same eta, phi wrapping) are above the vertical threshold, and
//! none of the three towers in each adjacent eta row exceeds the veto
//! threshold. The vertical check is a coincidence requirement; the eta check
//! is a veto.

use rayon::prelude::*;
use towerslope_core::{CoincidenceCuts, GridPos, TowerGrid};

/// Returns true if the tower at `pos` passes `cuts` on `values`.
#[must_use]
pub fn passes_coincidence(values: &TowerGrid<f32>, pos: GridPos, cuts: &CoincidenceCuts) -> bool {
    if values[pos] < cuts.tower {
        return false;
    }

    let up = pos.phi_up();
    let down = pos.phi_down();
    if *values.at(pos.eta, up) < cuts.vertical || *values.at(pos.eta, down) < cuts.vertical {
        return false;
    }

    let vetoed = |eta: usize| {
        [up, pos.phi, down]
            .iter()
            .any(|&phi| *values.at(eta, phi) > cuts.veto)
    };
    if pos.inner_eta().is_some_and(&vetoed) {
        return false;
    }
    if pos.outer_eta().is_some_and(&vetoed) {
        return false;
    }
    true
}

/// Positions passing `cuts`, in row-major order.
///
/// `values` must hold the complete event before this is called; every
/// tower reads its neighbours from the same snapshot.
#[must_use]
pub fn select_towers(values: &TowerGrid<f32>, cuts: &CoincidenceCuts, parallel: bool) -> Vec<GridPos> {
    if parallel {
        let positions: Vec<GridPos> = GridPos::all().collect();
        positions
            .into_par_iter()
            .filter(|&pos| passes_coincidence(values, pos, cuts))
            .collect()
    } else {
        GridPos::all()
            .filter(|&pos| passes_coincidence(values, pos, cuts))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuts() -> CoincidenceCuts {
        CoincidenceCuts::new(500.0, 400.0, 300.0)
    }

    fn pos(eta: usize, phi: usize) -> GridPos {
        GridPos::new(eta, phi).unwrap()
    }

    /// Target at `(eta, phi)` with both phi neighbours lit.
    fn column(eta: usize, phi: usize) -> TowerGrid<f32> {
        let mut grid = TowerGrid::filled(0.0);
        let target = pos(eta, phi);
        grid[target] = 600.0;
        grid[pos(eta, target.phi_up())] = 450.0;
        grid[pos(eta, target.phi_down())] = 450.0;
        grid
    }

    #[test]
    fn test_isolated_column_passes() {
        let grid = column(5, 10);
        assert!(passes_coincidence(&grid, pos(5, 10), &cuts()));
        // Neighbours themselves lack a lit partner on the far side.
        assert!(!passes_coincidence(&grid, pos(5, 11), &cuts()));
        assert!(!passes_coincidence(&grid, pos(5, 9), &cuts()));
    }

    #[test]
    fn test_tower_threshold_is_inclusive() {
        let mut grid = column(5, 10);
        grid[pos(5, 10)] = 500.0;
        assert!(passes_coincidence(&grid, pos(5, 10), &cuts()));
        grid[pos(5, 10)] = 499.9;
        assert!(!passes_coincidence(&grid, pos(5, 10), &cuts()));
    }

    #[test]
    fn test_requires_both_phi_neighbours() {
        let mut grid = column(5, 10);
        grid[pos(5, 11)] = 399.0;
        assert!(!passes_coincidence(&grid, pos(5, 10), &cuts()));

        let mut grid = column(5, 10);
        grid[pos(5, 9)] = 0.0;
        assert!(!passes_coincidence(&grid, pos(5, 10), &cuts()));

        let mut grid = column(5, 10);
        grid[pos(5, 9)] = 400.0;
        assert!(passes_coincidence(&grid, pos(5, 10), &cuts()));
    }

    #[test]
    fn test_phi_wraps_at_boundaries() {
        let grid = column(8, 0);
        assert!(grid.at(8, 63) > &0.0);
        assert!(passes_coincidence(&grid, pos(8, 0), &cuts()));

        let grid = column(8, 63);
        assert!(grid.at(8, 0) > &0.0);
        assert!(passes_coincidence(&grid, pos(8, 63), &cuts()));
    }

    #[test]
    fn test_eta_veto_each_neighbour() {
        for eta in [4, 6] {
            for phi in [9, 10, 11] {
                let mut grid = column(5, 10);
                grid[pos(eta, phi)] = 301.0;
                assert!(
                    !passes_coincidence(&grid, pos(5, 10), &cuts()),
                    "veto at ({eta}, {phi}) not applied"
                );
            }
        }
    }

    #[test]
    fn test_veto_threshold_is_exclusive() {
        let mut grid = column(5, 10);
        grid[pos(4, 10)] = 300.0;
        grid[pos(6, 10)] = 300.0;
        assert!(passes_coincidence(&grid, pos(5, 10), &cuts()));
    }

    #[test]
    fn test_veto_ignores_farther_towers() {
        let mut grid = column(5, 10);
        grid[pos(4, 12)] = 1000.0;
        grid[pos(6, 8)] = 1000.0;
        grid[pos(3, 10)] = 1000.0;
        assert!(passes_coincidence(&grid, pos(5, 10), &cuts()));
    }

    #[test]
    fn test_eta_boundaries_skip_missing_row() {
        let mut grid = column(0, 20);
        grid[pos(23, 20)] = 1000.0;
        assert!(passes_coincidence(&grid, pos(0, 20), &cuts()));
        grid[pos(1, 21)] = 1000.0;
        assert!(!passes_coincidence(&grid, pos(0, 20), &cuts()));

        let mut grid = column(23, 20);
        grid[pos(0, 20)] = 1000.0;
        assert!(passes_coincidence(&grid, pos(23, 20), &cuts()));
        grid[pos(22, 19)] = 1000.0;
        assert!(!passes_coincidence(&grid, pos(23, 20), &cuts()));
    }

    #[test]
    fn test_select_parallel_matches_serial() {
        let mut grid = column(5, 10);
        for (eta, phi) in [(0, 0), (12, 40), (23, 63)] {
            let g = column(eta, phi);
            for (p, &v) in g.iter() {
                if v > 0.0 {
                    grid[p] = v;
                }
            }
        }
        let serial = select_towers(&grid, &cuts(), false);
        let parallel = select_towers(&grid, &cuts(), true);
        assert_eq!(serial, parallel);
        assert_eq!(
            serial,
            vec![pos(0, 0), pos(5, 10), pos(12, 40), pos(23, 63)]
        );
    }
}
