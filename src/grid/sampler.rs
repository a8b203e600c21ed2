use super::healpix::{lonlat2vec, Healpix};
use crate::config::ObserverPosition;
use crate::constants::UNSEEN;
use crate::coordinates::horizon_angle;
use std::collections::HashMap;

// Rounding leftovers when interpolating exactly at a cell centre
const NEGLIGIBLE_WEIGHT: f64 = 1e-12;

/// Grid cells sampled around an observer.
///
/// Cells are stored in ascending HEALPix order; every field computed over
/// the grid uses the same row order.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    healpix: Healpix,
    radius: f64, // deg
    cells: Vec<u64>,
    lons: Vec<f64>,
    lats: Vec<f64>,
    rows: HashMap<u64, usize>,
}

impl SampleGrid {
    /// Select every cell whose centre is within `radius` degrees of the
    /// observer, boundary cells included.
    pub fn sample(position: &ObserverPosition, radius: f64, nside: u32) -> Self {
        let healpix = Healpix::new(nside);
        let center = lonlat2vec(position.longitude, position.latitude);
        let cells = healpix.query_disc(&center, radius.to_radians(), true);

        let (lons, lats): (Vec<f64>, Vec<f64>) =
            cells.iter().map(|&cell| healpix.pix2lonlat(cell)).unzip();
        let rows = cells
            .iter()
            .enumerate()
            .map(|(row, &cell)| (cell, row))
            .collect();

        log::debug!(
            "sampled {} cells within {:.2} deg of ({:.3}, {:.3}) at nside {}",
            cells.len(),
            radius,
            position.latitude,
            position.longitude,
            nside
        );

        SampleGrid {
            healpix,
            radius,
            cells,
            lons,
            lats,
            rows,
        }
    }

    pub fn healpix(&self) -> &Healpix {
        &self.healpix
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// (cell, lon, lat) triples in storage order
    pub fn iter(&self) -> impl Iterator<Item = (u64, f64, f64)> + '_ {
        self.cells
            .iter()
            .zip(&self.lons)
            .zip(&self.lats)
            .map(|((&cell, &lon), &lat)| (cell, lon, lat))
    }

    /// Storage row of `cell`, if it was sampled
    pub fn row_of(&self, cell: u64) -> Option<usize> {
        self.rows.get(&cell).copied()
    }

    /// Bilinear interpolation at (`lon`, `lat`) of the values returned by
    /// `value` for each storage row. Returns [`UNSEEN`] when a neighbour with
    /// non-zero weight lies outside the grid.
    pub fn interpolate<F>(&self, lon: f64, lat: f64, value: F) -> f64
    where
        F: Fn(usize) -> f64,
    {
        let theta = (90.0 - lat).to_radians();
        let phi = lon.to_radians();
        let mut total = 0.0;
        for (cell, weight) in self.healpix.interpolation_weights(theta, phi) {
            if weight <= NEGLIGIBLE_WEIGHT {
                continue;
            }
            match self.row_of(cell) {
                Some(row) => total += weight * value(row),
                None => return UNSEEN,
            }
        }
        total
    }
}

/// Angular radius (deg) of the disc needed to cover every line of sight
/// from an observer at `observer_height` km up to `htop` km.
pub fn disc_radius(observer_height: f64, htop: f64, margin: f64) -> f64 {
    horizon_angle(observer_height) + horizon_angle(htop) + margin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::healpix::angle_between;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cells_lie_within_radius() {
        let position = ObserverPosition::new(48.0, 11.0, 500.0);
        let radius = 12.0;
        let grid = SampleGrid::sample(&position, radius, 32);
        let center = lonlat2vec(position.longitude, position.latitude);
        let limit = radius.to_radians() + grid.healpix().max_pixrad() + 1e-12;
        assert!(!grid.is_empty());
        for (_, lon, lat) in grid.iter() {
            assert!(angle_between(&lonlat2vec(lon, lat), &center) <= limit);
        }
    }

    #[test]
    fn sampling_is_stable() {
        let position = ObserverPosition::new(-20.0, 300.0, 0.0);
        let a = SampleGrid::sample(&position, 15.0, 16);
        let b = SampleGrid::sample(&position, 15.0, 16);
        assert_eq!(a.cells(), b.cells());
        assert_eq!(a.lons(), b.lons());
        assert_eq!(a.lats(), b.lats());
    }

    #[test]
    fn rows_follow_storage_order() {
        let grid = SampleGrid::sample(&ObserverPosition::new(0.0, 0.0, 0.0), 5.0, 16);
        for (row, (cell, _, _)) in grid.iter().enumerate() {
            assert_eq!(grid.row_of(cell), Some(row));
        }
        assert_eq!(grid.row_of(u64::MAX), None);
    }

    #[test]
    fn interpolation_at_cell_centre_returns_cell_value() {
        let grid = SampleGrid::sample(&ObserverPosition::new(30.0, 40.0, 0.0), 10.0, 32);
        for (row, (_, lon, lat)) in grid.iter().enumerate() {
            let value = grid.interpolate(lon, lat, |r| r as f64 * 3.0 + 1.0);
            assert_abs_diff_eq!(value, row as f64 * 3.0 + 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn outside_the_disc_is_unseen() {
        let grid = SampleGrid::sample(&ObserverPosition::new(30.0, 40.0, 0.0), 5.0, 32);
        assert_eq!(grid.interpolate(220.0, -30.0, |_| 1.0), UNSEEN);
    }

    #[test]
    fn radius_covers_the_layer_top() {
        assert_abs_diff_eq!(disc_radius(0.0, 90.0, 5.0), 5.0 + horizon_angle(90.0));
        assert!(disc_radius(1.0, 90.0, 5.0) > disc_radius(0.0, 90.0, 5.0));
    }
}
