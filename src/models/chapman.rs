use super::{IonosphereModel, ProfileBatch};
use crate::constants::PI;
use crate::errors::ModelError;
use chrono::{Datelike, NaiveDate};
use hifitime::Epoch;
use nalgebra::DMatrix;

/// Analytic ionosphere made of a single Chapman production layer.
///
/// The electron density follows the Chapman profile for the local solar
/// zenith angle, with a residual night-time ionization. Temperature grows
/// linearly with height. Heights below `min_height` are outside the model
/// and come back as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapmanModel {
    pub peak_density: f64,         // m^-3 with the sun overhead
    pub peak_height: f64,          // km
    pub scale_height: f64,         // km
    pub night_fraction: f64,       // fraction of the peak density left at night
    pub min_height: f64,           // km
    pub base_temperature: f64,     // K at min_height
    pub temperature_gradient: f64, // K/km
}

impl Default for ChapmanModel {
    fn default() -> Self {
        ChapmanModel {
            peak_density: 1.0e9,
            peak_height: 85.0,
            scale_height: 6.0,
            night_fraction: 0.01,
            min_height: 50.0,
            base_temperature: 200.0,
            temperature_gradient: 1.0,
        }
    }
}

impl ChapmanModel {
    /// Normalized Chapman production at `height` for cos(solar zenith) `cos_chi`
    pub fn chapman(&self, height: f64, cos_chi: f64) -> f64 {
        let z = (height - self.peak_height) / self.scale_height;
        if cos_chi <= 0.0 {
            return 0.0;
        }
        (0.5 * (1.0 - z - (-z).exp() / cos_chi)).exp()
    }

    pub fn density(&self, height: f64, cos_chi: f64) -> f64 {
        if height < self.min_height {
            return f64::NAN;
        }
        let day = self.chapman(height, cos_chi);
        let night = self.night_fraction * self.chapman(height, 1.0);
        self.peak_density * day.max(night)
    }

    pub fn temperature(&self, height: f64) -> f64 {
        if height < self.min_height {
            return f64::NAN;
        }
        self.base_temperature + self.temperature_gradient * (height - self.min_height)
    }
}

/// Cosine of the solar zenith angle at (`lat`, `lon`) deg.
///
/// `day_of_year` starts at 1, `utc_hours` is the fractional hour of the day.
pub fn cos_solar_zenith(lat: f64, lon: f64, day_of_year: u32, utc_hours: f64) -> f64 {
    let declination =
        (-23.44f64).to_radians() * (2.0 * PI / 365.0 * (day_of_year as f64 + 10.0)).cos();
    let hour_angle = ((utc_hours + lon / 15.0 - 12.0) * 15.0).to_radians();
    let lat = lat.to_radians();
    lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos()
}

fn day_and_hours(epoch: Epoch) -> Result<(u32, f64), ModelError> {
    let (y, m, d, h, min, s, ns) = epoch.to_gregorian_utc();
    let day_of_year = NaiveDate::from_ymd_opt(y, u32::from(m), u32::from(d))
        .map(|date| date.ordinal())
        .ok_or_else(|| ModelError::new("chapman", format!("invalid date {y}-{m}-{d}")))?;
    let hours = f64::from(h) + f64::from(min) / 60.0 + (f64::from(s) + f64::from(ns) * 1e-9) / 3600.0;
    Ok((day_of_year, hours))
}

impl IonosphereModel for ChapmanModel {
    fn profiles(
        &self,
        epoch: Epoch,
        heights: &[f64],
        lats: &[f64],
        lons: &[f64],
        _version: u32,
    ) -> Result<ProfileBatch, ModelError> {
        if lats.len() != lons.len() {
            return Err(ModelError::new(
                self.name(),
                format!("{} latitudes for {} longitudes", lats.len(), lons.len()),
            ));
        }
        let (day_of_year, hours) = day_and_hours(epoch)?;
        let cos_chi: Vec<f64> = lats
            .iter()
            .zip(lons)
            .map(|(&lat, &lon)| cos_solar_zenith(lat, lon, day_of_year, hours))
            .collect();

        Ok(ProfileBatch {
            density: DMatrix::from_fn(lats.len(), heights.len(), |i, j| {
                self.density(heights[j], cos_chi[i])
            }),
            temperature: DMatrix::from_fn(lats.len(), heights.len(), |_, j| {
                self.temperature(heights[j])
            }),
        })
    }

    fn name(&self) -> &'static str {
        "chapman"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test]
    fn peak_with_overhead_sun() {
        let model = ChapmanModel::default();
        assert_abs_diff_eq!(model.density(85.0, 1.0), 1.0e9, epsilon = 1.0);
        assert!(model.density(75.0, 1.0) < 1.0e9);
        assert!(model.density(95.0, 1.0) < 1.0e9);
    }

    #[test]
    fn night_keeps_residual_ionization() {
        let model = ChapmanModel::default();
        let night = model.density(85.0, -0.5);
        assert_abs_diff_eq!(night, 1.0e7, epsilon = 1.0);
        assert!(model.density(85.0, 0.5) > night);
    }

    #[test]
    fn below_validity_is_nan() {
        let model = ChapmanModel::default();
        assert!(model.density(40.0, 1.0).is_nan());
        assert!(model.temperature(40.0).is_nan());
        assert_eq!(model.temperature(60.0), 210.0);
    }

    #[test_case(0.0, 0.0, 80, 12.0, 1.0 ; "equinox noon on the equator")]
    #[test_case(0.0, 180.0, 80, 12.0, -1.0 ; "equinox midnight on the equator")]
    fn solar_zenith(lat: f64, lon: f64, day: u32, hours: f64, expected: f64) {
        assert_abs_diff_eq!(cos_solar_zenith(lat, lon, day, hours), expected, epsilon = 0.01);
    }

    #[test]
    fn batch_shape() {
        let model = ChapmanModel::default();
        let epoch = Epoch::from_gregorian_utc(2021, 6, 21, 12, 0, 0, 0);
        let batch = model
            .profiles(epoch, &[45.0, 60.0, 90.0], &[10.0, 20.0], &[0.0, 5.0], 20)
            .unwrap();
        assert_eq!(batch.density.shape(), (2, 3));
        assert_eq!(batch.temperature.shape(), (2, 3));
        assert!(batch.density[(0, 0)].is_nan());
        assert!(batch.density[(1, 2)] > 0.0);
    }

    #[test]
    fn mismatched_batch_is_an_error() {
        let model = ChapmanModel::default();
        let epoch = Epoch::from_gregorian_utc(2021, 6, 21, 12, 0, 0, 0);
        assert!(model.profiles(epoch, &[60.0], &[10.0], &[], 20).is_err());
    }
}
