//! Ionospheric layer: a height band sampled over the sky of one observer.

pub mod sky;

use crate::config::{LayerSpec, ObserverPosition};
use crate::constants::{CORRECTION_MIN_LATITUDE, UNSEEN};
use crate::coordinates::sky_to_geodetic;
use crate::errors::{Error, Result};
use crate::evaluator::ModelEvaluator;
use crate::grid::{disc_radius, SampleGrid};
use log::info;
use nalgebra::DMatrix;
use rayon::ThreadPool;

pub use sky::{check_elaz_shape, elaz_mesh, SkyArray};

/// Electron density and temperature of a layer between `hbot` and `htop`,
/// split into `nlayers` sub-layers and sampled on a HEALPix disc around the
/// observer.
#[derive(Debug, Clone)]
pub struct IonLayer {
    position: ObserverPosition,
    spec: LayerSpec,
    heights: Vec<f64>,
    grid: SampleGrid,
    edens: DMatrix<f64>,
    etemp: DMatrix<f64>,
}

impl IonLayer {
    /// Sample the grid around `position`. Fields start at zero until
    /// [`IonLayer::calc`] runs.
    pub fn new(position: ObserverPosition, spec: LayerSpec) -> Result<Self> {
        position.validate()?;
        spec.validate()?;

        let radius = disc_radius(position.elevation * 1e-3, spec.htop, spec.radius_margin);
        let grid = SampleGrid::sample(&position, radius, spec.nside);

        // Boundary cells reach past the disc radius
        if spec.use_correction_model {
            let southern_edge = grid.lats().iter().copied().fold(f64::INFINITY, f64::min);
            if southern_edge < CORRECTION_MIN_LATITUDE {
                return Err(Error::Configuration(format!(
                    "the correction model is only valid above {} deg latitude, \
                     the sampled grid reaches {:.2} deg",
                    CORRECTION_MIN_LATITUDE, southern_edge
                )));
            }
        }

        let heights = spec.heights();
        let edens = DMatrix::zeros(grid.len(), spec.nlayers);
        let etemp = DMatrix::zeros(grid.len(), spec.nlayers);

        Ok(IonLayer {
            position,
            spec,
            heights,
            grid,
            edens,
            etemp,
        })
    }

    /// Build the layer and evaluate the models over it.
    pub fn compute(
        position: ObserverPosition,
        spec: LayerSpec,
        evaluator: &ModelEvaluator,
        pool: Option<&ThreadPool>,
    ) -> Result<Self> {
        let mut layer = Self::new(position, spec)?;
        layer.calc(evaluator, pool)?;
        Ok(layer)
    }

    /// Evaluate electron density and temperature over the grid.
    ///
    /// With the correction model enabled, its density replaces the
    /// reference density; temperature always comes from the reference model.
    pub fn calc(&mut self, evaluator: &ModelEvaluator, pool: Option<&ThreadPool>) -> Result<()> {
        if self.spec.use_correction_model && !evaluator.has_correction() {
            return Err(Error::Configuration(
                "the layer requests a correction model but none is attached".to_string(),
            ));
        }

        info!(
            "{}: {} cells x {} sub-layers between {} and {} km",
            self.name(),
            self.grid.len(),
            self.spec.nlayers,
            self.spec.hbot,
            self.spec.htop
        );

        let fields = evaluator.evaluate(
            &self.grid,
            self.spec.epoch,
            &self.heights,
            self.spec.model_version,
            pool,
        )?;
        let mut edens = fields.density;
        if self.spec.use_correction_model {
            edens = evaluator.evaluate_correction(&self.grid, self.spec.epoch, &self.heights, pool)?;
        }

        self.edens = edens;
        self.etemp = fields.temperature;
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.spec.name.as_deref().unwrap_or("layer")
    }

    pub fn position(&self) -> &ObserverPosition {
        &self.position
    }

    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }

    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    /// Sub-layer heights in km
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn radius(&self) -> f64 {
        self.grid.radius()
    }

    /// Electron density (m⁻³), `[cell][sub-layer]`
    pub fn density(&self) -> &DMatrix<f64> {
        &self.edens
    }

    /// Electron temperature (K), `[cell][sub-layer]`
    pub fn temperature(&self) -> &DMatrix<f64> {
        &self.etemp
    }

    /// Electron density along the line of sight at (`el`, `az`).
    ///
    /// With `layer = None` the values of every sub-layer are averaged.
    pub fn ed(&self, el: &SkyArray, az: &SkyArray, layer: Option<usize>) -> Result<SkyArray> {
        self.evaluate_field(&self.edens, el, az, layer)
    }

    /// Electron temperature along the line of sight at (`el`, `az`).
    pub fn et(&self, el: &SkyArray, az: &SkyArray, layer: Option<usize>) -> Result<SkyArray> {
        self.evaluate_field(&self.etemp, el, az, layer)
    }

    /// Electron density interpolated at a geographic point of one sub-layer
    pub fn density_at(&self, lat: f64, lon: f64, sublayer: usize) -> Result<f64> {
        self.check_sublayer(sublayer)?;
        Ok(self.interpolate(&self.edens, lat, lon, sublayer))
    }

    /// Electron temperature interpolated at a geographic point of one sub-layer
    pub fn temperature_at(&self, lat: f64, lon: f64, sublayer: usize) -> Result<f64> {
        self.check_sublayer(sublayer)?;
        Ok(self.interpolate(&self.etemp, lat, lon, sublayer))
    }

    fn check_sublayer(&self, sublayer: usize) -> Result<()> {
        if sublayer >= self.spec.nlayers {
            return Err(Error::Validation(format!(
                "the layer value must be in range [0, {}], got {}",
                self.spec.nlayers - 1,
                sublayer
            )));
        }
        Ok(())
    }

    fn interpolate(&self, field: &DMatrix<f64>, lat: f64, lon: f64, sublayer: usize) -> f64 {
        self.grid.interpolate(lon, lat, |row| field[(row, sublayer)])
    }

    /// Electron density where the ray (`el`, `az`) crosses `sublayer`.
    /// The index is not checked.
    pub(crate) fn density_along(&self, el: f64, az: f64, sublayer: usize) -> f64 {
        self.along_ray(&self.edens, el, az, sublayer)
    }

    /// Value of `field` where the ray (`el`, `az`) crosses sub-layer `sublayer`
    fn along_ray(&self, field: &DMatrix<f64>, el: f64, az: f64, sublayer: usize) -> f64 {
        let (lat, lon) = sky_to_geodetic(el, az, self.heights[sublayer], &self.position);
        self.interpolate(field, lat, lon, sublayer)
    }

    /// Mean over every sub-layer; [`UNSEEN`] if any sub-layer is outside the grid.
    fn along_ray_mean(&self, field: &DMatrix<f64>, el: f64, az: f64) -> f64 {
        let mut total = 0.0;
        for sublayer in 0..self.spec.nlayers {
            let value = self.along_ray(field, el, az, sublayer);
            if value == UNSEEN {
                return UNSEEN;
            }
            total += value;
        }
        total / self.spec.nlayers as f64
    }

    fn evaluate_field(
        &self,
        field: &DMatrix<f64>,
        el: &SkyArray,
        az: &SkyArray,
        layer: Option<usize>,
    ) -> Result<SkyArray> {
        check_elaz_shape(el, az)?;
        match layer {
            None => sky::zip_map(el, az, |el, az| self.along_ray_mean(field, el, az)),
            Some(sublayer) => {
                self.check_sublayer(sublayer)?;
                sky::zip_map(el, az, |el, az| self.along_ray(field, el, az, sublayer))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluatorConfig;
    use crate::errors::ModelError;
    use crate::grid::Healpix;
    use crate::models::{CorrectionModel, IonosphereModel, ProfileBatch};
    use approx::assert_abs_diff_eq;
    use hifitime::Epoch;
    use std::sync::Arc;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc(2022, 9, 1, 10, 0, 0, 0)
    }

    /// Density grows with latitude and height
    struct GradientModel;

    impl IonosphereModel for GradientModel {
        fn profiles(
            &self,
            _epoch: Epoch,
            heights: &[f64],
            lats: &[f64],
            _lons: &[f64],
            _version: u32,
        ) -> std::result::Result<ProfileBatch, ModelError> {
            Ok(ProfileBatch {
                density: DMatrix::from_fn(lats.len(), heights.len(), |i, j| {
                    1e8 * (1.0 + lats[i] / 90.0) * heights[j]
                }),
                temperature: DMatrix::from_fn(lats.len(), heights.len(), |_, j| {
                    150.0 + heights[j]
                }),
            })
        }

        fn name(&self) -> &'static str {
            "gradient"
        }
    }

    struct FlatCorrection;

    impl CorrectionModel for FlatCorrection {
        fn density(
            &self,
            lats: &[f64],
            _lons: &[f64],
            heights: &[f64],
            _epoch: Epoch,
        ) -> std::result::Result<DMatrix<f64>, ModelError> {
            Ok(DMatrix::from_element(lats.len(), heights.len(), 42.0))
        }

        fn name(&self) -> &'static str {
            "flat"
        }
    }

    fn evaluator() -> ModelEvaluator {
        ModelEvaluator::new(
            Arc::new(GradientModel),
            EvaluatorConfig {
                progress: false,
                ..Default::default()
            },
        )
    }

    fn spec() -> LayerSpec {
        LayerSpec {
            nlayers: 5,
            nside: 32,
            ..LayerSpec::new(epoch(), 60.0, 90.0)
        }
    }

    fn layer() -> IonLayer {
        IonLayer::compute(ObserverPosition::new(40.0, 20.0, 0.0), spec(), &evaluator(), None)
            .unwrap()
    }

    #[test]
    fn new_layer_starts_empty() {
        let layer = IonLayer::new(ObserverPosition::new(40.0, 20.0, 0.0), spec()).unwrap();
        assert_eq!(layer.density().shape(), (layer.grid().len(), 5));
        assert!(layer.density().iter().all(|v| *v == 0.0));
        assert_eq!(layer.name(), "layer");
    }

    #[test]
    fn radius_is_derived_from_the_layer_top() {
        let layer = IonLayer::new(ObserverPosition::new(40.0, 20.0, 0.0), spec()).unwrap();
        assert_abs_diff_eq!(layer.radius(), disc_radius(0.0, 90.0, 5.0));
    }

    #[test]
    fn sampled_cell_round_trip() {
        let layer = layer();
        for (row, (_, lon, lat)) in layer.grid().iter().enumerate().step_by(17) {
            for sublayer in 0..5 {
                let value = layer.density_at(lat, lon, sublayer).unwrap();
                assert_abs_diff_eq!(
                    value,
                    layer.density()[(row, sublayer)],
                    epsilon = 1e-6 * value.abs()
                );
            }
        }
    }

    #[test]
    fn averaging_matches_sublayers() {
        let layer = layer();
        let el = SkyArray::from(35.0);
        let az = SkyArray::from(120.0);
        let mean = layer.ed(&el, &az, None).unwrap().as_scalar().unwrap();
        let manual: f64 = (0..5)
            .map(|k| layer.ed(&el, &az, Some(k)).unwrap().as_scalar().unwrap())
            .sum::<f64>()
            / 5.0;
        assert_abs_diff_eq!(mean, manual, epsilon = 1e-9 * manual.abs());
    }

    #[test]
    fn queries_are_idempotent() {
        let layer = layer();
        let (el, az) = elaz_mesh(6);
        let first = layer.et(&el, &az, None).unwrap();
        let second = layer.et(&el, &az, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.shape(), Some((6, 6)));
    }

    #[test]
    fn out_of_range_sublayer_is_rejected() {
        let layer = layer();
        let result = layer.ed(&45.0.into(), &0.0.into(), Some(5));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(layer.density_at(40.0, 20.0, 9).is_err());
    }

    #[test]
    fn zenith_temperature_follows_the_model() {
        let layer = layer();
        let t = layer.et(&90.0.into(), &0.0.into(), Some(4)).unwrap();
        assert_abs_diff_eq!(t.as_scalar().unwrap(), 240.0, epsilon = 1e-6);
    }

    #[test]
    fn correction_replaces_density_only() {
        let spec = LayerSpec {
            use_correction_model: true,
            ..spec()
        };
        let evaluator = evaluator().with_correction(Arc::new(FlatCorrection));
        let layer =
            IonLayer::compute(ObserverPosition::new(80.0, 0.0, 0.0), spec, &evaluator, None)
                .unwrap();
        assert!(layer.density().iter().all(|v| *v == 42.0));
        assert!(layer.temperature().iter().all(|v| *v > 150.0));
    }

    #[test]
    fn correction_floor_counts_boundary_cells() {
        let spec = LayerSpec {
            use_correction_model: true,
            ..spec()
        };
        let radius = disc_radius(0.0, spec.htop, spec.radius_margin);

        // The disc itself clears the floor, its boundary cells do not
        let grazing = ObserverPosition::new(CORRECTION_MIN_LATITUDE + radius + 0.01, 0.0, 0.0);
        assert!(matches!(
            IonLayer::new(grazing, spec.clone()),
            Err(Error::Configuration(_))
        ));

        let pixrad = Healpix::new(spec.nside).max_pixrad().to_degrees();
        let clear = ObserverPosition::new(CORRECTION_MIN_LATITUDE + radius + pixrad + 0.1, 0.0, 0.0);
        let layer = IonLayer::new(clear, spec).unwrap();
        assert!(layer.grid().lats().iter().all(|lat| *lat >= CORRECTION_MIN_LATITUDE));
    }

    #[test]
    fn correction_without_model_is_a_configuration_error() {
        let spec = LayerSpec {
            use_correction_model: true,
            ..spec()
        };
        let mut layer = IonLayer::new(ObserverPosition::new(80.0, 0.0, 0.0), spec).unwrap();
        assert!(matches!(
            layer.calc(&evaluator(), None),
            Err(Error::Configuration(_))
        ));
    }
}
