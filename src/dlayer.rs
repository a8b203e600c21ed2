//! Absorption of radio waves in the D layer.

use crate::config::{LayerSpec, ObserverPosition};
use crate::errors::{Error, Result};
use crate::evaluator::ModelEvaluator;
use crate::layer::{check_elaz_shape, sky, IonLayer, SkyArray};
use crate::physics::{layer_attenuation, plasma_frequency, tropospheric_refraction, CollisionModel};
use hifitime::Epoch;
use log::debug;
use rayon::ThreadPool;

/// D layer of the ionosphere and the attenuation it causes.
///
/// Wraps an [`IonLayer`] built with [`LayerSpec::d_layer`] defaults unless a
/// spec is given explicitly.
#[derive(Debug, Clone)]
pub struct DLayer {
    layer: IonLayer,
}

impl DLayer {
    /// D layer (60-90 km, 10 sub-layers) above `position`, not yet evaluated
    pub fn new(position: ObserverPosition, epoch: Epoch) -> Result<Self> {
        Self::from_spec(position, LayerSpec::d_layer(epoch))
    }

    pub fn from_spec(position: ObserverPosition, spec: LayerSpec) -> Result<Self> {
        Ok(DLayer {
            layer: IonLayer::new(position, spec)?,
        })
    }

    /// Build the D layer and evaluate the models over it.
    pub fn compute(
        position: ObserverPosition,
        spec: LayerSpec,
        evaluator: &ModelEvaluator,
        pool: Option<&ThreadPool>,
    ) -> Result<Self> {
        Ok(DLayer {
            layer: IonLayer::compute(position, spec, evaluator, pool)?,
        })
    }

    pub fn calc(&mut self, evaluator: &ModelEvaluator, pool: Option<&ThreadPool>) -> Result<()> {
        self.layer.calc(evaluator, pool)
    }

    pub fn layer(&self) -> &IonLayer {
        &self.layer
    }

    pub fn ed(&self, el: &SkyArray, az: &SkyArray, layer: Option<usize>) -> Result<SkyArray> {
        self.layer.ed(el, az, layer)
    }

    pub fn et(&self, el: &SkyArray, az: &SkyArray, layer: Option<usize>) -> Result<SkyArray> {
        self.layer.et(el, az, layer)
    }

    /// Attenuation factor at (`el`, `az`) deg for a frequency `freq` in MHz.
    ///
    /// Returns values between 0 (total attenuation) and 1 (no attenuation),
    /// with the shape of `el`. Directions leaving the sampled grid give NaN.
    /// With `troposphere` the ray is first bent by tropospheric refraction,
    /// which changes both its zenith angle and where it samples the density.
    pub fn atten(
        &self,
        el: &SkyArray,
        az: &SkyArray,
        freq: f64,
        collision: CollisionModel,
        troposphere: bool,
    ) -> Result<SkyArray> {
        check_elaz_shape(el, az)?;
        if !(freq.is_finite() && freq > 0.0) {
            return Err(Error::Validation(format!(
                "observation frequency must be positive, got {freq} MHz"
            )));
        }
        debug!(
            "attenuation at {} MHz, collisions: {}, troposphere: {}",
            freq, collision, troposphere
        );

        let spec = self.layer.spec();
        let height = spec.mid_height() * 1e3;
        let thickness = spec.thickness() * 1e3;
        let frequency = freq * 1e6;
        let collisions: Vec<f64> = self
            .layer
            .heights()
            .iter()
            .map(|h| collision.frequency(*h))
            .collect();

        sky::zip_map(el, az, |el, az| {
            let mut zenith = (90.0 - el).to_radians();
            let mut el = el;
            if troposphere {
                let bending = tropospheric_refraction(zenith);
                zenith += bending;
                el -= bending.to_degrees();
            }

            let total: f64 = collisions
                .iter()
                .enumerate()
                .map(|(i, nu_c)| {
                    let plasma = plasma_frequency(self.layer.density_along(el, az, i));
                    layer_attenuation(frequency, zenith, height, thickness, plasma, *nu_c)
                })
                .sum();
            total / collisions.len() as f64
        })
    }
}
