use crate::constants::*;
use crate::errors::{Error, Result};
use hifitime::Epoch;
use serde::{Deserialize, Serialize};

/// Geographical position of an observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverPosition {
    pub latitude: f64,  // deg
    pub longitude: f64, // deg
    pub elevation: f64, // m above the sphere
}

impl ObserverPosition {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::Configuration(format!(
                "observer latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !self.elevation.is_finite() {
            return Err(Error::Configuration(
                "observer longitude and elevation must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of one height-banded ionospheric layer.
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub epoch: Epoch,
    pub hbot: f64, // km
    pub htop: f64, // km
    pub nlayers: usize,
    /// HEALPix resolution of the sampled grid
    pub nside: u32,
    /// Extra angular margin added to the horizon distance of the disc (deg)
    pub radius_margin: f64,
    /// Last two digits of the reference model version, e.g. 20 for IRI-2020
    pub model_version: u32,
    pub use_correction_model: bool,
    pub name: Option<String>,
}

impl LayerSpec {
    /// Generic layer: 100 sub-layers on an nside 64 grid.
    pub fn new(epoch: Epoch, hbot: f64, htop: f64) -> Self {
        Self {
            epoch,
            hbot,
            htop,
            nlayers: 100,
            nside: 64,
            radius_margin: DEFAULT_RADIUS_MARGIN,
            model_version: DEFAULT_MODEL_VERSION,
            use_correction_model: false,
            name: None,
        }
    }

    /// D layer between 60 and 90 km with 10 sub-layers on an nside 128 grid.
    pub fn d_layer(epoch: Epoch) -> Self {
        Self {
            nlayers: 10,
            nside: 128,
            name: Some("D layer".to_string()),
            ..Self::new(epoch, 60.0, 90.0)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.htop > self.hbot) {
            return Err(Error::Configuration(format!(
                "upper height {} km must be above lower height {} km",
                self.htop, self.hbot
            )));
        }
        if self.hbot < 0.0 {
            return Err(Error::Configuration(format!(
                "lower height {} km is below the ground",
                self.hbot
            )));
        }
        if self.nlayers < 2 {
            return Err(Error::Configuration(format!(
                "at least 2 sub-layers are required, got {}",
                self.nlayers
            )));
        }
        if self.nside == 0 {
            return Err(Error::Configuration(
                "grid resolution must be positive".to_string(),
            ));
        }
        if !(self.radius_margin >= 0.0) {
            return Err(Error::Configuration(format!(
                "disc margin {} deg must be non-negative",
                self.radius_margin
            )));
        }
        Ok(())
    }

    /// Sub-layer heights in km, `nlayers` values from `hbot` to `htop` inclusive.
    pub fn heights(&self) -> Vec<f64> {
        linspace(self.hbot, self.htop, self.nlayers)
    }

    /// Mid-layer height in km
    pub fn mid_height(&self) -> f64 {
        self.hbot + (self.htop - self.hbot) / 2.0
    }

    /// Layer thickness in km
    pub fn thickness(&self) -> f64 {
        self.htop - self.hbot
    }
}

/// Evenly spaced values; the last one is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        start + (stop - start) * (i as f64) / last
                    }
                })
                .collect()
        }
    }
}
