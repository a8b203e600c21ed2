//! Interfaces of the external ionosphere models.
//!
//! Models are evaluated from worker threads, so implementations must be
//! `Send + Sync`. Matrices are indexed `[point][height]`; a model may return
//! NaN for points outside its validity range, which the evaluator treats as
//! missing data.

pub mod chapman;

use crate::errors::ModelError;
use hifitime::Epoch;
use nalgebra::DMatrix;

pub use chapman::ChapmanModel;

/// Electron density (m⁻³) and temperature (K) for a batch of points
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileBatch {
    pub density: DMatrix<f64>,
    pub temperature: DMatrix<f64>,
}

/// Reference ionosphere model
pub trait IonosphereModel: Send + Sync {
    /// Profiles at every height of `heights` (km) above each
    /// (`lats[i]`, `lons[i]`) point (deg).
    fn profiles(
        &self,
        epoch: Epoch,
        heights: &[f64],
        lats: &[f64],
        lons: &[f64],
        version: u32,
    ) -> Result<ProfileBatch, ModelError>;

    fn name(&self) -> &'static str;
}

/// Regional model overriding the reference electron density.
/// Does not provide temperature.
pub trait CorrectionModel: Send + Sync {
    fn density(
        &self,
        lats: &[f64],
        lons: &[f64],
        heights: &[f64],
        epoch: Epoch,
    ) -> Result<DMatrix<f64>, ModelError>;

    fn name(&self) -> &'static str;
}
