//! Ionospheric layers sampled around a ground observer and the attenuation
//! they cause on radio signals.

pub mod config;
pub mod constants;
pub mod coordinates;
pub mod dlayer;
pub mod errors;
pub mod evaluator;
pub mod grid;
pub mod layer;
pub mod models;
pub mod physics;

pub use config::{EvaluatorConfig, LayerSpec, ObserverPosition};
pub use dlayer::DLayer;
pub use errors::{Error, ModelError, Result};
pub use evaluator::ModelEvaluator;
pub use layer::{IonLayer, SkyArray};
pub use physics::CollisionModel;
