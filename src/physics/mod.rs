//! Radio propagation through a weakly ionized layer.

pub mod collision;
pub mod plasma;
pub mod propagation;

pub use collision::CollisionModel;
pub use plasma::plasma_frequency;
pub use propagation::{layer_attenuation, tropospheric_refraction};
