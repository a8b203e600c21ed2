pub mod evaluator;
pub mod layer;

pub use evaluator::EvaluatorConfig;
pub use layer::{LayerSpec, ObserverPosition};
