pub mod healpix;
pub mod sampler;

pub use healpix::Healpix;
pub use sampler::{disc_radius, SampleGrid};
