// Earth model
pub const EARTH_RADIUS: f64 = 6378100.0; // Radius of the spherical Earth used for ray tracing (m)

// Physical constants
pub const ELEMENTARY_CHARGE: f64 = 1.602176634e-19; // C
pub const ELECTRON_MASS: f64 = 9.1093837015e-31; // kg
pub const VACUUM_PERMITTIVITY: f64 = 8.8541878128e-12; // F/m
pub const SPEED_OF_LIGHT: f64 = 2.99792458e8; // m/s

// Grid
pub const UNSEEN: f64 = -1.6375e30; // Sentinel for cells outside the sampled disc
pub const DEFAULT_RADIUS_MARGIN: f64 = 5.0; // deg
pub const CORRECTION_MIN_LATITUDE: f64 = 55.0; // deg, validity floor of the correction model

// Evaluation
pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_CORRECTION_BATCH_SIZE: usize = 100;
pub const DEFAULT_MODEL_VERSION: u32 = 20;

// Math
pub const PI: f64 = std::f64::consts::PI;
