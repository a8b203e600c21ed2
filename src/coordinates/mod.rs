pub mod geodetic;

pub use geodetic::{
    aer_to_geodetic, ecef_to_geodetic, geodetic_to_ecef, horizon_angle, sky_to_geodetic,
    slant_range, Ellipsoid, Geodetic,
};
