use crate::constants::*;

/// Tropospheric refraction (rad) of a ray with zenith angle `zenith` (rad).
///
/// Empirical fit of the bending at ground level; grows quickly near the horizon.
pub fn tropospheric_refraction(zenith: f64) -> f64 {
    1.0 / (16709.51 - 19066.21 * zenith + 5396.33 * zenith.powi(2))
}

/// Fraction of power left after crossing a thin absorbing layer.
///
/// * `frequency`: observation frequency (Hz)
/// * `zenith`: zenith angle of the ray (rad)
/// * `height`: mid height of the layer (m)
/// * `thickness`: layer thickness (m)
/// * `plasma`: plasma frequency (Hz)
/// * `collision`: electron collision frequency (Hz)
pub fn layer_attenuation(
    frequency: f64,
    zenith: f64,
    height: f64,
    thickness: f64,
    plasma: f64,
    collision: f64,
) -> f64 {
    let h_ratio = height / EARTH_RADIUS;
    // Path length through the layer on a curved Earth
    let path = thickness * (1.0 + h_ratio) * (zenith.cos().powi(2) + 2.0 * h_ratio).powf(-0.5);
    let absorption = 2.0 * PI * plasma.powi(2) * collision * path
        / (SPEED_OF_LIGHT * (collision.powi(2) + frequency.powi(2)));
    (-absorption).exp()
}
