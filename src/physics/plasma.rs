use crate::constants::*;

/// Electron plasma frequency (Hz) of a plasma with `density` electrons per m³.
///
/// Negative densities have no physical plasma frequency and give NaN.
pub fn plasma_frequency(density: f64) -> f64 {
    (density * ELEMENTARY_CHARGE.powi(2) / (VACUUM_PERMITTIVITY * ELECTRON_MASS)).sqrt() / (2.0 * PI)
}
