use crate::config::ObserverPosition;
use crate::constants::*;
use nalgebra as na;

/// Reference ellipsoid. A zero flattening gives a perfect sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semimajor_axis: f64, // m
    pub flattening: f64,
}

impl Ellipsoid {
    pub fn sphere(radius: f64) -> Self {
        Ellipsoid {
            semimajor_axis: radius,
            flattening: 0.0,
        }
    }

    /// Sphere of Earth's mean radius, used for all ray tracing
    pub fn earth_sphere() -> Self {
        Self::sphere(EARTH_RADIUS)
    }

    fn eccentricity_squared(&self) -> f64 {
        2.0 * self.flattening - self.flattening * self.flattening
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude: f64,  // deg
    pub longitude: f64, // deg
    pub height: f64,    // m
}

impl From<&ObserverPosition> for Geodetic {
    fn from(position: &ObserverPosition) -> Self {
        Geodetic {
            latitude: position.latitude,
            longitude: position.longitude,
            height: position.elevation,
        }
    }
}

/// Convert geodetic coordinates to Earth-centred Cartesian coordinates
pub fn geodetic_to_ecef(point: &Geodetic, ellipsoid: &Ellipsoid) -> na::Vector3<f64> {
    let lat = point.latitude.to_radians();
    let lon = point.longitude.to_radians();
    let e2 = ellipsoid.eccentricity_squared();
    let sin_lat = lat.sin();
    let n = ellipsoid.semimajor_axis / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    na::Vector3::new(
        (n + point.height) * lat.cos() * lon.cos(),
        (n + point.height) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + point.height) * sin_lat,
    )
}

/// Convert Earth-centred Cartesian coordinates to geodetic coordinates
pub fn ecef_to_geodetic(pos: &na::Vector3<f64>, ellipsoid: &Ellipsoid) -> Geodetic {
    let x = pos[0];
    let y = pos[1];
    let z = pos[2];

    let longitude = y.atan2(x);

    let a = ellipsoid.semimajor_axis;
    let f = ellipsoid.flattening;
    let b = a * (1.0 - f);
    let e2 = ellipsoid.eccentricity_squared();

    let p = (x * x + y * y).sqrt();

    // On the polar axis
    if p < 1e-10 {
        let latitude: f64 = if z < 0.0 { -PI / 2.0 } else { PI / 2.0 };
        return Geodetic {
            latitude: latitude.to_degrees(),
            longitude: 0.0,
            height: z.abs() - b,
        };
    }

    let mut latitude = z.atan2(p * (1.0 - e2));

    // Usually converges in 2-3 iterations, immediately on a sphere
    for _ in 0..5 {
        let sin_lat = latitude.sin();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let h = p / latitude.cos() - n;

        let prev_lat = latitude;
        latitude = (z / p).atan2(1.0 - e2 * n / (n + h));

        if (latitude - prev_lat).abs() < 1e-12 {
            break;
        }
    }

    let sin_lat = latitude.sin();
    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let height = p / latitude.cos() - n;

    Geodetic {
        latitude: latitude.to_degrees(),
        longitude: longitude.to_degrees(),
        height,
    }
}

/// Rotation taking local East-North-Up vectors at (lat, lon) to ECEF
pub fn enu_to_ecef_rotation(latitude: f64, longitude: f64) -> na::Matrix3<f64> {
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();

    na::Matrix3::new(
        -sin_lon,
        -sin_lat * cos_lon,
        cos_lat * cos_lon,
        cos_lon,
        -sin_lat * sin_lon,
        cos_lat * sin_lon,
        0.0,
        cos_lat,
        sin_lat,
    )
}

/// Geodetic position of the end of a line of sight.
///
/// `azimuth` and `elevation` in degrees, `range` in meters along the ray.
pub fn aer_to_geodetic(
    azimuth: f64,
    elevation: f64,
    range: f64,
    observer: &Geodetic,
    ellipsoid: &Ellipsoid,
) -> Geodetic {
    let (sin_el, cos_el) = elevation.to_radians().sin_cos();
    let (sin_az, cos_az) = azimuth.to_radians().sin_cos();
    let enu = na::Vector3::new(
        range * cos_el * sin_az,
        range * cos_el * cos_az,
        range * sin_el,
    );

    let origin = geodetic_to_ecef(observer, ellipsoid);
    let target = origin + enu_to_ecef_rotation(observer.latitude, observer.longitude) * enu;
    ecef_to_geodetic(&target, ellipsoid)
}

/// Distance along a ray of zenith angle `zenith` (rad) from an observer at
/// `observer_height` to the spherical shell at `height` (both in m).
pub fn slant_range(zenith: f64, height: f64, observer_height: f64, radius: f64) -> f64 {
    let r_obs = radius + observer_height;
    let r = radius + height;
    let sin_z = zenith.sin();
    (r * r - r_obs * r_obs * sin_z * sin_z).sqrt() - r_obs * zenith.cos()
}

/// Latitude and longitude (deg) where the ray at (`el`, `az`) crosses `height_km`.
pub fn sky_to_geodetic(el: f64, az: f64, height_km: f64, position: &ObserverPosition) -> (f64, f64) {
    let observer = Geodetic::from(position);
    let range = slant_range(
        (90.0 - el).to_radians(),
        height_km * 1e3,
        position.elevation,
        EARTH_RADIUS,
    );
    let point = aer_to_geodetic(az, el, range, &observer, &Ellipsoid::earth_sphere());
    (point.latitude, point.longitude)
}

/// Angle (deg) at the Earth centre between an observer at `height_km` and its horizon.
pub fn horizon_angle(height_km: f64) -> f64 {
    (EARTH_RADIUS / (EARTH_RADIUS + height_km * 1e3))
        .acos()
        .to_degrees()
}
