//! RING ordered HEALPix pixelization of the sphere.
//!
//! Only what the sampled grid needs is provided: ring geometry, pixel
//! centres, disc queries and the four-pixel bilinear interpolation scheme.
//! Angles follow the HEALPix convention: `theta` is the colatitude and `phi`
//! the longitude, both in radians.

use crate::constants::PI;
use nalgebra as na;

const TWO_PI: f64 = 2.0 * PI;
const TWO_THIRDS: f64 = 2.0 / 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Healpix {
    nside: u64,
    npix: u64,
    ncap: u64,
    fact1: f64,
    fact2: f64,
}

/// Geometry of one iso-latitude ring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingInfo {
    pub start: u64,
    pub npix: u64,
    pub theta: f64,
    pub shifted: bool,
}

impl RingInfo {
    /// Longitude of the centre of the `j`-th pixel of the ring
    pub fn phi(&self, j: u64) -> f64 {
        let shift = if self.shifted { 0.5 } else { 0.0 };
        (j as f64 + shift) * TWO_PI / self.npix as f64
    }

    /// Two neighbouring pixels in longitude and the weight of the second one
    fn neighbours(&self, phi: f64) -> (u64, u64, f64) {
        let nr = self.npix as i64;
        let dphi = TWO_PI / self.npix as f64;
        let shift = if self.shifted { 0.5 } else { 0.0 };
        let tmp = phi / dphi - shift;
        let mut i1 = if tmp < 0.0 {
            tmp as i64 - 1
        } else {
            tmp as i64
        };
        let w1 = (phi - (i1 as f64 + shift) * dphi) / dphi;
        let mut i2 = i1 + 1;
        if i1 < 0 {
            i1 += nr;
        }
        if i2 >= nr {
            i2 -= nr;
        }
        (self.start + i1 as u64, self.start + i2 as u64, w1)
    }
}

impl Healpix {
    pub fn new(nside: u32) -> Self {
        let nside = u64::from(nside.max(1));
        let npix = 12 * nside * nside;
        let fact2 = 4.0 / npix as f64;
        Healpix {
            nside,
            npix,
            ncap: 2 * nside * (nside - 1),
            fact1: (2 * nside) as f64 * fact2,
            fact2,
        }
    }

    pub fn nside(&self) -> u32 {
        self.nside as u32
    }

    pub fn npix(&self) -> u64 {
        self.npix
    }

    pub fn nrings(&self) -> u64 {
        4 * self.nside - 1
    }

    /// Geometry of `ring`, counted from 1 at the north pole.
    pub fn ring_info(&self, ring: u64) -> RingInfo {
        let northring = if ring > 2 * self.nside {
            4 * self.nside - ring
        } else {
            ring
        };

        let mut info = if northring < self.nside {
            let tmp = (northring * northring) as f64 * self.fact2;
            let cos_theta = 1.0 - tmp;
            let sin_theta = (tmp * (2.0 - tmp)).sqrt();
            RingInfo {
                start: 2 * northring * (northring - 1),
                npix: 4 * northring,
                theta: sin_theta.atan2(cos_theta),
                shifted: true,
            }
        } else {
            let npix = 4 * self.nside;
            RingInfo {
                start: self.ncap + (northring - self.nside) * npix,
                npix,
                theta: ((2 * self.nside - northring) as f64 * self.fact1).acos(),
                shifted: (northring - self.nside) & 1 == 0,
            }
        };

        if northring != ring {
            info.theta = PI - info.theta;
            info.start = self.npix - info.start - info.npix;
        }
        info
    }

    fn ring_of(&self, pix: u64) -> u64 {
        if pix < self.ncap {
            (1 + isqrt(1 + 2 * pix)) >> 1
        } else if pix < self.npix - self.ncap {
            (pix - self.ncap) / (4 * self.nside) + self.nside
        } else {
            let ip = self.npix - pix;
            4 * self.nside - ((1 + isqrt(2 * ip - 1)) >> 1)
        }
    }

    /// Index of the ring directly north of (or at) `z = cos(theta)`; 0 above the first ring.
    fn ring_above(&self, z: f64) -> i64 {
        let nside = self.nside as f64;
        let az = z.abs();
        if az <= TWO_THIRDS {
            return (nside * (2.0 - 1.5 * z)) as i64;
        }
        let iring = (nside * (3.0 * (1.0 - az)).sqrt()) as i64;
        if z > 0.0 {
            iring
        } else {
            4 * self.nside as i64 - iring - 1
        }
    }

    /// Colatitude and longitude (rad) of the centre of `pix`
    pub fn pix2ang(&self, pix: u64) -> (f64, f64) {
        let info = self.ring_info(self.ring_of(pix));
        (info.theta, info.phi(pix - info.start))
    }

    /// Longitude and latitude (deg) of the centre of `pix`
    pub fn pix2lonlat(&self, pix: u64) -> (f64, f64) {
        let (theta, phi) = self.pix2ang(pix);
        (phi.to_degrees(), 90.0 - theta.to_degrees())
    }

    /// Maximum angular distance (rad) between a pixel centre and its corners
    pub fn max_pixrad(&self) -> f64 {
        let va = vec_from_z_phi(TWO_THIRDS, PI / (4 * self.nside) as f64);
        let t1 = 1.0 - 1.0 / self.nside as f64;
        let vb = vec_from_z_phi(1.0 - t1 * t1 / 3.0, 0.0);
        angle_between(&va, &vb)
    }

    /// Pixels whose centre lies within `radius` (rad) of `center`, in
    /// ascending order. With `inclusive`, the radius is widened by the
    /// maximum pixel radius so every pixel overlapping the disc is kept.
    pub fn query_disc(&self, center: &na::Vector3<f64>, radius: f64, inclusive: bool) -> Vec<u64> {
        let center = center.normalize();
        let radius = if inclusive {
            radius + self.max_pixrad()
        } else {
            radius
        };
        if radius >= PI {
            return (0..self.npix).collect();
        }

        let cos_radius = radius.cos();
        let theta_c = center.z.clamp(-1.0, 1.0).acos();
        let (theta_min, theta_max) = (theta_c - radius - 1e-12, theta_c + radius + 1e-12);

        let mut pixels = Vec::new();
        for ring in 1..=self.nrings() {
            let info = self.ring_info(ring);
            if info.theta < theta_min || info.theta > theta_max {
                continue;
            }
            for j in 0..info.npix {
                let v = ang2vec(info.theta, info.phi(j));
                if v.dot(&center) >= cos_radius {
                    pixels.push(info.start + j);
                }
            }
        }
        pixels
    }

    /// Four pixels surrounding (`theta`, `phi`) and their bilinear weights.
    /// Weights sum to one.
    pub fn interpolation_weights(&self, theta: f64, phi: f64) -> [(u64, f64); 4] {
        let mut phi = phi.rem_euclid(TWO_PI);
        if phi >= TWO_PI {
            phi = 0.0;
        }
        let nl4 = 4 * self.nside as i64;
        let ir1 = self.ring_above(theta.cos());
        let ir2 = ir1 + 1;

        let mut pix = [0u64; 4];
        let mut wgt = [0.0f64; 4];
        let mut theta1 = 0.0;
        let mut theta2 = 0.0;

        if ir1 > 0 {
            let info = self.ring_info(ir1 as u64);
            theta1 = info.theta;
            let (p1, p2, w1) = info.neighbours(phi);
            pix[0] = p1;
            pix[1] = p2;
            wgt[0] = 1.0 - w1;
            wgt[1] = w1;
        }
        if ir2 < nl4 {
            let info = self.ring_info(ir2 as u64);
            theta2 = info.theta;
            let (p1, p2, w1) = info.neighbours(phi);
            pix[2] = p1;
            pix[3] = p2;
            wgt[2] = 1.0 - w1;
            wgt[3] = w1;
        }

        if ir1 == 0 {
            // Above the first ring: the polar cap pixels opposite in longitude close the gap
            let wtheta = theta / theta2;
            wgt[2] *= wtheta;
            wgt[3] *= wtheta;
            let fac = (1.0 - wtheta) * 0.25;
            wgt[0] = fac;
            wgt[1] = fac;
            wgt[2] += fac;
            wgt[3] += fac;
            pix[0] = (pix[2] + 2) & 3;
            pix[1] = (pix[3] + 2) & 3;
        } else if ir2 == nl4 {
            let wtheta = (theta - theta1) / (PI - theta1);
            wgt[0] *= 1.0 - wtheta;
            wgt[1] *= 1.0 - wtheta;
            let fac = wtheta * 0.25;
            wgt[0] += fac;
            wgt[1] += fac;
            wgt[2] = fac;
            wgt[3] = fac;
            pix[2] = ((pix[0] + 2) & 3) + self.npix - 4;
            pix[3] = ((pix[1] + 2) & 3) + self.npix - 4;
        } else {
            let wtheta = (theta - theta1) / (theta2 - theta1);
            wgt[0] *= 1.0 - wtheta;
            wgt[1] *= 1.0 - wtheta;
            wgt[2] *= wtheta;
            wgt[3] *= wtheta;
        }

        [
            (pix[0], wgt[0]),
            (pix[1], wgt[1]),
            (pix[2], wgt[2]),
            (pix[3], wgt[3]),
        ]
    }
}

/// Unit vector pointing at colatitude `theta` and longitude `phi`
pub fn ang2vec(theta: f64, phi: f64) -> na::Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    na::Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Unit vector pointing at (`lon`, `lat`) in degrees
pub fn lonlat2vec(lon: f64, lat: f64) -> na::Vector3<f64> {
    ang2vec((90.0 - lat).to_radians(), lon.to_radians())
}

fn vec_from_z_phi(z: f64, phi: f64) -> na::Vector3<f64> {
    let sin_theta = ((1.0 - z) * (1.0 + z)).sqrt();
    na::Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), z)
}

pub fn angle_between(a: &na::Vector3<f64>, b: &na::Vector3<f64>) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

fn isqrt(v: u64) -> u64 {
    let mut r = (v as f64).sqrt() as u64;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}
