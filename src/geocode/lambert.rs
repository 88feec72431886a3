//! Ellipsoidal Lambert Conformal Conic projection (two standard parallels).
//!
//! New York's state-plane zones use this projection on the GRS80 ellipsoid.
//! The parameters are:
//! - Latitude of false origin (lat0) and central meridian (lon0)
//! - Standard parallels lat1 and lat2
//! - False easting / northing in metres
//! - A linear unit factor converting grid units to metres

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// GRS80 semi-major axis (metres).
pub const GRS80_A: f64 = 6_378_137.0;
/// GRS80 inverse flattening.
pub const GRS80_INV_F: f64 = 298.257_222_101;
/// One US survey foot in metres.
pub const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

const MAX_ITERATIONS: usize = 15;
const CONVERGENCE: f64 = 1e-12;

/// Lambert Conformal Conic 2SP projection on an ellipsoid.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// False easting (metres)
    pub false_easting: f64,
    /// False northing (metres)
    pub false_northing: f64,
    /// Metres per grid unit
    pub unit: f64,
    /// Semi-major axis (metres)
    pub a: f64,
    /// First eccentricity
    e: f64,
    /// Cone constant
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the latitude of false origin
    rho0: f64,
}

impl LambertConformal {
    /// Build a projection from degrees, metres and a grid unit factor.
    ///
    /// # Arguments
    /// * `lat0_deg` - Latitude of false origin
    /// * `lon0_deg` - Central meridian
    /// * `lat1_deg` - First standard parallel
    /// * `lat2_deg` - Second standard parallel
    /// * `false_easting` / `false_northing` - Offsets in metres
    /// * `unit` - Metres per grid unit (1.0 for metres)
    pub fn new(
        lat0_deg: f64,
        lon0_deg: f64,
        lat1_deg: f64,
        lat2_deg: f64,
        false_easting: f64,
        false_northing: f64,
        unit: f64,
    ) -> Self {
        let to_rad = PI / 180.0;
        let lat0 = lat0_deg * to_rad;
        let lat1 = lat1_deg * to_rad;
        let lat2 = lat2_deg * to_rad;

        let a = GRS80_A;
        let flattening = 1.0 / GRS80_INV_F;
        let e = (flattening * (2.0 - flattening)).sqrt();

        let m1 = m(lat1, e);
        let t1 = t(lat1, e);

        let n = if (lat1 - lat2).abs() < 1e-10 {
            // Tangent cone
            lat1.sin()
        } else {
            (m1.ln() - m(lat2, e).ln()) / (t1.ln() - t(lat2, e).ln())
        };

        let f = m1 / (n * t1.powf(n));
        let rho0 = a * f * t(lat0, e).powf(n);

        Self {
            lon0: lon0_deg * to_rad,
            false_easting,
            false_northing,
            unit,
            a,
            e,
            n,
            f,
            rho0,
        }
    }

    /// EPSG:2263, NAD83 / New York Long Island (ftUS).
    pub fn new_york_long_island() -> Self {
        Self::new(
            40.0 + 10.0 / 60.0, // lat0
            -74.0,              // lon0
            41.0 + 2.0 / 60.0,  // lat1
            40.0 + 40.0 / 60.0, // lat2
            300_000.0,          // false easting (m)
            0.0,                // false northing (m)
            US_SURVEY_FOOT,
        )
    }

    /// Project geographic degrees to grid coordinates (easting, northing).
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;
        let lon = lon_deg * to_rad;

        let rho = self.a * self.f * t(lat, self.e).powf(self.n);
        let theta = self.n * (lon - self.lon0);

        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + self.rho0 - rho * theta.cos();

        (x / self.unit, y / self.unit)
    }

    /// Invert grid coordinates (easting, northing) to (lat, lon) in degrees.
    ///
    /// Returns `None` when the input does not map to a finite position.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let to_deg = 180.0 / PI;

        let dx = x * self.unit - self.false_easting;
        let dy = self.rho0 - (y * self.unit - self.false_northing);

        let sign = self.n.signum();
        let rho = sign * (dx * dx + dy * dy).sqrt();
        let t_prime = (rho / (self.a * self.f)).powf(1.0 / self.n);
        let theta = (sign * dx).atan2(sign * dy);

        let lon = theta / self.n + self.lon0;

        let mut lat = FRAC_PI_2 - 2.0 * t_prime.atan();
        for _ in 0..MAX_ITERATIONS {
            let es = self.e * lat.sin();
            let next =
                FRAC_PI_2 - 2.0 * (t_prime * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            let done = (next - lat).abs() < CONVERGENCE;
            lat = next;
            if done {
                break;
            }
        }

        let (lat, lon) = (lat * to_deg, lon * to_deg);
        if lat.is_finite() && lon.is_finite() {
            Some((lat, lon))
        } else {
            None
        }
    }
}

fn m(lat: f64, e: f64) -> f64 {
    lat.cos() / (1.0 - e * e * lat.sin().powi(2)).sqrt()
}

fn t(lat: f64, e: f64) -> f64 {
    let es = e * lat.sin();
    (FRAC_PI_4 - lat / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}
