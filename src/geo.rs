use std::f64::consts::{PI, TAU};

/// Mean Earth radius in kilometres, used when no other sphere is configured
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when both coordinates are finite and inside their valid ranges
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self::new(lon, lat)
    }
}

/// Wrap a longitude in radians into [-PI, PI]
#[inline(always)]
pub fn wrap_lambda(lambda: f64) -> f64 {
    if lambda.abs() > PI {
        lambda - (lambda / TAU).round() * TAU
    } else {
        lambda
    }
}

/// Great-circle central angle between two points, in radians.
///
/// Uses the atan2 formulation, which stays well conditioned for both
/// coincident and antipodal points (identical inputs give exactly 0).
pub fn angular_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lambda = (b.lon - a.lon).to_radians();
    let (phi0, phi1) = (a.lat.to_radians(), b.lat.to_radians());

    let (sin_dl, cos_dl) = d_lambda.sin_cos();
    let (sin_p0, cos_p0) = phi0.sin_cos();
    let (sin_p1, cos_p1) = phi1.sin_cos();

    let x = cos_p1 * sin_dl;
    let y = cos_p0 * sin_p1 - sin_p0 * cos_p1 * cos_dl;
    let z = sin_p0 * sin_p1 + cos_p0 * cos_p1 * cos_dl;

    (x * x + y * y).sqrt().atan2(z)
}

/// Arc length on a sphere of the given radius
#[inline(always)]
pub fn to_linear_distance(angular: f64, sphere_radius_km: f64) -> f64 {
    angular * sphere_radius_km
}

/// Planar lon/lat extent of a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Bounds of a single point
    pub fn from_point(p: GeoPoint) -> Self {
        Self {
            west: p.lon,
            south: p.lat,
            east: p.lon,
            north: p.lat,
        }
    }

    /// Bounds of every finite point in the iterator, `None` if there are none
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for p in points {
            if !(p.lon.is_finite() && p.lat.is_finite()) {
                continue;
            }
            match bounds.as_mut() {
                Some(b) => b.extend(p),
                None => bounds = Some(Self::from_point(p)),
            }
        }
        bounds
    }

    pub fn extend(&mut self, p: GeoPoint) {
        self.west = self.west.min(p.lon);
        self.south = self.south.min(p.lat);
        self.east = self.east.max(p.lon);
        self.north = self.north.max(p.lat);
    }

    pub fn merge(&mut self, other: &GeoBounds) {
        self.extend(other.south_west());
        self.extend(other.north_east());
    }

    pub fn south_west(&self) -> GeoPoint {
        GeoPoint::new(self.west, self.south)
    }

    pub fn north_east(&self) -> GeoPoint {
        GeoPoint::new(self.east, self.north)
    }
}
