use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec2;
use tracing::debug;

use crate::error::{ChoroplethError, Result};
use crate::geo::{wrap_lambda, GeoPoint};

const EPSILON: f64 = 1e-6;

/// Region the map is fitted to: a central meridian plus four edges, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub center: f64,
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(center: f64, north: f64, south: f64, west: f64, east: f64) -> Self {
        Self { center, north, south, west, east }
    }

    /// Rio de Janeiro municipality
    pub fn rio() -> Self {
        Self::new(-43.4722, -22.746020, -23.082893, -43.795432, -43.096863)
    }

    pub fn validate(&self) -> Result<()> {
        let values = [self.center, self.north, self.south, self.west, self.east];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ChoroplethError::InvalidRegion(format!(
                "non-finite bounding box {:?}",
                self
            )));
        }
        for lat in [self.north, self.south] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ChoroplethError::InvalidRegion(format!(
                    "latitude {} out of range",
                    lat
                )));
            }
        }
        for lon in [self.center, self.west, self.east] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ChoroplethError::InvalidRegion(format!(
                    "longitude {} out of range",
                    lon
                )));
            }
        }
        if self.south >= self.north {
            return Err(ChoroplethError::InvalidRegion(format!(
                "south {} must be below north {}",
                self.south, self.north
            )));
        }
        if self.west >= self.east {
            return Err(ChoroplethError::InvalidRegion(format!(
                "west {} must be left of east {}",
                self.west, self.east
            )));
        }
        Ok(())
    }

    /// Closed ring (W,N)-(E,N)-(E,S)-(W,S)-(W,N)
    pub fn ring(&self) -> [GeoPoint; 5] {
        [
            GeoPoint::new(self.west, self.north),
            GeoPoint::new(self.east, self.north),
            GeoPoint::new(self.east, self.south),
            GeoPoint::new(self.west, self.south),
            GeoPoint::new(self.west, self.north),
        ]
    }
}

/// Output pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0 {
            return Err(ChoroplethError::InvalidRegion(format!(
                "canvas must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[inline(always)]
fn tany(phi: f64) -> f64 {
    ((FRAC_PI_2 + phi) / 2.0).tan()
}

/// Unscaled projection onto the plane, y pointing north
#[derive(Debug, Clone, Copy, PartialEq)]
enum RawProjection {
    /// Secant (or tangent) cone with cone constant `n` and radius factor `f`
    Conic { n: f64, f: f64 },
    /// Degenerate cone: parallels symmetric about the equator
    Mercator,
}

impl RawProjection {
    fn conic_conformal(phi0: f64, phi1: f64) -> Self {
        let cy0 = phi0.cos();
        let n = if phi0 == phi1 {
            phi0.sin()
        } else {
            (cy0 / phi1.cos()).ln() / (tany(phi1) / tany(phi0)).ln()
        };
        if n == 0.0 || !n.is_finite() {
            return RawProjection::Mercator;
        }
        let f = cy0 * tany(phi0).powf(n) / n;
        RawProjection::Conic { n, f }
    }

    fn forward(&self, lambda: f64, phi: f64) -> DVec2 {
        match *self {
            RawProjection::Conic { n, f } => {
                // Keep away from the pole the cone opens towards
                let phi = if f > 0.0 {
                    phi.max(-FRAC_PI_2 + EPSILON)
                } else {
                    phi.min(FRAC_PI_2 - EPSILON)
                };
                let r = f / tany(phi).powf(n);
                DVec2::new(r * (n * lambda).sin(), f - r * (n * lambda).cos())
            }
            RawProjection::Mercator => DVec2::new(lambda, tany(phi).ln()),
        }
    }

    fn inverse(&self, p: DVec2) -> (f64, f64) {
        match *self {
            RawProjection::Conic { n, f } => {
                let fy = f - p.y;
                let r = n.signum() * (p.x * p.x + fy * fy).sqrt();
                let mut l = p.x.atan2(fy.abs()) * fy.signum();
                if fy * n < 0.0 {
                    l -= PI * p.x.signum() * fy.signum();
                }
                (l / n, 2.0 * (f / r).powf(1.0 / n).atan() - FRAC_PI_2)
            }
            RawProjection::Mercator => (p.x, 2.0 * p.y.exp().atan() - FRAC_PI_2),
        }
    }
}

/// Conic conformal projection fitted to a canvas.
///
/// Immutable once built; `project` is a pure function and can be called
/// from any number of threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    raw: RawProjection,
    /// Longitude rotation in radians, added before projecting
    rotate: f64,
    /// Pixels per raw projection unit
    k: f64,
    /// Pixel position of the raw origin
    translate: DVec2,
}

impl Projection {
    /// Build a conic conformal projection for `region` that fills `canvas`.
    ///
    /// Standard parallels are the region's south and north edges, the central
    /// meridian is rotated to `region.center`, and the region's corner ring is
    /// scaled and centred the way `fitSize` does: the limiting dimension
    /// touches both canvas edges, the other one is centred.
    pub fn fit(region: &BoundingBox, canvas: Canvas) -> Result<Self> {
        region.validate()?;
        canvas.validate()?;

        let raw = RawProjection::conic_conformal(region.south.to_radians(), region.north.to_radians());
        let rotate = (-region.center).to_radians();

        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        for corner in region.ring() {
            let p = raw.forward(wrap_lambda(corner.lon.to_radians() + rotate), corner.lat.to_radians());
            // Screen space: y grows downwards
            let p = DVec2::new(p.x, -p.y);
            min = min.min(p);
            max = max.max(p);
        }

        let size = max - min;
        if !(size.x > 0.0 && size.y > 0.0) || !size.is_finite() {
            return Err(ChoroplethError::InvalidRegion(format!(
                "region projects to a degenerate box {:?}",
                size
            )));
        }

        let k = (canvas.width / size.x).min(canvas.height / size.y);
        let translate = DVec2::new(
            (canvas.width - k * (min.x + max.x)) / 2.0,
            (canvas.height - k * (min.y + max.y)) / 2.0,
        );

        debug!(?raw, k, tx = translate.x, ty = translate.y, "fitted conic conformal projection");

        Ok(Self { raw, rotate, k, translate })
    }

    /// Project a geographic coordinate to pixel coordinates
    pub fn project(&self, p: GeoPoint) -> DVec2 {
        let lambda = wrap_lambda(p.lon.to_radians() + self.rotate);
        let raw = self.raw.forward(lambda, p.lat.to_radians());
        DVec2::new(self.translate.x + self.k * raw.x, self.translate.y - self.k * raw.y)
    }

    /// Unproject pixel coordinates back to a geographic coordinate
    pub fn invert(&self, px: DVec2) -> GeoPoint {
        let raw = DVec2::new((px.x - self.translate.x) / self.k, (self.translate.y - px.y) / self.k);
        let (lambda, phi) = self.raw.inverse(raw);
        GeoPoint::new(wrap_lambda(lambda - self.rotate).to_degrees(), phi.to_degrees())
    }

    /// Pixels per raw projection unit
    pub fn scale(&self) -> f64 {
        self.k
    }
}
