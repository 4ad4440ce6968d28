use glam::DVec3;
use std::ops::Neg;

/// Tolerance used when deciding which side of a plane a point is on
pub const VIS_ON_EPSILON: f64 = 0.1;

/// 3D plane equation, `normal . p == dist` for points on the plane
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub dist: f64,
}

impl Plane {
    #[inline]
    pub const fn new(normal: DVec3, dist: f64) -> Self {
        Self { normal, dist }
    }

    /// Plane through three points. The normal follows the clockwise winding
    /// convention used by the portal files: `(p3 - p1) x (p2 - p1)`.
    pub fn from_points(p1: DVec3, p2: DVec3, p3: DVec3) -> Self {
        let v1 = p2 - p1;
        let v2 = p3 - p1;
        let normal = v2.cross(v1).normalize_or_zero();
        Self {
            normal,
            dist: normal.dot(p1),
        }
    }

    /// Create plane from point and normal
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        Self {
            normal,
            dist: normal.dot(point),
        }
    }

    /// Signed distance, positive on the side the normal points to
    #[inline]
    pub fn distance_to(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.dist
    }

    /// Classify point relative to plane using [`VIS_ON_EPSILON`]
    #[inline]
    pub fn classify_point(&self, point: DVec3) -> Side {
        Side::from_distance(self.distance_to(point))
    }
}

impl Neg for Plane {
    type Output = Plane;

    fn neg(self) -> Self::Output {
        Plane {
            normal: -self.normal,
            dist: -self.dist,
        }
    }
}

/// Point classification relative to plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front = 0,
    Back = 1,
    On = 2,
}

impl Side {
    #[inline]
    pub fn from_distance(dist: f64) -> Self {
        if dist > VIS_ON_EPSILON {
            Side::Front
        } else if dist < -VIS_ON_EPSILON {
            Side::Back
        } else {
            Side::On
        }
    }
}
