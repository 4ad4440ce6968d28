use glam::DVec3;
use std::fmt;

use crate::plane::{Plane, Side};

/// Most points a clipped winding may hold. A split that would produce more
/// is abandoned and the input returned unclipped.
pub const MAX_WINDING_FIXED: usize = 24;
/// Most points any winding may hold, including those loaded from a portal file
pub const MAX_WINDING: usize = 64;

/// Result of clipping a winding against a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    /// Nothing was cut off, the input stands as-is
    Unchanged,
    /// The front part was written to the output winding
    Clipped,
    /// Nothing is left on the front side
    Eliminated,
    /// The output would have exceeded [`MAX_WINDING_FIXED`], the input stands
    /// as-is and the caller should count the bail-out
    Overflow,
}

/// A convex polygon with inline storage and a bounding sphere for fast
/// plane rejection.
///
/// The sphere is computed when the winding is built from points and copied
/// (not recomputed) into clipped results, so it never shrinks.
#[derive(Clone)]
pub struct Winding {
    points: [DVec3; MAX_WINDING],
    len: usize,
    pub origin: DVec3,
    pub radius: f64,
}

impl Default for Winding {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Winding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Winding")
            .field("points", &self.points())
            .field("origin", &self.origin)
            .field("radius", &self.radius)
            .finish()
    }
}

impl Winding {
    pub const fn new() -> Self {
        Self {
            points: [DVec3::ZERO; MAX_WINDING],
            len: 0,
            origin: DVec3::ZERO,
            radius: 0.0,
        }
    }

    /// Build from a point list and set the bounding sphere. Returns `None` if
    /// there are more than [`MAX_WINDING`] points.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        if points.len() > MAX_WINDING {
            return None;
        }
        let mut w = Self::new();
        w.points[..points.len()].copy_from_slice(points);
        w.len = points.len();
        w.set_sphere();
        Some(w)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn points(&self) -> &[DVec3] {
        &self.points[..self.len]
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Caller must check capacity
    #[inline]
    fn push(&mut self, p: DVec3) {
        self.points[self.len] = p;
        self.len += 1;
    }

    /// Recompute the bounding sphere from the current points
    pub fn set_sphere(&mut self) {
        if self.len == 0 {
            self.origin = DVec3::ZERO;
            self.radius = 0.0;
            return;
        }
        let sum = self.points().iter().fold(DVec3::ZERO, |acc, p| acc + *p);
        self.origin = sum / self.len as f64;
        self.radius = self
            .points()
            .iter()
            .map(|p| p.distance(self.origin))
            .fold(0.0, f64::max);
    }

    /// Plane of the polygon, from its first three points
    pub fn plane(&self) -> Plane {
        if self.len < 3 {
            return Plane::default();
        }
        Plane::from_points(self.points[0], self.points[1], self.points[2])
    }

    /// Same polygon with the vertex order reversed, so its plane faces the
    /// other way
    pub fn flipped(&self) -> Self {
        let mut w = self.clone();
        w.points[..self.len].reverse();
        w
    }

    /// True if no point is in front of `plane` (beyond epsilon)
    pub fn is_on_or_behind(&self, plane: &Plane) -> bool {
        if plane.distance_to(self.origin) < -self.radius {
            return true;
        }
        self.points()
            .iter()
            .all(|p| plane.classify_point(*p) != Side::Front)
    }

    /// True if no point is behind `plane` (beyond epsilon)
    pub fn is_on_or_in_front(&self, plane: &Plane) -> bool {
        if plane.distance_to(self.origin) > self.radius {
            return true;
        }
        self.points()
            .iter()
            .all(|p| plane.classify_point(*p) != Side::Back)
    }

    /// Smallest absolute distance of any point to `plane`
    pub fn distance_from_plane(&self, plane: &Plane) -> f64 {
        self.points()
            .iter()
            .map(|p| plane.distance_to(*p).abs())
            .fold(f64::MAX, f64::min)
    }

    /// Clip against `split`, keeping the part on the positive side.
    ///
    /// On [`ClipOutcome::Clipped`] the result is in `out` (which inherits this
    /// winding's sphere). For every other outcome `out` holds nothing useful.
    /// If every point lies on the plane the winding is returned unchanged, so
    /// two coplanar portals closer than the epsilon never erase each other.
    pub fn clip_into(&self, split: &Plane, out: &mut Winding) -> ClipOutcome {
        let dot = split.distance_to(self.origin);
        if dot < -self.radius {
            return ClipOutcome::Eliminated;
        } else if dot > self.radius {
            return ClipOutcome::Unchanged;
        }

        let n = self.len;
        let mut dists = [0.0f64; MAX_WINDING + 1];
        let mut sides = [Side::On; MAX_WINDING + 1];
        let mut counts = [0usize; 3];

        for (i, p) in self.points().iter().enumerate() {
            let d = split.distance_to(*p);
            dists[i] = d;
            sides[i] = Side::from_distance(d);
            counts[sides[i] as usize] += 1;
        }
        dists[n] = dists[0];
        sides[n] = sides[0];

        if counts[Side::On as usize] == n {
            return ClipOutcome::Unchanged;
        }
        if counts[Side::Front as usize] == 0 {
            return ClipOutcome::Eliminated;
        }
        if counts[Side::Back as usize] == 0 {
            return ClipOutcome::Unchanged;
        }

        out.clear();
        out.origin = self.origin;
        out.radius = self.radius;

        for i in 0..n {
            let p1 = self.points[i];

            if sides[i] == Side::On {
                if out.len == MAX_WINDING_FIXED {
                    return ClipOutcome::Overflow;
                }
                out.push(p1);
                continue;
            }

            if sides[i] == Side::Front {
                if out.len == MAX_WINDING_FIXED {
                    return ClipOutcome::Overflow;
                }
                out.push(p1);
            }

            if sides[i + 1] == Side::On || sides[i + 1] == sides[i] {
                continue;
            }

            let p2 = self.points[(i + 1) % n];
            let fraction = dists[i] / (dists[i] - dists[i + 1]);
            let mut mid = DVec3::ZERO;
            for j in 0..3 {
                // exact on axial planes, avoids creeping round-off
                mid[j] = if split.normal[j] == 1.0 {
                    split.dist
                } else if split.normal[j] == -1.0 {
                    -split.dist
                } else {
                    p1[j] + fraction * (p2[j] - p1[j])
                };
            }

            if out.len == MAX_WINDING_FIXED {
                return ClipOutcome::Overflow;
            }
            out.push(mid);
        }

        ClipOutcome::Clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64, half: f64) -> Winding {
        Winding::from_points(&[
            DVec3::new(-half, -half, z),
            DVec3::new(-half, half, z),
            DVec3::new(half, half, z),
            DVec3::new(half, -half, z),
        ])
        .unwrap()
    }

    /// Regular polygon in the z=0 plane
    fn ngon(n: usize, r: f64) -> Winding {
        let pts: Vec<DVec3> = (0..n)
            .map(|i| {
                let a = -(i as f64) * std::f64::consts::TAU / n as f64;
                DVec3::new(r * a.cos(), r * a.sin(), 0.0)
            })
            .collect();
        Winding::from_points(&pts).unwrap()
    }

    #[test]
    fn sphere_is_set_on_build() {
        let w = square(4.0, 8.0);
        assert_eq!(w.origin, DVec3::new(0.0, 0.0, 4.0));
        assert!((w.radius - (128.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn flipped_plane_faces_away() {
        let w = square(0.0, 8.0);
        let p = w.plane();
        let f = w.flipped().plane();
        assert!((p.normal + f.normal).length() < 1e-9);
        assert_eq!(p.normal, DVec3::Z);
    }

    #[test]
    fn fast_path_keeps_and_rejects() {
        let w = square(0.0, 8.0);
        let mut out = Winding::new();
        let far_front = Plane::from_point_normal(DVec3::new(100.0, 0.0, 0.0), DVec3::NEG_X);
        assert_eq!(w.clip_into(&far_front, &mut out), ClipOutcome::Unchanged);
        let far_back = Plane::from_point_normal(DVec3::new(100.0, 0.0, 0.0), DVec3::X);
        assert_eq!(w.clip_into(&far_back, &mut out), ClipOutcome::Eliminated);
    }

    #[test]
    fn coplanar_is_never_split() {
        let w = square(0.0, 8.0);
        let mut out = Winding::new();
        // within epsilon of every point, either orientation
        let near = Plane::from_point_normal(DVec3::new(0.0, 0.0, 0.05), DVec3::Z);
        assert_eq!(w.clip_into(&near, &mut out), ClipOutcome::Unchanged);
        assert_eq!(w.clip_into(&-near, &mut out), ClipOutcome::Unchanged);
    }

    #[test]
    fn split_keeps_front_half() {
        let w = square(0.0, 8.0);
        let mut out = Winding::new();
        let split = Plane::from_point_normal(DVec3::ZERO, DVec3::X);
        assert_eq!(w.clip_into(&split, &mut out), ClipOutcome::Clipped);
        assert_eq!(out.len(), 4);
        for p in out.points() {
            assert!(p.x >= 0.0);
        }
        // axial plane reproduces its coordinate exactly
        assert_eq!(out.points().iter().filter(|p| p.x == 0.0).count(), 2);
        assert_eq!(out.origin, w.origin);
    }

    #[test]
    fn all_behind_is_eliminated() {
        let w = square(0.0, 8.0);
        let mut out = Winding::new();
        let split = Plane::from_point_normal(DVec3::new(7.95, 0.0, 0.0), DVec3::X);
        // points at x=8 are "on", the rest behind: nothing strictly in front
        assert_eq!(w.clip_into(&split, &mut out), ClipOutcome::Eliminated);
    }

    #[test]
    fn overflow_returns_input() {
        // a 24-gon cut by a plane that keeps all but one vertex plus two new
        // points needs 25 slots
        let w = ngon(MAX_WINDING_FIXED, 64.0);
        let mut out = Winding::new();
        let split = Plane::from_point_normal(DVec3::new(63.0, 0.0, 0.0), DVec3::NEG_X);
        assert_eq!(w.clip_into(&split, &mut out), ClipOutcome::Overflow);
    }

    #[test]
    fn too_many_points_is_rejected() {
        let pts = vec![DVec3::ZERO; MAX_WINDING + 1];
        assert!(Winding::from_points(&pts).is_none());
    }
}
