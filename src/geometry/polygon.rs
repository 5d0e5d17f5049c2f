//! Polygons with holes: site fences and their containment queries.

use crate::core::Point2D;

use super::ring::Ring;
use super::segment::{point_segment_distance, project_param, segment_intersection};

/// Exterior ring plus zero or more hole rings.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self { exterior, holes }
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// Exterior first, then holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// All vertices of all rings.
    pub fn vertices(&self) -> Vec<Point2D> {
        self.rings()
            .flat_map(|r| r.points().iter().copied())
            .collect()
    }

    /// Exterior area minus hole areas.
    pub fn area(&self) -> f64 {
        self.exterior.area() - self.holes.iter().map(Ring::area).sum::<f64>()
    }

    /// Interior containment (inside the exterior, outside every hole).
    pub fn contains(&self, p: Point2D) -> bool {
        self.exterior.contains(p) && !self.holes.iter().any(|h| h.contains(p))
    }

    /// Distance to the nearest edge of any ring.
    pub fn distance_to_boundary(&self, p: Point2D) -> f64 {
        self.rings()
            .map(|r| r.distance_to_boundary(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Inside, or within `tolerance` of the boundary.
    pub fn covers(&self, p: Point2D, tolerance: f64) -> bool {
        self.contains(p) || self.distance_to_boundary(p) <= tolerance
    }

    /// Inside and at least `buffer` away from the boundary.
    ///
    /// Equivalent to containment in the polygon eroded by `buffer`.
    pub fn contains_with_clearance(&self, p: Point2D, buffer: f64) -> bool {
        self.contains(p) && self.distance_to_boundary(p) >= buffer
    }

    /// Whether the whole segment `a`-`b` lies inside the polygon or within
    /// `tolerance` of its boundary.
    ///
    /// The segment is cut at every crossing with a ring edge and at every
    /// vertex lying on it; each piece is then entirely in or entirely out,
    /// so testing its midpoint decides it.
    pub fn contains_segment(&self, a: Point2D, b: Point2D, tolerance: f64) -> bool {
        if !self.covers(a, tolerance) || !self.covers(b, tolerance) {
            return false;
        }
        if a.distance(&b) <= f64::EPSILON {
            return true;
        }

        let mut cuts = vec![0.0, 1.0];
        for ring in self.rings() {
            for (p, q) in ring.edges() {
                if let Some((t, _)) = segment_intersection(a, b, p, q) {
                    cuts.push(t);
                }
                if point_segment_distance(p, a, b) <= tolerance {
                    cuts.push(project_param(p, a, b).clamp(0.0, 1.0));
                }
            }
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|x, y| (*x - *y).abs() <= 1e-12);

        cuts.windows(2).all(|w| {
            let mid = a.lerp(&b, (w[0] + w[1]) / 2.0);
            self.covers(mid, tolerance)
        })
    }
}
