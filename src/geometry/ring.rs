//! Closed polygon rings.

use crate::core::Point2D;
use crate::error::{MargaError, Result};

use super::offset::offset_ring;
use super::segment::point_segment_distance;

/// Simple closed ring of at least three vertices.
///
/// The closing vertex is implicit: `points()` never repeats the first point.
/// Orientation is kept as given.
#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    points: Vec<Point2D>,
}

impl Ring {
    /// Build a ring, dropping a repeated closing vertex.
    pub fn new(mut points: Vec<Point2D>) -> Result<Self> {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Err(MargaError::Geometry(format!(
                "ring needs at least 3 vertices, got {}",
                points.len()
            )));
        }
        let ring = Self { points };
        if ring.area() <= f64::EPSILON {
            return Err(MargaError::Geometry("ring has zero area".to_string()));
        }
        Ok(ring)
    }

    /// Axis-aligned rectangle, counter-clockwise from (x0, y0).
    pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self> {
        Self::new(vec![
            Point2D::new(x0, y0),
            Point2D::new(x1, y0),
            Point2D::new(x1, y1),
            Point2D::new(x0, y1),
        ])
    }

    pub(crate) fn from_points_unchecked(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges as (start, end) pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        self.edges().map(|(a, b)| a.cross(&b)).sum::<f64>() / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Even-odd point containment. Boundary points may go either way.
    pub fn contains(&self, p: Point2D) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from `p` to the nearest edge.
    pub fn distance_to_boundary(&self, p: Point2D) -> f64 {
        self.edges()
            .map(|(a, b)| point_segment_distance(p, a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Distance from `p` to the ring area: zero inside.
    pub fn distance(&self, p: Point2D) -> f64 {
        if self.contains(p) {
            0.0
        } else {
            self.distance_to_boundary(p)
        }
    }

    /// Index of the vertex nearest to `p`.
    pub fn nearest_vertex(&self, p: Point2D) -> usize {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, v) in self.points.iter().enumerate() {
            let d = v.distance_squared(&p);
            if d < best_d {
                best = i;
                best_d = d;
            }
        }
        best
    }

    /// Closed vertex list (first vertex repeated at the end).
    pub fn closed(&self) -> Vec<Point2D> {
        let mut coords = self.points.clone();
        coords.push(self.points[0]);
        coords
    }

    /// Closed vertex list starting and ending at the vertex nearest to `p`.
    pub fn closed_from_nearest(&self, p: Point2D) -> Vec<Point2D> {
        self.closed_from(self.nearest_vertex(p))
    }

    /// Closed vertex list starting and ending at vertex `i`.
    pub fn closed_from(&self, i: usize) -> Vec<Point2D> {
        let i = i % self.points.len();
        let mut coords = Vec::with_capacity(self.points.len() + 1);
        coords.extend_from_slice(&self.points[i..]);
        coords.extend_from_slice(&self.points[..i]);
        coords.push(self.points[i]);
        coords
    }

    /// Mitred parallel offset.
    ///
    /// Negative distances shrink the ring. The result may be empty (the ring
    /// collapsed) or hold several disjoint rings, all counter-clockwise.
    /// Corners whose mitre would exceed `mitre_limit * |distance|` are bevelled.
    pub fn offset(&self, distance: f64, mitre_limit: f64) -> Vec<Ring> {
        offset_ring(self, distance, mitre_limit)
    }
}
