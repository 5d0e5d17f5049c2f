//! Line segment primitives.

use crate::core::Point2D;

/// Slack on segment parameters when testing intersections.
const PARAM_EPS: f64 = 1e-9;

/// Distance from point `p` to segment `a`-`b`.
pub fn point_segment_distance(p: Point2D, a: Point2D, b: Point2D) -> f64 {
    p.distance(&closest_on_segment(p, a, b))
}

/// Closest point to `p` on segment `a`-`b`.
pub fn closest_on_segment(p: Point2D, a: Point2D, b: Point2D) -> Point2D {
    let ab = b - a;
    let len_sq = ab.dot(&ab);
    if len_sq <= f64::EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Projection parameter of `p` onto the line through `a`-`b` (unclamped).
pub fn project_param(p: Point2D, a: Point2D, b: Point2D) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(&ab);
    if len_sq <= f64::EPSILON {
        return 0.0;
    }
    (p - a).dot(&ab) / len_sq
}

/// Intersection of segments `a`-`b` and `c`-`d`.
///
/// Returns the parameters `(t, u)` along each segment, both within [0, 1]
/// (endpoints included). Parallel segments never intersect here; callers
/// handle collinear overlap through vertex tests.
pub fn segment_intersection(
    a: Point2D,
    b: Point2D,
    c: Point2D,
    d: Point2D,
) -> Option<(f64, f64)> {
    let r = b - a;
    let s = d - c;
    let denom = r.cross(&s);
    if denom.abs() <= 1e-12 * r.length() * s.length() {
        return None;
    }
    let ac = c - a;
    let t = ac.cross(&s) / denom;
    let u = ac.cross(&r) / denom;
    let inside = |v: f64| (-PARAM_EPS..=1.0 + PARAM_EPS).contains(&v);
    if inside(t) && inside(u) {
        Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
    } else {
        None
    }
}
