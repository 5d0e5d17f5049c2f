//! Mitred ring offsetting.
//!
//! The raw offset ring moves every edge along its outward normal and joins
//! neighbours at the intersection of the moved edges (the mitre point).
//! Where edges of the raw ring cross, it is cut into loops; loops that are
//! inverted, degenerate or closer to the source ring than the offset
//! distance are discarded.

use crate::core::Point2D;

use super::ring::Ring;
use super::segment::segment_intersection;

/// Vertices closer than this are merged.
const MERGE_DIST: f64 = 1e-9;

/// Loops with less area are dropped.
const MIN_LOOP_AREA: f64 = 1e-12;

pub(crate) fn offset_ring(ring: &Ring, distance: f64, mitre_limit: f64) -> Vec<Ring> {
    if distance == 0.0 {
        return vec![ring.clone()];
    }

    let mut points = clean(ring.points());
    if points.len() < 3 {
        return Vec::new();
    }
    if signed_area(&points) < 0.0 {
        points.reverse();
    }

    let raw = clean(&raw_offset(&points, distance, mitre_limit));
    if raw.len() < 3 {
        return Vec::new();
    }

    let expected = distance.abs() * (1.0 - 1e-6) - 1e-9;
    split_loops(raw)
        .into_iter()
        .map(|pts| clean(&pts))
        .filter(|pts| pts.len() >= 3 && signed_area(pts) > MIN_LOOP_AREA)
        .filter(|pts| {
            pts.iter().all(|&v| {
                ring.contains(v) == (distance < 0.0) && ring.distance_to_boundary(v) >= expected
            })
        })
        .map(Ring::from_points_unchecked)
        .collect()
}

/// Offset vertices of a counter-clockwise ring.
fn raw_offset(points: &[Point2D], distance: f64, mitre_limit: f64) -> Vec<Point2D> {
    let n = points.len();
    let mut raw = Vec::with_capacity(2 * n);

    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];

        let d0 = (cur - prev).normalized();
        let d1 = (next - cur).normalized();
        // outward normals of a counter-clockwise ring
        let n0 = Point2D::new(d0.y, -d0.x);
        let n1 = Point2D::new(d1.y, -d1.x);

        let convex = d0.cross(&d1) > 0.0;
        let opening = convex == (distance > 0.0);
        let denom = 1.0 + n0.dot(&n1);

        if denom <= 1e-9 {
            // edge folds back on itself
            raw.push(cur + n0 * distance);
            raw.push(cur + n1 * distance);
            continue;
        }

        let mitre_ratio = (2.0 / denom).sqrt();
        if opening && mitre_ratio > mitre_limit {
            raw.push(cur + n0 * distance);
            raw.push(cur + n1 * distance);
        } else {
            raw.push(cur + (n0 + n1) * (distance / denom));
        }
    }

    raw
}

/// Cut a closed polyline at its self-intersections into closed loops.
fn split_loops(points: Vec<Point2D>) -> Vec<Vec<Point2D>> {
    let mut done = Vec::new();
    let mut stack = vec![points];

    'next: while let Some(pts) = stack.pop() {
        let n = pts.len();
        if n < 3 {
            continue;
        }
        for i in 0..n {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (a, b) = (pts[i], pts[(i + 1) % n]);
                let (c, d) = (pts[j], pts[(j + 1) % n]);
                if let Some((t, _)) = segment_intersection(a, b, c, d) {
                    let x = a.lerp(&b, t);

                    let mut first = Vec::with_capacity(j - i + 1);
                    first.push(x);
                    first.extend_from_slice(&pts[i + 1..=j]);

                    let mut second = Vec::with_capacity(n - (j - i) + 1);
                    second.push(x);
                    second.extend_from_slice(&pts[j + 1..]);
                    second.extend_from_slice(&pts[..=i]);

                    stack.push(first);
                    stack.push(second);
                    continue 'next;
                }
            }
        }
        done.push(pts);
    }

    done
}

/// Merge repeated vertices and drop collinear ones.
fn clean(points: &[Point2D]) -> Vec<Point2D> {
    let mut out: Vec<Point2D> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().map_or(true, |q| q.distance(&p) > MERGE_DIST) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[0].distance(&out[out.len() - 1]) <= MERGE_DIST {
        out.pop();
    }

    let mut i = 0;
    while out.len() >= 3 && i < out.len() {
        let n = out.len();
        let prev = out[(i + n - 1) % n];
        let cur = out[i];
        let next = out[(i + 1) % n];
        let a = cur - prev;
        let b = next - cur;
        if a.cross(&b).abs() <= 1e-12 * a.length() * b.length() {
            out.remove(i);
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
    out
}

fn signed_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].cross(&points[(i + 1) % n]))
        .sum::<f64>()
        / 2.0
}
