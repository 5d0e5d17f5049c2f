//! Area coverage by concentric shrinking rings.
//!
//! Each area is driven around its boundary, eroded by the cut width and
//! driven around again until nothing is left. Shapes that split while
//! eroding are handled part by part, nearest first. Transfers between rings
//! follow visibility paths through the fence, and lap legs that cross a
//! fence hole detour around it.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::config::{ControlConfig, CoverageConfig};
use crate::control::sequences::path_controls;
use crate::control::{Control, ControlSequence, GetStateControl, Resume};
use crate::core::Point2D;
use crate::error::{MargaError, Result};
use crate::geometry::{Polygon, Ring};

use super::VisibilityPlanner;

/// One lap queued by [`FenceShrink`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LapRecord {
    /// 1-based shape counter; parts of a split shape count as new shapes
    pub area: usize,
    /// 1-based lap within the shape
    pub lap: usize,
    /// Area enclosed by the lap ring (m²)
    pub ring_area: f64,
}

enum Stage {
    /// Nothing pulled yet
    Start,
    /// Pick the nearest shape from the work list
    Select,
    /// Queue the transfer path and one lap around `ring`
    Lap {
        ring: Ring,
        area: usize,
        lap: usize,
        final_pass: bool,
    },
    /// Shrink the ring just driven
    Erode { ring: Ring, area: usize, lap: usize },
    Done,
}

/// Coverage sequence over a set of areas inside a fence.
pub struct FenceShrink {
    planner: VisibilityPlanner,
    control: ControlConfig,
    shrink: f64,
    min_area: f64,
    mitre_limit: f64,
    /// Work list of shapes still to cover, with their final-pass flag
    shapes: Vec<(Ring, bool)>,
    queue: VecDeque<Box<dyn Control>>,
    position: Point2D,
    stage: Stage,
    areas: usize,
    laps: Vec<LapRecord>,
}

impl FenceShrink {
    /// `shrink` is the signed offset between laps and must be negative.
    pub fn new(
        fence: Polygon,
        areas: Vec<Ring>,
        shrink: f64,
        control: ControlConfig,
        coverage: &CoverageConfig,
    ) -> Result<Self> {
        if shrink >= 0.0 || !shrink.is_finite() {
            return Err(MargaError::Config(format!(
                "coverage shrink must be negative, got {shrink}"
            )));
        }
        Ok(Self {
            planner: VisibilityPlanner::new(fence, coverage.fence_buffer),
            control,
            shrink,
            min_area: coverage.min_area,
            mitre_limit: coverage.mitre_limit,
            shapes: areas.into_iter().map(|ring| (ring, false)).collect(),
            queue: VecDeque::new(),
            position: Point2D::ZERO,
            stage: Stage::Start,
            areas: 0,
            laps: Vec::new(),
        })
    }

    /// Laps queued so far.
    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    fn nearest_shape(&self) -> Option<usize> {
        let mut best = None;
        let mut best_d = f64::INFINITY;
        for (i, (ring, _)) in self.shapes.iter().enumerate() {
            let d = ring.distance(self.position);
            if d < best_d {
                best = Some(i);
                best_d = d;
            }
        }
        best
    }

    /// Closed ring starting at the nearest vertex inside the fence.
    fn lap_coords(&self, ring: &Ring) -> Vec<Point2D> {
        let points = ring.points();
        let position = self.position;
        let start = (0..points.len())
            .filter(|&i| self.planner.covers(points[i]))
            .min_by(|&a, &b| {
                points[a]
                    .distance(&position)
                    .total_cmp(&points[b].distance(&position))
            })
            .unwrap_or_else(|| ring.nearest_vertex(position));
        ring.closed_from(start)
    }

    /// Lap waypoints with every leg inside the fence.
    ///
    /// Legs crossing a hole are replaced by a visibility path around it;
    /// vertices with no legal path are dropped.
    fn route(&mut self, coords: &[Point2D]) -> Vec<Point2D> {
        let Some(&first) = coords.first() else {
            return Vec::new();
        };
        let mut route = vec![first];
        let mut from = first;
        for &to in &coords[1..] {
            match self.planner.plan(from, to) {
                Some(path) => {
                    if path.len() > 2 {
                        debug!("Detour around fence hole via {} vertices", path.len() - 2);
                    }
                    route.extend_from_slice(&path[1..]);
                    from = to;
                }
                None => {
                    debug!("Lap vertex ({:.2}, {:.2}) unreachable, dropped", to.x, to.y);
                }
            }
        }
        route
    }

    /// Queue a transfer to the ring and one lap around it.
    ///
    /// Returns false when the ring cannot be reached through the fence.
    fn queue_lap(&mut self, ring: &Ring, area: usize, lap: usize) -> bool {
        let coords = self.lap_coords(ring);
        let Some(path) = self.planner.plan(self.position, coords[0]) else {
            warn!(
                "Area {} lap {}: no path from ({:.2}, {:.2}) to ({:.2}, {:.2}), skipping",
                area, lap, self.position.x, self.position.y, coords[0].x, coords[0].y
            );
            return false;
        };

        let ring_area = ring.area();
        info!("Area {} lap {}: ring area {:.4} m²", area, lap, ring_area);
        self.laps.push(LapRecord {
            area,
            lap,
            ring_area,
        });
        let route = self.route(&coords);
        self.queue.extend(path_controls(&path, self.control));
        self.queue.extend(path_controls(&route, self.control));
        true
    }

    fn erode(&mut self, ring: Ring, area: usize, lap: usize) -> Stage {
        let parts = ring.offset(self.shrink, self.mitre_limit);
        if parts.len() > 1 {
            info!("Area {} split into {} parts", area, parts.len());
            self.shapes.extend(parts.into_iter().map(|part| (part, false)));
            return Stage::Select;
        }

        let remaining: f64 = parts.iter().map(Ring::area).sum();
        if remaining >= self.min_area {
            if let Some(next) = parts.into_iter().next() {
                return Stage::Lap {
                    ring: next,
                    area,
                    lap: lap + 1,
                    final_pass: false,
                };
            }
        }

        debug!("Area {} almost covered: {:.6} m² left", area, remaining);
        let half = ring.offset(self.shrink / 2.0, self.mitre_limit);
        let remaining: f64 = half.iter().map(Ring::area).sum();
        if remaining < self.min_area {
            info!("Area {} covered after {} laps", area, lap);
            return Stage::Select;
        }

        info!("Area {} final pass over {:.4} m²", area, remaining);
        if half.len() == 1 {
            if let Some(last) = half.into_iter().next() {
                return Stage::Lap {
                    ring: last,
                    area,
                    lap: lap + 1,
                    final_pass: true,
                };
            }
            return Stage::Select;
        }
        self.shapes.extend(half.into_iter().map(|part| (part, true)));
        Stage::Select
    }
}

impl ControlSequence for FenceShrink {
    fn next_control(&mut self, resume: Option<&Resume>) -> Option<Box<dyn Control>> {
        if let Some(r) = resume {
            self.position = r.pose.position();
        }

        loop {
            if let Some(control) = self.queue.pop_front() {
                return Some(control);
            }

            self.stage = match std::mem::replace(&mut self.stage, Stage::Done) {
                Stage::Start => {
                    self.stage = Stage::Select;
                    return Some(Box::new(GetStateControl));
                }
                Stage::Select => {
                    let Some(index) = self.nearest_shape() else {
                        info!(
                            "Coverage complete: {} areas, {} laps",
                            self.areas,
                            self.laps.len()
                        );
                        return None;
                    };
                    let (ring, final_pass) = self.shapes.remove(index);
                    self.areas += 1;
                    Stage::Lap {
                        ring,
                        area: self.areas,
                        lap: 1,
                        final_pass,
                    }
                }
                Stage::Lap {
                    ring,
                    area,
                    lap,
                    final_pass,
                } => {
                    if !self.queue_lap(&ring, area, lap) || final_pass {
                        Stage::Select
                    } else {
                        Stage::Erode { ring, area, lap }
                    }
                }
                Stage::Erode { ring, area, lap } => self.erode(ring, area, lap),
                Stage::Done => return None,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pose;
    use approx::assert_relative_eq;

    fn square_fence() -> Polygon {
        Polygon::new(Ring::rectangle(0.0, 0.0, 4.0, 4.0).unwrap(), Vec::new())
    }

    fn drain(seq: &mut FenceShrink, at: Pose) -> usize {
        let resume = Resume { t: 0.0, pose: at };
        let mut pulled = 0;
        while seq.next_control(Some(&resume)).is_some() {
            pulled += 1;
            assert!(pulled < 10_000, "coverage did not terminate");
        }
        pulled
    }

    #[test]
    fn test_rejects_non_negative_shrink() {
        let areas = vec![Ring::rectangle(0.0, 0.0, 4.0, 4.0).unwrap()];
        let result = FenceShrink::new(
            square_fence(),
            areas,
            0.5,
            ControlConfig::default(),
            &CoverageConfig::default(),
        );
        assert!(matches!(result, Err(MargaError::Config(_))));
    }

    #[test]
    fn test_first_control_captures_state() {
        let areas = vec![Ring::rectangle(0.0, 0.0, 4.0, 4.0).unwrap()];
        let mut seq = FenceShrink::new(
            square_fence(),
            areas,
            -0.5,
            ControlConfig::default(),
            &CoverageConfig::default(),
        )
        .unwrap();
        let first = seq.next_control(None).unwrap();
        assert_eq!(first.to_string(), "GetStateControl");
        assert!(seq.laps().is_empty());
    }

    #[test]
    fn test_square_shrinks_to_final_pass() {
        let areas = vec![Ring::rectangle(0.0, 0.0, 4.0, 4.0).unwrap()];
        let mut seq = FenceShrink::new(
            square_fence(),
            areas,
            -0.5,
            ControlConfig::default(),
            &CoverageConfig::default(),
        )
        .unwrap();
        assert!(seq.next_control(None).is_some());
        let pulled = drain(&mut seq, Pose::new(0.5, 0.5, 0.0));
        // one transfer leg plus four ring legs per lap, bar the zero-length transfers
        assert!(pulled >= 5 * 4);

        let areas: Vec<f64> = seq.laps().iter().map(|l| l.ring_area).collect();
        let expected = [16.0, 9.0, 4.0, 1.0, 0.25];
        assert_eq!(areas.len(), expected.len());
        for (a, e) in areas.iter().zip(expected) {
            assert_relative_eq!(*a, e, epsilon = 1e-9);
        }
        assert!(seq.laps().iter().all(|l| l.area == 1));
        assert_eq!(seq.laps().last().map(|l| l.lap), Some(5));

        // stays exhausted
        assert!(seq.next_control(None).is_none());
    }

    #[test]
    fn test_split_parts_are_covered_separately() {
        let dumbbell = Ring::new(
            [
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 0.9),
                (3.0, 0.9),
                (3.0, 0.0),
                (5.0, 0.0),
                (5.0, 2.0),
                (3.0, 2.0),
                (3.0, 1.1),
                (2.0, 1.1),
                (2.0, 2.0),
                (0.0, 2.0),
            ]
            .into_iter()
            .map(Point2D::from)
            .collect(),
        )
        .unwrap();
        let fence = Polygon::new(dumbbell.clone(), Vec::new());
        let mut seq = FenceShrink::new(
            fence,
            vec![dumbbell],
            -0.25,
            ControlConfig::default(),
            &CoverageConfig::default(),
        )
        .unwrap();
        assert!(seq.next_control(None).is_some());
        drain(&mut seq, Pose::new(0.5, 0.5, 0.0));

        let laps = seq.laps();
        assert_eq!(laps.len(), 1 + 2 * 4);
        assert_eq!(laps.iter().map(|l| l.area).max(), Some(3));
        for part in [2, 3] {
            let rings: Vec<f64> = laps
                .iter()
                .filter(|l| l.area == part)
                .map(|l| l.ring_area)
                .collect();
            assert_eq!(rings.len(), 4);
            assert!(rings.windows(2).all(|w| w[1] < w[0]));
        }
    }

    #[test]
    fn test_unreachable_area_is_skipped() {
        let outside = Ring::rectangle(10.0, 10.0, 12.0, 12.0).unwrap();
        let inside = Ring::rectangle(1.0, 1.0, 3.0, 3.0).unwrap();
        let mut seq = FenceShrink::new(
            square_fence(),
            vec![outside, inside],
            -0.5,
            ControlConfig::default(),
            &CoverageConfig::default(),
        )
        .unwrap();
        assert!(seq.next_control(None).is_some());
        drain(&mut seq, Pose::new(0.5, 0.5, 0.0));
        assert!(seq.laps().iter().all(|l| l.area == 1));
        assert_relative_eq!(seq.laps()[0].ring_area, 4.0, epsilon = 1e-9);
    }

    fn fence_with_hole() -> Polygon {
        Polygon::new(
            Ring::rectangle(0.0, 0.0, 10.0, 10.0).unwrap(),
            vec![Ring::rectangle(1.0, 4.0, 3.0, 6.0).unwrap()],
        )
    }

    fn hole_shrink(areas: Vec<Ring>) -> FenceShrink {
        FenceShrink::new(
            fence_with_hole(),
            areas,
            -0.25,
            ControlConfig::default(),
            &CoverageConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_lap_detours_around_hole() {
        let ring = Ring::rectangle(1.25, 1.25, 8.75, 8.75).unwrap();
        let mut seq = hole_shrink(vec![ring.clone()]);
        let coords = ring.closed_from(3);
        assert!(!seq.planner.is_legal(coords[0], coords[1]));

        let route = seq.route(&coords);
        assert_eq!(
            route,
            vec![
                Point2D::new(1.25, 8.75),
                Point2D::new(1.0, 6.0),
                Point2D::new(1.0, 4.0),
                Point2D::new(1.25, 1.25),
                Point2D::new(8.75, 1.25),
                Point2D::new(8.75, 8.75),
                Point2D::new(1.25, 8.75),
            ]
        );
        assert!(route.windows(2).all(|w| seq.planner.is_legal(w[0], w[1])));
    }

    #[test]
    fn test_lap_skips_vertex_inside_hole() {
        // lower-left corner lies inside the hole
        let ring = Ring::rectangle(2.0, 5.0, 8.0, 9.0).unwrap();
        let mut seq = hole_shrink(vec![ring.clone()]);
        seq.position = Point2D::new(0.0, 5.0);

        let coords = seq.lap_coords(&ring);
        assert_eq!(coords[0], Point2D::new(2.0, 9.0));
        let route = seq.route(&coords);
        assert_eq!(
            route,
            vec![
                Point2D::new(2.0, 9.0),
                Point2D::new(8.0, 5.0),
                Point2D::new(8.0, 9.0),
                Point2D::new(2.0, 9.0),
            ]
        );
    }

    #[test]
    fn test_every_lap_stays_out_of_hole() {
        let mut seq = hole_shrink(vec![Ring::rectangle(0.0, 0.0, 10.0, 10.0).unwrap()]);
        assert!(seq.next_control(None).is_some());
        drain(&mut seq, Pose::new(0.5, 0.5, 0.0));
        assert!(seq.laps().len() >= 19);

        // replay every lap ring through the router
        let mut ring = Some(Ring::rectangle(0.0, 0.0, 10.0, 10.0).unwrap());
        let mut checked = 0;
        while let Some(current) = ring {
            let coords = seq.lap_coords(&current);
            let route = seq.route(&coords);
            assert!(
                route.windows(2).all(|w| seq.planner.is_legal(w[0], w[1])),
                "illegal leg on ring of area {}",
                current.area()
            );
            checked += 1;
            ring = current
                .offset(-0.25, 5.0)
                .into_iter()
                .next()
                .filter(|r| r.area() >= 1e-4);
        }
        assert!(checked >= 19);
    }
}
