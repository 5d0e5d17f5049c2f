//! Ready-made control sequences over waypoint lists.

use std::f64::consts::PI;

use crate::config::{ControlConfig, RobotConfig};
use crate::core::Point2D;
use crate::error::{MargaError, Result};

use super::end;
use super::{
    start_arc, ArcControl, Control, ControlSequence, HLineControl, LineControl, PointControl,
    PointControl2, Resume,
};

/// Legs shorter than this are skipped.
const MIN_LEG: f64 = 1e-6;

/// Distance beyond each ring vertex that [`ring_controls`] aims at.
const RING_AHEAD: f64 = 0.2;

/// Line following along consecutive waypoints.
pub fn path_controls(coords: &[Point2D], config: ControlConfig) -> Vec<Box<dyn Control>> {
    coords
        .windows(2)
        .filter(|w| w[0].distance(&w[1]) > MIN_LEG)
        .map(|w| Box::new(LineControl::new(w[0], w[1], config)) as Box<dyn Control>)
        .collect()
}

/// Point following along consecutive waypoints, each leg ending on the
/// perpendicular through its waypoint.
pub fn point_controls(coords: &[Point2D], config: ControlConfig) -> Vec<Box<dyn Control>> {
    coords
        .windows(2)
        .filter(|w| w[0].distance(&w[1]) > MIN_LEG)
        .map(|w| Box::new(PointControl2::new(w[0], w[1], config)) as Box<dyn Control>)
        .collect()
}

/// Point following around a ring.
///
/// The first control drives to the first vertex. Each later control aims a
/// little past its vertex and ends once the robot is nearer to the previous
/// vertex mirrored around it, so it crosses the vertex before turning.
pub fn ring_controls(coords: &[Point2D], config: ControlConfig) -> Vec<Box<dyn Control>> {
    let Some(&first) = coords.first() else {
        return Vec::new();
    };
    let mut controls: Vec<Box<dyn Control>> = vec![Box::new(PointControl::new(
        first,
        config,
        end::within(first, RING_AHEAD),
    ))];

    let mut p0 = first;
    for &p in &coords[1..] {
        let delta = p - p0;
        if delta.length() <= MIN_LEG {
            continue;
        }
        let aim = p + delta.normalized() * RING_AHEAD;
        let mirrored = p + delta;
        controls.push(Box::new(PointControl::new(
            aim,
            config,
            end::nearer(p0, mirrored),
        )));
        p0 = p;
    }
    controls
}

/// Boustrophedon scan of a rectangle with horizontal lines `dy` apart,
/// joined by half-circle arcs. Restarts from the bottom line forever.
pub struct ScanHLine {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    dy: f64,
    speed: f64,
    omega: f64,
    arc_speed: f64,
    arc_omega: f64,
    y: f64,
    right: bool,
    pending_arc: Option<ArcControl>,
}

impl ScanHLine {
    pub fn new(
        (x0, y0): (f64, f64),
        (x1, y1): (f64, f64),
        speed: f64,
        omega: f64,
        dy: f64,
        robot: &RobotConfig,
    ) -> Result<Self> {
        if x1 <= x0 || y1 <= y0 || dy <= 0.0 {
            return Err(MargaError::Config(format!(
                "scan needs x1 > x0, y1 > y0 and dy > 0: ({x0}, {y0}) ({x1}, {y1}) dy {dy}"
            )));
        }
        let (arc_speed, arc_omega) = start_arc(dy / 2.0, speed, omega, true, robot)?;
        Ok(Self {
            x0,
            x1,
            y0,
            y1,
            dy,
            speed,
            omega,
            arc_speed,
            arc_omega,
            y: y0,
            right: true,
            pending_arc: None,
        })
    }
}

impl ControlSequence for ScanHLine {
    fn next_control(&mut self, _resume: Option<&Resume>) -> Option<Box<dyn Control>> {
        if let Some(arc) = self.pending_arc.take() {
            return Some(Box::new(arc));
        }

        let end_x = if self.right { self.x1 } else { self.x0 };
        let line = HLineControl::new(self.y, self.right, end_x, self.speed, self.omega);

        self.y += self.dy;
        self.right = !self.right;
        if self.y > self.y1 {
            self.y = self.y0;
        } else {
            // heading right next: turn clockwise from π to 0, otherwise back
            let (omega, end_theta) = if self.right {
                (-self.arc_omega, 0.0)
            } else {
                (self.arc_omega, PI)
            };
            self.pending_arc = Some(ArcControl::new(self.arc_speed, omega, end_theta));
        }
        Some(Box::new(line))
    }
}
