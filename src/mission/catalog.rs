//! Named missions built from configuration.

use std::f64::consts::{PI, TAU};
use std::sync::Arc;

use crate::config::MargaConfig;
use crate::control::sequences::{path_controls, ScanHLine};
use crate::control::{
    ArcControl, AvoidObstacleControl, CompositeControl, Control, GetStateControl, IterSequence,
    LineControl, Resume, SpeedDistanceControl, TimeControl2,
};
use crate::core::{normalize_angle, Point2D};
use crate::error::{MargaError, Result};
use crate::geometry::Ring;
use crate::planning::FenceShrink;

use super::RobotContext;

/// Names accepted by [`build_mission`].
pub const MISSIONS: &[&str] = &[
    "Mowing",
    "RectangleScan",
    "RectangleLoop",
    "Triangle",
    "PlazaRectangle",
    "Turns",
    "Turn360",
];

/// Reverse out of the dock before patrolling.
const UNDOCK_SPEED: f64 = -0.1;
const UNDOCK_DISTANCE: f64 = 1.0;

/// Pause between the turns of `Turn360`.
const TURN_PAUSE: f64 = 3.0;
const TURN_REPEATS: usize = 3;

fn boxed<C: Control + 'static>(control: C) -> Box<dyn Control> {
    Box::new(control)
}

/// Build the mission `name`.
pub fn build_mission(
    name: &str,
    config: &MargaConfig,
    context: Arc<RobotContext>,
) -> Result<CompositeControl> {
    match name {
        "Mowing" => mowing(config),
        "RectangleScan" => rectangle_scan(config),
        "RectangleLoop" => rectangle_loop(config),
        "Triangle" => triangle(config, context),
        "PlazaRectangle" => plaza_rectangle(config),
        "Turns" => turns(config),
        "Turn360" => turn_360(config),
        _ => Err(MargaError::UnknownMission(name.to_string())),
    }
}

fn mission_rectangle(config: &MargaConfig) -> Result<Ring> {
    let [x0, y0, x1, y1] = config.missions.rectangle;
    Ring::rectangle(x0, y0, x1, y1)
}

/// Shrinking-ring coverage of the area of interest, kept half a cut width
/// inside its boundary.
fn mowing(config: &MargaConfig) -> Result<CompositeControl> {
    let fence = config.site.fence()?;
    let half_cut = 0.5 * config.robot.cut_diameter;
    let areas = config
        .site
        .area_of_interest()?
        .offset(-half_cut, config.coverage.mitre_limit);
    let coverage = FenceShrink::new(fence, areas, -half_cut, config.control, &config.coverage)?;
    CompositeControl::new("Mowing", coverage)
}

fn rectangle_scan(config: &MargaConfig) -> Result<CompositeControl> {
    let [x0, y0, x1, y1] = config.missions.rectangle;
    let scan = ScanHLine::new(
        (x0, y0),
        (x1, y1),
        config.control.speed,
        config.control.omega,
        0.5 * config.robot.cut_diameter,
        &config.robot,
    )?;
    CompositeControl::new("RectangleScan", scan)
}

fn rectangle_loop(config: &MargaConfig) -> Result<CompositeControl> {
    let coords = mission_rectangle(config)?.closed();
    let controls = path_controls(&coords, config.control);
    CompositeControl::new("RectangleLoop", IterSequence::new(controls.into_iter()))
}

/// Endless patrol around the triangle, avoiding obstacles.
fn triangle(config: &MargaConfig, context: Arc<RobotContext>) -> Result<CompositeControl> {
    let points: Vec<Point2D> = config
        .missions
        .triangle
        .iter()
        .copied()
        .map(Point2D::from)
        .collect();
    if points.len() < 2 {
        return Err(MargaError::Config(format!(
            "triangle mission needs at least 2 points, got {}",
            points.len()
        )));
    }

    let control = config.control;
    let mut undocked = false;
    let mut leg = 0;
    let patrol = move |_: Option<&Resume>| -> Option<Box<dyn Control>> {
        if !undocked {
            undocked = true;
            // no heading control while reversing
            return Some(boxed(SpeedDistanceControl::new(UNDOCK_SPEED, UNDOCK_DISTANCE)));
        }
        let p0 = points[leg % points.len()];
        let p1 = points[(leg + 1) % points.len()];
        leg += 1;
        let line = boxed(LineControl::new(p0, p1, control));
        Some(boxed(AvoidObstacleControl::new(line, context.clone(), control)))
    };
    CompositeControl::new("Triangle", patrol)
}

fn plaza_rectangle(config: &MargaConfig) -> Result<CompositeControl> {
    let coords = mission_rectangle(config)?.closed();
    let control = config.control;
    let laps = config.missions.laps;
    let controls = (0..laps).flat_map(move |_| {
        coords
            .windows(2)
            .map(|w| {
                let line = LineControl::new(w[0], w[1], control).with_proximity(control.proximity);
                boxed(line)
            })
            .collect::<Vec<_>>()
    });
    CompositeControl::new("PlazaRectangle", IterSequence::new(controls))
}

/// Alternating half turns on the spot and pauses, forever.
fn turns(config: &MargaConfig) -> Result<CompositeControl> {
    let omega = config.control.omega;
    let pause = config.missions.pause_secs;
    let mut theta = 0.0;
    let mut pausing = false;
    let sequence = move |resume: Option<&Resume>| -> Option<Box<dyn Control>> {
        if pausing {
            pausing = false;
            let t = resume.map_or(0.0, |r| r.t);
            return Some(boxed(TimeControl2::new(0.0, 0.0, t + pause)));
        }
        pausing = true;
        theta = normalize_angle(theta + PI);
        Some(boxed(ArcControl::new(0.0, omega, theta)))
    };
    CompositeControl::new("Turns", sequence)
}

/// Timed full turns left and right with pauses in between.
fn turn_360(config: &MargaConfig) -> Result<CompositeControl> {
    let omega = config.control.omega;
    let turn_time = TAU / omega;
    // (omega, duration) of each step after the initial state capture
    let steps: Vec<(f64, f64)> = (0..TURN_REPEATS)
        .flat_map(|_| {
            [
                (omega, turn_time),
                (0.0, TURN_PAUSE),
                (-omega, turn_time),
                (0.0, TURN_PAUSE),
            ]
        })
        .collect();
    let mut next = 0;
    let sequence = move |resume: Option<&Resume>| -> Option<Box<dyn Control>> {
        let Some(r) = resume else {
            return Some(boxed(GetStateControl));
        };
        let &(step_omega, duration) = steps.get(next)?;
        next += 1;
        Some(boxed(TimeControl2::new(0.0, step_omega, r.t + duration)))
    };
    CompositeControl::new("Turn360", sequence)
}
