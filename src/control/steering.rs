//! Closed-loop steering controllers.
//!
//! All of them emit `Move` commands stamped with the tick time; the mission
//! runner replaces that stamp with the real command expiry.

use std::fmt;

use tracing::debug;

use crate::config::{ControlConfig, RobotConfig};
use crate::core::{angle_diff, normalize_angle, Point2D, Pose};
use crate::error::{MargaError, Result};

use super::end::EndPredicate;
use super::{Control, MotionCommand};

/// Largest heading error at which a sign change counts as reaching the
/// target heading rather than a jump across ±π.
const ZERO_CROSSING_WINDOW: f64 = 0.9;

// ────────────────────────────────────────────────────────────────────────────
// Point following
// ────────────────────────────────────────────────────────────────────────────

/// Drive towards a point until an external predicate says stop.
pub struct PointControl {
    target: Point2D,
    config: ControlConfig,
    end: EndPredicate,
}

impl PointControl {
    pub fn new(target: Point2D, config: ControlConfig, end: EndPredicate) -> Self {
        Self {
            target,
            config,
            end,
        }
    }

    pub fn target(&self) -> Point2D {
        self.target
    }
}

impl fmt::Display for PointControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointControl({:.2},{:.2})", self.target.x, self.target.y)
    }
}

impl Control for PointControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        Ok(Some(steer_to(&self.config, self.target, t, pose)))
    }

    fn end(&mut self, t: f64, pose: &Pose) -> bool {
        (self.end)(t, pose)
    }
}

/// Polar steering law shared by the point controllers.
fn steer_to(config: &ControlConfig, target: Point2D, t: f64, pose: &Pose) -> MotionCommand {
    let p = pose.position();
    let d = p.distance(&target);
    let angle = angle_diff(pose.theta, p.angle_to(&target));
    let speed = config
        .speed_from_angle(angle)
        .min(config.speed_from_distance(d));
    let omega = config.omega_from_angle(angle);
    MotionCommand::move_at(speed, omega, t)
}

/// Drive from `p0` towards `p1` until crossing the perpendicular through `p1`.
///
/// Termination latches: once crossed, `update` returns `None` and `end`
/// stays true.
pub struct PointControl2 {
    p0: Point2D,
    p1: Point2D,
    /// `p0` mirrored around `p1`
    p2: Point2D,
    proximity: f64,
    config: ControlConfig,
    ended: bool,
}

impl PointControl2 {
    pub fn new(p0: Point2D, p1: Point2D, config: ControlConfig) -> Self {
        Self {
            p0,
            p1,
            p2: p1 + (p1 - p0),
            proximity: 0.0,
            config,
            ended: false,
        }
    }

    /// End this far before the perpendicular.
    pub fn with_proximity(mut self, proximity: f64) -> Self {
        self.proximity = proximity;
        self
    }

    pub fn target(&self) -> Point2D {
        self.p1
    }
}

impl fmt::Display for PointControl2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointControl2({:.2},{:.2})", self.p1.x, self.p1.y)
    }
}

impl Control for PointControl2 {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        if self.ended {
            return Ok(None);
        }
        let p = pose.position();
        if p.distance(&self.p0) + 2.0 * self.proximity >= p.distance(&self.p2) {
            debug!("{} crossed end line at ({:.2}, {:.2})", self, p.x, p.y);
            self.ended = true;
            return Ok(None);
        }
        Ok(Some(steer_to(&self.config, self.p1, t, pose)))
    }

    fn end(&mut self, _t: f64, _pose: &Pose) -> bool {
        self.ended
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Line following
// ────────────────────────────────────────────────────────────────────────────

/// Follow the directed line `p0` → `p1`, converging onto it from either side.
pub struct LineControl {
    p0: Point2D,
    p1: Point2D,
    /// `p0` mirrored around `p1`
    p2: Point2D,
    /// Line bearing
    theta: f64,
    /// Unit direction
    unit: Point2D,
    proximity: f64,
    config: ControlConfig,
}

impl LineControl {
    pub fn new(p0: Point2D, p1: Point2D, config: ControlConfig) -> Self {
        let dp = p1 - p0;
        Self {
            p0,
            p1,
            p2: p1 + dp,
            theta: dp.angle(),
            unit: dp.normalized(),
            proximity: 0.0,
            config,
        }
    }

    /// End when within `proximity` of the end perpendicular.
    pub fn with_proximity(mut self, proximity: f64) -> Self {
        self.proximity = proximity;
        self
    }

    pub fn start(&self) -> Point2D {
        self.p0
    }

    pub fn target(&self) -> Point2D {
        self.p1
    }

    /// Signed cross-track distance, positive right of the line.
    pub fn cross_track(&self, p: Point2D) -> f64 {
        (p - self.p0).cross(&self.unit)
    }
}

impl fmt::Display for LineControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LineControl(({:.2},{:.2}), ({:.2},{:.2}), {:.2})",
            self.p0.x, self.p0.y, self.p1.x, self.p1.y, self.proximity
        )
    }
}

impl Control for LineControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        let p = pose.position();
        let d = self.cross_track(p);

        let correction = self.config.angle_to_line(d).copysign(d);
        let angle = normalize_angle(self.theta + correction - pose.theta);
        let speed = self
            .config
            .speed_from_angle(angle)
            .min(self.config.speed_from_distance(p.distance(&self.p1)));
        let omega = self.config.omega_from_angle(angle);
        Ok(Some(MotionCommand::move_at(speed, omega, t)))
    }

    fn end(&mut self, _t: f64, pose: &Pose) -> bool {
        let p = pose.position();
        p.distance(&self.p0) + self.proximity >= p.distance(&self.p2) - self.proximity
    }
}

/// Follow the horizontal line `y = y0` in one direction until `x` passes `end_x`.
pub struct HLineControl {
    y: f64,
    right: bool,
    end_x: f64,
    speed: f64,
    omega: f64,
}

impl HLineControl {
    /// Cross-track scale of the approach angle.
    const APPROACH_DISTANCE: f64 = 0.25;

    pub fn new(y: f64, right: bool, end_x: f64, speed: f64, omega: f64) -> Self {
        Self {
            y,
            right,
            end_x,
            speed,
            omega,
        }
    }
}

impl fmt::Display for HLineControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HLineControl({},{:.2})", self.right, self.end_x)
    }
}

impl Control for HLineControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        let d = self.y - pose.y;
        let mut theta =
            std::f64::consts::FRAC_PI_2 * (1.0 - (-(d / Self::APPROACH_DISTANCE).powi(2)).exp());
        if d < 0.0 {
            theta = -theta;
        }
        if !self.right {
            theta = std::f64::consts::PI - theta;
        }
        let angle = normalize_angle(theta - pose.theta);
        let mut speed = self.speed * (-(4.0 * angle).powi(2)).exp();
        if theta.sin() > 1e-9 {
            speed = speed.min(d.abs() / theta.sin() + 0.02);
        }
        let omega = (angle.abs() + 0.02).min(self.omega).copysign(angle);
        Ok(Some(MotionCommand::move_at(speed, omega, t)))
    }

    fn end(&mut self, _t: f64, pose: &Pose) -> bool {
        self.right == (pose.x >= self.end_x)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Heading
// ────────────────────────────────────────────────────────────────────────────

/// Sign change of a heading error near zero, ignoring ±π wraps.
#[derive(Clone, Copy, Debug, Default)]
struct ZeroCrossing {
    last: Option<f64>,
}

impl ZeroCrossing {
    /// Record `angle`; true when it crossed zero since the previous sample.
    fn crossed(&mut self, angle: f64) -> bool {
        let crossed = match self.last {
            Some(last) if angle.abs() < ZERO_CROSSING_WINDOW => {
                (last < 0.0 && angle >= 0.0) || (last > 0.0 && angle <= 0.0)
            }
            _ => false,
        };
        self.last = Some(angle);
        crossed
    }
}

/// Constant `(speed, omega)` until the heading reaches `end_theta`.
#[derive(Debug)]
pub struct ArcControl {
    speed: f64,
    omega: f64,
    end_theta: f64,
    crossing: ZeroCrossing,
}

impl ArcControl {
    pub fn new(speed: f64, omega: f64, end_theta: f64) -> Self {
        Self {
            speed,
            omega,
            end_theta,
            crossing: ZeroCrossing::default(),
        }
    }
}

impl fmt::Display for ArcControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArcControl({:.3})", self.end_theta)
    }
}

impl Control for ArcControl {
    fn update(&mut self, t: f64, _pose: &Pose) -> Result<Option<MotionCommand>> {
        Ok(Some(MotionCommand::move_at(self.speed, self.omega, t)))
    }

    /// Needs one sample of history; the first call only records the error.
    fn end(&mut self, _t: f64, pose: &Pose) -> bool {
        self.crossing.crossed(angle_diff(self.end_theta, pose.theta))
    }
}

/// Turn on the spot towards `end_theta`.
#[derive(Debug)]
pub struct HeadingControl {
    end_theta: f64,
    tolerance: f64,
    config: ControlConfig,
    crossing: ZeroCrossing,
}

impl HeadingControl {
    pub fn new(end_theta: f64, config: ControlConfig) -> Self {
        Self {
            end_theta,
            tolerance: 0.1,
            config,
            crossing: ZeroCrossing::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl fmt::Display for HeadingControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeadingControl({:.3})", self.end_theta)
    }
}

impl Control for HeadingControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        let angle = angle_diff(pose.theta, self.end_theta);
        let omega = self.config.omega_from_angle(angle);
        Ok(Some(MotionCommand::move_at(0.0, omega, t)))
    }

    fn end(&mut self, _t: f64, pose: &Pose) -> bool {
        let angle = angle_diff(self.end_theta, pose.theta);
        if angle.abs() <= self.tolerance {
            return true;
        }
        self.crossing.crossed(angle)
    }
}

/// Speed and turn rate for an arc of `radius`.
///
/// Lowers whichever of `speed` / `omega` is too high for the radius, then
/// checks the outer wheel against the motor limit. `direction` true turns
/// left (positive omega).
pub fn start_arc(
    radius: f64,
    speed: f64,
    omega: f64,
    direction: bool,
    robot: &RobotConfig,
) -> Result<(f64, f64)> {
    let arc_omega = speed / radius;
    let (speed, omega) = if arc_omega < omega {
        (speed, arc_omega)
    } else {
        (omega * radius, omega)
    };

    let wheel_speed = speed + omega * robot.wheel_base / 2.0;
    if wheel_speed >= robot.max_speed {
        return Err(MargaError::ArcSpeed {
            speed,
            omega,
            wheel_speed,
            max_speed: robot.max_speed,
        });
    }

    Ok((speed, if direction { omega } else { -omega }))
}
