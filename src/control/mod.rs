//! Steering controllers and their composition.
//!
//! Every behaviour implements [`Control`]: `update` turns the latest pose into
//! an optional motion command, `end` reports completion. Behaviours are
//! chained by [`CompositeControl`], which pulls them one at a time from a
//! [`ControlSequence`].
//!
//! ## Steering laws
//!
//! The closed-loop controllers share the laws on
//! [`ControlConfig`](crate::config::ControlConfig):
//!
//! ```text
//! angle_to_line(d)       = π/2 · (1 − exp(−(d/theta_distance)²))
//! speed_from_distance(d) = min(d/speed_relax + speed_overshoot, speed)
//! speed_from_angle(a)    = speed · exp(−(a/speed_theta)²)
//! omega_from_angle(a)    = sign(a) · min(|a|/omega_relax + omega_overshoot, omega)
//! ```

mod command;
mod composite;
pub mod end;
mod obstacle;
mod open_loop;
mod sequence;
pub mod sequences;
mod steering;

use std::fmt;

use crate::core::Pose;
use crate::error::Result;

pub use command::{MotionCommand, ObstacleDetection};
pub use composite::CompositeControl;
pub use end::EndPredicate;
pub use obstacle::{
    avoid_obstacle, stop_obstacle, AvoidObstacleControl, ObstacleSource, StopObstacleControl,
};
pub use open_loop::{GetStateControl, SpeedDistanceControl, TimeControl, TimeControl2};
pub use sequence::{ControlSequence, IterSequence, Resume};
pub use steering::{
    start_arc, ArcControl, HLineControl, HeadingControl, LineControl, PointControl, PointControl2,
};

/// A steering behaviour driven once per pose.
///
/// `Display` names the behaviour in logs.
pub trait Control: fmt::Display + Send {
    /// Command for time `t` and pose, or `None` to send nothing this tick.
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>>;

    /// Whether the behaviour has finished.
    fn end(&mut self, _t: f64, _pose: &Pose) -> bool {
        false
    }
}

impl<C: Control + ?Sized> Control for Box<C> {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        (**self).update(t, pose)
    }

    fn end(&mut self, t: f64, pose: &Pose) -> bool {
        (**self).end(t, pose)
    }
}
