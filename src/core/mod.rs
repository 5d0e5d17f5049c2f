//! Core types: points, poses and angle math.

pub mod math;
mod point;
mod pose;

pub use math::{angle_diff, normalize_angle};
pub use point::Point2D;
pub use pose::{Pose, PoseSample};
