//! End predicates for [`PointControl`](super::PointControl).

use crate::core::{Point2D, Pose};
use crate::geometry::Ring;

/// Termination test evaluated with the time and pose of each tick.
pub type EndPredicate = Box<dyn FnMut(f64, &Pose) -> bool + Send>;

/// Ends within `radius` of `target`.
pub fn within(target: Point2D, radius: f64) -> EndPredicate {
    Box::new(move |_, pose| pose.position().distance(&target) < radius)
}

/// Ends once the robot is closer to `to` than to `from`.
///
/// With `to` being `from` mirrored around a waypoint, this fires on crossing
/// the perpendicular through the waypoint.
pub fn nearer(from: Point2D, to: Point2D) -> EndPredicate {
    Box::new(move |_, pose| {
        let p = pose.position();
        p.distance(&to) <= p.distance(&from)
    })
}

/// Ends once the robot is inside `ring`.
pub fn inside(ring: Ring) -> EndPredicate {
    Box::new(move |_, pose| ring.contains(pose.position()))
}

/// Ends once the robot is outside `ring`.
pub fn outside(ring: Ring) -> EndPredicate {
    Box::new(move |_, pose| !ring.contains(pose.position()))
}

/// Never ends.
pub fn never() -> EndPredicate {
    Box::new(|_, _| false)
}
