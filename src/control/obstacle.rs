//! Reactive obstacle handling layered over any control.
//!
//! Only `Move` commands are intercepted. A missing obstacle reading is
//! treated as blocked and stops the robot.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::ControlConfig;
use crate::core::Pose;
use crate::error::Result;

use super::{Control, MotionCommand, ObstacleDetection};

/// Latest obstacle reading, written by the depth sensor task.
pub trait ObstacleSource: Send + Sync {
    fn obstacle(&self) -> Option<ObstacleDetection>;
}

/// Steer a move command away from blocked zones.
pub fn avoid_obstacle(
    command: MotionCommand,
    obstacle: Option<&ObstacleDetection>,
    config: &ControlConfig,
) -> MotionCommand {
    let MotionCommand::Move {
        speed,
        omega,
        timeout,
    } = command
    else {
        return command;
    };
    let Some(o) = obstacle else {
        return MotionCommand::Stop;
    };

    if o.center_blocked() {
        if o.left && o.right {
            // no free flank; turn and hope to escape
            return MotionCommand::move_at(0.0, config.omega, timeout);
        }

        // stop forward motion, allow reverse
        let speed = speed.min(0.0);

        // free centre and flank first, then the desired turn, then any free flank
        let left = if !o.left && !o.center_left {
            true
        } else if !o.right && !o.center_right {
            false
        } else if omega >= 0.0 && !o.left {
            true
        } else if omega < 0.0 && !o.right {
            false
        } else {
            !o.left
        };
        let omega = if left { config.omega } else { -config.omega };
        return MotionCommand::move_at(speed, omega, timeout);
    }

    if (omega > 0.0 && o.left) || (omega < 0.0 && o.right) {
        // don't turn into a blocked flank
        return MotionCommand::move_at(config.speed, 0.0, timeout);
    }

    command
}

/// Stop on a blocked centre zone.
pub fn stop_obstacle(command: MotionCommand, obstacle: Option<&ObstacleDetection>) -> MotionCommand {
    if !command.is_move() {
        return command;
    }
    match obstacle {
        Some(o) if !o.center_blocked() => command,
        _ => MotionCommand::Stop,
    }
}

/// Wraps a control with [`avoid_obstacle`].
pub struct AvoidObstacleControl {
    inner: Box<dyn Control>,
    source: Arc<dyn ObstacleSource>,
    config: ControlConfig,
}

impl AvoidObstacleControl {
    pub fn new(
        inner: Box<dyn Control>,
        source: Arc<dyn ObstacleSource>,
        config: ControlConfig,
    ) -> Self {
        Self {
            inner,
            source,
            config,
        }
    }
}

impl fmt::Display for AvoidObstacleControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvoidObstacleControl({})", self.inner)
    }
}

impl Control for AvoidObstacleControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        let Some(command) = self.inner.update(t, pose)? else {
            return Ok(None);
        };
        let obstacle = self.source.obstacle();
        let avoided = avoid_obstacle(command, obstacle.as_ref(), &self.config);
        if avoided != command {
            debug!("Obstacle {:?}: {:?} -> {:?}", obstacle, command, avoided);
        }
        Ok(Some(avoided))
    }

    fn end(&mut self, t: f64, pose: &Pose) -> bool {
        self.inner.end(t, pose)
    }
}

/// Wraps a control with [`stop_obstacle`].
pub struct StopObstacleControl {
    inner: Box<dyn Control>,
    source: Arc<dyn ObstacleSource>,
}

impl StopObstacleControl {
    pub fn new(inner: Box<dyn Control>, source: Arc<dyn ObstacleSource>) -> Self {
        Self { inner, source }
    }
}

impl fmt::Display for StopObstacleControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopObstacleControl({})", self.inner)
    }
}

impl Control for StopObstacleControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        let Some(command) = self.inner.update(t, pose)? else {
            return Ok(None);
        };
        Ok(Some(stop_obstacle(command, self.source.obstacle().as_ref())))
    }

    fn end(&mut self, t: f64, pose: &Pose) -> bool {
        self.inner.end(t, pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeControl2;
    use approx::assert_relative_eq;
    use parking_lot::Mutex;

    fn zones(left: bool, center_left: bool, center_right: bool, right: bool) -> ObstacleDetection {
        ObstacleDetection {
            time: 0.0,
            left,
            center_left,
            center_right,
            right,
        }
    }

    fn unpack(cmd: MotionCommand) -> (f64, f64) {
        match cmd {
            MotionCommand::Move { speed, omega, .. } => (speed, omega),
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_reading_stops() {
        let config = ControlConfig::default();
        let cmd = MotionCommand::move_at(0.2, 0.0, 1.0);
        assert_eq!(avoid_obstacle(cmd, None, &config), MotionCommand::Stop);
        assert_eq!(stop_obstacle(cmd, None), MotionCommand::Stop);
    }

    #[test]
    fn test_non_move_passes_through() {
        let config = ControlConfig::default();
        let blocked = zones(true, true, true, true);
        assert_eq!(
            avoid_obstacle(MotionCommand::Dock, Some(&blocked), &config),
            MotionCommand::Dock
        );
        assert_eq!(
            stop_obstacle(MotionCommand::Cut { power: 1.0 }, None),
            MotionCommand::Cut { power: 1.0 }
        );
    }

    #[test]
    fn test_single_free_flank() {
        let config = ControlConfig::default();
        let o = zones(false, true, false, true);
        let (speed, omega) = unpack(avoid_obstacle(
            MotionCommand::move_at(0.2, 0.0, 1.0),
            Some(&o),
            &config,
        ));
        assert!(speed <= 0.0);
        assert_relative_eq!(omega, config.omega);
    }

    #[test]
    fn test_prefers_free_centre_and_flank() {
        let config = ControlConfig::default();
        // left side fully free, desired turn is right
        let o = zones(false, false, true, true);
        let (_, omega) = unpack(avoid_obstacle(
            MotionCommand::move_at(0.2, -0.1, 1.0),
            Some(&o),
            &config,
        ));
        assert_relative_eq!(omega, config.omega);

        let o = zones(true, true, false, false);
        let (speed, omega) = unpack(avoid_obstacle(
            MotionCommand::move_at(0.2, 0.1, 1.0),
            Some(&o),
            &config,
        ));
        assert_relative_eq!(speed, 0.0);
        assert_relative_eq!(omega, -config.omega);
    }

    #[test]
    fn test_keeps_reverse_speed() {
        let config = ControlConfig::default();
        let o = zones(false, false, true, true);
        let (speed, _) = unpack(avoid_obstacle(
            MotionCommand::move_at(-0.1, 0.0, 1.0),
            Some(&o),
            &config,
        ));
        assert_relative_eq!(speed, -0.1);
    }

    #[test]
    fn test_trapped_turns_left() {
        let config = ControlConfig::default();
        let o = zones(true, true, true, true);
        let cmd = avoid_obstacle(MotionCommand::move_at(0.2, -0.1, 7.0), Some(&o), &config);
        assert_eq!(cmd, MotionCommand::move_at(0.0, config.omega, 7.0));
    }

    #[test]
    fn test_no_turn_into_blocked_flank() {
        let config = ControlConfig::default();
        let o = zones(true, false, false, false);
        let cmd = avoid_obstacle(MotionCommand::move_at(0.1, 0.15, 1.0), Some(&o), &config);
        assert_eq!(cmd, MotionCommand::move_at(config.speed, 0.0, 1.0));

        let clear = zones(false, false, false, false);
        let cmd = MotionCommand::move_at(0.1, 0.15, 1.0);
        assert_eq!(avoid_obstacle(cmd, Some(&clear), &config), cmd);
    }

    #[test]
    fn test_stop_obstacle() {
        let cmd = MotionCommand::move_at(0.2, 0.0, 1.0);
        assert_eq!(stop_obstacle(cmd, Some(&zones(true, false, false, true))), cmd);
        assert_eq!(
            stop_obstacle(cmd, Some(&zones(false, false, true, false))),
            MotionCommand::Stop
        );
    }

    struct FixedSource(Mutex<Option<ObstacleDetection>>);

    impl ObstacleSource for FixedSource {
        fn obstacle(&self) -> Option<ObstacleDetection> {
            *self.0.lock()
        }
    }

    #[test]
    fn test_decorators_read_source_and_delegate_end() {
        let source = Arc::new(FixedSource(Mutex::new(Some(zones(
            false, false, false, false,
        )))));
        let inner = Box::new(TimeControl2::new(0.2, 0.0, 5.0));
        let mut c = StopObstacleControl::new(inner, source.clone());
        let pose = Pose::default();

        assert_eq!(
            c.update(1.0, &pose).unwrap(),
            Some(MotionCommand::move_at(0.2, 0.0, 1.0))
        );
        *source.0.lock() = Some(zones(false, true, false, false));
        assert_eq!(c.update(2.0, &pose).unwrap(), Some(MotionCommand::Stop));
        assert!(!c.end(4.0, &pose));
        assert!(c.end(5.0, &pose));

        let inner = Box::new(TimeControl2::new(0.2, 0.0, 5.0));
        let mut c = AvoidObstacleControl::new(inner, source, ControlConfig::default());
        let (speed, omega) = unpack(c.update(2.0, &pose).unwrap().unwrap());
        assert_relative_eq!(speed, 0.0);
        assert!(omega < 0.0);
    }
}
