//! Open-loop controllers: fixed velocities ended by time or distance.

use std::fmt;

use crate::core::Pose;
use crate::error::{MargaError, Result};

use super::{Control, MotionCommand};

/// Constant velocity for `duration` seconds from the first update.
#[derive(Debug)]
pub struct TimeControl {
    speed: f64,
    omega: f64,
    duration: f64,
    t0: Option<f64>,
}

impl TimeControl {
    pub fn new(speed: f64, omega: f64, duration: f64) -> Self {
        Self {
            speed,
            omega,
            duration,
            t0: None,
        }
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimeControl({:.2},{:.2},{:.1}s)",
            self.speed, self.omega, self.duration
        )
    }
}

impl Control for TimeControl {
    fn update(&mut self, t: f64, _pose: &Pose) -> Result<Option<MotionCommand>> {
        self.t0.get_or_insert(t);
        Ok(Some(MotionCommand::move_at(self.speed, self.omega, t)))
    }

    fn end(&mut self, t: f64, _pose: &Pose) -> bool {
        self.t0.is_some_and(|t0| t >= t0 + self.duration)
    }
}

/// Constant velocity until the absolute time `end_time`.
#[derive(Debug)]
pub struct TimeControl2 {
    speed: f64,
    omega: f64,
    end_time: f64,
}

impl TimeControl2 {
    pub fn new(speed: f64, omega: f64, end_time: f64) -> Self {
        Self {
            speed,
            omega,
            end_time,
        }
    }
}

impl fmt::Display for TimeControl2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimeControl2({:.2},{:.2},{:.1})",
            self.speed, self.omega, self.end_time
        )
    }
}

impl Control for TimeControl2 {
    fn update(&mut self, t: f64, _pose: &Pose) -> Result<Option<MotionCommand>> {
        Ok(Some(MotionCommand::move_at(self.speed, self.omega, t)))
    }

    fn end(&mut self, t: f64, _pose: &Pose) -> bool {
        t >= self.end_time
    }
}

/// Straight at `speed` until `distance` from the pose of the first update.
#[derive(Debug)]
pub struct SpeedDistanceControl {
    speed: f64,
    distance: f64,
    start: Option<Pose>,
}

impl SpeedDistanceControl {
    pub fn new(speed: f64, distance: f64) -> Self {
        Self {
            speed,
            distance,
            start: None,
        }
    }
}

impl fmt::Display for SpeedDistanceControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpeedDistanceControl({:.2},{:.2})",
            self.speed, self.distance
        )
    }
}

impl Control for SpeedDistanceControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        self.start.get_or_insert(*pose);
        Ok(Some(MotionCommand::move_at(self.speed, 0.0, t)))
    }

    fn end(&mut self, _t: f64, pose: &Pose) -> bool {
        self.start
            .is_some_and(|start| start.distance(pose) >= self.distance)
    }
}

/// Ends immediately. Used to obtain the current time and pose through the
/// resume value of a control sequence.
#[derive(Debug, Default)]
pub struct GetStateControl;

impl fmt::Display for GetStateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GetStateControl")
    }
}

impl Control for GetStateControl {
    fn update(&mut self, _t: f64, _pose: &Pose) -> Result<Option<MotionCommand>> {
        Err(MargaError::Contract(
            "GetStateControl update() must not be called".to_string(),
        ))
    }

    fn end(&mut self, _t: f64, _pose: &Pose) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_control_starts_on_first_update() {
        let pose = Pose::default();
        let mut c = TimeControl::new(0.1, 0.0, 3.0);
        assert!(!c.end(100.0, &pose));
        c.update(10.0, &pose).unwrap();
        assert!(!c.end(12.9, &pose));
        assert!(c.end(13.0, &pose));
        // later updates keep the first start time
        c.update(12.0, &pose).unwrap();
        assert!(c.end(13.0, &pose));
    }

    #[test]
    fn test_time_control2_absolute() {
        let pose = Pose::default();
        let mut c = TimeControl2::new(0.0, 0.2, 5.0);
        assert!(!c.end(4.99, &pose));
        assert!(c.end(5.0, &pose));
        assert_eq!(
            c.update(1.0, &pose).unwrap(),
            Some(MotionCommand::move_at(0.0, 0.2, 1.0))
        );
    }

    #[test]
    fn test_speed_distance_control() {
        let mut c = SpeedDistanceControl::new(-0.1, 0.5);
        let start = Pose::new(1.0, 1.0, 0.0);
        assert!(!c.end(0.0, &start));
        c.update(0.0, &start).unwrap();
        assert!(!c.end(1.0, &Pose::new(0.6, 1.0, 0.0)));
        assert!(c.end(2.0, &Pose::new(0.5, 1.0, 0.0)));
    }

    #[test]
    fn test_get_state_control() {
        let mut c = GetStateControl;
        assert!(c.end(0.0, &Pose::default()));
        assert!(matches!(
            c.update(0.0, &Pose::default()),
            Err(MargaError::Contract(_))
        ));
    }
}
