//! Seams between the mission runner and the rest of the robot.

use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::Sender;
use tracing::debug;

use crate::control::MotionCommand;
use crate::core::Point2D;
use crate::geometry::Polygon;

use super::Mission;

/// Outgoing motion commands.
pub trait CommandSink: Send + Sync {
    fn publish(&self, command: MotionCommand);
}

impl CommandSink for Sender<MotionCommand> {
    fn publish(&self, command: MotionCommand) {
        if self.send(command).is_err() {
            debug!("Command receiver gone, dropped {:?}", command);
        }
    }
}

/// Robot consistency check; `Some(reason)` pauses control for the tick.
pub trait FaultOracle: Send + Sync {
    fn fault(&self, t: f64) -> Option<String>;
}

impl<F> FaultOracle for F
where
    F: Fn(f64) -> Option<String> + Send + Sync,
{
    fn fault(&self, t: f64) -> Option<String> {
        self(t)
    }
}

/// Site membership test.
pub trait Geofence: Send + Sync {
    /// Whether (x, y) is inside the site, at least `buffer` from its boundary.
    fn on_site(&self, x: f64, y: f64, buffer: f64) -> bool;
}

impl Geofence for Polygon {
    fn on_site(&self, x: f64, y: f64, buffer: f64) -> bool {
        self.contains_with_clearance(Point2D::new(x, y), buffer)
    }
}

/// Mission lifecycle events.
pub trait MissionReporter: Send + Sync {
    fn report(&self, mission: &Mission);
}

impl MissionReporter for Sender<Mission> {
    fn report(&self, mission: &Mission) {
        if self.send(mission.clone()).is_err() {
            debug!("Mission event receiver gone");
        }
    }
}

/// Wall clock for mission start and stop times.
pub trait Clock: Send + Sync {
    /// Seconds since the UNIX epoch.
    fn now(&self) -> f64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Ring;

    #[test]
    fn test_polygon_geofence_buffer() {
        let site = Polygon::new(Ring::rectangle(0.0, 0.0, 10.0, 10.0).unwrap(), Vec::new());
        assert!(site.on_site(5.0, 5.0, 0.2));
        assert!(site.on_site(0.3, 5.0, 0.2));
        assert!(!site.on_site(0.1, 5.0, 0.2));
        assert!(!site.on_site(-1.0, 5.0, 0.0));
    }

    #[test]
    fn test_closure_fault_oracle() {
        let oracle = |t: f64| (t > 5.0).then(|| "late".to_string());
        assert_eq!(oracle.fault(1.0), None);
        assert_eq!(FaultOracle::fault(&oracle, 6.0).as_deref(), Some("late"));
    }

    #[test]
    fn test_channel_sinks() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.publish(MotionCommand::Stop);
        assert_eq!(rx.try_recv().ok(), Some(MotionCommand::Stop));

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.report(&Mission::start("Turns", 1.0));
        assert_eq!(rx.try_recv().ok().map(|m| m.name), Some("Turns".to_string()));
    }

    #[test]
    fn test_system_clock_is_unix_time() {
        assert!(SystemClock.now() > 1.5e9);
    }
}
