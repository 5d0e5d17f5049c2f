//! Shared robot state read by controls and the mission runner.
//!
//! Each field has a single writer:
//! - `obstacle`: depth sensor task
//! - `robot_time`: driver status task
//! - `mission`: mission runner
//!
//! Values are replaced whole and copied out on read.

use parking_lot::RwLock;

use crate::control::{ObstacleDetection, ObstacleSource};

use super::interfaces::FaultOracle;
use super::Mission;

#[derive(Debug, Default)]
pub struct RobotContext {
    obstacle: RwLock<Option<ObstacleDetection>>,
    robot_time: RwLock<Option<f64>>,
    mission: RwLock<Option<Mission>>,
}

impl RobotContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn obstacle(&self) -> Option<ObstacleDetection> {
        *self.obstacle.read()
    }

    pub fn set_obstacle(&self, obstacle: Option<ObstacleDetection>) {
        *self.obstacle.write() = obstacle;
    }

    /// Latest robot clock reading in seconds.
    pub fn robot_time(&self) -> Option<f64> {
        *self.robot_time.read()
    }

    pub fn set_robot_time(&self, time: f64) {
        *self.robot_time.write() = Some(time);
    }

    /// Current or last mission.
    pub fn mission(&self) -> Option<Mission> {
        self.mission.read().clone()
    }

    pub fn set_mission(&self, mission: Mission) {
        *self.mission.write() = Some(mission);
    }

    /// Id of the current or last mission, empty when none ran yet.
    pub fn mission_id(&self) -> String {
        self.mission
            .read()
            .as_ref()
            .map(Mission::mission_id)
            .unwrap_or_default()
    }
}

impl ObstacleSource for RobotContext {
    fn obstacle(&self) -> Option<ObstacleDetection> {
        RobotContext::obstacle(self)
    }
}

impl FaultOracle for RobotContext {
    fn fault(&self, _t: f64) -> Option<String> {
        if self.robot_time().is_none() {
            return Some("No robot time".to_string());
        }
        None
    }
}
