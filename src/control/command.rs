//! Commands sent to the robot and obstacle readings received from it.

use serde::{Deserialize, Serialize};

/// Motion command types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MotionCommand {
    /// Drive with constant velocity until `timeout` on the robot clock
    Move {
        /// Linear velocity in m/s
        speed: f64,
        /// Angular velocity in rad/s (positive = CCW)
        omega: f64,
        /// Absolute robot-clock expiry; `<= 0` disables the check
        timeout: f64,
    },

    /// Stop motion
    Stop,

    /// Start the docking manoeuvre
    Dock,

    /// Reset the motor controller
    Reset,

    /// Set cutter power
    Cut {
        /// Cutter power, 0 = off
        power: f64,
    },
}

impl MotionCommand {
    /// Move command with the given velocities.
    pub fn move_at(speed: f64, omega: f64, timeout: f64) -> Self {
        Self::Move {
            speed,
            omega,
            timeout,
        }
    }

    /// Get command type as string
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Stop => "stop",
            Self::Dock => "dock",
            Self::Reset => "reset",
            Self::Cut { .. } => "cut",
        }
    }

    /// Expiry of a move command.
    pub fn timeout(&self) -> Option<f64> {
        match self {
            Self::Move { timeout, .. } => Some(*timeout),
            _ => None,
        }
    }

    /// Replace the expiry of a move command; other commands are unchanged.
    pub fn with_timeout(self, timeout: f64) -> Self {
        match self {
            Self::Move { speed, omega, .. } => Self::Move {
                speed,
                omega,
                timeout,
            },
            other => other,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Self::Move { .. })
    }
}

/// Blocked zones of one depth-camera read, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObstacleDetection {
    /// Time of the read (seconds)
    pub time: f64,
    pub left: bool,
    pub center_left: bool,
    pub center_right: bool,
    pub right: bool,
}

impl ObstacleDetection {
    /// Reading with every zone free.
    pub fn clear(time: f64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    /// Either centre zone is blocked.
    pub fn center_blocked(&self) -> bool {
        self.center_left || self.center_right
    }
}
