//! # Marga
//!
//! Mission control and navigation for an autonomous mowing robot.
//!
//! ## Overview
//!
//! A mission is a single [`Control`](control::Control) driven once per pose
//! sample by the [`MissionRunner`](mission::MissionRunner). Missions are
//! composed from small steering behaviours:
//!
//! - **Steering**: point, line, heading and arc following with shared gain laws
//! - **Composition**: `CompositeControl` pulls behaviours lazily from a
//!   `ControlSequence`, so missions may be unbounded
//! - **Obstacles**: decorators that steer around or stop at blocked zones
//! - **Planning**: visibility-graph paths inside the site fence and
//!   shrinking-ring area coverage
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marga::config::MargaConfig;
//! use marga::mission::{build_mission, MissionRunner, RobotContext};
//!
//! let config = MargaConfig::default();
//! let context = Arc::new(RobotContext::new());
//! let mut control = build_mission("RectangleLoop", &config, context.clone())?;
//! let runner = MissionRunner::new(context, command_tx, event_tx, config.runner);
//! let mission = runner.run("RectangleLoop", &mut control, &pose_rx, &cancel);
//! ```
//!
//! ## Coordinate System
//!
//! Local site frame in metres:
//! - X: East
//! - Y: North
//! - Theta: Heading in radians, CCW positive from +X, normalised to (-π, π]

pub mod config;
pub mod control;
pub mod core;
pub mod error;
pub mod geometry;
pub mod mission;
pub mod planning;
pub mod sim;

pub use config::MargaConfig;
pub use control::{CompositeControl, Control, ControlSequence, MotionCommand};
pub use core::{Point2D, Pose, PoseSample};
pub use error::{MargaError, Result};
pub use mission::{Mission, MissionControl, MissionRunner, RobotContext};
