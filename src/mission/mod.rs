//! Mission execution: lifecycle, runner loop, supervisor and catalog.

pub mod catalog;
mod context;
mod control;
pub mod interfaces;
mod runner;
mod status;

pub use catalog::{build_mission, MISSIONS};
pub use context::RobotContext;
pub use control::{MissionCommand, MissionControl};
pub use interfaces::{Clock, CommandSink, FaultOracle, Geofence, MissionReporter, SystemClock};
pub use runner::MissionRunner;
pub use status::{Mission, MissionState};
