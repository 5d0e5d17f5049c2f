//! Path and coverage planning inside the site fence.

pub mod coverage;
mod visibility;

pub use coverage::{FenceShrink, LapRecord};
pub use visibility::{path_length, VisibilityPlanner};
