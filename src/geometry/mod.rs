//! Planar polygon geometry for site fences and coverage rings.
//!
//! Rings are simple closed polylines; polygons are an exterior ring with
//! holes. Offsetting (`Ring::offset`) uses mitred joins and may split a ring
//! into several disjoint rings.

mod offset;
mod polygon;
mod ring;
pub mod segment;

pub use polygon::Polygon;
pub use ring::Ring;
