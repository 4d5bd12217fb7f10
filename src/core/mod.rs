//! Foundation layer: math primitives and continuous pose types.

pub mod math;
pub mod types;

pub use types::{Point2D, Pose2D};
