//! On-disk schema for the primitive library document.
//!
//! The document is JSON; field names here are the wire names. Validation
//! beyond shape (bucket coverage, ordering agreement) happens in
//! [`MotionPrimitiveLibrary::from_config`](super::MotionPrimitiveLibrary::from_config).

use serde::{Deserialize, Serialize};

/// Top-level primitive library document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Lattice cell edge length in millimetres.
    pub resolution_mm: f32,
    /// Number of heading buckets; `buckets` must cover each exactly once.
    pub num_headings: u8,
    /// Per-heading maneuver tables.
    pub buckets: Vec<BucketConfig>,
}

/// Maneuver table for one heading bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Heading bucket index in `[0, num_headings)`.
    pub heading: u8,
    /// Maneuvers available from this heading, in definition order.
    pub primitives: Vec<PrimitiveConfig>,
}

/// One maneuver as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveConfig {
    /// Stable identifier; the id sequence must agree across buckets.
    pub action_id: u16,
    /// Displacement in lattice units when the maneuver completes.
    pub end_offset: OffsetConfig,
    /// Base traversal cost in obstacle-free space.
    pub cost: f32,
    /// Body-frame poses swept while executing, millimetres; non-empty.
    pub swept_path: Vec<SampleConfig>,
}

/// Discrete end displacement of a maneuver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OffsetConfig {
    pub dx: i32,
    pub dy: i32,
    pub dtheta: i8,
}

/// One swept-path sample, relative to the maneuver's start pose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SampleConfig {
    pub x_mm: f32,
    pub y_mm: f32,
    pub theta: f32,
}
