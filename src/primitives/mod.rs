//! Motion primitive library: the per-heading maneuver tables the planner
//! searches over.
//!
//! A library is loaded once from a JSON document, validated, and then
//! shared immutably (typically behind `Arc`) by every planner instance.

pub mod config;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::Pose2D;
use crate::error::{MargaError, Result};
use crate::lattice::{DiscreteState, Lattice};

pub use config::LibraryConfig;

/// Stable identifier of a maneuver, shared across heading buckets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActionId(pub u16);

impl ActionId {
    /// Raw numeric id.
    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }
}

/// Discrete displacement produced by completing a maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOffset {
    /// Cell displacement along x
    pub dx: i32,
    /// Cell displacement along y
    pub dy: i32,
    /// Heading bucket displacement, wrapped modulo the bucket count
    pub dheading: i8,
}

/// One maneuver from a specific heading bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionPrimitive {
    action_id: ActionId,
    end_offset: EndOffset,
    base_cost: f32,
    swept_path: Vec<Pose2D>,
}

impl MotionPrimitive {
    /// Stable maneuver id.
    #[inline]
    pub fn action_id(&self) -> ActionId {
        self.action_id
    }

    /// Discrete displacement on completion.
    #[inline]
    pub fn end_offset(&self) -> EndOffset {
        self.end_offset
    }

    /// Traversal cost in obstacle-free space.
    #[inline]
    pub fn base_cost(&self) -> f32 {
        self.base_cost
    }

    /// Body-frame poses swept while executing, relative to the start pose.
    #[inline]
    pub fn swept_path(&self) -> &[Pose2D] {
        &self.swept_path
    }

    /// State reached by executing this maneuver from `state`.
    #[inline]
    pub fn apply_to(&self, state: &DiscreteState, num_headings: u8) -> DiscreteState {
        let h = state.heading as i16 + self.end_offset.dheading as i16;
        DiscreteState {
            x: state.x + self.end_offset.dx,
            y: state.y + self.end_offset.dy,
            heading: h.rem_euclid(num_headings as i16) as u8,
        }
    }
}

/// Validated, immutable set of maneuver tables plus the lattice they are
/// defined on.
#[derive(Debug, Clone)]
pub struct MotionPrimitiveLibrary {
    lattice: Lattice,
    /// Shared per-bucket action ordering (definition order).
    action_order: Vec<ActionId>,
    /// Bucket-major arena: `primitives[heading * actions_per_heading + i]`.
    primitives: Vec<MotionPrimitive>,
    min_cost_per_cell: f32,
    max_swept_samples: usize,
}

impl MotionPrimitiveLibrary {
    /// Load and validate a library from a JSON document on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: LibraryConfig = serde_json::from_str(&text)?;
        Self::from_config(config)
    }

    /// Build and validate a library from an in-memory configuration.
    ///
    /// Fails if a heading bucket is missing or duplicated, bucket sizes or
    /// action-id orderings disagree, any swept path is empty, any cost is
    /// not a non-negative finite number, or the lattice parameters are
    /// invalid.
    pub fn from_config(config: LibraryConfig) -> Result<Self> {
        let lattice = Lattice::new(config.resolution_mm, config.num_headings)?;
        let n = config.num_headings as usize;

        if config.buckets.len() != n {
            return Err(MargaError::Config(format!(
                "expected {n} heading buckets, got {}",
                config.buckets.len()
            )));
        }

        let mut tables: Vec<Option<Vec<MotionPrimitive>>> = vec![None; n];
        let mut action_order: Option<Vec<ActionId>> = None;

        for bucket in config.buckets {
            let h = bucket.heading as usize;
            if bucket.heading >= config.num_headings {
                return Err(MargaError::Config(format!(
                    "bucket heading {} out of range (num_headings {})",
                    bucket.heading, config.num_headings
                )));
            }
            if tables[h].is_some() {
                return Err(MargaError::Config(format!(
                    "duplicate bucket for heading {}",
                    bucket.heading
                )));
            }

            let order: Vec<ActionId> =
                bucket.primitives.iter().map(|p| ActionId(p.action_id)).collect();
            match &action_order {
                None => {
                    for (i, a) in order.iter().enumerate() {
                        if order[..i].contains(a) {
                            return Err(MargaError::Config(format!(
                                "duplicate action id {} in heading {}",
                                a.raw(),
                                bucket.heading
                            )));
                        }
                    }
                    action_order = Some(order);
                }
                Some(expected) => {
                    if *expected != order {
                        return Err(MargaError::Config(format!(
                            "action ordering for heading {} disagrees with heading 0",
                            bucket.heading
                        )));
                    }
                }
            }

            let mut table = Vec::with_capacity(bucket.primitives.len());
            for p in bucket.primitives {
                if p.swept_path.is_empty() {
                    return Err(MargaError::Config(format!(
                        "action {} in heading {} has an empty swept path",
                        p.action_id, bucket.heading
                    )));
                }
                if !(p.cost.is_finite() && p.cost >= 0.0) {
                    return Err(MargaError::Config(format!(
                        "action {} in heading {} has invalid cost {}",
                        p.action_id, bucket.heading, p.cost
                    )));
                }
                table.push(MotionPrimitive {
                    action_id: ActionId(p.action_id),
                    end_offset: EndOffset {
                        dx: p.end_offset.dx,
                        dy: p.end_offset.dy,
                        dheading: p.end_offset.dtheta,
                    },
                    base_cost: p.cost,
                    swept_path: p
                        .swept_path
                        .iter()
                        .map(|s| Pose2D::new(s.x_mm, s.y_mm, s.theta))
                        .collect(),
                });
            }
            tables[h] = Some(table);
        }

        // bucket count matched and duplicates rejected, so every slot is
        // filled at this point
        let primitives: Vec<MotionPrimitive> =
            tables.into_iter().flatten().flatten().collect();
        let action_order = action_order.unwrap_or_default();

        let min_cost_per_cell = primitives
            .iter()
            .filter_map(|p| {
                let cells = ((p.end_offset.dx * p.end_offset.dx
                    + p.end_offset.dy * p.end_offset.dy) as f32)
                    .sqrt();
                (cells > 0.0).then(|| p.base_cost / cells)
            })
            .fold(f32::INFINITY, f32::min);
        let min_cost_per_cell = if min_cost_per_cell.is_finite() {
            min_cost_per_cell
        } else {
            0.0
        };

        let max_swept_samples = primitives
            .iter()
            .map(|p| p.swept_path.len())
            .max()
            .unwrap_or(0);

        Ok(Self {
            lattice,
            action_order,
            primitives,
            min_cost_per_cell,
            max_swept_samples,
        })
    }

    /// The lattice this library is defined on.
    #[inline]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Number of heading buckets.
    #[inline]
    pub fn num_headings(&self) -> u8 {
        self.lattice.num_headings()
    }

    /// Number of maneuvers available from each heading bucket.
    #[inline]
    pub fn actions_per_heading(&self) -> usize {
        self.action_order.len()
    }

    /// Shared per-bucket action ordering.
    #[inline]
    pub fn action_order(&self) -> &[ActionId] {
        &self.action_order
    }

    /// Raw-geometry lookup of one maneuver, independent of live obstacles.
    pub fn primitive(&self, heading: u8, action: ActionId) -> Option<&MotionPrimitive> {
        if heading >= self.num_headings() {
            return None;
        }
        let pos = self.action_order.iter().position(|a| *a == action)?;
        Some(&self.primitives[heading as usize * self.action_order.len() + pos])
    }

    /// Maneuver at `index` in definition order for a heading bucket.
    ///
    /// Panics if out of range; callers iterate `0..actions_per_heading()`.
    #[inline]
    pub(crate) fn primitive_at(&self, heading: u8, index: usize) -> &MotionPrimitive {
        &self.primitives[heading as usize * self.action_order.len() + index]
    }

    /// Lower bound on cost per lattice cell of displacement, used as an
    /// admissible search heuristic rate. Zero when no maneuver translates.
    #[inline]
    pub fn min_cost_per_cell(&self) -> f32 {
        self.min_cost_per_cell
    }

    /// Longest swept path in the library, in samples.
    #[inline]
    pub(crate) fn max_swept_samples(&self) -> usize {
        self.max_swept_samples
    }

    /// Wrap the library for sharing across planners.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
