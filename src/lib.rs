//! MargaPlan - Lattice motion planning for mobile robots
//!
//! Turns a continuous start/goal pose into an executable sequence of
//! discrete drive maneuvers on a configurable lattice, while accounting
//! for obstacles that appear or are cleared between planning calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               planning/                 │  ← search, safety, salvage
//! │   (successor expansion, plan, planner)  │
//! └─────────────────────────────────────────┘
//!            │                  │
//! ┌───────────────────┐ ┌───────────────────┐
//! │    primitives/    │ │    obstacles/     │  ← maneuver tables,
//! │ (library, config) │ │ (regions, penalty)│    weighted regions
//! └───────────────────┘ └───────────────────┘
//!            │                  │
//! ┌─────────────────────────────────────────┐
//! │           lattice/  and  core/          │  ← discretization,
//! │      (states, ids, poses, math)         │    foundation types
//! └─────────────────────────────────────────┘
//! ```
//!
//! The [`MotionPrimitiveLibrary`] (with its [`Lattice`]) is loaded once
//! from a JSON document and shared immutably behind `Arc`. The
//! [`ObstacleSet`] is owned by the caller and borrowed per planning call,
//! so the world cannot change underneath a running search. The
//! [`Planner`] owns its start, goal and current [`Plan`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use marga_plan::{
//!     LibraryConfig, MotionPrimitiveLibrary, ObstacleSet, Planner, PlannerConfig, Pose2D,
//! };
//!
//! let json = r#"{
//!     "resolution_mm": 100.0,
//!     "num_headings": 1,
//!     "buckets": [{
//!         "heading": 0,
//!         "primitives": [{
//!             "action_id": 0,
//!             "end_offset": { "dx": 1, "dy": 0, "dtheta": 0 },
//!             "cost": 1.0,
//!             "swept_path": [
//!                 { "x_mm": 0.0, "y_mm": 0.0, "theta": 0.0 },
//!                 { "x_mm": 100.0, "y_mm": 0.0, "theta": 0.0 }
//!             ]
//!         }]
//!     }]
//! }"#;
//! let config: LibraryConfig = serde_json::from_str(json)?;
//! let library = Arc::new(MotionPrimitiveLibrary::from_config(config)?);
//!
//! let mut planner = Planner::new(library, PlannerConfig::default());
//! let obstacles = ObstacleSet::new();
//! assert!(planner.set_start(&Pose2D::new(0.0, 0.0, 0.0), &obstacles));
//! assert!(planner.set_goal(&Pose2D::new(300.0, 0.0, 0.0), &obstacles));
//! assert!(planner.replan(&obstacles));
//! assert_eq!(planner.plan().len(), 3);
//! # Ok::<(), marga_plan::MargaError>(())
//! ```

// ============================================================================
// Layer 1: Foundation (no internal deps)
// ============================================================================
pub mod core;
pub mod error;

// ============================================================================
// Layer 2: Discretization (depends on core)
// ============================================================================
pub mod lattice;

// ============================================================================
// Layer 3: World model (depends on core, lattice)
// ============================================================================
pub mod obstacles;
pub mod primitives;

// ============================================================================
// Layer 4: Search (depends on all layers)
// ============================================================================
pub mod planning;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use crate::core::types::{Point2D, Pose2D};
pub use error::{MargaError, Result};
pub use lattice::{DiscreteState, Lattice, StateId};
pub use obstacles::{Obstacle, ObstacleId, ObstacleSet, OrientedRect, Penalty};
pub use planning::{
    Plan, Planner, PlannerConfig, SalvageOutcome, Successor, SuccessorCursor,
    SuccessorGenerator, UNSAFE_COST,
};
pub use primitives::{
    ActionId, EndOffset, LibraryConfig, MotionPrimitive, MotionPrimitiveLibrary,
};
