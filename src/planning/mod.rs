//! Search layer: successor expansion, the plan artifact and the planner.

pub mod plan;
pub mod planner;
pub mod successors;

pub use plan::Plan;
pub use planner::{Planner, PlannerConfig, SalvageOutcome, UNSAFE_COST};
pub use successors::{Successor, SuccessorCursor, SuccessorGenerator};
