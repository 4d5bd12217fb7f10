//! The plan artifact produced by a search.

use serde::{Deserialize, Serialize};

use crate::lattice::DiscreteState;
use crate::primitives::ActionId;

/// A maneuver sequence anchored at a discrete start state.
///
/// Per-action costs are the costs at planning time (base plus any finite
/// penalty then in effect); re-validation against the current world is the
/// planner's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    start: DiscreteState,
    actions: Vec<ActionId>,
    action_costs: Vec<f32>,
    total_cost: f32,
}

impl Plan {
    /// An empty plan anchored at `start`.
    pub fn empty(start: DiscreteState) -> Self {
        Self {
            start,
            actions: Vec::new(),
            action_costs: Vec::new(),
            total_cost: 0.0,
        }
    }

    /// Build a plan from a maneuver sequence and its per-action costs.
    pub fn new(start: DiscreteState, actions: Vec<ActionId>, action_costs: Vec<f32>) -> Self {
        debug_assert_eq!(actions.len(), action_costs.len());
        let total_cost = action_costs.iter().sum();
        Self {
            start,
            actions,
            action_costs,
            total_cost,
        }
    }

    /// Anchor state the first action executes from.
    #[inline]
    pub fn start(&self) -> DiscreteState {
        self.start
    }

    /// Maneuvers in execution order.
    #[inline]
    pub fn actions(&self) -> &[ActionId] {
        &self.actions
    }

    /// Cost of each action at planning time.
    #[inline]
    pub fn action_costs(&self) -> &[f32] {
        &self.action_costs
    }

    /// Sum of all action costs.
    #[inline]
    pub fn total_cost(&self) -> f32 {
        self.total_cost
    }

    /// Number of actions.
    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Sum of action costs from `index` to the end.
    pub fn remaining_cost(&self, index: usize) -> f32 {
        self.action_costs
            .get(index.min(self.len())..)
            .map(|tail| tail.iter().sum())
            .unwrap_or(0.0)
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::empty(DiscreteState::new(0, 0, 0))
    }
}
