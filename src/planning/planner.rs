//! Lattice A* planner with plan safety re-validation and salvage.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::types::Pose2D;
use crate::lattice::{DiscreteState, StateId};
use crate::obstacles::{ObstacleSet, Penalty};
use crate::planning::plan::Plan;
use crate::planning::successors::SuccessorGenerator;
use crate::primitives::{ActionId, MotionPrimitiveLibrary};

/// Finite sentinel returned by [`Planner::apply_action`] when a validity
/// check finds the maneuver impassable. Large enough to dominate any real
/// plan cost while staying usable in arithmetic.
pub const UNSAFE_COST: f32 = 1.0e9;

/// Search limits of the planner.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum number of state expansions per search.
    ///
    /// Bounds search effort on cluttered or blocked worlds.
    pub max_expansions: usize,

    /// Cells of slack around the start/goal bounding box.
    ///
    /// Keeps the reachable region finite even on an obstacle-free lattice
    /// while leaving room for detours.
    pub search_margin_cells: i32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_expansions: 100_000,
            search_margin_cells: 64,
        }
    }
}

/// Result of a salvage pass over a partially unsafe plan.
#[derive(Debug, Clone)]
pub struct SalvageOutcome {
    /// True when every remaining action was still executable.
    pub safe: bool,
    /// State reached at the end of the salvaged prefix.
    pub last_safe_state: DiscreteState,
    /// Still-executable prefix of the remaining plan.
    pub salvaged_prefix: Plan,
}

/// What the last successful search was computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchFingerprint {
    start: DiscreteState,
    goal: DiscreteState,
    revision: u64,
}

/// Lattice motion planner.
///
/// Owns its start, goal and current [`Plan`]; shares the primitive library
/// behind `Arc` and borrows the obstacle world per call, so the world
/// cannot change underneath a running search.
pub struct Planner {
    config: PlannerConfig,
    library: Arc<MotionPrimitiveLibrary>,
    generator: SuccessorGenerator,
    start: DiscreteState,
    start_pose: Pose2D,
    goal: DiscreteState,
    goal_pose: Pose2D,
    plan: Plan,
    final_cost: f32,
    last_search: Option<SearchFingerprint>,
}

impl Planner {
    /// Create a planner over a shared primitive library.
    pub fn new(library: Arc<MotionPrimitiveLibrary>, config: PlannerConfig) -> Self {
        let origin = DiscreteState::new(0, 0, 0);
        Self {
            config,
            generator: SuccessorGenerator::new(Arc::clone(&library)),
            library,
            start: origin,
            start_pose: Pose2D::identity(),
            goal: origin,
            goal_pose: Pose2D::identity(),
            plan: Plan::empty(origin),
            final_cost: 0.0,
            last_search: None,
        }
    }

    /// Set the start pose. Fails, leaving the stored start unchanged, if
    /// the pose lies inside an impassable region.
    ///
    /// The raw pose is tested rather than the snapped cell center, so a
    /// pose just outside an obstacle never fails through rounding.
    pub fn set_start(&mut self, pose: &Pose2D, obstacles: &ObstacleSet) -> bool {
        if obstacles.contains_point(&pose.position()).is_impassable() {
            return false;
        }
        self.start = self.library.lattice().to_discrete(pose);
        self.start_pose = *pose;
        true
    }

    /// Set the goal pose, with the same validity contract as
    /// [`set_start`](Self::set_start).
    pub fn set_goal(&mut self, pose: &Pose2D, obstacles: &ObstacleSet) -> bool {
        if obstacles.contains_point(&pose.position()).is_impassable() {
            return false;
        }
        self.goal = self.library.lattice().to_discrete(pose);
        self.goal_pose = *pose;
        true
    }

    /// Whether the stored goal is still outside every impassable region.
    pub fn goal_is_valid(&self, obstacles: &ObstacleSet) -> bool {
        !obstacles
            .contains_point(&self.goal_pose.position())
            .is_impassable()
    }

    /// Discard incremental search bookkeeping; the next [`replan`]
    /// performs a full search. The stored plan survives.
    ///
    /// [`replan`]: Self::replan
    pub fn set_replan_from_scratch(&mut self) {
        self.last_search = None;
    }

    /// Search for a plan from start to goal.
    ///
    /// Returns true and replaces the stored plan on success; on failure
    /// the previous plan is untouched. A repeated call with unchanged
    /// start, goal and obstacle revision reuses the previous result
    /// without searching.
    pub fn replan(&mut self, obstacles: &ObstacleSet) -> bool {
        let fingerprint = SearchFingerprint {
            start: self.start,
            goal: self.goal,
            revision: obstacles.revision(),
        };
        if self.last_search.as_ref() == Some(&fingerprint) {
            debug!("world unchanged since last search, reusing plan");
            return true;
        }

        match self.search(obstacles) {
            Some(plan) => {
                self.final_cost = plan.total_cost();
                self.plan = plan;
                self.last_search = Some(fingerprint);
                true
            }
            None => false,
        }
    }

    /// The current plan. Empty until the first successful [`replan`].
    ///
    /// [`replan`]: Self::replan
    #[inline]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Total cost of the current plan at planning time.
    #[inline]
    pub fn final_cost(&self) -> f32 {
        self.final_cost
    }

    /// Current discrete start state.
    #[inline]
    pub fn start(&self) -> DiscreteState {
        self.start
    }

    /// Current discrete goal state.
    #[inline]
    pub fn goal(&self) -> DiscreteState {
        self.goal
    }

    /// Replay a plan against the current world.
    ///
    /// False if any action has become impassable or its current cost
    /// exceeds its base cost by more than `cost_threshold`.
    pub fn plan_is_safe(
        &self,
        plan: &Plan,
        cost_threshold: f32,
        obstacles: &ObstacleSet,
    ) -> bool {
        let mut state = StateId::pack(&plan.start());
        for &action in plan.actions() {
            let heading = state.unpack().heading;
            let base = match self.library.primitive(heading, action) {
                Some(p) => p.base_cost(),
                None => return false,
            };
            let cost = self.apply_action(action, &mut state, true, obstacles);
            if cost >= UNSAFE_COST || cost - base > cost_threshold {
                return false;
            }
        }
        true
    }

    /// Replay the tail of a plan starting at `from_index`, salvaging the
    /// longest still-executable prefix.
    ///
    /// `safe` is false iff the salvaged prefix is shorter than the
    /// remaining plan; `last_safe_state` is the state reached at the end
    /// of the prefix.
    pub fn plan_is_safe_from(
        &self,
        plan: &Plan,
        cost_threshold: f32,
        from_index: usize,
        obstacles: &ObstacleSet,
    ) -> SalvageOutcome {
        let from_index = from_index.min(plan.len());
        let mut state = StateId::pack(&plan.start());
        for &action in &plan.actions()[..from_index] {
            self.apply_action(action, &mut state, false, obstacles);
        }

        let prefix_start = state.unpack();
        let mut last_safe_state = prefix_start;
        let mut actions = Vec::new();
        let mut costs = Vec::new();
        let mut safe = true;

        for &action in &plan.actions()[from_index..] {
            let heading = state.unpack().heading;
            let base = match self.library.primitive(heading, action) {
                Some(p) => p.base_cost(),
                None => {
                    safe = false;
                    break;
                }
            };
            let cost = self.apply_action(action, &mut state, true, obstacles);
            if cost >= UNSAFE_COST || cost - base > cost_threshold {
                safe = false;
                break;
            }
            actions.push(action);
            costs.push(cost);
            last_safe_state = state.unpack();
        }

        SalvageOutcome {
            safe,
            last_safe_state,
            salvaged_prefix: Plan::new(prefix_start, actions, costs),
        }
    }

    /// Advance `state` through one maneuver.
    ///
    /// With `check_validity` the returned cost is base plus the current
    /// penalty along the swept path, or [`UNSAFE_COST`] when impassable.
    /// Without it the raw base cost is returned and no obstacle query is
    /// made (pure geometric replay). An action unknown for the state's
    /// heading returns [`UNSAFE_COST`] and leaves the state unchanged.
    pub fn apply_action(
        &self,
        action: ActionId,
        state: &mut StateId,
        check_validity: bool,
        obstacles: &ObstacleSet,
    ) -> f32 {
        let current = state.unpack();
        let Some(prim) = self.library.primitive(current.heading, action) else {
            return UNSAFE_COST;
        };
        let next = prim.apply_to(&current, self.library.num_headings());

        let cost = if check_validity {
            let anchor = self.library.lattice().to_continuous(&current);
            let world: Vec<Pose2D> = prim
                .swept_path()
                .iter()
                .map(|s| anchor.compose(s))
                .collect();
            match obstacles.penalty_along(&world) {
                Penalty::Impassable => UNSAFE_COST,
                Penalty::Finite(p) => prim.base_cost() + p,
            }
        } else {
            prim.base_cost()
        };

        *state = StateId::pack(&next);
        cost
    }

    /// Index of the plan action whose swept path passes closest to
    /// `pose`, and that distance in millimetres.
    ///
    /// A pose beyond the end of the plan clamps to the final action. For
    /// an empty plan the index is 0 and the distance is measured to the
    /// anchor cell center.
    pub fn find_closest_plan_segment(&self, plan: &Plan, pose: &Pose2D) -> (usize, f32) {
        let lattice = self.library.lattice();
        let target = pose.position();
        let mut state = plan.start();

        if plan.is_empty() {
            let center = lattice.to_continuous(&state);
            return (0, center.position().distance(&target));
        }

        let mut best_index = 0usize;
        let mut best_sq = f32::INFINITY;
        for (index, &action) in plan.actions().iter().enumerate() {
            let Some(prim) = self.library.primitive(state.heading, action) else {
                break;
            };
            let anchor = lattice.to_continuous(&state);
            for sample in prim.swept_path() {
                let world = anchor.transform_point(&sample.position());
                let d_sq = world.distance_squared(&target);
                if d_sq < best_sq {
                    best_sq = d_sq;
                    best_index = index;
                }
            }
            state = prim.apply_to(&state, lattice.num_headings());
        }
        (best_index, best_sq.sqrt())
    }

    fn heuristic(&self, from: &DiscreteState, to: &DiscreteState) -> f32 {
        let dx = (to.x - from.x) as f32;
        let dy = (to.y - from.y) as f32;
        self.library.min_cost_per_cell() * (dx * dx + dy * dy).sqrt()
    }

    /// A* over the lattice, lowest f first, ties broken by insertion
    /// sequence so expansion order is deterministic.
    fn search(&self, obstacles: &ObstacleSet) -> Option<Plan> {
        let start_id = StateId::pack(&self.start);
        let goal_id = StateId::pack(&self.goal);
        let bounds = SearchBounds::around(&self.start, &self.goal, self.config.search_margin_cells);

        let mut open = BinaryHeap::new();
        let mut came_from: HashMap<StateId, (StateId, ActionId, f32)> = HashMap::new();
        let mut g_score: HashMap<StateId, f32> = HashMap::new();
        let mut seq = 0u64;

        g_score.insert(start_id, 0.0);
        open.push(SearchNode {
            id: start_id,
            f_score: self.heuristic(&self.start, &self.goal),
            seq,
        });

        let mut cursor = self.generator.successors(start_id, obstacles);
        let mut expansions = 0usize;

        while let Some(node) = open.pop() {
            if node.id == goal_id {
                let plan = self.reconstruct(&came_from, start_id, goal_id);
                debug!(
                    expansions,
                    cost = plan.total_cost(),
                    actions = plan.len(),
                    "plan found"
                );
                return Some(plan);
            }

            expansions += 1;
            if expansions > self.config.max_expansions {
                warn!(
                    max_expansions = self.config.max_expansions,
                    "expansion budget exhausted, giving up"
                );
                return None;
            }

            let current_g = match g_score.get(&node.id) {
                Some(&g) => g,
                None => continue,
            };

            cursor.reset(node.id);
            while let Some(succ) = cursor.next() {
                let reached = succ.state.unpack();
                if !bounds.contains(&reached) {
                    continue;
                }
                let tentative = current_g + succ.cost;
                if tentative < *g_score.get(&succ.state).unwrap_or(&f32::INFINITY) {
                    came_from.insert(succ.state, (node.id, succ.action, succ.cost));
                    g_score.insert(succ.state, tentative);
                    seq += 1;
                    open.push(SearchNode {
                        id: succ.state,
                        f_score: tentative + self.heuristic(&reached, &self.goal),
                        seq,
                    });
                }
            }
        }

        debug!(expansions, "frontier exhausted without reaching the goal");
        None
    }

    fn reconstruct(
        &self,
        came_from: &HashMap<StateId, (StateId, ActionId, f32)>,
        start_id: StateId,
        goal_id: StateId,
    ) -> Plan {
        let mut actions = Vec::new();
        let mut costs = Vec::new();
        let mut current = goal_id;
        while current != start_id {
            match came_from.get(&current) {
                Some(&(prev, action, cost)) => {
                    actions.push(action);
                    costs.push(cost);
                    current = prev;
                }
                None => break,
            }
        }
        actions.reverse();
        costs.reverse();
        Plan::new(self.start, actions, costs)
    }
}

/// Axis-aligned cell region the search may expand into.
#[derive(Debug, Clone, Copy)]
struct SearchBounds {
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl SearchBounds {
    fn around(a: &DiscreteState, b: &DiscreteState, margin: i32) -> Self {
        Self {
            min_x: a.x.min(b.x) - margin,
            max_x: a.x.max(b.x) + margin,
            min_y: a.y.min(b.y) - margin,
            max_y: a.y.max(b.y) + margin,
        }
    }

    #[inline]
    fn contains(&self, s: &DiscreteState) -> bool {
        s.x >= self.min_x && s.x <= self.max_x && s.y >= self.min_y && s.y <= self.max_y
    }
}

/// Open-set entry; ordered for a min-heap on f, then insertion sequence.
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    id: StateId,
    f_score: f32,
    seq: u64,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point2D;
    use crate::obstacles::OrientedRect;
    use crate::planning::fixtures::fixture_library;
    use approx::assert_relative_eq;

    fn planner() -> Planner {
        Planner::new(Arc::new(fixture_library()), PlannerConfig::default())
    }

    #[test]
    fn trivial_plan_when_start_equals_goal() {
        let mut p = planner();
        let empty = ObstacleSet::new();
        assert!(p.set_start(&Pose2D::new(0.0, 0.0, 0.0), &empty));
        assert!(p.set_goal(&Pose2D::new(0.0, 0.0, 0.0), &empty));
        assert!(p.replan(&empty));
        assert!(p.plan().is_empty());
        assert_eq!(p.final_cost(), 0.0);
    }

    #[test]
    fn straight_line_plan_uses_cheapest_actions() {
        let mut p = planner();
        let empty = ObstacleSet::new();
        assert!(p.set_start(&Pose2D::new(0.0, 0.0, 0.0), &empty));
        assert!(p.set_goal(&Pose2D::new(300.0, 0.0, 0.0), &empty));
        assert!(p.replan(&empty));
        // Three single forwards at 1.0 beat forward-double mixes at 2.2.
        assert_relative_eq!(p.final_cost(), 3.0);
        assert_eq!(p.plan().len(), 3);
        assert_eq!(p.plan().start(), DiscreteState::new(0, 0, 0));
    }

    #[test]
    fn replan_failure_keeps_previous_plan() {
        let mut p = planner();
        let mut obstacles = ObstacleSet::new();
        assert!(p.set_start(&Pose2D::new(0.0, 0.0, 0.0), &obstacles));
        assert!(p.set_goal(&Pose2D::new(300.0, 0.0, 0.0), &obstacles));
        assert!(p.replan(&obstacles));
        let before = p.plan().clone();

        // Wall the goal in completely.
        obstacles.add_impassable(OrientedRect::new(
            Point2D::new(300.0, 0.0),
            (20_000.0, 140.0),
            0.0,
        ));
        p.set_replan_from_scratch();
        // The goal pose itself is now invalid and unreachable.
        assert!(!p.goal_is_valid(&obstacles));
        assert!(!p.replan(&obstacles));
        assert_eq!(p.plan().actions(), before.actions());
    }

    #[test]
    fn replan_reuses_result_while_world_unchanged() {
        let mut p = planner();
        let mut obstacles = ObstacleSet::new();
        assert!(p.set_start(&Pose2D::new(0.0, 0.0, 0.0), &obstacles));
        assert!(p.set_goal(&Pose2D::new(500.0, 0.0, 0.0), &obstacles));
        assert!(p.replan(&obstacles));
        let cost = p.final_cost();

        // Unchanged world: same result without a new search.
        assert!(p.replan(&obstacles));
        assert_relative_eq!(p.final_cost(), cost);

        // Any obstacle mutation invalidates the cached fingerprint.
        obstacles.add(
            OrientedRect::new(Point2D::new(0.0, 5000.0), (10.0, 10.0), 0.0),
            Penalty::Finite(1.0),
        );
        assert!(p.replan(&obstacles));
        assert_relative_eq!(p.final_cost(), cost);
    }

    #[test]
    fn apply_action_geometric_replay() {
        let p = planner();
        let mut obstacles = ObstacleSet::new();
        obstacles.add_impassable(OrientedRect::new(
            Point2D::new(100.0, 0.0),
            (30.0, 30.0),
            0.0,
        ));

        let mut state = StateId::pack(&DiscreteState::new(0, 0, 0));
        // Without validity: raw base cost, no obstacle query.
        let cost = p.apply_action(ActionId(0), &mut state, false, &obstacles);
        assert_relative_eq!(cost, 1.0);
        assert_eq!(state.unpack(), DiscreteState::new(1, 0, 0));

        // With validity: the same maneuver is impassable.
        let mut state = StateId::pack(&DiscreteState::new(0, 0, 0));
        let cost = p.apply_action(ActionId(0), &mut state, true, &obstacles);
        assert_eq!(cost, UNSAFE_COST);
        assert_eq!(state.unpack(), DiscreteState::new(1, 0, 0));

        // Unknown action: sentinel, state untouched.
        let mut state = StateId::pack(&DiscreteState::new(0, 0, 0));
        let cost = p.apply_action(ActionId(99), &mut state, true, &obstacles);
        assert_eq!(cost, UNSAFE_COST);
        assert_eq!(state.unpack(), DiscreteState::new(0, 0, 0));
    }

    #[test]
    fn salvage_keeps_longest_safe_prefix() {
        let mut p = planner();
        let mut obstacles = ObstacleSet::new();
        assert!(p.set_start(&Pose2D::new(0.0, 0.0, 0.0), &obstacles));
        assert!(p.set_goal(&Pose2D::new(600.0, 0.0, 0.0), &obstacles));
        assert!(p.replan(&obstacles));
        let plan = p.plan().clone();
        assert_eq!(plan.len(), 6);

        // Block the swept path between cells 3 and 4.
        obstacles.add_impassable(OrientedRect::new(
            Point2D::new(350.0, 0.0),
            (20.0, 40.0),
            0.0,
        ));

        assert!(!p.plan_is_safe(&plan, 0.0, &obstacles));

        let outcome = p.plan_is_safe_from(&plan, 0.0, 0, &obstacles);
        assert!(!outcome.safe);
        assert_eq!(outcome.salvaged_prefix.len(), 3);
        assert_eq!(outcome.last_safe_state, DiscreteState::new(3, 0, 0));
        assert_eq!(outcome.salvaged_prefix.start(), DiscreteState::new(0, 0, 0));

        // Starting past the blocked action, the tail is fine.
        let outcome = p.plan_is_safe_from(&plan, 0.0, 4, &obstacles);
        assert!(outcome.safe);
        assert_eq!(outcome.salvaged_prefix.len(), 2);
        assert_eq!(outcome.salvaged_prefix.start(), DiscreteState::new(4, 0, 0));
        assert_eq!(outcome.last_safe_state, DiscreteState::new(6, 0, 0));
    }

    #[test]
    fn safety_threshold_bounds_penalty_increment() {
        let mut p = planner();
        let mut obstacles = ObstacleSet::new();
        assert!(p.set_start(&Pose2D::new(0.0, 0.0, 0.0), &obstacles));
        assert!(p.set_goal(&Pose2D::new(300.0, 0.0, 0.0), &obstacles));
        assert!(p.replan(&obstacles));
        let plan = p.plan().clone();

        obstacles.add(
            OrientedRect::new(Point2D::new(150.0, 0.0), (20.0, 40.0), 0.0),
            Penalty::Finite(0.3),
        );

        // Zero threshold: any new cost at all is unsafe.
        assert!(!p.plan_is_safe(&plan, 0.0, &obstacles));
        // A threshold above the penalty tolerates it.
        assert!(p.plan_is_safe(&plan, 0.5, &obstacles));
    }
}
