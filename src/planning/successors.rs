//! Lazy successor expansion over the primitive tables.

use std::sync::Arc;

use crate::core::types::Pose2D;
use crate::lattice::{DiscreteState, StateId};
use crate::obstacles::{ObstacleSet, Penalty};
use crate::primitives::{ActionId, MotionPrimitiveLibrary};

/// One reachable edge out of a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Successor {
    /// Maneuver taken
    pub action: ActionId,
    /// State reached
    pub state: StateId,
    /// Base cost plus any finite penalty along the swept path
    pub cost: f32,
}

/// Stateless factory for successor cursors.
#[derive(Debug, Clone)]
pub struct SuccessorGenerator {
    library: Arc<MotionPrimitiveLibrary>,
}

impl SuccessorGenerator {
    pub fn new(library: Arc<MotionPrimitiveLibrary>) -> Self {
        Self { library }
    }

    /// The library this generator expands over.
    #[inline]
    pub fn library(&self) -> &MotionPrimitiveLibrary {
        &self.library
    }

    /// Begin enumerating the successors of `state` against a fixed
    /// obstacle snapshot.
    ///
    /// Successors come out in primitive definition order for the state's
    /// heading bucket; edges whose swept path crosses an impassable region
    /// are omitted entirely.
    pub fn successors<'a>(
        &'a self,
        state: StateId,
        obstacles: &'a ObstacleSet,
    ) -> SuccessorCursor<'a> {
        let origin = state.unpack();
        let anchor = self.library.lattice().to_continuous(&origin);
        SuccessorCursor {
            library: &self.library,
            obstacles,
            origin,
            anchor,
            index: 0,
            scratch: Vec::with_capacity(self.library.max_swept_samples()),
        }
    }
}

/// Restartable cursor over the successors of one state.
///
/// Owns a scratch buffer for the world-frame swept path, reused across
/// `next()` calls; concurrently held cursors share no mutable state.
pub struct SuccessorCursor<'a> {
    library: &'a MotionPrimitiveLibrary,
    obstacles: &'a ObstacleSet,
    origin: DiscreteState,
    anchor: Pose2D,
    index: usize,
    scratch: Vec<Pose2D>,
}

impl SuccessorCursor<'_> {
    /// Rewind to the first successor of the current state.
    pub fn restart(&mut self) {
        self.index = 0;
    }

    /// Re-aim the cursor at a different state, keeping the scratch buffer.
    pub fn reset(&mut self, state: StateId) {
        self.origin = state.unpack();
        self.anchor = self.library.lattice().to_continuous(&self.origin);
        self.index = 0;
    }

    /// State being expanded.
    #[inline]
    pub fn origin(&self) -> DiscreteState {
        self.origin
    }
}

impl Iterator for SuccessorCursor<'_> {
    type Item = Successor;

    fn next(&mut self) -> Option<Successor> {
        let library = self.library;
        let anchor = self.anchor;
        while self.index < library.actions_per_heading() {
            let prim = library.primitive_at(self.origin.heading, self.index);
            self.index += 1;

            self.scratch.clear();
            self.scratch
                .extend(prim.swept_path().iter().map(|s| anchor.compose(s)));

            match self.obstacles.penalty_along(&self.scratch) {
                Penalty::Impassable => continue,
                Penalty::Finite(penalty) => {
                    let next = prim.apply_to(&self.origin, library.num_headings());
                    return Some(Successor {
                        action: prim.action_id(),
                        state: StateId::pack(&next),
                        cost: prim.base_cost() + penalty,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point2D;
    use crate::obstacles::OrientedRect;
    use crate::planning::fixtures::fixture_library;
    use approx::assert_relative_eq;

    fn expand(state: DiscreteState, obstacles: &ObstacleSet) -> Vec<Successor> {
        let generator = SuccessorGenerator::new(Arc::new(fixture_library()));
        generator
            .successors(StateId::pack(&state), obstacles)
            .collect()
    }

    #[test]
    fn expansion_from_origin_is_complete_and_ordered() {
        let empty = ObstacleSet::new();
        let succ = expand(DiscreteState::new(0, 0, 0), &empty);

        assert_eq!(succ.len(), 7);
        let actions: Vec<u16> = succ.iter().map(|s| s.action.raw()).collect();
        assert_eq!(actions, vec![0, 1, 2, 3, 4, 5, 6]);

        assert_eq!(succ[0].state.unpack(), DiscreteState::new(1, 0, 0));
        assert_eq!(succ[1].state.unpack(), DiscreteState::new(1, 0, 1));
        assert_eq!(succ[2].state.unpack(), DiscreteState::new(1, 0, 15));
        assert_eq!(succ[3].state.unpack(), DiscreteState::new(0, 0, 1));
        assert_eq!(succ[4].state.unpack(), DiscreteState::new(0, 0, 15));
        assert_eq!(succ[5].state.unpack(), DiscreteState::new(2, 0, 0));
        assert_eq!(succ[6].state.unpack(), DiscreteState::new(-1, 0, 0));

        assert_relative_eq!(succ[0].cost, 1.0);
        assert_relative_eq!(succ[6].cost, 1.5);
    }

    #[test]
    fn expansion_structure_is_translation_invariant() {
        let empty = ObstacleSet::new();
        let origin = DiscreteState::new(-14, 107, 15);
        let succ = expand(origin, &empty);

        assert_eq!(succ.len(), 7);
        for s in &succ {
            let reached = s.state.unpack();
            // Offsets stay in the one-step neighborhood of the start cell.
            assert!((reached.x - origin.x).abs() <= 2);
            assert!((reached.y - origin.y).abs() <= 2);
        }
        // Spin actions keep the cell and step the heading bucket.
        assert_eq!(succ[3].state.unpack(), DiscreteState::new(-14, 107, 0));
        assert_eq!(succ[4].state.unpack(), DiscreteState::new(-14, 107, 14));
        // Forward at heading 15 moves along the rounded unit vector (1, 0).
        assert_eq!(succ[0].state.unpack(), DiscreteState::new(-13, 107, 15));
        assert_eq!(succ[6].state.unpack(), DiscreteState::new(-15, 107, 15));
    }

    #[test]
    fn impassable_edges_are_omitted() {
        let mut obstacles = ObstacleSet::new();
        // Blocks everything reaching into x > 40 around y = 0.
        obstacles.add_impassable(OrientedRect::new(
            Point2D::new(150.0, 0.0),
            (110.0, 40.0),
            0.0,
        ));

        let succ = expand(DiscreteState::new(0, 0, 0), &obstacles);
        let actions: Vec<u16> = succ.iter().map(|s| s.action.raw()).collect();
        // Forward, both veers, and the double all sweep into the block;
        // spins and reverse survive.
        assert_eq!(actions, vec![3, 4, 6]);
    }

    #[test]
    fn finite_penalty_is_added_to_cost() {
        let mut obstacles = ObstacleSet::new();
        obstacles.add(
            OrientedRect::new(Point2D::new(100.0, 0.0), (30.0, 30.0), 0.0),
            Penalty::Finite(5.0),
        );

        let succ = expand(DiscreteState::new(0, 0, 0), &obstacles);
        assert_eq!(succ.len(), 7);
        let forward = succ.iter().find(|s| s.action == ActionId(0)).unwrap();
        assert_relative_eq!(forward.cost, 6.0);
        let spin = succ.iter().find(|s| s.action == ActionId(3)).unwrap();
        assert_relative_eq!(spin.cost, 0.5);
    }

    #[test]
    fn cursor_restart_and_reset() {
        let empty = ObstacleSet::new();
        let generator = SuccessorGenerator::new(Arc::new(fixture_library()));
        let start = StateId::pack(&DiscreteState::new(0, 0, 0));

        let mut cursor = generator.successors(start, &empty);
        let first: Vec<Successor> = cursor.by_ref().collect();
        assert!(cursor.next().is_none());

        cursor.restart();
        let second: Vec<Successor> = cursor.by_ref().collect();
        assert_eq!(first, second);

        cursor.reset(StateId::pack(&DiscreteState::new(5, 5, 4)));
        assert_eq!(cursor.origin(), DiscreteState::new(5, 5, 4));
        let moved: Vec<Successor> = cursor.collect();
        assert_eq!(moved.len(), 7);
        assert_eq!(moved[0].state.unpack(), DiscreteState::new(5, 6, 4));
    }
}
