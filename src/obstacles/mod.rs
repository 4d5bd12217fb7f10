//! World-frame obstacle regions and traversal penalty queries.
//!
//! Obstacles are oriented rectangles carrying either a finite crossing
//! penalty or an impassable marker. The set is mutated between planning
//! calls only; every query takes `&self`.

use serde::{Deserialize, Serialize};

use crate::core::types::{Point2D, Pose2D};

/// Traversal penalty attached to an obstacle region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Penalty {
    /// Region may never be crossed.
    Impassable,
    /// Region may be crossed at this added cost.
    Finite(f32),
}

impl Penalty {
    #[inline]
    pub fn is_impassable(&self) -> bool {
        matches!(self, Penalty::Impassable)
    }

    /// Added crossing cost; infinite for impassable regions.
    #[inline]
    pub fn cost(&self) -> f32 {
        match self {
            Penalty::Impassable => f32::INFINITY,
            Penalty::Finite(c) => *c,
        }
    }
}

/// An oriented rectangle in the world frame, millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedRect {
    /// Center position
    pub center: Point2D,
    /// Half extents along the rectangle's local x and y axes
    pub half_extents: (f32, f32),
    /// Rotation of the local x axis, radians
    pub angle: f32,
}

impl OrientedRect {
    /// Create a new oriented rectangle.
    #[inline]
    pub fn new(center: Point2D, half_extents: (f32, f32), angle: f32) -> Self {
        Self {
            center,
            half_extents,
            angle,
        }
    }

    #[inline]
    fn frame(&self) -> Pose2D {
        Pose2D::new(self.center.x, self.center.y, self.angle)
    }

    /// Whether a world-frame point lies inside (edges inclusive).
    pub fn contains_point(&self, point: &Point2D) -> bool {
        let local = self.frame().inverse_transform_point(point);
        local.x.abs() <= self.half_extents.0 && local.y.abs() <= self.half_extents.1
    }

    /// Whether the world-frame segment `a`-`b` touches the rectangle.
    pub fn intersects_segment(&self, a: &Point2D, b: &Point2D) -> bool {
        let f = self.frame();
        segment_hits_aabb(
            f.inverse_transform_point(a),
            f.inverse_transform_point(b),
            self.half_extents.0,
            self.half_extents.1,
        )
    }
}

/// Slab clipping of a segment against the axis-aligned box `[-hx, hx] x
/// [-hy, hy]`.
fn segment_hits_aabb(a: Point2D, b: Point2D, hx: f32, hy: f32) -> bool {
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    for (p, d, h) in [(a.x, b.x - a.x, hx), (a.y, b.y - a.y, hy)] {
        if d == 0.0 {
            if p < -h || p > h {
                return false;
            }
        } else {
            let inv = 1.0 / d;
            let mut near = (-h - p) * inv;
            let mut far = (h - p) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return false;
            }
        }
    }
    true
}

/// Handle for a region added to an [`ObstacleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstacleId(u64);

/// Obstacle region with its penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub rect: OrientedRect,
    pub penalty: Penalty,
}

/// Mutable collection of weighted obstacle regions.
///
/// `revision` increments on every mutation so planners can detect a stale
/// world without comparing contents.
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    entries: Vec<(ObstacleId, Obstacle)>,
    next_id: u64,
    revision: u64,
}

impl ObstacleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region with the given penalty.
    pub fn add(&mut self, rect: OrientedRect, penalty: Penalty) -> ObstacleId {
        let id = ObstacleId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Obstacle { rect, penalty }));
        self.revision += 1;
        id
    }

    /// Add a region that may never be crossed.
    pub fn add_impassable(&mut self, rect: OrientedRect) -> ObstacleId {
        self.add(rect, Penalty::Impassable)
    }

    /// Remove a region. Returns false if the id is unknown.
    pub fn remove(&mut self, id: ObstacleId) -> bool {
        match self.entries.iter().position(|(e, _)| *e == id) {
            Some(index) => {
                self.entries.remove(index);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Remove all regions.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.revision += 1;
        }
    }

    /// Number of regions.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mutation counter.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Combined penalty of every region containing the point.
    pub fn contains_point(&self, point: &Point2D) -> Penalty {
        let mut total = 0.0f32;
        for (_, obstacle) in &self.entries {
            if obstacle.rect.contains_point(point) {
                match obstacle.penalty {
                    Penalty::Impassable => return Penalty::Impassable,
                    Penalty::Finite(p) => total += p,
                }
            }
        }
        Penalty::Finite(total)
    }

    /// Combined penalty along a polyline of pose samples.
    ///
    /// Each intersected region contributes its penalty exactly once, no
    /// matter how many samples or segments touch it. Impassable dominates.
    pub fn penalty_along(&self, path: &[Pose2D]) -> Penalty {
        let mut total = 0.0f32;
        for (_, obstacle) in &self.entries {
            if path_touches(&obstacle.rect, path) {
                match obstacle.penalty {
                    Penalty::Impassable => return Penalty::Impassable,
                    Penalty::Finite(p) => total += p,
                }
            }
        }
        Penalty::Finite(total)
    }
}

fn path_touches(rect: &OrientedRect, path: &[Pose2D]) -> bool {
    match path {
        [] => false,
        [only] => rect.contains_point(&only.position()),
        _ => path
            .windows(2)
            .any(|w| rect.intersects_segment(&w[0].position(), &w[1].position())),
    }
}
