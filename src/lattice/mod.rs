//! Discretized configuration space.
//!
//! A [`Lattice`] maps continuous poses onto integer cells plus a heading
//! bucket; [`StateId`] packs the resulting [`DiscreteState`] into a single
//! `u64` key for hashing and heap storage during search.

use serde::{Deserialize, Serialize};

use crate::core::math::normalize_angle;
use crate::core::types::Pose2D;
use crate::error::{MargaError, Result};

/// A discretized vehicle configuration: grid cell plus heading bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteState {
    /// Grid cell index along x (signed, lattice units)
    pub x: i32,
    /// Grid cell index along y (signed, lattice units)
    pub y: i32,
    /// Heading bucket in `[0, num_headings)`
    pub heading: u8,
}

impl DiscreteState {
    /// Create a new discrete state.
    #[inline]
    pub fn new(x: i32, y: i32, heading: u8) -> Self {
        Self { x, y, heading }
    }
}

const COORD_BITS: u32 = 24;
const COORD_MASK: u64 = (1 << COORD_BITS) - 1;

/// Packed search key for a [`DiscreteState`].
///
/// Layout (low 56 bits of the `u64`, high 8 bits zero):
///
/// ```text
/// [ heading:8 | y:24 | x:24 ]
/// ```
///
/// x and y are stored as 24-bit two's-complement fields, so any cell index
/// in ±8,388,607 round-trips exactly and distinct in-range states map to
/// distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(u64);

impl StateId {
    /// Pack a discrete state into its key.
    #[inline]
    pub fn pack(state: &DiscreteState) -> StateId {
        debug_assert!(state.x.unsigned_abs() <= COORD_MASK as u32 / 2);
        debug_assert!(state.y.unsigned_abs() <= COORD_MASK as u32 / 2);
        let x = (state.x as u32 as u64) & COORD_MASK;
        let y = (state.y as u32 as u64) & COORD_MASK;
        let h = state.heading as u64;
        StateId(x | (y << COORD_BITS) | (h << (2 * COORD_BITS)))
    }

    /// Recover the discrete state from its key.
    #[inline]
    pub fn unpack(self) -> DiscreteState {
        DiscreteState {
            x: sign_extend_24((self.0 & COORD_MASK) as u32),
            y: sign_extend_24(((self.0 >> COORD_BITS) & COORD_MASK) as u32),
            heading: (self.0 >> (2 * COORD_BITS)) as u8,
        }
    }

    /// Raw packed value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[inline]
fn sign_extend_24(v: u32) -> i32 {
    ((v << 8) as i32) >> 8
}

/// Discretization parameters of the planning space.
///
/// Fixed at library load; conversions are mutual inverses at cell centers
/// and round-to-nearest elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    resolution_mm: f32,
    num_headings: u8,
    rad_per_heading: f32,
}

impl Lattice {
    /// Create a lattice with the given cell size and heading bucket count.
    pub fn new(resolution_mm: f32, num_headings: u8) -> Result<Self> {
        if !(resolution_mm > 0.0) {
            return Err(MargaError::Config(format!(
                "lattice resolution must be positive, got {resolution_mm}"
            )));
        }
        if num_headings == 0 {
            return Err(MargaError::Config(
                "lattice needs at least one heading bucket".into(),
            ));
        }
        Ok(Self {
            resolution_mm,
            num_headings,
            rad_per_heading: std::f32::consts::TAU / num_headings as f32,
        })
    }

    /// Cell edge length in millimetres.
    #[inline]
    pub fn resolution_mm(&self) -> f32 {
        self.resolution_mm
    }

    /// Number of heading buckets.
    #[inline]
    pub fn num_headings(&self) -> u8 {
        self.num_headings
    }

    /// Angular width of one heading bucket.
    #[inline]
    pub fn radians_per_heading(&self) -> f32 {
        self.rad_per_heading
    }

    /// Snap a continuous pose to the nearest lattice state.
    #[inline]
    pub fn to_discrete(&self, pose: &Pose2D) -> DiscreteState {
        let bucket = (normalize_angle(pose.theta) / self.rad_per_heading).round() as i32;
        DiscreteState {
            x: (pose.x / self.resolution_mm).round() as i32,
            y: (pose.y / self.resolution_mm).round() as i32,
            heading: bucket.rem_euclid(self.num_headings as i32) as u8,
        }
    }

    /// Continuous pose at the center of a lattice state.
    #[inline]
    pub fn to_continuous(&self, state: &DiscreteState) -> Pose2D {
        Pose2D::new(
            state.x as f32 * self.resolution_mm,
            state.y as f32 * self.resolution_mm,
            normalize_angle(state.heading as f32 * self.rad_per_heading),
        )
    }
}
