//! Frame and slot arithmetic.
//!
//! Time is an unbounded sequence of ticks 1, 2, 3, …; the frame folds it
//! into slots 1..=λ, so tick λ+1 lands back on slot 1.

use serde::{Deserialize, Serialize};

/// A transmission slot - a 1-indexed position within the frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Slot(pub u64);

impl Slot {
    /// Create from a raw slot index.
    #[inline]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Get the raw slot index.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The frame length λ - the number of distinct slots per cycle.
///
/// λ is fixed for a run and must be at least 1; the loader enforces this
/// before a `Frame` is ever constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame(pub u64);

impl Frame {
    /// Create a frame of the given length.
    #[inline]
    pub const fn new(lambda: u64) -> Self {
        Self(lambda)
    }

    /// The frame length λ.
    #[inline]
    pub const fn lambda(&self) -> u64 {
        self.0
    }

    /// Map a tick (≥ 1) to its slot within the frame.
    ///
    /// Slots cycle continuously: ticks 1..=λ map to slots 1..=λ, tick λ+1
    /// maps back to slot 1, and so on.
    #[inline]
    pub const fn slot_at(&self, tick: u64) -> Slot {
        Slot((tick - 1) % self.0 + 1)
    }

    /// Reduce a preferred slot (≥ 1) into [1, λ].
    ///
    /// Preferred slots already inside the frame are unchanged.
    #[inline]
    pub const fn wrap(&self, preferred: u64) -> Slot {
        Slot((preferred - 1) % self.0 + 1)
    }

    /// Whether `slot` lies inside this frame.
    #[inline]
    pub const fn contains(&self, slot: Slot) -> bool {
        1 <= slot.0 && slot.0 <= self.0
    }

    /// All slots of the frame in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> {
        (1..=self.0).map(Slot)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
