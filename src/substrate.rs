//! The spatial capability the foraging policy runs against.
//!
//! The grid environment and the continuous arena both implement
//! [`Substrate`], so [`ForagingAgent`](crate::agent::ForagingAgent) makes the
//! same decisions over either.

use std::fmt::Debug;

use crate::pheromones::ScentField;

/// One place an agent could move to this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<P, H> {
    /// Where a full step lands.
    pub target: P,
    pub heading: H,
    /// Where the trail is sensed for this option.
    pub probe: P,
}

pub trait Substrate {
    type Point: Copy + PartialEq + Debug;
    type Heading: Copy + PartialEq + Debug;
    type Field: ScentField<Self::Point>;

    /// Options reachable from `from`, in a fixed order, already filtered to
    /// the bounds. A substrate may drop options whose path is obstructed;
    /// obstacles at the target itself are filtered by the caller.
    fn candidates(&self, from: Self::Point, out: &mut Vec<Candidate<Self::Point, Self::Heading>>);

    fn is_blocked(&self, at: Self::Point) -> bool;

    fn contains(&self, at: Self::Point) -> bool;

    fn is_food(&self, at: Self::Point) -> bool;

    fn is_nest(&self, at: Self::Point) -> bool;

    fn nest(&self) -> Self::Point;

    fn nest_distance(&self, at: Self::Point) -> f32;

    /// Permanently take the food at `at`. No-op when there is none.
    fn remove_food(&mut self, at: Self::Point);

    fn food_remaining(&self) -> usize;

    /// Whether a remembered place rules out moving to `candidate`.
    fn revisits(&self, remembered: Self::Point, candidate: Self::Point) -> bool {
        remembered == candidate
    }

    fn is_reversal(&self, previous: Self::Heading, next: Self::Heading) -> bool;

    /// Where the agent actually ends up when taking `candidate` at `speed`.
    fn advance(
        &self,
        from: Self::Point,
        candidate: &Candidate<Self::Point, Self::Heading>,
        speed: f32,
    ) -> Self::Point;
}
