//! Goals: ordered waypoint sequences with a monotone cursor.

use serde::{Deserialize, Serialize};

use crate::Vector2;

/// Stable index of a goal in the simulator's goal array.
pub type GoalId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GoalError {
    /// A goal needs at least one waypoint to point an agent anywhere.
    #[error("no waypoints were provided")]
    NoWaypoints,
}

/// An ordered, non-empty sequence of waypoints and a cursor over it.
///
/// The cursor only ever moves forward, one waypoint at a time, and clamps at
/// the last waypoint instead of wrapping. The waypoint sequence itself is
/// fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    waypoints: Vec<Vector2>,
    cursor:    usize,
}

impl Goal {
    /// A goal with a single waypoint.
    #[must_use]
    pub fn single(position: Vector2) -> Self {
        Self {
            waypoints: vec![position],
            cursor:    0,
        }
    }

    /// A goal visiting `waypoints` in order.
    ///
    /// # Errors
    ///
    /// Returns [`GoalError::NoWaypoints`] if `waypoints` is empty.
    pub fn new(waypoints: Vec<Vector2>) -> Result<Self, GoalError> {
        if waypoints.is_empty() {
            return Err(GoalError::NoWaypoints);
        }
        Ok(Self {
            waypoints,
            cursor: 0,
        })
    }

    /// The waypoint the cursor currently points at.
    #[inline]
    pub fn current_waypoint(&self) -> Vector2 {
        self.waypoints[self.cursor]
    }

    /// The last waypoint of the sequence.
    #[inline]
    pub fn final_waypoint(&self) -> Vector2 {
        *self
            .waypoints
            .last()
            .expect("a goal has at least one waypoint")
    }

    /// Whether the cursor points at the last waypoint.
    #[inline]
    pub fn is_going_to_final(&self) -> bool {
        self.cursor == self.waypoints.len() - 1
    }

    /// Current cursor position in `[0, len)`.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// All waypoints, in visiting order.
    #[inline]
    pub fn waypoints(&self) -> &[Vector2] {
        &self.waypoints
    }

    /// Move the cursor to the next waypoint if `position` is within `radius`
    /// of the current one and a next waypoint exists. Returns whether the
    /// cursor moved.
    pub fn advance_if_reached(&mut self, position: Vector2, radius: f32) -> bool {
        if self.is_going_to_final() {
            return false;
        }
        if (self.current_waypoint() - position).length_sq() < radius * radius {
            self.cursor += 1;
            true
        } else {
            false
        }
    }
}
