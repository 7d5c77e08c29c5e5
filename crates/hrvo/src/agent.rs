//! Agent kinematic state.

use crate::{goal::GoalId, params::AgentParameters, Vector2, EPSILON};

/// A moving disk with its own kinematic envelope and a goal reference.
///
/// Agents never hold references to each other or to their goal; all
/// cross-agent work happens in the [`Simulator`](crate::Simulator), which
/// owns the flat agent and goal arrays and hands out ids.
#[derive(Debug, Clone)]
pub struct Agent {
    // Parameters, fixed at construction.
    pub(crate) neighbor_dist:      f32,
    pub(crate) max_neighbors:      usize,
    pub(crate) radius:             f32,
    pub(crate) goal_radius:        f32,
    pub(crate) pref_speed:         f32,
    pub(crate) max_speed:          f32,
    pub(crate) uncertainty_offset: f32,
    pub(crate) max_accel:          f32,

    // Kinematic state, advanced every step.
    pub(crate) position:      Vector2,
    pub(crate) velocity:      Vector2,
    pub(crate) orientation:   f32,
    pub(crate) pref_velocity: Vector2,
    pub(crate) goal_id:       GoalId,
}

impl Agent {
    pub(crate) fn new(position: Vector2, goal_id: GoalId, params: &AgentParameters) -> Self {
        Self {
            neighbor_dist: params.neighbor_dist,
            max_neighbors: params.max_neighbors,
            radius: params.radius,
            goal_radius: params.goal_radius,
            pref_speed: params.pref_speed,
            max_speed: params.max_speed,
            uncertainty_offset: params.uncertainty_offset,
            max_accel: params.max_accel,
            position,
            velocity: Vector2::ZERO,
            orientation: 0.0,
            pref_velocity: Vector2::ZERO,
            goal_id,
        }
    }

    /// Steer straight at `waypoint`: the full offset when it is closer than
    /// one second at preferred speed, the capped direction otherwise, and
    /// zero once the agent effectively stands on the waypoint.
    pub(crate) fn update_pref_velocity(&mut self, waypoint: Vector2) {
        let to_waypoint = waypoint - self.position;
        let distance = to_waypoint.length();
        self.pref_velocity = if distance < EPSILON {
            Vector2::ZERO
        } else if distance > self.pref_speed {
            (self.pref_speed / distance) * to_waypoint
        } else {
            to_waypoint
        };
    }

    /// Commit the selected velocity, limited by what the agent can reach
    /// within one step, and integrate position and orientation.
    pub(crate) fn integrate(&mut self, new_velocity: Vector2, time_step: f32) {
        let dv = new_velocity - self.velocity;
        let dv_length = dv.length();
        let reachable = self.max_accel * time_step;
        self.velocity = if dv_length <= reachable {
            new_velocity
        } else {
            self.velocity + (reachable / dv_length) * dv
        };

        self.position += self.velocity * time_step;
        if self.velocity.length_sq() > EPSILON * EPSILON {
            self.orientation = self.velocity.angle();
        }
    }

    /// Center of the agent's disk.
    #[inline]
    pub fn position(&self) -> Vector2 {
        self.position
    }

    /// Velocity the last step committed.
    #[inline]
    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    /// Heading in radians, following the velocity while the agent moves.
    #[inline]
    pub fn orientation(&self) -> f32 {
        self.orientation
    }

    /// Disk radius.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Hard speed limit.
    #[inline]
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// The goal this agent is heading for.
    #[inline]
    pub fn goal_id(&self) -> GoalId {
        self.goal_id
    }

    /// The straight-at-the-waypoint velocity computed for the current step.
    #[inline]
    pub fn pref_velocity(&self) -> Vector2 {
        self.pref_velocity
    }
}
