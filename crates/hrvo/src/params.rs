//! Per-agent kinematic and neighbourhood parameters.

use serde::{Deserialize, Serialize};

/// Rejected values for simulator or agent parameters.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("time step must be positive, got {0}")]
    NonPositiveTimeStep(f32),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("max_neighbors must be at least 1")]
    ZeroMaxNeighbors,
    #[error("pref_speed {pref_speed} exceeds max_speed {max_speed}")]
    PrefSpeedExceedsMaxSpeed { pref_speed: f32, max_speed: f32 },
}

/// The parameter bundle of one agent: how far and how many neighbours it
/// considers, its disk size, and its speed and acceleration envelope.
///
/// Construction takes the required values; `uncertainty_offset` defaults to
/// zero and `max_accel` to unbounded, overridable builder-style:
///
/// ```
/// use hrvo::AgentParameters;
///
/// let params = AgentParameters::new(1.0, 10, 0.09, 0.09, 3.5, 4.825)
///     .max_accel(3.28);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentParameters {
    /// Range within which other agents are considered, in meters.
    pub neighbor_dist: f32,
    /// Upper bound on the number of neighbours taken into account.
    pub max_neighbors: usize,
    /// Disk radius, in meters.
    pub radius: f32,
    /// An agent within this distance of a waypoint has reached it.
    pub goal_radius: f32,
    /// Speed the agent aims for when unobstructed, in m/s.
    pub pref_speed: f32,
    /// Hard speed limit, in m/s.
    pub max_speed: f32,
    /// Padding added to the combined radius when predicting collisions,
    /// absorbing sensing error on neighbour positions. In meters.
    #[serde(default)]
    pub uncertainty_offset: f32,
    /// Hard acceleration limit, in m/s².
    #[serde(default = "unbounded")]
    pub max_accel: f32,
}

const fn unbounded() -> f32 {
    f32::INFINITY
}

impl AgentParameters {
    /// Bundle the required parameters; `uncertainty_offset` starts at zero
    /// and `max_accel` unbounded.
    #[must_use]
    pub const fn new(
        neighbor_dist: f32,
        max_neighbors: usize,
        radius: f32,
        goal_radius: f32,
        pref_speed: f32,
        max_speed: f32,
    ) -> Self {
        Self {
            neighbor_dist,
            max_neighbors,
            radius,
            goal_radius,
            pref_speed,
            max_speed,
            uncertainty_offset: 0.0,
            max_accel: f32::INFINITY,
        }
    }

    /// Override the collision-prediction padding.
    #[must_use]
    pub const fn uncertainty_offset(mut self, value: f32) -> Self {
        self.uncertainty_offset = value;
        self
    }

    /// Override the acceleration limit.
    #[must_use]
    pub const fn max_accel(mut self, value: f32) -> Self {
        self.max_accel = value;
        self
    }

    /// Check every field against its admissible range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParameterError`] encountered, in field order.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.neighbor_dist <= 0.0 {
            return Err(ParameterError::NonPositive {
                name:  "neighbor_dist",
                value: self.neighbor_dist,
            });
        }
        if self.max_neighbors == 0 {
            return Err(ParameterError::ZeroMaxNeighbors);
        }
        if self.radius < 0.0 {
            return Err(ParameterError::Negative {
                name:  "radius",
                value: self.radius,
            });
        }
        if self.goal_radius < 0.0 {
            return Err(ParameterError::Negative {
                name:  "goal_radius",
                value: self.goal_radius,
            });
        }
        if self.pref_speed < 0.0 {
            return Err(ParameterError::Negative {
                name:  "pref_speed",
                value: self.pref_speed,
            });
        }
        if self.max_speed < 0.0 {
            return Err(ParameterError::Negative {
                name:  "max_speed",
                value: self.max_speed,
            });
        }
        if self.pref_speed > self.max_speed {
            return Err(ParameterError::PrefSpeedExceedsMaxSpeed {
                pref_speed: self.pref_speed,
                max_speed:  self.max_speed,
            });
        }
        if self.uncertainty_offset < 0.0 {
            return Err(ParameterError::Negative {
                name:  "uncertainty_offset",
                value: self.uncertainty_offset,
            });
        }
        if self.max_accel <= 0.0 {
            return Err(ParameterError::NonPositive {
                name:  "max_accel",
                value: self.max_accel,
            });
        }
        Ok(())
    }
}
