//! Multi-agent local collision avoidance with hybrid reciprocal velocity
//! obstacles (HRVO).
//!
//! A [`Simulator`] owns a population of disk-shaped [`Agent`]s and their
//! [`Goal`]s. Every call to [`Simulator::do_step`] selects, for each agent, a
//! new velocity that makes progress toward the current goal waypoint, stays
//! inside the agent's speed and acceleration limits, and avoids near-term
//! collisions with its nearest neighbours by carving a hybrid reciprocal
//! velocity obstacle out of velocity space per neighbour.
//!
//! ```
//! use hrvo::{AgentParameters, Simulator, Vector2};
//!
//! let mut simulator = Simulator::new();
//! simulator.set_time_step(1.0 / 30.0)?;
//! simulator.set_agent_defaults(AgentParameters::new(1.0, 10, 0.09, 0.09, 1.0, 2.0))?;
//!
//! let goal = simulator.add_goal(Vector2::new(1.0, 0.0));
//! simulator.add_agent(Vector2::new(-1.0, 0.0), goal)?;
//!
//! while !simulator.have_reached_goals() {
//!     simulator.do_step();
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod agent;
mod goal;
mod params;
mod simulator;
mod vector2;
mod velocity;

pub use agent::Agent;
pub use goal::{Goal, GoalError, GoalId};
pub use params::{AgentParameters, ParameterError};
pub use simulator::{AgentId, Parallelism, Simulator, SimulatorError};
pub use vector2::Vector2;

/// Distances below this are treated as "already there": a zero preferred
/// velocity next to the waypoint, and no orientation update from a
/// near-standstill velocity.
pub(crate) const EPSILON: f32 = 1e-5;
