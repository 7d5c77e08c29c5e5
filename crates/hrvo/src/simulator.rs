//! The simulation driver: owns agents and goals, steps the world.

use kdtree2d::{KdTree, NearestHeap, Neighbor};
use rayon::prelude::*;

use crate::{
    agent::Agent,
    goal::{Goal, GoalError, GoalId},
    params::{AgentParameters, ParameterError},
    velocity::{self, Candidate, VelocityObstacle},
    Vector2,
};

/// Stable index of an agent in the simulator's agent array.
pub type AgentId = usize;

/// Errors from simulator mutations. The simulator is left unchanged when an
/// operation fails.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SimulatorError {
    /// An agent was added against a goal id that was never handed out.
    #[error("goal {0} does not exist")]
    UnknownGoal(GoalId),
    #[error(transparent)]
    InvalidGoal(#[from] GoalError),
    #[error(transparent)]
    InvalidParameter(#[from] ParameterError),
}

/// How the per-agent velocity phase runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parallelism {
    /// One agent after another on the calling thread.
    SingleThreaded,
    /// Fan the agents out over the rayon thread pool. Each task reads the
    /// pre-step snapshot and writes only its own slot, so the result is
    /// identical to the single-threaded schedule.
    #[default]
    MultiThreaded,
}

/// Per-agent working memory for one step. Kept between steps so the hot
/// loop never allocates.
#[derive(Debug, Default)]
struct Scratch {
    heap:         NearestHeap,
    neighbors:    Vec<Neighbor>,
    obstacles:    Vec<VelocityObstacle>,
    candidates:   Vec<Candidate>,
    new_velocity: Vector2,
}

/// A population of agents and goals advanced in lockstep.
///
/// The simulator owns everything: agents refer to goals by [`GoalId`] and
/// the spatial index refers to agents by [`AgentId`], so there are no
/// cross-references to keep alive. Agents and goals are only ever appended;
/// ids stay valid for the simulator's lifetime.
#[derive(Debug, Default)]
pub struct Simulator {
    agents:        Vec<Agent>,
    goals:         Vec<Goal>,
    scratch:       Vec<Scratch>,
    positions:     Vec<[f32; 2]>,
    kd_tree:       KdTree,
    defaults:      Option<AgentParameters>,
    time_step:     Option<f32>,
    global_time:   f32,
    reached_goals: bool,
    parallelism:   Parallelism,
}

impl Simulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the step length in seconds.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive `time_step`.
    pub fn set_time_step(&mut self, time_step: f32) -> Result<(), ParameterError> {
        if time_step <= 0.0 {
            return Err(ParameterError::NonPositiveTimeStep(time_step));
        }
        self.time_step = Some(time_step);
        Ok(())
    }

    /// Set the parameter bundle applied to agents added without explicit
    /// parameters.
    ///
    /// # Errors
    ///
    /// Rejects an invalid bundle, leaving previous defaults in place.
    pub fn set_agent_defaults(&mut self, params: AgentParameters) -> Result<(), ParameterError> {
        params.validate()?;
        self.defaults = Some(params);
        Ok(())
    }

    /// Choose how the per-agent phase executes. The result does not depend
    /// on the choice; [`Parallelism::SingleThreaded`] exists for
    /// reproducibility checks and single-core targets.
    pub fn set_parallelism(&mut self, parallelism: Parallelism) {
        self.parallelism = parallelism;
    }

    /// Register a goal with a single waypoint.
    pub fn add_goal(&mut self, position: Vector2) -> GoalId {
        self.goals.push(Goal::single(position));
        self.goals.len() - 1
    }

    /// Register a goal visiting `waypoints` in order.
    ///
    /// # Errors
    ///
    /// Returns [`GoalError::NoWaypoints`] for an empty sequence.
    pub fn add_goal_with_waypoints(
        &mut self,
        waypoints: Vec<Vector2>,
    ) -> Result<GoalId, GoalError> {
        let goal = Goal::new(waypoints)?;
        self.goals.push(goal);
        Ok(self.goals.len() - 1)
    }

    /// Add an agent at `position` heading for `goal_id`, with the default
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::UnknownGoal`] if `goal_id` was never handed
    /// out by this simulator.
    ///
    /// # Panics
    ///
    /// Panics if no defaults have been set; call
    /// [`set_agent_defaults`](Self::set_agent_defaults) first or use
    /// [`add_agent_with`](Self::add_agent_with).
    pub fn add_agent(
        &mut self,
        position: Vector2,
        goal_id: GoalId,
    ) -> Result<AgentId, SimulatorError> {
        let params = self
            .defaults
            .expect("agent defaults must be set before adding agents without parameters");
        self.add_agent_with(position, goal_id, params)
    }

    /// Add an agent with its own parameter bundle.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::UnknownGoal`] for an unknown `goal_id` and
    /// [`SimulatorError::InvalidParameter`] for an invalid bundle.
    pub fn add_agent_with(
        &mut self,
        position: Vector2,
        goal_id: GoalId,
        params: AgentParameters,
    ) -> Result<AgentId, SimulatorError> {
        params.validate()?;
        if goal_id >= self.goals.len() {
            return Err(SimulatorError::UnknownGoal(goal_id));
        }
        self.agents.push(Agent::new(position, goal_id, &params));
        self.scratch.push(Scratch::default());
        Ok(self.agents.len() - 1)
    }

    /// Advance the world by one time step.
    ///
    /// Rebuilds the spatial index, selects a new velocity for every agent
    /// against the pre-step snapshot, then commits all of them at once:
    /// acceleration clamp, position integration, orientation update, goal
    /// cursor advance.
    ///
    /// # Panics
    ///
    /// Panics if [`set_time_step`](Self::set_time_step) was never called.
    pub fn do_step(&mut self) {
        let time_step = self
            .time_step
            .expect("time step must be set before stepping");

        self.positions.clear();
        self.positions
            .extend(self.agents.iter().map(|a| [a.position.x, a.position.y]));
        self.kd_tree.rebuild(&self.positions);

        for index in 0..self.agents.len() {
            let waypoint = self.goals[self.agents[index].goal_id].current_waypoint();
            self.agents[index].update_pref_velocity(waypoint);
        }

        {
            let agents = &self.agents;
            let positions = &self.positions;
            let kd_tree = &self.kd_tree;
            match self.parallelism {
                Parallelism::SingleThreaded => {
                    self.scratch.iter_mut().enumerate().for_each(|(index, scratch)| {
                        select_new_velocity(index, agents, positions, kd_tree, time_step, scratch);
                    });
                }
                Parallelism::MultiThreaded => {
                    self.scratch.par_iter_mut().enumerate().for_each(|(index, scratch)| {
                        select_new_velocity(index, agents, positions, kd_tree, time_step, scratch);
                    });
                }
            }
        }

        for (agent, scratch) in self.agents.iter_mut().zip(&self.scratch) {
            agent.integrate(scratch.new_velocity, time_step);
            self.goals[agent.goal_id].advance_if_reached(agent.position, agent.goal_radius);
        }

        self.global_time += time_step;
        self.reached_goals = self.agents.iter().all(|agent| {
            let target = self.goals[agent.goal_id].final_waypoint();
            (target - agent.position).length_sq() < agent.goal_radius * agent.goal_radius
        });
    }

    /// Number of agents added so far.
    #[inline]
    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    /// Number of goals added so far.
    #[inline]
    pub fn num_goals(&self) -> usize {
        self.goals.len()
    }

    /// Seconds simulated since construction.
    #[inline]
    pub fn global_time(&self) -> f32 {
        self.global_time
    }

    /// Whether, after the last step, every agent stood within its goal
    /// radius of its goal's final waypoint.
    #[inline]
    pub fn have_reached_goals(&self) -> bool {
        self.reached_goals
    }

    /// Borrow an agent. Panics on an id this simulator never handed out.
    #[inline]
    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id]
    }

    /// Borrow a goal. Panics on an id this simulator never handed out.
    #[inline]
    pub fn goal(&self, id: GoalId) -> &Goal {
        &self.goals[id]
    }

    /// All agents, in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// Position of agent `id`.
    #[inline]
    pub fn agent_position(&self, id: AgentId) -> Vector2 {
        self.agents[id].position
    }

    /// Velocity of agent `id`.
    #[inline]
    pub fn agent_velocity(&self, id: AgentId) -> Vector2 {
        self.agents[id].velocity
    }

    /// Disk radius of agent `id`.
    #[inline]
    pub fn agent_radius(&self, id: AgentId) -> f32 {
        self.agents[id].radius
    }

    /// Heading of agent `id` in radians.
    #[inline]
    pub fn agent_orientation(&self, id: AgentId) -> f32 {
        self.agents[id].orientation
    }

    /// Goal id of agent `id`.
    #[inline]
    pub fn agent_goal_id(&self, id: AgentId) -> GoalId {
        self.agents[id].goal_id
    }
}

/// The per-agent phase: gather neighbours, build their hybrid cones,
/// enumerate candidates and keep the best one in the agent's scratch slot.
///
/// Reads only the pre-step snapshot (`agents`, `positions`, `kd_tree`) and
/// writes only `scratch`, which is what makes the fan-out race-free.
fn select_new_velocity(
    index: usize,
    agents: &[Agent],
    positions: &[[f32; 2]],
    kd_tree: &KdTree,
    time_step: f32,
    scratch: &mut Scratch,
) {
    let agent = &agents[index];

    scratch.heap.reset(
        agent.max_neighbors,
        agent.neighbor_dist * agent.neighbor_dist,
    );
    kd_tree.nearest_within(positions, positions[index], Some(index), &mut scratch.heap);
    scratch.heap.drain_sorted_into(&mut scratch.neighbors);

    scratch.obstacles.clear();
    scratch.obstacles.extend(
        scratch
            .neighbors
            .iter()
            .map(|n| VelocityObstacle::hybrid(agent, &agents[n.point], time_step)),
    );

    velocity::generate_candidates(
        agent.pref_velocity,
        agent.max_speed,
        &scratch.obstacles,
        &mut scratch.candidates,
    );
    scratch.new_velocity = velocity::select_velocity(
        agent,
        agents,
        &scratch.neighbors,
        &scratch.obstacles,
        &scratch.candidates,
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn defaults() -> AgentParameters {
        AgentParameters::new(1.0, 10, 0.09, 0.09, 1.0, 2.0)
    }

    fn simulator() -> Simulator {
        let mut simulator = Simulator::new();
        simulator.set_time_step(1.0 / 30.0).expect("positive dt");
        simulator.set_agent_defaults(defaults()).expect("valid defaults");
        simulator
    }

    #[test]
    fn rejects_a_non_positive_time_step() {
        let mut simulator = Simulator::new();
        assert_eq!(
            simulator.set_time_step(0.0),
            Err(ParameterError::NonPositiveTimeStep(0.0))
        );
        assert_eq!(
            simulator.set_time_step(-0.1),
            Err(ParameterError::NonPositiveTimeStep(-0.1))
        );
        assert!(simulator.set_time_step(0.1).is_ok());
    }

    #[test]
    fn rejects_an_unknown_goal_id() {
        let mut simulator = simulator();
        let result = simulator.add_agent(Vector2::ZERO, 7);
        assert_eq!(result, Err(SimulatorError::UnknownGoal(7)));
        assert_eq!(simulator.num_agents(), 0);
    }

    #[test]
    fn rejects_invalid_agent_parameters() {
        let mut simulator = simulator();
        let goal = simulator.add_goal(Vector2::ZERO);
        let mut params = defaults();
        params.max_neighbors = 0;
        let result = simulator.add_agent_with(Vector2::ZERO, goal, params);
        assert_eq!(
            result,
            Err(SimulatorError::InvalidParameter(
                ParameterError::ZeroMaxNeighbors
            ))
        );
        assert_eq!(simulator.num_agents(), 0);
    }

    #[test]
    fn rejects_an_empty_waypoint_sequence() {
        let mut simulator = simulator();
        assert_eq!(
            simulator.add_goal_with_waypoints(vec![]),
            Err(GoalError::NoWaypoints)
        );
        assert_eq!(simulator.num_goals(), 0);
    }

    #[test]
    #[should_panic(expected = "agent defaults must be set")]
    fn adding_an_agent_without_defaults_is_a_programming_error() {
        let mut simulator = Simulator::new();
        simulator.set_time_step(0.1).expect("positive dt");
        let goal = simulator.add_goal(Vector2::ZERO);
        let _ = simulator.add_agent(Vector2::ZERO, goal);
    }

    #[test]
    fn global_time_advances_by_exactly_the_time_step() {
        let mut simulator = simulator();
        let goal = simulator.add_goal(Vector2::new(1.0, 0.0));
        simulator.add_agent(Vector2::ZERO, goal).expect("goal exists");

        assert_eq!(simulator.global_time(), 0.0);
        simulator.do_step();
        assert_eq!(simulator.global_time(), 1.0 / 30.0);
        simulator.do_step();
        assert_eq!(simulator.global_time(), 2.0 / 30.0);
    }

    #[test]
    fn a_lone_agent_moves_at_preferred_speed() {
        let mut simulator = simulator();
        let goal = simulator.add_goal(Vector2::new(5.0, 0.0));
        let id = simulator.add_agent(Vector2::ZERO, goal).expect("goal exists");

        simulator.do_step();
        let velocity = simulator.agent_velocity(id);
        assert_eq!(velocity, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn an_empty_simulator_steps_without_complaint() {
        let mut simulator = simulator();
        simulator.do_step();
        assert!(simulator.have_reached_goals());
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let mut simulator = simulator();
        let g0 = simulator.add_goal(Vector2::ZERO);
        let g1 = simulator.add_goal(Vector2::new(1.0, 0.0));
        assert_eq!((g0, g1), (0, 1));

        let a0 = simulator.add_agent(Vector2::ZERO, g0).expect("goal exists");
        let a1 = simulator.add_agent(Vector2::new(1.0, 1.0), g1).expect("goal exists");
        assert_eq!((a0, a1), (0, 1));
        assert_eq!(simulator.agent_goal_id(a1), g1);
    }
}
