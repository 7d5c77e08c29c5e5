//! Builders for the example crowds.

use hrvo::{AgentParameters, Simulator, SimulatorError, Vector2};

pub const ROBOT_RADIUS: f32 = 0.09;

/// Agent defaults shared by all scenarios unless a config file overrides
/// them.
#[must_use]
pub fn default_parameters() -> AgentParameters {
    AgentParameters::new(1.0, 10, ROBOT_RADIUS, ROBOT_RADIUS, 3.5, 4.825).max_accel(3.28)
}

/// `count` robots evenly spaced on a circle, each heading for the antipodal
/// point, plus one parked in the center for them to flow around.
#[allow(clippy::cast_precision_loss)]
pub fn circle(simulator: &mut Simulator, count: usize) -> Result<(), SimulatorError> {
    park(simulator, Vector2::ZERO)?;

    let radius = (count as f32 / 10.0).max(2.0);
    for i in 0..count {
        let angle = 2.0 * std::f32::consts::PI * (i as f32) / (count as f32);
        let position = radius * Vector2::from_angle(angle);
        let goal = simulator.add_goal(-position);
        simulator.add_agent(position, goal)?;
    }
    Ok(())
}

/// `count` robots stacked in a vertical line, all moving 6 m down.
#[allow(clippy::cast_precision_loss)]
pub fn line(simulator: &mut Simulator, count: usize) -> Result<(), SimulatorError> {
    let goal_offset = Vector2::new(0.0, -6.0);
    let spacing = Vector2::new(0.0, -2.5 * ROBOT_RADIUS);
    for i in 0..count {
        let position = (i as f32) * spacing;
        let goal = simulator.add_goal(position + goal_offset);
        simulator.add_agent(position, goal)?;
    }
    Ok(())
}

/// A row of `count` robots crossing a rectangular field whose perimeter is
/// lined with parked robots.
#[allow(clippy::cast_precision_loss)]
pub fn perimeter(simulator: &mut Simulator, count: usize) -> Result<(), SimulatorError> {
    const FIELD_WIDTH: f32 = 9.0;
    const FIELD_HEIGHT: f32 = 6.0;
    let spacing = 2.5 * ROBOT_RADIUS;

    let goal_offset = Vector2::new(8.0, 0.0);
    let row_offset = Vector2::new(0.0, -2.5 * ROBOT_RADIUS);
    for i in 0..count {
        let position = -0.5 * goal_offset + Vector2::new(0.0, 2.8) + (i as f32) * row_offset;
        let goal = simulator.add_goal(position + goal_offset);
        simulator.add_agent(position, goal)?;
    }

    // parked robots along the horizontal edges
    let mut x = -FIELD_WIDTH / 2.0;
    while x <= FIELD_WIDTH / 2.0 {
        for y in [-FIELD_HEIGHT / 2.0, FIELD_HEIGHT / 2.0] {
            park(simulator, Vector2::new(x, y))?;
        }
        x += spacing;
    }

    // and along the vertical edges, skipping the corners already placed
    let max_y = FIELD_HEIGHT / 2.0 - spacing;
    let mut y = -max_y;
    while y <= max_y {
        for x in [-FIELD_WIDTH / 2.0, FIELD_WIDTH / 2.0] {
            park(simulator, Vector2::new(x, y))?;
        }
        y += spacing;
    }
    Ok(())
}

/// A robot whose goal is where it already stands.
fn park(simulator: &mut Simulator, position: Vector2) -> Result<(), SimulatorError> {
    let goal = simulator.add_goal(position);
    simulator.add_agent(position, goal).map(|_| ())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn simulator() -> Simulator {
        let mut simulator = Simulator::new();
        simulator.set_time_step(1.0 / 30.0).expect("positive dt");
        simulator
            .set_agent_defaults(default_parameters())
            .expect("valid defaults");
        simulator
    }

    #[test]
    fn circle_places_count_plus_center() {
        let mut simulator = simulator();
        circle(&mut simulator, 8).expect("valid scenario");
        assert_eq!(simulator.num_agents(), 9);
        assert_eq!(simulator.num_goals(), 9);
    }

    #[test]
    fn circle_goals_are_antipodal() {
        let mut simulator = simulator();
        circle(&mut simulator, 4).expect("valid scenario");
        // robot 0 is parked in the center; the others mirror their start
        for id in 1..simulator.num_agents() {
            let position = simulator.agent_position(id);
            let goal = simulator.goal(simulator.agent_goal_id(id)).final_waypoint();
            assert_eq!(goal, -position);
        }
    }

    #[test]
    fn line_spaces_robots_downward() {
        let mut simulator = simulator();
        line(&mut simulator, 5).expect("valid scenario");
        assert_eq!(simulator.num_agents(), 5);
        for id in 1..5 {
            let above = simulator.agent_position(id - 1);
            let below = simulator.agent_position(id);
            assert!(below.y < above.y);
            assert_eq!(below.x, 0.0);
        }
    }

    #[test]
    fn perimeter_parks_a_closed_fence() {
        let mut simulator = simulator();
        perimeter(&mut simulator, 4).expect("valid scenario");
        // 4 movers plus the fence
        assert!(simulator.num_agents() > 4);
        let movers = 4;
        for id in movers..simulator.num_agents() {
            let position = simulator.agent_position(id);
            let goal = simulator.goal(simulator.agent_goal_id(id)).final_waypoint();
            assert_eq!(goal, position, "fence robot {id} should be parked");
        }
    }
}
