//! End-to-end runs of small crowds, checking the promises the simulator
//! makes about them: speed and acceleration envelopes, determinism, goal
//! progress, and collision-free passage.

use approx::assert_abs_diff_eq;
use hrvo::{AgentParameters, Parallelism, Simulator, Vector2};
use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};

const TIME_STEP: f32 = 1.0 / 30.0;
const ROBOT_RADIUS: f32 = 0.09;

fn simulator(defaults: AgentParameters) -> Simulator {
    let mut simulator = Simulator::new();
    simulator.set_time_step(TIME_STEP).expect("positive dt");
    simulator
        .set_agent_defaults(defaults)
        .expect("valid defaults");
    simulator
}

fn gentle_defaults() -> AgentParameters {
    AgentParameters::new(1.0, 10, ROBOT_RADIUS, ROBOT_RADIUS, 1.0, 2.0)
}

/// Smallest squared center distance between any two agents.
fn min_pair_distance_sq(simulator: &Simulator) -> f32 {
    let n = simulator.num_agents();
    let mut min = f32::INFINITY;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = simulator.agent_position(j) - simulator.agent_position(i);
            min = min.min(d.length_sq());
        }
    }
    min
}

fn assert_no_overlap(simulator: &Simulator, step: usize) {
    let sum = 2.0 * ROBOT_RADIUS;
    let min = min_pair_distance_sq(simulator);
    assert!(
        min >= sum * sum - 1e-6,
        "agents overlap at step {step}: min distance {} < {sum}",
        min.sqrt()
    );
}

fn run_until_reached(simulator: &mut Simulator, max_steps: usize) {
    for step in 0..max_steps {
        if simulator.have_reached_goals() {
            return;
        }
        simulator.do_step();
        assert_no_overlap(simulator, step);
    }
    panic!("goals not reached within {max_steps} steps");
}

#[test]
fn two_body_head_on() {
    let mut simulator = simulator(gentle_defaults());
    let goal_a = simulator.add_goal(Vector2::new(1.0, 0.0));
    let goal_b = simulator.add_goal(Vector2::new(-1.0, 0.0));
    simulator
        .add_agent(Vector2::new(-1.0, 0.0), goal_a)
        .expect("goal exists");
    simulator
        .add_agent(Vector2::new(1.0, 0.0), goal_b)
        .expect("goal exists");

    run_until_reached(&mut simulator, 200);
}

#[test]
fn circle_of_eight_crosses_without_contact() {
    let mut simulator = simulator(gentle_defaults());

    let n = 8;
    for i in 0..n {
        #[allow(clippy::cast_precision_loss)]
        let angle = 2.0 * std::f32::consts::PI * (i as f32) / (n as f32);
        let position = 2.0 * Vector2::from_angle(angle);
        let goal = simulator.add_goal(-position);
        simulator.add_agent(position, goal).expect("goal exists");
    }

    for step in 0..600 {
        if simulator.have_reached_goals() {
            return;
        }
        simulator.do_step();
        assert_no_overlap(&simulator, step);

        for i in 0..n {
            let velocity = simulator.agent_velocity(i);
            assert!(
                velocity.length() <= 2.0 + 1e-4,
                "agent {i} over speed limit at step {step}"
            );
        }
    }
    panic!("circle crossing did not finish within 600 steps");
}

#[test]
fn a_lone_agent_tracks_the_straight_line() {
    let mut simulator = simulator(gentle_defaults());
    let goal = simulator.add_goal(Vector2::new(5.0, 0.0));
    let id = simulator.add_agent(Vector2::ZERO, goal).expect("goal exists");

    for step in 1..=60 {
        simulator.do_step();
        #[allow(clippy::cast_precision_loss)]
        let expected = step as f32 * TIME_STEP;
        assert_abs_diff_eq!(simulator.agent_position(id).x, expected, epsilon = 1e-4);
        assert_abs_diff_eq!(simulator.agent_position(id).y, 0.0, epsilon = 1e-4);
    }
}

#[test]
fn detours_around_a_stationary_agent() {
    let mut simulator = simulator(gentle_defaults());
    let goal_a = simulator.add_goal(Vector2::new(2.0, 0.0));
    let goal_b = simulator.add_goal(Vector2::new(1.0, 0.0));
    let a = simulator
        .add_agent(Vector2::new(0.0, 0.0), goal_a)
        .expect("goal exists");
    simulator
        .add_agent(Vector2::new(1.0, 0.0), goal_b)
        .expect("goal exists");

    run_until_reached(&mut simulator, 400);
    let position = simulator.agent_position(a);
    assert!((position - Vector2::new(2.0, 0.0)).length() < ROBOT_RADIUS);
}

#[test]
fn waypoints_are_visited_in_order() {
    let mut simulator = simulator(gentle_defaults());
    let goal = simulator
        .add_goal_with_waypoints(vec![
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ])
        .expect("non-empty waypoints");
    simulator.add_agent(Vector2::ZERO, goal).expect("goal exists");

    let mut cursor = 0;
    for _ in 0..600 {
        if simulator.have_reached_goals() {
            break;
        }
        simulator.do_step();
        let now = simulator.goal(goal).cursor();
        assert!(now >= cursor, "goal cursor moved backwards");
        assert!(now - cursor <= 1, "goal cursor skipped a waypoint");
        cursor = now;
    }

    assert!(simulator.have_reached_goals(), "never reached the last waypoint");
    assert_eq!(cursor, 2);
    assert!(simulator.goal(goal).is_going_to_final());
}

#[test]
fn identically_seeded_runs_are_bit_equal() {
    let build = |parallelism: Parallelism| {
        let mut simulator = simulator(gentle_defaults());
        simulator.set_parallelism(parallelism);
        for i in 0..8 {
            #[allow(clippy::cast_precision_loss)]
            let angle = 2.0 * std::f32::consts::PI * (i as f32) / 8.0;
            let position = 2.0 * Vector2::from_angle(angle);
            let goal = simulator.add_goal(-position);
            simulator.add_agent(position, goal).expect("goal exists");
        }
        simulator
    };

    let mut first = build(Parallelism::SingleThreaded);
    let mut second = build(Parallelism::SingleThreaded);
    let mut threaded = build(Parallelism::MultiThreaded);

    for _ in 0..120 {
        first.do_step();
        second.do_step();
        threaded.do_step();
    }

    for i in 0..first.num_agents() {
        assert_eq!(first.agent_position(i), second.agent_position(i));
        assert_eq!(first.agent_velocity(i), second.agent_velocity(i));
        // the parallel schedule reads the same snapshot and writes disjoint
        // slots, so even the thread fan-out reproduces the exact bits
        assert_eq!(first.agent_position(i), threaded.agent_position(i));
        assert_eq!(first.agent_velocity(i), threaded.agent_velocity(i));
    }
}

#[test]
fn settled_agents_stay_put() {
    let mut simulator = simulator(gentle_defaults());
    let positions = [Vector2::new(0.0, 0.0), Vector2::new(0.5, 0.0)];
    for position in positions {
        let goal = simulator.add_goal(position);
        simulator.add_agent(position, goal).expect("goal exists");
    }

    simulator.do_step();
    assert!(simulator.have_reached_goals());
    for (i, position) in positions.iter().enumerate() {
        assert_eq!(simulator.agent_position(i), *position);
        assert_eq!(simulator.agent_velocity(i), Vector2::ZERO);
    }
}

#[test]
fn random_crowds_stay_inside_their_envelopes() {
    let mut rng = StdRng::seed_from_u64(42);
    let defaults = AgentParameters::new(1.0, 10, ROBOT_RADIUS, ROBOT_RADIUS, 1.0, 2.0)
        .max_accel(3.28);

    for _ in 0..3 {
        let mut simulator = simulator(defaults);
        let n = 40;
        for _ in 0..n {
            let position = Vector2::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
            let target = Vector2::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
            let goal = simulator.add_goal(target);
            simulator.add_agent(position, goal).expect("goal exists");
        }

        let mut previous: Vec<Vector2> = (0..n).map(|i| simulator.agent_velocity(i)).collect();
        for step in 0..100 {
            simulator.do_step();
            for i in 0..n {
                let position = simulator.agent_position(i);
                assert!(
                    position.x.is_finite() && position.y.is_finite(),
                    "agent {i} went non-finite at step {step}"
                );
                let velocity = simulator.agent_velocity(i);
                assert!(
                    velocity.length() <= 2.0 + 1e-4,
                    "agent {i} over speed limit at step {step}"
                );
                let dv = (velocity - previous[i]).length();
                assert!(
                    dv <= 3.28 * TIME_STEP + 1e-4,
                    "agent {i} over acceleration limit at step {step}"
                );
                previous[i] = velocity;
            }
        }
    }
}

#[test]
fn mirrored_pair_commits_to_opposite_sides() {
    let defaults = AgentParameters::new(5.0, 10, ROBOT_RADIUS, ROBOT_RADIUS, 1.0, 2.0);
    let mut simulator = simulator(defaults);
    // a point-mirrored crossing: straight ahead would collide
    let goal_a = simulator.add_goal(Vector2::new(1.0, 0.0));
    let goal_b = simulator.add_goal(Vector2::new(-1.0, 0.1));
    let a = simulator
        .add_agent(Vector2::new(-1.0, 0.0), goal_a)
        .expect("goal exists");
    let b = simulator
        .add_agent(Vector2::new(1.0, 0.1), goal_b)
        .expect("goal exists");

    for _ in 0..5 {
        simulator.do_step();
    }
    let va = simulator.agent_velocity(a);
    let vb = simulator.agent_velocity(b);
    // both sidestep, and not into each other's choice: the perpendicular
    // components separate instead of mirroring into a dance
    assert!(va.y.abs() > 1e-4, "agent a never sidestepped: {va}");
    assert!(vb.y.abs() > 1e-4, "agent b never sidestepped: {vb}");
    assert!(
        (va.y - vb.y).abs() > 1e-4,
        "perpendicular components mirror each other: {va} vs {vb}"
    );

    for step in 0..200 {
        if simulator.have_reached_goals() {
            return;
        }
        simulator.do_step();
        assert_no_overlap(&simulator, step);
    }
    panic!("mirrored pair never reached their goals");
}
