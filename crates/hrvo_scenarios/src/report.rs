//! Frame-by-frame csv reporting, one row per robot per frame.
//!
//! Velocities are estimated by finite difference over successive frames
//! rather than read from the simulator, so the report reflects what an
//! external observer tracking positions would measure.

use std::io::{self, Write};

use hrvo::{Simulator, Vector2};

pub const CSV_HEADER: &str = "frame,time,robot_id,x,y,velocity_x,velocity_y,speed,has_collided";

/// Drive `simulator` until `duration` simulated seconds have been reported
/// (or every robot has reached its goal, when `until_reached`), writing one
/// csv row per robot per frame.
pub fn run(
    simulator: &mut Simulator,
    duration: f32,
    until_reached: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;

    let count = simulator.num_agents();
    let mut previous: Vec<Vector2> = (0..count).map(|id| simulator.agent_position(id)).collect();
    let mut previous_time = 0.0_f32;
    let mut frame = 0_u64;

    loop {
        let time = simulator.global_time();
        let delta = time - previous_time;
        for id in 0..count {
            let position = simulator.agent_position(id);
            let (velocity, speed) = if frame == 0 || delta == 0.0 {
                (Vector2::ZERO, 0.0)
            } else {
                let velocity = (position - previous[id]) / delta;
                (velocity, velocity.length())
            };
            previous[id] = position;

            #[allow(clippy::cast_possible_wrap)]
            let collided = first_collision(simulator, id).map_or(-1, |other| other as i64);
            writeln!(
                out,
                "{frame},{time},{id},{},{},{},{},{speed},{collided}",
                position.x, position.y, velocity.x, velocity.y
            )?;
        }
        frame += 1;
        previous_time = time;
        simulator.do_step();
        if previous_time >= duration || (until_reached && simulator.have_reached_goals()) {
            return Ok(());
        }
    }
}

/// Smallest id of a robot whose disk overlaps robot `id`'s, if any.
fn first_collision(simulator: &Simulator, id: usize) -> Option<usize> {
    let position = simulator.agent_position(id);
    let radius = simulator.agent_radius(id);
    (0..simulator.num_agents()).find(|&other| {
        other != id && {
            let sum = radius + simulator.agent_radius(other);
            (simulator.agent_position(other) - position).length_sq() < sum * sum
        }
    })
}
