//! Velocity selection: hybrid reciprocal velocity obstacles, candidate
//! enumeration, and the penalty minimisation that picks the new velocity.
//!
//! Velocity space is carved up per neighbour into a cone of velocities that
//! lead to a collision within finite time. The hybrid construction shifts
//! the cone apex toward the side the agent is already passing on, so two
//! agents facing each other commit to one side instead of mirroring each
//! other's evasion. The new velocity is searched among a finite candidate
//! set: the preferred velocity and the points where cone boundaries meet
//! each other or the speed circle.

use itertools::Itertools;
use kdtree2d::Neighbor;

use crate::{agent::Agent, Vector2};

/// Relative weight of goal-progress loss against collision urgency in the
/// candidate penalty. Any positive value keeps pure goal progress as the
/// deciding term whenever no cone is violated.
const DEVIATION_WEIGHT: f32 = 1.0;

/// A velocity-obstacle cone: apex and two outward unit boundaries. `side1`
/// bounds the cone clockwise, `side2` counterclockwise; a velocity is inside
/// when it is counterclockwise of `side1` and clockwise of `side2`.
///
/// For an overlapping neighbour the "cone" opens up into the half-plane of
/// approaching velocities: the sides become the two opposite perpendiculars
/// of the center line.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VelocityObstacle {
    pub apex:  Vector2,
    pub side1: Vector2,
    pub side2: Vector2,
}

impl VelocityObstacle {
    /// Construct the hybrid cone `agent` keeps against `other`.
    pub(crate) fn hybrid(agent: &Agent, other: &Agent, time_step: f32) -> Self {
        let combined_radius = agent.radius + other.radius + agent.uncertainty_offset;
        let to_other = other.position - agent.position;
        let distance_sq = to_other.length_sq();

        if distance_sq > combined_radius * combined_radius {
            let distance = distance_sq.sqrt();
            let heading = to_other.angle();
            let opening = (combined_radius / distance).asin();
            let side1 = Vector2::from_angle(heading - opening);
            let side2 = Vector2::from_angle(heading + opening);

            // sin of the full opening angle, the denominator of the apex
            // offset along the chosen side
            let spread = 2.0 * opening.sin() * opening.cos();
            let relative_velocity = agent.velocity - other.velocity;

            // Pass the neighbour on the side the relative motion already
            // favours: the apex slides from the reciprocal midpoint onto the
            // boundary of that side's plain velocity obstacle.
            let apex = if to_other.det(relative_velocity) > 0.0 {
                let shift = 0.5 * relative_velocity.det(side2) / spread;
                other.velocity + shift * side1
            } else {
                let shift = -0.5 * relative_velocity.det(side1) / spread;
                other.velocity + shift * side2
            };

            Self { apex, side1, side2 }
        } else {
            // Already overlapping. Forbid every approaching velocity: the
            // cone opens into a half-plane whose apex retreats fast enough
            // to resolve the penetration within a step. Coincident centers
            // get a fixed +x separating axis.
            let distance = distance_sq.sqrt();
            let direction = if distance_sq == 0.0 {
                Vector2::new(1.0, 0.0)
            } else {
                to_other / distance
            };
            let relief =
                agent.uncertainty_offset + 0.5 * (combined_radius - distance) / time_step;
            let apex = 0.5 * (agent.velocity + other.velocity) - relief * direction;
            let side2 = direction.left_normal();

            Self {
                apex,
                side1: -side2,
                side2,
            }
        }
    }

    /// Whether `velocity` lies strictly inside the cone.
    pub(crate) fn contains(&self, velocity: Vector2) -> bool {
        let w = velocity - self.apex;
        self.side1.det(w) > 0.0 && self.side2.det(w) < 0.0
    }
}

/// A velocity under consideration, tagged with the obstacles (at most two)
/// whose boundary it lies on. Tagged obstacles are exempt from the collision
/// penalty: lying on a boundary is grazing, not entering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub velocity:  Vector2,
    pub obstacle1: Option<usize>,
    pub obstacle2: Option<usize>,
}

/// Enumerate candidate velocities into `candidates` (cleared first), in a
/// fixed order: the preferred velocity clipped to the speed disk, then per
/// obstacle the boundary projections of the preferred velocity and the
/// speed-circle crossings of both boundaries, then all pairwise boundary
/// intersections.
pub(crate) fn generate_candidates(
    pref_velocity: Vector2,
    max_speed: f32,
    obstacles: &[VelocityObstacle],
    candidates: &mut Vec<Candidate>,
) {
    candidates.clear();
    let max_speed_sq = max_speed * max_speed;

    let preferred = if pref_velocity.length_sq() <= max_speed_sq {
        pref_velocity
    } else {
        max_speed * pref_velocity.normalized()
    };
    candidates.push(Candidate {
        velocity:  preferred,
        obstacle1: None,
        obstacle2: None,
    });

    for (k, obstacle) in obstacles.iter().enumerate() {
        let from_apex = pref_velocity - obstacle.apex;

        // Feet of the perpendicular from the preferred velocity onto each
        // boundary half-line, where the foot exists on the correct side.
        let along1 = from_apex.dot(obstacle.side1);
        if along1 > 0.0 && obstacle.side1.det(from_apex) > 0.0 {
            let velocity = obstacle.apex + along1 * obstacle.side1;
            if velocity.length_sq() < max_speed_sq {
                candidates.push(Candidate {
                    velocity,
                    obstacle1: Some(k),
                    obstacle2: Some(k),
                });
            }
        }
        let along2 = from_apex.dot(obstacle.side2);
        if along2 > 0.0 && obstacle.side2.det(from_apex) < 0.0 {
            let velocity = obstacle.apex + along2 * obstacle.side2;
            if velocity.length_sq() < max_speed_sq {
                candidates.push(Candidate {
                    velocity,
                    obstacle1: Some(k),
                    obstacle2: Some(k),
                });
            }
        }

        // Crossings of each boundary half-line with the speed circle; these
        // sit on the circle, so no disk check is needed.
        for side in [obstacle.side1, obstacle.side2] {
            let discriminant = max_speed_sq - obstacle.apex.det(side).powi(2);
            if discriminant > 0.0 {
                let mid = -obstacle.apex.dot(side);
                let half_chord = discriminant.sqrt();
                for along in [mid + half_chord, mid - half_chord] {
                    if along >= 0.0 {
                        candidates.push(Candidate {
                            velocity:  obstacle.apex + along * side,
                            obstacle1: Some(k),
                            obstacle2: Some(k),
                        });
                    }
                }
            }
        }
    }

    // Boundary-boundary intersections of distinct obstacles.
    for (j, k) in (0..obstacles.len()).tuple_combinations() {
        for side_j in [obstacles[j].side1, obstacles[j].side2] {
            for side_k in [obstacles[k].side1, obstacles[k].side2] {
                let denominator = side_j.det(side_k);
                if denominator == 0.0 {
                    continue;
                }
                let between_apexes = obstacles[k].apex - obstacles[j].apex;
                let along_j = between_apexes.det(side_k) / denominator;
                let along_k = between_apexes.det(side_j) / denominator;
                if along_j >= 0.0 && along_k >= 0.0 {
                    let velocity = obstacles[j].apex + along_j * side_j;
                    if velocity.length_sq() < max_speed_sq {
                        candidates.push(Candidate {
                            velocity,
                            obstacle1: Some(j),
                            obstacle2: Some(k),
                        });
                    }
                }
            }
        }
    }
}

/// Time until a disk of radius `combined_radius` around a neighbour at
/// relative position `to_other`, receding with `relative_velocity`, is first
/// penetrated. Zero when already inside, `None` when the paths never close.
fn time_to_collision(
    to_other: Vector2,
    relative_velocity: Vector2,
    combined_radius: f32,
) -> Option<f32> {
    let c = to_other.length_sq() - combined_radius * combined_radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let a = relative_velocity.length_sq();
    let b = relative_velocity.dot(to_other);
    if a == 0.0 || b <= 0.0 {
        return None;
    }
    let discriminant = b.mul_add(b, -(a * c));
    if discriminant <= 0.0 {
        return None;
    }
    Some((b - discriminant.sqrt()) / a)
}

/// Pick the candidate with the least penalty: deviation from the preferred
/// velocity, plus the urgency (inverse time to collision) of the most
/// pressing cone the candidate strays into. Earlier candidates win ties.
pub(crate) fn select_velocity(
    agent: &Agent,
    agents: &[Agent],
    neighbors: &[Neighbor],
    obstacles: &[VelocityObstacle],
    candidates: &[Candidate],
) -> Vector2 {
    let mut best = candidates.first().map_or(Vector2::ZERO, |c| c.velocity);
    let mut best_penalty = f32::INFINITY;

    for candidate in candidates {
        let mut urgency = 0.0_f32;
        for (k, obstacle) in obstacles.iter().enumerate() {
            if candidate.obstacle1 == Some(k) || candidate.obstacle2 == Some(k) {
                continue;
            }
            if !obstacle.contains(candidate.velocity) {
                continue;
            }
            let other = &agents[neighbors[k].point];
            let combined_radius = agent.radius + other.radius + agent.uncertainty_offset;
            let to_other = other.position - agent.position;
            match time_to_collision(
                to_other,
                candidate.velocity - other.velocity,
                combined_radius,
            ) {
                Some(time) if time > 0.0 => urgency = urgency.max(time.recip()),
                Some(_) => urgency = f32::INFINITY,
                None => {}
            }
        }

        let penalty = DEVIATION_WEIGHT
            .mul_add((candidate.velocity - agent.pref_velocity).length(), urgency);
        if penalty < best_penalty {
            best_penalty = penalty;
            best = candidate.velocity;
        }
    }

    best
}
