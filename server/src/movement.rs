//! Road-constrained movement of a single dog over one tick
//!
//! The dog tries to move to `position + velocity * dt`. Every crossing of
//! that path with a corridor border is collected. With no or one crossing the
//! candidate is accepted when it lies inside some corridor; otherwise the dog
//! stops where it stands (no crossing) or at the crossing (one crossing).
//!
//! With several crossings the path may pass through junctions, so each
//! crossing and the candidate itself are probed by walking from the current
//! position in fixed steps and checking every sample against the corridors.
//! The farthest point whose samples all stay on road wins. This sampling is an
//! approximation; a gap narrower than a step can go unnoticed.

use shared::{corridor_borders, is_on_any_road, is_on_road, segment_intersect, Road, Segment, Vec2};
use std::time::Duration;

/// Distance between samples when probing a path.
pub const PROBE_STEP: f64 = 0.1001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    /// Final position, rounded to three decimals.
    pub position: Vec2,
    pub velocity: Vec2,
}

impl MoveOutcome {
    fn moved(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position: position.rounded(),
            velocity,
        }
    }

    fn stopped(position: Vec2) -> Self {
        Self {
            position: position.rounded(),
            velocity: Vec2::ZERO,
        }
    }
}

/// Resolves where a dog ends up after `time_delta`
pub fn resolve_movement(
    roads: &[Road],
    position: Vec2,
    velocity: Vec2,
    time_delta: Duration,
) -> MoveOutcome {
    let seconds = time_delta.as_millis() as f64 / 1000.0;
    let candidate = position.add(&velocity.scale(seconds));
    let path = Segment::new(position, candidate);

    let mut crossings = Vec::new();
    let mut candidate_on_road = false;
    for road in roads {
        for border in corridor_borders(road) {
            if let Some(point) = segment_intersect(&path, &border) {
                crossings.push(point);
            }
        }
        if is_on_road(road, candidate) {
            candidate_on_road = true;
        }
    }

    match crossings.len() {
        0 if candidate_on_road => MoveOutcome::moved(candidate, velocity),
        0 => MoveOutcome::stopped(position),
        1 if candidate_on_road => MoveOutcome::moved(candidate, velocity),
        1 => MoveOutcome::stopped(crossings[0]),
        _ => {
            crossings.push(candidate);
            let chosen = farthest_reachable(roads, position, &crossings).unwrap_or(position);
            if chosen == candidate {
                MoveOutcome::moved(chosen, velocity)
            } else {
                MoveOutcome::stopped(chosen)
            }
        }
    }
}

fn farthest_reachable(roads: &[Road], from: Vec2, targets: &[Vec2]) -> Option<Vec2> {
    let mut best = None;
    let mut best_distance = 0.0;

    for target in targets {
        if !path_stays_on_road(roads, from, *target) {
            continue;
        }
        let distance = from.distance(target);
        if distance > best_distance {
            best_distance = distance;
            best = Some(*target);
        }
    }

    best
}

/// Walks from `from` toward `to` along the varying axis, sampling every
/// `PROBE_STEP`. Only the intermediate samples are tested; diagonal paths are
/// never considered reachable.
fn path_stays_on_road(roads: &[Road], from: Vec2, to: Vec2) -> bool {
    let dx = if to.x - from.x > 0.0 { PROBE_STEP } else { -PROBE_STEP };
    let dy = if to.y - from.y > 0.0 { PROBE_STEP } else { -PROBE_STEP };

    if from.x == to.x {
        let mut y = from.y;
        loop {
            y += dy;
            if (dy > 0.0 && y >= to.y) || (dy < 0.0 && to.y >= y) {
                return true;
            }
            if !is_on_any_road(roads, Vec2::new(from.x, y)) {
                return false;
            }
        }
    } else if from.y == to.y {
        let mut x = from.x;
        loop {
            x += dx;
            if (dx > 0.0 && x >= to.x) || (dx < 0.0 && to.x >= x) {
                return true;
            }
            if !is_on_any_road(roads, Vec2::new(x, from.y)) {
                return false;
            }
        }
    } else {
        false
    }
}
