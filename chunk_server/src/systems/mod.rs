// Per-tick simulation rules: pure functions over domain state.

pub mod droppers;
pub mod ghosts;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::map::TileMap;
use crate::domain::state::{Position, Velocity};

/// Distance covered by one ghost or dropper step.
pub const STEP_SIZE: f64 = 6.0;
/// Collision radius shared by ghosts and droppers.
pub const ACTOR_RADIUS: f64 = 15.0;

/// Axis-aligned candidate steps.
pub const STEPS: [Velocity; 4] = [
    Velocity { x: STEP_SIZE, y: 0.0 },
    Velocity { x: -STEP_SIZE, y: 0.0 },
    Velocity { x: 0.0, y: STEP_SIZE },
    Velocity { x: 0.0, y: -STEP_SIZE },
];

/// Wall-clock tie break used when several directions are equally good.
pub(crate) fn tie_break(n: usize) -> usize {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    (nanos % n as u128) as usize
}

/// Candidate steps that do not collide from the given position.
pub(crate) fn valid_steps(position: Position, map: &TileMap) -> Vec<Velocity> {
    STEPS
        .iter()
        .copied()
        .filter(|step| map.can_move(position.x + step.x, position.y + step.y, ACTOR_RADIUS))
        .collect()
}

pub(crate) fn is_reverse(step: Velocity, current: Velocity) -> bool {
    !current.is_zero() && step.x == -current.x && step.y == -current.y
}

/// Remove the reverse of the current velocity unless it is the only option.
pub(crate) fn drop_reverse(steps: Vec<Velocity>, current: Velocity) -> Vec<Velocity> {
    let kept: Vec<Velocity> = steps
        .iter()
        .copied()
        .filter(|step| !is_reverse(*step, current))
        .collect();
    if kept.is_empty() {
        steps
    } else {
        kept
    }
}

/// Pick a fresh direction: non-reversing valid steps first, any valid step as
/// a fallback, standstill when boxed in.
pub(crate) fn random_step(position: Position, current: Velocity, map: &TileMap) -> Velocity {
    let valid = valid_steps(position, map);
    let pool: Vec<Velocity> = valid
        .iter()
        .copied()
        .filter(|step| !is_reverse(*step, current))
        .collect();
    let pool = if pool.is_empty() { valid } else { pool };
    if pool.is_empty() {
        return Velocity::default();
    }
    pool[tie_break(pool.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_detection_ignores_standstill() {
        let right = Velocity { x: STEP_SIZE, y: 0.0 };
        let left = Velocity { x: -STEP_SIZE, y: 0.0 };
        assert!(is_reverse(left, right));
        assert!(!is_reverse(right, right));
        assert!(!is_reverse(left, Velocity::default()));
    }

    #[test]
    fn drop_reverse_keeps_the_reverse_when_it_is_the_only_option() {
        let right = Velocity { x: STEP_SIZE, y: 0.0 };
        let left = Velocity { x: -STEP_SIZE, y: 0.0 };
        assert_eq!(drop_reverse(vec![left], right), vec![left]);
        assert_eq!(drop_reverse(vec![left, right], right), vec![right]);
    }
}
