// Ghost AI. The id suffix selects the strategy: `_ghost_0` chases the nearest
// player directly, `_ghost_1` aims ahead of a player, everything else wanders.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::map::{cell_of, tile_center, TileMap};
use crate::domain::state::{parse_map_index, GhostState, PlayerState, Position, Velocity};

use super::{drop_reverse, random_step, tie_break, valid_steps, ACTOR_RADIUS};

/// Number of maze templates that receive ghosts.
pub const GHOST_MAZE_COUNT: i32 = 12;
/// Ghosts seeded per maze; slot 0 and 1 are the chasers.
pub const GHOSTS_PER_MAZE: usize = 4;

/// How many steps ahead of the player the predictive chaser aims.
const PREDICTION_LOOKAHEAD: f64 = 8.0;
/// Gain for the nudge back toward the corridor centre line.
const CENTERING_GAIN: f64 = 0.2;
/// Nudges smaller than this are skipped.
const CENTERING_MIN_NUDGE: f64 = 0.5;
/// Distance from a tile centre at which a wandering ghost snaps and re-rolls.
const CENTER_SNAP_DISTANCE: f64 = 2.0;

enum Strategy {
    DirectChase,
    PredictiveChase,
    Random,
}

fn strategy_of(id: &str) -> Strategy {
    if id.ends_with("_ghost_0") {
        Strategy::DirectChase
    } else if id.ends_with("_ghost_1") {
        Strategy::PredictiveChase
    } else {
        Strategy::Random
    }
}

/// Advance every ghost by one tick.
pub fn tick_ghosts(
    ghosts: &mut HashMap<String, GhostState>,
    players: &HashMap<String, PlayerState>,
    map: &TileMap,
) {
    for ghost in ghosts.values_mut() {
        tick_ghost(ghost, players, map);
    }
}

pub fn tick_ghost(
    ghost: &mut GhostState,
    players: &HashMap<String, PlayerState>,
    map: &TileMap,
) {
    let Some(map_index) = parse_map_index(&ghost.id) else {
        return;
    };
    if !(0..GHOST_MAZE_COUNT).contains(&map_index) {
        return;
    }

    match strategy_of(&ghost.id) {
        Strategy::DirectChase => {
            let velocity = direct_chase_velocity(ghost, players, map, map_index);
            move_chaser(ghost, map, velocity);
        }
        Strategy::PredictiveChase => {
            let velocity = predictive_chase_velocity(ghost, players, map, map_index);
            move_chaser(ghost, map, velocity);
        }
        Strategy::Random => tick_random(ghost, map),
    }
}

/// Chasers pick a velocity first, then attempt the move; a blocked move
/// zeroes the velocity for this tick.
fn move_chaser(ghost: &mut GhostState, map: &TileMap, velocity: Velocity) {
    ghost.velocity = velocity;
    if ghost.velocity.is_zero() {
        return;
    }
    let next = Position {
        x: ghost.position.x + ghost.velocity.x,
        y: ghost.position.y + ghost.velocity.y,
    };
    if !map.can_move(next.x, next.y, ACTOR_RADIUS) {
        ghost.velocity = Velocity::default();
        return;
    }
    ghost.position = next;
    apply_centering(ghost, map);
}

/// Nudge the ghost toward the centre line of the axis it is not moving on.
fn apply_centering(ghost: &mut GhostState, map: &TileMap) {
    let center = tile_center(cell_of(ghost.position.x), cell_of(ghost.position.y));
    if ghost.velocity.x != 0.0 {
        let nudge = (center.y - ghost.position.y) * CENTERING_GAIN;
        let nudged = ghost.position.y + nudge;
        if nudge.abs() > CENTERING_MIN_NUDGE && map.can_move(ghost.position.x, nudged, ACTOR_RADIUS)
        {
            ghost.position.y = nudged;
        }
    } else if ghost.velocity.y != 0.0 {
        let nudge = (center.x - ghost.position.x) * CENTERING_GAIN;
        let nudged = ghost.position.x + nudge;
        if nudge.abs() > CENTERING_MIN_NUDGE && map.can_move(nudged, ghost.position.y, ACTOR_RADIUS)
        {
            ghost.position.x = nudged;
        }
    }
}

fn players_on_maze<'a>(
    players: &'a HashMap<String, PlayerState>,
    map_index: i32,
) -> impl Iterator<Item = &'a PlayerState> {
    players
        .values()
        .filter(move |player| player.location.map_index() == map_index)
}

fn distance_sq(a: Position, b: Position) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

fn total_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Step toward the closest player's tile, preferring the axis with the larger
/// tile delta, with the other axis and then any open step as fallbacks.
fn direct_chase_velocity(
    ghost: &GhostState,
    players: &HashMap<String, PlayerState>,
    map: &TileMap,
    map_index: i32,
) -> Velocity {
    let valid = valid_steps(ghost.position, map);
    if valid.is_empty() {
        return Velocity::default();
    }

    let Some(target) = players_on_maze(players, map_index)
        .min_by(|a, b| {
            total_cmp(
                distance_sq(a.position, ghost.position),
                distance_sq(b.position, ghost.position),
            )
        })
    else {
        // Nobody to chase on this maze; wander instead.
        return random_step(ghost.position, ghost.velocity, map);
    };

    let hd = cell_of(target.position.x) - cell_of(ghost.position.x);
    let vd = cell_of(target.position.y) - cell_of(ghost.position.y);

    let horizontal: Vec<Velocity> = valid
        .iter()
        .copied()
        .filter(|step| (hd > 0 && step.x > 0.0) || (hd < 0 && step.x < 0.0))
        .collect();
    let vertical: Vec<Velocity> = valid
        .iter()
        .copied()
        .filter(|step| (vd > 0 && step.y > 0.0) || (vd < 0 && step.y < 0.0))
        .collect();

    let (preferred, fallback) = if hd.abs() >= vd.abs() {
        (horizontal, vertical)
    } else {
        (vertical, horizontal)
    };
    let pool = if !preferred.is_empty() {
        preferred
    } else if !fallback.is_empty() {
        fallback
    } else {
        valid
    };
    let pool = drop_reverse(pool, ghost.velocity);
    pool[tie_break(pool.len())]
}

/// Step toward where a player will be in a few ticks.
fn predictive_chase_velocity(
    ghost: &GhostState,
    players: &HashMap<String, PlayerState>,
    map: &TileMap,
    map_index: i32,
) -> Velocity {
    let valid = valid_steps(ghost.position, map);
    if valid.is_empty() {
        return Velocity::default();
    }

    let Some(target) = players_on_maze(players, map_index).next() else {
        return random_step(ghost.position, ghost.velocity, map);
    };
    let aim = Position {
        x: target.position.x + target.velocity.x * PREDICTION_LOOKAHEAD,
        y: target.position.y + target.velocity.y * PREDICTION_LOOKAHEAD,
    };

    let pool = drop_reverse(valid, ghost.velocity);
    pool.into_iter()
        .min_by(|a, b| {
            let after_a = Position {
                x: ghost.position.x + a.x,
                y: ghost.position.y + a.y,
            };
            let after_b = Position {
                x: ghost.position.x + b.x,
                y: ghost.position.y + b.y,
            };
            total_cmp(distance_sq(after_a, aim), distance_sq(after_b, aim))
        })
        .unwrap_or_default()
}

/// Wanderer: keep going while the way is open, re-roll at walls, and snap to
/// tile centres so corners get taken.
fn tick_random(ghost: &mut GhostState, map: &TileMap) {
    let next = Position {
        x: ghost.position.x + ghost.velocity.x,
        y: ghost.position.y + ghost.velocity.y,
    };
    if ghost.velocity.is_zero() || !map.can_move(next.x, next.y, ACTOR_RADIUS) {
        ghost.velocity = random_step(ghost.position, ghost.velocity, map);
        return;
    }

    ghost.position = next;

    let col = cell_of(ghost.position.x);
    let row = cell_of(ghost.position.y);
    let center = tile_center(col, row);
    let near_center = (ghost.position.x - center.x).hypot(ghost.position.y - center.y)
        <= CENTER_SNAP_DISTANCE;
    if near_center && map.is_walkable(col, row) && map.can_move(center.x, center.y, ACTOR_RADIUS) {
        ghost.position = center;
        ghost.velocity = random_step(ghost.position, ghost.velocity, map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Location, PlayerStatus};

    /// 17x17 grid that is fully open except for the border.
    fn corridor_map() -> TileMap {
        let mut rows = vec![vec!["0".to_string(); 17]; 17];
        for col in 0..17 {
            rows[0][col] = "1".to_string();
            rows[16][col] = "1".to_string();
        }
        for row in rows.iter_mut() {
            row[0] = "1".to_string();
            row[16] = "1".to_string();
        }
        TileMap::new(rows)
    }

    fn player_at(id: &str, x: f64, y: f64, location: Location) -> (String, PlayerState) {
        (
            id.to_string(),
            PlayerState {
                id: id.to_string(),
                position: Position { x, y },
                velocity: Velocity::default(),
                score: 0,
                status: PlayerStatus::Active,
                location,
            },
        )
    }

    fn ghost(id: &str, x: f64, y: f64) -> GhostState {
        GhostState {
            id: id.to_string(),
            position: Position { x, y },
            velocity: Velocity::default(),
        }
    }

    #[test]
    fn direct_chaser_steps_toward_the_player_on_a_straight_corridor() {
        let map = corridor_map();
        let players: HashMap<_, _> =
            [player_at("p1", 240.0, 160.0, Location { x: 0, y: 0 })].into();
        let mut chaser = ghost("map0_ghost_0", 120.0, 160.0);

        tick_ghost(&mut chaser, &players, &map);

        assert_eq!(chaser.velocity, Velocity { x: 6.0, y: 0.0 });
        assert_eq!(chaser.position, Position { x: 126.0, y: 160.0 });
    }

    #[test]
    fn direct_chaser_prefers_the_axis_with_the_larger_delta() {
        let map = corridor_map();
        let players: HashMap<_, _> =
            [player_at("p1", 160.0, 320.0, Location { x: 0, y: 0 })].into();
        let mut chaser = ghost("map0_ghost_0", 160.0, 160.0);

        tick_ghost(&mut chaser, &players, &map);

        assert_eq!(chaser.velocity, Velocity { x: 0.0, y: 6.0 });
    }

    #[test]
    fn direct_chaser_ignores_players_on_other_mazes() {
        let map = corridor_map();
        // The only player is on maze 5; the maze-0 chaser has nobody to chase
        // and wanders instead, so its step is any valid one.
        let players: HashMap<_, _> =
            [player_at("p1", 240.0, 160.0, Location { x: 1, y: 1 })].into();
        let mut chaser = ghost("map0_ghost_0", 160.0, 160.0);

        tick_ghost(&mut chaser, &players, &map);

        assert!(!chaser.velocity.is_zero());
    }

    #[test]
    fn predictive_chaser_aims_ahead_of_the_player() {
        let map = corridor_map();
        // Player at (160, 160) moving right at 6/tick; aim point is
        // (208, 160), so the ghost at (280, 160) closes leftward.
        let mut players: HashMap<_, _> =
            [player_at("p1", 160.0, 160.0, Location { x: 0, y: 0 })].into();
        if let Some(player) = players.get_mut("p1") {
            player.velocity = Velocity { x: 6.0, y: 0.0 };
        }
        let mut chaser = ghost("map0_ghost_1", 280.0, 160.0);

        tick_ghost(&mut chaser, &players, &map);

        assert_eq!(chaser.velocity, Velocity { x: -6.0, y: 0.0 });
        assert_eq!(chaser.position, Position { x: 274.0, y: 160.0 });
    }

    #[test]
    fn chaser_with_an_invalid_maze_index_does_not_move() {
        let map = corridor_map();
        let players: HashMap<_, _> =
            [player_at("p1", 240.0, 160.0, Location { x: 0, y: 0 })].into();
        let mut chaser = ghost("map14_ghost_0", 120.0, 160.0);

        tick_ghost(&mut chaser, &players, &map);

        assert_eq!(chaser.position, Position { x: 120.0, y: 160.0 });
    }

    #[test]
    fn random_ghost_only_ever_occupies_open_space() {
        let map = corridor_map();
        let players = HashMap::new();
        let mut wanderer = ghost("map0_ghost_2", 160.0, 160.0);

        for _ in 0..200 {
            tick_ghost(&mut wanderer, &players, &map);
            assert!(
                map.can_move(wanderer.position.x, wanderer.position.y, ACTOR_RADIUS),
                "ghost ended a tick inside a wall at {:?}",
                wanderer.position
            );
        }
    }

    #[test]
    fn blocked_chaser_zeroes_its_velocity() {
        // Single open tile: every step collides with the border.
        let rows = vec![
            vec!["1".to_string(), "1".to_string(), "1".to_string()],
            vec!["1".to_string(), "0".to_string(), "1".to_string()],
            vec!["1".to_string(), "1".to_string(), "1".to_string()],
        ];
        let map = TileMap::new(rows);
        let players: HashMap<_, _> =
            [player_at("p1", 40.0, 40.0, Location { x: 0, y: 0 })].into();
        let mut chaser = ghost("map0_ghost_0", 40.0, 40.0);

        tick_ghost(&mut chaser, &players, &map);

        assert!(chaser.velocity.is_zero());
        assert_eq!(chaser.position, Position { x: 40.0, y: 40.0 });
    }
}
