// Dropper AI: a random walker that re-seeds pellets when it crosses a cell
// clients have already eaten.

use std::collections::HashMap;

use crate::domain::map::{cell_of, tile_center, TileMap};
use crate::domain::state::{parse_map_index, DropperState, Position, RestoredPellet};

use super::{random_step, ACTOR_RADIUS};

/// Maze templates that receive a dropper (matches the ghost range).
pub const DROPPER_MAZE_COUNT: i32 = 12;
/// A pellet drop is attempted every this many ticks.
pub const PELLET_PLACEMENT_INTERVAL: u32 = 5;
/// Distance from a tile centre at which a dropper snaps and re-rolls.
const CENTER_SNAP_DISTANCE: f64 = 5.0;

/// One pellet a dropper wants to restore, paired with the ledger entry it
/// replaces.
#[derive(Clone, Debug, PartialEq)]
pub struct PelletRestore {
    /// Ledger key of the eaten pellet being restored.
    pub eaten_id: String,
    pub pellet: RestoredPellet,
}

/// Advance every dropper by one tick. `is_eaten` answers ledger membership
/// for `(pellet id, maze index)` against a point-in-time copy.
pub fn tick_droppers(
    droppers: &mut HashMap<String, DropperState>,
    map: &TileMap,
    is_eaten: impl Fn(&str, i32) -> bool,
) -> Vec<PelletRestore> {
    let mut restores = Vec::new();
    for dropper in droppers.values_mut() {
        if let Some(restore) = tick_dropper(dropper, map, &is_eaten) {
            restores.push(restore);
        }
    }
    restores
}

pub fn tick_dropper(
    dropper: &mut DropperState,
    map: &TileMap,
    is_eaten: &impl Fn(&str, i32) -> bool,
) -> Option<PelletRestore> {
    let map_index = parse_map_index(&dropper.id)?;

    dropper.last_position = dropper.position;

    let next = Position {
        x: dropper.position.x + dropper.velocity.x,
        y: dropper.position.y + dropper.velocity.y,
    };
    if dropper.velocity.is_zero() || !map.can_move(next.x, next.y, ACTOR_RADIUS) {
        dropper.velocity = random_step(dropper.position, dropper.velocity, map);
    } else {
        dropper.position = next;
        let col = cell_of(dropper.position.x);
        let row = cell_of(dropper.position.y);
        let center = tile_center(col, row);
        let near_center = (dropper.position.x - center.x).hypot(dropper.position.y - center.y)
            <= CENTER_SNAP_DISTANCE;
        if near_center
            && map.is_walkable(col, row)
            && map.can_move(center.x, center.y, ACTOR_RADIUS)
        {
            dropper.position = center;
            dropper.velocity = random_step(dropper.position, dropper.velocity, map);
        }
    }

    place_pellet(dropper, map, map_index, is_eaten)
}

/// Every N ticks, re-seed the pellet under the dropper's previous cell if a
/// client ate it earlier.
fn place_pellet(
    dropper: &mut DropperState,
    map: &TileMap,
    map_index: i32,
    is_eaten: &impl Fn(&str, i32) -> bool,
) -> Option<PelletRestore> {
    dropper.pellet_counter += 1;
    if dropper.pellet_counter < PELLET_PLACEMENT_INTERVAL {
        return None;
    }
    dropper.pellet_counter = 0;

    let col = cell_of(dropper.last_position.x);
    let row = cell_of(dropper.last_position.y);
    if !map.is_walkable(col, row) {
        return None;
    }
    let center = tile_center(col, row);
    let eaten_id = format!("{}-{}", center.x as i64, center.y as i64);
    if !is_eaten(&eaten_id, map_index) {
        return None;
    }

    Some(PelletRestore {
        eaten_id,
        pellet: RestoredPellet {
            id: format!("pellet-{col}-{row}-{map_index}"),
            position: center,
            map_index,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Velocity;

    fn open_map() -> TileMap {
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

    fn dropper(id: &str, x: f64, y: f64) -> DropperState {
        DropperState {
            id: id.to_string(),
            position: Position { x, y },
            velocity: Velocity::default(),
            last_position: Position { x, y },
            pellet_counter: 0,
        }
    }

    #[test]
    fn dropper_records_its_previous_position_each_tick() {
        let map = open_map();
        let mut walker = dropper("map5_dropper_1", 120.0, 200.0);
        walker.velocity = Velocity { x: 6.0, y: 0.0 };

        tick_dropper(&mut walker, &map, &|_, _| false);

        assert_eq!(walker.last_position, Position { x: 120.0, y: 200.0 });
        assert_eq!(walker.position, Position { x: 126.0, y: 200.0 });
    }

    #[test]
    fn restore_fires_only_on_the_placement_interval() {
        let map = open_map();
        let mut walker = dropper("map5_dropper_1", 120.0, 200.0);
        let always_eaten = |_: &str, _: i32| true;

        for tick in 1..PELLET_PLACEMENT_INTERVAL {
            assert!(
                tick_dropper(&mut walker, &map, &always_eaten).is_none(),
                "no restore expected on tick {tick}"
            );
        }
        let restore = tick_dropper(&mut walker, &map, &always_eaten)
            .expect("interval tick should restore");
        assert_eq!(restore.eaten_id, "120-200");
        assert_eq!(walker.pellet_counter, 0);
    }

    #[test]
    fn restored_pellet_carries_cell_centre_and_maze_index() {
        let map = open_map();
        let mut walker = dropper("map5_dropper_1", 121.0, 199.0);
        walker.pellet_counter = PELLET_PLACEMENT_INTERVAL - 1;
        let is_eaten = |id: &str, maze: i32| id == "120-200" && maze == 5;

        let restore =
            tick_dropper(&mut walker, &map, &is_eaten).expect("restore should fire");

        assert_eq!(restore.eaten_id, "120-200");
        assert_eq!(restore.pellet.id, "pellet-3-5-5");
        assert_eq!(restore.pellet.position, Position { x: 120.0, y: 200.0 });
        assert_eq!(restore.pellet.map_index, 5);
    }

    #[test]
    fn no_restore_when_the_pellet_was_never_eaten() {
        let map = open_map();
        let mut walker = dropper("map5_dropper_1", 120.0, 200.0);
        walker.pellet_counter = PELLET_PLACEMENT_INTERVAL - 1;

        assert!(tick_dropper(&mut walker, &map, &|_, _| false).is_none());
    }

    #[test]
    fn no_restore_from_a_wall_cell() {
        let map = open_map();
        // Last position on the border wall row.
        let mut walker = dropper("map5_dropper_1", 120.0, 200.0);
        walker.position = Position { x: 120.0, y: 0.0 };
        walker.pellet_counter = PELLET_PLACEMENT_INTERVAL - 1;

        assert!(tick_dropper(&mut walker, &map, &|_, _| true).is_none());
    }

    #[test]
    fn dropper_stays_on_open_tiles_over_many_ticks() {
        let map = open_map();
        let mut walker = dropper("map0_dropper_1", 160.0, 160.0);

        for _ in 0..200 {
            tick_dropper(&mut walker, &map, &|_, _| false);
            assert!(
                map.can_move(walker.position.x, walker.position.y, ACTOR_RADIUS),
                "dropper ended a tick inside a wall at {:?}",
                walker.position
            );
        }
    }

    #[test]
    fn malformed_dropper_ids_are_skipped() {
        let map = open_map();
        let mut walker = dropper("dropper_1", 160.0, 160.0);
        walker.velocity = Velocity { x: 6.0, y: 0.0 };

        assert!(tick_dropper(&mut walker, &map, &|_, _| true).is_none());
        // No movement either; the id carries the maze the dropper works on.
        assert_eq!(walker.position, Position { x: 160.0, y: 160.0 });
    }
}
