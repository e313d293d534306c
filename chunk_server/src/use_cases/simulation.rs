// Authoritative simulation: ghost and dropper tick loops over the shared world.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::map::TileMap;
use crate::domain::state::{DropperState, GhostState, Velocity};
use crate::domain::world::ChunkWorld;
use crate::systems::droppers::{self, DROPPER_MAZE_COUNT};
use crate::systems::ghosts::{self, GHOST_MAZE_COUNT, GHOSTS_PER_MAZE};

/// Fixed simulation tick (20 Hz).
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Seed ghosts and droppers for every populated maze template. All mazes
/// share the chunk's wall grid, so the spawn points are shared too.
pub async fn populate_world(world: &ChunkWorld, map: &TileMap) {
    let ghost_spawns = map.spawn_points(GHOSTS_PER_MAZE);
    for maze in 0..GHOST_MAZE_COUNT {
        for (slot, spawn) in ghost_spawns.iter().enumerate() {
            world
                .put_ghost(GhostState {
                    id: format!("map{maze}_ghost_{slot}"),
                    position: *spawn,
                    velocity: Velocity::default(),
                })
                .await;
        }
    }

    let dropper_spawns = map.spawn_points(1);
    if let Some(spawn) = dropper_spawns.first() {
        for maze in 0..DROPPER_MAZE_COUNT {
            world
                .put_dropper(DropperState {
                    id: format!("map{maze}_dropper_1"),
                    position: *spawn,
                    velocity: Velocity::default(),
                    last_position: *spawn,
                    pellet_counter: 0,
                })
                .await;
        }
    }
}

/// One ghost pass: copy shared state, run the pure tick, write back.
pub async fn step_ghosts(world: &ChunkWorld, map: &TileMap) {
    let players = world.players().await;
    let mut ghosts = world.ghosts().await;
    ghosts::tick_ghosts(&mut ghosts, &players, map);
    world.replace_ghosts(ghosts).await;
}

/// One dropper pass: walk the droppers and apply any pellet restores.
pub async fn step_droppers(world: &ChunkWorld, map: &TileMap) {
    let mut droppers = world.droppers().await;
    let eaten = world.eaten_by_maze().await;
    let restores = droppers::tick_droppers(&mut droppers, map, |pellet_id, maze| {
        usize::try_from(maze)
            .ok()
            .and_then(|index| eaten.get(index))
            .map(|set| set.contains(pellet_id))
            .unwrap_or(false)
    });
    world.replace_droppers(droppers).await;

    for restore in restores {
        let maze = restore.pellet.map_index;
        world.unmark_pellet(&restore.eaten_id, maze).await;
        world.add_restored_pellet(restore.pellet).await;
    }
}

/// Drive the ghost AI at the fixed tick rate until the task is dropped.
pub async fn run_ghost_loop(world: Arc<ChunkWorld>, map: Arc<TileMap>) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    loop {
        ticker.tick().await;
        step_ghosts(&world, &map).await;
    }
}

/// Drive the droppers at the fixed tick rate until the task is dropped.
pub async fn run_dropper_loop(world: Arc<ChunkWorld>, map: Arc<TileMap>) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    loop {
        ticker.tick().await;
        step_droppers(&world, &map).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Location, PlayerState, Position};

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

    #[tokio::test]
    async fn populate_seeds_four_ghosts_and_one_dropper_per_maze() {
        let world = ChunkWorld::new("0,0");
        let map = open_map();

        populate_world(&world, &map).await;

        let ghosts = world.ghosts().await;
        assert_eq!(ghosts.len(), (GHOST_MAZE_COUNT as usize) * GHOSTS_PER_MAZE);
        assert!(ghosts.contains_key("map0_ghost_0"));
        assert!(ghosts.contains_key("map11_ghost_3"));

        let droppers = world.droppers().await;
        assert_eq!(droppers.len(), DROPPER_MAZE_COUNT as usize);
        assert!(droppers.contains_key("map11_dropper_1"));
    }

    #[tokio::test]
    async fn eaten_pellet_is_restored_when_a_dropper_revisits_the_cell() {
        let world = ChunkWorld::new("0,0");
        let map = open_map();
        let location = Location { x: 1, y: 1 };

        // A client reports the pellet at the centre of cell (3, 5) as eaten.
        world.mark_pellet_eaten("120-200", location).await;

        // Park a dropper on that cell, one tick away from a placement.
        world
            .put_dropper(DropperState {
                id: "map5_dropper_1".to_string(),
                position: Position { x: 120.0, y: 200.0 },
                velocity: Velocity::default(),
                last_position: Position { x: 120.0, y: 200.0 },
                pellet_counter: droppers::PELLET_PLACEMENT_INTERVAL - 1,
            })
            .await;

        step_droppers(&world, &map).await;

        let restored = world.drain_restored_pellets().await;
        assert_eq!(restored.len(), 1);
        let pellet = restored.values().next().expect("one pellet expected");
        assert_eq!(pellet.position, Position { x: 120.0, y: 200.0 });
        assert_eq!(pellet.map_index, 5);
        // The ledger entry is gone once the pellet is back on the board.
        assert!(!world.is_pellet_eaten("120-200", location.map_index()).await);
    }

    #[tokio::test]
    async fn ghost_step_moves_a_chaser_toward_its_target() {
        let world = ChunkWorld::new("0,0");
        let map = open_map();
        world
            .put_ghost(GhostState {
                id: "map0_ghost_0".to_string(),
                position: Position { x: 120.0, y: 160.0 },
                velocity: Velocity::default(),
            })
            .await;
        world
            .upsert_player(PlayerState {
                id: "p1".to_string(),
                position: Position { x: 240.0, y: 160.0 },
                velocity: Velocity::default(),
                score: 0,
                status: Default::default(),
                location: Location { x: 0, y: 0 },
            })
            .await;

        step_ghosts(&world, &map).await;

        let ghosts = world.ghosts().await;
        assert_eq!(
            ghosts["map0_ghost_0"].position,
            Position { x: 126.0, y: 160.0 }
        );
    }
}
