// Wall grid geometry shared by the AI and the spawn logic.
//
// Tile (col, row) is centred at (col*40, row*40) and spans 20 pixels on each
// side; the tile containing an axis coordinate is round(p / 40).

use crate::domain::state::Position;

/// Side length of one wall tile, in pixels.
pub const TILE_SIZE: f64 = 40.0;

/// Tiles that connect neighbouring chunks. The AI treats them as walls;
/// players pass through them when crossing chunks.
const EXIT_TILES: [(i32, i32); 4] = [(0, 8), (16, 8), (8, 0), (8, 16)];

/// Wall grid for one maze template. `"0"` is walkable, anything else is wall.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap {
    rows: Vec<Vec<String>>,
}

impl TileMap {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_walkable(&self, col: i32, row: i32) -> bool {
        if col < 0 || row < 0 {
            return false;
        }
        self.rows
            .get(row as usize)
            .and_then(|tiles| tiles.get(col as usize))
            .map(|tile| tile == "0")
            .unwrap_or(false)
    }

    pub fn is_exit(col: i32, row: i32) -> bool {
        EXIT_TILES.contains(&(col, row))
    }

    /// A tile blocks AI movement when it is out of bounds, a wall, or an exit.
    fn blocks(&self, col: i32, row: i32) -> bool {
        !self.is_walkable(col, row) || Self::is_exit(col, row)
    }

    /// Collision test for an actor of the given radius centred on (x, y):
    /// every blocking tile that intersects the actor's bounding square is
    /// checked by closest-point distance.
    pub fn can_move(&self, x: f64, y: f64, radius: f64) -> bool {
        let min_col = cell_of(x - radius);
        let max_col = cell_of(x + radius);
        let min_row = cell_of(y - radius);
        let max_row = cell_of(y + radius);
        let radius_sq = radius * radius;

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                if !self.blocks(col, row) {
                    continue;
                }
                let left = col as f64 * TILE_SIZE - TILE_SIZE / 2.0;
                let top = row as f64 * TILE_SIZE - TILE_SIZE / 2.0;
                let closest_x = x.clamp(left, left + TILE_SIZE);
                let closest_y = y.clamp(top, top + TILE_SIZE);
                let dx = x - closest_x;
                let dy = y - closest_y;
                if dx * dx + dy * dy < radius_sq {
                    return false;
                }
            }
        }
        true
    }

    /// Evenly spaced walkable (non-exit) tile centres, used for actor spawns.
    pub fn spawn_points(&self, count: usize) -> Vec<Position> {
        let mut centers = Vec::new();
        for (row, tiles) in self.rows.iter().enumerate() {
            for col in 0..tiles.len() {
                let (col, row) = (col as i32, row as i32);
                if self.is_walkable(col, row) && !Self::is_exit(col, row) {
                    centers.push(tile_center(col, row));
                }
            }
        }
        if centers.is_empty() || count == 0 {
            return Vec::new();
        }
        (0..count)
            .map(|index| centers[index * centers.len() / count % centers.len()])
            .collect()
    }
}

/// Index of the tile containing the given axis coordinate.
pub fn cell_of(value: f64) -> i32 {
    (value / TILE_SIZE).round() as i32
}

/// Centre of the given tile.
pub fn tile_center(col: i32, row: i32) -> Position {
    Position {
        x: col as f64 * TILE_SIZE,
        y: row as f64 * TILE_SIZE,
    }
}
