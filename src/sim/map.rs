//! Tile map boundary
//!
//! The simulation never loads maps itself. It queries a [`LevelMap`] for solid
//! tiles and trigger tiles; [`TileGrid`] is the in-memory implementation built
//! from the ASCII layouts in the game config.

use bevy::prelude::*;

use super::geometry::Aabb;
use crate::error::ConfigError;

pub type TileId = u32;

pub const FLOOR: TileId = 0;
pub const WALL: TileId = 1;
pub const PORTAL: TileId = 2;

/// Read-only tile queries used by movement, projectiles and map transitions.
pub trait LevelMap: Send + Sync {
    /// Edge length of a square tile in pixels.
    fn tile_size(&self) -> f32;

    /// Out-of-bounds tiles are solid.
    fn is_solid_tile_at(&self, tile_x: i32, tile_y: i32) -> bool;

    fn tile_id_at(&self, tile_x: i32, tile_y: i32) -> Option<TileId>;

    fn tile_coords(&self, point: Vec2) -> (i32, i32) {
        let size = self.tile_size();
        ((point.x / size).floor() as i32, (point.y / size).floor() as i32)
    }

    /// Samples the four corners of `area`.
    fn is_area_solid(&self, area: &Aabb) -> bool {
        area.sample_corners().iter().any(|corner| {
            let (tx, ty) = self.tile_coords(*corner);
            self.is_solid_tile_at(tx, ty)
        })
    }

    /// True when any corner of `area` rests on a tile with the given id.
    fn touches_tile(&self, area: &Aabb, id: TileId) -> bool {
        area.sample_corners().iter().any(|corner| {
            let (tx, ty) = self.tile_coords(*corner);
            self.tile_id_at(tx, ty) == Some(id)
        })
    }
}

/// Dense grid of tile ids. Only [`WALL`] tiles are solid.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tile_size: f32,
    tiles: Vec<TileId>,
}

impl TileGrid {
    /// An all-floor grid.
    pub fn open(width: usize, height: usize, tile_size: f32) -> Self {
        Self {
            width,
            height,
            tile_size,
            tiles: vec![FLOOR; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Panics when the coordinates are outside the grid.
    pub fn set(&mut self, tile_x: usize, tile_y: usize, id: TileId) {
        assert!(
            tile_x < self.width && tile_y < self.height,
            "tile ({tile_x}, {tile_y}) outside {}x{} grid",
            self.width,
            self.height
        );
        self.tiles[tile_y * self.width + tile_x] = id;
    }

    /// Top-left pixel position of a tile.
    pub fn tile_origin(&self, tile_x: usize, tile_y: usize) -> Vec2 {
        Vec2::new(tile_x as f32, tile_y as f32) * self.tile_size
    }

    fn index(&self, tile_x: i32, tile_y: i32) -> Option<usize> {
        if tile_x < 0 || tile_y < 0 {
            return None;
        }
        let (x, y) = (tile_x as usize, tile_y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }
}

impl LevelMap for TileGrid {
    fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn is_solid_tile_at(&self, tile_x: i32, tile_y: i32) -> bool {
        match self.index(tile_x, tile_y) {
            Some(i) => self.tiles[i] == WALL,
            None => true,
        }
    }

    fn tile_id_at(&self, tile_x: i32, tile_y: i32) -> Option<TileId> {
        self.index(tile_x, tile_y).map(|i| self.tiles[i])
    }
}

/// Things placed by a level layout besides terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMarker {
    Player,
    Enemy,
    Boss,
    Trap,
}

/// Result of parsing an ASCII layout.
#[derive(Debug, Clone)]
pub struct ParsedLayout {
    pub grid: TileGrid,
    /// Marker and tile coordinates, in reading order.
    pub spawns: Vec<(SpawnMarker, usize, usize)>,
}

impl ParsedLayout {
    pub fn player_spawn(&self) -> Option<(usize, usize)> {
        self.spawns
            .iter()
            .find(|(marker, _, _)| *marker == SpawnMarker::Player)
            .map(|&(_, x, y)| (x, y))
    }
}

/// Parse a layout:
/// `#` wall, `.` floor, `P` portal, `@` player start, `e` enemy, `B` boss, `T` trap.
///
/// Rows must all have the same width and exactly one `@` must be present.
pub fn parse_layout(level: &str, rows: &[String], tile_size: f32) -> Result<ParsedLayout, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidLevel {
        level: level.to_string(),
        reason,
    };

    let height = rows.len();
    let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
    if width == 0 {
        return Err(invalid("layout is empty".to_string()));
    }

    let mut grid = TileGrid::open(width, height, tile_size);
    let mut spawns = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        if row.chars().count() != width {
            return Err(invalid(format!("row {y} has width {} instead of {width}", row.chars().count())));
        }
        for (x, glyph) in row.chars().enumerate() {
            match glyph {
                '#' => grid.set(x, y, WALL),
                '.' => {}
                'P' => grid.set(x, y, PORTAL),
                '@' => spawns.push((SpawnMarker::Player, x, y)),
                'e' => spawns.push((SpawnMarker::Enemy, x, y)),
                'B' => spawns.push((SpawnMarker::Boss, x, y)),
                'T' => spawns.push((SpawnMarker::Trap, x, y)),
                other => return Err(invalid(format!("unknown glyph `{other}` at ({x}, {y})"))),
            }
        }
    }

    let players = spawns.iter().filter(|(m, _, _)| *m == SpawnMarker::Player).count();
    if players != 1 {
        return Err(invalid(format!("expected exactly one player start, found {players}")));
    }

    Ok(ParsedLayout { grid, spawns })
}

/// The map of the level currently being played.
#[derive(Resource)]
pub struct CurrentLevel {
    pub index: usize,
    pub name: String,
    pub map: Box<dyn LevelMap>,
}
