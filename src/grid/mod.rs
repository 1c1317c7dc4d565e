//! Static map: walls, zones, spawn points (spec §3, §4.A).
//!
//! The grid is generated once at match start from a seeded PRNG and never
//! mutated afterwards; everything downstream only reads it.

pub mod zone;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entities::tank::SecondaryItem;

pub use zone::{CaptureState, Zone};

/// Grid side length, in tiles.
pub type Dim = u8;

/// Integer tile coordinates, origin top-left.
pub type Coord = (i32, i32);

/// One of the four cardinal directions, forming a cyclic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub fn next(self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    pub fn previous(self) -> Direction {
        self.next().next().next()
    }

    /// Unit step `(dx, dy)` for one tile of movement in this direction.
    pub fn step(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

/// A rotation command; maps onto [`Direction::next`]/[`Direction::previous`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rotation {
    Left,
    Right,
}

impl Rotation {
    pub fn apply(self, dir: Direction) -> Direction {
        match self {
            Rotation::Left => dir.previous(),
            Rotation::Right => dir.next(),
        }
    }
}

/// A single wall tile state. Borders are implicit and not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wall {
    None,
    Solid,
}

pub struct Grid {
    pub dim: Dim,
    walls: Vec<Wall>,
    pub zones: Vec<Zone>,
    pub spawn_points: Vec<(Coord, Direction)>,
    /// Tiles carrying a map item at match start (spec §3 `Item`, §4.C phase
    /// 10). Drawn last in the fixed generation order (walls, zones, spawns,
    /// items) so the same seed always places the same items.
    pub item_spawns: Vec<(Coord, SecondaryItem)>,
}

impl Grid {
    fn index(&self, x: i32, y: i32) -> usize {
        (y as usize) * (self.dim as usize) + (x as usize)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.dim as u32 && (y as u32) < self.dim as u32
    }

    /// Walls are implicit-solid outside the grid; the border always blocks.
    pub fn wall_at(&self, x: i32, y: i32) -> Wall {
        if !self.in_bounds(x, y) {
            return Wall::Solid;
        }
        self.walls[self.index(x, y)]
    }

    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        matches!(self.wall_at(x, y), Wall::Solid)
    }

    pub fn zone_containing(&self, x: i32, y: i32) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(x, y))
    }

    pub fn zone_containing_mut(&mut self, x: i32, y: i32) -> Option<&mut Zone> {
        self.zones.iter_mut().find(|z| z.contains(x, y))
    }

    /// Generate a fresh map for this match. All randomness is drawn from
    /// `rng` in a fixed order (walls, then zones, then spawns, then items)
    /// so that the same seeded stream always yields the same map.
    pub fn generate(rng: &mut StdRng, dim: Dim, sandbox: bool) -> Grid {
        let size = dim as usize * dim as usize;
        let mut walls = vec![Wall::None; size];

        if !sandbox {
            // Scatter a modest number of interior wall tiles, never on the
            // outermost ring (that's already implicit border) and never
            // adjacent to another wall tile, to avoid sealed pockets.
            let wall_budget = size / 12;
            let mut placed = 0;
            let mut attempts = 0;
            while placed < wall_budget && attempts < wall_budget * 20 {
                attempts += 1;
                let x = rng.gen_range(1..dim as i32 - 1);
                let y = rng.gen_range(1..dim as i32 - 1);
                let idx = (y as usize) * dim as usize + (x as usize);
                if matches!(walls[idx], Wall::None) {
                    walls[idx] = Wall::Solid;
                    placed += 1;
                }
            }
        }

        let zone_letters = ['A', 'B', 'C', 'D'];
        let zone_count = if dim < 10 { 1 } else { zone_letters.len() };
        let mut zones = Vec::with_capacity(zone_count);
        let zone_size = (dim as i32 / 5).max(2);
        for (i, letter) in zone_letters.iter().take(zone_count).enumerate() {
            let (ox, oy) = zone_anchor(dim, i, zone_count);
            zones.push(Zone::new(
                letter.to_string(),
                ox,
                oy,
                (ox + zone_size - 1).min(dim as i32 - 1),
                (oy + zone_size - 1).min(dim as i32 - 1),
            ));
            // Zones are never blocked by generated walls.
            for yy in oy..=(oy + zone_size - 1).min(dim as i32 - 1) {
                for xx in ox..=(ox + zone_size - 1).min(dim as i32 - 1) {
                    let idx = (yy as usize) * dim as usize + (xx as usize);
                    walls[idx] = Wall::None;
                }
            }
        }

        let mut candidates: Vec<(Coord, Direction)> = Vec::new();
        for y in 0..dim as i32 {
            for x in 0..dim as i32 {
                let idx = (y as usize) * dim as usize + (x as usize);
                if matches!(walls[idx], Wall::None) {
                    candidates.push(((x, y), *Direction::ALL.choose(rng).unwrap()));
                }
            }
        }
        candidates.shuffle(rng);

        let spawn_count = 8.min(candidates.len());
        let spawn_points: Vec<(Coord, Direction)> = candidates[..spawn_count].to_vec();

        const ITEM_KINDS: [SecondaryItem; 4] =
            [SecondaryItem::Laser, SecondaryItem::DoubleBullet, SecondaryItem::Radar, SecondaryItem::Mine];
        let item_count = 6.min(candidates.len().saturating_sub(spawn_count));
        let item_spawns: Vec<(Coord, SecondaryItem)> = candidates[spawn_count..spawn_count + item_count]
            .iter()
            .map(|(coord, _)| (*coord, *ITEM_KINDS.choose(rng).unwrap()))
            .collect();

        Grid { dim, walls, zones, spawn_points, item_spawns }
    }

    /// Chooses uniformly among spawn points not currently under a living
    /// tank (spec §4.C phase 7 "a free spawn point"), falling back to the
    /// full list only if every spawn point happens to be occupied.
    pub fn random_spawn(&self, rng: &mut StdRng, occupied: &[(i32, i32)]) -> (Coord, Direction) {
        let free: Vec<&(Coord, Direction)> = self.spawn_points.iter().filter(|(c, _)| !occupied.contains(c)).collect();
        match free.choose(rng) {
            Some(&&point) => point,
            None => *self.spawn_points.choose(rng).expect("grid always has spawn points"),
        }
    }
}

fn zone_anchor(dim: Dim, index: usize, total: usize) -> (i32, i32) {
    let dim = dim as i32;
    let margin = dim / 6;
    match (index, total) {
        (0, 1) => (dim / 2 - 1, dim / 2 - 1),
        (0, _) => (margin, margin),
        (1, _) => (dim - margin - 3, margin),
        (2, _) => (margin, dim - margin - 3),
        _ => (dim - margin - 3, dim - margin - 3),
    }
}
