//! Lasers (spec §3, §4.C phase 3).
//!
//! Open Question (spec §9) resolved: a laser deals its damage once per tick
//! it exists, to every tank standing on one of its tiles that tick — not
//! once per enter-tile event. See `DESIGN.md`.

use crate::config::LASER_LIFETIME_TICKS;
use crate::entities::player::PlayerId;

pub struct Laser {
    pub tiles: Vec<(i32, i32)>,
    pub remaining_ticks: u32,
    pub shooter_id: PlayerId,
    pub damage: u32,
}

impl Laser {
    pub fn new(tiles: Vec<(i32, i32)>, shooter_id: PlayerId, damage: u32) -> Self {
        Self { tiles, remaining_ticks: LASER_LIFETIME_TICKS, shooter_id, damage }
    }

    pub fn covers(&self, x: i32, y: i32) -> bool {
        self.tiles.contains(&(x, y))
    }

    /// Decrement lifetime; returns true once expired.
    pub fn tick(&mut self) -> bool {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.remaining_ticks == 0
    }
}
