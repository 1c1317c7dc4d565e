//! Mines (spec §3, §4.C phase 4).

use crate::config::{MINE_DAMAGE, MINE_FADE_TICKS};
use crate::entities::player::PlayerId;

pub struct Mine {
    pub x: i32,
    pub y: i32,
    pub damage: u32,
    pub owner_id: PlayerId,
    /// `None` while armed; set to the fade countdown once detonated.
    pub explode_remaining_ticks: Option<u32>,
    /// Ticks since this mine was dropped — used for the owner's arming grace.
    pub age_ticks: u32,
}

impl Mine {
    pub fn new(x: i32, y: i32, owner_id: PlayerId) -> Self {
        Self { x, y, damage: MINE_DAMAGE, owner_id, explode_remaining_ticks: None, age_ticks: 0 }
    }

    pub fn is_armed(&self) -> bool {
        self.explode_remaining_ticks.is_none()
    }

    pub fn detonate(&mut self) {
        self.explode_remaining_ticks = Some(MINE_FADE_TICKS);
    }

    /// Returns true once fully faded out and ready for removal.
    pub fn tick_fade(&mut self) -> bool {
        match &mut self.explode_remaining_ticks {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        }
    }
}
