//! Player identity (spec §3).

use serde::Serialize;

use crate::config::RESPAWN_TICKS;
use crate::entities::tank::Tank;

/// Opaque per-match player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(s: impl Into<String>) -> Self {
        PlayerId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 24-bit RGB color, wire-encoded as a packed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub fn packed(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }
}

pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub color: Color,
    pub score: u32,
    pub kills: u32,
    pub remaining_ticks_to_regen_bullet: u32,
    /// Set for exactly the tick radar was activated; cleared once the
    /// broadcast for that tick has gone out (spec §9 design note).
    pub is_using_radar: bool,
    pub tank: Option<Tank>,
    /// `dim * dim` row-major visibility grid, recomputed every tick (phase 8).
    pub visibility: Vec<bool>,
    pub is_bot: bool,
    pub is_disconnected: bool,
    /// Set by the dispatcher on the first accepted action this tick; cleared
    /// by the scheduler after draining (spec §4.F `HasMadeActionThisTick`).
    pub has_acted_this_tick: bool,
}

impl Player {
    pub fn new(id: PlayerId, nickname: String, color: Color, dim: u8, is_bot: bool) -> Self {
        Self {
            id,
            nickname,
            color,
            score: 0,
            kills: 0,
            remaining_ticks_to_regen_bullet: RESPAWN_TICKS,
            is_using_radar: false,
            tank: None,
            visibility: vec![false; dim as usize * dim as usize],
            is_bot,
            is_disconnected: false,
            has_acted_this_tick: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.tank.as_ref().map(|t| t.health > 0).unwrap_or(false)
    }

    /// Consumed-at-broadcast flag (spec §9): call after the tick's broadcast
    /// has been fanned out.
    pub fn clear_radar_flag(&mut self) {
        self.is_using_radar = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_packs_rgb_into_one_integer() {
        assert_eq!(Color(0xff, 0x00, 0x10).packed(), 0xff0010);
    }

    #[test]
    fn fresh_player_has_no_tank_and_is_not_alive() {
        let p = Player::new(PlayerId::new("p1"), "Ann".into(), Color(1, 2, 3), 10, false);
        assert!(!p.is_alive());
        assert_eq!(p.visibility.len(), 100);
    }
}
