//! Tank and turret entities with their invariant-preserving operations
//! (spec §4.B).

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::{BULLET_REGEN_TICKS, MAX_BULLETS};
use crate::entities::player::PlayerId;
use crate::grid::{Direction, Rotation};

bitflags! {
    /// Which actions a stun effect blocks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Stun: u8 {
        const MOVEMENT    = 0b0001;
        const ROTATION    = 0b0010;
        const ABILITY_USE = 0b0100;
        const ALL = Self::MOVEMENT.bits() | Self::ROTATION.bits() | Self::ABILITY_USE.bits();
    }
}

/// One active stun effect, keyed by its source in the owning tank's map.
#[derive(Debug, Clone)]
pub struct StunEffect {
    pub blocks: Stun,
    pub remaining_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecondaryItem {
    None,
    Laser,
    DoubleBullet,
    Radar,
    Mine,
}

pub struct Turret {
    pub direction: Direction,
    pub bullet_count: u32,
    pub bullet_regen_progress: u32,
}

impl Turret {
    pub fn new(direction: Direction) -> Self {
        Self { direction, bullet_count: MAX_BULLETS, bullet_regen_progress: 0 }
    }

    pub fn rotate(&mut self, rotation: Rotation, blocked: bool) {
        if blocked {
            return;
        }
        self.direction = rotation.apply(self.direction);
    }

    /// Requires at least one bullet and no `ABILITY_USE` stun. Consumes a bullet
    /// and returns whether the shot was accepted.
    pub fn try_shoot(&mut self, blocked: bool) -> bool {
        if blocked || self.bullet_count == 0 {
            return false;
        }
        self.bullet_count -= 1;
        true
    }

    /// One regen tick; returns true if a bullet was gained.
    pub fn tick_regen(&mut self) -> bool {
        if self.bullet_count >= MAX_BULLETS {
            return false;
        }
        self.bullet_regen_progress += 1;
        if self.bullet_regen_progress >= BULLET_REGEN_TICKS {
            self.bullet_regen_progress = 0;
            self.bullet_count += 1;
            true
        } else {
            false
        }
    }
}

/// Result of [`Tank::take_damage`].
pub struct DamageOutcome {
    pub damage_taken: u32,
    pub killed: bool,
}

pub struct Tank {
    pub x: i32,
    pub y: i32,
    pub previous_x: i32,
    pub previous_y: i32,
    pub direction: Direction,
    pub health: u32,
    pub owner_id: PlayerId,
    pub turret: Turret,
    pub secondary_item: SecondaryItem,
    pub stuns: HashMap<&'static str, StunEffect>,
}

impl Tank {
    pub fn new(owner_id: PlayerId, x: i32, y: i32, direction: Direction) -> Self {
        Self {
            x,
            y,
            previous_x: x,
            previous_y: y,
            direction,
            health: 100,
            owner_id,
            turret: Turret::new(direction),
            secondary_item: SecondaryItem::None,
            stuns: HashMap::new(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Combined block mask across every active stun effect.
    pub fn stun_mask(&self) -> Stun {
        self.stuns.values().fold(Stun::empty(), |acc, e| acc | e.blocks)
    }

    pub fn is_blocked(&self, action: Stun) -> bool {
        self.stun_mask().intersects(action)
    }

    pub fn rotate(&mut self, rotation: Rotation) {
        if self.is_blocked(Stun::ROTATION) {
            return;
        }
        self.direction = rotation.apply(self.direction);
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.previous_x = self.x;
        self.previous_y = self.y;
        self.x = x;
        self.y = y;
    }

    /// Saturating damage application. Returns the kill heal amount to award
    /// the attacker, if any (the caller applies it — avoids a second mutable
    /// borrow of the attacker's tank from within this call).
    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome { damage_taken: 0, killed: false };
        }
        let damage_taken = amount.min(self.health);
        self.health -= damage_taken;
        let killed = self.health == 0;
        if killed {
            self.x = -1;
            self.y = -1;
        }
        DamageOutcome { damage_taken, killed }
    }

    pub fn heal(&mut self, amount: u32) {
        if self.is_dead() {
            return;
        }
        self.health = (self.health + amount).min(100);
    }

    pub fn stun(&mut self, source: &'static str, blocks: Stun, ticks: u32) {
        self.stuns.insert(source, StunEffect { blocks, remaining_ticks: ticks });
    }

    /// Phase 5: decrement every stun's remaining ticks, dropping expired ones.
    pub fn tick_stuns(&mut self) {
        self.stuns.retain(|_, effect| {
            effect.remaining_ticks = effect.remaining_ticks.saturating_sub(1);
            effect.remaining_ticks > 0
        });
    }

    /// Gated by `ABILITY_USE` stun and item presence; consumes the held item.
    pub fn try_use_radar(&mut self) -> bool {
        if self.is_blocked(Stun::ABILITY_USE) || self.secondary_item != SecondaryItem::Radar {
            return false;
        }
        self.secondary_item = SecondaryItem::None;
        true
    }

    pub fn try_take_mine(&mut self) -> bool {
        if self.is_blocked(Stun::ABILITY_USE) || self.secondary_item != SecondaryItem::Mine {
            return false;
        }
        self.secondary_item = SecondaryItem::None;
        true
    }

    pub fn try_take_laser(&mut self) -> bool {
        if self.is_blocked(Stun::ABILITY_USE) || self.secondary_item != SecondaryItem::Laser {
            return false;
        }
        self.secondary_item = SecondaryItem::None;
        true
    }

    pub fn try_take_double_bullet(&mut self) -> bool {
        if self.is_blocked(Stun::ABILITY_USE) || self.secondary_item != SecondaryItem::DoubleBullet {
            return false;
        }
        self.secondary_item = SecondaryItem::None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> Tank {
        Tank::new(PlayerId::new("p1"), 5, 5, Direction::Up)
    }

    #[test]
    fn take_damage_saturates_at_zero_and_marks_position() {
        let mut t = tank();
        let outcome = t.take_damage(150);
        assert_eq!(outcome.damage_taken, 100);
        assert!(outcome.killed);
        assert_eq!(t.health, 0);
        assert_eq!((t.x, t.y), (-1, -1));
    }

    #[test]
    fn dead_tank_rejects_further_damage_and_heal() {
        let mut t = tank();
        t.take_damage(100);
        let outcome = t.take_damage(10);
        assert_eq!(outcome.damage_taken, 0);
        t.heal(50);
        assert_eq!(t.health, 0);
    }

    #[test]
    fn heal_caps_at_100() {
        let mut t = tank();
        t.take_damage(30);
        t.heal(1000);
        assert_eq!(t.health, 100);
    }

    #[test]
    fn rotation_blocked_while_stunned() {
        let mut t = tank();
        t.stun("laser", Stun::ROTATION, 3);
        t.rotate(Rotation::Right);
        assert_eq!(t.direction, Direction::Up);
    }

    #[test]
    fn stun_expires_after_ticks() {
        let mut t = tank();
        t.stun("mine", Stun::ALL, 2);
        t.tick_stuns();
        assert!(t.is_blocked(Stun::MOVEMENT));
        t.tick_stuns();
        assert!(!t.is_blocked(Stun::MOVEMENT));
    }

    #[test]
    fn set_position_records_previous() {
        let mut t = tank();
        t.set_position(7, 8);
        assert_eq!((t.previous_x, t.previous_y), (5, 5));
        assert_eq!((t.x, t.y), (7, 8));
    }

    #[test]
    fn radar_use_requires_item_and_consumes_it() {
        let mut t = tank();
        assert!(!t.try_use_radar());
        t.secondary_item = SecondaryItem::Radar;
        assert!(t.try_use_radar());
        assert_eq!(t.secondary_item, SecondaryItem::None);
        assert!(!t.try_use_radar());
    }

    #[test]
    fn turret_shoot_requires_bullets() {
        let mut turret = Turret::new(Direction::Up);
        turret.bullet_count = 1;
        assert!(turret.try_shoot(false));
        assert_eq!(turret.bullet_count, 0);
        assert!(!turret.try_shoot(false));
    }

    #[test]
    fn turret_regen_grants_bullet_after_threshold() {
        let mut turret = Turret::new(Direction::Up);
        turret.bullet_count = 0;
        for _ in 0..BULLET_REGEN_TICKS - 1 {
            assert!(!turret.tick_regen());
        }
        assert!(turret.tick_regen());
        assert_eq!(turret.bullet_count, 1);
    }
}
