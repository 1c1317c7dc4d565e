//! Bullets (spec §3, §4.C phase 2).

use serde::Serialize;

use crate::config::{BULLET_DAMAGE, BULLET_SPEED, DOUBLE_BULLET_DAMAGE};
use crate::entities::player::PlayerId;
use crate::grid::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BulletKind {
    Standard,
    Double,
}

pub struct Bullet {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub direction: Direction,
    pub damage: u32,
    pub shooter_id: PlayerId,
    pub kind: BulletKind,
}

impl Bullet {
    pub fn new(id: u64, x: f64, y: f64, direction: Direction, shooter_id: PlayerId, kind: BulletKind) -> Self {
        let damage = match kind {
            BulletKind::Standard => BULLET_DAMAGE,
            BulletKind::Double => DOUBLE_BULLET_DAMAGE,
        };
        Self { id, x, y, speed: BULLET_SPEED, direction, damage, shooter_id, kind }
    }

    pub fn tile(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}
