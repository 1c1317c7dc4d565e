pub mod bullet;
pub mod item;
pub mod laser;
pub mod mine;
pub mod player;
pub mod tank;

pub use bullet::Bullet;
pub use item::MapItem;
pub use laser::Laser;
pub use mine::Mine;
pub use player::{Color, Player, PlayerId};
pub use tank::{SecondaryItem, Stun, StunEffect, Tank, Turret};
