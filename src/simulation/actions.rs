//! Phase 1 (spec §4.C): drain admitted actions in a deterministic order and
//! apply each one's effect to the world.

use rand::seq::SliceRandom;

use crate::action::PlayerAction;
use crate::config::LASER_DAMAGE;
use crate::entities::bullet::BulletKind;
use crate::entities::{Bullet, Laser, Mine, PlayerId, Stun};
use crate::msg::types::{AbilityType, MovementDirection, RotationDirection};
use crate::world::World;

use super::TickEvents;

pub fn drain_actions(world: &mut World, _events: &mut TickEvents) {
    let mut order: Vec<PlayerId> = world.pending_actions.keys().cloned().collect();
    order.sort_by_key(|id| world.players.get(id).map(|p| p.nickname.clone()).unwrap_or_default());
    order.shuffle(&mut world.rng);

    for id in order {
        let Some(action) = world.pending_actions.remove(&id) else { continue };
        apply_action(world, &id, action);
    }
}

fn apply_action(world: &mut World, id: &PlayerId, action: PlayerAction) {
    match action {
        PlayerAction::Movement(direction) => move_tank(world, id, direction),
        PlayerAction::Rotation { tank, turret } => rotate_tank(world, id, tank, turret),
        PlayerAction::AbilityUse(ability) => use_ability(world, id, ability),
    }
}

fn move_tank(world: &mut World, id: &PlayerId, direction: MovementDirection) {
    let Some(player) = world.players.get_mut(id) else { return };
    let Some(tank) = player.tank.as_mut() else { return };
    if tank.is_dead() || tank.is_blocked(Stun::MOVEMENT) {
        return;
    }
    let (dx, dy) = tank.direction.step();
    let (dx, dy) = match direction {
        MovementDirection::Forward => (dx, dy),
        MovementDirection::Backward => (-dx, -dy),
    };
    let (new_x, new_y) = (tank.x + dx, tank.y + dy);
    if world.grid.is_blocked(new_x, new_y) {
        return;
    }
    tank.set_position(new_x, new_y);
}

fn rotate_tank(world: &mut World, id: &PlayerId, tank_rot: Option<RotationDirection>, turret_rot: Option<RotationDirection>) {
    let Some(player) = world.players.get_mut(id) else { return };
    let Some(tank) = player.tank.as_mut() else { return };
    if tank.is_dead() {
        return;
    }
    if let Some(r) = tank_rot {
        tank.rotate(to_grid_rotation(r));
    }
    if let Some(r) = turret_rot {
        let blocked = tank.is_blocked(Stun::ROTATION);
        tank.turret.rotate(to_grid_rotation(r), blocked);
    }
}

fn to_grid_rotation(r: RotationDirection) -> crate::grid::Rotation {
    match r {
        RotationDirection::Left => crate::grid::Rotation::Left,
        RotationDirection::Right => crate::grid::Rotation::Right,
    }
}

fn use_ability(world: &mut World, id: &PlayerId, ability: AbilityType) {
    match ability {
        AbilityType::FireBullet => fire_bullet(world, id, BulletKind::Standard, false),
        AbilityType::FireDoubleBullet => fire_bullet(world, id, BulletKind::Double, true),
        AbilityType::UseLaser => use_laser(world, id),
        AbilityType::DropMine => drop_mine(world, id),
        AbilityType::UseRadar => use_radar(world, id),
    }
}

/// Bullets spawn one tile ahead of the muzzle so they never start co-located
/// with the shooter's own tank (spec §4.C invariant).
fn fire_bullet(world: &mut World, id: &PlayerId, kind: BulletKind, from_item: bool) {
    let spawn = {
        let Some(player) = world.players.get_mut(id) else { return };
        let Some(tank) = player.tank.as_mut() else { return };
        if tank.is_dead() {
            return;
        }
        let blocked = tank.is_blocked(Stun::ABILITY_USE);
        let allowed = if from_item { tank.try_take_double_bullet() } else { tank.turret.try_shoot(blocked) };
        if !allowed {
            return;
        }
        let (dx, dy) = tank.direction.step();
        (tank.x + dx, tank.y + dy, tank.direction)
    };
    let bullet_id = world.next_bullet_id();
    world
        .bullets
        .push(Bullet::new(bullet_id, spawn.0 as f64 + 0.5, spawn.1 as f64 + 0.5, spawn.2, id.clone(), kind));
}

fn use_laser(world: &mut World, id: &PlayerId) {
    let origin = {
        let Some(player) = world.players.get_mut(id) else { return };
        let Some(tank) = player.tank.as_mut() else { return };
        if tank.is_dead() || tank.is_blocked(Stun::ABILITY_USE) || !tank.try_take_laser() {
            return;
        }
        (tank.x, tank.y, tank.turret.direction)
    };

    let (mut x, mut y) = (origin.0, origin.1);
    let (dx, dy) = origin.2.step();
    let mut tiles = Vec::new();
    loop {
        let (nx, ny) = (x + dx, y + dy);
        if world.grid.is_blocked(nx, ny) {
            break;
        }
        tiles.push((nx, ny));
        x = nx;
        y = ny;
    }
    if tiles.is_empty() {
        return;
    }
    world.lasers.push(Laser::new(tiles, id.clone(), LASER_DAMAGE));
}

fn drop_mine(world: &mut World, id: &PlayerId) {
    let Some(player) = world.players.get_mut(id) else { return };
    let Some(tank) = player.tank.as_mut() else { return };
    if tank.is_dead() || tank.is_blocked(Stun::ABILITY_USE) || !tank.try_take_mine() {
        return;
    }
    let (x, y) = (tank.x, tank.y);
    world.mines.push(Mine::new(x, y, id.clone()));
}

fn use_radar(world: &mut World, id: &PlayerId) {
    let Some(player) = world.players.get_mut(id) else { return };
    let Some(tank) = player.tank.as_mut() else { return };
    if tank.is_dead() || tank.is_blocked(Stun::ABILITY_USE) || !tank.try_use_radar() {
        return;
    }
    player.is_using_radar = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Color, Player};
    use crate::grid::Direction;

    fn world_with_tank(dir: Direction) -> (World, PlayerId) {
        let mut world = World::new(1, 10, true);
        let id = PlayerId::new("p1");
        let mut player = Player::new(id.clone(), "Ann".into(), Color(1, 2, 3), 10, false);
        player.tank = Some(crate::entities::Tank::new(id.clone(), 5, 5, dir));
        world.players.insert(id.clone(), player);
        (world, id)
    }

    #[test]
    fn forward_movement_steps_in_facing_direction() {
        let (mut world, id) = world_with_tank(Direction::Right);
        move_tank(&mut world, &id, MovementDirection::Forward);
        let tank = world.players[&id].tank.as_ref().unwrap();
        assert_eq!((tank.x, tank.y), (6, 5));
    }

    #[test]
    fn movement_into_a_wall_is_rejected() {
        let (mut world, id) = world_with_tank(Direction::Up);
        world.players.get_mut(&id).unwrap().tank.as_mut().unwrap().set_position(0, 0);
        move_tank(&mut world, &id, MovementDirection::Forward);
        let tank = world.players[&id].tank.as_ref().unwrap();
        assert_eq!((tank.x, tank.y), (0, 0));
    }

    #[test]
    fn firing_a_bullet_spawns_it_one_tile_ahead_and_consumes_ammo() {
        let (mut world, id) = world_with_tank(Direction::Right);
        fire_bullet(&mut world, &id, BulletKind::Standard, false);
        assert_eq!(world.bullets.len(), 1);
        assert_eq!(world.bullets[0].tile(), (6, 5));
        assert_eq!(world.players[&id].tank.as_ref().unwrap().turret.bullet_count, crate::config::MAX_BULLETS - 1);
    }

    #[test]
    fn dead_tank_cannot_act() {
        let (mut world, id) = world_with_tank(Direction::Right);
        world.players.get_mut(&id).unwrap().tank.as_mut().unwrap().take_damage(1000);
        move_tank(&mut world, &id, MovementDirection::Forward);
        let tank = world.players[&id].tank.as_ref().unwrap();
        assert_eq!((tank.x, tank.y), (-1, -1));
    }
}
