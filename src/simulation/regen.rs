//! Phases 5-7 (spec §4.C): stun decay, turret ammo regen, and dead-tank
//! respawn.

use crate::config::RESPAWN_TICKS;
use crate::entities::Tank;
use crate::world::World;

pub fn tick_stuns(world: &mut World) {
    for player in world.players.values_mut() {
        if let Some(tank) = player.tank.as_mut() {
            tank.tick_stuns();
        }
    }
}

pub fn tick_turret_regen(world: &mut World) {
    for player in world.players.values_mut() {
        if let Some(tank) = player.tank.as_mut() {
            if !tank.is_dead() {
                tank.turret.tick_regen();
            }
        }
    }
}

/// Two passes to avoid holding a `&mut Player` borrow while also drawing
/// from `world.rng`/`world.grid`: first collect who's ready, then respawn.
///
/// `ready` is collected off `HashMap` iteration, whose order is not a
/// function of the match seed — it must be sorted onto a stable key before
/// any of these players draw from `world.rng`, or two identical-seed runs
/// can assign different spawn tiles whenever ≥2 tanks respawn on the same
/// tick (the teacher's phase-1 shuffle in `simulation::actions` sorts by
/// nickname for the same reason).
pub fn tick_respawns(world: &mut World) {
    let mut ready = Vec::new();
    for player in world.players.values_mut() {
        let Some(tank) = player.tank.as_ref() else { continue };
        if !tank.is_dead() {
            continue;
        }
        player.remaining_ticks_to_regen_bullet = player.remaining_ticks_to_regen_bullet.saturating_sub(1);
        if player.remaining_ticks_to_regen_bullet == 0 {
            ready.push(player.id.clone());
        }
    }
    ready.sort_by_key(|id| world.players.get(id).map(|p| p.nickname.clone()).unwrap_or_default());

    let mut occupied: Vec<(i32, i32)> = world.living_tank_positions().iter().map(|&(_, x, y)| (x, y)).collect();
    for id in ready {
        let (spawn, direction) = world.grid.random_spawn(&mut world.rng, &occupied);
        occupied.push(spawn);
        if let Some(player) = world.players.get_mut(&id) {
            player.tank = Some(Tank::new(id.clone(), spawn.0, spawn.1, direction));
            player.remaining_ticks_to_regen_bullet = RESPAWN_TICKS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Color, Player, PlayerId, Stun};
    use crate::grid::Direction;

    fn dead_player() -> Player {
        let mut p = Player::new(PlayerId::new("p1"), "Ann".into(), Color(1, 2, 3), 10, false);
        let mut tank = Tank::new(PlayerId::new("p1"), 5, 5, Direction::Up);
        tank.take_damage(1000);
        p.tank = Some(tank);
        p.remaining_ticks_to_regen_bullet = 1;
        p
    }

    #[test]
    fn dead_tank_respawns_once_regen_counter_hits_zero() {
        let mut world = World::new(1, 10, true);
        let p = dead_player();
        world.players.insert(p.id.clone(), p);
        tick_respawns(&mut world);
        let tank = world.players[&PlayerId::new("p1")].tank.as_ref().unwrap();
        assert_eq!(tank.health, 100);
        assert!(!tank.is_dead());
    }

    #[test]
    fn stuns_tick_down_on_live_tanks() {
        let mut world = World::new(1, 10, true);
        let mut p = Player::new(PlayerId::new("p1"), "Ann".into(), Color(1, 2, 3), 10, false);
        let mut tank = Tank::new(PlayerId::new("p1"), 5, 5, Direction::Up);
        tank.stun("mine", Stun::MOVEMENT, 1);
        p.tank = Some(tank);
        world.players.insert(p.id.clone(), p);
        tick_stuns(&mut world);
        assert!(!world.players[&PlayerId::new("p1")].tank.as_ref().unwrap().is_blocked(Stun::MOVEMENT));
    }
}
