//! Phases 3 and 4 (spec §4.C): laser damage-over-presence and mine
//! arming/detonation/fade.

use crate::config::MINE_BLAST_RADIUS;
use crate::entities::PlayerId;
use crate::world::World;

use super::{apply_damage_events, TickEvents};

pub fn tick_lasers(world: &mut World, events: &mut TickEvents) {
    let mut damages: Vec<(PlayerId, PlayerId, u32)> = Vec::new();
    for laser in &world.lasers {
        for player in world.players.values() {
            let Some(tank) = player.tank.as_ref() else { continue };
            if !tank.is_dead() && laser.covers(tank.x, tank.y) {
                damages.push((player.id.clone(), laser.shooter_id.clone(), laser.damage));
            }
        }
    }
    apply_damage_events(world, damages, events);

    let mut expired = Vec::new();
    for (i, laser) in world.lasers.iter_mut().enumerate() {
        if laser.tick() {
            expired.push(i);
        }
    }
    for i in expired.into_iter().rev() {
        world.lasers.remove(i);
    }
}

pub fn tick_mines(world: &mut World, events: &mut TickEvents) {
    let mut damages: Vec<(PlayerId, PlayerId, u32)> = Vec::new();
    let mut to_remove = Vec::new();

    for i in 0..world.mines.len() {
        if world.mines[i].explode_remaining_ticks.is_some() {
            if world.mines[i].tick_fade() {
                to_remove.push(i);
            }
            continue;
        }

        let (mx, my, damage, owner) = {
            let m = &world.mines[i];
            (m.x, m.y, m.damage, m.owner_id.clone())
        };
        let arming = world.mines[i].age_ticks < crate::config::MINE_ARMING_GRACE_TICKS;
        world.mines[i].age_ticks += 1;

        let triggered = world.players.values().any(|p| {
            p.tank.as_ref().map(|t| !t.is_dead() && t.x == mx && t.y == my && !(arming && p.id == owner)).unwrap_or(false)
        });
        if !triggered {
            continue;
        }

        for player in world.players.values() {
            let Some(tank) = player.tank.as_ref() else { continue };
            if tank.is_dead() {
                continue;
            }
            let dist = (tank.x - mx).abs().max((tank.y - my).abs());
            if dist <= MINE_BLAST_RADIUS {
                damages.push((player.id.clone(), owner.clone(), damage));
            }
        }
        world.mines[i].detonate();
    }

    apply_damage_events(world, damages, events);
    for i in to_remove.into_iter().rev() {
        world.mines.remove(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Color, Laser, Mine, Player, Tank};
    use crate::grid::Direction;

    fn world_with_tank_at(x: i32, y: i32) -> (World, PlayerId) {
        let mut world = World::new(1, 10, true);
        let id = PlayerId::new("victim");
        let mut player = Player::new(id.clone(), "Bob".into(), Color(1, 1, 1), 10, false);
        player.tank = Some(Tank::new(id.clone(), x, y, Direction::Up));
        world.players.insert(id.clone(), player);
        (world, id)
    }

    #[test]
    fn laser_damages_every_tank_standing_on_its_tiles_each_tick() {
        let (mut world, id) = world_with_tank_at(3, 3);
        world.lasers.push(Laser::new(vec![(3, 3)], PlayerId::new("shooter"), 15));
        let mut events = TickEvents::default();
        tick_lasers(&mut world, &mut events);
        assert_eq!(world.players[&id].tank.as_ref().unwrap().health, 85);
    }

    #[test]
    fn mine_detonates_on_enemy_presence_after_arming_grace() {
        let (mut world, id) = world_with_tank_at(4, 4);
        let mut mine = Mine::new(4, 4, PlayerId::new("owner"));
        mine.age_ticks = crate::config::MINE_ARMING_GRACE_TICKS;
        world.mines.push(mine);
        let mut events = TickEvents::default();
        tick_mines(&mut world, &mut events);
        assert!(world.mines[0].explode_remaining_ticks.is_some());
        assert!(world.players[&id].tank.as_ref().unwrap().health < 100);
    }

    #[test]
    fn owner_is_immune_during_arming_grace() {
        let (mut world, id) = world_with_tank_at(4, 4);
        let mine = Mine::new(4, 4, id.clone());
        world.mines.push(mine);
        let mut events = TickEvents::default();
        tick_mines(&mut world, &mut events);
        assert!(world.mines[0].is_armed());
        assert_eq!(world.players[&id].tank.as_ref().unwrap().health, 100);
    }
}
