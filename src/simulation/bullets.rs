//! Phase 2 (spec §4.C): advance every bullet one tile-boundary at a time so
//! fast bullets can't tunnel through a wall or a tank between two whole-tile
//! samples, then resolve wall/tank/bullet collisions in that priority order.

use crate::entities::{Bullet, PlayerId};
use crate::world::World;

use super::{apply_damage_events, TickEvents};

struct Advance {
    bullet_index: usize,
    /// The tile the bullet started this tick on.
    start: (i32, i32),
    /// Every tile-boundary crossed this tick, in order.
    path: Vec<(i32, i32)>,
}

pub fn step_bullets(world: &mut World, events: &mut TickEvents) {
    let advances: Vec<Advance> = world
        .bullets
        .iter_mut()
        .enumerate()
        .map(|(i, b)| {
            let start = b.tile();
            Advance { bullet_index: i, start, path: advance_bullet(b) }
        })
        .collect();

    let mut destroyed = vec![false; world.bullets.len()];
    let mut damages: Vec<(PlayerId, PlayerId, u32)> = Vec::new();

    // (i) wall collisions and (ii) tank collisions, per bullet independently.
    for adv in &advances {
        if destroyed[adv.bullet_index] {
            continue;
        }
        let mut prev = adv.start;
        for &(x, y) in &adv.path {
            if world.grid.is_blocked(x, y) {
                destroyed[adv.bullet_index] = true;
                break;
            }
            let bullet = &world.bullets[adv.bullet_index];
            if let Some((owner, damage, shooter)) = tank_hit_between(world, bullet, prev, (x, y)) {
                damages.push((owner, shooter, damage));
                destroyed[adv.bullet_index] = true;
                break;
            }
            prev = (x, y);
        }
    }

    // (iii) bullet-bullet collisions: co-tile or path-swap between any two
    // still-alive bullets this sub-step.
    for a in 0..advances.len() {
        if destroyed[advances[a].bullet_index] {
            continue;
        }
        for b in (a + 1)..advances.len() {
            if destroyed[advances[b].bullet_index] {
                continue;
            }
            if bullets_collided(&advances[a], &advances[b]) {
                destroyed[advances[a].bullet_index] = true;
                destroyed[advances[b].bullet_index] = true;
                break;
            }
        }
    }

    apply_damage_events(world, damages, events);

    let mut kept = Vec::with_capacity(world.bullets.len());
    for (i, bullet) in world.bullets.drain(..).enumerate() {
        if !destroyed[i] {
            kept.push(bullet);
        }
    }
    world.bullets = kept;
}

/// Moves the bullet by `speed` tiles along its direction, returning every
/// integer-tile boundary crossed (in order).
fn advance_bullet(bullet: &mut Bullet) -> Vec<(i32, i32)> {
    let (dx, dy) = bullet.direction.step();
    let steps = bullet.speed.max(0.0).round() as i64;
    let mut path = Vec::with_capacity(steps.max(1) as usize);
    for _ in 0..steps.max(1) {
        bullet.x += dx as f64;
        bullet.y += dy as f64;
        path.push(bullet.tile());
    }
    path
}

/// `Some((victim, damage, shooter))` if, between the previous and current
/// sub-step tile, this bullet lands on a living tank's current tile, or
/// swaps positions with one (tank was at `new`, moved to `old`, this tick).
fn tank_hit_between(world: &World, bullet: &Bullet, old: (i32, i32), new: (i32, i32)) -> Option<(PlayerId, u32, PlayerId)> {
    for player in world.players.values() {
        let Some(tank) = player.tank.as_ref() else { continue };
        if tank.is_dead() {
            continue;
        }
        let direct_hit = (tank.x, tank.y) == new;
        let swapped = (tank.previous_x, tank.previous_y) == new && (tank.x, tank.y) == old;
        if direct_hit || swapped {
            return Some((player.id.clone(), bullet.damage, bullet.shooter_id.clone()));
        }
    }
    None
}

fn bullets_collided(a: &Advance, b: &Advance) -> bool {
    let a_end = a.path.last().copied().unwrap_or(a.start);
    let b_end = b.path.last().copied().unwrap_or(b.start);
    let co_tile = a_end == b_end;
    let swap = a.start == b_end && b.start == a_end;
    co_tile || swap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::bullet::BulletKind;
    use crate::entities::{Color, Player, Tank};
    use crate::grid::Direction;

    fn world_with_bullet(shooter_tile: (i32, i32), victim_tile: (i32, i32)) -> World {
        let mut world = World::new(1, 10, true);
        let shooter = PlayerId::new("shooter");
        let victim = PlayerId::new("victim");
        world.players.insert(victim.clone(), {
            let mut p = Player::new(victim.clone(), "Bob".into(), Color(1, 1, 1), 10, false);
            p.tank = Some(Tank::new(victim.clone(), victim_tile.0, victim_tile.1, Direction::Up));
            p
        });
        world.bullets.push(Bullet::new(
            world.next_bullet_id(),
            shooter_tile.0 as f64 + 0.5,
            shooter_tile.1 as f64 + 0.5,
            Direction::Right,
            shooter,
            BulletKind::Standard,
        ));
        world
    }

    #[test]
    fn bullet_travels_one_tile_per_tick_at_unit_speed() {
        let mut world = world_with_bullet((2, 5), (9, 9));
        let mut events = TickEvents::default();
        step_bullets(&mut world, &mut events);
        assert_eq!(world.bullets.len(), 1);
        assert_eq!(world.bullets[0].tile(), (3, 5));
    }

    #[test]
    fn bullet_destroys_itself_and_damages_tank_on_direct_hit() {
        let mut world = world_with_bullet((4, 5), (5, 5));
        let mut events = TickEvents::default();
        step_bullets(&mut world, &mut events);
        assert!(world.bullets.is_empty());
        let victim = world.players.values().find(|p| p.id.as_str() == "victim").unwrap();
        assert_eq!(victim.tank.as_ref().unwrap().health, 80);
    }

    #[test]
    fn bullet_is_destroyed_by_the_border_wall() {
        let mut world = world_with_bullet((8, 5), (0, 0));
        let mut events = TickEvents::default();
        for _ in 0..3 {
            step_bullets(&mut world, &mut events);
        }
        assert!(world.bullets.is_empty());
    }
}
