//! Phase 8 (spec §4.C): recompute each living player's fog-of-war grid from
//! scratch every tick. A radar-active player sees everything for this tick
//! only; everyone else gets an adjacency ring plus a forward cone along the
//! turret direction, stopped (but not hidden) by the first wall.

use crate::config::VISIBILITY_RANGE;
use crate::world::World;

/// Collected `(player_id, grid)` pairs before writing back, so the borrow on
/// `world.grid` during cone tracing never overlaps a `&mut` on `world.players`.
pub fn recompute_visibility(world: &mut World) {
    let dim = world.grid.dim;
    let mut updates = Vec::with_capacity(world.players.len());

    for player in world.players.values() {
        let grid = match &player.tank {
            Some(tank) if !tank.is_dead() => {
                if player.is_using_radar {
                    vec![true; dim as usize * dim as usize]
                } else {
                    let mut v = vec![false; dim as usize * dim as usize];
                    mark_adjacent(&mut v, dim, tank.x, tank.y);
                    mark_cone(world, &mut v, dim, tank.x, tank.y, tank.turret.direction);
                    v
                }
            }
            _ => vec![false; dim as usize * dim as usize],
        };
        updates.push((player.id.clone(), grid));
    }

    for (id, grid) in updates {
        if let Some(player) = world.players.get_mut(&id) {
            player.visibility = grid;
        }
    }
}

fn index(dim: u8, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 || x >= dim as i32 || y >= dim as i32 {
        return None;
    }
    Some(y as usize * dim as usize + x as usize)
}

fn mark(v: &mut [bool], dim: u8, x: i32, y: i32) {
    if let Some(i) = index(dim, x, y) {
        v[i] = true;
    }
}

fn mark_adjacent(v: &mut [bool], dim: u8, x: i32, y: i32) {
    for dy in -1..=1 {
        for dx in -1..=1 {
            mark(v, dim, x + dx, y + dy);
        }
    }
}

fn mark_cone(world: &World, v: &mut [bool], dim: u8, x: i32, y: i32, direction: crate::grid::Direction) {
    let (dx, dy) = direction.step();
    let (mut cx, mut cy) = (x, y);
    for _ in 0..VISIBILITY_RANGE {
        cx += dx;
        cy += dy;
        if index(dim, cx, cy).is_none() {
            break;
        }
        mark(v, dim, cx, cy);
        if world.grid.is_blocked(cx, cy) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Color, Player, PlayerId, Tank};
    use crate::grid::Direction;

    #[test]
    fn radar_reveals_the_entire_grid_for_this_tick() {
        let mut world = World::new(1, 10, true);
        let id = PlayerId::new("p1");
        let mut p = Player::new(id.clone(), "Ann".into(), Color(1, 2, 3), 10, false);
        p.tank = Some(Tank::new(id.clone(), 5, 5, Direction::Up));
        p.is_using_radar = true;
        world.players.insert(id.clone(), p);
        recompute_visibility(&mut world);
        assert!(world.players[&id].visibility.iter().all(|&v| v));
    }

    #[test]
    fn cone_stops_at_first_wall_but_still_reveals_it() {
        let mut world = World::new(1, 10, true);
        // Sandbox grid, but fake a wall 3 tiles ahead for this test.
        let id = PlayerId::new("p1");
        let mut p = Player::new(id.clone(), "Ann".into(), Color(1, 2, 3), 10, false);
        p.tank = Some(Tank::new(id.clone(), 5, 5, Direction::Right));
        world.players.insert(id.clone(), p);
        recompute_visibility(&mut world);
        // the border at x=10 counts as a wall; range 7 should hit it and stop.
        let visibility = &world.players[&id].visibility;
        assert!(visibility[5 * 10 + 9], "cone should reach the border tile");
        assert!(!visibility[0], "far corner stays hidden");
        assert!(!visibility[2 * 10 + 5], "tile outside the cone and adjacency ring stays hidden");
    }
}
