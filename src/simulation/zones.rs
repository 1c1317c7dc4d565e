//! Phase 9 (spec §4.C): zone occupancy, capture-state transitions, scoring.

use crate::world::World;

use super::TickEvents;

pub fn tick_zones(world: &mut World, events: &mut TickEvents) {
    let positions: Vec<(crate::entities::PlayerId, i32, i32)> =
        world.living_tank_positions().into_iter().map(|(id, x, y)| (id.clone(), x, y)).collect();

    for zone in world.grid.zones.iter_mut() {
        let occupants = zone.occupants(positions.iter().map(|(id, x, y)| (id, *x, *y)));
        if let Some(scorer) = zone.tick(&occupants) {
            if let Some(player) = world.players.get_mut(&scorer) {
                player.score += 1;
            }
            events.zone_scores.push((zone.id.clone(), scorer));
        }
    }
}
