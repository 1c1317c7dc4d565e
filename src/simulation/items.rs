//! Phase 10 (spec §4.C): pick up map items.

use crate::entities::SecondaryItem;
use crate::world::World;

pub fn pickup_items(world: &mut World) {
    let mut picked_up = Vec::new();

    for (i, item) in world.items.iter().enumerate() {
        let winner = world.players.values().find(|p| {
            p.tank
                .as_ref()
                .map(|t| !t.is_dead() && t.x == item.x && t.y == item.y && t.secondary_item == SecondaryItem::None)
                .unwrap_or(false)
        });
        if let Some(player) = winner {
            picked_up.push((i, player.id.clone(), item.item_type));
        }
    }

    for (index, player_id, item_type) in picked_up.iter().rev() {
        if let Some(player) = world.players.get_mut(player_id) {
            if let Some(tank) = player.tank.as_mut() {
                tank.secondary_item = *item_type;
            }
        }
        world.items.remove(*index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Color, MapItem, Player, PlayerId, Tank};
    use crate::grid::Direction;

    #[test]
    fn tank_without_a_held_item_picks_up_the_one_under_it() {
        let mut world = World::new(1, 10, true);
        let id = PlayerId::new("p1");
        let mut p = Player::new(id.clone(), "Ann".into(), Color(1, 2, 3), 10, false);
        p.tank = Some(Tank::new(id.clone(), 3, 3, Direction::Up));
        world.players.insert(id.clone(), p);
        world.items.clear();
        world.items.push(MapItem::new(3, 3, SecondaryItem::Laser));

        pickup_items(&mut world);

        assert!(world.items.is_empty());
        assert_eq!(world.players[&id].tank.as_ref().unwrap().secondary_item, SecondaryItem::Laser);
    }

    #[test]
    fn tank_already_holding_an_item_ignores_another() {
        let mut world = World::new(1, 10, true);
        let id = PlayerId::new("p1");
        let mut p = Player::new(id.clone(), "Ann".into(), Color(1, 2, 3), 10, false);
        let mut tank = Tank::new(id.clone(), 3, 3, Direction::Up);
        tank.secondary_item = SecondaryItem::Mine;
        p.tank = Some(tank);
        world.players.insert(id.clone(), p);
        world.items.clear();
        world.items.push(MapItem::new(3, 3, SecondaryItem::Laser));

        pickup_items(&mut world);

        assert_eq!(world.items.len(), 1);
        assert_eq!(world.players[&id].tank.as_ref().unwrap().secondary_item, SecondaryItem::Mine);
    }
}
