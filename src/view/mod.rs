//! Per-recipient rendering of the shared world into a `GameState` snapshot
//! (spec §4.D). `render` is a pure function: it only reads `World` and the
//! requested [`RenderContext`], and produces the same snapshot for the same
//! inputs every time. The visibility matrix is expressed as plain `if`s over
//! `Option` fields rather than polymorphic converters, so each row of the
//! matrix is independently testable.

use serde::Serialize;

use crate::entities::{Bullet, Laser, Mine, Player, PlayerId, Tank};
use crate::grid::{CaptureState, Direction, Wall};
use crate::world::World;

/// Who a snapshot is being rendered for.
pub enum RenderContext {
    Spectator,
    OwningPlayer(PlayerId),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub players: Vec<PlayerView>,
    pub map: MapView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub nickname: String,
    pub color: u32,
    pub score: u32,
    pub kills: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tank: Option<TankView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Vec<Vec<bool>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TankView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turret_direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_item: Option<crate::entities::SecondaryItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullet_count: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub tiles: Vec<Vec<Vec<TileEntityView>>>,
    pub zones: Vec<ZoneView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneView {
    pub id: String,
    #[serde(flatten)]
    pub state: CaptureState,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TileEntityView {
    #[serde(rename_all = "camelCase")]
    Wall,
    #[serde(rename_all = "camelCase")]
    Bullet {
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        damage: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        shooter_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        direction: Option<Direction>,
    },
    #[serde(rename_all = "camelCase")]
    Laser { shooter_id: String, damage: u32, remaining_ticks: u32 },
    #[serde(rename_all = "camelCase")]
    Mine { owner_id: String, damage: u32, armed: bool },
    #[serde(rename_all = "camelCase")]
    Item { item_type: crate::entities::SecondaryItem },
}

fn tile_index(dim: u8, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 || x >= dim as i32 || y >= dim as i32 {
        return None;
    }
    Some(y as usize * dim as usize + x as usize)
}

fn tile_visible(visibility: &[bool], dim: u8, x: i32, y: i32) -> bool {
    tile_index(dim, x, y).and_then(|i| visibility.get(i).copied()).unwrap_or(false)
}

fn unflatten(flat: &[bool], dim: u8) -> Vec<Vec<bool>> {
    flat.chunks(dim as usize).map(|row| row.to_vec()).collect()
}

/// Renders a full snapshot. The caller (tick scheduler) fills in `id` for
/// player recipients after the fact; spectators keep it `None`.
pub fn render(world: &World, recipient: &RenderContext) -> GameStatePayload {
    let players = world.players.values().map(|p| render_player(world, p, recipient)).collect();
    let map = render_map(world, recipient);
    GameStatePayload { tick: world.tick, id: None, players, map }
}

fn viewer_visibility<'a>(world: &'a World, recipient: &RenderContext) -> Option<&'a [bool]> {
    match recipient {
        RenderContext::OwningPlayer(id) => world.players.get(id).map(|p| p.visibility.as_slice()),
        RenderContext::Spectator => None,
    }
}

fn render_player(world: &World, p: &Player, recipient: &RenderContext) -> PlayerView {
    let spectator = matches!(recipient, RenderContext::Spectator);
    let is_owner = matches!(recipient, RenderContext::OwningPlayer(id) if id == &p.id);
    let viewer_vis = viewer_visibility(world, recipient);

    let tank = p.tank.as_ref().map(|t| render_tank(world, t, spectator, is_owner, viewer_vis));
    let visibility = if is_owner { Some(unflatten(&p.visibility, world.grid.dim)) } else { None };

    PlayerView {
        id: p.id.as_str().to_string(),
        nickname: p.nickname.clone(),
        color: p.color.packed(),
        score: p.score,
        kills: p.kills,
        tank,
        visibility,
    }
}

fn render_tank(world: &World, t: &Tank, spectator: bool, is_owner: bool, viewer_vis: Option<&[bool]>) -> TankView {
    let visible = spectator
        || is_owner
        || viewer_vis.map(|v| tile_visible(v, world.grid.dim, t.x, t.y)).unwrap_or(false);
    let owner_level = spectator || is_owner;

    TankView {
        x: visible.then_some(t.x),
        y: visible.then_some(t.y),
        direction: visible.then_some(t.direction),
        turret_direction: visible.then_some(t.turret.direction),
        health: owner_level.then_some(t.health),
        secondary_item: owner_level.then_some(t.secondary_item),
        bullet_count: owner_level.then_some(t.turret.bullet_count),
    }
}

fn render_map(world: &World, recipient: &RenderContext) -> MapView {
    let dim = world.grid.dim;
    let spectator = matches!(recipient, RenderContext::Spectator);
    let viewer_vis = viewer_visibility(world, recipient);

    let mut tiles: Vec<Vec<Vec<TileEntityView>>> = (0..dim as usize)
        .map(|_| (0..dim as usize).map(|_| Vec::new()).collect())
        .collect();

    for y in 0..dim as i32 {
        for x in 0..dim as i32 {
            if matches!(world.grid.wall_at(x, y), Wall::Solid) {
                tiles[y as usize][x as usize].push(TileEntityView::Wall);
            }
        }
    }

    let show_filtered = |x: i32, y: i32| -> bool {
        spectator || viewer_vis.map(|v| tile_visible(v, dim, x, y)).unwrap_or(false)
    };

    for bullet in &world.bullets {
        let (tx, ty) = bullet.tile();
        if tile_index(dim, tx, ty).is_none() {
            continue;
        }
        let entry = if spectator {
            TileEntityView::Bullet {
                x: Some(bullet.x),
                y: Some(bullet.y),
                damage: Some(bullet.damage),
                shooter_id: Some(bullet.shooter_id.as_str().to_string()),
                id: Some(bullet.id),
                speed: Some(bullet.speed),
                direction: Some(bullet.direction),
            }
        } else if show_filtered(tx, ty) {
            TileEntityView::Bullet {
                x: None,
                y: None,
                damage: None,
                shooter_id: None,
                id: Some(bullet.id),
                speed: Some(bullet.speed),
                direction: Some(bullet.direction),
            }
        } else {
            continue;
        };
        tiles[ty as usize][tx as usize].push(entry);
    }

    for laser in &world.lasers {
        for &(x, y) in &laser.tiles {
            if tile_index(dim, x, y).is_none() || !(spectator || show_filtered(x, y)) {
                continue;
            }
            tiles[y as usize][x as usize].push(TileEntityView::Laser {
                shooter_id: laser.shooter_id.as_str().to_string(),
                damage: laser.damage,
                remaining_ticks: laser.remaining_ticks,
            });
        }
    }

    for mine in &world.mines {
        if tile_index(dim, mine.x, mine.y).is_none() || !(spectator || show_filtered(mine.x, mine.y)) {
            continue;
        }
        tiles[mine.y as usize][mine.x as usize].push(TileEntityView::Mine {
            owner_id: mine.owner_id.as_str().to_string(),
            damage: mine.damage,
            armed: mine.is_armed(),
        });
    }

    for item in &world.items {
        if tile_index(dim, item.x, item.y).is_none() || !(spectator || show_filtered(item.x, item.y)) {
            continue;
        }
        tiles[item.y as usize][item.x as usize].push(TileEntityView::Item { item_type: item.item_type });
    }

    let zones = world.grid.zones.iter().map(|z| ZoneView { id: z.id.clone(), state: z.state.clone() }).collect();

    MapView { tiles, zones }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Color, Player};
    use crate::grid::Direction;

    fn world_with_two_tanks() -> World {
        let mut world = World::new(1, 10, true);
        let mut p1 = Player::new(PlayerId::new("p1"), "Ann".into(), Color(1, 2, 3), 10, false);
        p1.tank = Some(Tank::new(PlayerId::new("p1"), 2, 5, Direction::Right));
        p1.visibility = vec![false; 100];
        p1.visibility[5 * 10 + 2] = true;
        world.players.insert(p1.id.clone(), p1);

        let mut p2 = Player::new(PlayerId::new("p2"), "Bob".into(), Color(4, 5, 6), 10, false);
        p2.tank = Some(Tank::new(PlayerId::new("p2"), 6, 5, Direction::Left));
        world.players.insert(p2.id.clone(), p2);
        world
    }

    #[test]
    fn spectator_sees_every_tank_position() {
        let world = world_with_two_tanks();
        let snap = render(&world, &RenderContext::Spectator);
        for p in &snap.players {
            let tank = p.tank.as_ref().unwrap();
            assert!(tank.x.is_some());
            assert!(tank.health.is_some());
        }
    }

    #[test]
    fn other_player_hides_health_and_unvisible_position() {
        let world = world_with_two_tanks();
        let snap = render(&world, &RenderContext::OwningPlayer(PlayerId::new("p1")));
        let me = snap.players.iter().find(|p| p.id == "p1").unwrap();
        assert_eq!(me.tank.as_ref().unwrap().health, Some(100));
        assert!(me.visibility.is_some());

        let other = snap.players.iter().find(|p| p.id == "p2").unwrap();
        let other_tank = other.tank.as_ref().unwrap();
        assert_eq!(other_tank.health, None);
        assert_eq!(other_tank.x, None, "p2 sits outside p1's visibility grid");
    }

    #[test]
    fn walls_are_always_visible() {
        let mut world = World::new(2, 8, false);
        world.grid = crate::grid::Grid::generate(&mut world.rng, 8, false);
        let snap = render(&world, &RenderContext::OwningPlayer(PlayerId::new("nobody")));
        let any_wall = snap.map.tiles.iter().flatten().flatten().any(|e| matches!(e, TileEntityView::Wall));
        assert!(any_wall || world.grid.zones.len() == 4);
    }
}
