//! Full-tick scenarios that need several simulation phases (or the
//! dispatcher plus the simulation) wired together, rather than one pure
//! function exercised in isolation.

use serde_json::json;

use monotanks_server::action::{self, DispatchOutcome};
use monotanks_server::config::CAPTURE_TICKS;
use monotanks_server::entities::bullet::BulletKind;
use monotanks_server::entities::{Bullet, Color, Player, PlayerId, Tank};
use monotanks_server::grid::Direction;
use monotanks_server::msg::PacketKind;
use monotanks_server::simulation;
use monotanks_server::view::{self, RenderContext};
use monotanks_server::world::World;

fn insert_player(world: &mut World, id: &str, nickname: &str, x: i32, y: i32, dir: Direction) -> PlayerId {
    let pid = PlayerId::new(id);
    let mut player = Player::new(pid.clone(), nickname.to_string(), Color(10, 20, 30), world.grid.dim, false);
    player.tank = Some(Tank::new(pid.clone(), x, y, dir));
    world.players.insert(pid.clone(), player);
    pid
}

#[test]
fn a_fired_bullet_travels_to_and_damages_the_target_in_one_tick() {
    let mut world = World::new(1, 10, true);
    insert_player(&mut world, "shooter", "Shooter", 4, 5, Direction::Right);
    insert_player(&mut world, "victim", "Victim", 6, 5, Direction::Up);

    let outcome = action::dispatch(
        &mut world,
        &PlayerId::new("shooter"),
        PacketKind::AbilityUse,
        json!({"abilityType": "fireBullet", "gameStateId": 0}),
        true,
    );
    assert!(matches!(outcome, DispatchOutcome::Admitted));

    // Fires during phase 1, then the freshly spawned bullet is stepped by
    // phase 2 in the same tick: muzzle tile (5,5) -> one step -> (6,5).
    simulation::run_tick(&mut world);

    assert!(world.bullets.is_empty(), "the bullet should have been consumed by the hit");
    let victim = &world.players[&PlayerId::new("victim")];
    assert_eq!(victim.tank.as_ref().unwrap().health, 80);
}

#[test]
fn a_second_action_in_the_same_tick_is_dropped_silently() {
    let mut world = World::new(1, 10, true);
    insert_player(&mut world, "p1", "Ann", 5, 5, Direction::Up);

    let first = action::dispatch(
        &mut world,
        &PlayerId::new("p1"),
        PacketKind::Movement,
        json!({"direction": "forward", "gameStateId": 0}),
        true,
    );
    assert!(matches!(first, DispatchOutcome::Admitted));

    let second = action::dispatch(
        &mut world,
        &PlayerId::new("p1"),
        PacketKind::Rotation,
        json!({"tankRotation": "left", "gameStateId": 0}),
        true,
    );
    assert!(matches!(second, DispatchOutcome::Dropped));

    // Only the first action is queued for phase 1.
    assert_eq!(world.pending_actions.len(), 1);
}

#[test]
fn a_reply_to_a_stale_game_state_id_is_dropped_silently() {
    let mut world = World::new(1, 10, true);
    insert_player(&mut world, "p1", "Ann", 5, 5, Direction::Up);
    world.current_game_state_id = 7;

    let outcome = action::dispatch(
        &mut world,
        &PlayerId::new("p1"),
        PacketKind::Movement,
        json!({"direction": "forward", "gameStateId": 6}),
        true,
    );
    assert!(matches!(outcome, DispatchOutcome::Dropped));
    assert!(world.pending_actions.is_empty());
    assert!(!world.players[&PlayerId::new("p1")].has_acted_this_tick);
}

#[test]
fn holding_a_zone_alone_for_capture_ticks_flips_it_and_scores() {
    let mut world = World::new(1, 10, true);
    let (zx, zy) = (world.grid.zones[0].x_min, world.grid.zones[0].y_min);
    insert_player(&mut world, "p1", "Ann", zx, zy, Direction::Up);

    for _ in 0..CAPTURE_TICKS {
        simulation::run_tick(&mut world);
    }

    assert_eq!(world.players[&PlayerId::new("p1")].score, 1);
}

#[test]
fn an_owning_players_snapshot_hides_entities_outside_their_visibility() {
    let mut world = World::new(1, 10, true);
    // Far enough apart that p2's tank sits outside p1's adjacency ring and cone.
    insert_player(&mut world, "p1", "Ann", 1, 1, Direction::Up);
    insert_player(&mut world, "p2", "Bob", 8, 8, Direction::Up);

    simulation::run_tick(&mut world);

    let snapshot = view::render(&world, &RenderContext::OwningPlayer(PlayerId::new("p1")));
    let me = snapshot.players.iter().find(|p| p.id == "p1").unwrap();
    assert!(me.tank.as_ref().unwrap().health.is_some(), "the owner always sees their own health");

    let other = snapshot.players.iter().find(|p| p.id == "p2").unwrap();
    let other_tank = other.tank.as_ref().unwrap();
    assert_eq!(other_tank.x, None, "p2's tank is outside p1's fog-of-war grid");
    assert_eq!(other_tank.health, None, "health is never leaked for an out-of-view tank");
}

#[test]
fn two_bullets_that_swap_tiles_destroy_each_other() {
    let mut world = World::new(1, 10, true);
    let left_shooter = PlayerId::new("left");
    let right_shooter = PlayerId::new("right");

    world.bullets.push(Bullet::new(world.next_bullet_id(), 4.5, 5.5, Direction::Right, left_shooter, BulletKind::Standard));
    world.bullets.push(Bullet::new(world.next_bullet_id(), 6.5, 5.5, Direction::Left, right_shooter, BulletKind::Standard));

    simulation::run_tick(&mut world);

    assert!(world.bullets.is_empty(), "both bullets should destroy each other when they land on the same tile");
}
