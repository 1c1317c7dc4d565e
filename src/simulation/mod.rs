//! The authoritative tick pipeline (spec §4.C). Each phase is a free
//! function over `&mut World`; `run_tick` sequences them in the fixed order
//! the spec requires and collects the events the scheduler needs to turn
//! into `GameEnd`/score broadcasts.

mod actions;
mod bullets;
mod items;
mod lasers_mines;
mod regen;
mod visibility;
mod zones;

use crate::entities::PlayerId;
use crate::world::World;

/// Side effects of one tick that the scheduler (not the simulation) must act
/// on: awarding kill credit is already applied to `World` by the time this is
/// returned, but the scheduler still needs to know *that* it happened to, for
/// example, decide a match-ending condition later.
#[derive(Debug, Default)]
pub struct TickEvents {
    pub kills: Vec<(PlayerId, PlayerId)>,
    pub zone_scores: Vec<(String, PlayerId)>,
}

/// Applies a batch of `(target, attacker, amount)` damage events: saturating
/// damage, kill heal, and kill-count bookkeeping, in one place so every phase
/// that can deal damage (bullets, lasers, mines) shares the same kill rules.
pub(crate) fn apply_damage_events(world: &mut World, damages: Vec<(PlayerId, PlayerId, u32)>, events: &mut TickEvents) {
    for (target, attacker, amount) in damages {
        let killed = match world.players.get_mut(&target).and_then(|p| p.tank.as_mut()) {
            Some(tank) => tank.take_damage(amount).killed,
            None => continue,
        };
        if killed {
            if let Some(attacker_player) = world.players.get_mut(&attacker) {
                attacker_player.kills += 1;
                if let Some(tank) = attacker_player.tank.as_mut() {
                    tank.heal(crate::config::KILL_HEAL);
                }
            }
            events.kills.push((attacker.clone(), target.clone()));
        }
    }
}

pub fn run_tick(world: &mut World) -> TickEvents {
    let mut events = TickEvents::default();
    actions::drain_actions(world, &mut events);
    bullets::step_bullets(world, &mut events);
    lasers_mines::tick_lasers(world, &mut events);
    lasers_mines::tick_mines(world, &mut events);
    regen::tick_stuns(world);
    regen::tick_turret_regen(world);
    regen::tick_respawns(world);
    visibility::recompute_visibility(world);
    zones::tick_zones(world, &mut events);
    items::pickup_items(world);
    world.tick += 1;
    events
}
