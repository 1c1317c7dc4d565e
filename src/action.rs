//! Action admission pipeline (spec §4.F): turns a decoded packet into either
//! an admitted [`PlayerAction`] stored on `World::pending_actions`, a silent
//! drop, or an `InvalidPacketUsageError` reply. Validation order matches the
//! spec exactly: eligibility, then already-acted, then stale `gameStateId`,
//! then payload shape.

use serde_json::Value;

use crate::entities::PlayerId;
use crate::error::ActionError;
use crate::msg::types::{AbilityType, AbilityUsePayload, MovementDirection, MovementPayload, RotationDirection, RotationPayload};
use crate::msg::PacketKind;
use crate::world::World;

/// Decoded, not-yet-applied action. `simulation::actions` interprets this
/// against tank/turret state during phase 1.
#[derive(Debug, Clone, Copy)]
pub enum PlayerAction {
    Movement(MovementDirection),
    Rotation { tank: Option<RotationDirection>, turret: Option<RotationDirection> },
    AbilityUse(AbilityType),
}

/// Outcome of admitting one packet against the dispatcher's validation order.
pub enum DispatchOutcome {
    Admitted,
    /// Stale reply or already-acted this tick; the teacher's connections never
    /// learn this happened (spec §7 "drop silently").
    Dropped,
    Rejected(ActionError),
}

/// `sender` must already be a registered player and `game_running` must be
/// true; callers (the connection's read task) are expected to have checked
/// this before handing off a frame, but we re-check here since it's cheap
/// and this is the single place state actually mutates.
pub fn dispatch(world: &mut World, sender: &PlayerId, kind: PacketKind, payload: Value, game_running: bool) -> DispatchOutcome {
    if !game_running || !world.players.contains_key(sender) {
        return DispatchOutcome::Rejected(ActionError::NotEligible);
    }

    let already_acted = world.players.get(sender).map(|p| p.has_acted_this_tick).unwrap_or(true);
    if already_acted {
        return DispatchOutcome::Dropped;
    }

    // Peek the raw value for a stale id before paying for full payload
    // decode, so a stale reply never surfaces as an `InvalidPacketUsageError`
    // just because it also happens to carry a malformed enum.
    if let Some(id) = payload.get("gameStateId").and_then(Value::as_u64) {
        if id != world.current_game_state_id {
            return DispatchOutcome::Dropped;
        }
    }

    let action = match kind {
        PacketKind::Movement => match serde_json::from_value::<MovementPayload>(payload) {
            Ok(p) => PlayerAction::Movement(p.direction),
            Err(e) => return DispatchOutcome::Rejected(ActionError::Decode(e)),
        },
        PacketKind::Rotation => match serde_json::from_value::<RotationPayload>(payload) {
            Ok(p) => PlayerAction::Rotation { tank: p.tank_rotation, turret: p.turret_rotation },
            Err(e) => return DispatchOutcome::Rejected(ActionError::Decode(e)),
        },
        PacketKind::AbilityUse => match serde_json::from_value::<AbilityUsePayload>(payload) {
            Ok(p) => PlayerAction::AbilityUse(p.ability_type),
            Err(e) => return DispatchOutcome::Rejected(ActionError::Decode(e)),
        },
        _ => return DispatchOutcome::Rejected(ActionError::NotEligible),
    };

    world.pending_actions.insert(sender.clone(), action);
    if let Some(p) = world.players.get_mut(sender) {
        p.has_acted_this_tick = true;
    }
    DispatchOutcome::Admitted
}
