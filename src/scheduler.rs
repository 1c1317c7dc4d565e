//! The tick scheduler (spec §4.G): a single logical timer that drains
//! connection lifecycle events and admitted actions, runs one simulation
//! tick, fans out per-recipient snapshots, and journals the tick — exactly
//! the seven steps named in the spec, expanded with lobby/end-of-match
//! lifecycle packets (spec §6's "minimum set").

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::action::{self, DispatchOutcome};
use crate::entities::PlayerId;
use crate::error::FatalError;
use crate::handshake::{HandshakeInfo, ParticipantKind};
use crate::msg::types::InvalidPacketUsageErrorPayload;
use crate::msg::PacketKind;
use crate::server::{GamePhase, GameServer, IncomingPacket};
use crate::view::{self, RenderContext};
use crate::world::World;

/// A freshly upgraded connection handed off by the accept loop, not yet
/// known to the tick worker.
pub struct NewConnection {
    pub conn_id: u64,
    pub info: HandshakeInfo,
    pub outbound: mpsc::UnboundedSender<String>,
}

/// Runs the match to completion: one server process runs exactly one match,
/// matching the CLI's "exit 0 on clean shutdown" contract (spec §6).
pub async fn run(
    mut server: GameServer,
    mut new_conns: mpsc::UnboundedReceiver<NewConnection>,
    mut closed: mpsc::UnboundedReceiver<u64>,
    mut incoming: mpsc::UnboundedReceiver<IncomingPacket>,
) -> Result<(), FatalError> {
    loop {
        drain_new_connections(&mut server, &mut new_conns);
        drain_closed(&mut server, &mut closed);
        drain_incoming(&mut server, &mut incoming);

        match server.phase {
            GamePhase::Lobby => {
                if server.is_lobby_full() {
                    server.broadcast(PacketKind::GameStarting, &serde_json::json!({}));
                    server.start_match();
                    server.broadcast(PacketKind::GameStart, &serde_json::json!({}));
                    info!(players = server.connected_player_count(), "match starting");
                } else {
                    idle_wait(&mut server, &mut new_conns, &mut closed, &mut incoming).await;
                }
            }
            GamePhase::Running => {
                if server.world.tick >= server.config.ticks {
                    end_match(&mut server).await?;
                    return Ok(());
                }
                run_one_tick(&mut server, &mut incoming).await;
            }
            GamePhase::Ended => return Ok(()),
        }
    }
}

fn drain_new_connections(server: &mut GameServer, rx: &mut mpsc::UnboundedReceiver<NewConnection>) {
    while let Ok(conn) = rx.try_recv() {
        admit_connection(server, conn);
    }
}

fn drain_closed(server: &mut GameServer, rx: &mut mpsc::UnboundedReceiver<u64>) {
    while let Ok(conn_id) = rx.try_recv() {
        server.remove_connection(conn_id);
    }
}

fn drain_incoming(server: &mut GameServer, rx: &mut mpsc::UnboundedReceiver<IncomingPacket>) {
    while let Ok(packet) = rx.try_recv() {
        dispatch_incoming(server, packet);
    }
}

/// Dispatches one admitted/dropped/rejected packet and, on an eager-mode
/// admission, notifies the scheduler's wait. Shared by `drain_incoming`
/// (top of the outer loop) and `wait_eager` (the inter-tick wait), since
/// bots keep submitting while the scheduler is blocked in the latter.
fn dispatch_incoming(server: &mut GameServer, packet: IncomingPacket) {
    let running = server.phase == GamePhase::Running;
    let outcome = action::dispatch(&mut server.world, &packet.player_id, packet.kind, packet.payload, running);
    match outcome {
        DispatchOutcome::Admitted => {
            if server.config.eager_broadcast && all_bots_submitted(&server.world) {
                server.eager_notify.notify_one();
            }
        }
        DispatchOutcome::Dropped => {}
        DispatchOutcome::Rejected(err) => {
            let payload = InvalidPacketUsageErrorPayload::new(err.to_string());
            server.send_to_player(&packet.player_id, PacketKind::InvalidPacketUsageError, &payload);
        }
    }
}

/// Registers a connection and sends it the lobby/lifecycle packets
/// appropriate to the match's current phase (spec §4.E, §6).
fn admit_connection(server: &mut GameServer, conn: NewConnection) {
    let NewConnection { conn_id, info, outbound } = conn;
    let HandshakeInfo { kind, nickname, format } = info;

    match kind {
        ParticipantKind::Player { is_bot } => {
            let id = server.register_player(conn_id, nickname, is_bot, outbound, format);
            let lobby_data = server.lobby_data_for(Some(&id));
            server.send_packet(conn_id, PacketKind::LobbyData, &lobby_data);
            send_phase_packet(server, conn_id);
            if server.phase == GamePhase::Lobby {
                broadcast_lobby_data(server);
            }
        }
        ParticipantKind::Spectator => {
            server.register_spectator(conn_id, outbound, format);
            let lobby_data = server.lobby_data_for(None);
            server.send_packet(conn_id, PacketKind::LobbyData, &lobby_data);
            send_phase_packet(server, conn_id);
        }
    }
}

fn broadcast_lobby_data(server: &GameServer) {
    let conn_ids: Vec<u64> = server.connections.keys().copied().collect();
    for conn_id in conn_ids {
        let recipient = server.connections.get(&conn_id).and_then(|h| h.player_id.clone());
        let lobby_data = server.lobby_data_for(recipient.as_ref());
        server.send_packet(conn_id, PacketKind::LobbyData, &lobby_data);
    }
}

fn send_phase_packet(server: &GameServer, conn_id: u64) {
    match server.phase {
        GamePhase::Lobby => server.send_packet(conn_id, PacketKind::GameNotStarted, &serde_json::json!({})),
        GamePhase::Running => server.send_packet(conn_id, PacketKind::GameInProgress, &serde_json::json!({})),
        GamePhase::Ended => {
            let results = server.ranked_results();
            server.send_packet(conn_id, PacketKind::GameEnded, &results);
        }
    }
}

/// Nothing to simulate while the lobby is short of players; block on the
/// next lifecycle event instead of busy-polling.
async fn idle_wait(
    server: &mut GameServer,
    new_conns: &mut mpsc::UnboundedReceiver<NewConnection>,
    closed: &mut mpsc::UnboundedReceiver<u64>,
    incoming: &mut mpsc::UnboundedReceiver<IncomingPacket>,
) {
    tokio::select! {
        Some(conn) = new_conns.recv() => admit_connection(server, conn),
        Some(conn_id) = closed.recv() => server.remove_connection(conn_id),
        Some(packet) = incoming.recv() => {
            let payload = InvalidPacketUsageErrorPayload::new("game has not started");
            server.send_to_player(&packet.player_id, PacketKind::InvalidPacketUsageError, &payload);
        }
    }
}

/// Steps 1–7 of §4.G, with step 1 (end-of-game check) handled by the caller.
async fn run_one_tick(server: &mut GameServer, incoming: &mut mpsc::UnboundedReceiver<IncomingPacket>) {
    let started = Instant::now();

    let _events = crate::simulation::run_tick(&mut server.world);

    let new_id = server.world.current_game_state_id + 1;
    server.world.begin_next_game_state(new_id);

    broadcast_snapshots(server, new_id);

    for player in server.world.players.values_mut() {
        player.clear_radar_flag();
    }

    if let Some(replay) = server.replay.as_mut() {
        let spectator_snapshot = view::render(&server.world, &RenderContext::Spectator);
        replay.record_tick(serde_json::to_value(&spectator_snapshot).unwrap_or(serde_json::Value::Null));
    }

    let elapsed = started.elapsed();
    let target = Duration::from_millis(server.config.broadcast_interval_ms);
    let remaining = target.checked_sub(elapsed);

    match remaining {
        None => warn!(tick = server.world.tick, overrun_by_ms = (elapsed - target).as_millis(), "broadcast interval overrun"),
        Some(sleep_for) if sleep_for.is_zero() => {}
        Some(sleep_for) if server.config.eager_broadcast => wait_eager(server, incoming, sleep_for).await,
        Some(sleep_for) => time::sleep(sleep_for).await,
    }
}

/// Waits for `sleep_for` unless every alive player is a bot and all have
/// already submitted, in which case the next tick starts as soon as that
/// becomes true. Bots submit their next action while the scheduler sits
/// here, so `incoming` has to be drained in this same wait — otherwise
/// nothing ever dispatches those packets and `eager_notify` never fires,
/// degrading eager-broadcast into a plain `sleep_for` every tick. A notify
/// can race a late human reconnect, so the predicate is re-checked rather
/// than trusted blindly (spec §4.G expansion).
async fn wait_eager(server: &mut GameServer, incoming: &mut mpsc::UnboundedReceiver<IncomingPacket>, sleep_for: Duration) {
    let deadline = Instant::now() + sleep_for;
    loop {
        tokio::select! {
            _ = time::sleep_until(deadline) => return,
            _ = server.eager_notify.notified() => {
                if all_bots_submitted(&server.world) {
                    return;
                }
            }
            Some(packet) = incoming.recv() => {
                dispatch_incoming(server, packet);
                if all_bots_submitted(&server.world) {
                    return;
                }
            }
        }
    }
}

fn all_bots_submitted(world: &World) -> bool {
    let mut any_alive = false;
    for player in world.players.values() {
        if player.is_disconnected || !player.is_alive() {
            continue;
        }
        any_alive = true;
        if !player.is_bot || !player.has_acted_this_tick {
            return false;
        }
    }
    any_alive
}

fn broadcast_snapshots(server: &GameServer, game_state_id: u64) {
    let player_ids: Vec<PlayerId> = server.world.players.keys().cloned().collect();
    for id in player_ids {
        let mut snapshot = view::render(&server.world, &RenderContext::OwningPlayer(id.clone()));
        snapshot.id = Some(game_state_id);
        server.send_to_player(&id, PacketKind::GameState, &snapshot);
    }

    let has_spectators = server.connections.values().any(|h| h.player_id.is_none());
    if has_spectators {
        let snapshot = view::render(&server.world, &RenderContext::Spectator);
        let spectator_conns: Vec<u64> = server.connections.iter().filter(|(_, h)| h.player_id.is_none()).map(|(id, _)| *id).collect();
        for conn_id in spectator_conns {
            server.send_packet(conn_id, PacketKind::GameState, &snapshot);
        }
    }
}

async fn end_match(server: &mut GameServer) -> Result<(), FatalError> {
    let results = server.ranked_results();
    server.broadcast(PacketKind::GameEnd, &results);

    let any_disconnected = !server.disconnected_in_game.is_empty();
    if let Some(replay) = server.replay.take() {
        replay.finalize(&results, any_disconnected)?;
    }

    server.phase = GamePhase::Ended;
    // Dropping every outbound sender closes each connection's write loop,
    // which then sends a normal-closure frame and ends (spec §5, §7).
    server.connections.clear();
    info!(ticks = server.world.tick, "match ended");
    Ok(())
}
