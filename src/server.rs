//! `GameServer` ties together the world, the participant registry, and the
//! replay journal — the single struct the tick worker owns exclusively
//! (spec §5).

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};

use crate::config::{ServerConfig, GRID_DIM};
use crate::entities::{Color, Player, PlayerId, Tank};
use crate::msg::types::{GameEndPayload, GameEndPlayerResult, LobbyDataPayload, LobbyPlayerInfo, LobbySettings};
use crate::msg::{encode_packet, EnumFormat, PacketKind};
use crate::replay::ReplayJournal;
use crate::world::World;

/// A join code configures a private match whose result is recorded as
/// authoritative (spec §4.H "competitive mode"); an empty join code is the
/// open/casual case, where replay results carry no validity guarantee.
fn is_competitive(config: &ServerConfig) -> bool {
    !config.join_code.is_empty()
}

/// One decoded (but not yet admitted) action frame, posted by a connection's
/// read task into the shared channel the tick worker drains each tick.
#[derive(Debug)]
pub struct IncomingPacket {
    pub player_id: PlayerId,
    pub kind: PacketKind,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    Running,
    Ended,
}

pub struct ConnectionHandle {
    pub outbound: mpsc::UnboundedSender<String>,
    pub format: EnumFormat,
    pub player_id: Option<PlayerId>,
}

/// A palette cycled through as players join; matches the teacher's
/// deterministic-but-distinct per-slot color assignment in spirit.
const PALETTE: [(u8, u8, u8); 4] = [(220, 60, 60), (60, 140, 220), (80, 200, 100), (230, 190, 60)];

pub struct GameServer {
    pub world: World,
    pub config: ServerConfig,
    pub phase: GamePhase,
    pub connections: HashMap<u64, ConnectionHandle>,
    pub replay: Option<ReplayJournal>,
    pub eager_notify: Notify,
    pub disconnected_in_game: Vec<PlayerId>,
    next_player_index: u8,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Self {
        let seed = config.resolved_seed();
        let world = World::new(seed, GRID_DIM, config.sandbox);
        Self {
            world,
            config,
            phase: GamePhase::Lobby,
            connections: HashMap::new(),
            replay: None,
            eager_notify: Notify::new(),
            disconnected_in_game: Vec::new(),
            next_player_index: 0,
        }
    }

    pub fn lobby_settings(&self) -> LobbySettings {
        LobbySettings {
            grid_dimension: self.world.grid.dim,
            number_of_players: self.config.players,
            seed: self.config.resolved_seed(),
            broadcast_interval_ms: self.config.broadcast_interval_ms,
            ticks: Some(self.config.ticks as u32),
            sandbox: self.config.sandbox,
            eager_broadcast: self.config.eager_broadcast,
        }
    }

    pub fn lobby_data_for(&self, recipient: Option<&PlayerId>) -> LobbyDataPayload {
        let players = self
            .world
            .players
            .values()
            .map(|p| LobbyPlayerInfo { id: p.id.as_str().to_string(), nickname: p.nickname.clone(), color: p.color.packed() })
            .collect();
        LobbyDataPayload { player_id: recipient.map(|id| id.as_str().to_string()), players, settings: self.lobby_settings() }
    }

    /// Registers a new player connection, returning its freshly assigned id.
    /// Does not place a tank on the grid — that happens once the match
    /// transitions to `Running` (spec §4.E).
    pub fn register_player(&mut self, conn_id: u64, nickname: String, is_bot: bool, outbound: mpsc::UnboundedSender<String>, format: EnumFormat) -> PlayerId {
        let id = PlayerId::new(format!("p{}", conn_id));
        let color = PALETTE[self.next_player_index as usize % PALETTE.len()];
        self.next_player_index += 1;
        let player = Player::new(id.clone(), nickname, Color(color.0, color.1, color.2), self.world.grid.dim, is_bot);
        self.world.players.insert(id.clone(), player);
        self.connections.insert(conn_id, ConnectionHandle { outbound, format, player_id: Some(id.clone()) });
        id
    }

    pub fn register_spectator(&mut self, conn_id: u64, outbound: mpsc::UnboundedSender<String>, format: EnumFormat) {
        self.connections.insert(conn_id, ConnectionHandle { outbound, format, player_id: None });
    }

    /// A departing connection keeps its player entity (spec §4.E
    /// `disconnected_in_game`) so results accounting still reflects it.
    pub fn remove_connection(&mut self, conn_id: u64) {
        if let Some(handle) = self.connections.remove(&conn_id) {
            if let Some(id) = handle.player_id {
                if let Some(player) = self.world.players.get_mut(&id) {
                    player.is_disconnected = true;
                }
                if self.phase == GamePhase::Running {
                    self.disconnected_in_game.push(id);
                }
            }
        }
    }

    pub fn connected_player_count(&self) -> u8 {
        self.world.players.values().filter(|p| !p.is_disconnected).count() as u8
    }

    pub fn is_lobby_full(&self) -> bool {
        self.connected_player_count() >= self.config.players
    }

    /// Spawns every registered player's tank and flips the match `Running`.
    /// Called exactly once, when the lobby fills (spec §4.E). Opens the
    /// replay journal here too, since the final roster (and thus lobby data)
    /// is only known once the match actually starts.
    ///
    /// `HashMap` key order isn't a function of the seed, so the ids are
    /// sorted onto a stable key (nickname) before any of them draw a spawn
    /// point from `world.rng` — otherwise two identical-seed runs could hand
    /// out different spawn tiles to the same players.
    pub fn start_match(&mut self) {
        let mut ids: Vec<PlayerId> = self.world.players.keys().cloned().collect();
        ids.sort_by_key(|id| self.world.players.get(id).map(|p| p.nickname.clone()).unwrap_or_default());

        let mut occupied: Vec<(i32, i32)> = Vec::new();
        for id in ids {
            let (spawn, direction) = self.world.grid.random_spawn(&mut self.world.rng, &occupied);
            occupied.push(spawn);
            if let Some(player) = self.world.players.get_mut(&id) {
                player.tank = Some(Tank::new(id.clone(), spawn.0, spawn.1, direction));
            }
        }
        if self.config.save_replay {
            if let Some(path) = self.config.replay_filepath.clone() {
                let lobby_data = self.lobby_data_for(None);
                self.replay = Some(ReplayJournal::new(path, lobby_data, is_competitive(&self.config)));
            }
        }
        self.phase = GamePhase::Running;
    }

    /// Players ranked by descending score, ties broken by kills.
    pub fn ranked_results(&self) -> GameEndPayload {
        let mut players: Vec<GameEndPlayerResult> = self
            .world
            .players
            .values()
            .map(|p| GameEndPlayerResult { id: p.id.as_str().to_string(), nickname: p.nickname.clone(), score: p.score, kills: p.kills })
            .collect();
        players.sort_by(|a, b| b.score.cmp(&a.score).then(b.kills.cmp(&a.kills)));
        GameEndPayload { players }
    }

    pub fn send_packet<T: Serialize>(&self, conn_id: u64, kind: PacketKind, payload: &T) {
        if let Some(handle) = self.connections.get(&conn_id) {
            let text = encode_packet(kind, payload, handle.format);
            let _ = handle.outbound.send(text);
        }
    }

    pub fn send_to_player<T: Serialize>(&self, player_id: &PlayerId, kind: PacketKind, payload: &T) {
        if let Some((conn_id, _)) = self.connections.iter().find(|(_, h)| h.player_id.as_ref() == Some(player_id)) {
            self.send_packet(*conn_id, kind, payload);
        }
    }

    pub fn broadcast<T: Serialize>(&self, kind: PacketKind, payload: &T) {
        for conn_id in self.connections.keys() {
            self.send_packet(*conn_id, kind, payload);
        }
    }
}
