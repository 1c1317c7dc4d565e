//! Strongly-typed packet payloads (spec §6). `gameState` is rendered separately
//! by [`crate::view`] because its shape depends on the recipient's visibility.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayerInfo {
    pub id: String,
    pub nickname: String,
    pub color: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySettings {
    pub grid_dimension: u8,
    pub number_of_players: u8,
    pub seed: u64,
    pub broadcast_interval_ms: u64,
    pub ticks: Option<u32>,
    pub sandbox: bool,
    pub eager_broadcast: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyDataPayload {
    pub player_id: Option<String>,
    pub players: Vec<LobbyPlayerInfo>,
    pub settings: LobbySettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MovementDirection {
    Forward,
    Backward,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementPayload {
    pub direction: MovementDirection,
    pub game_state_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationDirection {
    Left,
    Right,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationPayload {
    #[serde(default)]
    pub tank_rotation: Option<RotationDirection>,
    #[serde(default)]
    pub turret_rotation: Option<RotationDirection>,
    pub game_state_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AbilityType {
    FireBullet,
    FireDoubleBullet,
    UseLaser,
    DropMine,
    UseRadar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityUsePayload {
    pub ability_type: AbilityType,
    pub game_state_id: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndPlayerResult {
    pub id: String,
    pub nickname: String,
    pub score: u32,
    pub kills: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndPayload {
    pub players: Vec<GameEndPlayerResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidPacketUsageErrorPayload {
    pub reason: String,
}

impl InvalidPacketUsageErrorPayload {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}
