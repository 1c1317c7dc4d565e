//! Packet envelope and kind registry (spec §6).
//!
//! Packets are framed as `{ "type": <int|string>, "payload": <object> }`
//! text frames. The `type` field's representation — integer ordinal or
//! lower-case string — is chosen per-connection at handshake time and
//! remembered as that connection's [`EnumFormat`].

pub mod types;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ActionError;

/// Wire representation chosen for enums (including the packet `type` field)
/// at handshake time (spec §4.D, §6 `enumSerializationFormat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFormat {
    Int,
    String,
}

impl EnumFormat {
    pub fn from_query_value(v: Option<&str>) -> EnumFormat {
        match v {
            Some("int") => EnumFormat::Int,
            _ => EnumFormat::String,
        }
    }
}

macro_rules! packet_kinds {
    ($($name:ident = $ord:expr, $wire:expr;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum PacketKind {
            $($name,)*
        }

        impl PacketKind {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(PacketKind::$name => $wire,)*
                }
            }

            pub fn as_ordinal(self) -> u8 {
                match self {
                    $(PacketKind::$name => $ord,)*
                }
            }

            pub fn from_str(s: &str) -> Option<PacketKind> {
                match s {
                    $($wire => Some(PacketKind::$name),)*
                    _ => None,
                }
            }

            pub fn from_ordinal(v: u8) -> Option<PacketKind> {
                match v {
                    $($ord => Some(PacketKind::$name),)*
                    _ => None,
                }
            }
        }
    };
}

packet_kinds! {
    Ping = 0, "ping";
    Pong = 1, "pong";
    GameStart = 2, "gameStart";
    GameNotStarted = 3, "gameNotStarted";
    GameStarting = 4, "gameStarting";
    GameInProgress = 5, "gameInProgress";
    GameEnded = 6, "gameEnded";
    LobbyData = 7, "lobbyData";
    GameState = 8, "gameState";
    GameEnd = 9, "gameEnd";
    Movement = 10, "movement";
    Rotation = 11, "rotation";
    AbilityUse = 12, "abilityUse";
    InvalidPacketUsageError = 13, "invalidPacketUsageError";
}

/// Encode `payload` into one complete text frame under `kind`, honoring `format`.
pub fn encode_packet<T: Serialize>(kind: PacketKind, payload: &T, format: EnumFormat) -> String {
    let type_value = match format {
        EnumFormat::Int => Value::from(kind.as_ordinal()),
        EnumFormat::String => Value::from(kind.as_str()),
    };
    let payload_value = serde_json::to_value(payload).unwrap_or(Value::Null);
    let envelope = serde_json::json!({ "type": type_value, "payload": payload_value });
    envelope.to_string()
}

/// Decode a raw text frame into its kind and raw payload value, without yet
/// interpreting the payload's shape (the dispatcher does that per-kind).
pub fn decode_envelope(text: &str) -> Result<(PacketKind, Value), ActionError> {
    #[derive(Deserialize)]
    struct RawEnvelope {
        #[serde(rename = "type")]
        kind: Value,
        #[serde(default)]
        payload: Value,
    }

    let raw: RawEnvelope = serde_json::from_str(text)?;
    let kind = match &raw.kind {
        Value::String(s) => PacketKind::from_str(s),
        Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()).and_then(PacketKind::from_ordinal),
        _ => None,
    };
    let kind = kind.ok_or_else(|| ActionError::UnknownEnumValue {
        field: "type",
        value: raw.kind.to_string(),
    })?;
    Ok((kind, raw.payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_packet_kind_in_string_format() {
        let kinds = [
            PacketKind::Ping, PacketKind::Pong, PacketKind::GameStart, PacketKind::GameNotStarted,
            PacketKind::GameStarting, PacketKind::GameInProgress, PacketKind::GameEnded,
            PacketKind::LobbyData, PacketKind::GameState, PacketKind::GameEnd,
            PacketKind::Movement, PacketKind::Rotation, PacketKind::AbilityUse,
            PacketKind::InvalidPacketUsageError,
        ];
        for kind in kinds {
            let text = encode_packet(kind, &serde_json::json!({"x": 1}), EnumFormat::String);
            let (decoded, payload) = decode_envelope(&text).unwrap();
            assert_eq!(decoded.as_str(), kind.as_str());
            assert_eq!(payload["x"], 1);
        }
    }

    #[test]
    fn round_trips_in_int_format() {
        let text = encode_packet(PacketKind::Movement, &serde_json::json!({}), EnumFormat::Int);
        assert!(text.contains("\"type\":10"));
        let (decoded, _) = decode_envelope(&text).unwrap();
        assert_eq!(decoded.as_ordinal(), PacketKind::Movement.as_ordinal());
    }

    #[test]
    fn unknown_type_value_is_an_error() {
        let err = decode_envelope(r#"{"type":"bogus","payload":{}}"#);
        assert!(err.is_err());
    }
}
