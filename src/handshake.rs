//! HTTP upgrade handshake (spec §6): path + query-string routing performed
//! inside the WebSocket upgrade callback, before a connection ever reaches
//! the game loop — mirroring the teacher's `accept_async`-based acceptance
//! but intercepting the HTTP request first.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::WebSocketStream;

use crate::error::HandshakeError;
use crate::msg::EnumFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantKind {
    Player { is_bot: bool },
    Spectator,
}

#[derive(Debug, Clone)]
pub struct HandshakeInfo {
    pub kind: ParticipantKind,
    pub nickname: String,
    pub format: EnumFormat,
}

/// Shared, lock-cheap admission gate consulted synchronously from inside
/// tungstenite's handshake callback (it cannot `.await`). Slot accounting
/// happens here so the single-writer `World` never has to reject a
/// connection after the fact.
pub struct HandshakeGate {
    join_code: String,
    max_players: u8,
    registered: AtomicU8,
}

impl HandshakeGate {
    pub fn new(join_code: String, max_players: u8) -> Self {
        Self { join_code, max_players, registered: AtomicU8::new(0) }
    }

    /// Gives back a reserved slot if this callback ultimately rejects the
    /// connection for an unrelated reason (e.g. malformed query).
    fn release_slot(&self) {
        self.registered.fetch_sub(1, Ordering::SeqCst);
    }

    fn try_reserve_slot(&self) -> bool {
        self.registered
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n < self.max_players { Some(n + 1) } else { None })
            .is_ok()
    }
}

/// Runs the upgrade, routing/validating per spec §6, and returns the
/// negotiated stream plus parsed participant info. On rejection the
/// appropriate HTTP status has already been written to the socket.
pub async fn accept(stream: TcpStream, gate: Arc<HandshakeGate>) -> Result<(WebSocketStream<TcpStream>, HandshakeInfo), HandshakeError> {
    let parsed: Arc<Mutex<Option<Result<HandshakeInfo, HandshakeError>>>> = Arc::new(Mutex::new(None));
    let parsed_for_cb = parsed.clone();

    let ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, response: Response| {
        let outcome = route(req, &gate);
        let result = match &outcome {
            Ok(_) => Ok(response),
            Err(e) => Err(Response::builder()
                .status(StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST))
                .body(Some(e.to_string()))
                .expect("static rejection response always builds")),
        };
        *parsed_for_cb.lock().unwrap() = Some(outcome);
        result
    })
    .await;

    let parsed = parsed.lock().unwrap().take();
    match (ws, parsed) {
        (Ok(stream), Some(Ok(info))) => Ok((stream, info)),
        (_, Some(Err(e))) => Err(e),
        _ => Err(HandshakeError::Malformed("handshake stream closed before a verdict was reached".into())),
    }
}

fn route(req: &Request, gate: &Arc<HandshakeGate>) -> Result<HandshakeInfo, HandshakeError> {
    let path = req.uri().path();
    let query = req.uri().query().unwrap_or("");
    let params: std::collections::HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes()).into_owned().collect();

    if params.get("joinCode").map(String::as_str).unwrap_or("") != gate.join_code {
        return Err(HandshakeError::JoinCodeMismatch);
    }

    let format = EnumFormat::from_query_value(params.get("enumSerializationFormat").map(String::as_str));

    match path {
        "/" => {
            if !gate.try_reserve_slot() {
                return Err(HandshakeError::SlotsFull);
            }
            let nickname = params.get("nickname").cloned().unwrap_or_else(|| "player".to_string());
            if nickname.trim().is_empty() {
                gate.release_slot();
                return Err(HandshakeError::Malformed("nickname must not be empty".into()));
            }
            let is_bot = params.get("type").map(String::as_str) == Some("bot");
            Ok(HandshakeInfo { kind: ParticipantKind::Player { is_bot }, nickname, format })
        }
        "/spectator" => Ok(HandshakeInfo { kind: ParticipantKind::Spectator, nickname: String::new(), format }),
        _ => Err(HandshakeError::Malformed(format!("unknown path {path}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_refuses_once_full() {
        let gate = HandshakeGate::new(String::new(), 1);
        assert!(gate.try_reserve_slot());
        assert!(!gate.try_reserve_slot());
    }

    #[test]
    fn gate_refills_a_released_slot() {
        let gate = HandshakeGate::new(String::new(), 1);
        assert!(gate.try_reserve_slot());
        gate.release_slot();
        assert!(gate.try_reserve_slot());
    }
}
