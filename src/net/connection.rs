//! Runs a single WebSocket connection: read frames -> shared channel, write
//! channel -> frames. Mirrors the teacher's split read/write task pair, but
//! frames are JSON text (spec §6) instead of binary, and `Ping`/`Pong` are
//! answered immediately by this task rather than round-tripping through the
//! tick worker (spec §4.F expansion).

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::info;

use crate::entities::PlayerId;
use crate::handshake::ParticipantKind;
use crate::msg::types::InvalidPacketUsageErrorPayload;
use crate::msg::{decode_envelope, encode_packet, EnumFormat, PacketKind};
use crate::server::IncomingPacket;

/// Runs until the socket closes or a fatal write error occurs, then notifies
/// the tick worker via `closed_tx` so the player can be retained as
/// disconnected-in-game (spec §4.E).
pub async fn handle_connection(
    ws_stream: WebSocketStream<TcpStream>,
    conn_id: u64,
    kind: ParticipantKind,
    format: EnumFormat,
    incoming_tx: mpsc::UnboundedSender<IncomingPacket>,
    closed_tx: mpsc::UnboundedSender<u64>,
    reply_tx: mpsc::UnboundedSender<String>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    // A player connection's id is derived the same way `GameServer::register_player`
    // derives it, so the read task can tag packets without waiting on the tick
    // worker to finish registering the connection.
    let player_id = match kind {
        ParticipantKind::Player { .. } => Some(PlayerId::new(format!("p{conn_id}"))),
        ParticipantKind::Spectator => None,
    };
    let is_spectator = player_id.is_none();

    let read_task = tokio::spawn({
        let reply_tx = reply_tx.clone();
        let player_id = player_id.clone();
        async move {
            while let Some(frame) = ws_read.next().await {
                let Ok(msg) = frame else { break };
                let text = match msg {
                    Message::Text(t) => t,
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => continue,
                    _ => continue,
                };

                let (kind, payload) = match decode_envelope(&text) {
                    Ok(pair) => pair,
                    Err(e) => {
                        let err = InvalidPacketUsageErrorPayload::new(e.to_string());
                        let _ = reply_tx.send(encode_packet(PacketKind::InvalidPacketUsageError, &err, format));
                        continue;
                    }
                };

                match kind {
                    PacketKind::Ping => {
                        let _ = reply_tx.send(encode_packet(PacketKind::Pong, &serde_json::json!({}), format));
                    }
                    PacketKind::Pong => {}
                    PacketKind::Movement | PacketKind::Rotation | PacketKind::AbilityUse => {
                        if let Some(id) = &player_id {
                            let _ = incoming_tx.send(IncomingPacket { player_id: id.clone(), kind, payload });
                        } else {
                            let err = InvalidPacketUsageErrorPayload::new("spectators cannot submit actions");
                            let _ = reply_tx.send(encode_packet(PacketKind::InvalidPacketUsageError, &err, format));
                        }
                    }
                    _ => {
                        let err = InvalidPacketUsageErrorPayload::new("unexpected packet kind from client");
                        let _ = reply_tx.send(encode_packet(PacketKind::InvalidPacketUsageError, &err, format));
                    }
                }
            }
        }
    });

    let write_task = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if ws_write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_write.send(Message::Close(None)).await;
    });

    tokio::select! {
        _ = read_task => {}
        _ = write_task => {}
    }

    let _ = closed_tx.send(conn_id);
    info!(conn_id, spectator = is_spectator, "connection closed");
}
