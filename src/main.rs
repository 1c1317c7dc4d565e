use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use monotanks_server::config::ServerConfig;
use monotanks_server::handshake::{self, HandshakeGate};
use monotanks_server::net::connection::handle_connection;
use monotanks_server::scheduler::{self, NewConnection};
use monotanks_server::server::{self, GameServer};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::parse();
    if let Err(e) = config.validate() {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    }

    let host = if config.host == "*" { "0.0.0.0".to_string() } else { config.host.clone() };
    let addr = format!("{host}:{}", config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!(%addr, players = config.players, ticks = config.ticks, "monotanks server listening");

    let gate = Arc::new(HandshakeGate::new(config.join_code.clone(), config.players));

    let (new_conn_tx, new_conn_rx) = mpsc::unbounded_channel::<NewConnection>();
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<server::IncomingPacket>();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel::<u64>();

    let server = GameServer::new(config);
    let mut tick_worker = tokio::spawn(scheduler::run(server, new_conn_rx, closed_rx, incoming_rx));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
                let gate = gate.clone();
                let new_conn_tx = new_conn_tx.clone();
                let incoming_tx = incoming_tx.clone();
                let closed_tx = closed_tx.clone();

                tokio::spawn(async move {
                    let (ws_stream, info) = match handshake::accept(stream, gate).await {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(%peer_addr, error = %e, "handshake rejected");
                            return;
                        }
                    };

                    info!(conn_id, %peer_addr, nickname = %info.nickname, "connection accepted");

                    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
                    let _ = new_conn_tx.send(NewConnection {
                        conn_id,
                        info: info.clone(),
                        outbound: outbound_tx.clone(),
                    });

                    handle_connection(
                        ws_stream,
                        conn_id,
                        info.kind,
                        info.format,
                        incoming_tx,
                        closed_tx,
                        outbound_tx,
                        outbound_rx,
                    )
                    .await;
                });
            }
            result = &mut tick_worker => {
                match result {
                    Ok(Ok(())) => info!("match complete, shutting down"),
                    Ok(Err(e)) => {
                        eprintln!("fatal error: {e}");
                        std::process::exit(1);
                    }
                    Err(e) => {
                        eprintln!("tick worker panicked: {e}");
                        std::process::exit(1);
                    }
                }
                break;
            }
        }
    }
}
