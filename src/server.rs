// src/server.rs
// HTTP server for the caller hub, plus the event-log subscriber.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::api::handle_request;
use crate::config::ServerConfig;
use crate::events::GameEvent;
use crate::game::Game;
use crate::logging::{log_error, log_info};

// Every game event gets one log line; this is the hub-side subscriber of
// the event bus.
fn spawn_event_logger(game: &Game) {
    let mut events = game.events().subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    log_info(&format!("Event log fell behind, skipped {missed} events"));
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };
            match event {
                GameEvent::NumberCalled {
                    number,
                    total_called,
                } => log_info(&format!("Called number {number} ({total_called} so far)")),
                GameEvent::PatternChanged { pattern } => {
                    log_info(&format!("Active pattern is now {pattern}"));
                }
                GameEvent::ClaimSubmitted {
                    claim_id,
                    serial,
                    pattern,
                } => log_info(&format!("Claim {claim_id} on ticket {serial} for {pattern}")),
                GameEvent::ClaimResolved { claim_id, status } => {
                    log_info(&format!("Claim {claim_id} resolved as {status:?}"));
                }
                GameEvent::GameReset { game_id } => {
                    log_info(&format!("New game started: {game_id}"));
                }
            }
        }
    });
}

/// Start the hub server. Returns the join handle, the shutdown flag and
/// the shared game so the embedding binary can inspect state.
pub fn start_server(config: ServerConfig) -> (tokio::task::JoinHandle<()>, Arc<AtomicBool>, Game) {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown_signal);

    let game = Game::new();
    log_info(&format!("Created new game instance: {}", game.game_info()));
    spawn_event_logger(&game);

    let game_clone = game.clone();
    let handle = tokio::spawn(async move {
        let addr = SocketAddr::from((
            config
                .host
                .parse::<std::net::IpAddr>()
                .unwrap_or([127, 0, 0, 1].into()),
            config.port,
        ));
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                log_error(&format!("Failed to start hub server: {e}"));
                return;
            }
        };

        log_info(&format!("Hub server listening on {addr}"));

        loop {
            if shutdown_clone.load(Ordering::Relaxed) {
                break;
            }

            // Accept with a timeout so the shutdown flag is observed.
            let accept_result = tokio::time::timeout(
                std::time::Duration::from_millis(100),
                listener.accept(),
            )
            .await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let game = game_clone.clone();
                    let io = TokioIo::new(stream);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| handle_request(req, game.clone()));

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            log_error(&format!("Error serving connection: {err:?}"));
                        }
                    });
                }
                Ok(Err(e)) => {
                    log_error(&format!("Error accepting connection: {e}"));
                    break;
                }
                Err(_) => {
                    // Timeout, loop around and re-check the shutdown flag.
                }
            }
        }
        log_info("Hub server shutting down...");
    });

    (handle, shutdown_signal, game)
}
