// src/api.rs
// HTTP request handling for the caller hub API. Routing and body IO live
// in `handle_request`; each operation is a plain function over `Game` so
// it can be exercised without a socket.

use crate::claims::{Claim, RankedTicket};
use crate::defs::{CALLER_ID, Number};
use crate::game::Game;
use crate::logging::log_info;
use crate::score::{Evaluation, WinPattern};
use crate::ticket::{Grid, Ticket};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

// ---- wire types --------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub strips: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub player_id: String,
    pub serials: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub game_id: String,
    pub created_at: String,
    pub pattern: WinPattern,
    pub called: usize,
    pub remaining: usize,
    pub players: usize,
    pub pending_claims: usize,
    pub game_over: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallsResponse {
    pub calls: Vec<Number>,
    pub last: Option<Number>,
    pub remaining: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse {
    pub number: Number,
    pub total_called: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatternResponse {
    pub pattern: WinPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPatternRequest {
    pub pattern: WinPattern,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketResponse {
    pub ticket: Ticket,
    pub grid: Grid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketProgress {
    pub serial: String,
    pub grid: Grid,
    pub evaluation: Evaluation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerTicketsResponse {
    pub pattern: WinPattern,
    pub tickets: Vec<TicketProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub serial: String,
    pub pattern: Option<WinPattern>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub claim: Claim,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RankedClaim {
    pub claim: Claim,
    pub ranking: RankedTicket,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimsResponse {
    pub pattern: WinPattern,
    pub claims: Vec<RankedClaim>,
    pub perfect: usize,
    pub missed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveClaimRequest {
    pub claim_id: String,
    pub accept: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveClaimResponse {
    pub claim_id: String,
    pub status: crate::claims::ClaimStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewGameResponse {
    pub game_id: String,
    pub components: Vec<String>,
}

// ---- operations --------------------------------------------------------

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn register(game: &Game, request: &RegisterRequest) -> ApiResult<RegisterResponse> {
    if request.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Player name is required".into()));
    }
    if game.has_game_started() {
        return Err((
            StatusCode::CONFLICT,
            "Game already started, registration is closed".into(),
        ));
    }

    let player = game
        .register_player(request.name.trim())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let strips = request.strips.unwrap_or(1);
    let mut serials: Vec<String> = player.serials.clone();
    if serials.is_empty() && strips > 0 {
        let issued = game
            .issue_strips(&player.player_id, strips)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
        serials = issued.into_iter().map(|t| t.serial).collect();
    }

    Ok(RegisterResponse {
        player_id: player.player_id,
        message: format!("Player '{}' registered with {} tickets", player.name, serials.len()),
        serials,
    })
}

pub fn status(game: &Game) -> StatusResponse {
    StatusResponse {
        game_id: game.id(),
        created_at: game.created_at_string(),
        pattern: game.active_pattern(),
        called: game.calls_len(),
        remaining: game.pouch_len(),
        players: game.player_count(),
        pending_claims: game.pending_claims().len(),
        game_over: game.is_game_over(),
    }
}

pub fn calls(game: &Game) -> CallsResponse {
    CallsResponse {
        calls: game.called_numbers(),
        last: game.last_called(),
        remaining: game.pouch_len(),
    }
}

pub fn call(game: &Game) -> ApiResult<CallResponse> {
    let (number, total_called) = game
        .call_number()
        .map_err(|e| (StatusCode::CONFLICT, e))?;
    Ok(CallResponse {
        number,
        total_called,
    })
}

pub fn set_pattern(game: &Game, request: &SetPatternRequest) -> ApiResult<PatternResponse> {
    game.set_pattern(request.pattern)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(PatternResponse {
        pattern: game.active_pattern(),
    })
}

pub fn ticket_view(game: &Game, serial: &str) -> ApiResult<TicketResponse> {
    let ticket = game
        .ticket(serial)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown ticket serial: {serial}")))?;
    let grid = ticket.grid();
    Ok(TicketResponse { ticket, grid })
}

pub fn player_tickets(game: &Game, player_id: &str) -> ApiResult<PlayerTicketsResponse> {
    if game.player(player_id).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("Unknown player id: {player_id}")));
    }
    let progress = game
        .player_progress(player_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(PlayerTicketsResponse {
        pattern: game.active_pattern(),
        tickets: progress
            .into_iter()
            .map(|(ticket, evaluation)| TicketProgress {
                grid: ticket.grid(),
                serial: ticket.serial,
                evaluation,
            })
            .collect(),
    })
}

pub fn submit_claim(game: &Game, request: &ClaimRequest) -> ApiResult<ClaimResponse> {
    let pattern = request.pattern.unwrap_or_else(|| game.active_pattern());
    let claim = game
        .submit_claim(&request.serial, pattern)
        .map_err(|e| (StatusCode::CONFLICT, e))?;

    Ok(ClaimResponse {
        message: format!("Claim {} submitted for {}", claim.id, pattern),
        claim,
    })
}

pub fn claims_view(game: &Game) -> ApiResult<ClaimsResponse> {
    let pattern = game.active_pattern();
    let ranked = game
        .ranked_claims(pattern)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let perfect = ranked
        .iter()
        .filter(|(_, r)| r.is_valid && r.missed_by == 0)
        .count();
    let missed = ranked
        .iter()
        .filter(|(_, r)| r.is_valid && r.missed_by > 0)
        .count();

    Ok(ClaimsResponse {
        pattern,
        claims: ranked
            .into_iter()
            .map(|(claim, ranking)| RankedClaim { claim, ranking })
            .collect(),
        perfect,
        missed,
    })
}

pub fn resolve_claim(game: &Game, request: &ResolveClaimRequest) -> ApiResult<ResolveClaimResponse> {
    let status = game
        .resolve_claim(&request.claim_id, request.accept)
        .map_err(|e| (StatusCode::CONFLICT, e))?;
    Ok(ResolveClaimResponse {
        claim_id: request.claim_id.clone(),
        status,
    })
}

pub fn new_game(game: &Game) -> ApiResult<NewGameResponse> {
    // An ended game is archived before its state is thrown away.
    if game.has_game_started() && game.is_game_over() {
        match game.dump_to_json() {
            Ok(message) => log_info(&message),
            Err(e) => log_info(&format!("Skipping game dump: {e}")),
        }
    }

    let components = game
        .reset_game()
        .map_err(|errors| (StatusCode::INTERNAL_SERVER_ERROR, errors.join("; ")))?;
    Ok(NewGameResponse {
        game_id: game.id(),
        components,
    })
}

// ---- hyper glue --------------------------------------------------------

fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(payload)
        .unwrap_or_else(|_| "{\"error\":\"serialization failure\"}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn error_response(status: StatusCode, error: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
        },
    )
}

fn api_response<T: Serialize>(result: ApiResult<T>) -> Response<Full<Bytes>> {
    match result {
        Ok(payload) => json_response(StatusCode::OK, &payload),
        Err((status, error)) => error_response(status, &error),
    }
}

fn is_caller(req: &Request<Incoming>) -> bool {
    req.headers()
        .get("X-Player-Id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value == CALLER_ID)
        .unwrap_or(false)
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            ));
        }
    };
    serde_json::from_slice(&body).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON body: {e}"))
    })
}

/// Route one request. Caller-only routes are gated on the reserved caller
/// identity in the X-Player-Id header.
pub async fn handle_request(
    req: Request<Incoming>,
    game: Game,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let caller = is_caller(&req);
    let path = req.uri().path().to_string();

    let response = match (req.method().clone(), path.as_str()) {
        (Method::POST, "/register") => match read_json::<RegisterRequest>(req).await {
            Ok(request) => api_response(register(&game, &request)),
            Err(response) => response,
        },
        (Method::GET, "/status") => json_response(StatusCode::OK, &status(&game)),
        (Method::GET, "/calls") => json_response(StatusCode::OK, &calls(&game)),
        (Method::POST, "/call") => {
            if caller {
                api_response(call(&game))
            } else {
                error_response(StatusCode::FORBIDDEN, "Only the caller can draw numbers")
            }
        }
        (Method::GET, "/pattern") => json_response(
            StatusCode::OK,
            &PatternResponse {
                pattern: game.active_pattern(),
            },
        ),
        (Method::POST, "/pattern") => {
            if caller {
                match read_json::<SetPatternRequest>(req).await {
                    Ok(request) => api_response(set_pattern(&game, &request)),
                    Err(response) => response,
                }
            } else {
                error_response(StatusCode::FORBIDDEN, "Only the caller can change the pattern")
            }
        }
        (Method::POST, "/claim") => match read_json::<ClaimRequest>(req).await {
            Ok(request) => api_response(submit_claim(&game, &request)),
            Err(response) => response,
        },
        (Method::GET, "/claims") => api_response(claims_view(&game)),
        (Method::POST, "/resolveclaim") => {
            if caller {
                match read_json::<ResolveClaimRequest>(req).await {
                    Ok(request) => api_response(resolve_claim(&game, &request)),
                    Err(response) => response,
                }
            } else {
                error_response(StatusCode::FORBIDDEN, "Only the caller can resolve claims")
            }
        }
        (Method::POST, "/newgame") => {
            if caller {
                api_response(new_game(&game))
            } else {
                error_response(StatusCode::FORBIDDEN, "Only the caller can start a new game")
            }
        }
        (Method::GET, path) if path.starts_with("/ticket/") => {
            let serial = &path[8..];
            api_response(ticket_view(&game, serial))
        }
        (Method::GET, path) if path.starts_with("/player/") && path.ends_with("/tickets") => {
            let player_id = &path[8..path.len() - 8];
            api_response(player_tickets(&game, player_id))
        }
        _ => error_response(StatusCode::NOT_FOUND, "Not found"),
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::ClaimStatus;

    fn registered_game() -> (Game, RegisterResponse) {
        let game = Game::new();
        let response = register(
            &game,
            &RegisterRequest {
                name: "alice".to_string(),
                strips: Some(1),
            },
        )
        .unwrap();
        (game, response)
    }

    #[test]
    fn test_register_issues_tickets() {
        let (_, response) = registered_game();
        assert_eq!(response.serials.len(), 6);
        assert!(!response.player_id.is_empty());
        assert!(response.message.contains("alice"));
    }

    #[test]
    fn test_register_twice_keeps_tickets() {
        let (game, first) = registered_game();
        let second = register(
            &game,
            &RegisterRequest {
                name: "alice".to_string(),
                strips: Some(3),
            },
        )
        .unwrap();
        assert_eq!(first.player_id, second.player_id);
        assert_eq!(first.serials, second.serials);
    }

    #[test]
    fn test_register_closed_after_first_call() {
        let (game, _) = registered_game();
        call(&game).unwrap();

        let result = register(
            &game,
            &RegisterRequest {
                name: "bob".to_string(),
                strips: None,
            },
        );
        assert_eq!(result.unwrap_err().0, StatusCode::CONFLICT);
    }

    #[test]
    fn test_register_requires_name() {
        let game = Game::new();
        let result = register(
            &game,
            &RegisterRequest {
                name: "   ".to_string(),
                strips: None,
            },
        );
        assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_call_updates_status_and_calls() {
        let game = Game::new();
        let response = call(&game).unwrap();
        assert_eq!(response.total_called, 1);

        let status = status(&game);
        assert_eq!(status.called, 1);
        assert_eq!(status.remaining, 89);

        let calls = calls(&game);
        assert_eq!(calls.calls, vec![response.number]);
        assert_eq!(calls.last, Some(response.number));
    }

    #[test]
    fn test_ticket_view_round_trips_the_grid() {
        let (game, response) = registered_game();
        let view = ticket_view(&game, &response.serials[0]).unwrap();
        assert_eq!(view.grid, view.ticket.grid());
        assert!(ticket_view(&game, "NOPE").is_err());
    }

    #[test]
    fn test_player_tickets_reports_progress() {
        let (game, response) = registered_game();
        let view = player_tickets(&game, &response.player_id).unwrap();
        assert_eq!(view.tickets.len(), 6);
        assert_eq!(view.pattern, WinPattern::OneLine);
        for ticket in &view.tickets {
            assert!(!ticket.evaluation.is_winner);
        }
        assert!(player_tickets(&game, "NOPE").is_err());
    }

    #[test]
    fn test_claim_and_resolution_flow() {
        let (game, response) = registered_game();
        call(&game).unwrap();

        let claim = submit_claim(
            &game,
            &ClaimRequest {
                serial: response.serials[0].clone(),
                pattern: None,
            },
        )
        .unwrap();
        assert_eq!(claim.claim.pattern, WinPattern::OneLine);

        let view = claims_view(&game).unwrap();
        assert_eq!(view.claims.len(), 1);

        let resolved = resolve_claim(
            &game,
            &ResolveClaimRequest {
                claim_id: claim.claim.id.clone(),
                accept: false,
            },
        )
        .unwrap();
        assert_eq!(resolved.status, ClaimStatus::Rejected);

        // Terminal claims cannot be resolved again.
        let again = resolve_claim(
            &game,
            &ResolveClaimRequest {
                claim_id: claim.claim.id,
                accept: true,
            },
        );
        assert_eq!(again.unwrap_err().0, StatusCode::CONFLICT);
    }

    #[test]
    fn test_new_game_resets_state() {
        let (game, _) = registered_game();
        call(&game).unwrap();
        let old_id = game.id();

        let response = new_game(&game).unwrap();
        assert_ne!(response.game_id, old_id);
        assert!(!response.components.is_empty());
        assert_eq!(status(&game).called, 0);
        assert_eq!(status(&game).players, 0);
    }

    #[test]
    fn test_set_pattern_changes_active_pattern() {
        let game = Game::new();
        let response = set_pattern(
            &game,
            &SetPatternRequest {
                pattern: WinPattern::FullHouse,
            },
        )
        .unwrap();
        assert_eq!(response.pattern, WinPattern::FullHouse);
        assert_eq!(game.active_pattern(), WinPattern::FullHouse);
    }
}
