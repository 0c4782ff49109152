// src/game.rs
// Unified Game struct holding all shared game state behind coordinated
// mutexes, plus the call/claim operations the hub exposes.

use crate::calls::CallBoard;
use crate::card::TicketGenerator;
use crate::claims::{Claim, ClaimStatus, RankedTicket, rank};
use crate::defs::Number;
use crate::events::{EventBus, GameEvent};
use crate::pouch::Pouch;
use crate::registry::{PlayerInfo, PlayerRegistry};
use crate::score::{Evaluation, WinPattern, evaluate};
use crate::ticket::Ticket;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Single point of access for all game state. Cloning is cheap and every
/// clone shares the same underlying components.
#[derive(Clone)]
pub struct Game {
    id: Arc<Mutex<String>>,
    created_at: Arc<Mutex<SystemTime>>,
    pouch: Arc<Mutex<Pouch>>,
    calls: Arc<Mutex<CallBoard>>,
    registry: Arc<Mutex<PlayerRegistry>>,
    claims: Arc<Mutex<Vec<Claim>>>,
    pattern: Arc<Mutex<WinPattern>>,
    generator: TicketGenerator,
    events: EventBus,
}

fn new_game_id() -> String {
    let mut rng = rand::rng();
    format!("game_{:08x}", rng.random::<u32>())
}

impl Game {
    pub fn new() -> Self {
        Self {
            id: Arc::new(Mutex::new(new_game_id())),
            created_at: Arc::new(Mutex::new(SystemTime::now())),
            pouch: Arc::new(Mutex::new(Pouch::new())),
            calls: Arc::new(Mutex::new(CallBoard::new())),
            registry: Arc::new(Mutex::new(PlayerRegistry::new())),
            claims: Arc::new(Mutex::new(Vec::new())),
            pattern: Arc::new(Mutex::new(WinPattern::OneLine)),
            generator: TicketGenerator::new(),
            events: EventBus::default(),
        }
    }

    pub fn id(&self) -> String {
        match self.id.lock() {
            Ok(id) => id.clone(),
            Err(_) => String::new(),
        }
    }

    pub fn created_at(&self) -> SystemTime {
        match self.created_at.lock() {
            Ok(created_at) => *created_at,
            Err(_) => SystemTime::now(),
        }
    }

    pub fn created_at_string(&self) -> String {
        match self.created_at().duration_since(std::time::UNIX_EPOCH) {
            Ok(duration) => {
                let datetime: DateTime<Utc> = DateTime::from_timestamp(duration.as_secs() as i64, 0)
                    .unwrap_or_else(Utc::now);
                datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
            }
            Err(_) => "Unknown time".to_string(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ---- calling -------------------------------------------------------

    /// Draw the next number and append it to the call history.
    pub fn call_number(&self) -> Result<(Number, usize), String> {
        if self.is_game_over() {
            return Err("Game is over".to_string());
        }

        let number = {
            let mut pouch = self
                .pouch
                .lock()
                .map_err(|_| "Failed to lock pouch".to_string())?;
            pouch.draw().ok_or_else(|| "Pouch is empty".to_string())?
        };

        let total_called = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| "Failed to lock call board".to_string())?;
            if !calls.record(number) {
                return Err(format!("Number {number} was already called"));
            }
            calls.len()
        };

        self.events.publish(GameEvent::NumberCalled {
            number,
            total_called,
        });

        Ok((number, total_called))
    }

    pub fn called_numbers(&self) -> Vec<Number> {
        match self.calls.lock() {
            Ok(calls) => calls.numbers().to_vec(),
            Err(_) => Vec::new(),
        }
    }

    pub fn last_called(&self) -> Option<Number> {
        self.calls.lock().ok().and_then(|calls| calls.last_called())
    }

    pub fn calls_len(&self) -> usize {
        match self.calls.lock() {
            Ok(calls) => calls.len(),
            Err(_) => 0,
        }
    }

    pub fn pouch_len(&self) -> usize {
        match self.pouch.lock() {
            Ok(pouch) => pouch.len(),
            Err(_) => 0,
        }
    }

    pub fn has_game_started(&self) -> bool {
        self.calls_len() > 0
    }

    // ---- pattern -------------------------------------------------------

    pub fn active_pattern(&self) -> WinPattern {
        match self.pattern.lock() {
            Ok(pattern) => *pattern,
            Err(_) => WinPattern::OneLine,
        }
    }

    pub fn set_pattern(&self, pattern: WinPattern) -> Result<(), String> {
        {
            let mut active = self
                .pattern
                .lock()
                .map_err(|_| "Failed to lock pattern".to_string())?;
            if *active == pattern {
                return Ok(());
            }
            *active = pattern;
        }
        self.events.publish(GameEvent::PatternChanged { pattern });
        Ok(())
    }

    // ---- players and tickets -------------------------------------------

    pub fn register_player(&self, name: &str) -> Result<PlayerInfo, String> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| "Failed to lock player registry".to_string())?;
        Ok(registry.register(name))
    }

    pub fn issue_strips(&self, player_id: &str, strips: u32) -> Result<Vec<Ticket>, String> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| "Failed to lock player registry".to_string())?;

        let mut issued = Vec::new();
        for _ in 0..strips {
            issued.extend(registry.issue_strip(player_id, &self.generator)?);
        }
        Ok(issued)
    }

    pub fn ticket(&self, serial: &str) -> Option<Ticket> {
        self.registry
            .lock()
            .ok()
            .and_then(|registry| registry.ticket(serial).cloned())
    }

    pub fn player(&self, player_id: &str) -> Option<PlayerInfo> {
        self.registry
            .lock()
            .ok()
            .and_then(|registry| registry.player(player_id).cloned())
    }

    pub fn player_count(&self) -> usize {
        match self.registry.lock() {
            Ok(registry) => registry.player_count(),
            Err(_) => 0,
        }
    }

    /// A player's tickets with live progress against the active pattern.
    pub fn player_progress(&self, player_id: &str) -> Result<Vec<(Ticket, Evaluation)>, String> {
        let pattern = self.active_pattern();
        let called = self.called_numbers();
        let registry = self
            .registry
            .lock()
            .map_err(|_| "Failed to lock player registry".to_string())?;

        Ok(registry
            .tickets_for(player_id)
            .into_iter()
            .map(|ticket| {
                let evaluation = evaluate(&ticket.grid(), &called, pattern);
                (ticket.clone(), evaluation)
            })
            .collect())
    }

    // ---- claims --------------------------------------------------------

    pub fn submit_claim(&self, serial: &str, pattern: WinPattern) -> Result<Claim, String> {
        if !self.has_game_started() {
            return Err("No numbers have been called yet".to_string());
        }
        if self.ticket(serial).is_none() {
            return Err(format!("Unknown ticket serial: {serial}"));
        }

        let claim = {
            let mut claims = self
                .claims
                .lock()
                .map_err(|_| "Failed to lock claims".to_string())?;

            let duplicate = claims.iter().any(|c| {
                c.serial == serial && c.pattern == pattern && c.status == ClaimStatus::Pending
            });
            if duplicate {
                return Err(format!("Claim already pending for ticket {serial}"));
            }

            let mut rng = rand::rng();
            let claim = Claim::new(
                format!("claim_{:08x}", rng.random::<u32>()),
                serial.to_string(),
                pattern,
                self.calls_len(),
            );
            claims.push(claim.clone());
            claim
        };

        self.events.publish(GameEvent::ClaimSubmitted {
            claim_id: claim.id.clone(),
            serial: claim.serial.clone(),
            pattern: claim.pattern,
        });

        Ok(claim)
    }

    pub fn claims(&self) -> Vec<Claim> {
        match self.claims.lock() {
            Ok(claims) => claims.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn pending_claims(&self) -> Vec<Claim> {
        self.claims()
            .into_iter()
            .filter(|c| c.status == ClaimStatus::Pending)
            .collect()
    }

    /// Adjudication view: pending claims for the pattern, ranked with the
    /// claim ranker against the full call history.
    pub fn ranked_claims(&self, pattern: WinPattern) -> Result<Vec<(Claim, RankedTicket)>, String> {
        let pending: Vec<Claim> = self
            .pending_claims()
            .into_iter()
            .filter(|c| c.pattern == pattern)
            .collect();

        let tickets: Vec<Ticket> = {
            let registry = self
                .registry
                .lock()
                .map_err(|_| "Failed to lock player registry".to_string())?;
            pending
                .iter()
                .filter_map(|claim| registry.ticket(&claim.serial).cloned())
                .collect()
        };

        let called = self.called_numbers();
        let ranked = rank(&tickets, &called, pattern);

        // Re-associate ranked entries with their claims by serial.
        Ok(ranked
            .into_iter()
            .filter_map(|entry| {
                pending
                    .iter()
                    .find(|claim| claim.serial == entry.serial)
                    .cloned()
                    .map(|claim| (claim, entry))
            })
            .collect())
    }

    pub fn resolve_claim(&self, claim_id: &str, accept: bool) -> Result<ClaimStatus, String> {
        let status = {
            let mut claims = self
                .claims
                .lock()
                .map_err(|_| "Failed to lock claims".to_string())?;
            let claim = claims
                .iter_mut()
                .find(|c| c.id == claim_id)
                .ok_or_else(|| format!("Unknown claim id: {claim_id}"))?;

            if claim.is_resolved() {
                return Err(format!("Claim {claim_id} is already resolved"));
            }
            claim.status = if accept {
                ClaimStatus::Valid
            } else {
                ClaimStatus::Rejected
            };
            claim.status
        };

        self.events.publish(GameEvent::ClaimResolved {
            claim_id: claim_id.to_string(),
            status,
        });

        Ok(status)
    }

    // ---- lifecycle -----------------------------------------------------

    /// The game ends when a full-house claim has been accepted or the pouch
    /// runs dry.
    pub fn is_game_over(&self) -> bool {
        let full_house_won = self.claims().iter().any(|claim| {
            claim.pattern == WinPattern::FullHouse && claim.status == ClaimStatus::Valid
        });
        full_house_won || self.pouch_len() == 0
    }

    /// Reset all state for a fresh game, in a fixed component order.
    pub fn reset_game(&self) -> Result<Vec<String>, Vec<String>> {
        let mut reset_components = Vec::new();
        let mut errors = Vec::new();

        let new_id = new_game_id();
        if let Ok(mut id) = self.id.lock() {
            *id = new_id.clone();
        } else {
            errors.push("Failed to lock game ID for reset".to_string());
        }
        if let Ok(mut created_at) = self.created_at.lock() {
            *created_at = SystemTime::now();
        } else {
            errors.push("Failed to lock creation time for reset".to_string());
        }
        reset_components.push(format!("New game ID generated: {new_id}"));

        // Fixed order: pouch -> calls -> registry -> claims -> pattern.
        if let Ok(mut pouch) = self.pouch.lock() {
            *pouch = Pouch::new();
            reset_components.push("Pouch reshuffled with numbers 1-90".to_string());
        } else {
            errors.push("Failed to lock pouch for reset".to_string());
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.reset();
            reset_components.push("Call history cleared".to_string());
        } else {
            errors.push("Failed to lock call board for reset".to_string());
        }

        if let Ok(mut registry) = self.registry.lock() {
            *registry = PlayerRegistry::new();
            reset_components.push("Player registry cleared".to_string());
        } else {
            errors.push("Failed to lock player registry for reset".to_string());
        }

        if let Ok(mut claims) = self.claims.lock() {
            claims.clear();
            reset_components.push("Claims cleared".to_string());
        } else {
            errors.push("Failed to lock claims for reset".to_string());
        }

        if let Ok(mut pattern) = self.pattern.lock() {
            *pattern = WinPattern::OneLine;
            reset_components.push("Pattern reset to one line".to_string());
        } else {
            errors.push("Failed to lock pattern for reset".to_string());
        }

        if errors.is_empty() {
            self.events.publish(GameEvent::GameReset { game_id: new_id });
            Ok(reset_components)
        } else {
            Err(errors)
        }
    }

    pub fn game_info(&self) -> String {
        format!(
            "Game[id={}, created={}, called={}, pouch={}, pattern={}, players={}, claims={}]",
            self.id(),
            self.created_at_string(),
            self.calls_len(),
            self.pouch_len(),
            self.active_pattern(),
            self.player_count(),
            self.claims().len()
        )
    }

    // ---- dump ----------------------------------------------------------

    fn create_serializable_state(&self) -> Result<SerializableGameState, String> {
        let pouch = self
            .pouch
            .lock()
            .map_err(|_| "Failed to lock pouch")?
            .clone();
        let calls = self
            .calls
            .lock()
            .map_err(|_| "Failed to lock call board")?
            .clone();
        let registry = self
            .registry
            .lock()
            .map_err(|_| "Failed to lock player registry")?
            .clone();
        let claims = self
            .claims
            .lock()
            .map_err(|_| "Failed to lock claims")?
            .clone();

        Ok(SerializableGameState {
            id: self.id(),
            created_at: self.created_at(),
            pattern: self.active_pattern(),
            pouch,
            calls,
            registry,
            claims,
            game_ended_at: SystemTime::now(),
        })
    }

    /// Dump the complete game state to data/games/<id>.json.
    pub fn dump_to_json(&self) -> Result<String, String> {
        use std::fs;
        use std::path::Path;

        let state = self.create_serializable_state()?;
        let filename = format!("{}.json", self.id());
        let filepath = Path::new("data/games").join(&filename);

        if let Some(parent) = filepath.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create directory {parent:?}: {e}"))?;
        }

        let json_content = serde_json::to_string_pretty(&state)
            .map_err(|e| format!("Failed to serialize game state: {e}"))?;
        fs::write(&filepath, json_content)
            .map_err(|e| format!("Failed to write file {filepath:?}: {e}"))?;

        Ok(format!("Game dumped to: {}", filepath.display()))
    }

    pub fn dump_if_ended(&self) -> Result<String, String> {
        if self.is_game_over() {
            self.dump_to_json()
        } else {
            Err("Game has not ended yet".to_string())
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot for the end-of-game JSON dump.
#[derive(Serialize, Deserialize)]
pub struct SerializableGameState {
    pub id: String,
    pub created_at: SystemTime,
    pub pattern: WinPattern,
    pub pouch: Pouch,
    pub calls: CallBoard,
    pub registry: PlayerRegistry,
    pub claims: Vec<Claim>,
    pub game_ended_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{LASTNUMBER, TICKETSPERSTRIP};

    #[test]
    fn test_new_game_initial_state() {
        let game = Game::new();
        assert_eq!(game.calls_len(), 0);
        assert_eq!(game.pouch_len(), LASTNUMBER as usize);
        assert!(!game.has_game_started());
        assert!(!game.is_game_over());
        assert_eq!(game.active_pattern(), WinPattern::OneLine);
        assert!(game.id().starts_with("game_"));
        assert_eq!(game.id().len(), 13);
    }

    #[test]
    fn test_call_number_moves_pouch_to_history() {
        let game = Game::new();
        let (number, total_called) = game.call_number().unwrap();
        assert_eq!(total_called, 1);
        assert_eq!(game.pouch_len(), LASTNUMBER as usize - 1);
        assert_eq!(game.called_numbers(), vec![number]);
        assert_eq!(game.last_called(), Some(number));
        assert!(game.has_game_started());
    }

    #[test]
    fn test_calling_every_number_ends_the_game() {
        let game = Game::new();
        for _ in 0..LASTNUMBER {
            game.call_number().unwrap();
        }
        assert_eq!(game.calls_len(), LASTNUMBER as usize);
        assert!(game.is_game_over());
        assert!(game.call_number().is_err());
    }

    #[test]
    fn test_register_and_issue_strips() {
        let game = Game::new();
        let player = game.register_player("alice").unwrap();
        let tickets = game.issue_strips(&player.player_id, 2).unwrap();
        assert_eq!(tickets.len(), 2 * TICKETSPERSTRIP as usize);

        let progress = game.player_progress(&player.player_id).unwrap();
        assert_eq!(progress.len(), tickets.len());
        for (_, evaluation) in progress {
            assert!(!evaluation.is_winner);
            assert!(evaluation.to_go >= 1);
        }
    }

    #[test]
    fn test_claim_flow() {
        let game = Game::new();
        let player = game.register_player("alice").unwrap();
        let tickets = game.issue_strips(&player.player_id, 1).unwrap();
        let serial = tickets[0].serial.clone();

        // No calls yet: claims are refused.
        assert!(game.submit_claim(&serial, WinPattern::OneLine).is_err());

        game.call_number().unwrap();
        let claim = game.submit_claim(&serial, WinPattern::OneLine).unwrap();
        assert_eq!(claim.status, ClaimStatus::Pending);

        // Same ticket, same pattern, still pending: refused.
        assert!(game.submit_claim(&serial, WinPattern::OneLine).is_err());

        let ranked = game.ranked_claims(WinPattern::OneLine).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0.id, claim.id);

        let status = game.resolve_claim(&claim.id, false).unwrap();
        assert_eq!(status, ClaimStatus::Rejected);
        assert!(game.resolve_claim(&claim.id, true).is_err());
        assert!(game.pending_claims().is_empty());
    }

    #[test]
    fn test_unknown_serial_claim_is_refused() {
        let game = Game::new();
        game.call_number().unwrap();
        assert!(game.submit_claim("DEADBEEF00000000", WinPattern::OneLine).is_err());
    }

    #[test]
    fn test_accepted_full_house_ends_the_game() {
        let game = Game::new();
        let player = game.register_player("alice").unwrap();
        let tickets = game.issue_strips(&player.player_id, 1).unwrap();
        let serial = tickets[0].serial.clone();

        game.call_number().unwrap();
        let claim = game.submit_claim(&serial, WinPattern::FullHouse).unwrap();
        game.resolve_claim(&claim.id, true).unwrap();

        assert!(game.is_game_over());
        assert!(game.call_number().is_err());
    }

    #[test]
    fn test_set_pattern_publishes_once() {
        let game = Game::new();
        let mut events = game.events().subscribe();

        game.set_pattern(WinPattern::TwoLines).unwrap();
        game.set_pattern(WinPattern::TwoLines).unwrap();
        assert_eq!(game.active_pattern(), WinPattern::TwoLines);

        assert_eq!(
            events.try_recv().unwrap(),
            GameEvent::PatternChanged {
                pattern: WinPattern::TwoLines
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_reset_game_clears_everything() {
        let game = Game::new();
        let original_id = game.id();
        let player = game.register_player("alice").unwrap();
        game.issue_strips(&player.player_id, 1).unwrap();
        game.call_number().unwrap();
        game.set_pattern(WinPattern::FullHouse).unwrap();

        let result = game.reset_game();
        assert!(result.is_ok());
        let components = result.unwrap();
        assert!(components.contains(&"Pouch reshuffled with numbers 1-90".to_string()));
        assert!(components.contains(&"Call history cleared".to_string()));
        assert!(components.contains(&"Player registry cleared".to_string()));

        assert_ne!(game.id(), original_id);
        assert_eq!(game.calls_len(), 0);
        assert_eq!(game.pouch_len(), LASTNUMBER as usize);
        assert_eq!(game.player_count(), 0);
        assert_eq!(game.active_pattern(), WinPattern::OneLine);
        assert!(!game.is_game_over());
    }

    #[test]
    fn test_call_events_are_published() {
        let game = Game::new();
        let mut events = game.events().subscribe();

        let (number, _) = game.call_number().unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            GameEvent::NumberCalled {
                number,
                total_called: 1
            }
        );
    }

    #[test]
    fn test_dump_if_ended_refuses_running_game() {
        let game = Game::new();
        let result = game.dump_if_ended();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("has not ended"));
    }
}
