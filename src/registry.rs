// src/registry.rs
// Player registration and ticket issuance for a running game.

use crate::card::TicketGenerator;
use crate::defs::CALLER_ID;
use crate::ticket::Ticket;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: String,
    pub name: String,
    pub joined_at: SystemTime,
    pub serials: Vec<String>,
}

/// Registered players plus every ticket issued in the current game, keyed
/// by serial. Registering the same name twice returns the existing player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRegistry {
    players: HashMap<String, PlayerInfo>,
    tickets: HashMap<String, Ticket>,
    next_perm: u32,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str) -> PlayerInfo {
        if let Some(existing) = self.find_by_name(name) {
            return existing.clone();
        }

        let mut rng = rand::rng();
        let mut player_id = format!("{:016X}", rng.random::<u64>());
        while player_id == CALLER_ID || self.players.contains_key(&player_id) {
            player_id = format!("{:016X}", rng.random::<u64>());
        }

        let info = PlayerInfo {
            player_id: player_id.clone(),
            name: name.to_string(),
            joined_at: SystemTime::now(),
            serials: Vec::new(),
        };
        self.players.insert(player_id, info.clone());
        info
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PlayerInfo> {
        self.players.values().find(|p| p.name == name)
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerInfo> {
        self.players.get(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Issue a full strip to a player. Serials are deduplicated against
    /// every ticket already issued this game.
    pub fn issue_strip(
        &mut self,
        player_id: &str,
        generator: &TicketGenerator,
    ) -> Result<Vec<Ticket>, String> {
        if !self.players.contains_key(player_id) {
            return Err(format!("Unknown player id: {player_id}"));
        }

        let perm = self.next_perm;
        self.next_perm += 1;

        let mut strip = generator.generate_strip(perm);
        // Collisions against earlier strips are resolved per ticket.
        for ticket in &mut strip {
            while self.tickets.contains_key(&ticket.serial) {
                *ticket = generator.generate_ticket(ticket.perm, ticket.position);
            }
            self.tickets.insert(ticket.serial.clone(), ticket.clone());
        }

        if let Some(player) = self.players.get_mut(player_id) {
            player
                .serials
                .extend(strip.iter().map(|t| t.serial.clone()));
        }

        Ok(strip)
    }

    pub fn ticket(&self, serial: &str) -> Option<&Ticket> {
        self.tickets.get(serial)
    }

    pub fn tickets_for(&self, player_id: &str) -> Vec<&Ticket> {
        match self.players.get(player_id) {
            Some(player) => player
                .serials
                .iter()
                .filter_map(|serial| self.tickets.get(serial))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn owner_of(&self, serial: &str) -> Option<&PlayerInfo> {
        self.players
            .values()
            .find(|p| p.serials.iter().any(|s| s == serial))
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::TICKETSPERSTRIP;

    #[test]
    fn test_register_returns_same_player_for_same_name() {
        let mut registry = PlayerRegistry::new();
        let first = registry.register("alice");
        let second = registry.register("alice");
        assert_eq!(first.player_id, second.player_id);
        assert_eq!(registry.player_count(), 1);

        let other = registry.register("bob");
        assert_ne!(first.player_id, other.player_id);
        assert_eq!(registry.player_count(), 2);
    }

    #[test]
    fn test_issue_strip_assigns_tickets_to_player() {
        let mut registry = PlayerRegistry::new();
        let generator = TicketGenerator::new();
        let player = registry.register("alice");

        let strip = registry.issue_strip(&player.player_id, &generator).unwrap();
        assert_eq!(strip.len(), TICKETSPERSTRIP as usize);
        assert_eq!(registry.ticket_count(), TICKETSPERSTRIP as usize);

        let held = registry.tickets_for(&player.player_id);
        assert_eq!(held.len(), TICKETSPERSTRIP as usize);

        for ticket in &strip {
            assert_eq!(
                registry.owner_of(&ticket.serial).unwrap().player_id,
                player.player_id
            );
            assert_eq!(registry.ticket(&ticket.serial).unwrap().serial, ticket.serial);
        }
    }

    #[test]
    fn test_issue_strip_rejects_unknown_player() {
        let mut registry = PlayerRegistry::new();
        let generator = TicketGenerator::new();
        assert!(registry.issue_strip("FFFFFFFFFFFFFFFF", &generator).is_err());
    }

    #[test]
    fn test_strips_get_distinct_perms() {
        let mut registry = PlayerRegistry::new();
        let generator = TicketGenerator::new();
        let player = registry.register("alice");

        let first = registry.issue_strip(&player.player_id, &generator).unwrap();
        let second = registry.issue_strip(&player.player_id, &generator).unwrap();
        assert_ne!(first[0].perm, second[0].perm);
        assert_eq!(
            registry.tickets_for(&player.player_id).len(),
            2 * TICKETSPERSTRIP as usize
        );
    }
}
