// src/claims.rs
// Claim lifecycle and the ranking the caller uses to adjudicate claims.

use crate::defs::Number;
use crate::score::{WinPattern, evaluate};
use crate::ticket::Ticket;

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Valid,
    Rejected,
}

/// A player's bingo assertion at a point in the call history. Terminal once
/// resolved by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub serial: String,
    pub pattern: WinPattern,
    pub calls_at_claim: usize,
    pub claimed_at: SystemTime,
    pub status: ClaimStatus,
}

impl Claim {
    pub fn new(id: String, serial: String, pattern: WinPattern, calls_at_claim: usize) -> Self {
        Claim {
            id,
            serial,
            pattern,
            calls_at_claim,
            claimed_at: SystemTime::now(),
            status: ClaimStatus::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status != ClaimStatus::Pending
    }
}

/// One ticket's standing in an adjudication pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTicket {
    pub serial: String,
    pub matched_numbers: usize,
    pub percent_matched: f32,
    pub is_valid: bool,
    pub missed_by: usize,
}

// Pattern validity for a ticket: row completion on the decoded grid, except
// full house which requires every printed number to have been called.
fn pattern_valid(ticket: &Ticket, called: &[Number], pattern: WinPattern) -> bool {
    match pattern {
        WinPattern::FullHouse => {
            !ticket.numbers.is_empty() && ticket.numbers.iter().all(|n| called.contains(n))
        }
        _ => evaluate(&ticket.grid(), called, pattern).is_winner,
    }
}

// How many calls ago the ticket first qualified: shrink the history one
// call at a time until validity is lost. 0 means it became valid on the
// very last call.
fn missed_by(ticket: &Ticket, called: &[Number], pattern: WinPattern) -> usize {
    let mut prefix = called.len();
    while prefix > 0 && pattern_valid(ticket, &called[..prefix - 1], pattern) {
        prefix -= 1;
    }
    called.len() - prefix
}

/// Rank claiming tickets against the call history for a pattern.
///
/// Perfect claims (valid, became valid on the last call) sort first, then
/// missed claims, then invalid tickets, tie-broken by raw matched-number
/// count descending. Equal keys keep input order.
pub fn rank(tickets: &[Ticket], called: &[Number], pattern: WinPattern) -> Vec<RankedTicket> {
    let mut ranked: Vec<RankedTicket> = tickets
        .iter()
        .map(|ticket| {
            let matched_numbers = ticket.numbers.iter().filter(|n| called.contains(n)).count();
            let percent_matched = if ticket.numbers.is_empty() {
                0.0
            } else {
                matched_numbers as f32 * 100.0 / ticket.numbers.len() as f32
            };
            let is_valid = pattern_valid(ticket, called, pattern);
            let missed_by = if is_valid {
                missed_by(ticket, called, pattern)
            } else {
                0
            };
            RankedTicket {
                serial: ticket.serial.clone(),
                matched_numbers,
                percent_matched,
                is_valid,
                missed_by,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        rank_class(a)
            .cmp(&rank_class(b))
            .then(b.matched_numbers.cmp(&a.matched_numbers))
    });

    ranked
}

fn rank_class(ticket: &RankedTicket) -> u8 {
    if ticket.is_valid && ticket.missed_by == 0 {
        0
    } else if ticket.is_valid {
        1
    } else {
        2
    }
}

/// Tickets that qualified on the very last call.
pub fn valid_tickets(ranked: &[RankedTicket]) -> Vec<&RankedTicket> {
    ranked
        .iter()
        .filter(|t| t.is_valid && t.missed_by == 0)
        .collect()
}

/// Tickets that qualified earlier in the history and claimed late.
pub fn missed_claims(ranked: &[RankedTicket]) -> Vec<&RankedTicket> {
    ranked
        .iter()
        .filter(|t| t.is_valid && t.missed_by > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::empty_grid;

    // Ticket whose first row is the given 5 numbers; other rows are filled
    // from high buckets that the tests never call.
    fn ticket_with_row(row: [Number; 5], filler_base: Number) -> Ticket {
        let mut grid = empty_grid();
        for (idx, number) in row.into_iter().enumerate() {
            grid[0][idx] = Some(number);
        }
        for (idx, offset) in [0u8, 1, 2, 3, 4].into_iter().enumerate() {
            grid[1][idx] = Some(filler_base + offset);
            grid[2][idx + 4] = Some(filler_base + 5 + offset);
        }
        Ticket::from_grid(&grid, 0, 0)
    }

    #[test]
    fn test_perfect_claim_ranks_before_missed_claim() {
        // A completes on the last call; B completed two calls earlier.
        let ticket_a = ticket_with_row([1, 2, 3, 4, 5], 60);
        let ticket_b = ticket_with_row([11, 12, 13, 14, 15], 71);
        let called = [11, 12, 13, 14, 15, 40, 41, 1, 2, 3, 4, 5];

        let ranked = rank(
            &[ticket_b.clone(), ticket_a.clone()],
            &called,
            WinPattern::OneLine,
        );

        assert_eq!(ranked[0].serial, ticket_a.serial);
        assert_eq!(ranked[0].missed_by, 0);
        assert_eq!(ranked[1].serial, ticket_b.serial);
        assert_eq!(ranked[1].missed_by, 7);

        let valid = valid_tickets(&ranked);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].serial, ticket_a.serial);

        let missed = missed_claims(&ranked);
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].serial, ticket_b.serial);
    }

    #[test]
    fn test_missed_by_counts_calls_since_completion() {
        let ticket = ticket_with_row([1, 2, 3, 4, 5], 60);
        // Line completed, then calling continued for 3 numbers.
        let called = [1, 2, 3, 4, 5, 20, 21, 22];

        let ranked = rank(&[ticket], &called, WinPattern::OneLine);
        assert!(ranked[0].is_valid);
        assert_eq!(ranked[0].missed_by, 3);
    }

    #[test]
    fn test_claim_on_the_winning_call_has_missed_by_zero() {
        let ticket = ticket_with_row([1, 2, 3, 4, 5], 60);
        let called = [9, 1, 2, 3, 4, 5];

        let ranked = rank(&[ticket], &called, WinPattern::OneLine);
        assert!(ranked[0].is_valid);
        assert_eq!(ranked[0].missed_by, 0);
    }

    #[test]
    fn test_invalid_tickets_rank_last_and_join_neither_partition() {
        let winner = ticket_with_row([1, 2, 3, 4, 5], 60);
        let loser = ticket_with_row([31, 32, 33, 34, 35], 71);
        let called = [1, 2, 3, 4, 5, 31, 32];

        let ranked = rank(&[loser.clone(), winner.clone()], &called, WinPattern::OneLine);
        assert_eq!(ranked[0].serial, winner.serial);
        assert_eq!(ranked[1].serial, loser.serial);
        assert!(!ranked[1].is_valid);

        assert_eq!(valid_tickets(&ranked).len(), 1);
        assert!(missed_claims(&ranked).is_empty());
    }

    #[test]
    fn test_tie_break_by_matched_numbers_descending() {
        let two_matched = ticket_with_row([31, 32, 41, 42, 43], 61);
        let four_matched = ticket_with_row([1, 2, 3, 4, 55], 71);
        let called = [1, 2, 3, 4, 31, 32];

        let ranked = rank(
            &[two_matched.clone(), four_matched.clone()],
            &called,
            WinPattern::OneLine,
        );
        // Both invalid: more matched numbers first.
        assert_eq!(ranked[0].serial, four_matched.serial);
        assert_eq!(ranked[0].matched_numbers, 4);
        assert_eq!(ranked[1].matched_numbers, 2);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let first = ticket_with_row([1, 11, 21, 31, 41], 61);
        let second = ticket_with_row([2, 12, 22, 32, 42], 71);
        let called = [1, 2];

        let ranked = rank(&[first.clone(), second.clone()], &called, WinPattern::OneLine);
        assert_eq!(ranked[0].serial, first.serial);
        assert_eq!(ranked[1].serial, second.serial);
    }

    #[test]
    fn test_full_house_requires_every_number() {
        let ticket = ticket_with_row([1, 2, 3, 4, 5], 60);
        let mut called: Vec<Number> = ticket.numbers.clone();
        called.pop();

        let ranked = rank(&[ticket.clone()], &called, WinPattern::FullHouse);
        assert!(!ranked[0].is_valid);

        called.extend(ticket.numbers.iter().rev().take(1));
        let ranked = rank(&[ticket], &called, WinPattern::FullHouse);
        assert!(ranked[0].is_valid);
        assert_eq!(ranked[0].missed_by, 0);
    }

    #[test]
    fn test_empty_inputs_never_panic() {
        assert!(rank(&[], &[1, 2, 3], WinPattern::OneLine).is_empty());

        let ticket = ticket_with_row([1, 2, 3, 4, 5], 60);
        let ranked = rank(&[ticket], &[], WinPattern::OneLine);
        assert_eq!(ranked.len(), 1);
        assert!(!ranked[0].is_valid);
        assert_eq!(ranked[0].matched_numbers, 0);
    }

    #[test]
    fn test_claim_lifecycle() {
        let claim = Claim::new("claim_1".into(), "ABCD".into(), WinPattern::OneLine, 12);
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert!(!claim.is_resolved());

        let mut resolved = claim.clone();
        resolved.status = ClaimStatus::Valid;
        assert!(resolved.is_resolved());
    }
}
