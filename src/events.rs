// src/events.rs
// Typed publish/subscribe seam between the game state and its consumers.

use crate::claims::ClaimStatus;
use crate::defs::Number;
use crate::score::WinPattern;

use tokio::sync::broadcast;

/// Everything the game announces to transports and UIs. The evaluation
/// core never publishes; only the `Game` layer does.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    NumberCalled {
        number: Number,
        total_called: usize,
    },
    PatternChanged {
        pattern: WinPattern,
    },
    ClaimSubmitted {
        claim_id: String,
        serial: String,
        pattern: WinPattern,
    },
    ClaimResolved {
        claim_id: String,
        status: ClaimStatus,
    },
    GameReset {
        game_id: String,
    },
}

/// Broadcast bus handed to whichever layer wants game notifications.
/// Subscribers that fall behind lose the oldest events, which is acceptable
/// for UI refresh triggers; the authoritative state stays in `Game`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
