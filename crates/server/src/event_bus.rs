//! Pending broadcasts emitted outside the session loops.
//!
//! The world and out-of-band emitters (commands, physics) push packets here
//! instead of touching the session registry. The server tick drains the whole
//! queue atomically and fans each entry out to live sessions, so emitters
//! never hold the registry lock and never nest it with the world lock.

use std::sync::Mutex;

use crate::player_registry::PlayerId;
use crate::protocol::Outbound;

/// One queued packet plus the player (if any) that must not receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub packet: Outbound,
    pub exclude: Option<PlayerId>,
}

#[derive(Default)]
pub struct BroadcastQueue {
    pending: Mutex<Vec<Broadcast>>,
}

impl BroadcastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a packet for every live session.
    pub fn push(&self, packet: Outbound) {
        self.enqueue(Broadcast {
            packet,
            exclude: None,
        });
    }

    /// Queue a packet for every live session except `player`.
    pub fn push_except(&self, packet: Outbound, player: PlayerId) {
        self.enqueue(Broadcast {
            packet,
            exclude: Some(player),
        });
    }

    fn enqueue(&self, entry: Broadcast) {
        self.pending
            .lock()
            .expect("broadcast queue poisoned")
            .push(entry);
    }

    /// Take everything queued so far, in emission order.
    pub fn drain(&self) -> Vec<Broadcast> {
        std::mem::take(&mut *self.pending.lock().expect("broadcast queue poisoned"))
    }

    pub fn len(&self) -> usize {
        self.pending.lock().expect("broadcast queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
