//! Registry of live sessions.
//!
//! Tracks every connected session by player id, allocates ids, enforces
//! unique names, and fans broadcasts out to each session's own outbound
//! queue.
//!
//! Uses a `std::sync::Mutex` because every operation is brief (no awaits
//! while the lock is held). Removal is staged: callers collect ids with
//! [`PlayerRegistry::dead_ids`], then remove them one by one, never while
//! iterating.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::event_bus::Broadcast;
use crate::protocol::Outbound;
use crate::session::{Phase, Player, Session};

/// Highest id handed out. The wire field is a signed byte and -1 means "you".
pub const MAX_PLAYER_ID: u8 = 127;

/// Wire-level player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The id as it appears in packets.
    pub fn wire(self) -> i8 {
        self.0 as i8
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct SessionEntry {
    session: Arc<Session>,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    sessions: BTreeMap<PlayerId, SessionEntry>,
    /// Last id handed out; allocation continues after it and wraps.
    cursor: u8,
}

/// Why [`PlayerRegistry::claim_name`] refused a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    /// Another live session already uses the name.
    Duplicate,
    /// The session was removed before it could claim anything.
    Gone,
}

pub struct PlayerRegistry {
    inner: Mutex<Inner>,
    capacity: u8,
}

impl PlayerRegistry {
    /// A registry handing out ids `1..=min(max_players, 127)`.
    pub fn new(max_players: usize) -> Self {
        let capacity = max_players.clamp(1, MAX_PLAYER_ID as usize) as u8;
        Self {
            inner: Mutex::new(Inner {
                sessions: BTreeMap::new(),
                cursor: 0,
            }),
            capacity,
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("player registry poisoned")
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Allocate the next free id and register a new session for `peer`.
    /// Returns `None` when every id is taken.
    pub fn admit(&self, peer: SocketAddr) -> Option<Arc<Session>> {
        let mut inner = self.inner();
        let (start, cap) = (inner.cursor as u16, self.capacity as u16);
        let id = (0..cap)
            .map(|step| PlayerId(((start + step) % cap) as u8 + 1))
            .find(|id| !inner.sessions.contains_key(id))?;
        inner.cursor = id.0;

        let session = Arc::new(Session::new(id, peer));
        inner.sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                task: None,
            },
        );
        tracing::debug!("admitted {} as {}", peer, id);
        Some(session)
    }

    /// Hand the registry the task serving a session so removal can await it.
    /// If the session is already gone the handle is simply dropped; the task
    /// sees the dead flag and exits on its own.
    pub fn attach_task(&self, id: PlayerId, task: JoinHandle<()>) {
        if let Some(entry) = self.inner().sessions.get_mut(&id) {
            entry.task = Some(task);
        }
    }

    /// Atomically check that no other live session uses `player.name` and
    /// install `player` on the session `id`.
    pub fn claim_name(&self, id: PlayerId, player: Player) -> Result<(), ClaimError> {
        let inner = self.inner();
        let taken = inner.sessions.values().any(|e| {
            e.session.id() != id
                && e.session.is_alive()
                && e.session.name().as_deref() == Some(player.name.as_str())
        });
        if taken {
            return Err(ClaimError::Duplicate);
        }
        let entry = inner.sessions.get(&id).ok_or(ClaimError::Gone)?;
        entry.session.install_player(player);
        Ok(())
    }

    // ── Broadcast ────────────────────────────────────────────────────────

    /// Queue `packet` on every active session except `exclude`. A packet that
    /// describes a particular player (see [`Outbound::origin_player`]) is
    /// never echoed back to that player. Sessions still receiving the level
    /// get the packet deferred until [`activate`](Self::activate).
    pub fn broadcast(&self, packet: &Outbound, exclude: Option<PlayerId>) {
        let origin = packet.origin_player();
        let inner = self.inner();
        for (id, entry) in &inner.sessions {
            if Some(*id) == exclude || origin == Some(id.wire()) {
                continue;
            }
            if entry.session.is_active() {
                entry.session.send(packet.clone());
            } else if entry.session.is_joining() {
                entry.session.defer(packet.clone());
            }
        }
    }

    /// Finish a join in one step: show `spawn` to every active session, show
    /// the joiner every active player, then make the joiner active and flush
    /// what was deferred for it. Returns `false` if the joiner is gone.
    pub fn activate(&self, id: PlayerId, spawn: &Outbound) -> bool {
        let inner = self.inner();
        let Some(joiner) = inner.sessions.get(&id).map(|e| &e.session) else {
            return false;
        };
        if !joiner.is_alive() {
            return false;
        }
        let mut peers = Vec::new();
        for (other, entry) in &inner.sessions {
            if *other == id || !entry.session.is_active() {
                continue;
            }
            entry.session.send(spawn.clone());
            if let Some(player) = entry.session.player() {
                peers.push(player.spawn_packet(other.wire()));
            }
        }
        joiner.send_all(peers);
        joiner.activate();
        true
    }

    /// Fan out one queued broadcast.
    pub fn deliver(&self, broadcast: &Broadcast) {
        self.broadcast(&broadcast.packet, broadcast.exclude);
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    pub fn get(&self, id: PlayerId) -> Option<Arc<Session>> {
        self.inner().sessions.get(&id).map(|e| Arc::clone(&e.session))
    }

    /// The live, joined session using `name`.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<Session>> {
        self.inner()
            .sessions
            .values()
            .find(|e| e.session.is_active() && e.session.name().as_deref() == Some(name))
            .map(|e| Arc::clone(&e.session))
    }

    /// Every registered session, live or not.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.inner()
            .sessions
            .values()
            .map(|e| Arc::clone(&e.session))
            .collect()
    }

    /// Players of all active sessions, by id.
    pub fn active_players(&self) -> Vec<(PlayerId, Player)> {
        self.inner()
            .sessions
            .iter()
            .filter(|(_, e)| e.session.is_active())
            .filter_map(|(id, e)| e.session.player().map(|p| (*id, p)))
            .collect()
    }

    /// Ids of sessions whose alive flag has dropped.
    pub fn dead_ids(&self) -> Vec<PlayerId> {
        self.inner()
            .sessions
            .iter()
            .filter(|(_, e)| !e.session.is_alive())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Unregister a session, freeing its id. Returns the session and, if one
    /// was attached, the task serving it.
    pub fn remove(&self, id: PlayerId) -> Option<(Arc<Session>, Option<JoinHandle<()>>)> {
        let entry = self.inner().sessions.remove(&id)?;
        if entry.session.phase() != Phase::Closed {
            entry.session.set_phase(Phase::Closed);
        }
        Some((entry.session, entry.task))
    }

    pub fn len(&self) -> usize {
        self.inner().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
