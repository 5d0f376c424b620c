//! Per-connection session state.
//!
//! A `Session` is shared between its own I/O task, the registry, and the
//! server tick. The alive flag is the cancellation signal: whoever flips it
//! false, the session task notices on its next interval, flushes what is
//! queued, and exits.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::player_registry::PlayerId;
use crate::protocol::{Orientation, Outbound, Position, USER_TYPE_NORMAL, USER_TYPE_OP};

/// Login progress of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepted; waiting for the identification packet.
    Connecting,
    /// Identification received; checks and level transfer in progress.
    /// Broadcasts are held back from here once a name is claimed.
    Identified,
    /// Fully joined; receives broadcasts.
    Active,
    /// Rejected or kicked; only the final flush remains.
    Disconnecting,
    /// Socket released.
    Closed,
}

/// The player behind a session, known once identification succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub position: Position,
    pub orientation: Orientation,
    pub operator: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, operator: bool) -> Self {
        Self {
            name: name.into(),
            position: Position::default(),
            orientation: Orientation::default(),
            operator,
        }
    }

    /// The packet that shows this player to a client as `player_id`.
    pub fn spawn_packet(&self, player_id: i8) -> Outbound {
        Outbound::SpawnPlayer {
            player_id,
            name: self.name.clone(),
            position: self.position,
            orientation: self.orientation,
        }
    }
}

#[derive(Debug)]
struct State {
    phase: Phase,
    player: Option<Player>,
    joined: bool,
    /// Broadcasts that arrived while the level was being prepared.
    deferred: Vec<Outbound>,
}

pub struct Session {
    id: PlayerId,
    peer: SocketAddr,
    alive: AtomicBool,
    state: Mutex<State>,
    outbound: Mutex<Vec<Outbound>>,
}

impl Session {
    pub fn new(id: PlayerId, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            alive: AtomicBool::new(true),
            state: Mutex::new(State {
                phase: Phase::Connecting,
                player: None,
                joined: false,
                deferred: Vec::new(),
            }),
            outbound: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Stop servicing this session. The registry reaps it on the next tick.
    pub fn mark_dead(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            tracing::debug!("session {} ({}) marked dead", self.id, self.peer);
        }
    }

    // ── Login state ──────────────────────────────────────────────────────

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("session state poisoned")
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn set_phase(&self, phase: Phase) {
        let mut state = self.state();
        if phase == Phase::Active {
            state.joined = true;
        }
        state.phase = phase;
    }

    /// Alive and fully joined: the sessions broadcasts are delivered to.
    pub fn is_active(&self) -> bool {
        self.is_alive() && self.phase() == Phase::Active
    }

    /// Alive, identified, and holding a claimed name, but not yet active.
    /// Broadcasts for such a session are held back until it activates.
    pub fn is_joining(&self) -> bool {
        if !self.is_alive() {
            return false;
        }
        let state = self.state();
        state.phase == Phase::Identified && state.player.is_some()
    }

    /// Hold a broadcast until [`activate`](Self::activate).
    pub(crate) fn defer(&self, packet: Outbound) {
        self.state().deferred.push(packet);
    }

    /// Become active: queue everything deferred during the join, after what
    /// is already queued.
    pub(crate) fn activate(&self) {
        let deferred = {
            let mut state = self.state();
            state.phase = Phase::Active;
            state.joined = true;
            std::mem::take(&mut state.deferred)
        };
        self.send_all(deferred);
    }

    /// Did this session ever complete the join sequence? Leave announcements
    /// are only made for sessions that did.
    pub fn has_joined(&self) -> bool {
        self.state().joined
    }

    pub(crate) fn install_player(&self, player: Player) {
        self.state().player = Some(player);
    }

    pub fn player(&self) -> Option<Player> {
        self.state().player.clone()
    }

    pub fn name(&self) -> Option<String> {
        self.state().player.as_ref().map(|p| p.name.clone())
    }

    pub fn is_operator(&self) -> bool {
        self.state().player.as_ref().is_some_and(|p| p.operator)
    }

    /// Change operator status and tell the client.
    pub fn set_operator(&self, operator: bool) {
        if let Some(player) = self.state().player.as_mut() {
            player.operator = operator;
        }
        let user_type = if operator { USER_TYPE_OP } else { USER_TYPE_NORMAL };
        self.send(Outbound::UpdateUserType { user_type });
    }

    pub fn update_position(&self, position: Position, orientation: Orientation) {
        if let Some(player) = self.state().player.as_mut() {
            player.position = position;
            player.orientation = orientation;
        }
    }

    // ── Outbound queue ───────────────────────────────────────────────────

    /// Queue a packet. Order is preserved; the session task writes the queue
    /// out on its next interval.
    pub fn send(&self, packet: Outbound) {
        self.outbound
            .lock()
            .expect("session outbound poisoned")
            .push(packet);
    }

    pub fn send_all(&self, packets: impl IntoIterator<Item = Outbound>) {
        self.outbound
            .lock()
            .expect("session outbound poisoned")
            .extend(packets);
    }

    /// Take everything queued so far.
    pub fn drain_outbound(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.outbound.lock().expect("session outbound poisoned"))
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.lock().expect("session outbound poisoned").len()
    }

    /// Queue a disconnect with `reason` and stop servicing the session. The
    /// reason still reaches the client in the final flush.
    pub fn kick(&self, reason: &str) {
        tracing::info!("Disconnecting {} ({}): {}", self.id, self.peer, reason);
        self.send(Outbound::Disconnect {
            reason: reason.to_owned(),
        });
        self.set_phase(Phase::Disconnecting);
        self.mark_dead();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(PlayerId(4), "127.0.0.1:5000".parse().unwrap())
    }

    #[test]
    fn kick_queues_reason_and_kills() {
        let s = session();
        s.set_phase(Phase::Active);
        s.kick("&cbye");
        assert!(!s.is_alive());
        assert!(!s.is_active());
        assert!(s.has_joined());
        assert_eq!(
            s.drain_outbound(),
            vec![Outbound::Disconnect {
                reason: "&cbye".into()
            }]
        );
    }

    #[test]
    fn outbound_preserves_order() {
        let s = session();
        s.send(Outbound::Ping);
        s.send_all([Outbound::LevelInitialize, Outbound::Ping]);
        assert_eq!(
            s.drain_outbound(),
            vec![Outbound::Ping, Outbound::LevelInitialize, Outbound::Ping]
        );
        assert_eq!(s.outbound_len(), 0);
    }

    #[test]
    fn set_operator_notifies_client() {
        let s = session();
        s.install_player(Player::new("alice", false));
        s.set_operator(true);
        assert!(s.is_operator());
        assert_eq!(
            s.drain_outbound(),
            vec![Outbound::UpdateUserType {
                user_type: USER_TYPE_OP
            }]
        );
    }

    #[test]
    fn deferred_packets_follow_the_join_burst() {
        let s = session();
        s.set_phase(Phase::Identified);
        assert!(!s.is_joining());
        s.install_player(Player::new("alice", false));
        assert!(s.is_joining());

        s.defer(Outbound::Ping);
        s.send(Outbound::LevelInitialize);
        s.activate();
        assert!(s.is_active());
        assert!(s.has_joined());
        assert_eq!(
            s.drain_outbound(),
            vec![Outbound::LevelInitialize, Outbound::Ping]
        );
    }

    #[test]
    fn rejected_session_never_counts_as_joined() {
        let s = session();
        s.set_phase(Phase::Identified);
        s.kick("&4nope");
        assert!(!s.has_joined());
    }
}
