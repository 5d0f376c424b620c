//! The server: shared state, the global tick, and shutdown sequencing.
//!
//! One `Server` is shared (behind an `Arc`) by the listener, every session
//! task, the autosave task, and the tick loop. Locks are never nested except
//! registry → session, and the world lock is never held across an await.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use classic_engine::world::grid::VoxelGrid;

use crate::commands::{BuiltinCommands, CommandHandler};
use crate::config::ServerConfig;
use crate::event_bus::BroadcastQueue;
use crate::generator::{FlatGenerator, Generator};
use crate::level;
use crate::lists::{BanList, NameList, OpList};
use crate::persistence;
use crate::player_registry::{PlayerId, PlayerRegistry};
use crate::protocol::{CONSOLE_ID, Outbound};
use crate::world::World;

/// Period of the global tick.
pub const TICK_PERIOD: Duration = Duration::from_millis(50);
/// A keep-alive ping goes to every client this often (in ticks).
pub const PING_INTERVAL: u64 = 100;
/// Ticks between a stop request and the forced disconnect of every session.
pub const STOP_COUNTDOWN: u32 = 40;
/// Ticks between the forced disconnect and the end of the run loop.
pub const STOP_GRACE: u32 = 20;
/// How long a released session's task gets to flush and exit.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// The pluggable pieces a server is built from.
pub struct Collaborators {
    pub bans: Arc<dyn BanList>,
    pub ops: Arc<dyn OpList>,
    pub generator: Arc<dyn Generator>,
    pub commands: Arc<dyn CommandHandler>,
}

impl Default for Collaborators {
    /// In-memory lists, flat terrain, the builtin commands.
    fn default() -> Self {
        Self {
            bans: Arc::new(NameList::new()),
            ops: Arc::new(NameList::new()),
            generator: Arc::new(FlatGenerator),
            commands: Arc::new(BuiltinCommands),
        }
    }
}

impl Collaborators {
    /// Default collaborators with the ban and operator lists backed by the
    /// files named in `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let bans = NameList::open(&config.bans_file)
            .with_context(|| format!("opening ban list {}", config.bans_file.display()))?;
        let ops = NameList::open(&config.ops_file)
            .with_context(|| format!("opening operator list {}", config.ops_file.display()))?;
        Ok(Self {
            bans: Arc::new(bans),
            ops: Arc::new(ops),
            ..Self::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopState {
    Running,
    /// Disconnect sent; counting down to the forced close.
    Draining(u32),
    /// Every session released; waiting out the grace window.
    Grace(u32),
    Done,
}

/// Compressed level bytes, valid for one world revision.
struct LevelCache {
    revision: u64,
    data: Bytes,
}

pub struct Server {
    config: ServerConfig,
    registry: PlayerRegistry,
    outbox: Arc<BroadcastQueue>,
    world: Mutex<World>,
    level: Mutex<LevelCache>,
    bans: Arc<dyn BanList>,
    ops: Arc<dyn OpList>,
    commands: Arc<dyn CommandHandler>,
    ticks: AtomicU64,
    stop: Mutex<StopState>,
    shutdown: watch::Sender<bool>,
    /// Waits on the tasks of released sessions, off the tick.
    reapers: Mutex<JoinSet<()>>,
}

impl Server {
    /// Build a server around `grid`. Fails if the level cannot be compressed.
    pub fn new(config: ServerConfig, grid: VoxelGrid, collab: Collaborators) -> Result<Arc<Self>> {
        let outbox = Arc::new(BroadcastQueue::new());
        let world = World::from_grid(grid, collab.generator, Arc::clone(&outbox));
        Self::assemble(config, world, outbox, collab.bans, collab.ops, collab.commands)
    }

    /// Load the world named in the config, or generate one if there is no
    /// readable save.
    pub fn open(config: ServerConfig, collab: Collaborators) -> Result<Arc<Self>> {
        let grid = match persistence::load_grid(&config.world_file) {
            Ok(Some(grid)) => grid,
            Ok(None) => {
                tracing::info!("No save at {}, generating", config.world_file.display());
                generate(&config, collab.generator.as_ref())?
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load {} ({}), generating a new world",
                    config.world_file.display(),
                    e
                );
                generate(&config, collab.generator.as_ref())?
            }
        };
        Self::new(config, grid, collab)
    }

    fn assemble(
        config: ServerConfig,
        world: World,
        outbox: Arc<BroadcastQueue>,
        bans: Arc<dyn BanList>,
        ops: Arc<dyn OpList>,
        commands: Arc<dyn CommandHandler>,
    ) -> Result<Arc<Self>> {
        let data = level::compress(world.grid().as_bytes()).context("compressing level")?;
        tracing::debug!("initial level compresses to {} bytes", data.len());
        let cache = LevelCache {
            revision: world.revision(),
            data,
        };
        let (shutdown, _) = watch::channel(false);
        Ok(Arc::new(Self {
            registry: PlayerRegistry::new(config.max_players),
            config,
            outbox,
            world: Mutex::new(world),
            level: Mutex::new(cache),
            bans,
            ops,
            commands,
            ticks: AtomicU64::new(0),
            stop: Mutex::new(StopState::Running),
            shutdown,
            reapers: Mutex::new(JoinSet::new()),
        }))
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn outbox(&self) -> &BroadcastQueue {
        &self.outbox
    }

    pub fn bans(&self) -> &dyn BanList {
        self.bans.as_ref()
    }

    pub fn ops(&self) -> &dyn OpList {
        self.ops.as_ref()
    }

    pub fn commands(&self) -> &dyn CommandHandler {
        self.commands.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().expect("world poisoned")
    }

    /// Run `f` with exclusive access to the world. Never call this while
    /// holding the registry lock.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.world())
    }

    pub fn world_snapshot(&self) -> VoxelGrid {
        self.world().grid().clone()
    }

    /// The gzip-compressed level for a joining client. Reuses the last
    /// result while the world is unchanged. CPU-heavy; call it off the
    /// async executor.
    pub fn compressed_level(&self) -> io::Result<Bytes> {
        let (revision, raw) = {
            let world = self.world();
            let revision = world.revision();
            let cache = self.level.lock().expect("level cache poisoned");
            if cache.revision == revision {
                return Ok(cache.data.clone());
            }
            (revision, world.grid().as_bytes().to_vec())
        };
        let data = level::compress(&raw)?;
        let mut cache = self.level.lock().expect("level cache poisoned");
        if revision > cache.revision {
            *cache = LevelCache {
                revision,
                data: data.clone(),
            };
        }
        Ok(data)
    }

    // ── Messaging ────────────────────────────────────────────────────────

    /// Send a server chat line to one player, if online.
    pub fn tell(&self, name: &str, text: &str) {
        if let Some(session) = self.registry.find_by_name(name) {
            session.send(Outbound::Message {
                player_id: CONSOLE_ID,
                text: text.to_owned(),
            });
        }
    }

    /// Queue a server chat line for everyone; it goes out on the next tick.
    pub fn announce(&self, text: &str) {
        self.outbox.push(Outbound::Message {
            player_id: CONSOLE_ID,
            text: text.to_owned(),
        });
    }

    // ── Shutdown ─────────────────────────────────────────────────────────

    /// A receiver that flips to `true` once a stop has been requested.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_stopping(&self) -> bool {
        *self.stop.lock().expect("stop state poisoned") != StopState::Running
    }

    /// Begin a cooperative shutdown: tell every client why right away, stop
    /// accepting connections, and let the tick count down to the forced
    /// close. Repeated requests are ignored.
    pub fn request_stop(&self, reason: &str) {
        {
            let mut stop = self.stop.lock().expect("stop state poisoned");
            if *stop != StopState::Running {
                return;
            }
            *stop = StopState::Draining(STOP_COUNTDOWN);
        }
        tracing::info!("Stop requested: {}", reason);
        self.registry.broadcast(
            &Outbound::Disconnect {
                reason: reason.to_owned(),
            },
            None,
        );
        self.shutdown.send_replace(true);
    }

    /// Unregister a session and announce the departure if it had joined.
    /// Its task gets `TASK_JOIN_TIMEOUT` to flush and exit in the
    /// background before it is aborted.
    pub fn release(&self, id: PlayerId) {
        let Some((session, task)) = self.registry.remove(id) else {
            return;
        };
        if session.has_joined() {
            let name = session.name().unwrap_or_default();
            self.registry.broadcast(
                &Outbound::DespawnPlayer {
                    player_id: id.wire(),
                },
                None,
            );
            self.registry.broadcast(
                &Outbound::Message {
                    player_id: CONSOLE_ID,
                    text: format!("&e{} left the game", name),
                },
                None,
            );
            tracing::info!("{} left the game", name);
        } else {
            tracing::debug!("released {} ({}) before login", id, session.peer());
        }

        if let Some(task) = task {
            self.reapers().spawn(reap(id, task));
        }
    }

    /// Mark every session dead and release them all.
    pub fn disconnect_all(&self) {
        let sessions = self.registry.snapshot();
        for session in &sessions {
            session.mark_dead();
        }
        for session in sessions {
            self.release(session.id());
        }
    }

    fn reapers(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.reapers.lock().expect("reapers poisoned")
    }

    /// Number of released session tasks not yet finished.
    pub fn pending_reaps(&self) -> usize {
        let mut reapers = self.reapers();
        while reapers.try_join_next().is_some() {}
        reapers.len()
    }

    /// Wait until every released session task has exited or been aborted.
    async fn join_reapers(&self) {
        let mut reapers = std::mem::take(&mut *self.reapers());
        while reapers.join_next().await.is_some() {}
    }

    // ── Tick ─────────────────────────────────────────────────────────────

    /// One global tick:
    /// 1. release dead sessions,
    /// 2. ping everyone every [`PING_INTERVAL`] ticks,
    /// 3. fan out queued broadcasts,
    /// 4. advance the world,
    /// 5. advance the shutdown sequence.
    ///
    /// Returns `false` once the server has finished stopping. Never waits on
    /// a session task.
    pub fn tick(&self) -> bool {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

        for id in self.registry.dead_ids() {
            self.release(id);
        }
        self.pending_reaps();

        if tick % PING_INTERVAL == 0 {
            self.registry.broadcast(&Outbound::Ping, None);
        }

        for broadcast in self.outbox.drain() {
            self.registry.deliver(&broadcast);
        }

        self.world().tick();

        self.advance_stop()
    }

    fn advance_stop(&self) -> bool {
        let state = *self.stop.lock().expect("stop state poisoned");
        let next = match state {
            StopState::Running => return true,
            StopState::Draining(n) if n > 1 => StopState::Draining(n - 1),
            StopState::Draining(_) => {
                tracing::info!("Disconnecting {} remaining sessions", self.registry.len());
                self.disconnect_all();
                StopState::Grace(STOP_GRACE)
            }
            StopState::Grace(n) if n > 1 => StopState::Grace(n - 1),
            StopState::Grace(_) | StopState::Done => StopState::Done,
        };
        *self.stop.lock().expect("stop state poisoned") = next;
        next != StopState::Done
    }

    /// Drive the tick at [`TICK_PERIOD`] until the shutdown sequence ends.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !self.tick() {
                break;
            }
        }
        self.join_reapers().await;
        tracing::info!("Server stopped after {} ticks", self.ticks());
    }
}

/// Give a released session's task time to flush, then abort it.
async fn reap(id: PlayerId, mut task: JoinHandle<()>) {
    match tokio::time::timeout(TASK_JOIN_TIMEOUT, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Session task for {} failed: {}", id, e),
        Err(_) => {
            tracing::warn!("Session task for {} did not exit, aborting", id);
            task.abort();
        }
    }
}

fn generate(config: &ServerConfig, generator: &dyn Generator) -> Result<VoxelGrid> {
    let mut grid = VoxelGrid::new(config.dimensions()?);
    generator.fill(&mut grid);
    Ok(grid)
}
