//! Headless match host
//!
//! Drives one `Game` at a fixed wall-clock rate: drains queued commands,
//! ticks the simulation, diffs the result for sync consumers and keeps the
//! metrics registry current.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, HostConfig};
use crate::game::command_buffer::{CommandBuffer, CommandSender};
use crate::game::game_loop::Game;
use crate::game::map::{GameMap, MapError};
use crate::game::performance::{PerformanceMonitor, PerformanceStatus};
use crate::game::state::GameStateSnapshot;
use crate::game::sync::{StateDelta, SyncState};
use crate::metrics::Metrics;

/// Seconds between periodic stats lines
const STATS_INTERVAL_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("invalid host configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Read a map file, or fall back to the built-in skirmish map
pub fn load_map(path: Option<&Path>) -> Result<GameMap, HostError> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let map = GameMap::from_json(&json)?;
            info!("Loaded map '{}' from {}", map.props.name, path.display());
            Ok(map)
        }
        None => Ok(GameMap::skirmish()),
    }
}

pub struct MatchHost {
    config: HostConfig,
    game: Game,
    commands: CommandBuffer,
    sync: SyncState,
    performance: PerformanceMonitor,
    metrics: Arc<Metrics>,
    ticks: u64,
}

impl MatchHost {
    pub fn new(config: HostConfig, map: GameMap, metrics: Arc<Metrics>) -> Result<Self, HostError> {
        config.validate()?;
        let game = Game::new(config.game_config(), map)?;
        let performance = PerformanceMonitor::new(config.tick_rate);
        metrics.planets_total.store(game.planets().len() as u64, Ordering::Relaxed);
        Ok(Self {
            config,
            game,
            commands: CommandBuffer::default(),
            sync: SyncState::new(),
            performance,
            metrics,
            ticks: 0,
        })
    }

    /// Handle for producers of moves and admin messages
    pub fn sender(&self) -> CommandSender {
        self.commands.sender()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn sync(&self) -> &SyncState {
        &self.sync
    }

    pub fn performance_status(&self) -> PerformanceStatus {
        self.performance.status()
    }

    /// Start the match with the configured countdown
    pub fn start(&mut self) {
        self.game.start(self.config.countdown_seconds);
    }

    /// Match time limit reached
    pub fn is_finished(&self) -> bool {
        match self.config.match_seconds {
            Some(limit) => self.game.game_time_ms() >= limit as f64 * 1000.0,
            None => false,
        }
    }

    /// One host tick: apply commands, advance `elapsed_ms` of wall time,
    /// and return what changed.
    pub fn step(&mut self, elapsed_ms: f64) -> StateDelta {
        self.performance.tick_start();

        for command in self.commands.drain() {
            match command.apply(&mut self.game) {
                Ok(()) => {
                    self.metrics.commands_applied_total.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("Rejected command: {}", e);
                    self.metrics.commands_rejected_total.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let result = self.game.tick(elapsed_ms);
        let removed: Vec<_> = result.removed.drain(..).collect();
        let spawned = result.spawned;
        let log = result.log.clone();

        if let Some(snapshot) = &log {
            self.record_snapshot(snapshot);
        }
        let delta = self.sync.update(&self.game, &removed, log);
        match delta.encode() {
            Ok(bytes) => {
                self.metrics.sync_bytes_total.fetch_add(bytes.len() as u64, Ordering::Relaxed);
            }
            Err(e) => warn!("{}", e),
        }

        self.metrics.satellites_spawned_total.fetch_add(spawned as u64, Ordering::Relaxed);
        self.metrics.satellites_removed_total.fetch_add(removed.len() as u64, Ordering::Relaxed);
        self.update_gauges();

        let entity_count = self.game.planets().len() + self.game.satellite_count();
        if let Some(duration) = self.performance.tick_end(entity_count) {
            self.metrics.record_tick_time(duration);
        }
        self.metrics
            .performance_status
            .store(self.performance.status().level(), Ordering::Relaxed);
        self.metrics
            .budget_usage_percent
            .store(self.performance.budget_usage_percent() as u64, Ordering::Relaxed);

        self.ticks += 1;
        delta
    }

    fn record_snapshot(&self, snapshot: &GameStateSnapshot) {
        self.metrics.snapshots_total.fetch_add(1, Ordering::Relaxed);
        self.metrics.events_total.fetch_add(snapshot.events.len() as u64, Ordering::Relaxed);
        #[cfg(feature = "metrics_extended")]
        self.metrics.record_snapshot(snapshot);
        for event in &snapshot.events {
            debug!("t={}s {:?} by {}", snapshot.time, event.kind, event.team);
        }
    }

    fn update_gauges(&self) {
        let owned = self.game.planets().iter().filter(|p| p.owner().is_some()).count();
        self.metrics.planets_total.store(self.game.planets().len() as u64, Ordering::Relaxed);
        self.metrics.planets_owned.store(owned as u64, Ordering::Relaxed);
        self.metrics.satellites.store(self.game.satellite_count() as u64, Ordering::Relaxed);
        self.metrics
            .match_time_seconds
            .store((self.game.game_time_ms().max(0.0) / 1000.0) as u64, Ordering::Relaxed);
        self.metrics
            .game_speed
            .store((self.game.config().game_speed * 100.0) as u64, Ordering::Relaxed);
        #[cfg(feature = "metrics_extended")]
        self.metrics
            .quadtree_nodes
            .store(self.game.collision_tree().node_count() as u64, Ordering::Relaxed);
    }

    /// Run at the configured tick rate until the match time limit.
    /// Returns the last snapshot flushed, if any.
    pub async fn run(mut self) -> Option<GameStateSnapshot> {
        if !self.game.is_running() {
            self.start();
        }

        let mut ticker = interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let stats_every = (self.config.tick_rate as u64 * STATS_INTERVAL_SECS).max(1);

        info!("Match loop started at {} Hz", self.config.tick_rate);
        let start = Instant::now();
        let mut last = start;

        loop {
            ticker.tick().await;
            let now = Instant::now();
            let elapsed = now.duration_since(last);
            last = now;

            self.step(elapsed.as_secs_f64() * 1000.0);

            if self.ticks % stats_every == 0 {
                self.log_stats(start.elapsed());
            }
            if self.is_finished() {
                break;
            }
        }

        let last_snapshot = self.game.log().last().cloned();
        match &last_snapshot {
            Some(snapshot) => info!(
                "Match over at {}s: {:?}",
                snapshot.time, snapshot.satellite_counts
            ),
            None => info!("Match over before the first snapshot"),
        }
        last_snapshot
    }

    fn log_stats(&self, elapsed: Duration) {
        let owned = self.game.planets().iter().filter(|p| p.owner().is_some()).count();
        info!(
            "Match: {}s wall, {:.0}s game, {} units, {}/{} planets owned | Perf: {}",
            elapsed.as_secs(),
            self.game.game_time_ms() / 1000.0,
            self.game.satellite_count(),
            owned,
            self.game.planets().len(),
            self.performance.status_message()
        );
    }
}
