//! Prometheus-compatible metrics endpoint
//!
//! Exposes simulation host metrics in Prometheus text format.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

#[cfg(feature = "metrics_extended")]
use crate::game::state::{GameStateSnapshot, Team};

/// Metrics registry for the simulation host
#[derive(Debug)]
pub struct Metrics {
    // World
    pub planets_total: AtomicU64,
    pub planets_owned: AtomicU64,
    pub satellites: AtomicU64,
    pub satellites_spawned_total: AtomicU64,
    pub satellites_removed_total: AtomicU64,
    pub events_total: AtomicU64,
    pub snapshots_total: AtomicU64,

    // Commands
    pub commands_applied_total: AtomicU64,
    pub commands_rejected_total: AtomicU64,

    /// Encoded state delta bytes
    pub sync_bytes_total: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // 0=Excellent .. 3=Critical
    pub performance_status: AtomicU64,
    pub budget_usage_percent: AtomicU64,

    pub match_time_seconds: AtomicU64,
    /// Game speed x100
    pub game_speed: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
    #[cfg(feature = "metrics_extended")]
    pub quadtree_nodes: AtomicU64,
    #[cfg(feature = "metrics_extended")]
    team_satellites: RwLock<Vec<(Team, u32)>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            planets_total: AtomicU64::new(0),
            planets_owned: AtomicU64::new(0),
            satellites: AtomicU64::new(0),
            satellites_spawned_total: AtomicU64::new(0),
            satellites_removed_total: AtomicU64::new(0),
            events_total: AtomicU64::new(0),
            snapshots_total: AtomicU64::new(0),
            commands_applied_total: AtomicU64::new(0),
            commands_rejected_total: AtomicU64::new(0),
            sync_bytes_total: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            performance_status: AtomicU64::new(0),
            budget_usage_percent: AtomicU64::new(0),
            match_time_seconds: AtomicU64::new(0),
            game_speed: AtomicU64::new(100),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(1000)),
            #[cfg(feature = "metrics_extended")]
            quadtree_nodes: AtomicU64::new(0),
            #[cfg(feature = "metrics_extended")]
            team_satellites: RwLock::new(Vec::new()),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > 1000 {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Per-team unit counts from the latest snapshot
    #[cfg(feature = "metrics_extended")]
    pub fn record_snapshot(&self, snapshot: &GameStateSnapshot) {
        let mut counts: Vec<(Team, u32)> = snapshot
            .satellite_counts
            .iter()
            .map(|(team, count)| (*team, *count))
            .collect();
        counts.sort_by_key(|(team, _)| *team);
        *self.team_satellites.write() = counts;
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn status_name(&self) -> &'static str {
        match self.performance_status.load(Ordering::Relaxed) {
            0 => "excellent",
            1 => "good",
            2 => "warning",
            _ => "critical",
        }
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("satellite_siege_planets", "Number of planets", "gauge",
            self.planets_total.load(Ordering::Relaxed));
        metric!("satellite_siege_planets_owned", "Number of owned planets", "gauge",
            self.planets_owned.load(Ordering::Relaxed));
        metric!("satellite_siege_satellites", "Number of live satellites", "gauge",
            self.satellites.load(Ordering::Relaxed));
        metric!("satellite_siege_satellites_spawned_total", "Satellites produced", "counter",
            self.satellites_spawned_total.load(Ordering::Relaxed));
        metric!("satellite_siege_satellites_removed_total", "Satellites removed", "counter",
            self.satellites_removed_total.load(Ordering::Relaxed));
        metric!("satellite_siege_events_total", "Capture, upgrade and loss events", "counter",
            self.events_total.load(Ordering::Relaxed));
        metric!("satellite_siege_snapshots_total", "Snapshots flushed", "counter",
            self.snapshots_total.load(Ordering::Relaxed));

        metric!("satellite_siege_commands_applied_total", "Commands applied", "counter",
            self.commands_applied_total.load(Ordering::Relaxed));
        metric!("satellite_siege_commands_rejected_total", "Commands rejected", "counter",
            self.commands_rejected_total.load(Ordering::Relaxed));
        metric!("satellite_siege_sync_bytes_total", "Encoded state delta bytes", "counter",
            self.sync_bytes_total.load(Ordering::Relaxed));

        metric!("satellite_siege_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("satellite_siege_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("satellite_siege_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("satellite_siege_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("satellite_siege_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        metric!("satellite_siege_performance_status", "Performance status (0=Excellent, 3=Critical)", "gauge",
            self.performance_status.load(Ordering::Relaxed));
        metric!("satellite_siege_budget_usage_percent", "Tick budget usage percentage", "gauge",
            self.budget_usage_percent.load(Ordering::Relaxed));
        output.push_str(&format!(
            "# HELP satellite_siege_performance_state Human-readable performance state\n# TYPE satellite_siege_performance_state gauge\nsatellite_siege_performance_state{{state=\"{}\"}} 1\n",
            self.status_name()
        ));

        metric!("satellite_siege_match_time_seconds", "Current match time", "gauge",
            self.match_time_seconds.load(Ordering::Relaxed));
        metric!("satellite_siege_game_speed", "Game speed (x100)", "gauge",
            self.game_speed.load(Ordering::Relaxed));
        metric!("satellite_siege_uptime_seconds", "Host uptime in seconds", "counter",
            self.uptime_seconds());

        #[cfg(feature = "metrics_extended")]
        {
            metric!("satellite_siege_quadtree_nodes", "Collision tree nodes in use", "gauge",
                self.quadtree_nodes.load(Ordering::Relaxed));
            let teams = self.team_satellites.read();
            if !teams.is_empty() {
                output.push_str(
                    "# HELP satellite_siege_team_satellites Live satellites per team\n# TYPE satellite_siege_team_satellites gauge\n",
                );
                for (team, count) in teams.iter() {
                    output.push_str(&format!(
                        "satellite_siege_team_satellites{{team=\"{}\"}} {}\n",
                        team, count
                    ));
                }
            }
        }

        output
    }

    /// JSON form of the same metrics
    pub fn to_json(&self) -> String {
        #[allow(unused_mut)]
        let mut value = serde_json::json!({
            "world": {
                "planets": self.planets_total.load(Ordering::Relaxed),
                "planets_owned": self.planets_owned.load(Ordering::Relaxed),
                "satellites": self.satellites.load(Ordering::Relaxed),
                "spawned_total": self.satellites_spawned_total.load(Ordering::Relaxed),
                "removed_total": self.satellites_removed_total.load(Ordering::Relaxed),
                "events_total": self.events_total.load(Ordering::Relaxed),
            },
            "commands": {
                "applied": self.commands_applied_total.load(Ordering::Relaxed),
                "rejected": self.commands_rejected_total.load(Ordering::Relaxed),
            },
            "sync_bytes_total": self.sync_bytes_total.load(Ordering::Relaxed),
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
                "status": self.performance_status.load(Ordering::Relaxed),
                "status_name": self.status_name(),
                "budget_percent": self.budget_usage_percent.load(Ordering::Relaxed),
            },
            "game": {
                "match_time_seconds": self.match_time_seconds.load(Ordering::Relaxed),
                "game_speed": self.game_speed.load(Ordering::Relaxed) as f64 / 100.0,
                "uptime_seconds": self.uptime_seconds(),
            },
        });

        #[cfg(feature = "metrics_extended")]
        {
            let teams: serde_json::Map<String, serde_json::Value> = self
                .team_satellites
                .read()
                .iter()
                .map(|(team, count)| (team.to_string(), serde_json::Value::from(*count)))
                .collect();
            value["teams"] = serde_json::Value::Object(teams);
        }

        serde_json::to_string_pretty(&value).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = respond(&metrics, &request);
                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

/// Route one HTTP request line
fn respond(metrics: &Metrics, request: &str) -> String {
    let ok = |content_type: &str, body: String| {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            content_type,
            body.len(),
            body
        )
    };

    if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
        ok("application/json", metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        ok("text/plain; version=0.0.4", metrics.to_prometheus())
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        ok("text/plain", "OK".to_string())
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
    }
}
