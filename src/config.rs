use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::game::constants::{ai, planet, simulation, spatial, steering};
use crate::game::state::Team;

/// Host configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick rate must be 1-1000 Hz, got {0}")]
    TickRate(u32),
    #[error("game speed must be positive and finite, got {0}")]
    GameSpeed(f32),
    #[error("pulse rate must be at least 1")]
    PulseRate,
    #[error("countdown must be non-negative, got {0}")]
    Countdown(f64),
    #[error("metrics port cannot be 0")]
    MetricsPort,
}

/// Spring-damper steering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringConfig {
    pub max_speed: f32,
    pub stiffness: f32,
    pub damping: f32,
    /// Per-axis random offset added to point targets
    pub jitter: f32,
    /// Distance at which a point target is reached
    pub arrive_radius: f32,
    /// Distance at which a planet target is reached
    pub planet_radius: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_speed: steering::MAX_SPEED,
            stiffness: steering::STIFFNESS,
            damping: steering::DAMPING,
            jitter: steering::JITTER,
            arrive_radius: steering::ARRIVE_RADIUS,
            planet_radius: planet::TOUCH_RADIUS,
        }
    }
}

/// Autonomous player tuning. Chances are probabilities in `0..=1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    #[serde(rename = "maxThinkGapMS")]
    pub max_think_gap_ms: f64,
    #[serde(rename = "minThinkGapMS")]
    pub min_think_gap_ms: f64,
    /// Planets with fewer units around them are left alone
    pub min_satellites: usize,
    pub heal_chance: f64,
    pub transfer_chance: f64,
    pub upgrade_chance: f64,
    pub attack_chance: f64,
    pub conquer_chance: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            max_think_gap_ms: ai::MAX_THINK_GAP_MS,
            min_think_gap_ms: ai::MIN_THINK_GAP_MS,
            min_satellites: ai::MIN_SATELLITES,
            heal_chance: ai::HEAL_CHANCE,
            transfer_chance: ai::TRANSFER_CHANCE,
            upgrade_chance: ai::UPGRADE_CHANCE,
            attack_chance: ai::ATTACK_CHANCE,
            conquer_chance: ai::CONQUER_CHANCE,
        }
    }
}

/// Which decision strategy autonomous players run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Priority chain over every planet on the map
    #[default]
    Priority,
    /// Same chain over the nearest planets we don't own
    Frontier,
    /// Weighted neighbour scores per planet group
    Scoring,
}

impl std::str::FromStr for StrategyKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "priority" => Ok(StrategyKind::Priority),
            "frontier" => Ok(StrategyKind::Frontier),
            "scoring" => Ok(StrategyKind::Scoring),
            _ => Err(()),
        }
    }
}

/// Live simulation settings owned by a `Game`
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Seed for the game's RNG
    pub seed: u64,
    /// Multiplier applied to elapsed time
    pub game_speed: f32,
    /// Units per planet level produced each pulse
    pub pulse_rate: u32,
    /// Units beyond |x| or |y| of this are removed
    pub max_world: f32,
    /// Global cap on live satellites
    pub max_satellites: usize,
    pub collision_radius: f32,
    /// Longest single integration step
    pub max_sub_tick_ms: f64,
    pub node_capacity: usize,
    pub max_depth: u8,
    pub steering: SteeringConfig,
    pub ai: AiConfig,
    pub strategy: StrategyKind,
    // Lobby settings, carried for the hosting layer
    pub allow_coop: bool,
    pub max_players: usize,
    pub colours: Vec<Team>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            game_speed: simulation::GAME_SPEED,
            pulse_rate: simulation::PULSE_RATE,
            max_world: simulation::MAX_WORLD,
            max_satellites: simulation::MAX_SATELLITES,
            collision_radius: simulation::COLLISION_RADIUS,
            max_sub_tick_ms: simulation::MAX_SUB_TICK_MS,
            node_capacity: spatial::NODE_CAPACITY,
            max_depth: spatial::MAX_DEPTH,
            steering: SteeringConfig::default(),
            ai: AiConfig::default(),
            strategy: StrategyKind::default(),
            allow_coop: false,
            max_players: Team::ALL.len(),
            colours: Team::ALL.to_vec(),
        }
    }
}

/// Admin message from the lobby/host layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminConfig {
    pub game_speed: f32,
    pub pulse_rate: u32,
    pub max_world: f32,
    pub allow_coop: bool,
    pub max_players: usize,
    pub colours: Vec<Team>,
    /// Start the match after applying
    pub start_game: bool,
    /// Countdown before the match starts
    pub warmup_seconds: f64,
    /// Serialized map definition (JSON)
    pub game_map: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            game_speed: simulation::GAME_SPEED,
            pulse_rate: simulation::PULSE_RATE,
            max_world: simulation::MAX_WORLD,
            allow_coop: false,
            max_players: Team::ALL.len(),
            colours: Team::ALL.to_vec(),
            start_game: false,
            warmup_seconds: simulation::COUNTDOWN_SECONDS,
            game_map: None,
        }
    }
}

/// Headless host configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    pub seed: u64,
    /// Map definition to load; the built-in skirmish map otherwise
    pub map_path: Option<PathBuf>,
    pub countdown_seconds: f64,
    /// Stop after this many simulated seconds
    pub match_seconds: Option<u32>,
    pub metrics_port: u16,
    pub game_speed: f32,
    pub pulse_rate: u32,
    pub strategy: StrategyKind,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            seed: 0,
            map_path: None,
            countdown_seconds: simulation::COUNTDOWN_SECONDS,
            match_seconds: None,
            metrics_port: 9090,
            game_speed: simulation::GAME_SPEED,
            pulse_rate: simulation::PULSE_RATE,
            strategy: StrategyKind::default(),
        }
    }
}

impl HostConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(rate) = std::env::var("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if (1..=1000).contains(&parsed) => config.tick_rate = parsed,
                Ok(_) => tracing::warn!("TICK_RATE must be 1-1000, using default"),
                Err(_) => tracing::warn!("Invalid TICK_RATE '{}', using default", rate),
            }
        }

        if let Ok(seed) = std::env::var("GAME_SEED") {
            if let Ok(parsed) = seed.parse() {
                config.seed = parsed;
            } else {
                tracing::warn!("Invalid GAME_SEED '{}', using default", seed);
            }
        }

        if let Ok(path) = std::env::var("MAP_PATH") {
            if !path.is_empty() {
                config.map_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(countdown) = std::env::var("COUNTDOWN_SECONDS") {
            match countdown.parse::<f64>() {
                Ok(parsed) if parsed >= 0.0 && parsed.is_finite() => {
                    config.countdown_seconds = parsed
                }
                _ => tracing::warn!("Invalid COUNTDOWN_SECONDS '{}', using default", countdown),
            }
        }

        if let Ok(seconds) = std::env::var("MATCH_SECONDS") {
            match seconds.parse::<u32>() {
                Ok(0) => config.match_seconds = None,
                Ok(parsed) => config.match_seconds = Some(parsed),
                Err(_) => tracing::warn!("Invalid MATCH_SECONDS '{}', using default", seconds),
            }
        }

        if let Ok(port) = std::env::var("METRICS_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.metrics_port = parsed,
                Ok(_) => tracing::warn!("METRICS_PORT must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid METRICS_PORT '{}', using default", port),
            }
        }

        if let Ok(speed) = std::env::var("GAME_SPEED") {
            match speed.parse::<f32>() {
                Ok(parsed) if parsed > 0.0 && parsed.is_finite() => config.game_speed = parsed,
                _ => tracing::warn!("Invalid GAME_SPEED '{}', using default", speed),
            }
        }

        if let Ok(rate) = std::env::var("PULSE_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if parsed > 0 => config.pulse_rate = parsed,
                _ => tracing::warn!("Invalid PULSE_RATE '{}', using default", rate),
            }
        }

        if let Ok(strategy) = std::env::var("AI_STRATEGY") {
            match strategy.parse() {
                Ok(parsed) => config.strategy = parsed,
                Err(()) => tracing::warn!("Unknown AI_STRATEGY '{}', using default", strategy),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::TickRate(self.tick_rate));
        }
        if !(self.game_speed > 0.0 && self.game_speed.is_finite()) {
            return Err(ConfigError::GameSpeed(self.game_speed));
        }
        if self.pulse_rate == 0 {
            return Err(ConfigError::PulseRate);
        }
        if !(self.countdown_seconds >= 0.0) {
            return Err(ConfigError::Countdown(self.countdown_seconds));
        }
        if self.metrics_port == 0 {
            return Err(ConfigError::MetricsPort);
        }
        Ok(())
    }

    /// Simulation settings derived from the host settings
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            seed: self.seed,
            game_speed: self.game_speed,
            pulse_rate: self.pulse_rate,
            strategy: self.strategy,
            ..GameConfig::default()
        }
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}
