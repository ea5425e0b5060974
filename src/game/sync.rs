//! Incremental state sync
//!
//! `SyncState` remembers what was last published for every entity and turns
//! each tick's view of the game into a `StateDelta` holding only what changed.
//! Small movements are ignored to keep payloads small.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::game::game_loop::{EntityView, Game};
use crate::game::planet::Planet;
use crate::game::state::{GameStateSnapshot, PlanetId, RemovedSatellite, Satellite, SatelliteId, Team};
use crate::util::vec2::Vec2;

/// Position changes below this are not sent (world units)
const POSITION_EPSILON: f32 = 0.1;

/// Velocity changes below this are not sent (units/second)
const VELOCITY_EPSILON: f32 = 0.5;

/// Planet rotation changes below this are not sent (radians)
const ROTATION_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanetState {
    pub id: PlanetId,
    pub position: Vec2,
    pub owner: Option<Team>,
    /// Team currently capturing a neutral planet
    pub candidate: Option<Team>,
    pub level: u8,
    pub max_level: u8,
    pub health: u8,
    pub upgrade: u8,
    pub rotation: f32,
}

impl PlanetState {
    pub fn of(planet: &Planet) -> Self {
        Self {
            id: planet.id,
            position: planet.position,
            owner: planet.owner(),
            candidate: planet.candidate_owner(),
            level: planet.level(),
            max_level: planet.max_level,
            health: planet.health(),
            upgrade: planet.upgrade(),
            rotation: planet.rotation,
        }
    }

    fn differs(&self, other: &Self) -> bool {
        self.owner != other.owner
            || self.candidate != other.candidate
            || self.level != other.level
            || self.max_level != other.max_level
            || self.health != other.health
            || self.upgrade != other.upgrade
            || (self.rotation - other.rotation).abs() > ROTATION_EPSILON
            || (self.position - other.position).length_sq() > POSITION_EPSILON * POSITION_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SatelliteState {
    pub id: SatelliteId,
    pub owner: Team,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl SatelliteState {
    pub fn of(id: SatelliteId, sat: &Satellite) -> Option<Self> {
        Some(Self {
            id,
            owner: sat.owner?,
            position: sat.position,
            velocity: sat.velocity,
        })
    }

    fn differs(&self, other: &Self) -> bool {
        self.owner != other.owner
            || (self.position - other.position).length_sq() > POSITION_EPSILON * POSITION_EPSILON
            || (self.velocity - other.velocity).length_sq() > VELOCITY_EPSILON * VELOCITY_EPSILON
    }
}

/// Everything that changed since the previous delta
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    pub game_time_ms: f64,
    pub planets: Vec<PlanetState>,
    pub satellites: Vec<SatelliteState>,
    pub removed: Vec<RemovedSatellite>,
    /// Units that disappeared without a removal record (e.g. a restart)
    pub dropped: Vec<SatelliteId>,
    pub log: Option<GameStateSnapshot>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
            && self.satellites.is_empty()
            && self.removed.is_empty()
            && self.dropped.is_empty()
            && self.log.is_none()
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::legacy())?)
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let (delta, _) = bincode::serde::decode_from_slice(data, bincode::config::legacy())?;
        Ok(delta)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode state delta: {0}")]
pub struct EncodeError(#[from] bincode::error::EncodeError);

#[derive(Debug, thiserror::Error)]
#[error("failed to decode state delta: {0}")]
pub struct DecodeError(#[from] bincode::error::DecodeError);

/// Last published state per entity
#[derive(Debug, Default)]
pub struct SyncState {
    planets: FxHashMap<PlanetId, PlanetState>,
    satellites: FxHashMap<SatelliteId, SatelliteState>,
    seen: FxHashSet<SatelliteId>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff the game against what was last published.
    ///
    /// `removed` is the tick's removal list; `log` the snapshot it flushed.
    pub fn update(
        &mut self,
        game: &Game,
        removed: &[RemovedSatellite],
        log: Option<GameStateSnapshot>,
    ) -> StateDelta {
        let mut delta = StateDelta {
            game_time_ms: game.game_time_ms(),
            log,
            ..StateDelta::default()
        };
        self.seen.clear();

        for record in removed {
            if self.satellites.remove(&record.id).is_some() {
                delta.removed.push(*record);
            }
        }

        game.for_each_entity(|entity| match entity {
            EntityView::Planet(planet) => {
                let state = PlanetState::of(planet);
                let changed = self.planets.get(&planet.id).map_or(true, |last| state.differs(last));
                if changed {
                    self.planets.insert(planet.id, state);
                    delta.planets.push(state);
                }
            }
            EntityView::Satellite(id, sat) => {
                let Some(state) = SatelliteState::of(id, sat) else {
                    return;
                };
                self.seen.insert(id);
                let changed = self.satellites.get(&id).map_or(true, |last| state.differs(last));
                if changed {
                    self.satellites.insert(id, state);
                    delta.satellites.push(state);
                }
            }
        });

        let seen = &self.seen;
        let dropped = &mut delta.dropped;
        self.satellites.retain(|id, _| {
            let keep = seen.contains(id);
            if !keep {
                dropped.push(*id);
            }
            keep
        });
        dropped.sort();

        delta
    }

    /// Full state for a newly attached consumer
    pub fn full(&self, game_time_ms: f64) -> StateDelta {
        let mut planets: Vec<_> = self.planets.values().copied().collect();
        planets.sort_by_key(|p| p.id);
        let mut satellites: Vec<_> = self.satellites.values().copied().collect();
        satellites.sort_by_key(|s| s.id);
        StateDelta {
            game_time_ms,
            planets,
            satellites,
            ..StateDelta::default()
        }
    }

    pub fn tracked_satellites(&self) -> usize {
        self.satellites.len()
    }
}
