//! Game state definitions and structures
//!
//! Teams, players, satellites, entity identities and the per-second event
//! snapshot that flows out of the simulation.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::game::constants::teams;
use crate::game::systems::ai::AiPlayer;
use crate::game::systems::movement::Mover;
use crate::util::pool::SlotId;
use crate::util::vec2::Vec2;

/// Team tag. Each player is identified by exactly one team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Green,
    Blue,
    Orange,
    Purple,
    Cyan,
    Yellow,
}

/// Players are keyed by their team
pub type PlayerId = Team;

impl Team {
    pub const ALL: [Team; 7] = [
        Team::Red,
        Team::Green,
        Team::Blue,
        Team::Orange,
        Team::Purple,
        Team::Cyan,
        Team::Yellow,
    ];

    pub fn color(self) -> u32 {
        match self {
            Team::Red => teams::RED,
            Team::Green => teams::GREEN,
            Team::Blue => teams::BLUE,
            Team::Orange => teams::ORANGE,
            Team::Purple => teams::PURPLE,
            Team::Cyan => teams::CYAN,
            Team::Yellow => teams::YELLOW,
        }
    }

    /// Dense index, used for fixed-size per-team tables
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Green => "green",
            Team::Blue => "blue",
            Team::Orange => "orange",
            Team::Purple => "purple",
            Team::Cyan => "cyan",
            Team::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant. Human-controlled when `ai` is `None`.
#[derive(Debug)]
pub struct Player {
    pub team: Team,
    /// Base colour (0xRRGGBB)
    pub color: u32,
    pub ai: Option<AiPlayer>,
}

impl Player {
    pub fn new(team: Team, ai: Option<AiPlayer>) -> Self {
        Self {
            team,
            color: team.color(),
            ai,
        }
    }

    /// No autonomous player is driving this team
    pub fn is_human(&self) -> bool {
        self.ai.as_ref().map_or(true, |ai| !ai.enabled)
    }
}

/// Index of a planet in the game's planet list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanetId(pub u32);

impl PlanetId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "planet-{}", self.0)
    }
}

/// Satellites are identified by their pool slot
pub type SatelliteId = SlotId;

/// Any entity the simulation reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Planet(PlanetId),
    Satellite(SatelliteId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Planet(id) => id.fmt(f),
            EntityId::Satellite(id) => id.fmt(f),
        }
    }
}

/// Mobile unit. Lives in the game's satellite pool.
#[derive(Debug, Clone, Default)]
pub struct Satellite {
    pub owner: Option<Team>,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Per-unit steering multiplier so groups don't move in lockstep
    pub noise: f32,
    pub mover: Mover,
}

impl Satellite {
    /// Reinitialise a (possibly recycled) pool value
    pub fn reset(&mut self, owner: Team, position: Vec2, velocity: Vec2, noise: f32, mover: Mover) {
        self.owner = Some(owner);
        self.position = position;
        self.velocity = velocity;
        self.noise = noise;
        self.mover = mover;
    }
}

/// Per-unit handle stored in the collision tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRef {
    pub id: SatelliteId,
    pub owner: Team,
}

/// A unit that left the simulation, copied out before its slot is recycled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemovedSatellite {
    pub id: SatelliteId,
    pub owner: Team,
    pub position: Vec2,
    /// `None` when the unit simply flew out of bounds
    pub destroyed_by: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Capture,
    Upgrade,
    Loss,
}

/// Ownership change recorded into the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub team: Team,
}

impl GameEvent {
    pub fn capture(team: Team) -> Self {
        Self { kind: EventKind::Capture, team }
    }

    pub fn upgrade(team: Team) -> Self {
        Self { kind: EventKind::Upgrade, team }
    }

    pub fn loss(team: Team) -> Self {
        Self { kind: EventKind::Loss, team }
    }
}

/// Once-per-second summary appended to the game log
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    /// Simulated seconds since the countdown ended
    pub time: u32,
    pub satellite_counts: HashMap<Team, u32>,
    pub events: Vec<GameEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_serde_lowercase() {
        let json = serde_json::to_string(&Team::Purple).unwrap();
        assert_eq!(json, "\"purple\"");
        let team: Team = serde_json::from_str("\"cyan\"").unwrap();
        assert_eq!(team, Team::Cyan);
    }

    #[test]
    fn test_team_index_is_dense() {
        for (i, team) in Team::ALL.iter().enumerate() {
            assert_eq!(team.index(), i);
        }
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::Planet(PlanetId(4)).to_string(), "planet-4");
        assert_eq!(EntityId::Satellite(SlotId::new(9, 2)).to_string(), "9.2");
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(GameEvent::capture(Team::Red)).unwrap();
        assert_eq!(json["type"], "capture");
        assert_eq!(json["team"], "red");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut snapshot = GameStateSnapshot { time: 3, ..Default::default() };
        snapshot.satellite_counts.insert(Team::Blue, 12);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["time"], 3);
        assert_eq!(json["satelliteCounts"]["blue"], 12);
    }

    #[test]
    fn test_player_colour_follows_team() {
        let player = Player::new(Team::Green, None);
        assert_eq!(player.color, teams::GREEN);
        assert!(player.is_human());
    }
}
