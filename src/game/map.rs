//! Map definitions
//!
//! A map either describes a procedural `setup` or lists its `planets`
//! explicitly, never both. Maps are validated when a world is built from
//! them; a bad map is the one fatal error a game can raise.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::constants::{self, layout, planet::DEFAULT_MAX_LEVEL};
use crate::game::state::Team;
use crate::util::vec2::{Point, Vec2};

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("invalid map JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map defines both a setup and explicit planets")]
    BothLayouts,
    #[error("map defines neither a setup nor planets")]
    NoLayout,
    #[error("map has no planets")]
    NoPlanets,
    #[error("map has no teams")]
    NoTeams,
    #[error("planet {index}: level {level} exceeds max level {max_level}")]
    LevelAboveMax { index: usize, level: u8, max_level: u8 },
    #[error("planet {index}: max level must be at least 1")]
    ZeroMaxLevel { index: usize },
    #[error("planet {index}: owned planets need a level of at least 1")]
    OwnedAtLevelZero { index: usize },
    #[error("planet {index}: position is not finite")]
    BadPosition { index: usize },
    #[error("world size must be positive and finite, got {0}")]
    WorldSize(f32),
    #[error("could not place {0} planets with the required spacing")]
    NoRoom(usize),
    #[error("planet {index}: orbit reaches past the world edge at {max_world}")]
    OutOfBounds { index: usize, max_world: f32 },
}

/// True when a planet's widest orbit stays inside `|x|, |y| <= max_world`
pub fn fits_world(position: Point, max_level: u8, max_world: f32) -> bool {
    let reach = constants::orbit_distance(max_level);
    position.x.abs() + reach <= max_world && position.y.abs() + reach <= max_world
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapProps {
    pub name: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutFunction {
    Circle,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: u8,
    pub count: u32,
}

/// Procedural map description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSetup {
    pub layout_function: LayoutFunction,
    pub initial_unit_count: u32,
    pub world_size: f32,
    pub teams: Vec<Team>,
    /// Neutral planets to generate, keyed by max level
    #[serde(default)]
    pub planet_counts_by_level: Vec<LevelCount>,
}

/// One explicitly placed planet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetSpec {
    #[serde(default)]
    pub owner_team: Option<Team>,
    #[serde(default)]
    pub initial_unit_count: u32,
    #[serde(default)]
    pub level: u8,
    #[serde(default = "default_max_level")]
    pub max_level: u8,
    pub position: Point,
}

fn default_max_level() -> u8 {
    DEFAULT_MAX_LEVEL
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMap {
    pub props: MapProps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<MapSetup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planets: Option<Vec<PlanetSpec>>,
}

/// A map resolved into concrete planets and teams
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLayout {
    pub teams: Vec<Team>,
    pub planets: Vec<PlanetSpec>,
}

impl WorldLayout {
    /// Every unit beyond `max_world` is removed, so a planet whose orbit
    /// crosses it could never hold units.
    pub fn check_bounds(&self, max_world: f32) -> Result<(), MapError> {
        match self
            .planets
            .iter()
            .position(|p| !fits_world(p.position, p.max_level, max_world))
        {
            Some(index) => Err(MapError::OutOfBounds { index, max_world }),
            None => Ok(()),
        }
    }
}

impl GameMap {
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let map: GameMap = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    /// Three teams around a single neutral planet
    pub fn skirmish() -> Self {
        let home = |team, x, y| PlanetSpec {
            owner_team: Some(team),
            initial_unit_count: 50,
            level: 1,
            max_level: layout::HOME_MAX_LEVEL,
            position: Vec2::new(x, y),
        };
        Self {
            props: MapProps { name: "Skirmish".to_string(), image: String::new() },
            setup: None,
            planets: Some(vec![
                home(Team::Red, -450.0, 300.0),
                home(Team::Green, 450.0, 300.0),
                home(Team::Blue, 0.0, -450.0),
                PlanetSpec {
                    owner_team: None,
                    initial_unit_count: 0,
                    level: 0,
                    max_level: 3,
                    position: Vec2::ZERO,
                },
            ]),
        }
    }

    pub fn validate(&self) -> Result<(), MapError> {
        match (&self.setup, &self.planets) {
            (Some(_), Some(_)) => Err(MapError::BothLayouts),
            (None, None) => Err(MapError::NoLayout),
            (Some(setup), None) => {
                if !(setup.world_size > 0.0 && setup.world_size.is_finite()) {
                    return Err(MapError::WorldSize(setup.world_size));
                }
                if setup.teams.is_empty() {
                    return Err(MapError::NoTeams);
                }
                for (index, entry) in setup.planet_counts_by_level.iter().enumerate() {
                    if entry.level == 0 && entry.count > 0 {
                        return Err(MapError::ZeroMaxLevel { index });
                    }
                }
                Ok(())
            }
            (None, Some(planets)) => {
                if planets.is_empty() {
                    return Err(MapError::NoPlanets);
                }
                for (index, p) in planets.iter().enumerate() {
                    validate_planet(index, p)?;
                }
                Ok(())
            }
        }
    }

    /// Resolve the map into concrete planets. Procedural layouts draw from `rng`.
    pub fn layout(&self, rng: &mut dyn RngCore) -> Result<WorldLayout, MapError> {
        self.validate()?;
        let layout = match (&self.setup, &self.planets) {
            (Some(setup), _) => match setup.layout_function {
                LayoutFunction::Circle => circle_layout(setup),
                LayoutFunction::Random => random_layout(setup, rng)?,
            },
            (None, Some(planets)) => {
                let mut teams = Vec::new();
                for team in planets.iter().filter_map(|p| p.owner_team) {
                    if !teams.contains(&team) {
                        teams.push(team);
                    }
                }
                WorldLayout { teams, planets: planets.clone() }
            }
            (None, None) => return Err(MapError::NoLayout),
        };
        debug!(
            "Map '{}' laid out: {} planets, {} teams",
            self.props.name,
            layout.planets.len(),
            layout.teams.len()
        );
        Ok(layout)
    }
}

fn validate_planet(index: usize, p: &PlanetSpec) -> Result<(), MapError> {
    if p.max_level == 0 {
        return Err(MapError::ZeroMaxLevel { index });
    }
    if p.level > p.max_level {
        return Err(MapError::LevelAboveMax { index, level: p.level, max_level: p.max_level });
    }
    if p.owner_team.is_some() && p.level == 0 {
        return Err(MapError::OwnedAtLevelZero { index });
    }
    if !p.position.is_finite() {
        return Err(MapError::BadPosition { index });
    }
    Ok(())
}

fn home_planet(setup: &MapSetup, team: Team, position: Point) -> PlanetSpec {
    PlanetSpec {
        owner_team: Some(team),
        initial_unit_count: setup.initial_unit_count,
        level: 1,
        max_level: layout::HOME_MAX_LEVEL,
        position,
    }
}

fn neutral_planet(max_level: u8, position: Point) -> PlanetSpec {
    PlanetSpec {
        owner_team: None,
        initial_unit_count: 0,
        level: 0,
        max_level,
        position,
    }
}

/// Neutral max levels in map order
fn neutral_levels(setup: &MapSetup) -> Vec<u8> {
    setup
        .planet_counts_by_level
        .iter()
        .flat_map(|e| std::iter::repeat(e.level).take(e.count as usize))
        .collect()
}

/// Homes evenly spaced on an outer ring, neutrals on an inner ring
fn circle_layout(setup: &MapSetup) -> WorldLayout {
    let mut planets = Vec::new();
    let teams = setup.teams.len();
    let outer = setup.world_size * layout::HOME_RING;
    for (i, team) in setup.teams.iter().enumerate() {
        let angle = std::f32::consts::TAU * i as f32 / teams as f32;
        planets.push(home_planet(setup, *team, Vec2::from_angle(angle) * outer));
    }

    let levels = neutral_levels(setup);
    let inner = setup.world_size * layout::NEUTRAL_RING;
    // Offset by half a step so neutrals sit between homes
    let offset = std::f32::consts::PI / teams as f32;
    for (i, level) in levels.iter().enumerate() {
        let angle = offset + std::f32::consts::TAU * i as f32 / levels.len() as f32;
        planets.push(neutral_planet(*level, Vec2::from_angle(angle) * inner));
    }

    WorldLayout { teams: setup.teams.clone(), planets }
}

/// Rejection-sampled positions with a minimum spacing
fn random_layout(setup: &MapSetup, rng: &mut dyn RngCore) -> Result<WorldLayout, MapError> {
    let half = setup.world_size * 0.5;
    let levels = neutral_levels(setup);
    let total = setup.teams.len() + levels.len();
    let min_sq = layout::MIN_SPACING * layout::MIN_SPACING;
    let mut positions: Vec<Point> = Vec::with_capacity(total);

    for _ in 0..total {
        let mut placed = false;
        for _ in 0..layout::MAX_ATTEMPTS {
            let candidate = Vec2::new(rng.gen_range(-half..=half), rng.gen_range(-half..=half));
            if positions.iter().all(|p| p.distance_sq_to(candidate) >= min_sq) {
                positions.push(candidate);
                placed = true;
                break;
            }
        }
        if !placed {
            return Err(MapError::NoRoom(total));
        }
    }

    let mut planets = Vec::with_capacity(total);
    for (team, position) in setup.teams.iter().zip(&positions) {
        planets.push(home_planet(setup, *team, *position));
    }
    for (level, position) in levels.iter().zip(&positions[setup.teams.len()..]) {
        planets.push(neutral_planet(*level, *position));
    }
    Ok(WorldLayout { teams: setup.teams.clone(), planets })
}
