//! Planets and their ownership state machine
//!
//! Internally ownership is a tagged state: a neutral planet, a contested
//! one whose progress counts towards a capture, or an owned one with its
//! own tier progress. Flattened accessors (`level`, `health`, `upgrade`,
//! `owner`, `candidate_owner`) give the single-counter view that sync
//! consumers expect.

use tracing::debug;

use crate::game::constants::{self, planet::FULL};
use crate::game::state::{GameEvent, PlanetId, Team};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Neutral,
    /// Unowned but being captured by `candidate`
    Contested { candidate: Team, progress: u8 },
    Owned {
        owner: Team,
        level: u8,
        health: u8,
        /// Progress towards the next level
        upgrade: u8,
    },
}

/// What a unit arriving at a planet would do there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mission {
    Take,
    Hurt,
    Heal,
    Upgrade,
    None,
}

impl Mission {
    pub fn classify(planet: &Planet, team: Team) -> Mission {
        match planet.ownership {
            Ownership::Neutral | Ownership::Contested { .. } => Mission::Take,
            Ownership::Owned { owner, .. } if owner != team => Mission::Hurt,
            Ownership::Owned { health, .. } if health < FULL => Mission::Heal,
            Ownership::Owned { level, .. } if level < planet.max_level => Mission::Upgrade,
            Ownership::Owned { .. } => Mission::None,
        }
    }
}

/// Result of one unit arriving at a planet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Absorb {
    /// Whether the unit was used up
    pub consumed: bool,
    pub event: Option<GameEvent>,
}

impl Absorb {
    const IGNORED: Absorb = Absorb { consumed: false, event: None };
    const CONSUMED: Absorb = Absorb { consumed: true, event: None };

    fn with(event: GameEvent) -> Self {
        Self { consumed: true, event: Some(event) }
    }
}

#[derive(Debug, Clone)]
pub struct Planet {
    pub id: PlanetId,
    pub position: Vec2,
    pub max_level: u8,
    /// Visual rotation in radians; orbiting units follow it
    pub rotation: f32,
    ownership: Ownership,
}

impl Planet {
    pub fn new(id: PlanetId, position: Vec2, max_level: u8) -> Self {
        Self {
            id,
            position,
            max_level: max_level.max(1),
            rotation: 0.0,
            ownership: Ownership::Neutral,
        }
    }

    /// Planet that starts owned at `level` with full health
    pub fn owned(id: PlanetId, position: Vec2, max_level: u8, owner: Team, level: u8) -> Self {
        let mut planet = Self::new(id, position, max_level);
        planet.ownership = Ownership::Owned {
            owner,
            level: level.clamp(1, planet.max_level),
            health: FULL,
            upgrade: 0,
        };
        planet
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn set_ownership(&mut self, ownership: Ownership) {
        self.ownership = ownership;
    }

    pub fn owner(&self) -> Option<Team> {
        match self.ownership {
            Ownership::Owned { owner, .. } => Some(owner),
            _ => None,
        }
    }

    pub fn candidate_owner(&self) -> Option<Team> {
        match self.ownership {
            Ownership::Contested { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    /// 0 while unowned
    pub fn level(&self) -> u8 {
        match self.ownership {
            Ownership::Owned { level, .. } => level,
            _ => 0,
        }
    }

    /// 0 while unowned
    pub fn health(&self) -> u8 {
        match self.ownership {
            Ownership::Owned { health, .. } => health,
            _ => 0,
        }
    }

    /// Capture progress while contested, tier progress while owned
    pub fn upgrade(&self) -> u8 {
        match self.ownership {
            Ownership::Neutral => 0,
            Ownership::Contested { progress, .. } => progress,
            Ownership::Owned { upgrade, .. } => upgrade,
        }
    }

    pub fn radius(&self) -> f32 {
        constants::planet_radius(self.level())
    }

    pub fn orbit_distance(&self) -> f32 {
        constants::orbit_distance(self.level())
    }

    /// Advance visual rotation
    pub fn rotate(&mut self, dt_ms: f32) {
        self.rotation = (self.rotation + constants::planet::ROTATION_PER_MS * dt_ms)
            % std::f32::consts::TAU;
    }

    /// Apply one arriving unit of `team`
    pub fn absorb(&mut self, team: Team) -> Absorb {
        let (next, result) = match self.ownership {
            Ownership::Neutral => (
                Ownership::Contested { candidate: team, progress: 1 },
                Absorb::CONSUMED,
            ),
            Ownership::Contested { candidate, progress } if candidate == team => {
                if progress + 1 >= FULL {
                    debug!("{} captured by {}", self.id, team);
                    (
                        Ownership::Owned { owner: team, level: 1, health: FULL, upgrade: 0 },
                        Absorb::with(GameEvent::capture(team)),
                    )
                } else {
                    (
                        Ownership::Contested { candidate, progress: progress + 1 },
                        Absorb::CONSUMED,
                    )
                }
            }
            Ownership::Contested { candidate, progress } => {
                if progress <= 1 {
                    (Ownership::Neutral, Absorb::CONSUMED)
                } else {
                    (
                        Ownership::Contested { candidate, progress: progress - 1 },
                        Absorb::CONSUMED,
                    )
                }
            }
            Ownership::Owned { owner, level, health, upgrade } if owner == team => {
                if level < self.max_level && health == FULL {
                    if upgrade + 1 >= FULL {
                        debug!("{} upgraded to level {} by {}", self.id, level + 1, team);
                        (
                            Ownership::Owned { owner, level: level + 1, health, upgrade: 0 },
                            Absorb::with(GameEvent::upgrade(team)),
                        )
                    } else {
                        (
                            Ownership::Owned { owner, level, health, upgrade: upgrade + 1 },
                            Absorb::CONSUMED,
                        )
                    }
                } else if health < FULL {
                    (
                        Ownership::Owned { owner, level, health: health + 1, upgrade },
                        Absorb::CONSUMED,
                    )
                } else {
                    (self.ownership, Absorb::IGNORED)
                }
            }
            Ownership::Owned { owner, level, health, upgrade } => {
                if health <= 1 {
                    debug!("{} lost by {}", self.id, owner);
                    (Ownership::Neutral, Absorb::with(GameEvent::loss(owner)))
                } else {
                    (
                        Ownership::Owned { owner, level, health: health - 1, upgrade },
                        Absorb::CONSUMED,
                    )
                }
            }
        };
        self.ownership = next;
        result
    }
}
