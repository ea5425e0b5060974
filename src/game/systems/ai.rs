//! Autonomous players
//!
//! An `AiPlayer` wakes up on a randomised think timer and asks its
//! `Strategy` what to do. Strategies only read the world through a
//! `WorldView` and answer with `Intent`s; the game applies them afterwards.
//! All randomness comes from the RNG passed in, so a seeded game replays
//! the same decisions.

use std::cmp::Ordering;
use std::fmt;

use rand::{Rng, RngCore};
use tracing::trace;

use crate::config::{AiConfig, StrategyKind};
use crate::game::constants::{
    ai::{score, FRONTIER_GROWTH},
    planet,
    spatial::PLANET_TREE_CAPACITY,
};
use crate::game::planet::Planet;
use crate::game::spatial::QuadTree;
use crate::game::state::{PlanetId, Satellite, SatelliteId, Team, UnitRef};
use crate::util::pool::Pool;

/// Read-only world state handed to strategies
pub struct WorldView<'a> {
    pub planets: &'a [Planet],
    /// This tick's collision tree
    pub units: &'a QuadTree<UnitRef>,
    pub satellites: &'a Pool<Satellite>,
    /// Footprint radius used when indexing planets
    pub planet_radius: f32,
}

impl WorldView<'_> {
    /// Live units of `team` within selection range of `planet`
    pub fn selection(&self, planet: &Planet, team: Team) -> Vec<SatelliteId> {
        let mut found = Vec::new();
        self.around(planet, |unit| {
            if unit.owner == team {
                found.push(unit.id);
            }
        });
        found
    }

    /// Live units of any team within selection range of `planet`
    pub fn crowd(&self, planet: &Planet) -> usize {
        let mut count = 0;
        self.around(planet, |_| count += 1);
        count
    }

    fn around(&self, planet: &Planet, mut visit: impl FnMut(UnitRef)) {
        let radius = planet.orbit_distance() * planet::SELECTION_FACTOR;
        let radius_sq = radius * radius;
        self.units.query(planet.position, radius, |entry| {
            if let Some(sat) = self.satellites.get(entry.item.id) {
                if sat.position.distance_sq_to(planet.position) < radius_sq {
                    visit(entry.item);
                }
            }
        });
    }

    pub fn owned_by(&self, team: Team) -> Vec<&Planet> {
        self.planets.iter().filter(|p| p.owner() == Some(team)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upgrade,
    Heal,
    Conquer,
    Attack,
    Reinforce,
}

/// Send these units to that planet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: Action,
    pub satellites: Vec<SatelliteId>,
    pub target: PlanetId,
}

/// Decision policy for an autonomous player
pub trait Strategy: fmt::Debug + Send {
    fn think(&mut self, team: Team, view: &WorldView<'_>, rng: &mut dyn RngCore) -> Vec<Intent>;
}

/// Planets sorted nearest-first from `origin` by squared distance.
/// Stable, so equal distances keep list order.
fn nearest<'p>(candidates: &[&'p Planet], origin: &Planet) -> Option<&'p Planet> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| {
        let da = a.position.distance_sq_to(origin.position);
        let db = b.position.distance_sq_to(origin.position);
        da.partial_cmp(&db).unwrap_or(Ordering::Equal)
    });
    sorted.first().copied()
}

/// A random share of the group, never less than `min` (or all of it)
fn some_satellites(mut sats: Vec<SatelliteId>, min: usize, rng: &mut dyn RngCore) -> Vec<SatelliteId> {
    let share = (rng.gen::<f64>() * sats.len() as f64) as usize;
    sats.truncate(share.max(min));
    sats
}

#[inline]
fn roll(rng: &mut dyn RngCore, chance: f64) -> bool {
    rng.gen::<f64>() < chance
}

/// The shared priority chain: upgrade, heal, conquer, attack, reinforce.
/// The first action whose gate passes wins.
fn choose_action(
    config: &AiConfig,
    team: Team,
    home: &Planet,
    satellites: Vec<SatelliteId>,
    candidates: &[&Planet],
    own: &[&Planet],
    rng: &mut dyn RngCore,
) -> Option<Intent> {
    let min = config.min_satellites;

    if home.level() < home.max_level && roll(rng, config.upgrade_chance) {
        return Some(Intent { action: Action::Upgrade, satellites, target: home.id });
    }
    if home.health() < planet::FULL && roll(rng, config.heal_chance) {
        return Some(Intent {
            action: Action::Heal,
            satellites: some_satellites(satellites, min, rng),
            target: home.id,
        });
    }

    let open: Vec<&Planet> = candidates.iter().copied().filter(|p| p.owner().is_none()).collect();
    if !open.is_empty() && roll(rng, config.conquer_chance) {
        let target = nearest(&open, home)?;
        return Some(Intent {
            action: Action::Conquer,
            satellites: some_satellites(satellites, min, rng),
            target: target.id,
        });
    }

    let enemies: Vec<&Planet> = candidates
        .iter()
        .copied()
        .filter(|p| matches!(p.owner(), Some(owner) if owner != team))
        .collect();
    if !enemies.is_empty() && roll(rng, config.attack_chance) {
        let target = nearest(&enemies, home)?;
        return Some(Intent {
            action: Action::Attack,
            satellites: some_satellites(satellites, min, rng),
            target: target.id,
        });
    }

    let others: Vec<&Planet> = own.iter().copied().filter(|p| p.id != home.id).collect();
    if !others.is_empty() && roll(rng, config.transfer_chance) {
        let target = nearest(&others, home)?;
        return Some(Intent {
            action: Action::Reinforce,
            satellites: some_satellites(satellites, min, rng),
            target: target.id,
        });
    }

    None
}

/// Runs the priority chain for each of our planets against the whole map
#[derive(Debug, Clone)]
pub struct PriorityStrategy {
    config: AiConfig,
}

impl PriorityStrategy {
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }
}

impl Strategy for PriorityStrategy {
    fn think(&mut self, team: Team, view: &WorldView<'_>, rng: &mut dyn RngCore) -> Vec<Intent> {
        let own = view.owned_by(team);
        let all: Vec<&Planet> = view.planets.iter().collect();
        let mut intents = Vec::new();

        for home in &own {
            let sats = view.selection(home, team);
            if sats.len() < self.config.min_satellites {
                continue;
            }
            if let Some(intent) = choose_action(&self.config, team, home, sats, &all, &own, rng) {
                intents.push(intent);
            }
        }
        intents
    }
}

/// Like `PriorityStrategy`, but each planet only looks at the closest
/// planets it doesn't own. The search radius widens until it finds some.
#[derive(Debug)]
pub struct FrontierStrategy {
    config: AiConfig,
    planet_tree: QuadTree<PlanetId>,
}

impl FrontierStrategy {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            planet_tree: QuadTree::new(PLANET_TREE_CAPACITY),
        }
    }

    fn frontier<'p>(&self, view: &WorldView<'p>, home: &Planet, team: Team) -> Vec<&'p Planet> {
        let mut targets = Vec::new();
        let mut radius = view.planet_radius.max(1.0);
        while targets.is_empty() && radius.is_finite() {
            self.planet_tree.query(home.position, radius, |entry| {
                if let Some(p) = view.planets.get(entry.item.index()) {
                    if p.owner() != Some(team) {
                        targets.push(p);
                    }
                }
            });
            radius *= FRONTIER_GROWTH;
        }
        targets
    }
}

impl Strategy for FrontierStrategy {
    fn think(&mut self, team: Team, view: &WorldView<'_>, rng: &mut dyn RngCore) -> Vec<Intent> {
        let own = view.owned_by(team);
        if own.is_empty() || own.len() == view.planets.len() {
            return Vec::new();
        }

        self.planet_tree.clear();
        for p in view.planets {
            self.planet_tree.insert(p.id, p.position, view.planet_radius);
        }
        self.planet_tree.build();

        let mut intents = Vec::new();
        for home in &own {
            let sats = view.selection(home, team);
            if sats.len() < self.config.min_satellites {
                continue;
            }
            let targets = self.frontier(view, home, team);
            if let Some(intent) = choose_action(&self.config, team, home, sats, &targets, &own, rng) {
                intents.push(intent);
            }
        }
        intents
    }
}

/// Scores every planet near each position we hold or could take and sends
/// part of the local force to the best one. The fuller a group gets
/// relative to `min_satellites`, the likelier it moves.
#[derive(Debug, Clone)]
pub struct ScoringStrategy {
    config: AiConfig,
}

impl ScoringStrategy {
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    /// Desirability of moving `mine` units to `target`, damped by squared
    /// distance. `crowd` counts every unit already around the target.
    pub fn score(team: Team, target: &Planet, distance_sq: f32, mine: usize, crowd: usize) -> f32 {
        let mine = mine as f32;
        let max_gap = |a: f32, b: f32| a.max(b - a);
        let upgrade = target.upgrade() as f32;
        let owned = target.owner() == Some(team);

        let mut total = 0.0;
        if owned && target.health() < planet::FULL {
            total += score::HEAL * max_gap((planet::FULL - target.health()) as f32, mine);
        }
        if owned && target.level() < target.max_level {
            total += score::UPGRADE * max_gap(upgrade, mine);
        }
        if target.candidate_owner() == Some(team) {
            total += score::OWN_CANDIDACY * max_gap(upgrade, mine);
        } else {
            total -= score::RIVAL_PROGRESS * upgrade;
        }
        if target.owner().is_none() {
            total += score::OPEN * max_gap(upgrade, mine);
            total += score::MAX_LEVEL * target.max_level as f32;
        }
        if !owned {
            total += score::SUPERIORITY * (mine - crowd as f32);
        }

        if distance_sq == 0.0 {
            total
        } else {
            total / distance_sq
        }
    }

    fn action_for(team: Team, target: &Planet) -> Action {
        match target.owner() {
            None => Action::Conquer,
            Some(owner) if owner != team => Action::Attack,
            Some(_) if target.health() < planet::FULL => Action::Heal,
            Some(_) if target.level() < target.max_level => Action::Upgrade,
            Some(_) => Action::Reinforce,
        }
    }
}

impl Strategy for ScoringStrategy {
    fn think(&mut self, team: Team, view: &WorldView<'_>, rng: &mut dyn RngCore) -> Vec<Intent> {
        if view.planets.iter().all(|p| p.owner() == Some(team)) {
            return Vec::new();
        }
        let crowd: Vec<usize> = view.planets.iter().map(|p| view.crowd(p)).collect();
        let min = self.config.min_satellites;

        let mut intents = Vec::new();
        for home in view.planets {
            if matches!(home.owner(), Some(owner) if owner != team) {
                continue;
            }
            let sats = view.selection(home, team);
            if sats.is_empty() {
                continue;
            }
            if min > 0 && rng.gen::<f64>() > sats.len() as f64 / min as f64 {
                continue;
            }

            let mut neighbours: Vec<(usize, f32)> = view
                .planets
                .iter()
                .enumerate()
                .map(|(i, p)| (i, p.position.distance_sq_to(home.position)))
                .collect();
            neighbours.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

            let mut best: Option<(&Planet, f32)> = None;
            for (i, distance_sq) in neighbours {
                let target = &view.planets[i];
                let value = Self::score(team, target, distance_sq, sats.len(), crowd[i]);
                if best.map_or(true, |(_, top)| value > top) {
                    best = Some((target, value));
                }
            }
            if let Some((target, _)) = best {
                intents.push(Intent {
                    action: Self::action_for(team, target),
                    satellites: some_satellites(sats, min, rng),
                    target: target.id,
                });
            }
        }
        intents
    }
}

/// Strategy plus think timer
#[derive(Debug)]
pub struct AiPlayer {
    strategy: Box<dyn Strategy>,
    min_gap_ms: f64,
    max_gap_ms: f64,
    next_think_ms: f64,
    /// Disabled players never think (e.g. a human took the team over)
    pub enabled: bool,
}

impl AiPlayer {
    pub fn new(strategy: Box<dyn Strategy>, config: &AiConfig) -> Self {
        let min_gap_ms = config.min_think_gap_ms.max(0.0);
        Self {
            strategy,
            min_gap_ms,
            max_gap_ms: config.max_think_gap_ms.max(min_gap_ms),
            next_think_ms: 0.0,
            enabled: true,
        }
    }

    pub fn with_kind(kind: StrategyKind, config: &AiConfig) -> Self {
        let strategy: Box<dyn Strategy> = match kind {
            StrategyKind::Priority => Box::new(PriorityStrategy::new(config.clone())),
            StrategyKind::Frontier => Box::new(FrontierStrategy::new(config.clone())),
            StrategyKind::Scoring => Box::new(ScoringStrategy::new(config.clone())),
        };
        Self::new(strategy, config)
    }

    /// Count down the think timer; on expiry re-arm it and return true
    pub fn should_think(&mut self, elapsed_ms: f64, rng: &mut dyn RngCore) -> bool {
        if !self.enabled {
            return false;
        }
        self.next_think_ms -= elapsed_ms;
        if self.next_think_ms > 0.0 {
            return false;
        }
        self.next_think_ms = if self.max_gap_ms > self.min_gap_ms {
            rng.gen_range(self.min_gap_ms..self.max_gap_ms)
        } else {
            self.min_gap_ms
        };
        true
    }

    pub fn tick(
        &mut self,
        team: Team,
        elapsed_ms: f64,
        view: &WorldView<'_>,
        rng: &mut dyn RngCore,
    ) -> Vec<Intent> {
        if !self.should_think(elapsed_ms, rng) {
            return Vec::new();
        }
        let intents = self.strategy.think(team, view, rng);
        for intent in &intents {
            trace!(
                "{} {:?} -> {} with {} units",
                team,
                intent.action,
                intent.target,
                intent.satellites.len()
            );
        }
        intents
    }
}
