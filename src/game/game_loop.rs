//! Simulation clock
//!
//! `Game` owns every planet, unit, player and the collision tree. A tick
//! runs, in order: planet rotation, unit movement (inserting each unit into
//! the tree first), autonomous players, collisions, and once per simulated
//! second production plus a snapshot flush.

use hashbrown::HashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::{AdminConfig, GameConfig};
use crate::game::constants::simulation::{MAX_SUB_TICK_MS, PULSE_MS};
use crate::game::map::{self, GameMap, MapError};
use crate::game::planet::Planet;
use crate::game::spatial::QuadTree;
use crate::game::state::{
    EntityId, GameEvent, GameStateSnapshot, PlanetId, Player, RemovedSatellite, Satellite,
    SatelliteId, Team, UnitRef,
};
use crate::game::systems::ai::{AiPlayer, Intent, WorldView};
use crate::game::systems::movement::{Body, MoveContext, Mover, Step};
use crate::game::systems::{collision, production};
use crate::util::pool::Pool;
use crate::util::vec2::{Point, Vec2};

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Ticks do nothing until `start`
    Waiting,
    Running,
}

/// What a `tick` call produced
#[derive(Debug, Clone, Default)]
pub struct TickResult {
    /// Simulated milliseconds this call (after game speed)
    pub elapsed_ms: f64,
    /// Match clock; negative during the countdown
    pub game_time_ms: f64,
    /// Units removed since the caller last drained this list
    pub removed: Vec<RemovedSatellite>,
    /// Units produced this call
    pub spawned: usize,
    /// Snapshot flushed this call, if any
    pub log: Option<GameStateSnapshot>,
}

/// An entity as seen by sync consumers
#[derive(Debug, Clone, Copy)]
pub enum EntityView<'a> {
    Planet(&'a Planet),
    Satellite(SatelliteId, &'a Satellite),
}

impl EntityView<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            EntityView::Planet(_) => "Planet",
            EntityView::Satellite(..) => "Satellite",
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            EntityView::Planet(p) => EntityId::Planet(p.id),
            EntityView::Satellite(id, _) => EntityId::Satellite(*id),
        }
    }
}

pub struct Game {
    config: GameConfig,
    map: GameMap,
    phase: MatchPhase,
    players: Vec<Player>,
    planets: Vec<Planet>,
    /// Units each planet starts with, by planet index
    initial_units: Vec<u32>,
    satellites: Pool<Satellite>,
    collision_tree: QuadTree<UnitRef>,
    game_time_ms: f64,
    last_pulse_second: i64,
    /// Events since the last snapshot
    events: Vec<GameEvent>,
    log: Vec<GameStateSnapshot>,
    rng: ChaCha8Rng,
    result: TickResult,
    intents: Vec<(Team, Intent)>,
}

impl Game {
    /// Build a waiting game from a map. Fails only on a malformed map.
    pub fn new(config: GameConfig, map: GameMap) -> Result<Self, MapError> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let collision_tree = QuadTree::with_depth(config.node_capacity, config.max_depth);
        let mut game = Self {
            config,
            map: map.clone(),
            phase: MatchPhase::Waiting,
            players: Vec::new(),
            planets: Vec::new(),
            initial_units: Vec::new(),
            satellites: Pool::new(),
            collision_tree,
            game_time_ms: 0.0,
            last_pulse_second: 0,
            events: Vec::new(),
            log: Vec::new(),
            rng,
            result: TickResult::default(),
            intents: Vec::new(),
        };
        game.load_map(map)?;
        Ok(game)
    }

    /// Replace the layout and players. Ignored once the match is running.
    pub fn load_map(&mut self, map: GameMap) -> Result<(), MapError> {
        if self.phase == MatchPhase::Running {
            warn!("Ignoring map '{}': match already running", map.props.name);
            return Ok(());
        }
        let layout = map.layout(&mut self.rng)?;
        layout.check_bounds(self.config.max_world)?;

        self.planets = layout
            .planets
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let id = PlanetId(i as u32);
                match spec.owner_team {
                    Some(team) => Planet::owned(id, spec.position, spec.max_level, team, spec.level),
                    None => Planet::new(id, spec.position, spec.max_level),
                }
            })
            .collect();
        self.initial_units = layout.planets.iter().map(|p| p.initial_unit_count).collect();
        self.players = layout
            .teams
            .iter()
            .map(|&team| {
                let ai = AiPlayer::with_kind(self.config.strategy, &self.config.ai);
                Player::new(team, Some(ai))
            })
            .collect();
        self.satellites.release_all();
        self.collision_tree.clear();

        info!(
            "Loaded map '{}': {} planets, {} players",
            map.props.name,
            self.planets.len(),
            self.players.len()
        );
        self.map = map;
        Ok(())
    }

    /// Spawn starting units and begin the countdown
    pub fn start(&mut self, countdown_seconds: f64) {
        if self.phase == MatchPhase::Running {
            warn!("start() called on a running match");
            return;
        }

        self.satellites.release_all();
        self.collision_tree.clear();
        self.events.clear();
        self.log.clear();
        self.result = TickResult::default();

        let max_speed = self.config.steering.max_speed;
        for (planet, &count) in self.planets.iter().zip(&self.initial_units) {
            let Some(owner) = planet.owner() else {
                continue;
            };
            for _ in 0..count {
                let spawned = production::spawn_at(
                    planet,
                    owner,
                    &mut self.satellites,
                    self.config.max_satellites,
                    max_speed,
                    &mut self.rng,
                );
                if spawned.is_none() {
                    break;
                }
            }
        }

        let countdown = if countdown_seconds.is_finite() { countdown_seconds.max(0.0) } else { 0.0 };
        self.game_time_ms = -countdown * 1000.0;
        self.result.game_time_ms = self.game_time_ms;
        self.last_pulse_second = 0;
        self.phase = MatchPhase::Running;
        info!(
            "Match started: {} planets, {} units, {:.1}s countdown",
            self.planets.len(),
            self.satellites.len(),
            countdown
        );
    }

    /// Advance the simulation by `elapsed_ms` of wall time.
    ///
    /// The time is scaled by the game speed and fed through in sub-ticks of
    /// at most `max_sub_tick_ms`. `removed` keeps accumulating until the
    /// caller drains it.
    pub fn tick(&mut self, elapsed_ms: f64) -> &mut TickResult {
        self.result.elapsed_ms = 0.0;
        self.result.spawned = 0;
        self.result.log = None;

        if self.phase == MatchPhase::Waiting || !(elapsed_ms > 0.0) || !elapsed_ms.is_finite() {
            self.result.game_time_ms = self.game_time_ms;
            return &mut self.result;
        }

        let scaled = elapsed_ms * self.config.game_speed as f64;
        let max_step = if self.config.max_sub_tick_ms > 0.0 {
            self.config.max_sub_tick_ms
        } else {
            MAX_SUB_TICK_MS
        };
        let mut remaining = scaled;
        while remaining > 0.0 {
            let step = remaining.min(max_step);
            self.sub_tick(step);
            remaining -= step;
        }

        self.result.elapsed_ms = scaled;
        self.result.game_time_ms = self.game_time_ms;
        &mut self.result
    }

    fn sub_tick(&mut self, dt_ms: f64) {
        let counting_down = self.game_time_ms < 0.0;
        self.game_time_ms += dt_ms;
        if counting_down {
            return;
        }
        let dt = dt_ms as f32;

        self.collision_tree.clear();
        for planet in &mut self.planets {
            planet.rotate(dt);
        }
        self.advance_units(dt);
        self.collision_tree.build();
        self.think(dt_ms);
        collision::resolve(
            &mut self.collision_tree,
            &mut self.satellites,
            self.config.collision_radius,
            &mut self.result.removed,
        );

        let second = (self.game_time_ms / PULSE_MS).floor() as i64;
        if second > self.last_pulse_second {
            self.last_pulse_second = second;
            self.result.spawned += production::pulse(
                &self.planets,
                &mut self.satellites,
                self.config.pulse_rate,
                self.config.max_satellites,
                self.config.steering.max_speed,
                &mut self.rng,
            );
            self.flush_snapshot(second);
        }
    }

    /// Insert, steer and integrate every live unit
    fn advance_units(&mut self, dt_ms: f32) {
        let dt_seconds = dt_ms / 1000.0;
        let max_world = self.config.max_world;
        let radius = self.config.collision_radius;
        let mut ctx = MoveContext {
            planets: &mut self.planets,
            events: &mut self.events,
            rng: &mut self.rng,
            steering: &self.config.steering,
            dt_ms,
        };

        for index in 0..self.satellites.slot_count() {
            let Some(id) = self.satellites.id_at(index) else {
                continue;
            };
            let Some(sat) = self.satellites.get_mut(id) else {
                continue;
            };
            let Some(owner) = sat.owner else {
                continue;
            };

            self.collision_tree.insert(UnitRef { id, owner }, sat.position, radius);

            let mut body = Body {
                owner,
                position: sat.position,
                velocity: &mut sat.velocity,
                noise: sat.noise,
            };
            let step = sat.mover.evaluate(&mut body, &mut ctx);
            sat.position += sat.velocity * dt_seconds;
            let position = sat.position;

            let destroyed_by = match step {
                Step::Consumed(planet) => Some(Some(EntityId::Planet(planet))),
                _ if !in_bounds(position, max_world) => Some(None),
                _ => None,
            };
            if let Some(destroyed_by) = destroyed_by {
                self.satellites.release(id);
                self.result.removed.push(RemovedSatellite { id, owner, position, destroyed_by });
            }
        }
    }

    /// Let each autonomous player decide, then apply their intents
    fn think(&mut self, dt_ms: f64) {
        let view = WorldView {
            planets: &self.planets,
            units: &self.collision_tree,
            satellites: &self.satellites,
            planet_radius: self.config.steering.planet_radius,
        };
        let mut intents = std::mem::take(&mut self.intents);
        for player in &mut self.players {
            let team = player.team;
            if let Some(ai) = player.ai.as_mut() {
                intents.extend(
                    ai.tick(team, dt_ms, &view, &mut self.rng)
                        .into_iter()
                        .map(|intent| (team, intent)),
                );
            }
        }
        for (team, intent) in intents.drain(..) {
            self.move_to_planet(team, &intent.satellites, intent.target);
        }
        self.intents = intents;
    }

    fn flush_snapshot(&mut self, second: i64) {
        let snapshot = GameStateSnapshot {
            time: second.max(0) as u32,
            satellite_counts: self.team_counts(),
            events: std::mem::take(&mut self.events),
        };
        debug!(
            "Snapshot t={}s: {} units, {} events",
            snapshot.time,
            self.satellites.len(),
            snapshot.events.len()
        );
        self.log.push(snapshot.clone());
        self.result.log = Some(snapshot);
    }

    /// Send `team`'s units towards `destination`.
    ///
    /// Ids that are malformed, dead or owned by another team are dropped.
    /// Returns how many units were redirected.
    pub fn submit_move<I, S>(&mut self, team: Team, ids: I, destination: Point) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed: Vec<SatelliteId> = ids
            .into_iter()
            .filter_map(|id| id.as_ref().parse().ok())
            .collect();
        self.move_satellites(team, &parsed, destination)
    }

    /// Typed form of `submit_move`
    pub fn move_satellites(&mut self, team: Team, ids: &[SatelliteId], destination: Point) -> usize {
        if self.phase != MatchPhase::Running || !destination.is_finite() {
            debug!("Dropped move from {}: match not running or bad destination", team);
            return 0;
        }
        match self.planet_near(destination) {
            Some(planet) => self.move_to_planet(team, ids, planet),
            None => {
                let mut moved = 0;
                for &id in ids {
                    let Some(sat) = self.satellites.get_mut(id) else {
                        continue;
                    };
                    if sat.owner != Some(team) {
                        continue;
                    }
                    sat.mover = Mover::to_point(destination, &mut self.rng);
                    moved += 1;
                }
                if moved < ids.len() {
                    debug!("Move from {}: {} of {} units accepted", team, moved, ids.len());
                }
                moved
            }
        }
    }

    fn move_to_planet(&mut self, team: Team, ids: &[SatelliteId], planet: PlanetId) -> usize {
        let Some(planet) = self.planets.get(planet.index()) else {
            return 0;
        };
        let mut moved = 0;
        for &id in ids {
            let Some(sat) = self.satellites.get_mut(id) else {
                continue;
            };
            if sat.owner != Some(team) {
                continue;
            }
            sat.mover = Mover::to_planet(planet, team, &mut self.rng);
            moved += 1;
        }
        moved
    }

    /// Closest planet within touch range of `point`
    fn planet_near(&self, point: Point) -> Option<PlanetId> {
        let touch = self.config.steering.planet_radius;
        self.planets
            .iter()
            .map(|p| (p.id, p.position.distance_sq_to(point)))
            .filter(|(_, d)| *d < touch * touch)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, _)| id)
    }

    /// Apply an admin message. After start only game speed and pulse rate
    /// change; before start everything does, including the map.
    pub fn apply_config(&mut self, admin: &AdminConfig) -> Result<(), MapError> {
        if admin.game_speed > 0.0 && admin.game_speed.is_finite() {
            self.config.game_speed = admin.game_speed;
        } else {
            warn!("Ignoring invalid game speed {}", admin.game_speed);
        }
        if admin.pulse_rate > 0 {
            self.config.pulse_rate = admin.pulse_rate;
        }
        if self.phase == MatchPhase::Running {
            info!(
                "Live config: speed {} pulse rate {}",
                self.config.game_speed, self.config.pulse_rate
            );
            return Ok(());
        }

        let previous_world = self.config.max_world;
        if admin.max_world > 0.0 && admin.max_world.is_finite() {
            self.config.max_world = admin.max_world;
        }
        let loaded = match &admin.game_map {
            Some(json) => GameMap::from_json(json).and_then(|map| self.load_map(map)),
            None => self.check_bounds(),
        };
        if let Err(e) = loaded {
            self.config.max_world = previous_world;
            return Err(e);
        }
        self.config.allow_coop = admin.allow_coop;
        self.config.max_players = admin.max_players;
        self.config.colours = admin.colours.clone();

        if admin.start_game {
            self.start(admin.warmup_seconds);
        }
        Ok(())
    }

    /// Current planets against the configured world edge
    fn check_bounds(&self) -> Result<(), MapError> {
        match self
            .planets
            .iter()
            .position(|p| !map::fits_world(p.position, p.max_level, self.config.max_world))
        {
            Some(index) => Err(MapError::OutOfBounds { index, max_world: self.config.max_world }),
            None => Ok(()),
        }
    }

    /// Turn a team's autonomous player on or off. False if the team has none.
    pub fn set_ai_enabled(&mut self, team: Team, enabled: bool) -> bool {
        let ai = self
            .players
            .iter_mut()
            .find(|p| p.team == team)
            .and_then(|p| p.ai.as_mut());
        match ai {
            Some(ai) => {
                ai.enabled = enabled;
                info!("AI for {} {}", team, if enabled { "enabled" } else { "disabled" });
                true
            }
            None => false,
        }
    }

    /// Visit every planet, then every live unit
    pub fn for_each_entity(&self, mut visit: impl FnMut(EntityView<'_>)) {
        for planet in &self.planets {
            visit(EntityView::Planet(planet));
        }
        for (id, sat) in self.satellites.iter() {
            visit(EntityView::Satellite(id, sat));
        }
    }

    /// Place a unit directly, bypassing production. Respects the unit cap.
    pub fn spawn_satellite(&mut self, team: Team, position: Point) -> Option<SatelliteId> {
        if self.satellites.len() >= self.config.max_satellites || !position.is_finite() {
            return None;
        }
        let (id, sat) = self.satellites.take();
        sat.reset(team, position, Vec2::ZERO, 1.0, Mover::Idle);
        Some(id)
    }

    /// Live units per team, including teams with none
    pub fn team_counts(&self) -> HashMap<Team, u32> {
        let mut counts: HashMap<Team, u32> = self.players.iter().map(|p| (p.team, 0)).collect();
        for (_, sat) in self.satellites.iter() {
            if let Some(owner) = sat.owner {
                *counts.entry(owner).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == MatchPhase::Running
    }

    pub fn game_time_ms(&self) -> f64 {
        self.game_time_ms
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, team: Team) -> Option<&Player> {
        self.players.iter().find(|p| p.team == team)
    }

    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    pub fn planet(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(id.index())
    }

    pub fn satellites(&self) -> &Pool<Satellite> {
        &self.satellites
    }

    pub fn satellite(&self, id: SatelliteId) -> Option<&Satellite> {
        self.satellites.get(id)
    }

    pub fn satellite_count(&self) -> usize {
        self.satellites.len()
    }

    /// Snapshots flushed so far, oldest first
    pub fn log(&self) -> &[GameStateSnapshot] {
        &self.log
    }

    pub fn last_result(&self) -> &TickResult {
        &self.result
    }

    pub fn collision_tree(&self) -> &QuadTree<UnitRef> {
        &self.collision_tree
    }
}

#[inline]
fn in_bounds(position: Vec2, max_world: f32) -> bool {
    position.is_finite() && position.x.abs() <= max_world && position.y.abs() <= max_world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::PlanetSpec;
    use crate::game::map::{LayoutFunction, MapProps, MapSetup};
    use crate::game::systems::movement::Leg;

    fn duel_map() -> GameMap {
        GameMap {
            props: MapProps { name: "Duel".to_string(), image: String::new() },
            setup: None,
            planets: Some(vec![
                PlanetSpec {
                    owner_team: Some(Team::Red),
                    initial_unit_count: 5,
                    level: 1,
                    max_level: 3,
                    position: Vec2::new(-500.0, 0.0),
                },
                PlanetSpec {
                    owner_team: Some(Team::Blue),
                    initial_unit_count: 5,
                    level: 1,
                    max_level: 3,
                    position: Vec2::new(500.0, 0.0),
                },
                PlanetSpec {
                    owner_team: None,
                    initial_unit_count: 0,
                    level: 0,
                    max_level: 2,
                    position: Vec2::new(0.0, 600.0),
                },
            ]),
        }
    }

    fn quiet_game() -> Game {
        let mut game = Game::new(GameConfig::default(), duel_map()).unwrap();
        game.set_ai_enabled(Team::Red, false);
        game.set_ai_enabled(Team::Blue, false);
        game
    }

    #[test]
    fn test_new_game_is_waiting() {
        let mut game = quiet_game();
        assert_eq!(game.phase(), MatchPhase::Waiting);
        assert_eq!(game.planets().len(), 3);
        assert_eq!(game.players().len(), 2);
        let result = game.tick(1000.0);
        assert_eq!(result.elapsed_ms, 0.0);
        assert_eq!(game.satellite_count(), 0);
    }

    #[test]
    fn test_start_spawns_initial_units() {
        let mut game = quiet_game();
        game.start(0.0);
        assert!(game.is_running());
        assert_eq!(game.satellite_count(), 10);
        assert_eq!(game.team_counts().get(&Team::Red), Some(&5));
    }

    #[test]
    fn test_countdown_only_advances_clock() {
        let mut game = quiet_game();
        game.start(2.0);
        let before: Vec<_> = game.satellites.iter().map(|(id, s)| (id, s.position)).collect();

        for _ in 0..10 {
            game.tick(100.0);
        }
        assert!((game.game_time_ms() - -1000.0).abs() < 1e-6);
        let after: Vec<_> = game.satellites.iter().map(|(id, s)| (id, s.position)).collect();
        assert_eq!(before, after);
        assert!(game.planets().iter().all(|p| p.rotation == 0.0));
    }

    #[test]
    fn test_large_gap_is_sub_ticked() {
        let mut game = quiet_game();
        game.start(0.0);
        let result = game.tick(5000.0);
        assert_eq!(result.elapsed_ms, 5000.0);
        assert_eq!(game.log().len(), 5);
        assert_eq!(game.log().last().map(|s| s.time), Some(5));
        assert_eq!(game.last_result().log.as_ref().map(|s| s.time), Some(5));
    }

    #[test]
    fn test_game_speed_scales_time() {
        let mut game = quiet_game();
        game.apply_config(&AdminConfig { game_speed: 2.0, ..AdminConfig::default() }).unwrap();
        game.start(0.0);
        game.tick(500.0);
        assert!((game.game_time_ms() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_pulse_produces_and_snapshots() {
        let mut game = quiet_game();
        game.start(0.0);
        let mut spawned = 0;
        let mut snapshot = None;
        for _ in 0..63 {
            let result = game.tick(16.0);
            spawned += result.spawned;
            if let Some(log) = result.log.take() {
                snapshot = Some(log);
            }
        }
        assert_eq!(spawned, 2);
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.time, 1);
        assert_eq!(snapshot.satellite_counts.get(&Team::Red), Some(&6));
    }

    #[test]
    fn test_move_filters_foreign_units() {
        let mut game = quiet_game();
        game.start(0.0);
        let red = game.spawn_satellite(Team::Red, Vec2::new(-400.0, 0.0)).unwrap();
        let blue = game.spawn_satellite(Team::Blue, Vec2::new(400.0, 0.0)).unwrap();

        let moved = game.submit_move(
            Team::Red,
            [red.to_string(), blue.to_string(), "garbage".to_string()],
            Vec2::new(0.0, -300.0),
        );
        assert_eq!(moved, 1);
        assert!(matches!(game.satellite(red).unwrap().mover, Mover::Sequence(_)));
        assert_eq!(game.satellite(blue).unwrap().mover, Mover::Idle);
    }

    #[test]
    fn test_move_near_planet_targets_planet() {
        let mut game = quiet_game();
        game.start(0.0);
        let red = game.spawn_satellite(Team::Red, Vec2::new(-400.0, 0.0)).unwrap();
        game.move_satellites(Team::Red, &[red], Vec2::new(10.0, 590.0));

        match &game.satellite(red).unwrap().mover {
            Mover::Sequence(seq) => match seq.current() {
                Some(Leg::Point(point)) => {
                    assert_eq!(point.target, crate::game::systems::movement::Target::Planet(PlanetId(2)))
                }
                other => panic!("unexpected leg {:?}", other),
            },
            other => panic!("unexpected mover {:?}", other),
        }
    }

    #[test]
    fn test_move_before_start_is_dropped() {
        let mut game = quiet_game();
        let red = game.spawn_satellite(Team::Red, Vec2::ZERO).unwrap();
        assert_eq!(game.move_satellites(Team::Red, &[red], Vec2::new(100.0, 0.0)), 0);
    }

    #[test]
    fn test_out_of_bounds_removed_without_cause() {
        let mut game = quiet_game();
        game.start(0.0);
        let far = game.spawn_satellite(Team::Red, Vec2::new(game.config().max_world + 10.0, 0.0)).unwrap();
        let result = game.tick(16.0);
        let removed: Vec<_> = result.removed.drain(..).collect();
        assert!(removed.iter().any(|r| r.id == far && r.destroyed_by.is_none()));
        assert!(game.satellite(far).is_none());
    }

    #[test]
    fn test_opposing_units_collide() {
        let mut game = quiet_game();
        game.start(0.0);
        let a = game.spawn_satellite(Team::Red, Vec2::new(0.0, -300.0)).unwrap();
        let b = game.spawn_satellite(Team::Blue, Vec2::new(1.0, -300.0)).unwrap();

        let removed: Vec<_> = game.tick(16.0).removed.drain(..).collect();
        let ra = removed.iter().find(|r| r.id == a).unwrap();
        let rb = removed.iter().find(|r| r.id == b).unwrap();
        assert_eq!(ra.destroyed_by, Some(EntityId::Satellite(b)));
        assert_eq!(rb.destroyed_by, Some(EntityId::Satellite(a)));
    }

    #[test]
    fn test_live_config_only_changes_speed_and_pulse() {
        let mut game = quiet_game();
        game.start(0.0);
        let admin = AdminConfig {
            game_speed: 3.0,
            pulse_rate: 4,
            max_world: 10.0,
            game_map: Some(serde_json::to_string(&GameMap::skirmish()).unwrap()),
            ..AdminConfig::default()
        };
        game.apply_config(&admin).unwrap();
        assert_eq!(game.config().game_speed, 3.0);
        assert_eq!(game.config().pulse_rate, 4);
        assert_ne!(game.config().max_world, 10.0);
        assert_eq!(game.planets().len(), 3);
    }

    #[test]
    fn test_config_before_start_replaces_map() {
        let mut game = quiet_game();
        let admin = AdminConfig {
            game_map: Some(serde_json::to_string(&GameMap::skirmish()).unwrap()),
            start_game: true,
            warmup_seconds: 1.0,
            ..AdminConfig::default()
        };
        game.apply_config(&admin).unwrap();
        assert_eq!(game.planets().len(), 4);
        assert_eq!(game.players().len(), 3);
        assert!(game.is_running());
        assert!((game.game_time_ms() - -1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_bad_map_in_config_is_an_error() {
        let mut game = quiet_game();
        let admin = AdminConfig { game_map: Some("{\"props\":{}}".to_string()), ..AdminConfig::default() };
        assert!(game.apply_config(&admin).is_err());
        assert_eq!(game.planets().len(), 3);
    }

    fn wide_circle_map() -> GameMap {
        GameMap {
            props: MapProps { name: "Wide".to_string(), image: String::new() },
            setup: Some(MapSetup {
                layout_function: LayoutFunction::Circle,
                initial_unit_count: 50,
                world_size: 12_000.0,
                teams: vec![Team::Red, Team::Blue],
                planet_counts_by_level: Vec::new(),
            }),
            planets: None,
        }
    }

    #[test]
    fn test_layout_past_world_edge_rejected() {
        let result = Game::new(GameConfig::default(), wide_circle_map());
        assert!(matches!(result, Err(MapError::OutOfBounds { index: 0, .. })));

        let config = GameConfig { max_world: 6000.0, ..GameConfig::default() };
        let mut game = Game::new(config, wide_circle_map()).unwrap();
        game.set_ai_enabled(Team::Red, false);
        game.set_ai_enabled(Team::Blue, false);
        game.start(0.0);
        assert_eq!(game.satellite_count(), 100);
        assert!(game.tick(16.0).removed.is_empty());
        assert_eq!(game.satellite_count(), 100);
    }

    #[test]
    fn test_shrinking_world_under_planets_rejected() {
        let mut game = quiet_game();
        let admin = AdminConfig { max_world: 500.0, allow_coop: true, ..AdminConfig::default() };
        assert!(matches!(game.apply_config(&admin), Err(MapError::OutOfBounds { index: 0, .. })));
        assert_eq!(game.config().max_world, GameConfig::default().max_world);
        assert!(!game.config().allow_coop);
    }

    #[test]
    fn test_set_ai_enabled() {
        let mut game = quiet_game();
        assert!(game.set_ai_enabled(Team::Red, true));
        assert!(game.player(Team::Red).and_then(|p| p.ai.as_ref()).map(|ai| ai.enabled).unwrap_or(false));
        assert!(!game.set_ai_enabled(Team::Yellow, true));
    }

    #[test]
    fn test_disabling_ai_hands_team_to_a_human() {
        let mut game = Game::new(GameConfig::default(), duel_map()).unwrap();
        assert!(!game.player(Team::Red).map_or(true, |p| p.is_human()));

        game.set_ai_enabled(Team::Red, false);
        assert!(game.player(Team::Red).map_or(false, |p| p.is_human()));
        assert!(!game.player(Team::Blue).map_or(true, |p| p.is_human()));

        game.set_ai_enabled(Team::Red, true);
        assert!(!game.player(Team::Red).map_or(true, |p| p.is_human()));
    }

    #[test]
    fn test_for_each_entity_planets_first() {
        let mut game = quiet_game();
        game.start(0.0);
        let mut kinds = Vec::new();
        let mut ids = Vec::new();
        game.for_each_entity(|e| {
            kinds.push(e.type_name());
            ids.push(e.id().to_string());
        });
        assert_eq!(&kinds[..3], &["Planet", "Planet", "Planet"]);
        assert!(kinds[3..].iter().all(|k| *k == "Satellite"));
        assert_eq!(ids[0], "planet-0");
        assert_eq!(kinds.len(), 13);
    }
}
