//! End-to-end simulation properties

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use satellite_siege::config::{GameConfig, StrategyKind};
use satellite_siege::game::constants::planet::FULL;
use satellite_siege::game::game_loop::{EntityView, Game};
use satellite_siege::game::map::{GameMap, MapError};
use satellite_siege::game::planet::{Ownership, Planet};
use satellite_siege::game::spatial::QuadTree;
use satellite_siege::game::state::{EntityId, EventKind, GameEvent, PlanetId, Team};
use satellite_siege::game::sync::SyncState;
use satellite_siege::util::vec2::Vec2;

const CONTEST_MAP: &str = r#"{
    "props": { "name": "Contest" },
    "planets": [
        { "ownerTeam": "red", "level": 1, "position": { "x": -800, "y": 0 } },
        { "ownerTeam": "blue", "level": 1, "position": { "x": 800, "y": 0 } },
        { "level": 0, "maxLevel": 3, "position": { "x": 0, "y": 0 } }
    ]
}"#;

fn contest_game() -> Game {
    let map = GameMap::from_json(CONTEST_MAP).unwrap();
    let mut game = Game::new(GameConfig::default(), map).unwrap();
    game.set_ai_enabled(Team::Red, false);
    game.set_ai_enabled(Team::Blue, false);
    game.start(0.0);
    game
}

fn seeded_skirmish(seed: u64, strategy: StrategyKind) -> Game {
    let config = GameConfig { seed, strategy, ..GameConfig::default() };
    let mut game = Game::new(config, GameMap::skirmish()).unwrap();
    game.start(0.0);
    game
}

fn assert_planet_invariants(planet: &Planet) {
    assert_eq!(planet.owner().is_none(), planet.level() == 0, "{:?}", planet.ownership());
    assert!(planet.health() <= FULL);
    assert!(planet.upgrade() <= FULL);
    assert!(planet.level() <= planet.max_level);
}

/// Every event flushed so far, in order
fn all_events(game: &Game) -> Vec<GameEvent> {
    game.log().iter().flat_map(|s| s.events.iter().copied()).collect()
}

#[test]
fn test_conservation_and_ownership_under_ai_play() {
    let mut game = seeded_skirmish(42, StrategyKind::Priority);

    for _ in 0..1500 {
        let before = game.satellite_count();
        let result = game.tick(33.0);
        let removed = result.removed.drain(..).count();
        let spawned = result.spawned;
        let after = game.satellite_count();

        assert_eq!(removed + after, before + spawned);
        for planet in game.planets() {
            assert_planet_invariants(planet);
        }
    }
    assert!(game.log().len() >= 49);
}

#[test]
fn test_capture_through_simulation() {
    let mut game = contest_game();
    let ids: Vec<String> = (0..120)
        .filter_map(|i| {
            let angle = i as f32 * 0.05;
            game.spawn_satellite(Team::Red, Vec2::from_angle(angle) * 25.0)
        })
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids.len(), 120);

    assert_eq!(game.submit_move(Team::Red, &ids, Vec2::new(5.0, 5.0)), 120);

    let mut consumed = 0;
    for _ in 0..125 {
        let result = game.tick(16.0);
        consumed += result
            .removed
            .drain(..)
            .filter(|r| r.destroyed_by == Some(EntityId::Planet(PlanetId(2))))
            .count();
    }

    let planet = game.planet(PlanetId(2)).unwrap();
    assert_eq!(planet.owner(), Some(Team::Red));
    assert_eq!((planet.level(), planet.health(), planet.upgrade()), (1, FULL, 0));
    assert_eq!(consumed, 100);

    let captures: Vec<_> = all_events(&game)
        .into_iter()
        .filter(|e| e.kind == EventKind::Capture)
        .collect();
    assert_eq!(captures, vec![GameEvent::capture(Team::Red)]);
}

#[test]
fn test_contest_reset_through_simulation() {
    let mut game = contest_game();
    let red = game.spawn_satellite(Team::Red, Vec2::new(0.0, 30.0)).unwrap();
    game.move_satellites(Team::Red, &[red], Vec2::ZERO);
    for _ in 0..5 {
        game.tick(16.0);
    }
    assert_eq!(game.planet(PlanetId(2)).unwrap().candidate_owner(), Some(Team::Red));

    let blue = game.spawn_satellite(Team::Blue, Vec2::new(0.0, -30.0)).unwrap();
    game.move_satellites(Team::Blue, &[blue], Vec2::ZERO);
    for _ in 0..5 {
        game.tick(16.0);
    }
    let planet = game.planet(PlanetId(2)).unwrap();
    assert_eq!(planet.candidate_owner(), None);
    assert_eq!(planet.upgrade(), 0);
    assert_eq!(planet.ownership(), Ownership::Neutral);
}

#[test]
fn test_mutual_destruction_within_one_tick() {
    let mut game = contest_game();
    let a = game.spawn_satellite(Team::Red, Vec2::new(0.0, 400.0)).unwrap();
    let b = game.spawn_satellite(Team::Blue, Vec2::new(2.0, 401.0)).unwrap();

    let removed: Vec<_> = game.tick(16.0).removed.drain(..).collect();
    assert!(game.satellite(a).is_none());
    assert!(game.satellite(b).is_none());
    let by_id: HashMap<_, _> = removed.iter().map(|r| (r.id, r.destroyed_by)).collect();
    assert_eq!(by_id[&a], Some(EntityId::Satellite(b)));
    assert_eq!(by_id[&b], Some(EntityId::Satellite(a)));
}

#[test]
fn test_move_filtering_leaves_foreign_units_alone() {
    let mut game = contest_game();
    let blue = game.spawn_satellite(Team::Blue, Vec2::new(300.0, 300.0)).unwrap();
    let before = game.satellite(blue).unwrap().mover.clone();

    let moved = game.submit_move(Team::Red, [blue.to_string()], Vec2::new(-300.0, -300.0));
    assert_eq!(moved, 0);
    assert_eq!(game.satellite(blue).unwrap().mover, before);

    // Stale generation of a live slot is dropped too
    let stale = format!("{}.{}", blue.index, blue.generation + 1);
    assert_eq!(game.submit_move(Team::Blue, [stale], Vec2::ZERO), 0);
}

#[test]
fn test_countdown_gating() {
    let mut game = Game::new(GameConfig::default(), GameMap::skirmish()).unwrap();
    game.start(3.0);

    let capture = |game: &Game| {
        let mut state = Vec::new();
        game.for_each_entity(|entity| match entity {
            EntityView::Planet(p) => state.push(format!("{:?} {:?} {}", p.id, p.ownership(), p.rotation)),
            EntityView::Satellite(id, s) => {
                state.push(format!("{} {:?} {:?} {:?}", id, s.position, s.velocity, s.mover))
            }
        });
        state
    };

    let before = capture(&game);
    for _ in 0..50 {
        let result = game.tick(50.0);
        assert!(result.removed.is_empty());
        assert_eq!(result.spawned, 0);
        assert!(result.log.is_none());
    }
    assert_eq!(capture(&game), before);
    assert!((game.game_time_ms() - -500.0).abs() < 1e-6);

    // Once the clock passes zero the world moves
    game.tick(1000.0);
    assert_ne!(capture(&game), before);
}

#[test]
fn test_upgrade_scenario() {
    let mut planet = Planet::owned(PlanetId(0), Vec2::ZERO, 3, Team::Red, 2);
    let mut events = Vec::new();
    for _ in 0..100 {
        events.extend(planet.absorb(Team::Red).event);
        assert_planet_invariants(&planet);
    }
    assert_eq!(events, vec![GameEvent::upgrade(Team::Red)]);
    assert_eq!(planet.level(), 3);
    assert_eq!(planet.upgrade(), 0);
}

#[test]
fn test_loss_scenario() {
    let mut planet = Planet::owned(PlanetId(0), Vec2::ZERO, 3, Team::Red, 2);
    for _ in 0..60 {
        assert!(planet.absorb(Team::Blue).event.is_none());
    }
    assert_eq!(planet.health(), 40);

    for i in 1..=40 {
        let result = planet.absorb(Team::Blue);
        assert!(result.consumed);
        if i < 40 {
            assert!(result.event.is_none(), "loss fired early at unit {}", i);
        } else {
            assert_eq!(result.event, Some(GameEvent::loss(Team::Red)));
        }
        assert_planet_invariants(&planet);
    }
    assert_eq!(planet.owner(), None);
    assert_eq!(planet.level(), 0);
}

#[test]
fn test_same_seed_same_match() {
    for strategy in [StrategyKind::Priority, StrategyKind::Frontier, StrategyKind::Scoring] {
        let mut a = seeded_skirmish(9, strategy);
        let mut b = seeded_skirmish(9, strategy);
        for _ in 0..600 {
            a.tick(33.0).removed.clear();
            b.tick(33.0).removed.clear();
        }
        assert_eq!(a.log(), b.log());
        let positions = |g: &Game| g.satellites().iter().map(|(id, s)| (id, s.position)).collect::<Vec<_>>();
        assert_eq!(positions(&a), positions(&b));
    }
}

#[test]
fn test_malformed_map_is_fatal() {
    let json = r#"{
        "props": { "name": "Both" },
        "setup": { "layoutFunction": "circle", "initialUnitCount": 10, "worldSize": 2000, "teams": ["red"] },
        "planets": [{ "ownerTeam": "red", "level": 1, "position": { "x": 0, "y": 0 } }]
    }"#;
    assert!(matches!(GameMap::from_json(json), Err(MapError::BothLayouts)));
}

#[test]
fn test_sync_mirror_tracks_live_units() {
    let mut game = seeded_skirmish(3, StrategyKind::Priority);
    let mut sync = SyncState::new();
    let mut mirror = HashSet::new();

    for _ in 0..400 {
        let result = game.tick(33.0);
        let removed: Vec<_> = result.removed.drain(..).collect();
        let log = result.log.clone();
        let delta = sync.update(&game, &removed, log);

        for sat in &delta.satellites {
            mirror.insert(sat.id);
        }
        for record in &delta.removed {
            mirror.remove(&record.id);
        }
        for id in &delta.dropped {
            mirror.remove(id);
        }
    }

    let live: HashSet<_> = game.satellites().iter().map(|(id, _)| id).collect();
    assert_eq!(mirror, live);
}

fn points() -> impl Strategy<Value = Vec<(f32, f32)>> {
    prop::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 0..200)
}

fn filled_tree(points: &[(f32, f32)], capacity: usize) -> QuadTree<usize> {
    let mut tree = QuadTree::new(capacity);
    for (i, (x, y)) in points.iter().enumerate() {
        tree.insert(i, Vec2::new(*x, *y), 4.0);
    }
    tree
}

proptest! {
    #[test]
    fn prop_query_matches_brute_force(
        points in points(),
        center in (-600.0f32..600.0, -600.0f32..600.0),
        radius in 0.0f32..300.0,
        capacity in 1usize..10,
    ) {
        let center = Vec2::new(center.0, center.1);
        let exact: HashSet<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, (x, y))| Vec2::new(*x, *y).distance_to(center) <= radius)
            .map(|(i, _)| i)
            .collect();

        let mut tree = filled_tree(&points, capacity);
        for built in [false, true] {
            if built {
                tree.build();
            }
            let mut visited = HashSet::new();
            let mut filtered = HashSet::new();
            tree.query(center, radius, |entry| {
                visited.insert(entry.item);
                if entry.position.distance_to(center) <= radius {
                    filtered.insert(entry.item);
                }
            });
            prop_assert!(visited.is_superset(&exact));
            prop_assert_eq!(&filtered, &exact);
        }
    }

    #[test]
    fn prop_walk_finds_every_close_pair(points in points(), capacity in 1usize..10) {
        let close = 4.0f32;
        let mut expected = HashSet::new();
        for i in 0..points.len() {
            for j in i + 1..points.len() {
                let a = Vec2::new(points[i].0, points[i].1);
                let b = Vec2::new(points[j].0, points[j].1);
                if a.distance_to(b) < close {
                    expected.insert((i, j));
                }
            }
        }

        let mut tree = filled_tree(&points, capacity);
        let mut found = HashSet::new();
        let mut seen_twice = false;
        tree.walk(|local, inherited| {
            for (k, a) in local.iter().enumerate() {
                for b in local[k + 1..].iter().chain(inherited.iter()) {
                    if a.position.distance_to(b.position) < close {
                        let pair = (a.item.min(b.item), a.item.max(b.item));
                        seen_twice |= !found.insert(pair);
                    }
                }
            }
        });
        prop_assert!(!seen_twice);
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn prop_clear_empties_queries(points in points(), build in any::<bool>()) {
        let mut tree = filled_tree(&points, 4);
        if build {
            tree.build();
        }
        tree.clear();
        let mut hits = 0;
        tree.query(Vec2::ZERO, 1000.0, |_| hits += 1);
        prop_assert_eq!(hits, 0);
        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.node_count(), 0);
    }
}
