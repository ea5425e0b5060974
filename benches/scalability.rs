//! Scalability benchmarks for the simulation
//!
//! Measures full ticks, the collision tree and AI thinking at increasing
//! unit counts.
//!
//! Run with: cargo bench --bench scalability

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use satellite_siege::config::{AiConfig, GameConfig};
use satellite_siege::game::game_loop::Game;
use satellite_siege::game::map::GameMap;
use satellite_siege::game::spatial::QuadTree;
use satellite_siege::game::state::{Satellite, Team, UnitRef};
use satellite_siege::game::systems::ai::{PriorityStrategy, Strategy, WorldView};
use satellite_siege::util::pool::Pool;
use satellite_siege::util::vec2::Vec2;

const TEAMS: [Team; 3] = [Team::Red, Team::Green, Team::Blue];

/// A running skirmish with `count` extra units scattered around the map
fn game_with_units(count: usize) -> Game {
    let config = GameConfig { max_satellites: count + 2000, ..GameConfig::default() };
    let mut game = Game::new(config, GameMap::skirmish()).expect("skirmish map is valid");
    game.start(0.0);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for i in 0..count {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = rng.gen_range(50.0..900.0);
        game.spawn_satellite(TEAMS[i % TEAMS.len()], Vec2::from_angle(angle) * radius);
    }
    game
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(30);

    for count in [500, 1000, 2000, 4000] {
        let mut game = game_with_units(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("units", count), &count, |b, _| {
            b.iter(|| {
                let result = game.tick(black_box(16.0));
                result.removed.clear();
            });
        });
    }
    group.finish();
}

fn bench_quadtree(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadtree");

    for count in [500, 1000, 2000, 4000] {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut pool: Pool<Satellite> = Pool::new();
        let points: Vec<(UnitRef, Vec2)> = (0..count)
            .map(|i| {
                let (id, _) = pool.take();
                let position = Vec2::new(rng.gen_range(-1000.0..1000.0), rng.gen_range(-1000.0..1000.0));
                (UnitRef { id, owner: TEAMS[i % TEAMS.len()] }, position)
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("build_walk", count), &count, |b, _| {
            let mut tree = QuadTree::new(8);
            b.iter(|| {
                tree.clear();
                for (unit, position) in &points {
                    tree.insert(*unit, *position, 4.0);
                }
                let mut pairs = 0usize;
                tree.walk(|local, inherited| {
                    pairs += local.len() * (local.len() + inherited.len());
                });
                black_box(pairs)
            });
        });
    }
    group.finish();
}

fn bench_ai_think(c: &mut Criterion) {
    let mut group = c.benchmark_group("ai");

    for count in [500, 2000] {
        let mut game = game_with_units(count);
        game.tick(16.0);
        let mut strategy = PriorityStrategy::new(AiConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        group.bench_with_input(BenchmarkId::new("priority", count), &count, |b, _| {
            b.iter(|| {
                let view = WorldView {
                    planets: game.planets(),
                    units: game.collision_tree(),
                    satellites: game.satellites(),
                    planet_radius: game.config().steering.planet_radius,
                };
                black_box(strategy.think(Team::Red, &view, &mut rng))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick, bench_quadtree, bench_ai_think);
criterion_main!(benches);
