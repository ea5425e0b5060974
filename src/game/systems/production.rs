//! Periodic unit production ("pulse")

use rand::{Rng, RngCore};

use crate::game::constants::steering::{NOISE_MAX, NOISE_MIN, SPAWN_SPEED_FRACTION};
use crate::game::planet::Planet;
use crate::game::state::{Satellite, SatelliteId, Team};
use crate::game::systems::movement::Mover;
use crate::util::pool::Pool;
use crate::util::vec2::Vec2;

/// Spawn one unit of `team` orbiting `planet`.
/// Returns `None` once the global cap is reached.
pub fn spawn_at(
    planet: &Planet,
    team: Team,
    satellites: &mut Pool<Satellite>,
    max_satellites: usize,
    max_speed: f32,
    rng: &mut dyn RngCore,
) -> Option<SatelliteId> {
    if satellites.len() >= max_satellites {
        return None;
    }
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(0.0..=planet.orbit_distance() * 0.5);
    let position = planet.position + Vec2::from_angle(angle) * distance;
    let velocity = Vec2::from_angle(angle) * (max_speed * SPAWN_SPEED_FRACTION * rng.gen::<f32>());
    let noise = rng.gen_range(NOISE_MIN..NOISE_MAX);
    let mover = Mover::orbit_planet(planet.id, rng);

    let (id, sat) = satellites.take();
    sat.reset(team, position, velocity, noise, mover);
    Some(id)
}

/// Every owned planet spawns `level * pulse_rate` units, silently stopping
/// at the cap. Returns the number spawned.
pub fn pulse(
    planets: &[Planet],
    satellites: &mut Pool<Satellite>,
    pulse_rate: u32,
    max_satellites: usize,
    max_speed: f32,
    rng: &mut dyn RngCore,
) -> usize {
    let mut spawned = 0;
    for planet in planets {
        let Some(owner) = planet.owner() else {
            continue;
        };
        let count = planet.level() as u32 * pulse_rate;
        for _ in 0..count {
            if spawn_at(planet, owner, satellites, max_satellites, max_speed, rng).is_none() {
                return spawned;
            }
            spawned += 1;
        }
    }
    spawned
}
