//! Force-based unit movement
//!
//! Every satellite carries one `Mover`. Each step the mover picks a target,
//! nudges the unit's velocity towards it with a spring-damper controller and
//! reports whether it is still moving, has arrived, or was consumed by a
//! planet. Position integration is left to the caller.

use rand::{Rng, RngCore};
use smallvec::SmallVec;

use crate::config::SteeringConfig;
use crate::game::constants::steering::{
    ORBIT_DRIFT, ORBIT_OFFSET_MAX, ORBIT_OFFSET_MIN, POINT_ORBIT_RADIUS,
};
use crate::game::planet::{Mission, Planet};
use crate::game::state::{GameEvent, PlanetId, Team};
use crate::util::vec2::{Point, Vec2};

/// What a mover steers towards
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Fixed(Point),
    /// Follows the planet's current position
    Planet(PlanetId),
}

impl Target {
    fn resolve(&self, planets: &[Planet]) -> Option<Point> {
        match self {
            Target::Fixed(p) => Some(*p),
            Target::Planet(id) => planets.get(id.index()).map(|p| p.position),
        }
    }
}

/// Outcome of one mover step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moving,
    Arrived,
    /// The unit was spent on this planet and must be released
    Consumed(PlanetId),
}

/// Everything a mover may read or touch during a step
pub struct MoveContext<'a> {
    pub planets: &'a mut [Planet],
    pub events: &'a mut Vec<GameEvent>,
    pub rng: &'a mut dyn RngCore,
    pub steering: &'a SteeringConfig,
    pub dt_ms: f32,
}

impl MoveContext<'_> {
    #[inline]
    fn dt_seconds(&self) -> f32 {
        self.dt_ms / 1000.0
    }
}

/// The moving part of a satellite, borrowed for one step
pub struct Body<'a> {
    pub owner: Team,
    pub position: Vec2,
    pub velocity: &'a mut Vec2,
    pub noise: f32,
}

/// Spring-damper velocity update towards `target`
pub fn steer(body: &mut Body<'_>, target: Point, steering: &SteeringConfig, dt_seconds: f32) {
    let direction = (target - body.position).normalize();
    let target_velocity = direction * steering.max_speed;
    let force = direction * steering.stiffness + (target_velocity - *body.velocity) * steering.damping;
    *body.velocity += force * (dt_seconds * body.noise);
}

/// Head for a point, arriving within the arrive radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMover {
    pub target: Target,
}

impl PointMover {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    fn evaluate(&mut self, body: &mut Body<'_>, ctx: &mut MoveContext<'_>) -> Step {
        let Some(target) = self.target.resolve(ctx.planets) else {
            return Step::Arrived;
        };
        let arrive_radius = match self.target {
            Target::Fixed(_) => ctx.steering.arrive_radius,
            Target::Planet(_) => ctx.steering.planet_radius,
        };
        if body.position.distance_sq_to(target) < arrive_radius * arrive_radius {
            return Step::Arrived;
        }

        let jitter = ctx.steering.jitter;
        let jittered = if jitter > 0.0 {
            target
                + Vec2::new(
                    ctx.rng.gen_range(-jitter..=jitter),
                    ctx.rng.gen_range(-jitter..=jitter),
                )
        } else {
            target
        };
        let dt = ctx.dt_seconds();
        steer(body, jittered, ctx.steering, dt);
        Step::Moving
    }
}

/// Act on a planet once: take, hurt, heal or upgrade it.
///
/// The mission is fixed when the mover is created. If the planet no longer
/// calls for the same mission when the unit gets there, the unit does
/// nothing and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanetMover {
    pub planet: PlanetId,
    pub mission: Mission,
}

impl PlanetMover {
    pub fn new(planet: &Planet, team: Team) -> Self {
        Self {
            planet: planet.id,
            mission: Mission::classify(planet, team),
        }
    }

    fn evaluate(&mut self, body: &mut Body<'_>, ctx: &mut MoveContext<'_>) -> Step {
        let Some(planet) = ctx.planets.get_mut(self.planet.index()) else {
            return Step::Arrived;
        };
        if self.mission == Mission::None || Mission::classify(planet, body.owner) != self.mission {
            return Step::Arrived;
        }
        let result = planet.absorb(body.owner);
        ctx.events.extend(result.event);
        if result.consumed {
            Step::Consumed(self.planet)
        } else {
            Step::Arrived
        }
    }
}

/// Circle a planet or point. Never arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitMover {
    pub center: Target,
    /// Multiplier on the planet's orbit distance, or the radius around a point
    pub distance: f32,
    /// Angular offset from the planet's rotation
    pub phase: f32,
    /// Extra angular speed in radians per second
    pub drift: f32,
}

impl OrbitMover {
    pub fn around_planet(planet: PlanetId, rng: &mut dyn RngCore) -> Self {
        Self {
            center: Target::Planet(planet),
            distance: rng.gen_range(ORBIT_OFFSET_MIN..ORBIT_OFFSET_MAX),
            phase: rng.gen_range(0.0..std::f32::consts::TAU),
            drift: rng.gen_range(0.0..ORBIT_DRIFT),
        }
    }

    pub fn around_point(point: Point, rng: &mut dyn RngCore) -> Self {
        Self {
            center: Target::Fixed(point),
            distance: rng.gen_range(0.0..POINT_ORBIT_RADIUS),
            phase: rng.gen_range(0.0..std::f32::consts::TAU),
            drift: rng.gen_range(0.0..ORBIT_DRIFT),
        }
    }

    fn evaluate(&mut self, body: &mut Body<'_>, ctx: &mut MoveContext<'_>) -> Step {
        let dt = ctx.dt_seconds();
        self.phase = (self.phase + self.drift * dt) % std::f32::consts::TAU;

        let (center, angle, radius) = match self.center {
            Target::Fixed(p) => (p, self.phase, self.distance),
            Target::Planet(id) => match ctx.planets.get(id.index()) {
                Some(planet) => (
                    planet.position,
                    planet.rotation + self.phase,
                    planet.orbit_distance() * self.distance,
                ),
                None => return Step::Moving,
            },
        };
        let target = center + Vec2::from_angle(angle) * radius;
        steer(body, target, ctx.steering, dt);
        Step::Moving
    }
}

/// One mover inside a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leg {
    Point(PointMover),
    Planet(PlanetMover),
    Orbit(OrbitMover),
}

impl Leg {
    fn evaluate(&mut self, body: &mut Body<'_>, ctx: &mut MoveContext<'_>) -> Step {
        match self {
            Leg::Point(m) => m.evaluate(body, ctx),
            Leg::Planet(m) => m.evaluate(body, ctx),
            Leg::Orbit(m) => m.evaluate(body, ctx),
        }
    }
}

/// Chained movers, run one at a time
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSequence {
    legs: SmallVec<[Leg; 3]>,
    current: usize,
}

impl MoveSequence {
    pub fn new(legs: impl IntoIterator<Item = Leg>) -> Self {
        Self { legs: legs.into_iter().collect(), current: 0 }
    }

    pub fn current(&self) -> Option<&Leg> {
        self.legs.get(self.current)
    }

    /// Runs only the current leg; an arrival moves on to the next leg
    /// for the following step
    fn evaluate(&mut self, body: &mut Body<'_>, ctx: &mut MoveContext<'_>) -> Step {
        let Some(leg) = self.legs.get_mut(self.current) else {
            return Step::Arrived;
        };
        match leg.evaluate(body, ctx) {
            Step::Arrived => {
                self.current += 1;
                if self.current >= self.legs.len() {
                    Step::Arrived
                } else {
                    Step::Moving
                }
            }
            other => other,
        }
    }
}

/// A unit's current mission
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Mover {
    /// Nothing to do; velocity bleeds off
    #[default]
    Idle,
    Point(PointMover),
    Planet(PlanetMover),
    Orbit(OrbitMover),
    Sequence(MoveSequence),
}

impl Mover {
    /// Fly to a planet, act on it once, then orbit it
    pub fn to_planet(planet: &Planet, team: Team, rng: &mut dyn RngCore) -> Self {
        Mover::Sequence(MoveSequence::new([
            Leg::Point(PointMover::new(Target::Planet(planet.id))),
            Leg::Planet(PlanetMover::new(planet, team)),
            Leg::Orbit(OrbitMover::around_planet(planet.id, rng)),
        ]))
    }

    /// Fly to a point and hang around it
    pub fn to_point(point: Point, rng: &mut dyn RngCore) -> Self {
        Mover::Sequence(MoveSequence::new([
            Leg::Point(PointMover::new(Target::Fixed(point))),
            Leg::Orbit(OrbitMover::around_point(point, rng)),
        ]))
    }

    pub fn orbit_planet(planet: PlanetId, rng: &mut dyn RngCore) -> Self {
        Mover::Orbit(OrbitMover::around_planet(planet, rng))
    }

    /// Advance one step. A finished mover turns into `Idle`.
    pub fn evaluate(&mut self, body: &mut Body<'_>, ctx: &mut MoveContext<'_>) -> Step {
        let step = match self {
            Mover::Idle => {
                let decay = (ctx.steering.damping * ctx.dt_seconds()).min(1.0);
                let velocity = *body.velocity;
                *body.velocity -= velocity * decay;
                Step::Moving
            }
            Mover::Point(m) => m.evaluate(body, ctx),
            Mover::Planet(m) => m.evaluate(body, ctx),
            Mover::Orbit(m) => m.evaluate(body, ctx),
            Mover::Sequence(m) => m.evaluate(body, ctx),
        };
        if step == Step::Arrived {
            *self = Mover::Idle;
        }
        step
    }
}
