//! Fixed tuning constants
//!
//! Values that are live-tunable at runtime live in `GameConfig`; these are
//! the defaults it starts from plus geometry that never changes.

use std::f32::consts::PI;

/// Team colours (0xRRGGBB)
pub mod teams {
    pub const RED: u32 = 0xe6_3b_3b;
    pub const GREEN: u32 = 0x3b_c4_5a;
    pub const BLUE: u32 = 0x3b_7b_e6;
    pub const ORANGE: u32 = 0xf0_8c_2a;
    pub const PURPLE: u32 = 0x9b_4d_e0;
    pub const CYAN: u32 = 0x2a_d4_d9;
    pub const YELLOW: u32 = 0xe8_d4_2a;
}

/// Planet geometry and ownership counters
pub mod planet {
    use super::PI;

    /// Health and progress counters saturate here
    pub const FULL: u8 = 100;
    /// Visual radius = level / LEVEL_DIVISOR + RADIUS_BASE
    pub const RADIUS_BASE: f32 = 0.5;
    pub const LEVEL_DIVISOR: f32 = 6.0;
    /// Orbit distance = visual radius * ORBIT_SCALE
    pub const ORBIT_SCALE: f32 = 150.0;
    /// Rotation speed in radians per simulated millisecond
    pub const ROTATION_PER_MS: f32 = PI / 30_000.0;
    /// Units considered "around" a planet: orbit distance * SELECTION_FACTOR
    pub const SELECTION_FACTOR: f32 = 1.6;
    /// A move destination within this distance of a planet targets the planet
    pub const TOUCH_RADIUS: f32 = 40.0;
    /// Max level used when a map omits it
    pub const DEFAULT_MAX_LEVEL: u8 = 3;
}

/// Spring-damper steering defaults (world units, seconds)
pub mod steering {
    /// Target speed units steer towards
    pub const MAX_SPEED: f32 = 140.0;
    /// Constant pull along the direction to the target
    pub const STIFFNESS: f32 = 60.0;
    /// How quickly velocity converges on the target velocity (per second)
    pub const DAMPING: f32 = 3.0;
    /// Per-unit noise multiplier range
    pub const NOISE_MIN: f32 = 0.85;
    pub const NOISE_MAX: f32 = 1.15;
    /// Per-axis jitter added to point targets each step
    pub const JITTER: f32 = 6.0;
    /// A point target counts as reached inside this distance
    pub const ARRIVE_RADIUS: f32 = 10.0;
    /// Orbit distance multiplier range around planets
    pub const ORBIT_OFFSET_MIN: f32 = 0.9;
    pub const ORBIT_OFFSET_MAX: f32 = 1.2;
    /// Max orbit radius around a bare point
    pub const POINT_ORBIT_RADIUS: f32 = 50.0;
    /// Max extra orbit drift in radians per second
    pub const ORBIT_DRIFT: f32 = 0.3;
    /// Speed fraction given to freshly spawned units
    pub const SPAWN_SPEED_FRACTION: f32 = 0.25;
}

/// Simulation clock defaults
pub mod simulation {
    /// Longest step fed to the integrator
    pub const MAX_SUB_TICK_MS: f64 = 50.0;
    /// Production and snapshot period
    pub const PULSE_MS: f64 = 1000.0;
    /// Units beyond |x| or |y| of this are removed
    pub const MAX_WORLD: f32 = 4000.0;
    /// Global cap on live satellites
    pub const MAX_SATELLITES: usize = 6000;
    /// Opposing units closer than this destroy each other
    pub const COLLISION_RADIUS: f32 = 4.0;
    pub const GAME_SPEED: f32 = 1.0;
    pub const PULSE_RATE: u32 = 1;
    pub const COUNTDOWN_SECONDS: f64 = 3.0;
}

/// Quadtree shape
pub mod spatial {
    /// Entries per node before it subdivides
    pub const NODE_CAPACITY: usize = 8;
    /// Depth at which nodes stop subdividing
    pub const MAX_DEPTH: u8 = 10;
    /// Planet trees are tiny; split early
    pub const PLANET_TREE_CAPACITY: usize = 3;
}

/// Autonomous player defaults
pub mod ai {
    pub const MAX_THINK_GAP_MS: f64 = 3000.0;
    pub const MIN_THINK_GAP_MS: f64 = 1000.0;
    pub const MIN_SATELLITES: usize = 40;
    pub const HEAL_CHANCE: f64 = 0.5;
    pub const TRANSFER_CHANCE: f64 = 0.1;
    pub const UPGRADE_CHANCE: f64 = 0.4;
    pub const ATTACK_CHANCE: f64 = 0.3;
    pub const CONQUER_CHANCE: f64 = 0.6;
    /// Frontier search radius multiplier per widening step
    pub const FRONTIER_GROWTH: f32 = 1.5;

    /// Neighbour score weights for the scoring strategy
    pub mod score {
        pub const HEAL: f32 = 1.0;
        pub const UPGRADE: f32 = 4.0;
        pub const OWN_CANDIDACY: f32 = 6.0;
        /// Applied negatively to progress we don't hold
        pub const RIVAL_PROGRESS: f32 = 2.0;
        pub const OPEN: f32 = 0.25;
        pub const MAX_LEVEL: f32 = 2.0;
        /// Our local units minus everyone's units around the target
        pub const SUPERIORITY: f32 = 4.0;
    }
}

/// Procedural map layout
pub mod layout {
    /// Home planets sit on a ring at this fraction of the world size
    pub const HOME_RING: f32 = 0.4;
    /// Neutral planets sit on a ring at this fraction of the world size
    pub const NEUTRAL_RING: f32 = 0.2;
    /// Minimum distance between randomly placed planets
    pub const MIN_SPACING: f32 = 220.0;
    /// Attempts per planet before random placement gives up
    pub const MAX_ATTEMPTS: u32 = 200;
    pub const HOME_MAX_LEVEL: u8 = 3;
}

/// Visual radius of a planet at `level`
#[inline]
pub fn planet_radius(level: u8) -> f32 {
    level as f32 / planet::LEVEL_DIVISOR + planet::RADIUS_BASE
}

/// Orbit distance of a planet at `level`
#[inline]
pub fn orbit_distance(level: u8) -> f32 {
    planet_radius(level) * planet::ORBIT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_distance() {
        assert!((orbit_distance(0) - 75.0).abs() < 1e-4);
        assert!((orbit_distance(3) - 150.0).abs() < 1e-4);
    }

    #[test]
    fn test_think_gap_range() {
        assert!(ai::MIN_THINK_GAP_MS <= ai::MAX_THINK_GAP_MS);
        assert!(steering::ORBIT_OFFSET_MIN < steering::ORBIT_OFFSET_MAX);
    }
}
