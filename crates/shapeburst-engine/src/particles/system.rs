use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::binding::VariantId;
use crate::coords::Vec2;

use super::{ConfigError, ParticleConfig, Shape};

/// Live shape population with time-accumulated spawning.
///
/// One frame is `spawn_tick(dt)`, `advance(dt)`, `reap()`, in that order and
/// with the same `dt`.
#[derive(Debug, Clone)]
pub struct ParticleSystem<R: Rng = StdRng> {
    config: ParticleConfig,
    variant_count: usize,

    /// Spawn order.
    shapes: Vec<Shape>,

    /// Counts down to the next spawn; in `[0, spawn_interval]` between ticks.
    time_to_next_spawn: f64,
    /// Shapes counted by the last spawn tick but never created; dropped by the next reap.
    surplus: usize,
    spawn_origin: Vec2,

    rng: R,
}

impl ParticleSystem<StdRng> {
    /// Creates a system sampling from an entropy-seeded generator.
    pub fn new(config: ParticleConfig, variant_count: usize) -> Result<Self, ConfigError> {
        Self::with_rng(config, variant_count, StdRng::from_entropy())
    }

    /// Creates a reproducible system.
    pub fn seeded(config: ParticleConfig, variant_count: usize, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, variant_count, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ParticleSystem<R> {
    pub fn with_rng(config: ParticleConfig, variant_count: usize, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        if variant_count == 0 {
            return Err(ConfigError::NoVariants);
        }

        Ok(Self {
            config,
            variant_count,
            shapes: Vec::with_capacity(config.max_shapes),
            time_to_next_spawn: config.spawn_interval,
            surplus: 0,
            spawn_origin: Vec2::zero(),
            rng,
        })
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn time_to_next_spawn(&self) -> f64 {
        self.time_to_next_spawn
    }

    pub fn spawn_origin(&self) -> Vec2 {
        self.spawn_origin
    }

    /// Sets where new shapes appear, normally the center of the render surface.
    pub fn set_spawn_origin(&mut self, origin: Vec2) {
        self.spawn_origin = origin;
    }

    /// Spends `dt` from the spawn accumulator and spawns one shape per interval
    /// it underflows by. Returns the number of shapes spawned.
    ///
    /// The interval is added back rather than reset, so sub-interval remainders
    /// carry over between frames. The underflow count is computed in one step,
    /// so a long stall costs the same as a short frame.
    ///
    /// At most `max_shapes` shapes are created per tick. The rest are counted,
    /// never sampled, and removed by the next [`reap`](Self::reap) like any
    /// other shape over the cap.
    pub fn spawn_tick(&mut self, dt: f64) -> usize {
        if !dt.is_finite() {
            log::warn!("spawn tick skipped: non-finite dt {dt}");
            return 0;
        }

        let interval = self.config.spawn_interval;
        let remaining = self.time_to_next_spawn - dt;
        if remaining >= 0.0 {
            self.time_to_next_spawn = remaining;
            return 0;
        }

        let mut due = (-remaining / interval).ceil();
        let mut carry = remaining + due * interval;
        if carry < 0.0 {
            due += 1.0;
            carry += interval;
        }
        self.time_to_next_spawn = carry.clamp(0.0, interval);

        // Saturates for absurd stalls.
        let spawned = due as usize;
        let created = spawned.min(self.config.max_shapes);
        if created < spawned {
            log::debug!("spawn tick: {spawned} due, creating {created}");
        }

        self.shapes.reserve(created);
        for _ in 0..created {
            let shape = self.sample_shape();
            self.shapes.push(shape);
        }
        self.surplus = self.surplus.saturating_add(spawned - created);

        spawned
    }

    /// Moves every live shape by `velocity * dt` and spends `dt` of its lifetime.
    pub fn advance(&mut self, dt: f64) {
        let dt = dt as f32;
        for shape in self.shapes.iter_mut().filter(|s| s.is_alive()) {
            shape.advance(dt);
        }
    }

    /// Removes dead shapes, then truncates the population to `max_shapes`,
    /// keeping the earliest spawned. Returns the number of shapes removed.
    pub fn reap(&mut self) -> usize {
        let before = self.shapes.len();
        self.shapes.retain(Shape::is_alive);
        self.shapes.truncate(self.config.max_shapes);
        (before - self.shapes.len()).saturating_add(std::mem::take(&mut self.surplus))
    }

    fn sample_shape(&mut self) -> Shape {
        let c = &self.config;
        let direction = self.rng.gen_range(0.0..TAU);
        let speed = self.rng.gen_range(c.min_speed..=c.max_speed);
        let size = self.rng.gen_range(c.min_size..=c.max_size);
        let lifetime = self.rng.gen_range(c.min_lifetime..=c.max_lifetime);
        let variant = VariantId(self.rng.gen_range(0..self.variant_count));

        Shape {
            position: self.spawn_origin,
            velocity: Vec2::from_heading(direction, speed),
            size,
            time_remaining: lifetime,
            variant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(config: ParticleConfig) -> ParticleSystem {
        ParticleSystem::seeded(config, 2, 7).unwrap()
    }

    fn shape(velocity: Vec2, time_remaining: f32) -> Shape {
        Shape {
            position: Vec2::new(10.0, 20.0),
            velocity,
            size: 5.0,
            time_remaining,
            variant: VariantId(0),
        }
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn accumulator_starts_at_one_interval() {
        let particles = system(ParticleConfig::default());
        assert_eq!(particles.time_to_next_spawn(), 0.08);
        assert!(particles.is_empty());
    }

    #[test]
    fn zero_variants_is_rejected() {
        assert_eq!(
            ParticleSystem::seeded(ParticleConfig::default(), 0, 1).unwrap_err(),
            ConfigError::NoVariants
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ParticleConfig {
            spawn_interval: -1.0,
            ..ParticleConfig::default()
        };
        assert!(ParticleSystem::new(config, 2).is_err());
    }

    // ── spawn_tick ────────────────────────────────────────────────────────

    #[test]
    fn zero_dt_spawns_nothing() {
        let mut particles = system(ParticleConfig::default());
        let before = particles.time_to_next_spawn();
        assert_eq!(particles.spawn_tick(0.0), 0);
        assert_eq!(particles.time_to_next_spawn(), before);
        assert!(particles.is_empty());
    }

    #[test]
    fn three_intervals_from_empty_accumulator_spawn_three() {
        let mut particles = system(ParticleConfig {
            spawn_interval: 0.125,
            ..ParticleConfig::default()
        });
        particles.time_to_next_spawn = 0.0;

        assert_eq!(particles.spawn_tick(0.375), 3);
        assert_eq!(particles.len(), 3);
        assert_eq!(particles.time_to_next_spawn(), 0.0);
    }

    #[test]
    fn half_second_frame_underflows_six_times() {
        // 0.08 - 0.5 = -0.42 needs six intervals to become non-negative.
        let mut particles = system(ParticleConfig::default());
        assert_eq!(particles.spawn_tick(0.5), 6);
        let remainder = particles.time_to_next_spawn();
        assert!(remainder >= 0.0 && remainder < 0.08);
        assert!((remainder - 0.06).abs() < 1e-5);
    }

    #[test]
    fn remainder_carries_between_ticks() {
        let mut particles = system(ParticleConfig {
            spawn_interval: 0.25,
            ..ParticleConfig::default()
        });
        assert_eq!(particles.spawn_tick(0.125), 0);
        assert_eq!(particles.spawn_tick(0.125), 0);
        assert_eq!(particles.spawn_tick(0.125), 1);
        assert_eq!(particles.time_to_next_spawn(), 0.125);
    }

    #[test]
    fn long_stall_spawns_exact_count() {
        let mut particles = system(ParticleConfig {
            spawn_interval: 0.125,
            ..ParticleConfig::default()
        });

        // 0.125 - 100_000 = -99_999.875, exactly 799_999 intervals.
        assert_eq!(particles.spawn_tick(100_000.0), 799_999);
        assert_eq!(particles.time_to_next_spawn(), 0.0);
        assert_eq!(particles.len(), 250);
    }

    #[test]
    fn long_stall_with_default_interval_terminates() {
        let mut particles = system(ParticleConfig::default());

        let spawned = particles.spawn_tick(100_000.0);
        assert!((1_249_999..=1_250_000).contains(&spawned), "spawned {spawned}");
        let remainder = particles.time_to_next_spawn();
        assert!((0.0..=0.08).contains(&remainder));

        // Far past the point where an f32 accumulator stops moving.
        let spawned = particles.spawn_tick(3_000_000.0);
        assert!((37_499_999..=37_500_001).contains(&spawned), "spawned {spawned}");
        assert!((0.0..=0.08).contains(&particles.time_to_next_spawn()));
    }

    #[test]
    fn surplus_beyond_cap_is_reaped() {
        let mut particles = system(ParticleConfig {
            spawn_interval: 0.125,
            max_shapes: 10,
            min_lifetime: 1_000.0,
            max_lifetime: 2_000.0,
            ..ParticleConfig::default()
        });

        // 0.125 - 2.5 = -2.375, exactly 19 intervals.
        assert_eq!(particles.spawn_tick(2.5), 19);
        assert_eq!(particles.len(), 10);
        particles.advance(2.5);
        assert_eq!(particles.reap(), 9);
        assert_eq!(particles.len(), 10);
        assert_eq!(particles.reap(), 0);
    }

    #[test]
    fn non_finite_dt_is_ignored() {
        let mut particles = system(ParticleConfig::default());
        assert_eq!(particles.spawn_tick(f64::INFINITY), 0);
        assert_eq!(particles.spawn_tick(f64::NAN), 0);
        assert_eq!(particles.time_to_next_spawn(), 0.08);
    }

    #[test]
    fn shapes_spawn_at_origin() {
        let mut particles = system(ParticleConfig::default());
        particles.set_spawn_origin(Vec2::new(400.0, 300.0));
        particles.spawn_tick(1.0);
        assert!(particles.shapes().iter().all(|s| s.position == Vec2::new(400.0, 300.0)));
    }

    #[test]
    fn sampled_values_stay_in_range() {
        let config = ParticleConfig::default();
        let mut particles = ParticleSystem::seeded(config, 2, 42).unwrap();

        for _ in 0..10_000 {
            let s = particles.sample_shape();
            let speed = s.velocity.length();
            assert!(speed >= config.min_speed - 1e-3 && speed <= config.max_speed + 1e-3);
            assert!(s.size >= config.min_size && s.size <= config.max_size);
            assert!(s.time_remaining >= config.min_lifetime && s.time_remaining <= config.max_lifetime);
            assert!(s.variant.0 < 2);
        }
    }

    #[test]
    fn variants_split_evenly() {
        let mut particles = ParticleSystem::seeded(ParticleConfig::default(), 2, 1234).unwrap();
        let first = (0..10_000)
            .filter(|_| particles.sample_shape().variant == VariantId(0))
            .count();
        assert!((4800..=5200).contains(&first), "variant 0 chosen {first} times");
    }

    #[test]
    fn every_registered_variant_is_used() {
        let mut particles = ParticleSystem::seeded(ParticleConfig::default(), 5, 9).unwrap();
        let mut seen = [false; 5];
        for _ in 0..1_000 {
            seen[particles.sample_shape().variant.0] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    // ── advance ───────────────────────────────────────────────────────────

    #[test]
    fn advance_moves_by_velocity_times_dt() {
        let mut particles = system(ParticleConfig::default());
        particles.shapes.push(shape(Vec2::new(3.0, -4.0), 2.0));

        particles.advance(0.25);

        let s = particles.shapes()[0];
        assert_eq!(s.position, Vec2::new(10.75, 19.0));
        assert_eq!(s.time_remaining, 1.75);
    }

    #[test]
    fn dead_shapes_are_not_advanced() {
        let mut particles = system(ParticleConfig::default());
        particles.shapes.push(shape(Vec2::new(1.0, 1.0), 0.0));
        particles.advance(1.0);
        assert_eq!(particles.shapes()[0].position, Vec2::new(10.0, 20.0));
        assert_eq!(particles.shapes()[0].time_remaining, 0.0);
    }

    #[test]
    fn shape_outliving_dt_dies_after_reap() {
        let mut particles = system(ParticleConfig::default());
        particles.shapes.push(shape(Vec2::zero(), 0.5));
        particles.shapes.push(shape(Vec2::zero(), 0.75));

        particles.advance(0.5);
        assert_eq!(particles.reap(), 1);
        assert_eq!(particles.len(), 1);
        assert_eq!(particles.shapes()[0].time_remaining, 0.25);
    }

    // ── reap ──────────────────────────────────────────────────────────────

    #[test]
    fn over_cap_keeps_earliest_spawned() {
        let mut particles = system(ParticleConfig {
            max_shapes: 3,
            ..ParticleConfig::default()
        });
        for i in 0..5 {
            particles.shapes.push(shape(Vec2::zero(), 1.0 + i as f32));
        }

        assert_eq!(particles.reap(), 2);
        let lifetimes: Vec<f32> = particles.shapes().iter().map(|s| s.time_remaining).collect();
        assert_eq!(lifetimes, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn population_never_exceeds_cap_after_reap() {
        let mut particles = system(ParticleConfig {
            max_shapes: 40,
            min_lifetime: 5.0,
            max_lifetime: 10.0,
            ..ParticleConfig::default()
        });

        for dt in [0.016, 0.5, 2.0, 0.0, 7.5, 0.033, 1.0] {
            particles.spawn_tick(dt);
            particles.advance(dt);
            particles.reap();
            assert!(particles.len() <= 40);
            assert!(particles.shapes().iter().all(Shape::is_alive));
        }
    }
}
