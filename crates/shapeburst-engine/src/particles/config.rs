use thiserror::Error;

/// Spawn rate, sampling ranges and population cap of a particle system.
///
/// Times are seconds, speeds are surface units per second, sizes are surface units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParticleConfig {
    /// Seconds between spawns. Kept in `f64` with the accumulator it feeds.
    pub spawn_interval: f64,

    pub min_lifetime: f32,
    pub max_lifetime: f32,

    pub min_speed: f32,
    pub max_speed: f32,

    pub min_size: f32,
    pub max_size: f32,

    /// Hard cap on the population after each reap.
    pub max_shapes: usize,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            spawn_interval: 0.08,
            min_lifetime: 0.25,
            max_lifetime: 6.0,
            min_speed: 125.0,
            max_speed: 350.0,
            min_size: 2.0,
            max_size: 50.0,
            max_shapes: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("spawn interval must be positive and finite, got {0}")]
    SpawnInterval(f64),

    #[error("invalid {name} range [{min}, {max}]: bounds must be finite, non-negative and ordered")]
    Range { name: &'static str, min: f32, max: f32 },

    #[error("a particle system needs at least one shape variant")]
    NoVariants,
}

impl ParticleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spawn_interval.is_finite() && self.spawn_interval > 0.0) {
            return Err(ConfigError::SpawnInterval(self.spawn_interval));
        }

        for (name, min, max) in [
            ("lifetime", self.min_lifetime, self.max_lifetime),
            ("speed", self.min_speed, self.max_speed),
            ("size", self.min_size, self.max_size),
        ] {
            if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
                return Err(ConfigError::Range { name, min, max });
            }
        }

        Ok(())
    }
}
