//! Particle population: spawning, kinematics and eviction.

mod config;
mod shape;
mod system;

pub use config::{ConfigError, ParticleConfig};
pub use shape::Shape;
pub use system::ParticleSystem;
