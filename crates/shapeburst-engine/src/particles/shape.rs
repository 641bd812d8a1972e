use crate::binding::VariantId;
use crate::coords::Vec2;

/// A live particle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Shape {
    /// Surface pixels, origin at the bottom-left corner.
    pub position: Vec2,
    /// Surface units per second.
    pub velocity: Vec2,
    pub size: f32,
    /// Seconds left; the shape is dead at or below zero.
    pub time_remaining: f32,
    pub variant: VariantId,
}

impl Shape {
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.time_remaining > 0.0
    }

    /// Moves the shape by `velocity * dt` and spends `dt` of its lifetime.
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        self.time_remaining -= dt;
    }
}
