use core::ops::{Add, AddAssign, Div, Mul, Sub};

/// 2D vector in surface pixels (or pixels per second for velocities).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    /// Vector of length `length` pointing along `angle` radians, measured from +Y
    /// towards +X (`x = sin`, `y = cos`).
    #[inline]
    pub fn from_heading(angle: f32, length: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(sin * length, cos * length)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x - rhs, self.y - rhs)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Component-wise division.
impl Div for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x / rhs.x, self.y / rhs.y)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_zero_points_up() {
        let v = Vec2::from_heading(0.0, 10.0);
        assert_eq!(v, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn heading_quarter_turn_points_right() {
        let v = Vec2::from_heading(core::f32::consts::FRAC_PI_2, 2.0);
        assert!((v.x - 2.0).abs() < 1e-6);
        assert!(v.y.abs() < 1e-6);
    }

    #[test]
    fn heading_preserves_length() {
        for i in 0..16 {
            let v = Vec2::from_heading(i as f32 * 0.4, 125.0);
            assert!((v.length() - 125.0).abs() < 1e-3);
        }
    }

    #[test]
    fn component_wise_division() {
        assert_eq!(Vec2::new(400.0, 300.0) / Vec2::new(800.0, 600.0), Vec2::splat(0.5));
    }
}
