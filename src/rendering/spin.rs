//! Rotation-angle state for the dynamic rotation uniform.

use std::f32::consts::TAU;

/// Accumulates the field's rotation angle, wrapped into `[0, 2π)`.
///
/// Automatic rotation is a feature flag rather than a hardcoded increment;
/// when disabled the angle holds its current value.
#[derive(Debug, Clone, Copy)]
pub struct Spin {
    angle: f32,
    speed: f32,
    enabled: bool,
}

impl Spin {
    /// `speed` is in radians per second; only applied when `enabled`.
    pub fn new(enabled: bool, speed: f32) -> Self {
        Self {
            angle: 0.0,
            speed,
            enabled,
        }
    }

    /// Advance by one frame's worth of rotation and return the new angle.
    ///
    /// The speed may be negative (configured reverse rotation); the angle is
    /// wrapped into `[0, 2π)` from either direction.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.enabled {
            self.angle = (self.angle + self.speed * dt).rem_euclid(TAU);
        }
        self.angle
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_stays_in_range_under_repeated_updates() {
        let mut spin = Spin::new(true, 0.7);
        for _ in 0..10_000 {
            let angle = spin.advance(0.016);
            assert!((0.0..TAU).contains(&angle), "angle {} out of range", angle);
        }
    }

    #[test]
    fn disabled_spin_holds_angle() {
        let mut spin = Spin::new(false, 0.7);
        for _ in 0..100 {
            assert_eq!(spin.advance(0.016), 0.0);
        }
    }

    #[test]
    fn negative_speed_wraps_from_below() {
        let mut spin = Spin::new(true, -0.7);
        for _ in 0..10_000 {
            let angle = spin.advance(0.016);
            assert!((0.0..TAU).contains(&angle), "angle {} out of range", angle);
        }
        // The very first backward step must already land inside the range
        let mut spin = Spin::new(true, -0.7);
        let angle = spin.advance(0.016);
        assert!((0.0..TAU).contains(&angle));
    }

    #[test]
    fn wraps_exactly_at_full_turn() {
        let mut spin = Spin::new(true, TAU);
        // One full turn over four quarter-second steps
        for _ in 0..4 {
            spin.advance(0.25);
        }
        assert!(spin.angle() < TAU);
        assert!(spin.angle() >= 0.0);
    }
}
