//! Forces acting on bodies that ride a track.
//!
//! - **Gravity along the incline**: `g·sin(θ)` toward the lower end
//! - **Coulomb friction**: `μ·g·cos(θ)`, opposing the current motion
//! - **Atwood coupling**: closed-form acceleration of a cart pulled by a
//!   hanging mass over a pulley
//!
//! ## Sign convention
//!
//! A positive tilt raises the track's right end, so gravity pushes a cart
//! toward negative x:
//!
//! ```text
//!                 ___/  right end up (θ > 0)
//!             ___/
//!   ◄── a ___/
//! ```
//!
//! ## Stick-slip
//!
//! Integrating friction as a plain force makes a slow cart oscillate around
//! zero speed. Two rules prevent it: a cart at rest only starts moving if
//! gravity beats static friction, and a moving cart whose velocity would be
//! flipped by friction alone is stopped instead.

use crate::types::constants;

/// Speed treated as "at rest" by the friction model (px/s).
const AT_REST: f64 = 1e-6;

/// Gravity and friction along a tilted track.
#[derive(Debug, Clone, Copy)]
pub struct InclineForces {
    /// Gravitational acceleration in px/s².
    pub gravity: f64,
}

impl InclineForces {
    pub fn new(gravity: f64) -> Self {
        Self { gravity }
    }

    /// Horizontal acceleration due to gravity on a track tilted by `tilt`.
    pub fn gravity_along(&self, tilt: f64) -> f64 {
        -self.gravity * tilt.sin()
    }

    /// Magnitude of kinetic friction deceleration.
    pub fn friction_magnitude(&self, tilt: f64, friction: f64) -> f64 {
        (friction * self.gravity * tilt.cos()).abs()
    }

    /// Advance a cart's velocity by one tick.
    pub fn step_velocity(&self, v: f64, tilt: f64, friction: f64, dt: f64) -> f64 {
        let a_g = self.gravity_along(tilt);
        let f = self.friction_magnitude(tilt, friction);

        if v.abs() < AT_REST {
            if a_g.abs() <= f {
                return 0.0;
            }
            return (a_g - a_g.signum() * f) * dt;
        }

        let with_gravity = v + a_g * dt;
        let mut v_new = with_gravity - v.signum() * f * dt;

        // friction may stop a cart but never reverse it
        if v_new * v < 0.0 && with_gravity * v > 0.0 {
            v_new = 0.0;
        }

        if v_new.abs() < constants::REST_SPEED_PX && tilt.abs() < constants::NEAR_FLAT_TILT {
            v_new = 0.0;
        }
        v_new
    }
}

/// Acceleration of a cart/hanging-mass pair joined over a frictionless pulley.
///
/// Ignores the cart's track tilt and friction.
pub fn atwood_acceleration(cart_mass: f64, hanger_mass: f64, gravity: f64) -> f64 {
    let total = cart_mass + hanger_mass;
    if total <= constants::EPSILON {
        return 0.0;
    }
    hanger_mass * gravity / total
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const G: f64 = 3924.0;

    #[test]
    fn test_level_frictionless_stays_at_rest() {
        let forces = InclineForces::new(G);
        let mut v = 0.0;
        for _ in 0..1000 {
            v = forces.step_velocity(v, 0.0, 0.0, 0.016);
        }
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_static_friction_holds() {
        let forces = InclineForces::new(G);
        let tilt = 1.0f64.to_radians();
        let mu = 0.05; // tan(1°) ≈ 0.017 < 0.05
        let mut v = 0.0;
        for _ in 0..500 {
            v = forces.step_velocity(v, tilt, mu, 0.016);
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_sliding_acceleration_matches_closed_form() {
        let forces = InclineForces::new(G);
        let tilt = 5.0f64.to_radians();
        let mu = 0.002;
        let dt = 0.016;
        let mut v = 0.0;
        for _ in 0..125 {
            v = forces.step_velocity(v, tilt, mu, dt);
        }
        let expected = -G * (tilt.sin() - mu * tilt.cos()) * 125.0 * dt;
        assert!((v - expected).abs() < 1e-6, "v={} expected={}", v, expected);
    }

    #[test]
    fn test_friction_stops_without_reversal() {
        let forces = InclineForces::new(G);
        let mu = 0.3;
        let mut v = 50.0; // pushed right on a level track
        let mut saw_zero = false;
        for _ in 0..200 {
            v = forces.step_velocity(v, 0.0, mu, 0.016);
            assert!(v >= 0.0, "friction reversed the cart: {}", v);
            if v == 0.0 {
                saw_zero = true;
            }
        }
        assert!(saw_zero);
    }

    #[test]
    fn test_uphill_push_turns_around_when_gravity_wins() {
        let forces = InclineForces::new(G);
        let tilt = 10.0f64.to_radians(); // downhill is toward -x
        let mut v = 100.0;
        for _ in 0..100 {
            v = forces.step_velocity(v, tilt, 0.01, 0.016);
        }
        assert!(v < 0.0, "cart should roll back down, v={}", v);
    }

    #[test]
    fn test_atwood_acceleration() {
        let a = atwood_acceleration(0.5, 0.05, 9.81);
        assert!((a - 0.05 * 9.81 / 0.55).abs() < 1e-12);
        assert_eq!(atwood_acceleration(0.0, 0.0, 9.81), 0.0);
    }
}
