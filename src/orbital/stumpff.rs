// ---------------------------------------------------------------------------
// Stumpff functions C(z), S(z)
// ---------------------------------------------------------------------------
//
// Auxiliary functions of the universal-variable formulation. Both branch on
// the sign of z = x^2 / a: trig forms for elliptical orbits (z > 0),
// hyperbolic-trig forms for hyperbolic orbits (z < 0), and the series
// limits 1/2 and 1/6 at z = 0 (parabolic). The z ≈ 0 window uses the
// limits directly since the closed forms lose precision to cancellation
// there.

/// Width of the window around z = 0 in which the closed-form limits are
/// used instead of the trig/hyperbolic branches.
const NEAR_ZERO: f64 = 1e-9;

/// Stumpff C(z) = (1 - cos√z)/z for z > 0, (cosh√-z - 1)/(-z) for z < 0.
pub fn stumpff_c(z: f64) -> f64 {
    if z > NEAR_ZERO {
        let sqrt_z = z.sqrt();
        (1.0 - sqrt_z.cos()) / z
    } else if z < -NEAR_ZERO {
        let sqrt_mz = (-z).sqrt();
        (sqrt_mz.cosh() - 1.0) / -z
    } else {
        0.5
    }
}

/// Stumpff S(z) = (√z - sin√z)/√z³ for z > 0, (sinh√-z - √-z)/√(-z)³ for z < 0.
pub fn stumpff_s(z: f64) -> f64 {
    if z > NEAR_ZERO {
        let sqrt_z = z.sqrt();
        (sqrt_z - sqrt_z.sin()) / (z * sqrt_z)
    } else if z < -NEAR_ZERO {
        let sqrt_mz = (-z).sqrt();
        (sqrt_mz.sinh() - sqrt_mz) / (-z * sqrt_mz)
    } else {
        1.0 / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_at_zero() {
        assert_eq!(stumpff_c(0.0), 0.5);
        assert!((stumpff_s(0.0) - 1.0 / 6.0).abs() < 1e-15);
    }

    #[test]
    fn continuity_across_zero() {
        // Both branch formulas must agree with the z = 0 limits just
        // outside the near-zero window.
        for z in [1e-6, -1e-6] {
            assert!(
                (stumpff_c(z) - 0.5).abs() < 1e-6,
                "C({z}) should approach 1/2, got {}",
                stumpff_c(z)
            );
            assert!(
                (stumpff_s(z) - 1.0 / 6.0).abs() < 1e-6,
                "S({z}) should approach 1/6, got {}",
                stumpff_s(z)
            );
        }
    }

    #[test]
    fn elliptical_branch_values() {
        // C(z) = (1 - cos√z)/z at z = π² gives (1 - cos π)/π² = 2/π²
        let z = std::f64::consts::PI * std::f64::consts::PI;
        let expected = 2.0 / z;
        assert!((stumpff_c(z) - expected).abs() < 1e-12);
    }

    #[test]
    fn hyperbolic_branch_values() {
        // At z = -1: C = cosh(1) - 1, S = sinh(1) - 1
        assert!((stumpff_c(-1.0) - (1.0_f64.cosh() - 1.0)).abs() < 1e-12);
        assert!((stumpff_s(-1.0) - (1.0_f64.sinh() - 1.0)).abs() < 1e-12);
    }
}
