pub mod elements;
pub mod orbit;
pub mod stumpff;

pub use elements::OrbitalElements;
pub use orbit::Orbit;
pub use stumpff::{stumpff_c, stumpff_s};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

/// Newtonian constant of gravitation, m^3/(kg·s^2).
pub const G: f64 = 6.674_30e-11;

/// Convergence tolerance for the universal-variable Newton iteration.
pub const KEPLER_TOLERANCE: f64 = 1e-8;

/// Iteration cap for the universal-variable Newton iteration. The
/// underlying equation has no termination guarantee for pathological
/// alpha/t combinations, so the cap bounds worst-case latency and turns
/// non-convergence into an explicit error.
pub const KEPLER_MAX_ITERATIONS: u32 = 100;

/// Circular orbit speed at radius `r` for gravitational parameter `mu`, m/s.
pub fn circular_velocity(mu: f64, r: f64) -> f64 {
    (mu / r).sqrt()
}
