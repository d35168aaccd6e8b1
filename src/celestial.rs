use nalgebra::Vector3;

use crate::orbital::G;
use crate::space::{LocationId, LocationTree};

// ---------------------------------------------------------------------------
// Thin numerical consumers of the orbit and location cores
// ---------------------------------------------------------------------------

/// Stefan-Boltzmann constant, W/(m^2·K^4).
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;

/// Radiant flux received at `distance` from a source of the given
/// luminosity, W/m^2.
pub fn insolation(luminosity: f64, distance: f64) -> f64 {
    luminosity / (4.0 * std::f64::consts::PI * distance * distance)
}

/// Blackbody equilibrium temperature for a given incident flux and Bond
/// albedo, K. Assumes full heat redistribution.
pub fn equilibrium_temperature(flux: f64, albedo: f64) -> f64 {
    (flux * (1.0 - albedo) / (4.0 * STEFAN_BOLTZMANN)).powf(0.25)
}

/// Gravitational acceleration at a body's surface, m/s^2.
pub fn surface_gravity(mass: f64, radius: f64) -> f64 {
    G * mass / (radius * radius)
}

/// Gravitational acceleration vector at `at` due to a mass at `source`,
/// in `at`'s reference frame, m/s^2 (positions taken as meters).
///
/// `None` when the two locations share no reference frame, or when they
/// coincide (direction undefined).
pub fn gravity_vector(
    tree: &LocationTree,
    at: LocationId,
    source: LocationId,
    source_mass: f64,
) -> Option<Vector3<f64>> {
    let toward = tree.localized_position(at, source)?;
    let d2 = toward.norm_squared();
    if d2 == 0.0 {
        return None;
    }
    Some(toward * (G * source_mass / d2 / d2.sqrt()))
}
