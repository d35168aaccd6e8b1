use nalgebra::Vector3;
use tracing::warn;

use crate::error::{Error, Result};
use crate::orbital::elements::{wrap_two_pi, OrbitalElements};
use crate::orbital::stumpff::{stumpff_c, stumpff_s};
use crate::orbital::{circular_velocity, G, KEPLER_MAX_ITERATIONS, KEPLER_TOLERANCE};
use crate::orbiter::Orbiter;

// ---------------------------------------------------------------------------
// Two-body Keplerian orbit snapshot
// ---------------------------------------------------------------------------

/// Immutable snapshot of a two-body Keplerian orbit.
///
/// Captures the relative state of the orbiting body at one instant; every
/// derived quantity is computed eagerly at construction. An `Orbit` does
/// not track live motion — when either body moves, construct a new
/// snapshot. [`Orbit::state_vectors_at`] projects the snapshot forward or
/// backward in time without mutating it.
#[derive(Debug, Clone, Copy)]
pub struct Orbit {
    pub orbiting_mass: f64,      // kg
    pub orbited_mass: f64,       // kg
    pub mu: f64,                 // m^3/s^2, G·(m1 + m2)
    pub r0: Vector3<f64>,        // m, relative position at epoch
    pub v0: Vector3<f64>,        // m/s, relative velocity at epoch
    pub elements: OrbitalElements,
    pub semi_major_axis: f64,    // m (negative for hyperbolic)
    pub apoapsis: f64,           // m, +inf when eccentricity >= 1
    pub radius: f64,             // m, |r0|
    pub alpha: f64,              // m^2/s^2, mu / semi_major_axis
    pub period: Option<f64>,     // s, None for non-elliptical orbits
}

impl Orbit {
    /// Derive an orbit from the current state of two orbiters.
    ///
    /// The relative state vectors are scaled into SI magnitudes via the
    /// orbited body's frame scale before elements are derived.
    pub fn from_orbiters(orbiting: &dyn Orbiter, orbited: &dyn Orbiter) -> Result<Orbit> {
        let scale = orbited.frame_scale();
        let r0 = (orbiting.position() - orbited.position()) * scale;
        let v0 = (orbiting.velocity() - orbited.velocity()) * scale;
        Orbit::from_state_vectors(r0, v0, orbiting.mass(), orbited.mass())
    }

    /// Derive an orbit from relative state vectors in SI units.
    pub fn from_state_vectors(
        r0: Vector3<f64>,
        v0: Vector3<f64>,
        orbiting_mass: f64,
        orbited_mass: f64,
    ) -> Result<Orbit> {
        let mu = G * (orbiting_mass + orbited_mass);
        let elements = OrbitalElements::from_state_vectors(&r0, &v0, mu)?;

        let radius = r0.norm();
        // Vis-viva: a = -mu / 2 / (v²/2 - mu/r). Diverges for the
        // parabolic case, where alpha goes to zero.
        let energy = v0.norm_squared() / 2.0 - mu / radius;
        let semi_major_axis = if energy.abs() > 0.0 {
            -mu / (2.0 * energy)
        } else {
            f64::INFINITY
        };

        Ok(Orbit {
            orbiting_mass,
            orbited_mass,
            mu,
            r0,
            v0,
            elements,
            semi_major_axis,
            apoapsis: elements.apoapsis(),
            radius,
            alpha: mu / semi_major_axis,
            period: period_for(elements.eccentricity, semi_major_axis, mu),
        })
    }

    /// Construct an orbit from validated classical elements.
    ///
    /// Fails with `InvalidElement` for out-of-range input. The epoch
    /// state vectors are derived from the elements; use
    /// [`Orbit::placement_around`] to obtain the orbiting body's absolute
    /// position and velocity.
    pub fn from_elements(
        elements: OrbitalElements,
        orbiting_mass: f64,
        orbited_mass: f64,
    ) -> Result<Orbit> {
        let elements = elements.validated()?;
        let mu = G * (orbiting_mass + orbited_mass);
        let (r0, v0) = elements.to_state_vectors(mu);
        let semi_major_axis = elements.semi_major_axis();

        Ok(Orbit {
            orbiting_mass,
            orbited_mass,
            mu,
            r0,
            v0,
            elements,
            semi_major_axis,
            apoapsis: elements.apoapsis(),
            radius: r0.norm(),
            alpha: mu / semi_major_axis,
            period: period_for(elements.eccentricity, semi_major_axis, mu),
        })
    }

    /// Construct a circular orbit through the orbiting body's current
    /// position, assuming that position lies on the orbit.
    ///
    /// Eccentricity is exactly zero; the orbital plane is chosen from the
    /// relative position vector alone, with the velocity along the
    /// perifocal Q axis at circular speed.
    pub fn circular(orbiting: &dyn Orbiter, orbited: &dyn Orbiter) -> Result<Orbit> {
        let scale = orbited.frame_scale();
        let r0 = (orbiting.position() - orbited.position()) * scale;
        let radius = r0.norm();
        if radius == 0.0 {
            return Err(Error::DegenerateOrbit("coincident bodies"));
        }
        let r_hat = r0 / radius;

        let mu = G * (orbiting.mass() + orbited.mass());

        // Prograde direction in the plane containing the position; falls
        // back to an arbitrary perpendicular for polar-axis positions.
        let mut tangent = Vector3::z().cross(&r_hat);
        if tangent.norm_squared() < 1e-20 {
            tangent = r_hat.cross(&Vector3::x());
        }
        let q_hat = tangent.normalize();
        let v0 = q_hat * circular_velocity(mu, radius);

        let h = r0.cross(&v0);
        let h_mag = h.norm();
        let h_hat = h / h_mag;
        let inclination = (h.z / h_mag).clamp(-1.0, 1.0).acos();
        let angle_ascending = if h.x.abs() + h.y.abs() > 0.0 {
            wrap_two_pi(f64::atan2(h.x, -h.y))
        } else {
            0.0
        };
        let node = Vector3::new(-h.y, h.x, 0.0);
        let node_hat = if node.norm() > 1e-11 * h_mag {
            node.normalize()
        } else {
            Vector3::x()
        };
        let true_anomaly = wrap_two_pi(f64::atan2(
            h_hat.cross(&node_hat).dot(&r_hat),
            node_hat.dot(&r_hat),
        ));

        let elements = OrbitalElements {
            periapsis: radius,
            eccentricity: 0.0,
            inclination,
            angle_ascending,
            argument_periapsis: 0.0,
            true_anomaly,
        };

        Ok(Orbit {
            orbiting_mass: orbiting.mass(),
            orbited_mass: orbited.mass(),
            mu,
            r0,
            v0,
            elements,
            semi_major_axis: radius,
            apoapsis: radius,
            radius,
            alpha: mu / radius,
            period: period_for(0.0, radius, mu),
        })
    }

    /// Absolute placement of the orbiting body implied by this snapshot:
    /// the orbited body's position/velocity plus the relative state,
    /// converted back into the orbited body's frame units.
    pub fn placement_around(&self, orbited: &dyn Orbiter) -> (Vector3<f64>, Vector3<f64>) {
        let scale = orbited.frame_scale();
        (
            orbited.position() + self.r0 / scale,
            orbited.velocity() + self.v0 / scale,
        )
    }

    // -----------------------------------------------------------------------
    // Universal-variable propagation
    // -----------------------------------------------------------------------

    /// Relative position and velocity `t` seconds after the epoch.
    ///
    /// Solves the universal Kepler equation by Newton's method on the
    /// universal anomaly, covering elliptical, parabolic, and hyperbolic
    /// orbits through the Stumpff-function branches. Returns
    /// `DidNotConverge` if the iteration cap is exhausted.
    pub fn state_vectors_at(&self, t: f64) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let sqrt_mu = self.mu.sqrt();
        let r0_norm = self.radius;
        // Radial velocity component at epoch
        let vr0 = self.r0.dot(&self.v0) / r0_norm;
        // Reciprocal semi-major axis from vis-viva; zero for parabolic
        let a_inv = 2.0 / r0_norm - self.v0.norm_squared() / self.mu;

        let mut x = if a_inv.abs() > 1e-30 {
            sqrt_mu * a_inv.abs() * t
        } else {
            sqrt_mu * t / r0_norm
        };

        let mut converged = false;
        for _ in 0..KEPLER_MAX_ITERATIONS {
            let z = a_inv * x * x;
            let c = stumpff_c(z);
            let s = stumpff_s(z);

            let f = r0_norm * vr0 / sqrt_mu * x * x * c
                + (1.0 - a_inv * r0_norm) * x * x * x * s
                + r0_norm * x
                - sqrt_mu * t;
            let f_prime = r0_norm * vr0 / sqrt_mu * x * (1.0 - z * s)
                + (1.0 - a_inv * r0_norm) * x * x * c
                + r0_norm;

            let ratio = f / f_prime;
            x -= ratio;
            if ratio.abs() < KEPLER_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                t,
                alpha = self.alpha,
                "universal Kepler iteration exhausted its budget"
            );
            return Err(Error::DidNotConverge {
                iterations: KEPLER_MAX_ITERATIONS,
            });
        }

        // Lagrange coefficients from the converged universal anomaly
        let z = a_inv * x * x;
        let c = stumpff_c(z);
        let s = stumpff_s(z);
        let f = 1.0 - x * x / r0_norm * c;
        let g = t - x * x * x / sqrt_mu * s;
        let pos = self.r0 * f + self.v0 * g;

        let r_norm = pos.norm();
        let f_dot = sqrt_mu / (r_norm * r0_norm) * x * (z * s - 1.0);
        let g_dot = 1.0 - x * x / r_norm * c;
        let vel = self.r0 * f_dot + self.v0 * g_dot;

        Ok((pos, vel))
    }

    // -----------------------------------------------------------------------
    // Spheres of gravitational dominance
    // -----------------------------------------------------------------------

    /// Hill sphere radius of the orbiting body, m.
    pub fn hill_sphere_radius(&self) -> f64 {
        self.semi_major_axis
            * (1.0 - self.elements.eccentricity)
            * (self.orbiting_mass / (3.0 * self.orbited_mass)).cbrt()
    }

    /// Mutual Hill sphere radius against another body of `other_mass`
    /// orbiting the same primary at a comparable distance, m.
    pub fn mutual_hill_sphere_radius(&self, other_mass: f64) -> f64 {
        self.semi_major_axis
            * ((self.orbiting_mass + other_mass) / (3.0 * self.orbited_mass)).cbrt()
    }

    /// Sphere-of-influence radius (Laplace approximation), m.
    pub fn sphere_of_influence_radius(&self) -> f64 {
        self.semi_major_axis * (self.orbiting_mass / self.orbited_mass).powf(0.4)
    }
}

fn period_for(eccentricity: f64, semi_major_axis: f64, mu: f64) -> Option<f64> {
    if eccentricity < 1.0 && semi_major_axis.is_finite() {
        Some(2.0 * std::f64::consts::PI * (semi_major_axis.powi(3) / mu).sqrt())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbiter::Body;

    const M_SUN: f64 = 1.989e30; // kg
    const M_EARTH: f64 = 5.97e24; // kg
    const AU: f64 = 1.496e11; // m

    fn earth_circular() -> Orbit {
        let sun = Body::new(M_SUN, Vector3::zeros(), Vector3::zeros());
        let earth = Body::new(M_EARTH, Vector3::new(AU, 0.0, 0.0), Vector3::zeros());
        Orbit::circular(&earth, &sun).unwrap()
    }

    #[test]
    fn circular_orbit_period_is_one_year() {
        let orbit = earth_circular();
        let period = orbit.period.expect("circular orbit has a period");
        // One sidereal-ish year, within 1%
        assert!(
            (period - 3.156e7).abs() / 3.156e7 < 0.01,
            "expected ~3.156e7 s, got {:.3e}",
            period
        );
    }

    #[test]
    fn propagation_is_identity_at_t0() {
        let elements = OrbitalElements {
            periapsis: 0.9 * AU,
            eccentricity: 0.3,
            inclination: 0.2,
            angle_ascending: 1.0,
            argument_periapsis: 0.4,
            true_anomaly: 2.0,
        };
        let orbit = Orbit::from_elements(elements, M_EARTH, M_SUN).unwrap();
        let (pos, vel) = orbit.state_vectors_at(0.0).unwrap();
        assert!((pos - orbit.r0).norm() < 1e-6 * orbit.radius);
        assert!((vel - orbit.v0).norm() < 1e-6 * orbit.v0.norm());
    }

    #[test]
    fn circular_orbit_invariants_hold_under_propagation() {
        let orbit = earth_circular();
        assert_eq!(orbit.elements.eccentricity, 0.0);
        assert_eq!(orbit.apoapsis, orbit.elements.periapsis);
        assert_eq!(orbit.semi_major_axis, orbit.radius);

        let period = orbit.period.unwrap();
        for frac in [0.1, 0.25, 0.5, 0.9] {
            let (pos, vel) = orbit.state_vectors_at(period * frac).unwrap();
            assert!(
                (pos.norm() - orbit.radius).abs() / orbit.radius < 1e-6,
                "radius drifted at {frac} of a period"
            );
            assert!(
                (vel.norm() - orbit.v0.norm()).abs() / orbit.v0.norm() < 1e-6,
                "speed drifted at {frac} of a period"
            );
        }
    }

    #[test]
    fn elliptical_orbit_closes_after_one_period() {
        let elements = OrbitalElements {
            periapsis: 0.7 * AU,
            eccentricity: 0.4,
            inclination: 0.3,
            angle_ascending: 0.8,
            argument_periapsis: 1.5,
            true_anomaly: 0.0,
        };
        let orbit = Orbit::from_elements(elements, M_EARTH, M_SUN).unwrap();
        let period = orbit.period.unwrap();
        let (pos, vel) = orbit.state_vectors_at(period).unwrap();
        assert!(
            (pos - orbit.r0).norm() / orbit.radius < 1e-6,
            "position did not close: error {:.3e} m",
            (pos - orbit.r0).norm()
        );
        assert!((vel - orbit.v0).norm() / orbit.v0.norm() < 1e-6);
    }

    #[test]
    fn propagation_works_backward_in_time() {
        let orbit = earth_circular();
        let period = orbit.period.unwrap();
        let forward = orbit.state_vectors_at(period * 0.25).unwrap();
        let backward = orbit.state_vectors_at(-period * 0.75).unwrap();
        assert!((forward.0 - backward.0).norm() / orbit.radius < 1e-5);
    }

    #[test]
    fn hyperbolic_propagation_conserves_energy() {
        // e = 1.5: z < 0 branch of the Stumpff functions
        let elements = OrbitalElements {
            periapsis: 0.5 * AU,
            eccentricity: 1.5,
            inclination: 0.1,
            angle_ascending: 0.0,
            argument_periapsis: 0.0,
            true_anomaly: 0.0,
        };
        let orbit = Orbit::from_elements(elements, M_EARTH, M_SUN).unwrap();
        assert!(orbit.period.is_none());
        assert!(orbit.apoapsis.is_infinite());

        let energy0 = orbit.v0.norm_squared() / 2.0 - orbit.mu / orbit.radius;
        let (pos, vel) = orbit.state_vectors_at(3.0e7).unwrap();
        let energy1 = vel.norm_squared() / 2.0 - orbit.mu / pos.norm();
        assert!(
            (energy1 - energy0).abs() / energy0.abs() < 1e-6,
            "specific energy drifted: {energy0:.6e} -> {energy1:.6e}"
        );
        assert!(pos.norm() > orbit.radius, "hyperbolic orbit should recede");
    }

    #[test]
    fn parabolic_propagation_converges() {
        // e = 1 exactly: alpha ≈ 0, z ≈ 0 branch
        let elements = OrbitalElements {
            periapsis: 0.5 * AU,
            eccentricity: 1.0,
            inclination: 0.0,
            angle_ascending: 0.0,
            argument_periapsis: 0.0,
            true_anomaly: 0.0,
        };
        let orbit = Orbit::from_elements(elements, M_EARTH, M_SUN).unwrap();
        let energy0 = orbit.v0.norm_squared() / 2.0 - orbit.mu / orbit.radius;
        assert!(energy0.abs() < 1e-4 * orbit.mu / orbit.radius, "parabolic energy ~ 0");

        let (pos, vel) = orbit.state_vectors_at(1.0e7).unwrap();
        let energy1 = vel.norm_squared() / 2.0 - orbit.mu / pos.norm();
        assert!((energy1 - energy0).abs() < 1e-4 * orbit.mu / orbit.radius);
    }

    #[test]
    fn state_vector_roundtrip_through_elements() {
        let elements = OrbitalElements {
            periapsis: 1.2 * AU,
            eccentricity: 0.2,
            inclination: 0.5,
            angle_ascending: 2.0,
            argument_periapsis: 3.0,
            true_anomaly: 1.0,
        };
        let orbit = Orbit::from_elements(elements, M_EARTH, M_SUN).unwrap();
        let rederived =
            Orbit::from_state_vectors(orbit.r0, orbit.v0, M_EARTH, M_SUN).unwrap();
        assert!(
            (rederived.elements.eccentricity - elements.eccentricity).abs() < 1e-6
        );
        assert!(
            (rederived.semi_major_axis - orbit.semi_major_axis).abs() / orbit.semi_major_axis
                < 1e-6
        );
        assert!((rederived.elements.true_anomaly - elements.true_anomaly).abs() < 1e-6);
    }

    #[test]
    fn from_orbiters_applies_frame_scale() {
        // Positions in AU-scale frame units; frame scale converts to m.
        let sun = Body::new(M_SUN, Vector3::zeros(), Vector3::zeros()).with_frame_scale(AU);
        let earth = Body::new(
            M_EARTH,
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 29_780.0 / AU, 0.0),
        )
        .with_frame_scale(AU);
        let orbit = Orbit::from_orbiters(&earth, &sun).unwrap();
        assert!((orbit.radius - AU).abs() < 1.0);
        assert!(orbit.elements.eccentricity < 0.02);
    }

    #[test]
    fn earth_hill_and_soi_radii() {
        let orbit = earth_circular();
        let hill = orbit.hill_sphere_radius();
        assert!(
            (hill - 1.5e9).abs() / 1.5e9 < 0.05,
            "Earth Hill radius should be ~1.5e9 m, got {hill:.3e}"
        );
        let soi = orbit.sphere_of_influence_radius();
        assert!(
            (soi - 9.25e8).abs() / 9.25e8 < 0.05,
            "Earth SOI should be ~9.25e8 m, got {soi:.3e}"
        );
        let mutual = orbit.mutual_hill_sphere_radius(M_EARTH);
        assert!(mutual > hill, "mutual Hill radius includes both masses");
    }

    #[test]
    fn rejects_invalid_elements() {
        let bad = OrbitalElements {
            periapsis: AU,
            eccentricity: -0.5,
            inclination: 0.0,
            angle_ascending: 0.0,
            argument_periapsis: 0.0,
            true_anomaly: 0.0,
        };
        assert!(Orbit::from_elements(bad, M_EARTH, M_SUN).is_err());
    }

    #[test]
    fn placement_writes_back_into_parent_frame() {
        let sun = Body::new(M_SUN, Vector3::new(5.0, 0.0, 0.0), Vector3::zeros())
            .with_frame_scale(AU);
        let elements = OrbitalElements {
            periapsis: AU,
            eccentricity: 0.0,
            inclination: 0.0,
            angle_ascending: 0.0,
            argument_periapsis: 0.0,
            true_anomaly: 0.0,
        };
        let orbit = Orbit::from_elements(elements, M_EARTH, M_SUN).unwrap();
        let (pos, _) = orbit.placement_around(&sun);
        // Periapsis of 1 AU in a frame where 1 unit = 1 AU
        assert!((pos - Vector3::new(6.0, 0.0, 0.0)).norm() < 1e-6);
    }
}
