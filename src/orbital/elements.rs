use nalgebra::Vector3;

use crate::error::{Error, Result};

const TAU: f64 = 2.0 * std::f64::consts::PI;

/// Wrap an angle into [0, 2π).
pub(crate) fn wrap_two_pi(angle: f64) -> f64 {
    let a = angle % TAU;
    if a < 0.0 {
        a + TAU
    } else {
        a
    }
}

/// Classical Keplerian orbital elements.
///
/// Periapsis-based rather than semi-major-axis-based so the parabolic
/// case (e = 1, infinite semi-major axis) stays representable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrbitalElements {
    pub periapsis: f64,          // m, distance of closest approach
    pub eccentricity: f64,       // dimensionless, >= 0
    pub inclination: f64,        // rad, [0, π)
    pub angle_ascending: f64,    // rad, [0, 2π), longitude of ascending node
    pub argument_periapsis: f64, // rad, [0, 2π)
    pub true_anomaly: f64,       // rad, [0, 2π)
}

impl OrbitalElements {
    /// Validate every element against its documented range.
    ///
    /// Fails fast with `InvalidElement`; out-of-range values are never
    /// clamped.
    pub fn validated(self) -> Result<Self> {
        fn check(name: &'static str, value: f64, lo: f64, hi: f64) -> Result<()> {
            if !value.is_finite() || value < lo || value >= hi {
                return Err(Error::InvalidElement { name, value });
            }
            Ok(())
        }
        check("periapsis", self.periapsis, 0.0, f64::INFINITY)?;
        check("eccentricity", self.eccentricity, 0.0, f64::INFINITY)?;
        check("inclination", self.inclination, 0.0, std::f64::consts::PI)?;
        check("angle_ascending", self.angle_ascending, 0.0, TAU)?;
        check("argument_periapsis", self.argument_periapsis, 0.0, TAU)?;
        check("true_anomaly", self.true_anomaly, 0.0, TAU)?;
        Ok(self)
    }

    /// Semi-latus rectum p = r_p (1 + e), m.
    pub fn semi_latus_rectum(&self) -> f64 {
        self.periapsis * (1.0 + self.eccentricity)
    }

    /// Semi-major axis, m. Equals the periapsis distance for the
    /// parabolic case, negative for hyperbolic orbits.
    pub fn semi_major_axis(&self) -> f64 {
        let e = self.eccentricity;
        if (e - 1.0).abs() < 1e-12 {
            self.periapsis
        } else {
            self.semi_latus_rectum() / (1.0 - e * e)
        }
    }

    /// Apoapsis distance, m. Infinite for e >= 1.
    pub fn apoapsis(&self) -> f64 {
        if self.eccentricity >= 1.0 {
            f64::INFINITY
        } else {
            self.semi_major_axis() * (1.0 + self.eccentricity)
        }
    }

    /// Perifocal basis (P toward periapsis, Q 90° ahead in the direction
    /// of motion) expressed in the parent frame.
    pub fn perifocal_basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (sin_raan, cos_raan) = self.angle_ascending.sin_cos();
        let (sin_argp, cos_argp) = self.argument_periapsis.sin_cos();
        let (sin_inc, cos_inc) = self.inclination.sin_cos();

        let p = Vector3::new(
            cos_raan * cos_argp - sin_raan * sin_argp * cos_inc,
            sin_raan * cos_argp + cos_raan * sin_argp * cos_inc,
            sin_argp * sin_inc,
        );
        let q = Vector3::new(
            -cos_raan * sin_argp - sin_raan * cos_argp * cos_inc,
            -sin_raan * sin_argp + cos_raan * cos_argp * cos_inc,
            cos_argp * sin_inc,
        );
        (p, q)
    }

    /// Convert elements to a relative state vector (position, velocity)
    /// in the parent frame, for gravitational parameter `mu`.
    pub fn to_state_vectors(&self, mu: f64) -> (Vector3<f64>, Vector3<f64>) {
        let p = self.semi_latus_rectum();
        let (cos_nu, sin_nu) = (self.true_anomaly.cos(), self.true_anomaly.sin());
        let r = p / (1.0 + self.eccentricity * cos_nu);

        let (p_hat, q_hat) = self.perifocal_basis();
        let pos = (p_hat * cos_nu + q_hat * sin_nu) * r;

        let sqrt_mu_p = (mu / p).sqrt();
        let vel =
            p_hat * (-sqrt_mu_p * sin_nu) + q_hat * (sqrt_mu_p * (self.eccentricity + cos_nu));

        (pos, vel)
    }

    /// Derive elements from a relative state vector.
    ///
    /// Fails with `DegenerateOrbit` when the state carries no orbital
    /// angular momentum (zero relative velocity, or velocity parallel to
    /// position) — no orbital plane exists in that case.
    pub fn from_state_vectors(r0: &Vector3<f64>, v0: &Vector3<f64>, mu: f64) -> Result<Self> {
        let r = r0.norm();
        if v0.norm_squared() == 0.0 {
            return Err(Error::DegenerateOrbit("zero relative velocity"));
        }

        // Orbital-plane normal
        let h = r0.cross(v0);
        let h_mag = h.norm();
        if h_mag < 1e-10 * r * v0.norm() {
            return Err(Error::DegenerateOrbit("zero orbital angular momentum"));
        }
        let h_hat = h / h_mag;

        let inclination = (h.z / h_mag).clamp(-1.0, 1.0).acos();
        let angle_ascending = if h.x.abs() + h.y.abs() > 0.0 {
            wrap_two_pi(f64::atan2(h.x, -h.y))
        } else {
            0.0
        };

        // Eccentricity vector points toward periapsis
        let e_vec = v0.cross(&h) / mu - r0 / r;
        let eccentricity = e_vec.norm();

        let r_hat = r0 / r;
        let node = Vector3::new(-h.y, h.x, 0.0);
        let n_mag = node.norm();
        let node_hat = if n_mag > 1e-11 * h_mag {
            node / n_mag
        } else {
            Vector3::x()
        };

        // Reference direction for the anomaly: periapsis when it exists,
        // otherwise the ascending node (circular orbits).
        let reference = if eccentricity > 1e-11 {
            e_vec / eccentricity
        } else {
            node_hat
        };
        let true_anomaly = wrap_two_pi(f64::atan2(
            h_hat.cross(&reference).dot(&r_hat),
            reference.dot(&r_hat),
        ));

        // Argument of periapsis by back-substitution: argument of
        // latitude (node -> position) minus true anomaly.
        let argument_periapsis = if eccentricity > 1e-11 {
            let arg_latitude =
                f64::atan2(h_hat.cross(&node_hat).dot(&r_hat), node_hat.dot(&r_hat));
            wrap_two_pi(arg_latitude - true_anomaly)
        } else {
            0.0
        };

        let periapsis = h_mag * h_mag / mu / (1.0 + eccentricity);

        Ok(OrbitalElements {
            periapsis,
            eccentricity,
            inclination,
            angle_ascending,
            argument_periapsis,
            true_anomaly,
        })
    }
}
