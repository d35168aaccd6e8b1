use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Orbiter capability
// ---------------------------------------------------------------------------

/// Anything that can participate in a two-body orbit: a mass with a
/// position and velocity expressed in some parent reference frame.
///
/// Positions and velocities are in frame units; `frame_scale` is the
/// parent frame's local scale (meters per frame unit), used to bring
/// relative state vectors into SI magnitudes before deriving elements.
pub trait Orbiter {
    /// Mass, kg. Must be positive.
    fn mass(&self) -> f64;

    /// Position relative to the parent frame's origin, frame units.
    fn position(&self) -> Vector3<f64>;

    /// Velocity relative to the parent frame, frame units per second.
    fn velocity(&self) -> Vector3<f64>;

    /// Meters per unit of the parent frame this body's position is
    /// expressed in. Defaults to 1 (SI-scale frame).
    fn frame_scale(&self) -> f64 {
        1.0
    }
}

/// Plain value implementation of [`Orbiter`] for celestial bodies whose
/// type-specific properties live elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub mass: f64,                // kg
    pub position: Vector3<f64>,   // frame units
    pub velocity: Vector3<f64>,   // frame units / s
    pub frame_scale: f64,         // m per frame unit
}

impl Body {
    pub fn new(mass: f64, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Body {
            mass,
            position,
            velocity,
            frame_scale: 1.0,
        }
    }

    pub fn with_frame_scale(mut self, scale: f64) -> Self {
        self.frame_scale = scale;
        self
    }
}

impl Orbiter for Body {
    fn mass(&self) -> f64 {
        self.mass
    }

    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    fn frame_scale(&self) -> f64 {
        self.frame_scale
    }
}
