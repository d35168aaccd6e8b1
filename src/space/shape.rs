use nalgebra::Vector3;

/// Spherical region shape.
///
/// The only shape the containment tree needs: every region is described
/// by the smallest sphere that encloses it, so containment and
/// intersection tests reduce to distance comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    pub radius: f64, // frame units
}

impl Sphere {
    pub fn new(radius: f64) -> Self {
        Sphere { radius }
    }

    /// Radius of the smallest sphere centered at the region's position
    /// that fully encloses it. For a sphere, the radius itself.
    pub fn containing_radius(&self) -> f64 {
        self.radius
    }

    /// Whether `point` (relative to this shape's center) lies inside.
    pub fn contains_point(&self, point: &Vector3<f64>) -> bool {
        point.norm_squared() <= self.radius * self.radius
    }

    /// Whether another sphere at `offset` (relative to this shape's
    /// center) overlaps this one.
    pub fn intersects(&self, other: &Sphere, offset: &Vector3<f64>) -> bool {
        let reach = self.radius + other.radius;
        offset.norm_squared() <= reach * reach
    }
}
