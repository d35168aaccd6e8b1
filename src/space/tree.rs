use nalgebra::Vector3;
use rand::Rng;
use tracing::debug;

use crate::space::shape::Sphere;

/// Default attempt budget for [`LocationTree::try_get_open_space`].
pub const DEFAULT_OPEN_SPACE_ATTEMPTS: u32 = 10_000;

/// Handle to a node in a [`LocationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationId(usize);

/// A node in the containment tree: a point of space, or a region with a
/// spherical shape. `position` is always relative to the current parent;
/// no global coordinate system exists.
#[derive(Debug, Clone)]
pub struct Location {
    position: Vector3<f64>,
    shape: Option<Sphere>,
    parent: Option<LocationId>,
    children: Vec<LocationId>,
}

impl Location {
    /// Position relative to the parent's center, frame units.
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn parent(&self) -> Option<LocationId> {
        self.parent
    }

    pub fn children(&self) -> &[LocationId] {
        &self.children
    }

    pub fn shape(&self) -> Option<&Sphere> {
        self.shape.as_ref()
    }

    pub fn is_region(&self) -> bool {
        self.shape.is_some()
    }

    /// Radius of the smallest enclosing sphere; zero for point locations.
    pub fn containing_radius(&self) -> f64 {
        self.shape.map_or(0.0, |s| s.containing_radius())
    }
}

/// Arena-owned tree of nested reference frames.
///
/// The tree owns every node; `LocationId` handles are the non-owning
/// back-references. Structural mutation keeps the invariant that a
/// child's stored position is relative to its current parent — position
/// recomputation and re-linking happen together, with cascades applied
/// as a single batch after a read-only planning pass.
#[derive(Debug, Default, Clone)]
pub struct LocationTree {
    nodes: Vec<Location>,
}

impl LocationTree {
    pub fn new() -> Self {
        LocationTree { nodes: Vec::new() }
    }

    /// Insert a point location. `parent = None` creates a new root.
    pub fn insert_point(&mut self, parent: Option<LocationId>, position: Vector3<f64>) -> LocationId {
        self.insert(parent, position, None)
    }

    /// Insert a spherical region.
    pub fn insert_region(
        &mut self,
        parent: Option<LocationId>,
        position: Vector3<f64>,
        radius: f64,
    ) -> LocationId {
        self.insert(parent, position, Some(Sphere::new(radius)))
    }

    fn insert(
        &mut self,
        parent: Option<LocationId>,
        position: Vector3<f64>,
        shape: Option<Sphere>,
    ) -> LocationId {
        let id = LocationId(self.nodes.len());
        self.nodes.push(Location {
            position,
            shape,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    pub fn get(&self, id: LocationId) -> &Location {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Path from the root down to `id`, inclusive.
    fn root_path(&self, id: LocationId) -> Vec<LocationId> {
        let mut path = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            path.push(c);
            cur = self.nodes[c.0].parent;
        }
        path.reverse();
        path
    }

    // -----------------------------------------------------------------------
    // Ancestry and frame translation
    // -----------------------------------------------------------------------

    /// Nearest common ancestor of two locations, or `None` when they
    /// belong to unrelated trees.
    pub fn common_ancestor(&self, a: LocationId, b: LocationId) -> Option<LocationId> {
        if a == b {
            return Some(a);
        }
        let pa = self.nodes[a.0].parent;
        let pb = self.nodes[b.0].parent;
        if pa == Some(b) {
            return Some(b);
        }
        if pb == Some(a) {
            return Some(a);
        }
        if pa.is_some() && pa == pb {
            return pa;
        }

        // Longest common prefix of the two root paths
        let path_a = self.root_path(a);
        let path_b = self.root_path(b);
        let mut common = None;
        for (x, y) in path_a.iter().zip(path_b.iter()) {
            if x == y {
                common = Some(*x);
            } else {
                break;
            }
        }
        common
    }

    /// Translate `point`, expressed relative to `other`'s center, into a
    /// point relative to `this`'s center. `None` when the two locations
    /// share no ancestor — a distinct outcome, never conflated with a
    /// coincident origin.
    pub fn localize(
        &self,
        this: LocationId,
        other: LocationId,
        point: Vector3<f64>,
    ) -> Option<Vector3<f64>> {
        let ancestor = self.common_ancestor(this, other)?;

        // Walk each side up to the ancestor, accumulating the relative
        // positions; child positions are relative to their parent.
        let mut acc = point;
        let mut cur = other;
        while cur != ancestor {
            acc += self.nodes[cur.0].position;
            cur = self.nodes[cur.0].parent.expect("ancestor lies on the root path");
        }
        let mut offset = Vector3::zeros();
        let mut cur = this;
        while cur != ancestor {
            offset += self.nodes[cur.0].position;
            cur = self.nodes[cur.0].parent.expect("ancestor lies on the root path");
        }
        Some(acc - offset)
    }

    /// Position of `other`'s center relative to `this`'s center.
    pub fn localized_position(&self, this: LocationId, other: LocationId) -> Option<Vector3<f64>> {
        self.localize(this, other, Vector3::zeros())
    }

    /// Distance between the centers of two locations.
    pub fn distance_to(&self, this: LocationId, other: LocationId) -> Option<f64> {
        self.localized_position(this, other).map(|p| p.norm())
    }

    /// Distance from a point (relative to `this`) to `other`'s center.
    pub fn distance_from_position_to(
        &self,
        this: LocationId,
        position: Vector3<f64>,
        other: LocationId,
    ) -> Option<f64> {
        self.localized_position(this, other)
            .map(|p| (p - position).norm())
    }

    // -----------------------------------------------------------------------
    // Containment queries
    // -----------------------------------------------------------------------

    /// Whether `this` contains `other`: `other` must descend from `this`
    /// in the tree, and for regions the other's enclosing sphere must
    /// intersect this region's shape at its localized position.
    pub fn contains(&self, this: LocationId, other: LocationId) -> bool {
        match self.common_ancestor(this, other) {
            Some(c) if c == this => {}
            _ => return false,
        }
        match &self.nodes[this.0].shape {
            Some(shape) => {
                let other_sphere = Sphere::new(self.nodes[other.0].containing_radius());
                match self.localized_position(this, other) {
                    Some(offset) => shape.intersects(&other_sphere, &offset),
                    None => false,
                }
            }
            None => true,
        }
    }

    /// Whether a point relative to `region`'s center lies inside its shape.
    pub fn contains_position(&self, region: LocationId, point: &Vector3<f64>) -> bool {
        self.nodes[region.0]
            .shape
            .map_or(false, |s| s.contains_point(point))
    }

    /// Tightest region in `region`'s subtree (excluding `region` itself)
    /// whose shape contains `point` (relative to `region`): the candidate
    /// with the smallest containing radius. Linear scan over the subtree.
    pub fn containing_child(&self, region: LocationId, point: &Vector3<f64>) -> Option<LocationId> {
        self.tightest_region(region, point, 0.0, None)
            .filter(|&found| found != region)
    }

    /// Tightest region in `region`'s subtree containing `other`'s center.
    pub fn containing_child_of(&self, region: LocationId, other: LocationId) -> Option<LocationId> {
        let point = self.localized_position(region, other)?;
        self.containing_child(region, &point)
    }

    /// Minimum-containing-radius region at or below `root` whose shape
    /// contains `point` (relative to `root`) and whose containing radius
    /// exceeds `min_radius`. `exclude` prunes a subtree from the scan.
    fn tightest_region(
        &self,
        root: LocationId,
        point: &Vector3<f64>,
        min_radius: f64,
        exclude: Option<LocationId>,
    ) -> Option<LocationId> {
        let mut best: Option<(LocationId, f64)> = None;
        // Stack entries carry the point re-expressed in the node's frame.
        let mut stack = vec![(root, *point)];
        while let Some((id, local)) = stack.pop() {
            if Some(id) == exclude {
                continue;
            }
            let node = &self.nodes[id.0];
            if let Some(shape) = &node.shape {
                let r = shape.containing_radius();
                if r > min_radius
                    && shape.contains_point(&local)
                    && best.map_or(true, |(_, br)| r < br)
                {
                    best = Some((id, r));
                }
            }
            for &child in &node.children {
                stack.push((child, local - self.nodes[child.0].position));
            }
        }
        best.map(|(id, _)| id)
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    /// Re-parent `child` under `new_parent`, preserving absolute
    /// placement where a common ancestor exists (position resets to zero
    /// for unrelated trees).
    ///
    /// The child settles into the tightest region under the requested
    /// parent that geometrically contains it, and, if the child is itself
    /// a region, captures any new sibling that it now more tightly
    /// contains (smaller containing radius, center inside the child's
    /// shape). All moves are planned on a read-only pass before any link
    /// is touched, so a cascade is never observable half-applied.
    pub fn set_parent(&mut self, child: LocationId, new_parent: Option<LocationId>) {
        // Re-parenting under the child's own subtree would create a cycle.
        if let Some(p) = new_parent {
            if self.root_path(p).contains(&child) {
                debug!(?child, ?new_parent, "ignoring re-parent into own subtree");
                return;
            }
        }

        // Plan: translate the child's position into the requested frame,
        // then descend to the tightest containing region.
        let (parent, position) = match new_parent {
            Some(p) => {
                let at_requested = self
                    .localized_position(p, child)
                    .unwrap_or_else(Vector3::zeros);
                if self.nodes[child.0].is_region() {
                    // Size-ordered nesting applies to regions only: settle
                    // into the tightest region that can hold this one.
                    let child_radius = self.nodes[child.0].containing_radius();
                    match self.tightest_region(p, &at_requested, child_radius, Some(child)) {
                        Some(tight) if tight != p => {
                            let local = self
                                .localize(tight, p, at_requested)
                                .expect("tightest region descends from the requested parent");
                            (Some(tight), local)
                        }
                        _ => (Some(p), at_requested),
                    }
                } else {
                    (Some(p), at_requested)
                }
            }
            None => (None, Vector3::zeros()),
        };

        // Plan: siblings captured by the moved region.
        let mut captured: Vec<(LocationId, Vector3<f64>)> = Vec::new();
        if let (Some(shape), Some(p)) = (self.nodes[child.0].shape, parent) {
            let child_radius = shape.containing_radius();
            for &sib in &self.nodes[p.0].children {
                if sib == child {
                    continue;
                }
                let offset = self.nodes[sib.0].position - position;
                if self.nodes[sib.0].containing_radius() < child_radius
                    && shape.contains_point(&offset)
                {
                    captured.push((sib, offset));
                }
            }
        }

        // Apply: one atomic batch of link updates.
        self.detach(child);
        self.nodes[child.0].parent = parent;
        self.nodes[child.0].position = position;
        if let Some(p) = parent {
            self.nodes[p.0].children.push(child);
        }
        if !captured.is_empty() {
            debug!(?child, count = captured.len(), "re-parent cascade captured siblings");
        }
        for (sib, offset) in captured {
            self.detach(sib);
            self.nodes[sib.0].parent = Some(child);
            self.nodes[sib.0].position = offset;
            self.nodes[child.0].children.push(sib);
        }
    }

    fn detach(&mut self, id: LocationId) {
        if let Some(p) = self.nodes[id.0].parent {
            self.nodes[p.0].children.retain(|&c| c != id);
        }
        self.nodes[id.0].parent = None;
    }

    // -----------------------------------------------------------------------
    // Open-space search
    // -----------------------------------------------------------------------

    /// Find a position inside `region` where a sphere of `radius` fits
    /// without intersecting any existing child, by rejection sampling.
    ///
    /// Returns `None` when `region` is not a region, the sphere cannot
    /// fit at all, or the attempt budget is exhausted — an expected,
    /// recoverable outcome under dense packing, not an error.
    pub fn try_get_open_space<R: Rng>(
        &self,
        region: LocationId,
        radius: f64,
        rng: &mut R,
        max_attempts: u32,
    ) -> Option<Vector3<f64>> {
        let shape = self.nodes[region.0].shape?;
        let bound = shape.containing_radius() - radius;
        if bound < 0.0 {
            return None;
        }
        let candidate = Sphere::new(radius);

        for _ in 0..max_attempts {
            let point = sample_in_sphere(rng, bound);
            let blocked = self.nodes[region.0].children.iter().any(|&c| {
                let child = &self.nodes[c.0];
                let child_sphere = Sphere::new(child.containing_radius());
                candidate.intersects(&child_sphere, &(child.position - point))
            });
            if !blocked {
                return Some(point);
            }
        }
        None
    }
}

/// Uniform random point within a sphere of `radius` about the origin,
/// by rejection sampling from the bounding cube.
fn sample_in_sphere<R: Rng>(rng: &mut R, radius: f64) -> Vector3<f64> {
    if radius == 0.0 {
        return Vector3::zeros();
    }
    loop {
        let v = Vector3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if v.norm_squared() <= 1.0 {
            return v * radius;
        }
    }
}
