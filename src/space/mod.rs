pub mod shape;
pub mod tree;

pub use shape::Sphere;
pub use tree::{Location, LocationId, LocationTree, DEFAULT_OPEN_SPACE_ATTEMPTS};
