pub mod celestial;
pub mod error;
pub mod orbital;
pub mod orbiter;
pub mod space;

pub use error::{Error, Result};
pub use orbital::{Orbit, OrbitalElements};
pub use orbiter::{Body, Orbiter};
pub use space::{Location, LocationId, LocationTree, Sphere};
