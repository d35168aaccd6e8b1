use thiserror::Error;

/// Errors produced by orbit construction and propagation.
///
/// Geometric fallbacks (no common reference frame, open-space search
/// exhaustion) are expressed as `Option`/`None` at the call site rather
/// than errors — they are expected, recoverable outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Error {
    /// An orbital element was outside its documented range at construction.
    /// Never silently clamped.
    #[error("orbital element out of range: {name} = {value}")]
    InvalidElement { name: &'static str, value: f64 },

    /// The relative state vectors describe no orbit: zero relative
    /// velocity or zero orbital angular momentum.
    #[error("degenerate orbit geometry: {0}")]
    DegenerateOrbit(&'static str),

    /// Newton iteration on the universal Kepler equation exhausted its
    /// iteration budget without reaching tolerance.
    #[error("universal-variable propagation did not converge after {iterations} iterations")]
    DidNotConverge { iterations: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
