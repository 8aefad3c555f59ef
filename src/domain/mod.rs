//! Pure domain types with minimal dependencies
//!
//! Geometry and coordinate mapping shared by the session, the sampler and the
//! compositor. Nothing here touches pixels.

pub mod geometry;
pub mod scale;

pub use geometry::*;
pub use scale::*;
