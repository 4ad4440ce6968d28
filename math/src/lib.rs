//! Double precision plane and polygon geometry for the visibility tools.
//!
//! Everything here is allocation free: a [`Winding`] keeps its points inline,
//! and clipping writes into a winding the caller already owns.

mod plane;
mod winding;

pub use glam::DVec3;
pub use plane::*;
pub use winding::*;
