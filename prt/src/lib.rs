//! This crate reads the portal files written by the BSP compiler, which
//! describe the leaf graph the visibility tool works on.
//!
//! Two text layouts exist. `PRT1` is the plain leaf graph:
//!
//! ```text,ignore
//! PRT1
//! <leaf count>
//! <portal count>
//! <point count> <leaf 0> <leaf 1> (x y z) (x y z) ...    ─┐ one line
//! ...                                                     ─┘ per portal
//! ```
//!
//! `PRT2` groups detail leafs into clusters. Portals join clusters, and a
//! trailing block lists the real leafs belonging to each cluster:
//!
//! ```text,ignore
//! PRT2
//! <real leaf count>
//! <cluster count>
//! <portal count>
//! <point count> <cluster 0> <cluster 1> (x y z) ...      ─┐ per portal
//! <leaf> <leaf> ... -1                                   ─┐ per cluster
//! ```
//!
//! The winding points are listed so that the plane they make faces into
//! `leaf 0`.

pub use math::DVec3;

/// The portal file structs and parser
pub mod prt;

pub use crate::prt::*;
