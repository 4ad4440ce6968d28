//! Small hand built portal graphs shared by the tests.
//!
//! Leafs are laid out along +X. A portal at `x` joins the leaf before it
//! (`neg`) and the one after it (`pos`).

mod scheduler_tests;

use prt::{DVec3, PrtFile, PrtPortal};

use crate::{Vis, VisData, VisOptions};

/// Square portal in the plane `x`, `y0..y1` by `-32..32`
pub(crate) fn quad_x_span(x: f64, y0: f64, y1: f64, neg: usize, pos: usize) -> PrtPortal {
    PrtPortal {
        points: vec![
            DVec3::new(x, y0, -32.0),
            DVec3::new(x, y1, -32.0),
            DVec3::new(x, y1, 32.0),
            DVec3::new(x, y0, 32.0),
        ],
        leafs: [neg, pos],
    }
}

/// Square portal in the plane `x` with half size `s`
pub(crate) fn quad_x(x: f64, s: f64, neg: usize, pos: usize) -> PrtPortal {
    PrtPortal {
        points: vec![
            DVec3::new(x, -s, -s),
            DVec3::new(x, s, -s),
            DVec3::new(x, s, s),
            DVec3::new(x, -s, s),
        ],
        leafs: [neg, pos],
    }
}

pub(crate) fn two_leafs() -> PrtFile {
    PrtFile::new(2, vec![quad_x(64.0, 32.0, 0, 1)])
}

/// `n` leafs in a straight open tube
pub(crate) fn chain(n: usize) -> PrtFile {
    let portals = (0..n.saturating_sub(1))
        .map(|i| quad_x(64.0 * (i + 1) as f64, 32.0, i, i + 1))
        .collect();
    PrtFile::new(n, portals)
}

/// Four leafs where the middle portal is shifted sideways far enough that
/// the end leafs can't see each other
pub(crate) fn zigzag() -> PrtFile {
    PrtFile::new(
        4,
        vec![
            quad_x_span(64.0, -32.0, 32.0, 0, 1),
            quad_x_span(128.0, 64.0, 128.0, 1, 2),
            quad_x_span(192.0, -32.0, 32.0, 2, 3),
        ],
    )
}

pub(crate) fn run(prt: &PrtFile, options: VisOptions) -> VisData {
    Vis::new(prt, options).unwrap().run().unwrap()
}

/// Visible leafs of every real leaf
pub(crate) fn rows(data: &VisData) -> Vec<Vec<usize>> {
    (0..data.leaf_offsets.len())
        .map(|l| data.visible_leafs(l).unwrap())
        .collect()
}
