//! Full visibility for one portal.
//!
//! The walk is an explicit stack of [`FlowFrame`]s. Frame 0 sits in the leaf
//! the base portal leads into. Each deeper frame holds the part of the base
//! portal (`source`) that can still see through the chain of portals walked
//! so far, and the part of the last portal (`pass`) visible from it. Every
//! leaf a frame is pushed for is visible from the base portal.

#[cfg(feature = "hprof")]
use coarse_prof::profile;
use math::{ClipOutcome, MAX_WINDING, Plane, VIS_ON_EPSILON, Winding};

use crate::graph::{PortalGraph, PortalStatus};
use crate::leafbits::LeafBits;
use crate::stack::StackWindings;
use crate::stats::{VisStats, bump};

/// Most separating planes kept per family
pub const MAX_SEPARATORS: usize = MAX_WINDING;
/// Normals closer than this are the same plane
const EQUAL_EPSILON: f64 = 0.001;

/// Where a winding in use by the walk lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindingRef {
    /// The untouched winding of a portal in the graph
    Portal(usize),
    /// A clipped winding in the pool of frame `depth`
    Stack { depth: usize, slot: usize },
}

#[derive(Debug, Default)]
struct SeparatorCache {
    planes: Vec<Plane>,
    valid: bool,
}

#[derive(Debug)]
struct FlowFrame {
    leaf: usize,
    /// Next portal of `leaf` to try
    cursor: usize,
    /// Plane of the portal that led into `leaf`, facing into it
    portal_plane: Plane,
    source: WindingRef,
    /// `None` only for frame 0
    pass: Option<WindingRef>,
    mightsee: LeafBits,
    windings: StackWindings,
}

impl FlowFrame {
    fn new(num_leafs: usize) -> Self {
        Self {
            leaf: 0,
            cursor: 0,
            portal_plane: Plane::default(),
            source: WindingRef::Portal(0),
            pass: None,
            mightsee: LeafBits::new(num_leafs),
            windings: StackWindings::new(),
        }
    }
}

/// Buffers reused by one worker across every portal it resolves
#[derive(Debug)]
pub struct FlowScratch {
    frames: Vec<FlowFrame>,
    /// Separator families 0 and 1, one pair per frame
    separators: Vec<[SeparatorCache; 2]>,
    temp: Vec<Plane>,
    cansee: LeafBits,
}

impl FlowScratch {
    pub fn new(num_leafs: usize) -> Self {
        Self {
            frames: Vec::new(),
            separators: Vec::new(),
            temp: Vec::with_capacity(MAX_SEPARATORS),
            cansee: LeafBits::new(num_leafs),
        }
    }

    fn prepare(&mut self, num_leafs: usize) {
        if self.cansee.len() != num_leafs {
            *self = Self::new(num_leafs);
        } else {
            self.cansee.clear_all();
        }
    }
}

fn grow(
    frames: &mut Vec<FlowFrame>,
    separators: &mut Vec<[SeparatorCache; 2]>,
    depth: usize,
    num_leafs: usize,
) {
    while frames.len() <= depth {
        frames.push(FlowFrame::new(num_leafs));
        separators.push(Default::default());
    }
}

fn resolve<'a>(graph: &'a PortalGraph, frames: &'a [FlowFrame], w: WindingRef) -> &'a Winding {
    match w {
        WindingRef::Portal(p) => &graph.portals[p].winding,
        WindingRef::Stack { depth, slot } => frames[depth].windings.get(slot),
    }
}

/// Clip `input` by `plane`, placing any new winding in the pool of frame
/// `depth`. A winding already in that pool is released once consumed. When
/// the pool is full or the result would be too large the input stands as-is.
fn clip_ref(
    graph: &PortalGraph,
    frames: &mut [FlowFrame],
    depth: usize,
    input: WindingRef,
    plane: &Plane,
    stats: &VisStats,
) -> Option<WindingRef> {
    let (lower, upper) = frames.split_at_mut(depth);
    let pool = &mut upper[0].windings;
    let Some(slot) = pool.alloc() else {
        bump(&stats.noclip);
        return Some(input);
    };

    let mut local = None;
    let outcome = match input {
        WindingRef::Portal(p) => graph.portals[p].winding.clip_into(plane, pool.get_mut(slot)),
        WindingRef::Stack { depth: d, slot: s } if d < depth => {
            lower[d].windings.get(s).clip_into(plane, pool.get_mut(slot))
        }
        WindingRef::Stack { slot: s, .. } => {
            local = Some(s);
            let (w, out) = pool.pair_mut(s, slot);
            w.clip_into(plane, out)
        }
    };

    match outcome {
        ClipOutcome::Clipped => {
            if let Some(s) = local {
                pool.free(s);
            }
            Some(WindingRef::Stack { depth, slot })
        }
        ClipOutcome::Eliminated => {
            pool.free(slot);
            if let Some(s) = local {
                pool.free(s);
            }
            None
        }
        ClipOutcome::Unchanged => {
            pool.free(slot);
            Some(input)
        }
        ClipOutcome::Overflow => {
            pool.free(slot);
            bump(&stats.noclip);
            Some(input)
        }
    }
}

fn clip_all(
    graph: &PortalGraph,
    frames: &mut [FlowFrame],
    depth: usize,
    mut w: WindingRef,
    planes: &[Plane],
    stats: &VisStats,
) -> Option<WindingRef> {
    for plane in planes {
        w = clip_ref(graph, frames, depth, w, plane, stats)?;
    }
    Some(w)
}

/// Planes that pass through an edge of `source` and a point of `pass`, with
/// `source` behind and all of `pass` on or in front. Anything that can be
/// seen from `source` through `pass` lies in front of every such plane.
/// `flip` reverses each plane to keep what lies behind.
///
/// `src_plane` is the plane `source` lies on.
pub(crate) fn find_separators(
    source: &Winding,
    src_plane: &Plane,
    pass: &Winding,
    flip: bool,
    out: &mut Vec<Plane>,
) {
    out.clear();
    let src = source.points();
    let pts = pass.points();

    for i in 0..src.len() {
        let l = (i + 1) % src.len();
        let v1 = src[l] - src[i];

        for (j, &point) in pts.iter().enumerate() {
            if src_plane.distance_to(point).abs() < VIS_ON_EPSILON {
                continue;
            }
            let normal = v1.cross(point - src[i]);
            let len = normal.length();
            if len < VIS_ON_EPSILON {
                continue;
            }
            let normal = normal / len;
            let mut sep = Plane::new(normal, normal.dot(point));

            // put the source behind
            let mut source_side = None;
            for (k, p) in src.iter().enumerate() {
                if k == i || k == l {
                    continue;
                }
                let d = sep.distance_to(*p);
                if d < -VIS_ON_EPSILON {
                    source_side = Some(false);
                    break;
                } else if d > VIS_ON_EPSILON {
                    source_side = Some(true);
                    break;
                }
            }
            let Some(in_front) = source_side else {
                // coplanar with the source
                continue;
            };
            if in_front {
                sep = -sep;
            }

            let mut front = false;
            let mut separates = true;
            for (k, p) in pts.iter().enumerate() {
                if k == j {
                    continue;
                }
                let d = sep.distance_to(*p);
                if d < -VIS_ON_EPSILON {
                    separates = false;
                    break;
                } else if d > VIS_ON_EPSILON {
                    front = true;
                }
            }
            if !separates || !front {
                continue;
            }

            if flip {
                sep = -sep;
            }
            if out.len() == MAX_SEPARATORS {
                return;
            }
            out.push(sep);
        }
    }
}

/// Walk every chain of portals out of `base` and return the leafs it can see.
/// The result is always a subset of the base portal's `mightsee`.
pub(crate) fn portal_flow<'s>(
    graph: &PortalGraph,
    base: usize,
    level: u8,
    scratch: &'s mut FlowScratch,
    stats: &VisStats,
) -> &'s LeafBits {
    #[cfg(feature = "hprof")]
    profile!("portal_flow");
    flow_to_depth(graph, base, level, graph.num_leafs() + 1, scratch, stats)
}

/// Leafs past `max_depth` frames are taken as visible without clipping
fn flow_to_depth<'s>(
    graph: &PortalGraph,
    base: usize,
    level: u8,
    max_depth: usize,
    scratch: &'s mut FlowScratch,
    stats: &VisStats,
) -> &'s LeafBits {
    let num_leafs = graph.num_leafs();
    let portal = &graph.portals[base];
    let base_plane = portal.plane;

    scratch.prepare(num_leafs);
    let FlowScratch {
        frames,
        separators,
        temp,
        cansee,
    } = scratch;
    grow(frames, separators, 0, num_leafs);
    {
        let f = &mut frames[0];
        f.leaf = portal.leaf;
        f.cursor = 0;
        f.portal_plane = base_plane;
        f.source = WindingRef::Portal(base);
        f.pass = None;
        portal.mightsee.load_into(&mut f.mightsee);
        f.windings.reset();
    }
    for cache in separators[0].iter_mut() {
        cache.valid = false;
    }
    cansee.set(portal.leaf);
    bump(&stats.chains);

    let mut depth = 0;
    loop {
        let frame = &mut frames[depth];
        let portals = &graph.leafs[frame.leaf].portals;
        let Some(&q) = portals.get(frame.cursor) else {
            if depth == 0 {
                break;
            }
            depth -= 1;
            continue;
        };
        frame.cursor += 1;
        let qp = &graph.portals[q];

        if !frame.mightsee.get(qp.leaf) {
            bump(&stats.leaf_skip);
            continue;
        }
        let test = if qp.status() == PortalStatus::Done {
            bump(&stats.vis_test);
            &qp.visbits
        } else {
            bump(&stats.might_test);
            &qp.mightsee
        };

        let child_depth = depth + 1;
        if child_depth >= max_depth {
            bump(&stats.depth_limited);
            cansee.set(qp.leaf);
            continue;
        }
        grow(frames, separators, child_depth, num_leafs);

        let (lower, upper) = frames.split_at_mut(child_depth);
        let parent = &lower[depth];
        let child = &mut upper[0];
        let more = child.mightsee.and_into(&parent.mightsee, test, cansee);
        if !more && cansee.get(qp.leaf) {
            bump(&stats.portal_skip);
            continue;
        }
        // can't go out a coplanar face
        if parent
            .portal_plane
            .normal
            .abs_diff_eq(-qp.plane.normal, EQUAL_EPSILON)
        {
            continue;
        }
        child.windings.reset();
        let parent_source = parent.source;
        let parent_pass = parent.pass;
        let parent_plane = parent.portal_plane;

        let Some(pass) = clip_ref(
            graph,
            frames,
            child_depth,
            WindingRef::Portal(q),
            &base_plane,
            stats,
        ) else {
            continue;
        };
        let Some(source) = clip_ref(graph, frames, child_depth, parent_source, &-qp.plane, stats)
        else {
            continue;
        };

        let (pass, source) = match parent_pass {
            // the first leaf past the base can only be blocked if coplanar
            None => (pass, source),
            Some(parent_pass) => {
                let Some(mut pass) = clip_ref(graph, frames, child_depth, pass, &parent_plane, stats)
                else {
                    continue;
                };
                let mut source = source;

                if level > 0 {
                    let cache = &mut separators[depth][0];
                    if !cache.valid {
                        find_separators(
                            resolve(graph, frames, parent_source),
                            &base_plane,
                            resolve(graph, frames, parent_pass),
                            false,
                            &mut cache.planes,
                        );
                        cache.valid = true;
                    }
                    let Some(w) = clip_all(graph, frames, child_depth, pass, &cache.planes, stats)
                    else {
                        continue;
                    };
                    pass = w;
                }

                if level > 1 {
                    let cache = &mut separators[depth][1];
                    if !cache.valid {
                        find_separators(
                            resolve(graph, frames, parent_pass),
                            &parent_plane,
                            resolve(graph, frames, parent_source),
                            true,
                            &mut cache.planes,
                        );
                        cache.valid = true;
                    }
                    let Some(w) = clip_all(graph, frames, child_depth, pass, &cache.planes, stats)
                    else {
                        continue;
                    };
                    pass = w;
                }

                if level > 2 {
                    find_separators(
                        resolve(graph, frames, pass),
                        &qp.plane,
                        resolve(graph, frames, parent_pass),
                        false,
                        temp,
                    );
                    let Some(w) = clip_all(graph, frames, child_depth, source, temp, stats) else {
                        continue;
                    };
                    source = w;
                }

                if level > 3 {
                    find_separators(
                        resolve(graph, frames, parent_pass),
                        &parent_plane,
                        resolve(graph, frames, pass),
                        true,
                        temp,
                    );
                    let Some(w) = clip_all(graph, frames, child_depth, source, temp, stats) else {
                        continue;
                    };
                    source = w;
                }

                (pass, source)
            }
        };

        let child = &mut frames[child_depth];
        child.leaf = qp.leaf;
        child.cursor = 0;
        child.portal_plane = qp.plane;
        child.source = source;
        child.pass = Some(pass);
        for cache in separators[child_depth].iter_mut() {
            cache.valid = false;
        }
        cansee.set(qp.leaf);
        bump(&stats.chains);
        depth = child_depth;
    }

    cansee.and_assign(&frames[0].mightsee);
    cansee
}
