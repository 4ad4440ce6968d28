#[cfg(feature = "hprof")]
use coarse_prof::profile;
use log::info;
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::graph::PortalGraph;
use crate::leafbits::LeafBits;

/// Per thread buffers for the base pass
struct BaseScratch {
    portal_front: Vec<bool>,
    work: Vec<usize>,
}

impl BaseScratch {
    fn new(num_portals: usize) -> Self {
        Self {
            portal_front: Vec::with_capacity(num_portals),
            work: Vec::new(),
        }
    }
}

/// Conservative `mightsee` for one portal: every leaf reachable from its
/// destination through portals that lie at least partly in front of it and
/// face away from it.
fn base_portal_vis(
    graph: &PortalGraph,
    portal: usize,
    visdist: f64,
    scratch: &mut BaseScratch,
) -> LeafBits {
    #[cfg(feature = "hprof")]
    profile!("base_portal_vis");
    let p = &graph.portals[portal];

    scratch.portal_front.clear();
    scratch.portal_front.resize(graph.num_portals(), false);
    for (i, tp) in graph.portals.iter().enumerate() {
        if i == portal {
            continue;
        }
        // target entirely behind the source looks back into where we came from
        if tp.winding.is_on_or_behind(&p.plane) {
            continue;
        }
        // source entirely on the far side of the target means it leads back
        if p.winding.is_on_or_in_front(&tp.plane) {
            continue;
        }
        if visdist > 0.0
            && (tp.winding.distance_from_plane(&p.plane) > visdist
                || p.winding.distance_from_plane(&tp.plane) > visdist)
        {
            continue;
        }
        scratch.portal_front[i] = true;
    }

    let mut mightsee = LeafBits::new(graph.num_leafs());
    scratch.work.clear();
    scratch.work.push(p.leaf);
    while let Some(leaf) = scratch.work.pop() {
        if mightsee.get(leaf) {
            continue;
        }
        mightsee.set(leaf);
        for &next in &graph.leafs[leaf].portals {
            if scratch.portal_front[next] {
                scratch.work.push(graph.portals[next].leaf);
            }
        }
    }
    mightsee
}

/// Fill `mightsee` for every portal in parallel
pub(crate) fn base_vis(graph: &PortalGraph, visdist: f64) {
    #[cfg(feature = "hprof")]
    profile!("base_vis");
    info!("Base vis for {} portals", graph.num_portals());
    let start = Instant::now();

    (0..graph.num_portals()).into_par_iter().for_each_init(
        || BaseScratch::new(graph.num_portals()),
        |scratch, portal| {
            let mightsee = base_portal_vis(graph, portal, visdist, scratch);
            let p = &graph.portals[portal];
            p.mightsee.store(&mightsee);
            p.num_mightsee
                .store(mightsee.count_ones() as u32, Ordering::Relaxed);
        },
    );

    let total: u64 = graph
        .portals
        .iter()
        .map(|p| p.num_mightsee.load(Ordering::Relaxed) as u64)
        .sum();
    info!(
        "Base vis took {:.2}s, average mightsee {:.1}",
        start.elapsed().as_secs_f32(),
        total as f64 / graph.num_portals().max(1) as f64
    );
}
