#[cfg(feature = "hprof")]
use coarse_prof::profile;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::error::VisResult;
use crate::flow::{FlowScratch, portal_flow};
use crate::graph::{PortalGraph, PortalStatus};
use crate::leafbits::LeafBits;
use crate::options::VisOptions;
use crate::state::Checkpoint;
use crate::stats::{VisStats, bump};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Guarded by the scheduler lock along with every store to the shared
/// portal state
struct SchedState {
    last_save: Instant,
    last_progress: Instant,
    done: usize,
}

/// The cheapest portal not yet started, ties going to the lowest index
fn next_portal(graph: &PortalGraph) -> Option<usize> {
    graph
        .portals
        .iter()
        .enumerate()
        .filter(|(_, p)| p.status() == PortalStatus::Unprocessed)
        .min_by_key(|(i, p)| (p.num_mightsee.load(Ordering::Relaxed), *i))
        .map(|(i, _)| i)
}

/// Clear `bit` from the mightsee of every unstarted portal out of `leaf`
fn update_mightsee(graph: &PortalGraph, leaf: usize, bit: usize, stats: &VisStats) {
    for &pi in &graph.leafs[leaf].portals {
        let p = &graph.portals[pi];
        if p.status() != PortalStatus::Unprocessed {
            continue;
        }
        if p.mightsee.clear(bit) {
            p.num_mightsee.fetch_sub(1, Ordering::Relaxed);
            bump(&stats.mightsee_update);
        }
    }
}

/// Leafs that no portal of `leaf` can reach any more can't see `leaf`
/// either, so drop `leaf` from their unstarted portals.
fn propagate(graph: &PortalGraph, leaf: usize, stats: &VisStats) {
    let portals = &graph.leafs[leaf].portals;
    for &pi in portals {
        let p = &graph.portals[pi];
        if !p.is_done() {
            continue;
        }
        let mut changed = p.mightsee.snapshot();
        changed.and_not(&p.visbits.snapshot());
        if changed.count_ones() == 0 {
            continue;
        }
        for &other in portals {
            if other == pi {
                continue;
            }
            let o = &graph.portals[other];
            let covers = if o.is_done() {
                o.visbits.snapshot()
            } else {
                o.mightsee.snapshot()
            };
            changed.and_not(&covers);
        }
        for n in changed.iter_ones() {
            if n != leaf {
                update_mightsee(graph, n, leaf, stats);
            }
        }
    }
}

/// Publish a finished portal. Only under the scheduler lock.
fn complete(graph: &PortalGraph, portal: usize, cansee: &LeafBits, stats: &VisStats) {
    let p = &graph.portals[portal];
    p.visbits.store(cansee);
    p.num_cansee
        .store(cansee.count_ones() as u32, Ordering::Relaxed);
    p.set_status(PortalStatus::Done);
    debug!(
        "portal:{portal:4} mightsee:{:4} cansee:{:4}",
        p.num_mightsee.load(Ordering::Relaxed),
        p.num_cansee.load(Ordering::Relaxed)
    );
    propagate(graph, p.owner, stats);
}

/// Take `mightsee` as final for every portal
pub(crate) fn fast_vis(graph: &PortalGraph) {
    for p in &graph.portals {
        p.visbits.store(&p.mightsee.snapshot());
        p.num_cansee
            .store(p.num_mightsee.load(Ordering::Relaxed), Ordering::Relaxed);
        p.set_status(PortalStatus::Done);
    }
}

/// Resolve every unfinished portal, cheapest first, on a pool of workers
pub(crate) fn full_vis(
    graph: &PortalGraph,
    options: &VisOptions,
    stats: &VisStats,
    checkpoint: Option<&Checkpoint>,
) -> VisResult<()> {
    #[cfg(feature = "hprof")]
    profile!("full_vis");
    let total = graph.num_portals();
    let done_at_start = graph.count_done();
    info!(
        "Full vis for {} portals at level {}, {} already done",
        total, options.level, done_at_start
    );
    let start = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()?;

    let lock = Mutex::new(SchedState {
        last_save: Instant::now(),
        last_progress: Instant::now(),
        done: done_at_start,
    });

    pool.install(|| {
        (done_at_start..total).into_par_iter().for_each_init(
            || FlowScratch::new(graph.num_leafs()),
            |scratch, _| {
                let picked = {
                    let mut state = lock.lock();
                    if let Some(cp) = checkpoint {
                        if state.last_save.elapsed() >= options.state_interval {
                            if let Err(e) = cp.save(graph, options.level) {
                                warn!("Could not save checkpoint: {e}");
                            }
                            state.last_save = Instant::now();
                        }
                    }
                    let next = next_portal(graph);
                    if let Some(p) = next {
                        graph.portals[p].set_status(PortalStatus::Working);
                    }
                    next
                };
                let Some(portal) = picked else {
                    return;
                };

                let cansee = portal_flow(graph, portal, options.level, scratch, stats);

                let mut state = lock.lock();
                complete(graph, portal, cansee, stats);
                state.done += 1;
                if state.last_progress.elapsed() >= PROGRESS_INTERVAL {
                    info!(
                        "{:6}/{} portals ({:.1}%)",
                        state.done,
                        total,
                        state.done as f32 * 100.0 / total as f32
                    );
                    state.last_progress = Instant::now();
                }
            },
        );
    });

    info!("Full vis took {:.2}s", start.elapsed().as_secs_f32());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::base_vis;
    use crate::tests::chain;

    #[test]
    fn picks_smallest_mightsee_first() {
        let g = PortalGraph::new(&chain(4)).unwrap();
        base_vis(&g, 0.0);
        // portals 1 and 4 both see a single leaf
        assert_eq!(next_portal(&g), Some(1));
        g.portals[1].set_status(PortalStatus::Working);
        assert_eq!(next_portal(&g), Some(4));
    }

    #[test]
    fn fast_mode_takes_mightsee() {
        let g = PortalGraph::new(&chain(3)).unwrap();
        base_vis(&g, 0.0);
        fast_vis(&g);
        for p in &g.portals {
            assert!(p.is_done());
            assert_eq!(p.visbits.snapshot(), p.mightsee.snapshot());
        }
    }

    #[test]
    fn completion_drops_unseen_leafs() {
        let g = PortalGraph::new(&chain(3)).unwrap();
        base_vis(&g, 0.0);
        let stats = VisStats::default();
        // pretend portal 0 (leaf 0 -> 1) proved leaf 2 hidden
        let mut seen = LeafBits::new(3);
        seen.set(1);
        g.portals[0].set_status(PortalStatus::Working);
        complete(&g, 0, &seen, &stats);

        // portal 3 is leaf 2 -> 1 and no longer looks for leaf 0
        assert!(!g.portals[3].mightsee.get(0));
        assert_eq!(g.portals[3].num_mightsee.load(Ordering::Relaxed), 1);
        assert_eq!(stats.snapshot().mightsee_update, 1);
    }
}
