use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters bumped by the workers during a run
#[derive(Debug, Default)]
pub struct VisStats {
    pub(crate) noclip: AtomicU64,
    pub(crate) chains: AtomicU64,
    pub(crate) portal_skip: AtomicU64,
    pub(crate) leaf_skip: AtomicU64,
    pub(crate) vis_test: AtomicU64,
    pub(crate) might_test: AtomicU64,
    pub(crate) mightsee_update: AtomicU64,
    pub(crate) depth_limited: AtomicU64,
}

/// Plain copy of [`VisStats`] at one instant
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub noclip: u64,
    pub chains: u64,
    pub portal_skip: u64,
    pub leaf_skip: u64,
    pub vis_test: u64,
    pub might_test: u64,
    pub mightsee_update: u64,
    pub depth_limited: u64,
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl VisStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            noclip: get(&self.noclip),
            chains: get(&self.chains),
            portal_skip: get(&self.portal_skip),
            leaf_skip: get(&self.leaf_skip),
            vis_test: get(&self.vis_test),
            might_test: get(&self.might_test),
            mightsee_update: get(&self.mightsee_update),
            depth_limited: get(&self.depth_limited),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!("c_chains: {}", s.chains);
        info!(
            "portalskip: {}, leafskip: {}, vistest: {}, mighttest: {}, mightseeupdate: {}",
            s.portal_skip, s.leaf_skip, s.vis_test, s.might_test, s.mightsee_update
        );
        if s.noclip > 0 {
            warn!("c_noclip: {} clips left whole, winding too large", s.noclip);
        }
        if s.depth_limited > 0 {
            warn!(
                "{} flow chains hit the depth limit and were assumed visible",
                s.depth_limited
            );
        }
    }
}
