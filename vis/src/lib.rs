//! Potentially visible set computation over a portal graph.
//!
//! Each leaf of the map is joined to its neighbours by portals. For every
//! directed portal a fast flood first finds the leafs it might see
//! (`mightsee`), then a walk through chains of portals, clipping by the
//! planes that separate them, narrows that down to the leafs it can see
//! (`visbits`). The per-portal results are merged into one compressed row
//! per leaf.
//!
//! Portals are resolved on a pool of workers, cheapest first. All writes to
//! the shared portal state happen under a single lock. Workers read other
//! portals' bits without it: bits are only ever cleared, so a stale read is
//! only ever too generous.
//!
//! ```ignore
//! let prt = prt::PrtFile::load("e1m1.prt")?;
//! let vis = vis::Vis::new(&prt, vis::VisOptions::default())?
//!     .with_checkpoint(vis::Checkpoint::for_map("e1m1.prt"));
//! let data = vis.run()?;
//! ```

mod assemble;
mod base;
mod error;
mod flow;
mod graph;
mod leafbits;
mod options;
mod rle;
mod scheduler;
mod stack;
mod state;
mod stats;

#[cfg(test)]
mod tests;

use log::{info, warn};
use prt::PrtFile;
use std::time::Instant;

pub use assemble::VisData;
pub use error::{VisError, VisResult};
pub use flow::MAX_SEPARATORS;
pub use graph::{Leaf, Portal, PortalGraph, PortalStatus};
pub use leafbits::{LeafBits, SharedLeafBits};
pub use options::{MAX_LEVEL, VisOptions};
pub use rle::{compress_row, decompress_row};
pub use stack::STACK_WINDINGS;
pub use state::Checkpoint;
pub use stats::{StatsSnapshot, VisStats};

/// Most portals a single leaf may own
pub const MAX_PORTALS_ON_LEAF: usize = 512;

/// Everything one run works on
#[derive(Debug)]
pub struct Vis {
    graph: PortalGraph,
    options: VisOptions,
    stats: VisStats,
    checkpoint: Option<Checkpoint>,
}

impl Vis {
    pub fn new(prt: &PrtFile, mut options: VisOptions) -> VisResult<Self> {
        if options.level > MAX_LEVEL {
            warn!(
                "Test level {} is out of range, using {MAX_LEVEL}",
                options.level
            );
            options.level = MAX_LEVEL;
        }
        Ok(Self {
            graph: PortalGraph::new(prt)?,
            options,
            stats: VisStats::default(),
            checkpoint: None,
        })
    }

    /// Save progress to, and resume from, `checkpoint`
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn graph(&self) -> &PortalGraph {
        &self.graph
    }

    pub fn options(&self) -> &VisOptions {
        &self.options
    }

    pub fn stats(&self) -> &VisStats {
        &self.stats
    }

    /// Fill `mightsee` for every portal
    pub fn base_vis(&self) {
        base::base_vis(&self.graph, self.options.visdist);
    }

    /// Resolve every portal not yet done. Fast mode takes `mightsee` as is.
    pub fn full_vis(&self) -> VisResult<()> {
        if self.options.fast {
            info!("Fast vis, taking mightsee as final");
            scheduler::fast_vis(&self.graph);
            return Ok(());
        }
        scheduler::full_vis(
            &self.graph,
            &self.options,
            &self.stats,
            self.checkpoint.as_ref(),
        )
    }

    /// Merge and compress the finished portal results
    pub fn assemble(&self) -> VisResult<VisData> {
        assemble::assemble(&self.graph)
    }

    /// Restore a checkpoint if there is a usable one
    fn resume(&self) -> bool {
        if self.options.nostate || self.options.fast {
            return false;
        }
        let Some(cp) = &self.checkpoint else {
            return false;
        };
        match cp.load(&self.graph, self.options.level) {
            Ok(found) => found,
            Err(e) => {
                warn!("Ignoring checkpoint {}: {e}", cp.path().display());
                false
            }
        }
    }

    /// Run every pass and return the compressed result
    pub fn run(&self) -> VisResult<VisData> {
        let start = Instant::now();

        if !self.resume() {
            self.base_vis();
        }
        self.full_vis()?;

        if let Some(cp) = self.checkpoint.as_ref().filter(|_| !self.options.fast) {
            if let Err(e) = cp.save(&self.graph, self.options.level) {
                warn!("Could not save checkpoint: {e}");
            }
        }

        let data = self.assemble()?;
        self.stats.log_summary();

        if self.options.autoclean {
            if let Some(cp) = &self.checkpoint {
                if let Err(e) = cp.remove() {
                    warn!("Could not remove checkpoint {}: {e}", cp.path().display());
                }
            }
        }

        info!("Vis took {:.2}s", start.elapsed().as_secs_f32());
        Ok(data)
    }
}
