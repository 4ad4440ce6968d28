//! Checkpoints of a run in progress, so a long run can pick up where it was
//! stopped. The file is written next to the portal file as `<map>.vis`.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::error::{VisError, VisResult};
use crate::graph::{PortalGraph, PortalStatus};
use crate::leafbits::LeafBits;
use crate::rle::{compress_row, decompress_row};

const STATE_MAGIC: [u8; 8] = *b"PVSVIS01";
const STATE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PortalState {
    status: u8,
    num_mightsee: u32,
    /// Compressed rows
    mightsee: Vec<u8>,
    visbits: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VisState {
    magic: [u8; 8],
    version: u32,
    graph_crc: u32,
    num_leafs: u32,
    num_portals: u32,
    level: u8,
    portals: Vec<PortalState>,
}

fn state_err<E: std::fmt::Display>(e: E) -> VisError {
    VisError::State(e.to_string())
}

/// Where a run's checkpoint lives
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
    temp: PathBuf,
}

impl Checkpoint {
    /// Checkpoint for the portal file or map at `map`
    pub fn for_map<P: AsRef<Path>>(map: P) -> Self {
        let map = map.as_ref();
        Self {
            path: map.with_extension("vis"),
            temp: map.with_extension("vi0"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the state of every portal. Safe to call while workers run as
    /// long as the scheduler lock is held.
    pub fn save(&self, graph: &PortalGraph, level: u8) -> VisResult<()> {
        let portals = graph
            .portals
            .iter()
            .map(|p| {
                let mut mightsee = Vec::new();
                compress_row(&p.mightsee.snapshot().to_row_bytes(), &mut mightsee);
                let mut visbits = Vec::new();
                compress_row(&p.visbits.snapshot().to_row_bytes(), &mut visbits);
                PortalState {
                    status: p.status() as u8,
                    num_mightsee: p.num_mightsee.load(Ordering::Relaxed),
                    mightsee,
                    visbits,
                }
            })
            .collect();

        let state = VisState {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            graph_crc: graph.fingerprint(),
            num_leafs: graph.num_leafs() as u32,
            num_portals: graph.num_portals() as u32,
            level,
            portals,
        };

        let data = bincode::serialize(&state).map_err(state_err)?;
        fs::write(&self.temp, data)?;
        fs::rename(&self.temp, &self.path)?;
        info!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Restore a saved run into a freshly built graph. Returns `Ok(false)` if
    /// there is no checkpoint. On error the graph is left untouched.
    pub fn load(&self, graph: &PortalGraph, level: u8) -> VisResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let data = fs::read(&self.path)?;
        let state: VisState = bincode::deserialize(&data).map_err(state_err)?;

        if state.magic != STATE_MAGIC || state.version != STATE_VERSION {
            return Err(VisError::State("not a vis state file".into()));
        }
        if state.graph_crc != graph.fingerprint()
            || state.num_leafs as usize != graph.num_leafs()
            || state.num_portals as usize != graph.num_portals()
            || state.portals.len() != graph.num_portals()
        {
            return Err(VisError::State("made from a different portal file".into()));
        }
        if state.level != level {
            return Err(VisError::State(format!(
                "made at level {}, running at level {level}",
                state.level
            )));
        }

        let num_leafs = graph.num_leafs();
        let row_bytes = num_leafs.div_ceil(8);
        let mut restored = Vec::with_capacity(state.portals.len());
        for (i, ps) in state.portals.iter().enumerate() {
            let status = PortalStatus::from_u8(ps.status)
                .ok_or_else(|| VisError::State(format!("portal {i} has bad status {}", ps.status)))?;
            let mightsee = LeafBits::from_row_bytes(&decompress_row(&ps.mightsee, row_bytes)?, num_leafs);
            let mut visbits =
                LeafBits::from_row_bytes(&decompress_row(&ps.visbits, row_bytes)?, num_leafs);
            if mightsee.count_ones() != ps.num_mightsee as usize {
                return Err(VisError::State(format!("portal {i} mightsee count mismatch")));
            }
            if !visbits.is_subset_of(&mightsee) {
                return Err(VisError::State(format!("portal {i} sees past its mightsee")));
            }
            // work in flight when the file was written starts over
            let status = match status {
                PortalStatus::Working => {
                    visbits.clear_all();
                    PortalStatus::Unprocessed
                }
                s => s,
            };
            restored.push((status, mightsee, visbits));
        }

        for (p, (status, mightsee, visbits)) in graph.portals.iter().zip(restored) {
            p.mightsee.store(&mightsee);
            p.num_mightsee
                .store(mightsee.count_ones() as u32, Ordering::Relaxed);
            p.visbits.store(&visbits);
            p.num_cansee
                .store(visbits.count_ones() as u32, Ordering::Relaxed);
            p.set_status(status);
        }
        info!(
            "Loaded state from {}, {} of {} portals done",
            self.path.display(),
            graph.count_done(),
            graph.num_portals()
        );
        Ok(true)
    }

    /// Delete the checkpoint and any half written copy
    pub fn remove(&self) -> VisResult<()> {
        for path in [&self.path, &self.temp] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::base_vis;
    use crate::tests::{chain, quad_x};
    use prt::PrtFile;

    fn checkpoint() -> (tempfile::TempDir, Checkpoint) {
        let dir = tempfile::tempdir().unwrap();
        let cp = Checkpoint::for_map(dir.path().join("test.prt"));
        (dir, cp)
    }

    #[test]
    fn paths_follow_the_map() {
        let cp = Checkpoint::for_map("/maps/e1m1.prt");
        assert_eq!(cp.path(), Path::new("/maps/e1m1.vis"));
        assert_eq!(cp.temp, Path::new("/maps/e1m1.vi0"));
    }

    #[test]
    fn missing_file_is_no_state() {
        let (_dir, cp) = checkpoint();
        let g = PortalGraph::new(&chain(3)).unwrap();
        assert!(!cp.load(&g, 4).unwrap());
    }

    #[test]
    fn save_and_restore() {
        let (_dir, cp) = checkpoint();
        let g = PortalGraph::new(&chain(4)).unwrap();
        base_vis(&g, 0.0);
        let mut seen = LeafBits::new(4);
        seen.set(1);
        g.portals[0].visbits.store(&seen);
        g.portals[0].set_status(PortalStatus::Done);
        g.portals[1].visbits.store(&g.portals[1].mightsee.snapshot());
        g.portals[1].set_status(PortalStatus::Working);
        cp.save(&g, 4).unwrap();
        assert!(cp.exists());
        assert!(!cp.temp.exists());

        let fresh = PortalGraph::new(&chain(4)).unwrap();
        assert!(cp.load(&fresh, 4).unwrap());
        assert_eq!(fresh.portals[0].status(), PortalStatus::Done);
        assert_eq!(fresh.portals[0].visbits.snapshot(), seen);
        assert_eq!(fresh.portals[1].status(), PortalStatus::Unprocessed);
        assert_eq!(fresh.portals[1].visbits.count_ones(), 0);
        for (a, b) in g.portals.iter().zip(&fresh.portals) {
            assert_eq!(a.mightsee.snapshot(), b.mightsee.snapshot());
            assert_eq!(
                a.num_mightsee.load(Ordering::Relaxed),
                b.num_mightsee.load(Ordering::Relaxed)
            );
        }

        cp.remove().unwrap();
        assert!(!cp.exists());
    }

    #[test]
    fn rejects_other_graph() {
        let (_dir, cp) = checkpoint();
        let g = PortalGraph::new(&chain(3)).unwrap();
        base_vis(&g, 0.0);
        cp.save(&g, 4).unwrap();

        let other = PortalGraph::new(&PrtFile::new(
            3,
            vec![quad_x(64.0, 32.0, 0, 1), quad_x(160.0, 32.0, 1, 2)],
        ))
        .unwrap();
        assert!(matches!(cp.load(&other, 4), Err(VisError::State(_))));
        assert_eq!(other.portals[0].mightsee.count_ones(), 0);
    }

    #[test]
    fn rejects_other_level() {
        let (_dir, cp) = checkpoint();
        let g = PortalGraph::new(&chain(3)).unwrap();
        cp.save(&g, 4).unwrap();
        assert!(matches!(cp.load(&g, 2), Err(VisError::State(_))));
    }

    #[test]
    fn rejects_garbage() {
        let (_dir, cp) = checkpoint();
        fs::write(cp.path(), b"definitely not a checkpoint").unwrap();
        let g = PortalGraph::new(&chain(3)).unwrap();
        assert!(cp.load(&g, 4).is_err());
    }
}
