use log::debug;
use math::{MAX_WINDING, Plane, Winding};
use prt::PrtFile;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use crate::error::{VisError, VisResult};
use crate::leafbits::SharedLeafBits;
use crate::MAX_PORTALS_ON_LEAF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PortalStatus {
    Unprocessed = 0,
    Working = 1,
    Done = 2,
}

impl PortalStatus {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Unprocessed),
            1 => Some(Self::Working),
            2 => Some(Self::Done),
            _ => None,
        }
    }
}

/// One direction of a portal. Sight passes from `owner` through the winding
/// into `leaf`, and the plane normal points into `leaf`.
#[derive(Debug)]
pub struct Portal {
    pub winding: Winding,
    pub plane: Plane,
    pub owner: usize,
    pub leaf: usize,
    pub mightsee: SharedLeafBits,
    pub visbits: SharedLeafBits,
    pub num_mightsee: AtomicU32,
    pub num_cansee: AtomicU32,
    status: AtomicU8,
}

impl Portal {
    fn new(winding: Winding, plane: Plane, owner: usize, leaf: usize, num_leafs: usize) -> Self {
        Self {
            winding,
            plane,
            owner,
            leaf,
            mightsee: SharedLeafBits::new(num_leafs),
            visbits: SharedLeafBits::new(num_leafs),
            num_mightsee: AtomicU32::new(0),
            num_cansee: AtomicU32::new(0),
            status: AtomicU8::new(PortalStatus::Unprocessed as u8),
        }
    }

    #[inline]
    pub fn status(&self) -> PortalStatus {
        match self.status.load(Ordering::Acquire) {
            1 => PortalStatus::Working,
            2 => PortalStatus::Done,
            _ => PortalStatus::Unprocessed,
        }
    }

    /// Only under the scheduler lock, or before workers start
    #[inline]
    pub fn set_status(&self, status: PortalStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.status() == PortalStatus::Done
    }
}

#[derive(Debug, Default, Clone)]
pub struct Leaf {
    /// Portals leading out of this leaf
    pub portals: Vec<usize>,
}

/// The leaf graph with two directed portals per input portal, forward then
/// backward, so input portal `i` becomes portals `2i` and `2i + 1`.
#[derive(Debug)]
pub struct PortalGraph {
    pub portals: Vec<Portal>,
    pub leafs: Vec<Leaf>,
    /// Cluster of each real leaf when the graph joins clusters
    pub clusters: Option<Vec<usize>>,
    pub real_leafs: usize,
}

impl PortalGraph {
    pub fn new(prt: &PrtFile) -> VisResult<Self> {
        let num_leafs = prt.num_leafs;
        let mut leafs = vec![Leaf::default(); num_leafs];
        let mut portals = Vec::with_capacity(prt.portals.len() * 2);

        for (i, input) in prt.portals.iter().enumerate() {
            let points = input.points.len();
            if !(3..=MAX_WINDING).contains(&points) {
                return Err(VisError::BadWinding { portal: i, points });
            }
            for &leaf in &input.leafs {
                if leaf >= num_leafs {
                    return Err(VisError::LeafOutOfRange {
                        portal: i,
                        leaf,
                        count: num_leafs,
                    });
                }
            }
            let [front, back] = input.leafs;
            if front == back {
                return Err(VisError::SelfPortal {
                    portal: i,
                    leaf: front,
                });
            }

            let winding =
                Winding::from_points(&input.points).ok_or(VisError::BadWinding { portal: i, points })?;
            let plane = winding.plane();
            if plane.normal == glam::DVec3::ZERO {
                return Err(VisError::BadWinding { portal: i, points });
            }

            let flipped = winding.flipped();
            leafs[front].portals.push(portals.len());
            portals.push(Portal::new(winding, -plane, front, back, num_leafs));
            leafs[back].portals.push(portals.len());
            portals.push(Portal::new(flipped, plane, back, front, num_leafs));
        }

        if let Some(leaf) = leafs
            .iter()
            .position(|l| l.portals.len() > MAX_PORTALS_ON_LEAF)
        {
            return Err(VisError::TooManyPortals { leaf });
        }

        if let Some(clusters) = &prt.clusters {
            for (leaf, &cluster) in clusters.iter().enumerate() {
                if cluster >= num_leafs {
                    return Err(VisError::BadCluster { leaf, cluster });
                }
            }
        }

        debug!(
            "graph: {} leafs, {} directed portals",
            num_leafs,
            portals.len()
        );

        Ok(Self {
            portals,
            leafs,
            clusters: prt.clusters.clone(),
            real_leafs: prt.num_real_leafs,
        })
    }

    #[inline]
    pub fn num_leafs(&self) -> usize {
        self.leafs.len()
    }

    #[inline]
    pub fn num_portals(&self) -> usize {
        self.portals.len()
    }

    pub fn count_done(&self) -> usize {
        self.portals.iter().filter(|p| p.is_done()).count()
    }

    /// Digest of the topology and geometry, used to tie a checkpoint to the
    /// portal file it was made from
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&(self.num_leafs() as u64).to_le_bytes());
        hasher.update(&(self.real_leafs as u64).to_le_bytes());
        for p in self.portals.iter().step_by(2) {
            hasher.update(&(p.owner as u64).to_le_bytes());
            hasher.update(&(p.leaf as u64).to_le_bytes());
            for point in p.winding.points() {
                for c in point.to_array() {
                    hasher.update(&c.to_le_bytes());
                }
            }
        }
        if let Some(clusters) = &self.clusters {
            for &c in clusters {
                hasher.update(&(c as u64).to_le_bytes());
            }
        }
        hasher.finalize()
    }
}
