#[cfg(feature = "hprof")]
use coarse_prof::profile;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{VisError, VisResult};
use crate::graph::PortalGraph;
use crate::leafbits::LeafBits;
use crate::rle::{compress_row, decompress_row};

/// Compressed visibility for every leaf, ready to be written into the map.
///
/// Each leaf (or cluster) has an offset into `rows` where its compressed row
/// starts. A decompressed row is `row_bytes` long with bit `i` set if real
/// leaf `i` may be visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisData {
    pub rows: Vec<u8>,
    /// One per leaf, or per cluster for a clustered graph
    pub offsets: Vec<u32>,
    /// One per real leaf
    pub leaf_offsets: Vec<u32>,
    pub row_bytes: usize,
    /// Sum over real leafs of the real leafs each can see
    pub total_visible: u64,
    pub uncompressed_size: usize,
}

impl VisData {
    /// Decompressed row of leaf or cluster `index`
    pub fn row(&self, index: usize) -> VisResult<Vec<u8>> {
        let offset = self.offsets.get(index).ok_or(VisError::NoSuchLeaf {
            leaf: index,
            count: self.offsets.len(),
        })?;
        self.row_at(*offset as usize)
    }

    /// Decompressed row of real leaf `leaf`
    pub fn leaf_row(&self, leaf: usize) -> VisResult<Vec<u8>> {
        let offset = self.leaf_offsets.get(leaf).ok_or(VisError::NoSuchLeaf {
            leaf,
            count: self.leaf_offsets.len(),
        })?;
        self.row_at(*offset as usize)
    }

    fn row_at(&self, offset: usize) -> VisResult<Vec<u8>> {
        let data = self
            .rows
            .get(offset..)
            .ok_or(VisError::RowOverrun { offset })?;
        decompress_row(data, self.row_bytes).map_err(|e| match e {
            VisError::RowOverrun { offset: o } => VisError::RowOverrun { offset: offset + o },
            e => e,
        })
    }

    /// Real leafs visible from real leaf `leaf`
    pub fn visible_leafs(&self, leaf: usize) -> VisResult<Vec<usize>> {
        let row = self.leaf_row(leaf)?;
        Ok((0..self.leaf_offsets.len())
            .filter(|&i| row[i >> 3] & (1 << (i & 7)) != 0)
            .collect())
    }

    pub fn can_see(&self, from: usize, to: usize) -> VisResult<bool> {
        let row = self.leaf_row(from)?;
        Ok(row.get(to >> 3).is_some_and(|b| b & (1 << (to & 7)) != 0))
    }
}

/// Merge the portal results into one row per leaf, make the result
/// symmetric, expand clusters and compress.
pub(crate) fn assemble(graph: &PortalGraph) -> VisResult<VisData> {
    #[cfg(feature = "hprof")]
    profile!("assemble");
    if let Some(portal) = graph.portals.iter().position(|p| !p.is_done()) {
        return Err(VisError::PortalNotDone { portal });
    }

    let num_leafs = graph.num_leafs();
    let mut rows: Vec<LeafBits> = graph
        .leafs
        .iter()
        .enumerate()
        .map(|(i, leaf)| {
            let mut row = LeafBits::new(num_leafs);
            for &p in &leaf.portals {
                row.or_assign(&graph.portals[p].visbits.snapshot());
            }
            row.set(i);
            row
        })
        .collect();

    for a in 0..num_leafs {
        let seen: Vec<usize> = rows[a].iter_ones().collect();
        for b in seen {
            rows[b].set(a);
        }
    }

    let mut data = VisData {
        rows: Vec::new(),
        offsets: Vec::with_capacity(num_leafs),
        leaf_offsets: Vec::new(),
        row_bytes: 0,
        total_visible: 0,
        uncompressed_size: 0,
    };

    match &graph.clusters {
        None => {
            data.row_bytes = num_leafs.div_ceil(8);
            for row in &rows {
                data.offsets.push(data.rows.len() as u32);
                compress_row(&row.to_row_bytes(), &mut data.rows);
                data.total_visible += row.count_ones() as u64;
            }
            data.leaf_offsets = data.offsets.clone();
        }
        Some(clusters) => {
            let real = graph.real_leafs;
            data.row_bytes = real.div_ceil(8);
            let mut members = vec![0u64; num_leafs];
            for &c in clusters {
                members[c] += 1;
            }
            for (c, row) in rows.iter().enumerate() {
                let mut expanded = LeafBits::new(real);
                for (leaf, &cluster) in clusters.iter().enumerate() {
                    if row.get(cluster) {
                        expanded.set(leaf);
                    }
                }
                data.offsets.push(data.rows.len() as u32);
                compress_row(&expanded.to_row_bytes(), &mut data.rows);
                data.total_visible += expanded.count_ones() as u64 * members[c];
            }
            data.leaf_offsets = clusters.iter().map(|&c| data.offsets[c]).collect();
        }
    }
    data.uncompressed_size = data.row_bytes * graph.real_leafs;

    info!(
        "average leafs visible: {:.1}",
        data.total_visible as f64 / graph.real_leafs.max(1) as f64
    );
    if graph.clusters.is_some() {
        let seen: usize = rows.iter().map(|r| r.count_ones()).sum();
        info!(
            "average clusters visible: {:.1}",
            seen as f64 / num_leafs.max(1) as f64
        );
    }
    info!(
        "visdatasize: {} compressed from {}",
        data.rows.len(),
        data.uncompressed_size
    );
    Ok(data)
}
