//! Mesh topology handed over by the mesh collaborator
//!
//! The interchange contract is CSR adjacency: an offsets array of length
//! `cell_count + 1` and a flattened neighbor array where `-1` marks a map
//! edge. Centers and terrain codes are stored per cell.

use std::collections::VecDeque;

use glam::Vec2;

use crate::error::{PartitionError, Result};
use crate::terrain::{BasicTerrainType, WaterCodes};

/// Neighbor slot marking a map edge
pub const NO_NEIGHBOR: i32 = -1;

pub(crate) const UNREACHED: u32 = u32::MAX;

/// Immutable cell adjacency, centers and terrain
///
/// Cell ids are `0..cell_count()` and index every per-cell array.
///
/// # Example
///
/// ```
/// use canton_partition::*;
///
/// // 0 - 1
/// // |   |
/// // 2 - 3
/// let topology = MeshTopology::from_csr(
///     vec![0, 2, 4, 6, 8],
///     vec![1, 2, 0, 3, 0, 3, 1, 2],
///     vec![Vec2::ZERO; 4],
///     vec![BasicTerrainType::Plains.code(); 4],
/// )
/// .unwrap();
///
/// assert_eq!(topology.neighbors(3).collect::<Vec<_>>(), vec![1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct MeshTopology {
    offsets: Vec<usize>,
    neighbors: Vec<i32>,
    centers: Vec<Vec2>,
    terrain: Vec<u8>,
}

impl MeshTopology {
    /// Build a topology from CSR arrays
    ///
    /// # Errors
    ///
    /// Returns `MalformedTopology` if the offsets are not a monotone prefix
    /// array over `neighbors`, a neighbor id is out of range, or the centers
    /// and terrain arrays disagree with the cell count.
    pub fn from_csr(
        offsets: Vec<usize>,
        neighbors: Vec<i32>,
        centers: Vec<Vec2>,
        terrain: Vec<u8>,
    ) -> Result<Self> {
        let cell_count = offsets.len().checked_sub(1).ok_or_else(|| {
            PartitionError::MalformedTopology("offsets array is empty".to_string())
        })?;

        if offsets[0] != 0 {
            return Err(PartitionError::MalformedTopology(format!(
                "offsets must start at 0 (got {})",
                offsets[0]
            )));
        }
        if let Some(pos) = offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(PartitionError::MalformedTopology(format!(
                "offsets decrease at cell {}",
                pos
            )));
        }
        if offsets[cell_count] != neighbors.len() {
            return Err(PartitionError::MalformedTopology(format!(
                "offsets end at {} but neighbor array has {} entries",
                offsets[cell_count],
                neighbors.len()
            )));
        }
        if let Some(&bad) = neighbors
            .iter()
            .find(|&&n| n < NO_NEIGHBOR || (n >= 0 && n as usize >= cell_count))
        {
            return Err(PartitionError::MalformedTopology(format!(
                "neighbor id {} out of range for {} cells",
                bad, cell_count
            )));
        }
        if centers.len() != cell_count || terrain.len() != cell_count {
            return Err(PartitionError::MalformedTopology(format!(
                "{} cells but {} centers and {} terrain codes",
                cell_count,
                centers.len(),
                terrain.len()
            )));
        }

        Ok(Self {
            offsets,
            neighbors,
            centers,
            terrain,
        })
    }

    /// Build a topology from per-cell neighbor lists
    pub fn from_adjacency(
        adjacency: &[Vec<usize>],
        centers: Vec<Vec2>,
        terrain: Vec<u8>,
    ) -> Result<Self> {
        let mut offsets = Vec::with_capacity(adjacency.len() + 1);
        let mut neighbors = Vec::new();
        offsets.push(0);
        for list in adjacency {
            for &n in list {
                let n = i32::try_from(n).map_err(|_| {
                    PartitionError::MalformedTopology(format!("neighbor id {} overflows", n))
                })?;
                neighbors.push(n);
            }
            offsets.push(neighbors.len());
        }
        Self::from_csr(offsets, neighbors, centers, terrain)
    }

    /// Synthetic rectangular mesh with 4-neighbor adjacency
    ///
    /// Cell `y * width + x` is centered at `(x, y)`. Every cell carries four
    /// neighbor slots (left, right, up, down); slots past the border are
    /// map edges. All terrain is plains.
    pub fn grid(width: usize, height: usize) -> Self {
        const STEPS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

        let cell_count = width * height;
        let mut offsets = Vec::with_capacity(cell_count + 1);
        let mut neighbors = Vec::with_capacity(cell_count * 4);
        let mut centers = Vec::with_capacity(cell_count);
        offsets.push(0);

        for y in 0..height as i64 {
            for x in 0..width as i64 {
                for (dx, dy) in STEPS {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        neighbors.push(NO_NEIGHBOR);
                    } else {
                        neighbors.push((ny * width as i64 + nx) as i32);
                    }
                }
                offsets.push(neighbors.len());
                centers.push(Vec2::new(x as f32, y as f32));
            }
        }

        Self {
            offsets,
            neighbors,
            centers,
            terrain: vec![BasicTerrainType::Plains.code(); cell_count],
        }
    }

    /// Get the number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.centers.len()
    }

    /// Raw neighbor slots of a cell, including `-1` map edges
    ///
    /// Returns an empty slice if the cell id is invalid.
    pub fn raw_neighbors(&self, cell: usize) -> &[i32] {
        match (self.offsets.get(cell), self.offsets.get(cell + 1)) {
            (Some(&start), Some(&end)) => &self.neighbors[start..end],
            _ => &[],
        }
    }

    /// Neighbor ids of a cell, map edges skipped
    pub fn neighbors(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        self.raw_neighbors(cell)
            .iter()
            .filter(|&&n| n != NO_NEIGHBOR)
            .map(|&n| n as usize)
    }

    /// Center of a cell
    ///
    /// # Panics
    ///
    /// Panics if the cell id is out of range.
    #[inline]
    pub fn center(&self, cell: usize) -> Vec2 {
        self.centers[cell]
    }

    /// Terrain code of a cell
    ///
    /// # Panics
    ///
    /// Panics if the cell id is out of range.
    #[inline]
    pub fn terrain(&self, cell: usize) -> u8 {
        self.terrain[cell]
    }

    /// Overwrite the terrain code of a cell
    pub fn set_terrain(&mut self, cell: usize, code: u8) -> Result<()> {
        let cell_count = self.cell_count();
        let slot = self
            .terrain
            .get_mut(cell)
            .ok_or(PartitionError::CellOutOfRange { cell, cell_count })?;
        *slot = code;
        Ok(())
    }

    /// Check whether a cell touches water
    pub fn is_coastal(&self, cell: usize, water: &WaterCodes) -> bool {
        self.neighbors(cell).any(|n| water.contains(self.terrain[n]))
    }

    /// Hop distances from a set of sources (multi-source BFS)
    ///
    /// The search only expands through cells where `mask` is true; sources
    /// are always at distance 0. Unreachable cells are `None`.
    pub fn hop_distances(&self, sources: &[usize], mask: &[bool]) -> Vec<Option<u32>> {
        let mut dist = vec![UNREACHED; self.cell_count()];
        for &source in sources {
            self.relax_hop_distances(source, mask, &mut dist);
        }
        dist.into_iter()
            .map(|d| (d != UNREACHED).then_some(d))
            .collect()
    }

    /// Lower `dist` with hop counts from one more source
    ///
    /// Only cells whose distance improves are expanded, so adding sources one
    /// at a time stays proportional to the region each source claims.
    pub(crate) fn relax_hop_distances(&self, source: usize, mask: &[bool], dist: &mut [u32]) {
        if source >= dist.len() || dist[source] == 0 {
            return;
        }
        dist[source] = 0;
        let mut queue = VecDeque::from([source]);
        while let Some(cell) = queue.pop_front() {
            let next = dist[cell] + 1;
            for n in self.neighbors(cell) {
                if mask.get(n).copied().unwrap_or(false) && next < dist[n] {
                    dist[n] = next;
                    queue.push_back(n);
                }
            }
        }
    }
}
