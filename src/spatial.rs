//! Spatial indexing for position-to-cell lookups
//!
//! This module is only available with the `spatial-index` feature.

#[cfg(feature = "spatial-index")]
use glam::Vec2;
#[cfg(feature = "spatial-index")]
use kiddo::immutable::float::kdtree::ImmutableKdTree;
#[cfg(feature = "spatial-index")]
use kiddo::SquaredEuclidean;

#[cfg(feature = "spatial-index")]
use crate::topology::MeshTopology;

/// KD-tree over a subset of cell centers
///
/// Provides O(log n) nearest-cell lookups for map positions, e.g. to find
/// the canton under a cursor or a unit.
#[cfg(feature = "spatial-index")]
#[derive(Clone)]
pub struct SpatialIndex {
    tree: Option<ImmutableKdTree<f32, usize, 2, 32>>,
    /// Tree item -> cell id
    cells: Vec<usize>,
}

#[cfg(feature = "spatial-index")]
impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("cells", &self.cells.len())
            .finish()
    }
}

#[cfg(feature = "spatial-index")]
impl SpatialIndex {
    /// Build an index over the centers of `cells`
    ///
    /// # Example
    ///
    /// ```
    /// # #[cfg(feature = "spatial-index")]
    /// # {
    /// use canton_partition::{MeshTopology, SpatialIndex, Vec2};
    ///
    /// let topology = MeshTopology::grid(4, 4);
    /// let index = SpatialIndex::new(&topology, &[0, 5, 15]);
    /// assert_eq!(index.find_nearest(Vec2::new(1.2, 0.8)), Some(5));
    /// # }
    /// ```
    pub fn new(topology: &MeshTopology, cells: &[usize]) -> Self {
        let points: Vec<[f32; 2]> = cells
            .iter()
            .map(|&cell| {
                let c = topology.center(cell);
                [c.x, c.y]
            })
            .collect();

        let tree = (!points.is_empty()).then(|| ImmutableKdTree::new_from_slice(&points));
        Self {
            tree,
            cells: cells.to_vec(),
        }
    }

    /// Cell whose center is nearest to `position`
    ///
    /// `None` only for an index built over no cells.
    pub fn find_nearest(&self, position: Vec2) -> Option<usize> {
        let tree = self.tree.as_ref()?;
        let result = tree.nearest_one::<SquaredEuclidean>(&[position.x, position.y]);
        self.cells.get(result.item as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
#[cfg(feature = "spatial-index")]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_cell_on_grid() {
        let topology = MeshTopology::grid(5, 5);
        let cells: Vec<usize> = (0..25).collect();
        let index = SpatialIndex::new(&topology, &cells);

        assert_eq!(index.find_nearest(Vec2::new(0.1, 0.2)), Some(0));
        assert_eq!(index.find_nearest(Vec2::new(2.1, 2.9)), Some(17));
        assert_eq!(index.find_nearest(Vec2::new(40.0, 40.0)), Some(24));
    }

    #[test]
    fn test_subset_maps_back_to_cell_ids() {
        let topology = MeshTopology::grid(6, 1);
        let index = SpatialIndex::new(&topology, &[4, 5]);

        assert_eq!(index.len(), 2);
        // cell 0 is not indexed; the nearest indexed center is cell 4
        assert_eq!(index.find_nearest(Vec2::new(0.0, 0.0)), Some(4));
        assert_eq!(index.find_nearest(Vec2::new(5.0, 0.0)), Some(5));
    }

    #[test]
    fn test_empty_index() {
        let topology = MeshTopology::grid(2, 2);
        let index = SpatialIndex::new(&topology, &[]);
        assert!(index.is_empty());
        assert_eq!(index.find_nearest(Vec2::ZERO), None);
    }
}
