//! Nation territory handed over by the nation collaborator

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PartitionError, Result};
use crate::topology::MeshTopology;

/// Cells owned by one nation plus its capital
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NationTerritory {
    /// Nation identifier, scopes canton ids
    pub nation_id: String,
    /// Owned cell ids in the collaborator's order
    pub cells: Vec<usize>,
    /// Capital cell id
    pub capital: usize,
}

impl NationTerritory {
    pub fn new(nation_id: impl Into<String>, cells: Vec<usize>, capital: usize) -> Self {
        Self {
            nation_id: nation_id.into(),
            cells,
            capital,
        }
    }

    /// Number of distinct owned cells
    pub fn area(&self) -> usize {
        let mut cells = self.cells.clone();
        cells.sort_unstable();
        cells.dedup();
        cells.len()
    }

    /// Check the territory against a mesh and index it
    ///
    /// Duplicate ids are folded. An empty territory is valid; its capital is
    /// not checked.
    pub fn index(&self, topology: &MeshTopology) -> Result<TerritoryIndex> {
        let cell_count = topology.cell_count();
        let mut mask = vec![false; cell_count];
        for &cell in &self.cells {
            if cell >= cell_count {
                return Err(PartitionError::CellOutOfRange { cell, cell_count });
            }
            mask[cell] = true;
        }

        let cells: Vec<usize> = (0..cell_count).filter(|&c| mask[c]).collect();
        if !cells.is_empty() && !mask.get(self.capital).copied().unwrap_or(false) {
            return Err(PartitionError::CapitalNotInTerritory {
                nation: self.nation_id.clone(),
                capital: self.capital,
            });
        }

        Ok(TerritoryIndex {
            mask,
            cells,
            capital: self.capital,
        })
    }
}

/// Validated territory: membership mask and ascending cell list
#[derive(Debug, Clone)]
pub struct TerritoryIndex {
    pub(crate) mask: Vec<bool>,
    pub(crate) cells: Vec<usize>,
    pub(crate) capital: usize,
}

impl TerritoryIndex {
    /// Territory cells, ascending
    #[inline]
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    #[inline]
    pub fn capital(&self) -> usize {
        self.capital
    }

    #[inline]
    pub fn contains(&self, cell: usize) -> bool {
        self.mask.get(cell).copied().unwrap_or(false)
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_folds_duplicates() {
        let topology = MeshTopology::grid(3, 3);
        let territory = NationTerritory::new("north", vec![4, 1, 4, 0], 4);
        assert_eq!(territory.area(), 3);

        let index = territory.index(&topology).unwrap();
        assert_eq!(index.cells, vec![0, 1, 4]);
        assert!(index.contains(1));
        assert!(!index.contains(2));
        assert!(!index.contains(100));
    }

    #[test]
    fn test_index_rejects_bad_input() {
        let topology = MeshTopology::grid(2, 2);

        let out_of_range = NationTerritory::new("n", vec![0, 9], 0);
        assert_eq!(
            out_of_range.index(&topology).unwrap_err(),
            PartitionError::CellOutOfRange {
                cell: 9,
                cell_count: 4
            }
        );

        let foreign_capital = NationTerritory::new("n", vec![0, 1], 3);
        assert!(matches!(
            foreign_capital.index(&topology),
            Err(PartitionError::CapitalNotInTerritory { .. })
        ));
    }

    #[test]
    fn test_empty_territory_is_valid() {
        let topology = MeshTopology::grid(2, 2);
        let index = NationTerritory::new("n", vec![], 42).index(&topology).unwrap();
        assert_eq!(index.area(), 0);
    }
}
