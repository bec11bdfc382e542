//! Geography annotation
//!
//! Derives the static per-canton data the economy layer reads: terrain
//! shares, coastal flag, perimeter, compactness, centroid and canton
//! adjacency. Purely derived from the final assignment.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use crate::canton::{compactness, Canton, CantonId, GeographyMix};
use crate::partition::{perimeter, Assignment};
use crate::terrain::WaterCodes;
use crate::topology::MeshTopology;

/// Terrain-type shares of a cell set, normalized to 1.0
pub fn geography_mix(topology: &MeshTopology, cells: &BTreeSet<usize>) -> GeographyMix {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for &cell in cells {
        *counts.entry(topology.terrain(cell)).or_insert(0) += 1;
    }

    let total = cells.len() as f32;
    GeographyMix {
        shares: counts
            .into_iter()
            .map(|(code, count)| (code, count as f32 / total))
            .collect(),
    }
}

/// Mean of the member cell centers, `Vec2::ZERO` for an empty set
pub fn centroid(topology: &MeshTopology, cells: &BTreeSet<usize>) -> Vec2 {
    if cells.is_empty() {
        return Vec2::ZERO;
    }
    let sum: Vec2 = cells.iter().map(|&cell| topology.center(cell)).sum();
    sum / cells.len() as f32
}

/// Build the cantons of a nation from a settled assignment
///
/// Canton `i` gets the id `CantonId::new(nation_id, i)`. Neighbor lists hold
/// the cantons of the same nation sharing at least one mesh edge.
pub fn annotate(
    topology: &MeshTopology,
    water: &WaterCodes,
    nation_id: &str,
    assignment: &Assignment,
) -> Vec<Canton> {
    let ids: Vec<CantonId> = (0..assignment.region_count())
        .map(|i| CantonId::new(nation_id, i))
        .collect();
    let owners = assignment.owners(topology.cell_count());

    assignment
        .regions()
        .iter()
        .enumerate()
        .map(|(index, cells)| {
            let p = perimeter(topology, cells);
            let neighbors: BTreeSet<usize> = cells
                .iter()
                .flat_map(|&cell| topology.neighbors(cell))
                .filter_map(|n| owners[n])
                .filter(|&owner| owner != index)
                .collect();

            Canton {
                id: ids[index].clone(),
                nation_id: nation_id.to_string(),
                cells: cells.iter().copied().collect(),
                area: cells.len(),
                perimeter: p,
                compactness: compactness(p, cells.len()),
                coastal: cells.iter().any(|&c| topology.is_coastal(c, water)),
                capital: index == assignment.capital_region(),
                centroid: centroid(topology, cells),
                geography: geography_mix(topology, cells),
                neighbors: neighbors.into_iter().map(|n| ids[n].clone()).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::BasicTerrainType;

    #[test]
    fn test_annotate_split_line() {
        let mut topology = MeshTopology::grid(6, 1);
        topology.set_terrain(0, BasicTerrainType::Ocean.code()).unwrap();
        topology.set_terrain(2, BasicTerrainType::Forest.code()).unwrap();

        let assignment = Assignment::new(
            vec![BTreeSet::from([1, 2]), BTreeSet::from([3, 4, 5])],
            0,
        );
        let cantons = annotate(&topology, &WaterCodes::default(), "n", &assignment);

        assert_eq!(cantons.len(), 2);
        let first = &cantons[0];
        assert_eq!(first.id, CantonId::new("n", 0));
        assert!(first.capital);
        assert!(first.coastal);
        assert_eq!(first.cells, vec![1, 2]);
        assert_eq!(first.perimeter, 6);
        assert_eq!(first.centroid, Vec2::new(1.5, 0.0));
        assert_eq!(first.geography.share(BasicTerrainType::Forest.code()), 0.5);
        assert_eq!(first.neighbors, vec![CantonId::new("n", 1)]);

        let second = &cantons[1];
        assert!(!second.capital);
        assert!(!second.coastal);
        assert_eq!(second.geography.dominant(), Some(BasicTerrainType::Plains.code()));
        assert_eq!(second.neighbors, vec![CantonId::new("n", 0)]);
    }

    #[test]
    fn test_shares_sum_to_one() {
        let mut topology = MeshTopology::grid(3, 3);
        topology.set_terrain(4, BasicTerrainType::Mountain.code()).unwrap();
        topology.set_terrain(5, BasicTerrainType::Hills.code()).unwrap();
        let cells: BTreeSet<usize> = (0..9).collect();

        let mix = geography_mix(&topology, &cells);
        let total: f32 = mix.shares.values().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(mix.shares.len(), 3);
        assert_eq!(centroid(&topology, &cells), Vec2::new(1.0, 1.0));
        assert_eq!(centroid(&topology, &BTreeSet::new()), Vec2::ZERO);
    }
}
