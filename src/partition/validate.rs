//! Partition validation
//!
//! A pure audit of a candidate [`Assignment`]: per-region shape metrics plus
//! the structural diagnostics that drive the repairer.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{components, perimeter, Assignment};
use crate::canton::compactness;
use crate::config::PartitionConfig;
use crate::territory::TerritoryIndex;
use crate::topology::MeshTopology;

/// Shape metrics of one region
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMetrics {
    pub area: usize,
    pub perimeter: usize,
    pub compactness: f32,
    pub coastal: bool,
}

/// Metrics and structural diagnostics of an assignment
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    /// Per-region metrics, indexed like the assignment's regions
    pub metrics: Vec<RegionMetrics>,
    /// Territory cells no region claims, ascending
    pub uncovered: Vec<usize>,
    /// Cells claimed by more than one region, with their claimants
    pub overlaps: Vec<(usize, Vec<usize>)>,
    /// Claimed cells outside the territory, ascending
    pub foreign: Vec<usize>,
    /// Regions whose cells form more than one connected component
    pub disconnected: Vec<usize>,
    /// `(cell, region)`: cells outside `region` whose in-territory neighbors
    /// all belong solely to `region`
    pub holes: Vec<(usize, usize)>,
    /// The capital cell is claimed by the capital region and nothing else
    pub capital_ok: bool,
}

impl ValidationReport {
    /// Coverage, exclusivity and capital containment hold
    pub fn is_structurally_sound(&self) -> bool {
        self.uncovered.is_empty()
            && self.overlaps.is_empty()
            && self.foreign.is_empty()
            && self.capital_ok
    }

    /// Structurally sound and every region is connected
    pub fn is_valid(&self) -> bool {
        self.is_structurally_sound() && self.disconnected.is_empty()
    }

    /// Regions above `min_area` whose compactness exceeds `threshold`
    pub fn ragged_regions(&self, threshold: f32, min_area: usize) -> Vec<usize> {
        self.metrics
            .iter()
            .enumerate()
            .filter(|(_, m)| m.area > min_area && m.compactness > threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Audit an assignment against a territory
pub fn validate_assignment(
    topology: &MeshTopology,
    territory: &TerritoryIndex,
    assignment: &Assignment,
    config: &PartitionConfig,
) -> ValidationReport {
    let cell_count = topology.cell_count();
    let mut claims: Vec<Vec<usize>> = vec![Vec::new(); cell_count];
    let mut foreign = BTreeSet::new();

    for (index, region) in assignment.regions().iter().enumerate() {
        for &cell in region {
            match claims.get_mut(cell) {
                Some(claimants) if territory.contains(cell) => claimants.push(index),
                _ => {
                    foreign.insert(cell);
                }
            }
        }
    }

    let metrics = assignment
        .regions()
        .iter()
        .map(|region| {
            let p = perimeter(topology, region);
            RegionMetrics {
                area: region.len(),
                perimeter: p,
                compactness: compactness(p, region.len()),
                coastal: region
                    .iter()
                    .any(|&c| topology.is_coastal(c, &config.water_codes)),
            }
        })
        .collect();

    let mut uncovered = Vec::new();
    let mut overlaps = Vec::new();
    let mut holes = Vec::new();
    for &cell in territory.cells() {
        match claims[cell].len() {
            0 => uncovered.push(cell),
            1 => {}
            _ => overlaps.push((cell, claims[cell].clone())),
        }

        // sole owner shared by every in-territory neighbor
        let mut enclosing = None;
        let mut enclosed = false;
        for n in topology.neighbors(cell).filter(|&n| territory.contains(n)) {
            match (claims[n].as_slice(), enclosing) {
                ([r], None) => {
                    enclosing = Some(*r);
                    enclosed = true;
                }
                ([r], Some(e)) if *r == e => {}
                _ => {
                    enclosed = false;
                    break;
                }
            }
        }
        if let (true, Some(region)) = (enclosed, enclosing) {
            if !claims[cell].contains(&region) {
                holes.push((cell, region));
            }
        }
    }

    let disconnected = assignment
        .regions()
        .iter()
        .enumerate()
        .filter(|(_, region)| components(topology, region).len() > 1)
        .map(|(i, _)| i)
        .collect();

    let capital_ok = if territory.area() == 0 {
        assignment.claimed() == 0
    } else {
        claims[territory.capital()] == [assignment.capital_region()]
    };

    ValidationReport {
        metrics,
        uncovered,
        overlaps,
        foreign: foreign.into_iter().collect(),
        disconnected,
        holes,
        capital_ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::BasicTerrainType;
    use crate::territory::NationTerritory;

    fn setup(width: usize, height: usize, capital: usize) -> (MeshTopology, TerritoryIndex) {
        let topology = MeshTopology::grid(width, height);
        let territory = NationTerritory::new("n", (0..width * height).collect(), capital)
            .index(&topology)
            .unwrap();
        (topology, territory)
    }

    #[test]
    fn test_valid_split() {
        let (topology, territory) = setup(4, 1, 0);
        let assignment = Assignment::new(vec![BTreeSet::from([0, 1]), BTreeSet::from([2, 3])], 0);
        let report = validate_assignment(&topology, &territory, &assignment, &PartitionConfig::default());

        assert!(report.is_valid());
        assert_eq!(report.metrics[0].area, 2);
        assert_eq!(report.metrics[0].perimeter, 6);
        assert!(report.holes.is_empty());
        assert!(!report.metrics[1].coastal);
    }

    #[test]
    fn test_detects_gaps_overlaps_and_foreign_cells() {
        let (topology, territory) = setup(5, 1, 0);
        let small = NationTerritory::new("n", vec![0, 1, 2, 3], 0)
            .index(&topology)
            .unwrap();
        let assignment = Assignment::new(vec![BTreeSet::from([0, 1, 4]), BTreeSet::from([1])], 0);
        let report = validate_assignment(&topology, &small, &assignment, &PartitionConfig::default());

        assert_eq!(report.uncovered, vec![2, 3]);
        assert_eq!(report.overlaps, vec![(1, vec![0, 1])]);
        assert_eq!(report.foreign, vec![4]);
        assert!(!report.is_structurally_sound());
        // the full territory is untouched by the smaller index
        assert_eq!(territory.area(), 5);
    }

    #[test]
    fn test_detects_disconnected_region_and_hole() {
        let (topology, territory) = setup(3, 3, 0);
        // region 1 owns the center and the corner 8; both are enclosed by region 0
        let mut outer: BTreeSet<usize> = (0..8).collect();
        outer.remove(&4);
        let assignment = Assignment::new(vec![outer, BTreeSet::from([4, 8])], 0);
        let report = validate_assignment(&topology, &territory, &assignment, &PartitionConfig::default());

        assert_eq!(report.disconnected, vec![1]);
        assert_eq!(report.holes, vec![(4, 0), (8, 0)]);
        assert!(report.is_structurally_sound());
        assert!(!report.is_valid());
    }

    #[test]
    fn test_capital_must_sit_in_capital_region() {
        let (topology, territory) = setup(4, 1, 3);
        let assignment = Assignment::new(vec![BTreeSet::from([0, 1]), BTreeSet::from([2, 3])], 0);
        let report = validate_assignment(&topology, &territory, &assignment, &PartitionConfig::default());
        assert!(!report.capital_ok);
    }

    #[test]
    fn test_coastal_and_ragged_regions() {
        let (mut topology, _) = setup(10, 2, 0);
        topology
            .set_terrain(19, BasicTerrainType::Ocean.code())
            .unwrap();
        let territory = NationTerritory::new("n", (0..19).collect(), 0)
            .index(&topology)
            .unwrap();
        // region 0: the top row strip; region 1: the bottom row minus the ocean cell
        let assignment = Assignment::new(
            vec![(0..10).collect(), (10..19).collect()],
            0,
        );
        let report = validate_assignment(&topology, &territory, &assignment, &PartitionConfig::default());

        assert!(report.metrics[0].coastal);
        assert!(report.metrics[1].coastal);
        // a 1x10 strip has perimeter 22: 22² / (4π·10) ≈ 3.85
        assert_eq!(report.metrics[0].perimeter, 22);
        assert_eq!(report.ragged_regions(3.0, 4), vec![0, 1]);
        assert!(report.ragged_regions(4.0, 4).is_empty());
    }
}
