//! Per-nation partitions and the canton registry

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "spatial-index")]
use glam::Vec2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::canton::{Canton, CantonId};
use crate::config::PartitionConfig;
use crate::error::{PartitionError, Result};
use crate::geography::annotate;
use crate::partition::{build_assignment, PartitionContext, RepairReport};
use crate::territory::NationTerritory;
use crate::topology::MeshTopology;

#[cfg(feature = "spatial-index")]
use crate::spatial::SpatialIndex;

/// The cantons of one nation
///
/// Built once per nation after its territory is final. Cantons are ordered
/// by id; the capital canton is always the first.
///
/// # Example
///
/// ```
/// use canton_partition::*;
///
/// let topology = MeshTopology::grid(10, 5);
/// let territory = NationTerritory::new("alpha", (0..50).collect(), 22);
/// let config = PartitionConfigBuilder::new()
///     .seed_label("alpha")
///     .canton_count(5)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let nation = partition_nation(&topology, &territory, &config).unwrap();
/// assert_eq!(nation.cantons().len(), 5);
/// assert!(nation.canton_of(22).unwrap().capital);
/// ```
#[derive(Debug, Clone)]
pub struct NationCantons {
    nation_id: String,

    /// Cantons, indexed like their ids
    cantons: Vec<Canton>,

    /// Cell id -> position in `cantons`
    cell_to_canton: BTreeMap<usize, usize>,

    report: RepairReport,

    /// Territory cell lookup by position (requires spatial-index feature)
    #[cfg(feature = "spatial-index")]
    spatial_index: SpatialIndex,
}

impl NationCantons {
    /// Nation these cantons belong to
    pub fn nation_id(&self) -> &str {
        &self.nation_id
    }

    /// All cantons, ordered by id
    pub fn cantons(&self) -> &[Canton] {
        &self.cantons
    }

    /// Ordered canton ids
    pub fn canton_ids(&self) -> impl Iterator<Item = &CantonId> + '_ {
        self.cantons.iter().map(|c| &c.id)
    }

    /// Look up a canton by id
    pub fn get(&self, id: &CantonId) -> Option<&Canton> {
        self.cantons
            .binary_search_by(|c| c.id.cmp(id))
            .ok()
            .map(|i| &self.cantons[i])
    }

    /// Canton containing a cell
    pub fn canton_of(&self, cell: usize) -> Option<&Canton> {
        self.cell_to_canton.get(&cell).map(|&i| &self.cantons[i])
    }

    /// Id of the canton containing a cell
    pub fn canton_id_of(&self, cell: usize) -> Option<&CantonId> {
        self.canton_of(cell).map(|c| &c.id)
    }

    /// The canton holding the capital cell, `None` for an empty territory
    pub fn capital_canton(&self) -> Option<&Canton> {
        self.cantons.iter().find(|c| c.capital)
    }

    /// Repair telemetry of the run that produced these cantons
    pub fn report(&self) -> &RepairReport {
        &self.report
    }

    /// Total cell count over all cantons
    pub fn area(&self) -> usize {
        self.cantons.iter().map(|c| c.area).sum()
    }

    /// Sorted cell -> canton id map
    ///
    /// Two runs over identical inputs produce equal maps.
    pub fn assignment(&self) -> BTreeMap<usize, CantonId> {
        self.cell_to_canton
            .iter()
            .map(|(&cell, &i)| (cell, self.cantons[i].id.clone()))
            .collect()
    }

    /// Canton of the territory cell nearest to a map position
    ///
    /// Requires the `spatial-index` feature.
    #[cfg(feature = "spatial-index")]
    pub fn canton_at(&self, position: Vec2) -> Option<&Canton> {
        let cell = self.spatial_index.find_nearest(position)?;
        self.canton_of(cell)
    }
}

/// Partition one nation's territory into cantons
///
/// Data-shape edge cases never fail: an empty territory yields no cantons
/// and a territory no larger than the minimum area yields one.
///
/// # Errors
///
/// Returns `CellOutOfRange` if the territory names a cell the mesh lacks,
/// or `CapitalNotInTerritory` if a non-empty territory omits its capital.
pub fn partition_nation(
    topology: &MeshTopology,
    territory: &NationTerritory,
    config: &PartitionConfig,
) -> Result<NationCantons> {
    let index = territory.index(topology)?;
    let ctx = PartitionContext::new(config.seed, &territory.nation_id);
    let (assignment, report) = build_assignment(topology, &index, config, ctx);
    let cantons = annotate(topology, &config.water_codes, &territory.nation_id, &assignment);

    let cell_to_canton = cantons
        .iter()
        .enumerate()
        .flat_map(|(i, canton)| canton.cells.iter().map(move |&cell| (cell, i)))
        .collect();

    tracing::info!(
        target: "cantons",
        nation = %territory.nation_id,
        area = index.area(),
        cantons = cantons.len(),
        passes = report.passes,
        converged = report.converged,
        fallback = report.fallback,
        "partitioned nation"
    );

    Ok(NationCantons {
        nation_id: territory.nation_id.clone(),
        cantons,
        cell_to_canton,
        report,
        #[cfg(feature = "spatial-index")]
        spatial_index: SpatialIndex::new(topology, index.cells()),
    })
}

/// Nation -> cantons store
///
/// Owned by the caller and passed by reference to whatever reads cantons.
#[derive(Debug, Clone, Default)]
pub struct CantonRegistry {
    nations: BTreeMap<String, NationCantons>,
}

impl CantonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a nation's cantons, returning the ones they replace
    pub fn insert(&mut self, cantons: NationCantons) -> Option<NationCantons> {
        self.nations.insert(cantons.nation_id.clone(), cantons)
    }

    pub fn remove(&mut self, nation_id: &str) -> Option<NationCantons> {
        self.nations.remove(nation_id)
    }

    pub fn get(&self, nation_id: &str) -> Option<&NationCantons> {
        self.nations.get(nation_id)
    }

    /// Ordered cantons of a nation
    pub fn cantons_of(&self, nation_id: &str) -> Option<&[Canton]> {
        self.get(nation_id).map(NationCantons::cantons)
    }

    /// Canton containing a cell, across all nations
    pub fn canton_of_cell(&self, cell: usize) -> Option<&Canton> {
        self.nations.values().find_map(|n| n.canton_of(cell))
    }

    /// Nations in id order
    pub fn iter(&self) -> impl Iterator<Item = &NationCantons> + '_ {
        self.nations.values()
    }

    pub fn len(&self) -> usize {
        self.nations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nations.is_empty()
    }
}

/// Partition several finalized territories into a registry
///
/// With the `parallel` feature nations are partitioned concurrently. Every
/// nation reads only its own cells, so the result matches the serial path.
///
/// # Errors
///
/// Returns `DuplicateNation` if two territories share an id, or the first
/// error of [`partition_nation`] in input order.
pub fn partition_nations(
    topology: &MeshTopology,
    territories: &[NationTerritory],
    config: &PartitionConfig,
) -> Result<CantonRegistry> {
    let mut seen = BTreeSet::new();
    for territory in territories {
        if !seen.insert(territory.nation_id.as_str()) {
            return Err(PartitionError::DuplicateNation(territory.nation_id.clone()));
        }
    }

    #[cfg(feature = "parallel")]
    let results: Vec<Result<NationCantons>> = territories
        .par_iter()
        .map(|territory| partition_nation(topology, territory, config))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<NationCantons>> = territories
        .iter()
        .map(|territory| partition_nation(topology, territory, config))
        .collect();

    let mut registry = CantonRegistry::new();
    for result in results {
        registry.insert(result?);
    }
    tracing::debug!(target: "cantons", nations = registry.len(), "partitioned all nations");
    Ok(registry)
}
