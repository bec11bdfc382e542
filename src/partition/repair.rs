//! Structural repair of a candidate assignment
//!
//! A fixed sequence of corrective phases, each bounded by
//! `phase_iteration_cap`, re-run as a whole until a pass changes nothing or
//! `max_repair_passes` is spent:
//!
//! 1. overlap resolution (plus foreign-cell stripping and capital restore)
//! 2. gap filling
//! 3. component resolution
//! 4. hole filling
//! 5. tendril trimming
//! 6. small-canton expansion
//! 7. compactness improvement (re-running 6 after every peel)
//!
//! No phase fails. Moves without a legal donor or target are skipped and
//! retried on the next pass.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{components, perimeter, stays_connected, Assignment};
use crate::canton::compactness;
use crate::config::PartitionConfig;
use crate::territory::TerritoryIndex;
use crate::topology::MeshTopology;

/// Counters reported by the repairer
///
/// Diagnostic telemetry, not a pass/fail signal.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepairReport {
    /// Full passes run
    pub passes: usize,
    /// Multiply-claimed cells awarded to a single canton
    pub overlaps_resolved: usize,
    /// Claimed cells outside the territory that were dropped
    pub foreign_removed: usize,
    /// Times the capital cell was put back into the capital canton
    pub capital_restored: usize,
    /// Uncovered cells assigned
    pub gaps_filled: usize,
    /// Stray components moved to a neighboring canton
    pub components_resolved: usize,
    /// Cells moved along with those components
    pub fragments_absorbed: usize,
    /// Enclosed cells absorbed by the enclosing canton
    pub holes_filled: usize,
    /// Dead-end cells handed to a neighbor
    pub tendrils_trimmed: usize,
    /// Cells pulled into cantons below the minimum area
    pub small_cantons_expanded: usize,
    /// Empty cantons given a first cell again
    pub cantons_reseeded: usize,
    /// Boundary cells peeled off ragged cantons
    pub compactness_moves: usize,
    /// Cantons below the minimum area after repair
    pub undersized_remaining: usize,
    /// Cantons above the minimum area still over the compactness threshold
    pub ragged_remaining: usize,
    /// Some phase hit its cap or ran out of legal moves with cantons still
    /// over the compactness threshold, or the pass limit ran out before a
    /// stable pass
    pub iteration_cap_reached: bool,
    /// The last pass changed nothing
    pub converged: bool,
    /// The partition degenerated to a single capital canton
    pub fallback: bool,
}

impl RepairReport {
    pub(crate) fn converged() -> Self {
        Self {
            converged: true,
            ..Self::default()
        }
    }

    /// Record the cantons still off the size and shape targets
    ///
    /// A ragged canton left over means no phase could improve it within its
    /// budget, which also sets `iteration_cap_reached`.
    pub(crate) fn settle(
        &mut self,
        topology: &MeshTopology,
        assignment: &Assignment,
        config: &PartitionConfig,
    ) {
        let regions = assignment.regions();
        self.undersized_remaining = regions
            .iter()
            .filter(|cells| cells.len() < config.min_canton_area)
            .count();
        self.ragged_remaining = regions
            .iter()
            .filter(|cells| {
                cells.len() > config.min_canton_area
                    && compactness(perimeter(topology, cells), cells.len())
                        > config.compactness_threshold
            })
            .count();
        if self.ragged_remaining > 0 {
            self.iteration_cap_reached = true;
        }
    }

    /// Sum of all change counters
    pub fn total_changes(&self) -> usize {
        self.overlaps_resolved
            + self.foreign_removed
            + self.capital_restored
            + self.gaps_filled
            + self.components_resolved
            + self.holes_filled
            + self.tendrils_trimmed
            + self.small_cantons_expanded
            + self.cantons_reseeded
            + self.compactness_moves
    }
}

/// Repair an assignment in place
pub fn repair(
    topology: &MeshTopology,
    territory: &TerritoryIndex,
    assignment: &mut Assignment,
    config: &PartitionConfig,
) -> RepairReport {
    let mut repairer = Repairer {
        topology,
        territory,
        config,
        left: BTreeMap::new(),
        report: RepairReport::default(),
    };

    for pass in 0..config.max_repair_passes {
        let before = repairer.report.total_changes();

        repairer.resolve_overlaps(assignment);
        repairer.fill_gaps(assignment);
        repairer.resolve_components(assignment);
        repairer.fill_holes(assignment);
        repairer.trim_tendrils(assignment);
        repairer.expand_small(assignment);
        repairer.improve_compactness(assignment);

        repairer.report.passes = pass + 1;
        let changes = repairer.report.total_changes() - before;
        tracing::debug!(target: "cantons::repair", pass, changes, "repair pass finished");
        if changes == 0 {
            repairer.report.converged = true;
            break;
        }
    }

    repairer.report.settle(topology, assignment, config);
    if repairer.report.undersized_remaining > 0 {
        tracing::debug!(
            target: "cantons::repair",
            undersized = repairer.report.undersized_remaining,
            "cantons left below the minimum area"
        );
    }

    if !repairer.report.converged {
        repairer.report.iteration_cap_reached = true;
        tracing::warn!(
            target: "cantons::repair",
            passes = repairer.report.passes,
            "repair pass limit reached before a stable pass"
        );
    }
    repairer.report
}

struct Repairer<'a> {
    topology: &'a MeshTopology,
    territory: &'a TerritoryIndex,
    config: &'a PartitionConfig,
    /// Cantons each cell has been peeled or trimmed away from
    left: BTreeMap<usize, BTreeSet<usize>>,
    report: RepairReport,
}

impl Repairer<'_> {
    fn cap_reached(&mut self, phase: &str) {
        self.report.iteration_cap_reached = true;
        tracing::debug!(target: "cantons::repair", phase, "phase iteration cap reached");
    }

    fn has_left(&self, cell: usize, region: usize) -> bool {
        self.left
            .get(&cell)
            .is_some_and(|regions| regions.contains(&region))
    }

    /// Edges from `cell` into every other region it touches
    fn neighbor_regions(
        &self,
        cell: usize,
        from: usize,
        owners: &[Option<usize>],
    ) -> BTreeMap<usize, usize> {
        let mut shared = BTreeMap::new();
        for n in self.topology.neighbors(cell) {
            if let Some(owner) = owners[n].filter(|&o| o != from) {
                *shared.entry(owner).or_insert(0) += 1;
            }
        }
        shared
    }

    fn same_region_neighbors(&self, cell: usize, region: usize, owners: &[Option<usize>]) -> usize {
        self.topology
            .neighbors(cell)
            .filter(|&n| owners[n] == Some(region))
            .count()
    }

    fn resolve_overlaps(&mut self, assignment: &mut Assignment) {
        let capital_region = assignment.capital_region();
        let territory = self.territory;

        for region in assignment.regions_mut() {
            let before = region.len();
            region.retain(|&cell| territory.contains(cell));
            self.report.foreign_removed += before - region.len();
        }

        let mut claims: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, region) in assignment.regions().iter().enumerate() {
            for &cell in region {
                claims.entry(cell).or_default().push(index);
            }
        }

        for (cell, claimants) in claims.into_iter().filter(|(_, c)| c.len() > 1) {
            let regions = assignment.regions_mut();
            let winner = if claimants.contains(&capital_region) {
                capital_region
            } else {
                claimants
                    .iter()
                    .copied()
                    .max_by_key(|&r| (regions[r].len(), Reverse(r)))
                    .unwrap_or(claimants[0])
            };
            for &loser in claimants.iter().filter(|&&r| r != winner) {
                regions[loser].remove(&cell);
            }
            self.report.overlaps_resolved += 1;
        }

        let capital = territory.capital();
        if capital_region < assignment.region_count()
            && !assignment.region(capital_region).contains(&capital)
        {
            for region in assignment.regions_mut() {
                region.remove(&capital);
            }
            assignment.regions_mut()[capital_region].insert(capital);
            self.report.capital_restored += 1;
        }
    }

    /// Multi-source BFS from every owned cell: each uncovered cell joins the
    /// nearest canton. Cells no canton can reach go to the capital canton.
    fn fill_gaps(&mut self, assignment: &mut Assignment) {
        let mut owners = assignment.owners(self.topology.cell_count());
        let mut queue: VecDeque<usize> = self
            .territory
            .cells()
            .iter()
            .copied()
            .filter(|&c| owners[c].is_some())
            .collect();

        while let Some(cell) = queue.pop_front() {
            let Some(region) = owners[cell] else {
                continue;
            };
            for n in self.topology.neighbors(cell) {
                if self.territory.contains(n) && owners[n].is_none() {
                    owners[n] = Some(region);
                    assignment.regions_mut()[region].insert(n);
                    self.report.gaps_filled += 1;
                    queue.push_back(n);
                }
            }
        }

        let capital_region = assignment.capital_region();
        for &cell in self.territory.cells() {
            if owners[cell].is_none() && capital_region < assignment.region_count() {
                owners[cell] = Some(capital_region);
                assignment.regions_mut()[capital_region].insert(cell);
                self.report.gaps_filled += 1;
            }
        }
    }

    /// Keep one component per canton and hand the others to the neighbor
    /// sharing the most boundary edges (ties: larger neighbor, lower index).
    fn resolve_components(&mut self, assignment: &mut Assignment) {
        let capital = self.territory.capital();
        let mut iterations = 0;

        loop {
            let mut changed = false;
            for region in 0..assignment.region_count() {
                let parts = components(self.topology, assignment.region(region));
                if parts.len() <= 1 {
                    continue;
                }
                if iterations >= self.config.phase_iteration_cap {
                    self.cap_reached("components");
                    return;
                }
                iterations += 1;

                let capital_part = (region == assignment.capital_region())
                    .then(|| parts.iter().position(|p| p.contains(&capital)))
                    .flatten();
                let keep = capital_part.unwrap_or_else(|| {
                    (0..parts.len())
                        .max_by_key(|&i| (parts[i].len(), Reverse(i)))
                        .unwrap_or(0)
                });

                let mut owners = assignment.owners(self.topology.cell_count());
                for (i, part) in parts.iter().enumerate().filter(|(i, _)| *i != keep) {
                    let mut shared: BTreeMap<usize, usize> = BTreeMap::new();
                    for &cell in part {
                        for (owner, edges) in self.neighbor_regions(cell, region, &owners) {
                            *shared.entry(owner).or_insert(0) += edges;
                        }
                    }
                    let target = shared
                        .iter()
                        .max_by_key(|(&owner, &edges)| {
                            (edges, assignment.region(owner).len(), Reverse(owner))
                        })
                        .map(|(&owner, _)| owner);

                    let Some(target) = target else {
                        tracing::trace!(
                            target: "cantons::repair",
                            region,
                            component = i,
                            "isolated component has no neighboring canton"
                        );
                        continue;
                    };
                    for &cell in part {
                        assignment.transfer(cell, region, target, &mut owners);
                    }
                    self.report.components_resolved += 1;
                    self.report.fragments_absorbed += part.len();
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Absorb cells whose in-territory neighbors all belong to one other
    /// canton. The capital cell and a canton's last cell stay put.
    fn fill_holes(&mut self, assignment: &mut Assignment) {
        let mut owners = assignment.owners(self.topology.cell_count());
        let capital = self.territory.capital();
        let mut moves = 0;

        loop {
            let mut changed = false;
            for &cell in self.territory.cells() {
                let Some(own) = owners[cell] else {
                    continue;
                };
                if cell == capital || assignment.region(own).len() <= 1 {
                    continue;
                }

                let mut enclosing = None;
                let mut enclosed = true;
                for n in self.topology.neighbors(cell) {
                    if !self.territory.contains(n) {
                        continue;
                    }
                    match (owners[n], enclosing) {
                        (Some(o), None) => enclosing = Some(o),
                        (Some(o), Some(e)) if o == e => {}
                        _ => {
                            enclosed = false;
                            break;
                        }
                    }
                }
                let Some(target) = enclosing.filter(|&e| enclosed && e != own) else {
                    continue;
                };

                if moves >= self.config.phase_iteration_cap {
                    self.cap_reached("holes");
                    return;
                }
                assignment.transfer(cell, own, target, &mut owners);
                self.report.holes_filled += 1;
                moves += 1;
                changed = true;
            }
            if !changed {
                break;
            }
        }
    }

    /// Hand dead-end cells (at most one same-canton neighbor) of cantons
    /// above the minimum area to the neighbor sharing the most edges, when
    /// that neighbor shares more edges with the cell than its own canton.
    fn trim_tendrils(&mut self, assignment: &mut Assignment) {
        let mut owners = assignment.owners(self.topology.cell_count());
        let capital = self.territory.capital();
        let min_area = self.config.min_canton_area;
        let mut moves = 0;

        loop {
            let mut changed = false;
            for &cell in self.territory.cells() {
                let Some(region) = owners[cell] else {
                    continue;
                };
                if cell == capital && region == assignment.capital_region() {
                    continue;
                }
                let same = self.same_region_neighbors(cell, region, &owners);
                if assignment.region(region).len() <= min_area || same > 1 {
                    continue;
                }

                // only a cell reaching further into a neighbor than into its own canton
                let target = self
                    .neighbor_regions(cell, region, &owners)
                    .into_iter()
                    .filter(|&(owner, edges)| edges > same && !self.has_left(cell, owner))
                    .max_by_key(|&(owner, edges)| {
                        (edges, assignment.region(owner).len(), Reverse(owner))
                    })
                    .map(|(owner, _)| owner);
                let Some(target) = target else {
                    continue;
                };

                if moves >= self.config.phase_iteration_cap {
                    self.cap_reached("tendrils");
                    return;
                }
                assignment.transfer(cell, region, target, &mut owners);
                self.left.entry(cell).or_default().insert(region);
                self.report.tendrils_trimmed += 1;
                moves += 1;
                changed = true;
            }
            if !changed {
                break;
            }
        }
    }

    /// Pull cells into cantons below the minimum area, one per canton per
    /// sweep, from the largest adjacent donor that stays connected. Without
    /// such a donor the cell is shifted along a chain of cantons from the
    /// nearest one above the minimum area.
    fn expand_small(&mut self, assignment: &mut Assignment) {
        let mut owners = assignment.owners(self.topology.cell_count());
        let min_area = self.config.min_canton_area;
        let mut iterations = 0;

        loop {
            let mut changed = false;
            for region in 0..assignment.region_count() {
                if assignment.region(region).len() >= min_area {
                    continue;
                }
                if iterations >= self.config.phase_iteration_cap {
                    self.cap_reached("small cantons");
                    return;
                }
                iterations += 1;

                if assignment.region(region).is_empty() {
                    if let Some((cell, donor)) = self.reseed_candidate(assignment) {
                        assignment.transfer(cell, donor, region, &mut owners);
                        self.report.cantons_reseeded += 1;
                        changed = true;
                    }
                    continue;
                }

                if let Some((cell, donor)) = self.pull_candidate(assignment, region, &owners) {
                    assignment.transfer(cell, donor, region, &mut owners);
                    self.report.small_cantons_expanded += 1;
                    changed = true;
                } else if let Some(moves) = self.donor_chain(assignment, region, &owners) {
                    tracing::trace!(
                        target: "cantons::repair",
                        region,
                        hops = moves.len(),
                        "shifted a cell along a donor chain"
                    );
                    for (cell, from, to) in moves {
                        assignment.transfer(cell, from, to, &mut owners);
                    }
                    self.report.small_cantons_expanded += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn pull_candidate(
        &self,
        assignment: &Assignment,
        region: usize,
        owners: &[Option<usize>],
    ) -> Option<(usize, usize)> {
        let size = assignment.region(region).len();
        let min_area = self.config.min_canton_area;

        let mut donors: Vec<usize> = self
            .adjacent_regions(assignment, region, owners)
            .into_iter()
            .collect();
        donors.sort_by_key(|&d| (Reverse(assignment.region(d).len()), d));

        donors.into_iter().find_map(|donor| {
            let donor_size = assignment.region(donor).len();
            if donor_size <= 1 || (donor_size <= min_area && donor_size <= size + 1) {
                return None;
            }
            self.handover_cell(assignment, donor, region, owners)
                .map(|cell| (cell, donor))
        })
    }

    /// Cantons sharing an edge with `region`
    fn adjacent_regions(
        &self,
        assignment: &Assignment,
        region: usize,
        owners: &[Option<usize>],
    ) -> BTreeSet<usize> {
        assignment
            .region(region)
            .iter()
            .flat_map(|&cell| self.topology.neighbors(cell))
            .filter_map(|n| owners[n])
            .filter(|&owner| owner != region)
            .collect()
    }

    /// Cell of `giver` that can move to `receiver`
    ///
    /// It must touch `receiver`, must not be the capital and must leave
    /// `giver` connected. Cells with more edges into `receiver` win, then
    /// the lowest id.
    fn handover_cell(
        &self,
        assignment: &Assignment,
        giver: usize,
        receiver: usize,
        owners: &[Option<usize>],
    ) -> Option<usize> {
        let capital = self.territory.capital();
        let cells = assignment.region(giver);

        let mut border: Vec<(usize, usize)> = cells
            .iter()
            .copied()
            .filter(|&cell| cell != capital)
            .map(|cell| {
                let edges = self
                    .topology
                    .neighbors(cell)
                    .filter(|&n| owners[n] == Some(receiver))
                    .count();
                (cell, edges)
            })
            .filter(|&(_, edges)| edges > 0)
            .collect();
        border.sort_by_key(|&(cell, edges)| (Reverse(edges), cell));

        border
            .into_iter()
            .map(|(cell, _)| cell)
            .find(|&cell| stays_connected(self.topology, cells, cell))
    }

    /// Moves that hand `region` one cell through a chain of adjacent
    /// cantons, starting at the nearest canton above the minimum area
    ///
    /// Every intermediate canton gains a cell before giving one away, so
    /// only the two ends of the chain change size. The moves are checked
    /// on a scratch copy; `None` when no chain works.
    fn donor_chain(
        &self,
        assignment: &Assignment,
        region: usize,
        owners: &[Option<usize>],
    ) -> Option<Vec<(usize, usize, usize)>> {
        let min_area = self.config.min_canton_area;
        let mut parent: Vec<Option<usize>> = vec![None; assignment.region_count()];
        let mut visited = vec![false; assignment.region_count()];
        visited[region] = true;
        let mut queue = VecDeque::from([region]);

        while let Some(receiver) = queue.pop_front() {
            for giver in self.adjacent_regions(assignment, receiver, owners) {
                if visited[giver]
                    || self
                        .handover_cell(assignment, giver, receiver, owners)
                        .is_none()
                {
                    continue;
                }
                visited[giver] = true;
                parent[giver] = Some(receiver);
                if assignment.region(giver).len() > min_area {
                    return self.run_chain(assignment, giver, &parent, owners);
                }
                queue.push_back(giver);
            }
        }
        None
    }

    fn run_chain(
        &self,
        assignment: &Assignment,
        donor: usize,
        parent: &[Option<usize>],
        owners: &[Option<usize>],
    ) -> Option<Vec<(usize, usize, usize)>> {
        let mut scratch = assignment.clone();
        let mut scratch_owners = owners.to_vec();
        let mut moves = Vec::new();

        let mut giver = donor;
        while let Some(receiver) = parent[giver] {
            let cell = self.handover_cell(&scratch, giver, receiver, &scratch_owners)?;
            scratch.transfer(cell, giver, receiver, &mut scratch_owners);
            moves.push((cell, giver, receiver));
            giver = receiver;
        }
        Some(moves)
    }

    /// Smallest removable cell of the largest canton
    fn reseed_candidate(&self, assignment: &Assignment) -> Option<(usize, usize)> {
        let capital = self.territory.capital();
        let mut donors: Vec<usize> = (0..assignment.region_count())
            .filter(|&r| assignment.region(r).len() > 1)
            .collect();
        donors.sort_by_key(|&d| (Reverse(assignment.region(d).len()), d));

        donors.into_iter().find_map(|donor| {
            assignment
                .region(donor)
                .iter()
                .copied()
                .find(|&cell| {
                    cell != capital
                        && stays_connected(self.topology, assignment.region(donor), cell)
                })
                .map(|cell| (cell, donor))
        })
    }

    /// Peel boundary cells off ragged cantons, then top up any canton the
    /// peel pushed below the minimum area. Ragged cantons without a legal
    /// peel end the phase as if its cap were spent.
    fn improve_compactness(&mut self, assignment: &mut Assignment) {
        let threshold = self.config.compactness_threshold;
        let min_area = self.config.min_canton_area;
        let mut iterations = 0;
        let mut stalled = 0;

        loop {
            let mut changed = false;
            for region in 0..assignment.region_count() {
                let size = assignment.region(region).len();
                if size <= min_area {
                    continue;
                }
                let p = perimeter(self.topology, assignment.region(region));
                if compactness(p, size) <= threshold {
                    continue;
                }
                if iterations >= self.config.phase_iteration_cap {
                    self.cap_reached("compactness");
                    return;
                }
                iterations += 1;

                let mut owners = assignment.owners(self.topology.cell_count());
                if let Some((cell, target)) = self.peel_candidate(assignment, region, p, &owners) {
                    assignment.transfer(cell, region, target, &mut owners);
                    self.left.entry(cell).or_default().insert(region);
                    self.report.compactness_moves += 1;
                    changed = true;
                    self.expand_small(assignment);
                } else {
                    stalled += 1;
                }
            }
            if !changed {
                break;
            }
            stalled = 0;
        }

        if stalled > 0 {
            self.report.iteration_cap_reached = true;
            tracing::debug!(
                target: "cantons::repair",
                cantons = stalled,
                "no legal peel left for ragged cantons"
            );
        }
    }

    /// Boundary cell whose removal does not raise the canton's compactness
    /// and keeps it connected, preferring cells with the fewest same-canton
    /// neighbors. The target is the neighbor sharing the most edges with
    /// the cell (ties: smaller neighbor, lower index).
    fn peel_candidate(
        &self,
        assignment: &Assignment,
        region: usize,
        current_perimeter: usize,
        owners: &[Option<usize>],
    ) -> Option<(usize, usize)> {
        let cells = assignment.region(region);
        let size = cells.len();
        let current = compactness(current_perimeter, size);
        let capital = self.territory.capital();

        let mut boundary: Vec<(usize, usize)> = cells
            .iter()
            .copied()
            .filter(|&cell| cell != capital)
            .filter(|&cell| {
                self.topology
                    .neighbors(cell)
                    .any(|n| owners[n].is_some_and(|o| o != region))
            })
            .map(|cell| (cell, self.same_region_neighbors(cell, region, owners)))
            .collect();
        boundary.sort_by_key(|&(cell, same)| (same, cell));

        for (cell, same) in boundary {
            let slots = self.topology.raw_neighbors(cell).len();
            let peeled = current_perimeter + same - (slots - same);
            if compactness(peeled, size - 1) > current {
                continue;
            }
            if !stays_connected(self.topology, cells, cell) {
                continue;
            }
            let target = self
                .neighbor_regions(cell, region, owners)
                .into_iter()
                .filter(|&(owner, _)| !self.has_left(cell, owner))
                .max_by_key(|&(owner, edges)| {
                    (edges, Reverse(assignment.region(owner).len()), Reverse(owner))
                })
                .map(|(owner, _)| owner);
            if let Some(target) = target {
                return Some((cell, target));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartitionConfigBuilder;
    use crate::partition::validate_assignment;
    use crate::territory::NationTerritory;

    fn full(topology: &MeshTopology, capital: usize) -> TerritoryIndex {
        NationTerritory::new("n", (0..topology.cell_count()).collect(), capital)
            .index(topology)
            .unwrap()
    }

    fn config(min_area: usize) -> PartitionConfig {
        PartitionConfigBuilder::new()
            .min_canton_area(min_area)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_overlaps_prefer_capital_then_larger() {
        let topology = MeshTopology::grid(7, 1);
        let territory = full(&topology, 0);
        let mut assignment = Assignment::new(
            vec![
                BTreeSet::from([0, 1, 2]),
                BTreeSet::from([2, 3, 4]),
                BTreeSet::from([4, 5, 6]),
            ],
            0,
        );
        let report = repair(&topology, &territory, &mut assignment, &config(1));

        assert_eq!(report.overlaps_resolved, 2);
        // capital canton keeps 2, the larger canton 2 keeps 4
        assert!(assignment.region(0).contains(&2));
        assert!(assignment.region(2).contains(&4));
        assert_eq!(assignment.region(1), &BTreeSet::from([3]));
        let audit = validate_assignment(&topology, &territory, &assignment, &config(1));
        assert!(audit.is_structurally_sound());
    }

    #[test]
    fn test_foreign_cells_stripped_and_capital_restored() {
        let topology = MeshTopology::grid(6, 1);
        let territory = NationTerritory::new("n", vec![0, 1, 2, 3, 4], 1)
            .index(&topology)
            .unwrap();
        let mut assignment = Assignment::new(
            vec![BTreeSet::from([0, 2]), BTreeSet::from([1, 3, 4, 5])],
            0,
        );
        let report = repair(&topology, &territory, &mut assignment, &config(1));

        assert_eq!(report.foreign_removed, 1);
        assert_eq!(report.capital_restored, 1);
        let audit = validate_assignment(&topology, &territory, &assignment, &config(1));
        assert!(audit.is_valid());
        assert!(assignment.region(0).contains(&1));
    }

    #[test]
    fn test_gaps_join_nearest_canton() {
        let topology = MeshTopology::grid(7, 1);
        let territory = full(&topology, 0);
        let mut assignment =
            Assignment::new(vec![BTreeSet::from([0, 1]), BTreeSet::from([5, 6])], 0);
        let report = repair(&topology, &territory, &mut assignment, &config(1));

        assert_eq!(report.gaps_filled, 3);
        assert!(assignment.region(0).contains(&2));
        assert!(assignment.region(1).contains(&4));
        assert_eq!(assignment.claimed(), 7);
    }

    #[test]
    fn test_unreachable_gap_goes_to_capital() {
        // cell 3 is foreign; nothing claims the island {4}
        let topology = MeshTopology::grid(5, 1);
        let territory = NationTerritory::new("n", vec![0, 1, 2, 4], 0)
            .index(&topology)
            .unwrap();
        let mut assignment = Assignment::new(vec![BTreeSet::from([0]), BTreeSet::from([1, 2])], 0);
        repair(&topology, &territory, &mut assignment, &config(1));

        assert!(assignment.region(0).contains(&4));
    }

    #[test]
    fn test_stray_component_moves_to_neighbor() {
        let topology = MeshTopology::grid(3, 3);
        let territory = full(&topology, 0);
        // region 1 owns the isolated corner 8 besides its column
        let mut assignment = Assignment::new(
            vec![
                BTreeSet::from([0, 1, 3, 4, 6, 7]),
                BTreeSet::from([2, 8]),
                BTreeSet::from([5]),
            ],
            0,
        );
        let report = repair(&topology, &territory, &mut assignment, &config(1));

        assert!(report.components_resolved >= 1);
        let audit = validate_assignment(&topology, &territory, &assignment, &config(1));
        assert!(audit.is_valid());
    }

    #[test]
    fn test_tendril_trimmed_into_surrounding_canton() {
        // region 0: columns 0-1 plus the tendril cell 12 at (2, 2)
        let topology = MeshTopology::grid(5, 5);
        let territory = full(&topology, 0);
        let mut left: BTreeSet<usize> = (0..25).filter(|c| c % 5 < 2).collect();
        left.insert(12);
        let right: BTreeSet<usize> = (0..25).filter(|c| !left.contains(c)).collect();
        let mut assignment = Assignment::new(vec![left, right], 0);

        let report = repair(&topology, &territory, &mut assignment, &config(2));

        assert_eq!(report.tendrils_trimmed, 1);
        assert!(assignment.region(1).contains(&12));
        assert_eq!(components(&topology, assignment.region(0)).len(), 1);
        assert_eq!(components(&topology, assignment.region(1)).len(), 1);
        assert!(report.converged);
    }

    #[test]
    fn test_small_canton_pulls_from_largest_neighbor() {
        let topology = MeshTopology::grid(4, 3);
        let territory = full(&topology, 0);
        let region0: BTreeSet<usize> = (0..12).filter(|&c| c != 11).collect();
        let mut assignment = Assignment::new(vec![region0, BTreeSet::from([11])], 0);
        let report = repair(&topology, &territory, &mut assignment, &config(3));

        assert!(report.small_cantons_expanded >= 2);
        assert!(assignment.region(1).len() >= 3);
        let audit = validate_assignment(&topology, &territory, &assignment, &config(3));
        assert!(audit.is_valid());
    }

    #[test]
    fn test_small_canton_fed_through_donor_chain() {
        // the only neighbor of {5} sits exactly at the minimum area
        let topology = MeshTopology::grid(6, 1);
        let territory = full(&topology, 0);
        let mut assignment = Assignment::new(
            vec![
                BTreeSet::from([0, 1, 2]),
                BTreeSet::from([3, 4]),
                BTreeSet::from([5]),
            ],
            0,
        );
        let report = repair(&topology, &territory, &mut assignment, &config(2));

        assert_eq!(report.small_cantons_expanded, 1);
        assert_eq!(assignment.region(0), &BTreeSet::from([0, 1]));
        assert_eq!(assignment.region(1), &BTreeSet::from([2, 3]));
        assert_eq!(assignment.region(2), &BTreeSet::from([4, 5]));
        assert_eq!(report.undersized_remaining, 0);
        assert!(report.converged);
    }

    #[test]
    fn test_undersized_canton_without_donor_is_counted() {
        let topology = MeshTopology::grid(3, 1);
        let territory = full(&topology, 0);
        let mut assignment = Assignment::new(vec![BTreeSet::from([0, 1]), BTreeSet::from([2])], 0);
        let report = repair(&topology, &territory, &mut assignment, &config(2));

        assert_eq!(report.small_cantons_expanded, 0);
        assert_eq!(report.undersized_remaining, 1);
        assert_eq!(assignment.region(1), &BTreeSet::from([2]));
        assert!(report.converged);
    }

    #[test]
    fn test_empty_canton_reseeded() {
        let topology = MeshTopology::grid(4, 2);
        let territory = full(&topology, 0);
        let mut assignment = Assignment::new(vec![(0..8).collect(), BTreeSet::new()], 0);
        let report = repair(&topology, &territory, &mut assignment, &config(2));

        assert_eq!(report.cantons_reseeded, 1);
        assert!(assignment.region(1).len() >= 2);
        assert!(assignment.region(0).contains(&0));
    }

    #[test]
    fn test_compactness_improves_strip() {
        // an L-shaped sprawl: region 0 is the top row plus the right column
        let topology = MeshTopology::grid(6, 6);
        let territory = full(&topology, 0);
        let sprawl: BTreeSet<usize> = (0..36).filter(|c| c / 6 == 0 || c % 6 == 5).collect();
        let rest: BTreeSet<usize> = (0..36).filter(|c| !sprawl.contains(c)).collect();
        let mut assignment = Assignment::new(vec![sprawl, rest], 0);

        let cfg = PartitionConfigBuilder::new()
            .min_canton_area(4)
            .unwrap()
            .compactness_threshold(2.0)
            .unwrap()
            .build()
            .unwrap();
        let before = validate_assignment(&topology, &territory, &assignment, &cfg);
        let report = repair(&topology, &territory, &mut assignment, &cfg);
        let after = validate_assignment(&topology, &territory, &assignment, &cfg);

        assert!(report.compactness_moves > 0);
        assert!(after.metrics[0].compactness < before.metrics[0].compactness);
        assert!(after.is_valid());
        assert!(assignment.region(0).contains(&0));
    }

    #[test]
    fn test_ragged_canton_without_peel_is_reported() {
        // region 1 is the top row; region 0 a 3x2 block under its middle,
        // so every cell region 1 could give away is a cut cell
        let topology = MeshTopology::grid(7, 3);
        let cells = vec![0, 1, 2, 3, 4, 5, 6, 9, 10, 11, 16, 17, 18];
        let territory = NationTerritory::new("n", cells, 9).index(&topology).unwrap();
        let block = BTreeSet::from([9, 10, 11, 16, 17, 18]);
        let row: BTreeSet<usize> = (0..7).collect();
        let mut assignment = Assignment::new(vec![block.clone(), row.clone()], 0);

        let cfg = PartitionConfigBuilder::new()
            .min_canton_area(1)
            .unwrap()
            .compactness_threshold(2.5)
            .unwrap()
            .build()
            .unwrap();
        let report = repair(&topology, &territory, &mut assignment, &cfg);

        assert_eq!(report.compactness_moves, 0);
        assert_eq!(report.ragged_remaining, 1);
        assert!(report.iteration_cap_reached);
        assert!(report.converged);
        assert_eq!(assignment.region(0), &block);
        assert_eq!(assignment.region(1), &row);
    }

    #[test]
    fn test_pass_limit_is_reported() {
        let topology = MeshTopology::grid(6, 1);
        let territory = full(&topology, 0);
        let mut assignment = Assignment::new(vec![BTreeSet::from([0]), BTreeSet::from([5])], 0);
        let cfg = PartitionConfigBuilder::new()
            .min_canton_area(1)
            .unwrap()
            .max_repair_passes(1)
            .unwrap()
            .build()
            .unwrap();
        let report = repair(&topology, &territory, &mut assignment, &cfg);

        assert_eq!(report.passes, 1);
        assert!(!report.converged);
        assert!(report.iteration_cap_reached);
        assert_eq!(assignment.claimed(), 6);
    }
}
