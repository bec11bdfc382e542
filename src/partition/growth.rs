//! Balanced multi-frontier region growth

use std::collections::{BTreeSet, VecDeque};

use crate::territory::TerritoryIndex;
use crate::topology::MeshTopology;

/// Split `area` into `k` target sizes as evenly as possible
///
/// The remainder goes to the first regions.
pub fn target_sizes(area: usize, k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }
    let base = area / k;
    let extra = area % k;
    (0..k).map(|i| base + usize::from(i < extra)).collect()
}

/// Grow one region per seed until the territory is covered
///
/// Every region keeps a FIFO frontier. Each step the region with the lowest
/// `size / target` ratio among those with a non-empty frontier (lowest index
/// on ties) claims its next unassigned frontier cell and pushes that cell's
/// unassigned neighbors. When every frontier is exhausted before coverage,
/// the smallest unvisited cell goes to the currently smallest region and
/// growth resumes from it.
pub fn grow_regions(
    topology: &MeshTopology,
    territory: &TerritoryIndex,
    seeds: &[usize],
    targets: &[usize],
) -> Vec<BTreeSet<usize>> {
    let k = seeds.len();
    let mut regions = vec![BTreeSet::new(); k];
    if k == 0 {
        return regions;
    }

    let mut owner: Vec<Option<usize>> = vec![None; topology.cell_count()];
    let mut frontiers: Vec<VecDeque<usize>> = vec![VecDeque::new(); k];
    let mut assigned = 0;

    let claim = |cell: usize,
                 region: usize,
                 owner: &mut Vec<Option<usize>>,
                 regions: &mut Vec<BTreeSet<usize>>,
                 frontiers: &mut Vec<VecDeque<usize>>| {
        owner[cell] = Some(region);
        regions[region].insert(cell);
        for n in topology.neighbors(cell) {
            if territory.contains(n) && owner[n].is_none() {
                frontiers[region].push_back(n);
            }
        }
    };

    for (region, &seed) in seeds.iter().enumerate() {
        if owner[seed].is_none() {
            claim(seed, region, &mut owner, &mut regions, &mut frontiers);
            assigned += 1;
        }
    }

    let target = |region: usize| targets.get(region).copied().unwrap_or(1).max(1);
    let mut next_unvisited = 0;

    while assigned < territory.area() {
        // lowest size/target ratio, compared by cross-multiplication
        let pick = (0..k)
            .filter(|&r| !frontiers[r].is_empty())
            .min_by(|&a, &b| {
                (regions[a].len() * target(b))
                    .cmp(&(regions[b].len() * target(a)))
                    .then(a.cmp(&b))
            });

        match pick {
            Some(region) => {
                while let Some(cell) = frontiers[region].pop_front() {
                    if owner[cell].is_none() {
                        claim(cell, region, &mut owner, &mut regions, &mut frontiers);
                        assigned += 1;
                        break;
                    }
                }
            }
            None => {
                while owner[territory.cells[next_unvisited]].is_some() {
                    next_unvisited += 1;
                }
                let cell = territory.cells[next_unvisited];
                let smallest = (0..k)
                    .min_by_key(|&r| (regions[r].len(), r))
                    .unwrap_or(0);
                tracing::trace!(
                    target: "cantons::growth",
                    cell,
                    region = smallest,
                    "frontiers exhausted, restarting growth"
                );
                claim(cell, smallest, &mut owner, &mut regions, &mut frontiers);
                assigned += 1;
            }
        }
    }

    regions
}
