//! Seed selection by graph-distance farthest-point sampling

use rand::Rng;

use super::PartitionContext;
use crate::config::{PartitionConfig, SeedTieBreak};
use crate::territory::TerritoryIndex;
use crate::topology::{MeshTopology, UNREACHED};

/// Choose up to `k` seed cells, capital first
///
/// Each step picks the non-seed territory cell maximizing its hop distance
/// to the nearest existing seed, measured inside the territory. When
/// `reserve_coastal_seed` is set and the capital is inland, the second seed
/// is the coastal cell farthest from the capital. Once no candidate has a
/// finite distance (fragmented territory) the smallest remaining cell id is
/// taken.
///
/// Identical territory, capital, `k`, coastal set and configuration always
/// give the identical list.
pub fn select_seeds(
    topology: &MeshTopology,
    territory: &TerritoryIndex,
    k: usize,
    coastal: &[usize],
    config: &PartitionConfig,
    ctx: &mut PartitionContext,
) -> Vec<usize> {
    let k = k.min(territory.area());
    if k == 0 {
        return Vec::new();
    }

    let capital = territory.capital;
    let mut seeds = vec![capital];
    let mut is_seed = vec![false; topology.cell_count()];
    is_seed[capital] = true;
    let mut dist = vec![UNREACHED; topology.cell_count()];
    topology.relax_hop_distances(capital, &territory.mask, &mut dist);

    let mut coastal: Vec<usize> = coastal
        .iter()
        .copied()
        .filter(|&c| territory.contains(c))
        .collect();
    coastal.sort_unstable();
    coastal.dedup();

    if config.reserve_coastal_seed && k >= 2 && coastal.binary_search(&capital).is_err() {
        let candidates = coastal.iter().copied().filter(|&c| !is_seed[c]);
        if let Some(cell) = farthest(candidates, &dist, config.tie_break, ctx) {
            is_seed[cell] = true;
            seeds.push(cell);
            topology.relax_hop_distances(cell, &territory.mask, &mut dist);
        }
    }

    while seeds.len() < k {
        let candidates = territory.cells.iter().copied().filter(|&c| !is_seed[c]);
        let next = farthest(candidates, &dist, config.tie_break, ctx)
            .or_else(|| territory.cells.iter().copied().find(|&c| !is_seed[c]));
        let Some(cell) = next else {
            break;
        };
        is_seed[cell] = true;
        seeds.push(cell);
        topology.relax_hop_distances(cell, &territory.mask, &mut dist);
    }

    tracing::trace!(target: "cantons::seeds", ?seeds, "selected seeds");
    seeds
}

/// Candidate with the largest finite distance
///
/// `candidates` must be ascending so `LowestId` takes the first of the tied
/// cells. `Seeded` draws once from the context, and only when a candidate
/// exists.
fn farthest(
    candidates: impl Iterator<Item = usize>,
    dist: &[u32],
    tie_break: SeedTieBreak,
    ctx: &mut PartitionContext,
) -> Option<usize> {
    let mut best = 0;
    let mut tied = Vec::new();
    for cell in candidates {
        let d = dist[cell];
        if d == UNREACHED {
            continue;
        }
        if tied.is_empty() || d > best {
            best = d;
            tied.clear();
            tied.push(cell);
        } else if d == best {
            tied.push(cell);
        }
    }

    match tie_break {
        _ if tied.is_empty() => None,
        SeedTieBreak::LowestId => tied.first().copied(),
        SeedTieBreak::Seeded => Some(tied[ctx.rng().gen_range(0..tied.len())]),
    }
}
