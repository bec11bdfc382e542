//! Canton Structure
//!
//! Represents one contiguous sub-region of a nation's territory together with
//! the metadata the economy layer reads from it.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque, stable canton identifier scoped to a nation
///
/// The textual form is a labeling convenience, not a parseable format.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CantonId(String);

impl CantonId {
    /// Label the `index`-th canton of a nation
    ///
    /// The index is zero-padded so lexicographic order of ids matches index
    /// order within a nation.
    pub fn new(nation_id: &str, index: usize) -> Self {
        Self(format!("{}/canton-{:03}", nation_id, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CantonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terrain-type shares of a canton, normalized to 1.0
///
/// Keyed by raw terrain code.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeographyMix {
    pub shares: BTreeMap<u8, f32>,
}

impl GeographyMix {
    /// Share of one terrain code (0.0 if absent)
    pub fn share(&self, code: u8) -> f32 {
        self.shares.get(&code).copied().unwrap_or(0.0)
    }

    /// Most common terrain code, lowest code on ties
    pub fn dominant(&self) -> Option<u8> {
        self.shares
            .iter()
            .fold(None, |best: Option<(u8, f32)>, (&code, &share)| match best {
                Some((_, top)) if top >= share => best,
                _ => Some((code, share)),
            })
            .map(|(code, _)| code)
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

/// A single canton of a nation
///
/// Each canton is:
/// - a connected set of territory cells (best effort on fragmented territory)
/// - the unit of account for production capacity, labor and infrastructure
/// - owned by exactly one nation, with exactly one capital canton per nation
///
/// Cantons are rebuilt from the territory, topology and configuration; the
/// caller persists them as part of game state if needed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Canton {
    /// Stable identifier, scoped to the nation
    pub id: CantonId,

    /// Owning nation
    pub nation_id: String,

    /// Member cell ids, ascending
    pub cells: Vec<usize>,

    /// Cell count
    pub area: usize,

    /// Boundary edge count
    ///
    /// An edge counts when it leads to a map edge or to a cell outside the
    /// canton.
    pub perimeter: usize,

    /// Isoperimetric ratio `perimeter² / (4π · area)`
    ///
    /// 1.0 is disk-like; larger values mean elongated or ragged shapes.
    pub compactness: f32,

    /// Whether any member cell touches water
    pub coastal: bool,

    /// Whether this canton holds the nation's capital cell
    pub capital: bool,

    /// Mean of member cell centers
    pub centroid: Vec2,

    /// Terrain-type shares
    pub geography: GeographyMix,

    /// Cantons of the same nation sharing at least one edge, ascending
    pub neighbors: Vec<CantonId>,
}

impl Canton {
    /// Check if a cell belongs to this canton
    #[inline]
    pub fn contains(&self, cell: usize) -> bool {
        self.cells.binary_search(&cell).is_ok()
    }

    /// Check if another canton borders this one
    #[inline]
    pub fn is_neighbor_of(&self, other: &CantonId) -> bool {
        self.neighbors.contains(other)
    }
}

/// Isoperimetric ratio of a region
///
/// Returns 0.0 for an empty region.
pub fn compactness(perimeter: usize, area: usize) -> f32 {
    if area == 0 {
        return 0.0;
    }
    let perimeter = perimeter as f32;
    perimeter * perimeter / (4.0 * std::f32::consts::PI * area as f32)
}
