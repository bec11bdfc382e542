//! Terrain codes and water classification
//!
//! The mesh collaborator hands over raw `u8` terrain codes per cell. This
//! module names the codes the crate understands out of the box and holds the
//! set of codes that count as water for coastal detection.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Basic terrain types and their interchange codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum BasicTerrainType {
    /// Deep water
    Ocean = 0,
    /// Inland water
    Lake = 1,
    /// Beaches and tidal flats
    Beach = 2,
    /// Grassland and farmland
    #[default]
    Plains = 3,
    Forest = 4,
    Hills = 5,
    Mountain = 6,
    Desert = 7,
    Tundra = 8,
}

impl BasicTerrainType {
    pub const ALL: [BasicTerrainType; 9] = [
        BasicTerrainType::Ocean,
        BasicTerrainType::Lake,
        BasicTerrainType::Beach,
        BasicTerrainType::Plains,
        BasicTerrainType::Forest,
        BasicTerrainType::Hills,
        BasicTerrainType::Mountain,
        BasicTerrainType::Desert,
        BasicTerrainType::Tundra,
    ];

    /// Interchange code of this terrain type
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a raw terrain code, `None` for codes outside the basic set
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Check if this terrain is water
    pub fn is_water(&self) -> bool {
        matches!(self, BasicTerrainType::Ocean | BasicTerrainType::Lake)
    }

    /// Check if this terrain is land
    pub fn is_land(&self) -> bool {
        !self.is_water()
    }
}

/// Set of terrain codes treated as water
///
/// Stored as a 256-bit mask so it stays `Copy` inside `PartitionConfig`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterCodes {
    bits: [u64; 4],
}

impl WaterCodes {
    /// An empty set: no cell is ever coastal
    pub const fn none() -> Self {
        Self { bits: [0; 4] }
    }

    /// Build a set from raw codes
    pub fn from_codes(codes: &[u8]) -> Self {
        codes.iter().fold(Self::none(), |set, &code| set.with(code))
    }

    /// Return a copy of this set that also contains `code`
    pub fn with(mut self, code: u8) -> Self {
        self.bits[(code >> 6) as usize] |= 1u64 << (code & 63);
        self
    }

    #[inline]
    pub fn contains(&self, code: u8) -> bool {
        self.bits[(code >> 6) as usize] & (1u64 << (code & 63)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&word| word == 0)
    }
}

impl Default for WaterCodes {
    /// The water codes of [`BasicTerrainType`]
    fn default() -> Self {
        BasicTerrainType::ALL
            .iter()
            .filter(|t| t.is_water())
            .fold(Self::none(), |set, t| set.with(t.code()))
    }
}
