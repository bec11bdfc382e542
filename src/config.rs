//! Partition Configuration and Builder
//!
//! This module provides the economic archetype presets and the validated
//! configuration consumed by the canton partitioning pipeline.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PartitionError, Result};
use crate::terrain::WaterCodes;

/// Canton count band of an economic archetype
///
/// The target canton count is `area / target_area`, clamped into
/// `[min_count, max_count]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CantonBand {
    /// Fewest cantons a nation of this archetype is split into
    pub min_count: usize,
    /// Most cantons a nation of this archetype is split into
    pub max_count: usize,
    /// Cells per canton the archetype aims for
    pub target_area: usize,
}

/// Economic archetype presets
///
/// Each archetype maps to a [`CantonBand`]. Dense economies get many small
/// cantons, sparse ones a few large cantons.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EconomicArchetype {
    /// Farming economy: 2-8 cantons of ~40 cells
    #[default]
    Agrarian,
    /// Trading economy: 3-10 cantons of ~30 cells
    Mercantile,
    /// Industrial economy: 4-12 cantons of ~24 cells
    Industrial,
    /// Sparse frontier: 1-4 cantons of ~80 cells
    Frontier,
    /// Custom band
    Custom {
        min_count: usize,
        max_count: usize,
        target_area: usize,
    },
}

impl EconomicArchetype {
    /// Get the canton count band for this archetype
    pub fn band(self) -> CantonBand {
        let (min_count, max_count, target_area) = match self {
            EconomicArchetype::Agrarian => (2, 8, 40),
            EconomicArchetype::Mercantile => (3, 10, 30),
            EconomicArchetype::Industrial => (4, 12, 24),
            EconomicArchetype::Frontier => (1, 4, 80),
            EconomicArchetype::Custom {
                min_count,
                max_count,
                target_area,
            } => (min_count, max_count, target_area),
        };
        CantonBand {
            min_count,
            max_count,
            target_area,
        }
    }

    /// Get a human-readable name for this archetype
    pub fn name(self) -> &'static str {
        match self {
            EconomicArchetype::Agrarian => "Agrarian",
            EconomicArchetype::Mercantile => "Mercantile",
            EconomicArchetype::Industrial => "Industrial",
            EconomicArchetype::Frontier => "Frontier",
            EconomicArchetype::Custom { .. } => "Custom",
        }
    }
}

/// How the seed selector breaks ties between equally distant candidates
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedTieBreak {
    /// Smallest cell id wins
    #[default]
    LowestId,
    /// One draw from the seeded generator picks among the tied cells
    Seeded,
}

/// Configuration for deterministic canton partitioning
///
/// The same configuration, topology and territory always produce the
/// identical partition.
///
/// # Example
///
/// ```rust
/// use canton_partition::*;
///
/// let config = PartitionConfigBuilder::new()
///     .seed_label("alpha")
///     .archetype(EconomicArchetype::Mercantile)
///     .min_canton_area(3)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(config.band().max_count, 10);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionConfig {
    /// Seed of the generator used for seed-selection tie-breaking
    pub seed: u64,

    /// Economic archetype (determines the canton count band)
    pub archetype: EconomicArchetype,

    /// Minimum cells per canton
    ///
    /// Caps the canton count at `area / min_canton_area` and is the floor the
    /// repairer pulls small cantons up to.
    pub min_canton_area: usize,

    /// Explicitly requested canton count
    ///
    /// Replaces the archetype band, but is still clamped down by the
    /// minimum-area floor.
    pub canton_count_override: Option<usize>,

    /// Highest acceptable isoperimetric ratio for cantons above the floor
    ///
    /// - 1.0: a perfect disk
    /// - ~1.27: a square block on a 4-neighbor grid
    /// - 3.0: default, tolerates irregular but not stringy shapes
    pub compactness_threshold: f32,

    /// Iteration cap of each repair phase
    pub phase_iteration_cap: usize,

    /// Maximum number of full repair passes
    pub max_repair_passes: usize,

    /// Reserve one seed for the farthest coastal cell
    pub reserve_coastal_seed: bool,

    /// Tie-breaking rule of the seed selector
    pub tie_break: SeedTieBreak,

    /// Terrain codes treated as water for coastal detection
    pub water_codes: WaterCodes,
}

impl PartitionConfig {
    /// Get the canton count band for this configuration
    #[inline]
    pub fn band(&self) -> CantonBand {
        self.archetype.band()
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            archetype: EconomicArchetype::default(),
            min_canton_area: 4,
            canton_count_override: None,
            compactness_threshold: 3.0,
            phase_iteration_cap: 2000,
            max_repair_passes: 16,
            reserve_coastal_seed: true,
            tie_break: SeedTieBreak::default(),
            water_codes: WaterCodes::default(),
        }
    }
}

/// Hash a textual seed with 64-bit FNV-1a
///
/// Unlike `std`'s hasher this value is stable across platforms and releases,
/// so saved partitions can be rebuilt from a seed label.
pub fn hash_label(label: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    label
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

/// Builder for creating PartitionConfig with validation
///
/// # Example
///
/// ```rust
/// use canton_partition::*;
///
/// let config = PartitionConfigBuilder::new()
///     .seed(7)
///     .canton_count(5)
///     .unwrap()
///     .compactness_threshold(2.5)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(config.canton_count_override, Some(5));
/// ```
#[derive(Debug, Clone)]
pub struct PartitionConfigBuilder {
    config: PartitionConfig,
}

impl PartitionConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - seed: 0
    /// - archetype: Agrarian
    /// - min_canton_area: 4
    /// - compactness_threshold: 3.0
    /// - phase_iteration_cap: 2000
    /// - max_repair_passes: 16
    /// - reserve_coastal_seed: true
    /// - tie_break: LowestId
    /// - water_codes: ocean and lake
    pub fn new() -> Self {
        Self {
            config: PartitionConfig::default(),
        }
    }

    /// Set the generator seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the generator seed from a textual label such as `"alpha"`
    pub fn seed_label(mut self, label: &str) -> Self {
        self.config.seed = hash_label(label);
        self
    }

    /// Set the economic archetype
    pub fn archetype(mut self, archetype: EconomicArchetype) -> Self {
        self.config.archetype = archetype;
        self
    }

    /// Set the minimum canton area
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `area` is 0
    pub fn min_canton_area(mut self, area: usize) -> Result<Self> {
        if area == 0 {
            return Err(PartitionError::InvalidConfig(
                "minimum canton area must be >= 1".to_string(),
            ));
        }
        self.config.min_canton_area = area;
        Ok(self)
    }

    /// Request an explicit canton count
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `count` is 0
    pub fn canton_count(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(PartitionError::InvalidConfig(
                "requested canton count must be >= 1".to_string(),
            ));
        }
        self.config.canton_count_override = Some(count);
        Ok(self)
    }

    /// Set the compactness threshold
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the threshold is below 1.0 (no shape can
    /// beat a disk) or not finite
    pub fn compactness_threshold(mut self, threshold: f32) -> Result<Self> {
        if !threshold.is_finite() || threshold < 1.0 {
            return Err(PartitionError::InvalidConfig(format!(
                "compactness threshold must be a finite value >= 1.0 (got {})",
                threshold
            )));
        }
        self.config.compactness_threshold = threshold;
        Ok(self)
    }

    /// Set the iteration cap of each repair phase
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `cap` is 0
    pub fn phase_iteration_cap(mut self, cap: usize) -> Result<Self> {
        if cap == 0 {
            return Err(PartitionError::InvalidConfig(
                "phase iteration cap must be >= 1".to_string(),
            ));
        }
        self.config.phase_iteration_cap = cap;
        Ok(self)
    }

    /// Set the maximum number of full repair passes
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `passes` is 0
    pub fn max_repair_passes(mut self, passes: usize) -> Result<Self> {
        if passes == 0 {
            return Err(PartitionError::InvalidConfig(
                "repair pass limit must be >= 1".to_string(),
            ));
        }
        self.config.max_repair_passes = passes;
        Ok(self)
    }

    pub fn reserve_coastal_seed(mut self, reserve: bool) -> Self {
        self.config.reserve_coastal_seed = reserve;
        self
    }

    pub fn tie_break(mut self, tie_break: SeedTieBreak) -> Self {
        self.config.tie_break = tie_break;
        self
    }

    pub fn water_codes(mut self, codes: WaterCodes) -> Self {
        self.config.water_codes = codes;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the archetype band is empty or inverted
    pub fn build(self) -> Result<PartitionConfig> {
        let band = self.config.band();
        if band.target_area == 0 {
            return Err(PartitionError::InvalidConfig(
                "archetype target area must be >= 1".to_string(),
            ));
        }
        if band.min_count == 0 || band.min_count > band.max_count {
            return Err(PartitionError::InvalidConfig(format!(
                "archetype canton band [{}, {}] is invalid",
                band.min_count, band.max_count
            )));
        }
        Ok(self.config)
    }
}

impl Default for PartitionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archetype_bands() {
        assert_eq!(EconomicArchetype::Agrarian.band().target_area, 40);
        assert_eq!(EconomicArchetype::Industrial.band().min_count, 4);
        assert_eq!(EconomicArchetype::Frontier.band().max_count, 4);

        let custom = EconomicArchetype::Custom {
            min_count: 2,
            max_count: 3,
            target_area: 10,
        };
        assert_eq!(
            custom.band(),
            CantonBand {
                min_count: 2,
                max_count: 3,
                target_area: 10
            }
        );
        assert_eq!(custom.name(), "Custom");
    }

    #[test]
    fn test_builder_defaults() {
        let config = PartitionConfigBuilder::new().build().unwrap();
        assert_eq!(config, PartitionConfig::default());
        assert_eq!(config.phase_iteration_cap, 2000);
        assert_eq!(config.min_canton_area, 4);
        assert_eq!(config.tie_break, SeedTieBreak::LowestId);
    }

    #[test]
    fn test_seed_label_is_stable() {
        let a = PartitionConfigBuilder::new().seed_label("alpha").build().unwrap();
        let b = PartitionConfigBuilder::new().seed_label("alpha").build().unwrap();
        let c = PartitionConfigBuilder::new().seed_label("beta").build().unwrap();
        assert_eq!(a.seed, b.seed);
        assert_ne!(a.seed, c.seed);
        // FNV-1a of the empty string is the offset basis
        assert_eq!(hash_label(""), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert!(PartitionConfigBuilder::new().min_canton_area(0).is_err());
        assert!(PartitionConfigBuilder::new().canton_count(0).is_err());
        assert!(PartitionConfigBuilder::new().compactness_threshold(0.5).is_err());
        assert!(PartitionConfigBuilder::new()
            .compactness_threshold(f32::NAN)
            .is_err());
        assert!(PartitionConfigBuilder::new().phase_iteration_cap(0).is_err());
        assert!(PartitionConfigBuilder::new().max_repair_passes(0).is_err());
    }

    #[test]
    fn test_builder_rejects_invalid_band() {
        let result = PartitionConfigBuilder::new()
            .archetype(EconomicArchetype::Custom {
                min_count: 5,
                max_count: 2,
                target_area: 10,
            })
            .build();
        assert!(result.is_err());

        let result = PartitionConfigBuilder::new()
            .archetype(EconomicArchetype::Custom {
                min_count: 1,
                max_count: 2,
                target_area: 0,
            })
            .build();
        assert!(result.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = PartitionConfigBuilder::new()
            .seed_label("alpha")
            .archetype(EconomicArchetype::Industrial)
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: PartitionConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, restored);
    }
}
