//! Canton partitioning of nation territory
//!
//! Splits each nation's territory on a cell mesh into contiguous,
//! reasonably compact and balanced cantons: the sub-national unit of account
//! for production, labor and infrastructure.
//!
//! # Quick Start
//!
//! ```rust
//! use canton_partition::*;
//!
//! // A synthetic 20x10 mesh; real callers build one with `MeshTopology::from_csr`
//! let topology = MeshTopology::grid(20, 10);
//! let territory = NationTerritory::new("alpha", (0..200).collect(), 45);
//!
//! let config = PartitionConfigBuilder::new()
//!     .seed_label("alpha")
//!     .archetype(EconomicArchetype::Mercantile)
//!     .build()
//!     .unwrap();
//!
//! let nation = partition_nation(&topology, &territory, &config).unwrap();
//! for canton in nation.cantons() {
//!     println!("{}: {} cells, coastal: {}", canton.id, canton.area, canton.coastal);
//! }
//! assert!(nation.canton_of(45).unwrap().capital);
//! ```
//!
//! # Pipeline
//!
//! count policy → seed selection → balanced growth → validation → repair →
//! geography annotation. See [`partition`] for the individual stages.
//!
//! # Features
//!
//! - `spatial-index` (default): position-to-canton lookups using a KD-tree
//! - `parallel`: partition many nations concurrently with rayon
//! - `serde`: serialization support for configuration, cantons and reports

// Modules
pub mod canton;
pub mod config;
pub mod error;
pub mod geography;
pub mod nation;
pub mod partition;
pub mod terrain;
pub mod territory;
pub mod topology;

#[cfg(feature = "spatial-index")]
pub mod spatial;

// Re-export core types for convenience
pub use canton::{compactness, Canton, CantonId, GeographyMix};
pub use config::{
    CantonBand, EconomicArchetype, PartitionConfig, PartitionConfigBuilder, SeedTieBreak,
};
pub use error::{PartitionError, Result};
pub use geography::annotate;
pub use nation::{partition_nation, partition_nations, CantonRegistry, NationCantons};
pub use partition::{validate_assignment, Assignment, RepairReport, ValidationReport};
pub use terrain::{BasicTerrainType, WaterCodes};
pub use territory::{NationTerritory, TerritoryIndex};
pub use topology::{MeshTopology, NO_NEIGHBOR};

#[cfg(feature = "spatial-index")]
pub use spatial::SpatialIndex;

// Re-export glam::Vec2 for convenience
pub use glam::Vec2;
