//! Error types for canton partitioning

use thiserror::Error;

/// Errors raised for malformed input
///
/// Data-shape edge cases (empty territory, fragmented graphs, unrealisable
/// canton counts) never produce an error; they degrade to a best-effort
/// partition instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartitionError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// CSR adjacency, centers or terrain arrays are inconsistent
    #[error("malformed topology: {0}")]
    MalformedTopology(String),
    /// A territory references a cell the mesh does not have
    #[error("cell {cell} out of range (mesh has {cell_count} cells)")]
    CellOutOfRange { cell: usize, cell_count: usize },
    /// The capital cell is not part of the nation's territory
    #[error("capital cell {capital} of nation {nation} is not in its territory")]
    CapitalNotInTerritory { nation: String, capital: usize },
    /// Two territories in one batch share a nation id
    #[error("nation {0} appears more than once")]
    DuplicateNation(String),
}

/// Result type alias for partition operations
pub type Result<T> = std::result::Result<T, PartitionError>;
