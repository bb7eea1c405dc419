//! Error types for the covering-index engine.

use crate::compute::covering::CellScope;
use geocell_types::config::StrategyKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeocellError>;

#[derive(Debug, Error)]
pub enum GeocellError {
    /// The feature source could not be opened or read.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// A persisted snapshot does not have the expected shape. The index has
    /// to be rebuilt.
    #[error("Invalid snapshot format: {0}")]
    Format(String),

    #[error("No {0} index has been built or loaded")]
    NotBuilt(StrategyKind),

    #[error("Cell scope mismatch: index is {expected}, query assumed {found}")]
    ResolutionMismatch { expected: CellScope, found: CellScope },

    #[error("Resolution {resolution} is outside {min}..={max} for the {kind} strategy")]
    InvalidResolution {
        kind: StrategyKind,
        resolution: u8,
        min: u8,
        max: u8,
    },

    #[error("Covering needs {cells} cells, limit is {limit}")]
    CoveringTooLarge { cells: usize, limit: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for GeocellError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => GeocellError::Io(io),
            other => GeocellError::Serialization(other.to_string()),
        }
    }
}
