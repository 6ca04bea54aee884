//! Error types for sheetwalk-core

use std::fmt;

use thiserror::Error;

use crate::cell::CellAddress;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Which level of the store a failed cell lookup stopped at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    /// The worksheet itself does not exist
    Worksheet(String),
    /// The worksheet exists but has no cells in this column
    Column(String),
    /// The column exists but has no cell in this row
    Row(i64),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Worksheet(name) => write!(f, "worksheet '{}' is not found", name),
            Missing::Column(name) => write!(f, "column {} not found in worksheet", name),
            Missing::Row(row) => write!(f, "row {} not found in column", row),
        }
    }
}

/// Errors that can occur in sheetwalk-core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid cell address or column name
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Lookup of a cell that the store does not hold
    #[error("Cell {address} not found: {missing}")]
    CellNotFound { address: CellAddress, missing: Missing },

    /// Name that is neither a named cell nor a named range
    #[error("Unknown name: {name}")]
    UnknownName { name: String },

    /// Named cell declared for more than one address
    #[error("Name {name} refers to {count} cells, expected exactly one")]
    AmbiguousName { name: String, count: usize },
}
