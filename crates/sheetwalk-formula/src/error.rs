//! Formula error types

use std::fmt;
use std::time::Duration;

use sheetwalk_core::CellAddress;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    /// Build from a min/max pair (`None` = unlimited)
    pub fn from_bounds(min: usize, max: Option<usize>) -> Self {
        match max {
            Some(max) if max == min => Arity::Exact(min),
            Some(max) => Arity::Between(min, max),
            None => Arity::AtLeast(min),
        }
    }

    /// Whether `count` arguments are acceptable
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Between(min, max) => write!(f, "{} to {}", min, max),
        }
    }
}

/// An unrecognised character met while tokenizing.
///
/// Lexing skips the character and carries on, so these are collected rather
/// than returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal character '{character}' at position {position}")]
pub struct LexicalError {
    pub character: char,
    /// Byte offset into the formula text
    pub position: usize,
}

/// Errors that can occur during formula parsing or resolution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Malformed formula
    #[error("Syntax error at position {position}: expected {expected}, found {found}")]
    Syntax {
        position: usize,
        expected: String,
        found: String,
    },

    /// Workbook lookup failure
    #[error(transparent)]
    Workbook(#[from] sheetwalk_core::Error),

    /// Wrong number of arguments
    #[error("{function} takes {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: Arity,
        actual: usize,
    },

    /// No handler registered for the function
    #[error("Unsupported function: {name}")]
    UnsupportedFunction { name: String },

    /// A cell reached itself again along the current path
    #[error("Circular reference: {}", join(.chain, " -> "))]
    CircularReference { chain: Vec<CellAddress> },

    /// A named range whose expansion reaches its own name
    #[error("Circular name: {}", join(.chain, " -> "))]
    CircularName { chain: Vec<String> },

    #[error("Maximum resolution depth of {limit} exceeded")]
    MaxDepthExceeded { limit: usize },

    #[error("Resolution did not finish within {timeout:?}")]
    DeadlineExceeded { timeout: Duration },

    #[error("Range of {cells} cells exceeds the limit of {limit}")]
    RangeTooLarge { cells: u64, limit: usize },

    /// A construct that is recognised but cannot be resolved
    #[error("Unsupported {kind} reference: {reference}")]
    UnsupportedReference { kind: String, reference: String },
}

impl FormulaError {
    pub(crate) fn syntax(position: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        FormulaError::Syntax {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Whether this error is a traversal guard (cycle, depth, deadline, size)
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            FormulaError::CircularReference { .. }
                | FormulaError::CircularName { .. }
                | FormulaError::MaxDepthExceeded { .. }
                | FormulaError::DeadlineExceeded { .. }
                | FormulaError::RangeTooLarge { .. }
        )
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(3).accepts(3));
        assert!(!Arity::Exact(3).accepts(2));
        assert!(Arity::AtLeast(1).accepts(7));
        assert!(!Arity::AtLeast(1).accepts(0));
        assert!(Arity::Between(3, 4).accepts(4));
        assert!(!Arity::Between(3, 4).accepts(5));

        assert_eq!(Arity::from_bounds(2, Some(2)), Arity::Exact(2));
        assert_eq!(Arity::from_bounds(3, Some(4)), Arity::Between(3, 4));
        assert_eq!(Arity::from_bounds(1, None), Arity::AtLeast(1));
    }

    #[test]
    fn test_messages() {
        let err = FormulaError::Arity {
            function: "IF".into(),
            expected: Arity::Exact(3),
            actual: 2,
        };
        assert_eq!(err.to_string(), "IF takes exactly 3 argument(s), got 2");

        let err = FormulaError::CircularReference {
            chain: vec![
                CellAddress::new("S", 1, 1),
                CellAddress::new("S", 2, 1),
                CellAddress::new("S", 1, 1),
            ],
        };
        assert_eq!(err.to_string(), "Circular reference: S!A1 -> S!A2 -> S!A1");
        assert!(err.is_guard());
    }
}
