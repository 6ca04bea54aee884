//! Named ranges and named cells
//!
//! Workbooks carry two kinds of names:
//!
//! - A *named range* maps a name to raw formula text (`=Sheet1!R2C1:R10C1`),
//!   kept unparsed until a formula uses it.
//! - A *named cell* maps a name to the cell(s) that declared it. A name that
//!   was declared more than once accumulates every address, in declaration
//!   order, and can no longer be used as a single-cell reference.
//!
//! Both are looked up case-insensitively, folding ASCII letters only.

use ahash::AHashMap;

use crate::cell::CellAddress;
use crate::error::{Error, Result};

/// A named range definition
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedRange {
    /// The name as declared (e.g., "sectionList")
    pub name: String,
    /// What the name refers to, as formula text
    pub refers_to: String,
}

impl NamedRange {
    /// Create a new named range
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refers_to: refers_to.into(),
        }
    }

    /// `refers_to` with a leading `=`, ready for the formula parser
    pub fn formula_text(&self) -> String {
        if self.refers_to.starts_with('=') {
            self.refers_to.clone()
        } else {
            format!("={}", self.refers_to)
        }
    }
}

/// Named ranges in document order
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedRanges {
    ranges: Vec<NamedRange>,
}

impl NamedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition. Earlier definitions of the same name still win.
    pub fn push(&mut self, range: NamedRange) {
        self.ranges.push(range);
    }

    /// First definition of `name`
    pub fn get(&self, name: &str) -> Option<&NamedRange> {
        self.ranges
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct NamedCellEntry {
    name: String,
    addresses: Vec<CellAddress>,
}

/// Named cells keyed by ASCII lower-cased name
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedCells {
    entries: AHashMap<String, NamedCellEntry>,
}

impl NamedCells {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `address` declares `name`
    pub fn define(&mut self, name: &str, address: CellAddress) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| NamedCellEntry {
                name: name.to_string(),
                addresses: Vec::new(),
            })
            .addresses
            .push(address);
    }

    /// Every address declared for `name`, in declaration order
    pub fn addresses(&self, name: &str) -> Option<&[CellAddress]> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|e| e.addresses.as_slice())
    }

    /// The single address `name` refers to
    pub fn get(&self, name: &str) -> Result<&CellAddress> {
        match self.addresses(name) {
            Some([address]) => Ok(address),
            Some(addresses) if !addresses.is_empty() => Err(Error::AmbiguousName {
                name: name.to_string(),
                count: addresses.len(),
            }),
            _ => Err(Error::UnknownName {
                name: name.to_string(),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Declared names (original spelling), in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
