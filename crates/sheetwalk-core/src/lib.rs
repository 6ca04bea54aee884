//! # sheetwalk-core
//!
//! Core data structures for the sheetwalk formula resolver.
//!
//! This crate provides:
//! - [`CellAddress`] - sheet/row/column addressing and column-name conversion
//! - [`Cell`] - a cell record (formula, literal content, datatype)
//! - [`Workbook`] and [`Worksheet`] - the read-mostly workbook store
//! - [`NamedRange`] and [`NamedCells`] - workbook-level names
//!
//! ## Example
//!
//! ```rust
//! use sheetwalk_core::{CellAddress, CellField, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let a1 = CellAddress::new("Sheet1", 1, 1);
//! workbook.set_cell_field(&a1, CellField::Content, "42");
//! workbook.set_cell_field(&a1, CellField::DataType, "Number");
//!
//! let cell = workbook.get_cell(&a1).unwrap();
//! assert_eq!(cell.content(), Some("42"));
//! ```

pub mod cell;
pub mod error;
pub mod named_range;
pub mod workbook;
pub mod worksheet;

pub use cell::{
    apply_offset, column_to_name, name_to_column, Cell, CellAddress, CellField, DataType,
    ErrorValue,
};
pub use error::{Error, Missing, Result};
pub use named_range::{NamedCells, NamedRange, NamedRanges};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: i64 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: i64 = 16_384;
