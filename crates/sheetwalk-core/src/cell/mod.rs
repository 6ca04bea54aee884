//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (sheet, row, column)
//! - [`Cell`] - The record stored for a cell (formula, content, datatype)
//! - Column-name conversion and relative-offset arithmetic

mod address;
mod value;

pub use address::{apply_offset, column_to_name, name_to_column, CellAddress};
pub use value::{Cell, CellField, DataType, ErrorValue};
