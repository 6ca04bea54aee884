//! # sheetwalk
//!
//! Resolve spreadsheet formulas down to the literal cells they depend on.
//!
//! Sheetwalk parses formulas written in A1 or R1C1 notation and follows every
//! reference through a workbook: cells, ranges, whole rows and columns, named
//! cells and named ranges. Formula cells met along the way are expanded in
//! turn, so each result is a tree whose leaves are literal cells and
//! constants. Nothing is evaluated.
//!
//! ## Features
//!
//! - A1 and R1C1 references, cross-sheet prefixes, row/column ranges, arrays
//! - Named cells and named ranges
//! - Circular reference, depth, range-size and deadline guards
//! - MAX/MIN expanded into accumulate-and-compare plans
//! - Batch resolution with statistics and a dependency graph
//! - `parallel` feature: batch roots resolved on a rayon pool
//! - `serde` feature: serializable workbook store
//!
//! ## Example
//!
//! ```rust
//! use sheetwalk::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! for row in 5..=15 {
//!     let address = CellAddress::new("Sheet1", row, 2);
//!     workbook.set_literal(&address, &row.to_string(), DataType::Number);
//! }
//! let total = CellAddress::new("Sheet1", 16, 2);
//! workbook.set_formula(&total, "=SUM(R[-11]C:R[-1]C)");
//!
//! let value = workbook.resolve_address(&total).unwrap();
//! let ResolvedValue::Call { function, args } = value else { unreachable!() };
//! assert_eq!(function, "SUM");
//! assert_eq!(args[0].clone().flatten().len(), 11);
//! ```

pub mod prelude;
pub mod resolution;

// Re-export resolution types
pub use resolution::{BatchOptions, BatchReport, ResolutionStats, RootOutcome, WorkbookResolveExt};

// Re-export core types
pub use sheetwalk_core::{
    column_to_name, name_to_column, Cell, CellAddress, CellField, DataType, Error, ErrorValue,
    Missing, NamedCells, NamedRange, NamedRanges, Result, Workbook, Worksheet, MAX_COLS,
    MAX_ROWS,
};

// Re-export formula types
pub use sheetwalk_formula::{
    parse_formula, parse_formula_with_diagnostics, Arity, BinaryOperator, CellRef, Comparison,
    DependencyGraph, Expr, Formula, FormulaError, FormulaResult, FunctionDef, FunctionHandler,
    FunctionRegistry, LexicalError, MissingCells, ReductionPlan, Resolution, ResolveContext,
    ResolveOptions, ResolvedValue, Resolver,
};
