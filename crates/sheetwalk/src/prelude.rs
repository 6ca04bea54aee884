//! Prelude module - common imports for sheetwalk users
//!
//! ```rust
//! use sheetwalk::prelude::*;
//! ```

pub use crate::{
    // Resolution types
    BatchOptions,
    BatchReport,
    // Core types
    Cell,
    CellAddress,
    DataType,
    // Error types
    Error,
    FormulaError,
    FormulaResult,
    ResolveOptions,
    ResolvedValue,
    Resolver,
    Result,
    Workbook,
    // Extension traits
    WorkbookResolveExt,
    Worksheet,
};
