//! # sheetwalk-formula
//!
//! Formula grammar and reference resolver for sheetwalk.
//!
//! This crate provides:
//! - Tokenizing and parsing of A1 and R1C1 formulas (text → AST)
//! - Reference resolution against a [`sheetwalk_core::Workbook`] (AST → resolved tree)
//! - A registry of function handlers with argument-count checking
//! - Dependency tracking between resolved cells
//!
//! ## Example
//!
//! ```rust
//! use sheetwalk_core::{CellAddress, DataType, Workbook};
//! use sheetwalk_formula::{ResolvedValue, Resolver};
//!
//! let mut workbook = Workbook::new();
//! let a1 = CellAddress::new("Sheet1", 1, 1);
//! workbook.set_formula(&a1, "=R[1]C*2");
//! workbook.set_literal(&CellAddress::new("Sheet1", 2, 1), "21", DataType::Number);
//!
//! let value = Resolver::new(&workbook).resolve_address(&a1).unwrap();
//! assert!(matches!(value, ResolvedValue::Operation { .. }));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod value;

pub use ast::{BinaryOperator, CellRef, Expr, Formula};
pub use dependency::DependencyGraph;
pub use error::{Arity, FormulaError, FormulaResult, LexicalError};
pub use functions::{builtin_functions, FunctionDef, FunctionHandler, FunctionRegistry};
pub use lexer::{tokenize, Token};
pub use parser::{parse_formula, parse_formula_with_diagnostics, MAX_NESTING, RECOGNIZED_FUNCTIONS};
pub use resolver::{MissingCells, ResolveContext, ResolveOptions, Resolver};
pub use value::{Comparison, ReductionOperand, ReductionPlan, Resolution, ResolvedValue};
