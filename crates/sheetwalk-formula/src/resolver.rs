//! Reference resolver
//!
//! Walks a formula cell's expression tree against a [`Workbook`], replacing
//! every reference with what the referenced cell holds. Formula cells reached
//! along the way are parsed and resolved in turn, so the result bottoms out
//! in literal cells and constants.
//!
//! The walk is guarded: revisiting a cell already on the current path is a
//! circular reference, and depth, range size and wall-clock time are bounded
//! by [`ResolveOptions`].
//!
//! Each formula cell is expanded at most once per resolution. Later
//! references to it share the finished body.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::{AHashMap, AHashSet};
use sheetwalk_core::{apply_offset, Cell, CellAddress, Missing, Workbook};

use crate::ast::{CellRef, Expr};
use crate::error::{FormulaError, FormulaResult, LexicalError};
use crate::functions::{builtin_functions, FunctionRegistry};
use crate::parser::parse_formula_with_diagnostics;
use crate::value::{Resolution, ResolvedValue};

/// Default limit on the levels open at once: formula cells, named ranges,
/// and nested groups, negations, calls and arrays
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default limit on the cells a single range may expand to
pub const DEFAULT_MAX_RANGE_CELLS: usize = 65_536;

/// What a range does with a member cell the store does not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCells {
    /// The whole resolution fails with the lookup error
    #[default]
    Fail,
    /// The member becomes [`ResolvedValue::Blank`]
    Blank,
}

/// Resolution limits and policies
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    /// Formula cells, named ranges and nested sub-expressions open at once
    pub max_depth: usize,
    /// Largest range that will be expanded
    pub max_range_cells: usize,
    pub missing_range_cells: MissingCells,
    /// Wall-clock budget for one top-level resolution
    pub timeout: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            missing_range_cells: MissingCells::Fail,
            timeout: None,
        }
    }
}

/// State of one top-level resolution
#[derive(Debug)]
pub(crate) struct Traversal {
    path: Vec<CellAddress>,
    on_path: AHashSet<CellAddress>,
    names: Vec<String>,
    /// Groups, negations, calls and arrays open inside the current formula chain
    nesting: usize,
    /// Bodies of formula cells already expanded
    completed: AHashMap<CellAddress, Arc<ResolvedValue>>,
    calls: Vec<String>,
    visited: Vec<CellAddress>,
    literals: Vec<CellAddress>,
    seen_literals: AHashSet<CellAddress>,
    diagnostics: Vec<LexicalError>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl Traversal {
    fn new(timeout: Option<Duration>) -> Self {
        Self {
            path: Vec::new(),
            on_path: AHashSet::new(),
            names: Vec::new(),
            nesting: 0,
            completed: AHashMap::new(),
            calls: Vec::new(),
            visited: Vec::new(),
            literals: Vec::new(),
            seen_literals: AHashSet::new(),
            diagnostics: Vec::new(),
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    fn check_deadline(&self) -> FormulaResult<()> {
        match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) if Instant::now() >= deadline => {
                Err(FormulaError::DeadlineExceeded { timeout })
            }
            _ => Ok(()),
        }
    }

    fn depth(&self) -> usize {
        self.path.len() + self.names.len() + self.nesting
    }

    fn record_literal(&mut self, address: &CellAddress) {
        if self.seen_literals.insert(address.clone()) {
            self.literals.push(address.clone());
        }
    }

    fn finish(self, value: ResolvedValue) -> Resolution {
        Resolution {
            value,
            calls: self.calls,
            visited: self.visited,
            diagnostics: self.diagnostics,
            literals: self.literals,
        }
    }
}

/// Resolves formula cells of one workbook
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    workbook: &'a Workbook,
    functions: &'a FunctionRegistry,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    /// Resolver with the built-in functions and default options
    pub fn new(workbook: &'a Workbook) -> Self {
        Self {
            workbook,
            functions: builtin_functions(),
            options: ResolveOptions::default(),
        }
    }

    pub fn with_functions(mut self, functions: &'a FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn workbook(&self) -> &'a Workbook {
        self.workbook
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve a cell
    ///
    /// A literal cell resolves to itself. A formula cell resolves to its
    /// resolved body; formula cells reached through it keep their own
    /// address and text in [`ResolvedValue::Formula`].
    pub fn resolve(&self, cell: &Cell) -> FormulaResult<ResolvedValue> {
        self.resolve_with_trace(cell).map(|r| r.value)
    }

    /// Look up `address` and resolve the cell there
    pub fn resolve_address(&self, address: &CellAddress) -> FormulaResult<ResolvedValue> {
        self.resolve(self.workbook.get_cell(address)?)
    }

    /// Resolve a cell, keeping the calls, visits and diagnostics of the walk
    pub fn resolve_with_trace(&self, cell: &Cell) -> FormulaResult<Resolution> {
        let mut traversal = Traversal::new(self.options.timeout);
        let value = self.enter_cell(&mut traversal, cell, false)?;
        Ok(traversal.finish(value))
    }

    pub fn resolve_address_with_trace(&self, address: &CellAddress) -> FormulaResult<Resolution> {
        self.resolve_with_trace(self.workbook.get_cell(address)?)
    }

    fn enter_cell(
        &self,
        t: &mut Traversal,
        cell: &Cell,
        nested: bool,
    ) -> FormulaResult<ResolvedValue> {
        let address = cell.address();
        t.check_deadline()?;

        if t.on_path.contains(address) {
            let start = t.path.iter().position(|a| a == address).unwrap_or(0);
            let mut chain = t.path[start..].to_vec();
            chain.push(address.clone());
            return Err(FormulaError::CircularReference { chain });
        }

        t.visited.push(address.clone());

        let Some(formula) = cell.formula() else {
            t.record_literal(address);
            return Ok(ResolvedValue::Literal {
                address: address.clone(),
                content: cell.content().map(str::to_string),
                datatype: cell.datatype(),
            });
        };

        if let Some(body) = t.completed.get(address) {
            return Ok(ResolvedValue::Formula {
                address: address.clone(),
                formula: formula.to_string(),
                value: Arc::clone(body),
            });
        }

        self.check_depth(t)?;
        tracing::debug!(cell = %address, formula, "expanding formula cell");

        let (parsed, diagnostics) = parse_formula_with_diagnostics(formula)?;
        t.diagnostics.extend(diagnostics);

        t.path.push(address.clone());
        t.on_path.insert(address.clone());
        let result = self.resolve_expr(t, address, &parsed.body);
        t.path.pop();
        t.on_path.remove(address);

        let value = result?;
        if !nested {
            return Ok(value);
        }

        let body = Arc::new(value);
        t.completed.insert(address.clone(), Arc::clone(&body));
        Ok(ResolvedValue::Formula {
            address: address.clone(),
            formula: formula.to_string(),
            value: body,
        })
    }

    fn check_depth(&self, t: &Traversal) -> FormulaResult<()> {
        if t.depth() >= self.options.max_depth {
            return Err(FormulaError::MaxDepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    /// Run `resolve` one nesting level deeper
    fn nested<T>(
        &self,
        t: &mut Traversal,
        resolve: impl FnOnce(&mut Traversal) -> FormulaResult<T>,
    ) -> FormulaResult<T> {
        self.check_depth(t)?;
        t.nesting += 1;
        let result = resolve(t);
        t.nesting -= 1;
        result
    }

    fn resolve_cell_at(
        &self,
        t: &mut Traversal,
        address: &CellAddress,
    ) -> FormulaResult<ResolvedValue> {
        let cell = self.workbook.get_cell(address)?;
        self.enter_cell(t, cell, true)
    }

    fn resolve_expr(
        &self,
        t: &mut Traversal,
        cursor: &CellAddress,
        expr: &Expr,
    ) -> FormulaResult<ResolvedValue> {
        match expr {
            Expr::NumberLiteral(n) => Ok(ResolvedValue::Number(*n)),
            Expr::StringLiteral(s) => Ok(ResolvedValue::String(s.clone())),
            Expr::BooleanLiteral(b) => Ok(ResolvedValue::Boolean(*b)),
            Expr::ErrorLiteral(e) => Ok(ResolvedValue::Error(*e)),
            Expr::ArrayLiteral(rows) => self.nested(t, |t| {
                let mut resolved = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut items = Vec::with_capacity(row.len());
                    for item in row {
                        items.push(self.resolve_expr(t, cursor, item)?);
                    }
                    resolved.push(items);
                }
                Ok(ResolvedValue::Array(resolved))
            }),

            Expr::RelativeCell {
                sheet,
                row_offset,
                col_offset,
            } => {
                let mut address = apply_offset(cursor, *row_offset, *col_offset);
                if let Some(sheet) = sheet {
                    address = address.on_sheet(sheet.as_str());
                }
                self.resolve_cell_at(t, &address)
            }
            Expr::AbsoluteCell { sheet, row, column } => {
                let sheet = sheet.as_deref().unwrap_or(&cursor.sheet);
                self.resolve_cell_at(t, &CellAddress::new(sheet, *row, *column))
            }
            Expr::CellRange { sheet, from, to } => {
                self.expand_range(t, cursor, sheet.as_deref(), from, to)
            }
            Expr::RowRange { sheet, from, to } => {
                self.expand_lines(t, cursor, sheet.as_deref(), Axis::Rows, *from, *to)
            }
            Expr::ColumnRange { sheet, from, to } => {
                self.expand_lines(t, cursor, sheet.as_deref(), Axis::Columns, *from, *to)
            }
            Expr::Name(name) => self.resolve_name(t, cursor, name),
            Expr::ExternalReference { workbook, .. } => Err(FormulaError::UnsupportedReference {
                kind: "external-workbook".into(),
                reference: workbook.clone(),
            }),

            Expr::BinaryOp { op, operands } => {
                let mut resolved = Vec::with_capacity(operands.len());
                for operand in operands {
                    resolved.push(self.resolve_expr(t, cursor, operand)?);
                }
                Ok(ResolvedValue::Operation {
                    op: *op,
                    operands: resolved,
                })
            }
            Expr::Negate(inner) => self.nested(t, |t| {
                Ok(ResolvedValue::Negate(Box::new(
                    self.resolve_expr(t, cursor, inner)?,
                )))
            }),
            Expr::Group(inner) => self.nested(t, |t| self.resolve_expr(t, cursor, inner)),

            Expr::FunctionCall { name, args } => {
                self.nested(t, |t| self.call_function(t, cursor, name, args))
            }
        }
    }

    fn call_function(
        &self,
        t: &mut Traversal,
        cursor: &CellAddress,
        name: &str,
        args: &[Expr],
    ) -> FormulaResult<ResolvedValue> {
        let def = self
            .functions
            .get(name)
            .ok_or_else(|| FormulaError::UnsupportedFunction {
                name: name.to_ascii_uppercase(),
            })?;

        let expected = def.arity();
        if !expected.accepts(args.len()) {
            return Err(FormulaError::Arity {
                function: def.name.clone(),
                expected,
                actual: args.len(),
            });
        }

        t.calls.push(def.name.clone());
        tracing::trace!(function = %def.name, args = args.len(), cell = %cursor, "dispatching function");

        let mut ctx = ResolveContext {
            resolver: self,
            traversal: t,
            cursor,
        };
        def.handler.resolve(&def.name, args, &mut ctx)
    }

    fn resolve_name(
        &self,
        t: &mut Traversal,
        cursor: &CellAddress,
        name: &str,
    ) -> FormulaResult<ResolvedValue> {
        match self.workbook.get_named_cell(name) {
            Ok(address) => {
                tracing::debug!(name, cell = %address, "resolving named cell");
                let value = self.resolve_cell_at(t, address)?;
                return Ok(ResolvedValue::Named {
                    name: name.to_string(),
                    value: Box::new(value),
                });
            }
            Err(sheetwalk_core::Error::UnknownName { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(range) = self.workbook.named_range(name) {
            if let Some(start) = t.names.iter().position(|n| n.eq_ignore_ascii_case(name)) {
                let mut chain = t.names[start..].to_vec();
                chain.push(name.to_string());
                return Err(FormulaError::CircularName { chain });
            }
            self.check_depth(t)?;
            t.check_deadline()?;
            tracing::debug!(name, refers_to = %range.refers_to, "expanding named range");

            let (parsed, diagnostics) = parse_formula_with_diagnostics(&range.formula_text())?;
            t.diagnostics.extend(diagnostics);

            t.names.push(name.to_string());
            let result = self.resolve_expr(t, cursor, &parsed.body);
            t.names.pop();

            return Ok(ResolvedValue::Named {
                name: name.to_string(),
                value: Box::new(result?),
            });
        }

        if let Some(address) = bare_r1c1(name, cursor) {
            return self.resolve_cell_at(t, &address);
        }

        Err(sheetwalk_core::Error::UnknownName {
            name: name.to_string(),
        }
        .into())
    }

    fn expand_range(
        &self,
        t: &mut Traversal,
        cursor: &CellAddress,
        sheet: Option<&str>,
        from: &CellRef,
        to: &CellRef,
    ) -> FormulaResult<ResolvedValue> {
        let sheet = sheet.unwrap_or(&cursor.sheet);
        let a = from.locate(cursor, sheet);
        let b = to.locate(cursor, sheet);

        let (top, bottom) = (a.row.min(b.row), a.row.max(b.row));
        let (left, right) = (a.column.min(b.column), a.column.max(b.column));

        let rows = i128::from(bottom) - i128::from(top) + 1;
        let columns = i128::from(right) - i128::from(left) + 1;
        let cells = u64::try_from(rows * columns).unwrap_or(u64::MAX);
        self.check_range_size(cells)?;

        tracing::trace!(from = %a, to = %b, cells, "expanding range");

        let mut members = Vec::with_capacity(cells as usize);
        for row in top..=bottom {
            for column in left..=right {
                let address = CellAddress::new(sheet, row, column);
                members.push(self.resolve_range_member(t, address)?);
            }
        }
        Ok(ResolvedValue::Range(members))
    }

    fn resolve_range_member(
        &self,
        t: &mut Traversal,
        address: CellAddress,
    ) -> FormulaResult<ResolvedValue> {
        match self.workbook.get_cell(&address) {
            Ok(cell) => self.enter_cell(t, cell, true),
            Err(sheetwalk_core::Error::CellNotFound {
                missing: Missing::Column(_) | Missing::Row(_),
                ..
            }) if self.options.missing_range_cells == MissingCells::Blank => {
                Ok(ResolvedValue::Blank { address })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whole rows or columns cover the populated cells only
    fn expand_lines(
        &self,
        t: &mut Traversal,
        cursor: &CellAddress,
        sheet: Option<&str>,
        axis: Axis,
        from: i64,
        to: i64,
    ) -> FormulaResult<ResolvedValue> {
        let sheet = sheet.unwrap_or(&cursor.sheet);
        let (first, last) = (from.min(to), from.max(to));

        let worksheet = self.workbook.worksheet(sheet).ok_or_else(|| {
            let address = match axis {
                Axis::Rows => CellAddress::new(sheet, first, 1),
                Axis::Columns => CellAddress::new(sheet, 1, first),
            };
            sheetwalk_core::Error::CellNotFound {
                address,
                missing: Missing::Worksheet(sheet.to_string()),
            }
        })?;

        let cells = match axis {
            Axis::Rows => worksheet.cells_in_rows(first, last),
            Axis::Columns => worksheet.cells_in_columns(first, last),
        };
        self.check_range_size(cells.len() as u64)?;

        tracing::trace!(sheet, ?axis, first, last, cells = cells.len(), "expanding lines");

        let mut members = Vec::with_capacity(cells.len());
        for cell in cells {
            members.push(self.enter_cell(t, cell, true)?);
        }
        Ok(ResolvedValue::Range(members))
    }

    fn check_range_size(&self, cells: u64) -> FormulaResult<()> {
        if cells > self.options.max_range_cells as u64 {
            return Err(FormulaError::RangeTooLarge {
                cells,
                limit: self.options.max_range_cells,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Rows,
    Columns,
}

/// Read an undefined name as bracket-free R1C1 (`r5c2`, `r2c`, `rc`).
///
/// A missing row or column number means the cursor's own.
fn bare_r1c1(name: &str, cursor: &CellAddress) -> Option<CellAddress> {
    let lower = name.to_ascii_lowercase();
    let (row, column) = if let Some(rest) = lower.strip_prefix('r') {
        match rest.split_once('c') {
            Some((row, column)) => (Some(row), Some(column)),
            None => (Some(rest), None),
        }
    } else if let Some(rest) = lower.strip_prefix('c') {
        (None, Some(rest))
    } else {
        return None;
    };

    let part = |text: Option<&str>, current: i64| -> Option<i64> {
        match text {
            None | Some("") => Some(current),
            Some(digits) if digits.bytes().all(|b| b.is_ascii_digit()) => digits.parse().ok(),
            Some(_) => None,
        }
    };

    Some(CellAddress::new(
        cursor.sheet.clone(),
        part(row, cursor.row)?,
        part(column, cursor.column)?,
    ))
}

/// What a [`FunctionHandler`](crate::functions::FunctionHandler) sees of the
/// resolution in progress
pub struct ResolveContext<'r> {
    resolver: &'r Resolver<'r>,
    traversal: &'r mut Traversal,
    cursor: &'r CellAddress,
}

impl<'r> ResolveContext<'r> {
    /// The cell whose formula is being resolved
    pub fn cursor(&self) -> &CellAddress {
        self.cursor
    }

    pub fn workbook(&self) -> &Workbook {
        self.resolver.workbook
    }

    /// Resolve one argument
    pub fn resolve(&mut self, expr: &Expr) -> FormulaResult<ResolvedValue> {
        self.resolver.resolve_expr(self.traversal, self.cursor, expr)
    }

    /// Resolve arguments in order, stopping at the first failure
    pub fn resolve_all(&mut self, exprs: &[Expr]) -> FormulaResult<Vec<ResolvedValue>> {
        exprs.iter().map(|e| self.resolve(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOperator;
    use crate::error::Arity;
    use crate::value::Comparison;
    use pretty_assertions::assert_eq;
    use sheetwalk_core::DataType;

    fn addr(sheet: &str, a1: &str) -> CellAddress {
        CellAddress::parse_a1(sheet, a1).unwrap()
    }

    fn workbook(cells: &[(&str, &str)]) -> Workbook {
        let mut wb = Workbook::new();
        for (a1, text) in cells {
            let address = addr("Sheet1", a1);
            if text.starts_with('=') {
                wb.set_formula(&address, text);
            } else {
                wb.set_literal(&address, text, DataType::Number);
            }
        }
        wb
    }

    fn literal(sheet: &str, a1: &str, content: &str) -> ResolvedValue {
        ResolvedValue::Literal {
            address: addr(sheet, a1),
            content: Some(content.to_string()),
            datatype: DataType::Number,
        }
    }

    fn resolve(wb: &Workbook, a1: &str) -> FormulaResult<ResolvedValue> {
        Resolver::new(wb).resolve_address(&addr("Sheet1", a1))
    }

    #[test]
    fn test_literal_resolves_to_itself() {
        let wb = workbook(&[("B2", "7")]);
        assert_eq!(resolve(&wb, "B2").unwrap(), literal("Sheet1", "B2", "7"));
    }

    #[test]
    fn test_constant_run() {
        let wb = workbook(&[("A1", "=1+3+5")]);
        assert_eq!(
            resolve(&wb, "A1").unwrap(),
            ResolvedValue::Operation {
                op: BinaryOperator::Add,
                operands: vec![
                    ResolvedValue::Number(1.0),
                    ResolvedValue::Number(3.0),
                    ResolvedValue::Number(5.0),
                ],
            }
        );
    }

    #[test]
    fn test_sum_over_range_in_row_major_order() {
        let mut wb = workbook(&[("A1", "=SUM(B5:B15)")]);
        for row in 5..=15 {
            wb.set_literal(
                &CellAddress::new("Sheet1", row, 2),
                &row.to_string(),
                DataType::Number,
            );
        }

        let ResolvedValue::Call { function, args } = resolve(&wb, "A1").unwrap() else {
            panic!("expected a call");
        };
        assert_eq!(function, "SUM");
        assert_eq!(args.len(), 1);

        let ResolvedValue::Range(members) = &args[0] else {
            panic!("expected a range");
        };
        let rows: Vec<i64> = members.iter().filter_map(|m| m.address()).map(|a| a.row).collect();
        assert_eq!(rows, (5..=15).collect::<Vec<_>>());
    }

    #[test]
    fn test_relative_reference_and_nested_formula() {
        let wb = workbook(&[("A1", "=R[1]C * 2"), ("A2", "=B2"), ("B2", "4")]);
        assert_eq!(
            resolve(&wb, "A1").unwrap(),
            ResolvedValue::Operation {
                op: BinaryOperator::Multiply,
                operands: vec![
                    ResolvedValue::Formula {
                        address: addr("Sheet1", "A2"),
                        formula: "=B2".into(),
                        value: Arc::new(literal("Sheet1", "B2", "4")),
                    },
                    ResolvedValue::Number(2.0),
                ],
            }
        );
    }

    #[test]
    fn test_arity_error() {
        let wb = workbook(&[("A1", "=IF(P5=8.0,\"G\")"), ("P5", "8")]);
        assert_eq!(
            resolve(&wb, "A1").unwrap_err(),
            FormulaError::Arity {
                function: "IF".into(),
                expected: Arity::Exact(3),
                actual: 2,
            }
        );
    }

    #[test]
    fn test_iferror_two_args() {
        let wb = workbook(&[("A1", "=IFERROR(B1/C1, 0)"), ("B1", "1"), ("C1", "0")]);
        let ResolvedValue::Call { function, args } = resolve(&wb, "A1").unwrap() else {
            panic!("expected a call");
        };
        assert_eq!(function, "IFERROR");
        assert_eq!(args[1], ResolvedValue::Number(0.0));
    }

    #[test]
    fn test_unsupported_function() {
        let mut registry = FunctionRegistry::empty();
        registry.register(crate::functions::FunctionDef::new(
            "SUM",
            1,
            None,
            crate::functions::PassThrough,
        ));
        let wb = workbook(&[("A1", "=ROUND(1, 2)")]);
        let err = Resolver::new(&wb)
            .with_functions(&registry)
            .resolve_address(&addr("Sheet1", "A1"))
            .unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnsupportedFunction {
                name: "ROUND".into()
            }
        );
    }

    #[test]
    fn test_circular_reference_chain() {
        let wb = workbook(&[("A1", "=B1+1"), ("B1", "=C1"), ("C1", "=A1")]);
        let err = resolve(&wb, "A1").unwrap_err();
        let FormulaError::CircularReference { chain } = err else {
            panic!("expected a circular reference, got {:?}", err);
        };
        assert_eq!(
            chain,
            vec![
                addr("Sheet1", "A1"),
                addr("Sheet1", "B1"),
                addr("Sheet1", "C1"),
                addr("Sheet1", "A1"),
            ]
        );
        assert_eq!(chain.iter().filter(|a| **a == addr("Sheet1", "A1")).count(), 2);
    }

    #[test]
    fn test_self_reference() {
        let wb = workbook(&[("A1", "=A1")]);
        assert!(matches!(
            resolve(&wb, "A1"),
            Err(FormulaError::CircularReference { chain }) if chain.len() == 2
        ));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let wb = workbook(&[("A1", "=B1+C1"), ("B1", "=D1"), ("C1", "=D1"), ("D1", "1")]);
        let trace = Resolver::new(&wb)
            .resolve_address_with_trace(&addr("Sheet1", "A1"))
            .unwrap();
        assert_eq!(trace.literals, vec![addr("Sheet1", "D1")]);
        assert_eq!(trace.visited.len(), 5);
    }

    #[test]
    fn test_ambiguous_named_cell() {
        let mut wb = workbook(&[("A1", "=rate*2"), ("B1", "1"), ("B2", "2")]);
        wb.define_named_cell("rate", addr("Sheet1", "B1"));
        wb.define_named_cell("rate", addr("Sheet1", "B2"));
        assert_eq!(
            resolve(&wb, "A1").unwrap_err(),
            FormulaError::Workbook(sheetwalk_core::Error::AmbiguousName {
                name: "rate".into(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_named_cell() {
        let mut wb = workbook(&[("A1", "=Rate"), ("B1", "0.5")]);
        wb.define_named_cell("rate", addr("Sheet1", "B1"));
        assert_eq!(
            resolve(&wb, "A1").unwrap(),
            ResolvedValue::Named {
                name: "Rate".into(),
                value: Box::new(literal("Sheet1", "B1", "0.5")),
            }
        );
    }

    #[test]
    fn test_named_range() {
        let mut wb = workbook(&[("A1", "=SUM(inputs)"), ("B1", "1"), ("B2", "2")]);
        wb.define_named_range("inputs", "=Sheet1!R1C2:R2C2");

        let ResolvedValue::Call { args, .. } = resolve(&wb, "A1").unwrap() else {
            panic!("expected a call");
        };
        assert_eq!(
            args,
            vec![ResolvedValue::Named {
                name: "inputs".into(),
                value: Box::new(ResolvedValue::Range(vec![
                    literal("Sheet1", "B1", "1"),
                    literal("Sheet1", "B2", "2"),
                ])),
            }]
        );
    }

    #[test]
    fn test_circular_named_range() {
        let mut wb = workbook(&[("A1", "=first")]);
        wb.define_named_range("first", "=second+1");
        wb.define_named_range("second", "=first");
        assert_eq!(
            resolve(&wb, "A1").unwrap_err(),
            FormulaError::CircularName {
                chain: vec!["first".into(), "second".into(), "first".into()],
            }
        );
    }

    #[test]
    fn test_bare_r1c1_fallback() {
        let wb = workbook(&[("C3", "=r1c2 + r2c"), ("B1", "5"), ("C2", "6")]);
        assert_eq!(
            resolve(&wb, "C3").unwrap(),
            ResolvedValue::Operation {
                op: BinaryOperator::Add,
                operands: vec![literal("Sheet1", "B1", "5"), literal("Sheet1", "C2", "6")],
            }
        );
    }

    #[test]
    fn test_unknown_name() {
        let wb = workbook(&[("A1", "=nowhere")]);
        assert_eq!(
            resolve(&wb, "A1").unwrap_err(),
            FormulaError::Workbook(sheetwalk_core::Error::UnknownName {
                name: "nowhere".into()
            })
        );
    }

    #[test]
    fn test_missing_worksheet() {
        let wb = workbook(&[("A1", "=Other!B2")]);
        assert_eq!(
            resolve(&wb, "A1").unwrap_err(),
            FormulaError::Workbook(sheetwalk_core::Error::CellNotFound {
                address: addr("Other", "B2"),
                missing: Missing::Worksheet("Other".into()),
            })
        );
    }

    #[test]
    fn test_missing_range_cell() {
        let wb = workbook(&[("A1", "=SUM(B1:B3)"), ("B1", "1"), ("B3", "3")]);
        assert!(matches!(
            resolve(&wb, "A1"),
            Err(FormulaError::Workbook(sheetwalk_core::Error::CellNotFound { .. }))
        ));

        let options = ResolveOptions {
            missing_range_cells: MissingCells::Blank,
            ..Default::default()
        };
        let value = Resolver::new(&wb)
            .with_options(options)
            .resolve_address(&addr("Sheet1", "A1"))
            .unwrap();
        let ResolvedValue::Call { args, .. } = value else {
            panic!("expected a call");
        };
        assert_eq!(
            args[0],
            ResolvedValue::Range(vec![
                literal("Sheet1", "B1", "1"),
                ResolvedValue::Blank {
                    address: addr("Sheet1", "B2")
                },
                literal("Sheet1", "B3", "3"),
            ])
        );
    }

    #[test]
    fn test_max_depth() {
        let wb = workbook(&[("A1", "=A2"), ("A2", "=A3"), ("A3", "1")]);
        let options = |max_depth| ResolveOptions {
            max_depth,
            ..Default::default()
        };

        assert!(Resolver::new(&wb)
            .with_options(options(2))
            .resolve_address(&addr("Sheet1", "A1"))
            .is_ok());
        assert_eq!(
            Resolver::new(&wb)
                .with_options(options(1))
                .resolve_address(&addr("Sheet1", "A1"))
                .unwrap_err(),
            FormulaError::MaxDepthExceeded { limit: 1 }
        );
    }

    /// Column A, rows 1..=rows, each holding `formula`; the row below holds 0
    fn chain(rows: i64, formula: &str) -> Workbook {
        let mut wb = Workbook::new();
        for row in 1..=rows {
            wb.set_formula(&CellAddress::new("Sheet1", row, 1), formula);
        }
        wb.set_literal(&CellAddress::new("Sheet1", rows + 1, 1), "0", DataType::Number);
        wb
    }

    #[test]
    fn test_default_depth_limit_on_a_test_thread() {
        let root = addr("Sheet1", "A1");
        let limit = DEFAULT_MAX_DEPTH as i64;

        let at_limit = chain(limit, "=R[1]C+1");
        assert!(Resolver::new(&at_limit).resolve_address(&root).is_ok());

        let past_limit = chain(limit + 1, "=R[1]C+1");
        assert_eq!(
            Resolver::new(&past_limit).resolve_address(&root).unwrap_err(),
            FormulaError::MaxDepthExceeded {
                limit: DEFAULT_MAX_DEPTH
            }
        );
    }

    #[test]
    fn test_nested_groups_count_towards_depth() {
        let wb = workbook(&[("A1", "=((((B1))))"), ("B1", "1")]);
        let options = |max_depth| ResolveOptions {
            max_depth,
            ..Default::default()
        };

        assert!(Resolver::new(&wb)
            .with_options(options(5))
            .resolve_address(&addr("Sheet1", "A1"))
            .is_ok());
        assert_eq!(
            Resolver::new(&wb)
                .with_options(options(4))
                .resolve_address(&addr("Sheet1", "A1"))
                .unwrap_err(),
            FormulaError::MaxDepthExceeded { limit: 4 }
        );

        let deep = chain(20, "=((((((((R[1]C))))))))");
        assert_eq!(
            Resolver::new(&deep).resolve_address(&addr("Sheet1", "A1")).unwrap_err(),
            FormulaError::MaxDepthExceeded {
                limit: DEFAULT_MAX_DEPTH
            }
        );
    }

    #[test]
    fn test_repeated_precedent_is_expanded_once() {
        let wb = chain(60, "=R[1]C+R[1]C");
        let trace = Resolver::new(&wb)
            .resolve_address_with_trace(&addr("Sheet1", "A1"))
            .unwrap();

        // Each formula row is entered twice, the second time without its precedents
        assert_eq!(trace.visited.len(), 1 + 2 * 60);
        assert_eq!(trace.literals, vec![CellAddress::new("Sheet1", 61, 1)]);

        let ResolvedValue::Operation { operands, .. } = &trace.value else {
            panic!("expected an operation");
        };
        let (
            ResolvedValue::Formula { value: first, .. },
            ResolvedValue::Formula { value: second, .. },
        ) = (&operands[0], &operands[1])
        else {
            panic!("expected two formula cells");
        };
        assert!(Arc::ptr_eq(first, second));
    }

    #[test]
    fn test_repeated_precedent_through_calls_and_ranges() {
        let wb = chain(30, "=IF(R[1]C>0,R[1]C,SUM(R[1]C:R[1]C))");
        let trace = Resolver::new(&wb)
            .resolve_address_with_trace(&addr("Sheet1", "A1"))
            .unwrap();

        assert_eq!(trace.literals, vec![CellAddress::new("Sheet1", 31, 1)]);
        assert_eq!(trace.calls.len(), 2 * 30);
    }

    #[test]
    fn test_range_too_large() {
        let wb = workbook(&[("A1", "=SUM(B1:C10)")]);
        let options = ResolveOptions {
            max_range_cells: 19,
            ..Default::default()
        };
        assert_eq!(
            Resolver::new(&wb)
                .with_options(options)
                .resolve_address(&addr("Sheet1", "A1"))
                .unwrap_err(),
            FormulaError::RangeTooLarge {
                cells: 20,
                limit: 19
            }
        );
    }

    #[test]
    fn test_deadline() {
        let wb = workbook(&[("A1", "=B1"), ("B1", "1")]);
        let options = ResolveOptions {
            timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert_eq!(
            Resolver::new(&wb)
                .with_options(options)
                .resolve_address(&addr("Sheet1", "A1"))
                .unwrap_err(),
            FormulaError::DeadlineExceeded {
                timeout: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_external_reference_rejected() {
        let wb = workbook(&[("A1", "=[Budget.xlsx]Sheet1!B2")]);
        assert_eq!(
            resolve(&wb, "A1").unwrap_err(),
            FormulaError::UnsupportedReference {
                kind: "external-workbook".into(),
                reference: "Budget.xlsx".into(),
            }
        );
    }

    #[test]
    fn test_column_range_covers_populated_cells() {
        let wb = workbook(&[("A1", "=SUM(B:B)"), ("B2", "2"), ("B7", "7"), ("C1", "9")]);
        let ResolvedValue::Call { args, .. } = resolve(&wb, "A1").unwrap() else {
            panic!("expected a call");
        };
        assert_eq!(
            args[0],
            ResolvedValue::Range(vec![literal("Sheet1", "B2", "2"), literal("Sheet1", "B7", "7")])
        );
    }

    #[test]
    fn test_max_builds_reduction_plan() {
        let wb = workbook(&[("A1", "=MAX(B1:B2, 3)"), ("B1", "1"), ("B2", "2")]);
        let ResolvedValue::Reduction(plan) = resolve(&wb, "A1").unwrap() else {
            panic!("expected a reduction");
        };
        assert_eq!(plan.comparison, Comparison::Greater);
        assert_eq!(
            plan.to_string(),
            "tempMax = Sheet1__B__1;\n\
             if (Sheet1__B__2 > tempMax) { tempMax = Sheet1__B__2; }\n\
             if (3 > tempMax) { tempMax = 3; }\n"
        );
    }

    #[test]
    fn test_trace_records_calls_in_order() {
        let wb = workbook(&[("A1", "=ROUND(SUM(B1), 2)"), ("B1", "=PI()")]);
        let trace = Resolver::new(&wb)
            .resolve_address_with_trace(&addr("Sheet1", "A1"))
            .unwrap();
        assert_eq!(trace.calls, vec!["ROUND", "SUM", "PI"]);
        assert_eq!(trace.visited, vec![addr("Sheet1", "A1"), addr("Sheet1", "B1")]);
        assert!(trace.literals.is_empty());
    }
}
