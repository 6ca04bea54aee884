//! Formula Abstract Syntax Tree types

use std::fmt;

use sheetwalk_core::{apply_offset, CellAddress, ErrorValue};

/// A parsed formula: the expression after the leading `=`
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub body: Expr,
}

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Numeric literal
    NumberLiteral(f64),
    /// String literal
    StringLiteral(String),
    /// Boolean literal
    BooleanLiteral(bool),
    /// Error literal
    ErrorLiteral(ErrorValue),
    /// `{1,2;3,4}`
    ArrayLiteral(Vec<Vec<Expr>>),

    // === References ===
    /// Offset from the formula's own cell; `None` means same row/column
    RelativeCell {
        sheet: Option<String>,
        row_offset: Option<i64>,
        col_offset: Option<i64>,
    },
    /// Fixed cell (`B5`, `$B$5`, `R5C2`)
    AbsoluteCell {
        sheet: Option<String>,
        row: i64,
        column: i64,
    },
    /// Rectangular range between two corners on one sheet
    CellRange {
        sheet: Option<String>,
        from: CellRef,
        to: CellRef,
    },
    /// Whole rows (`5:10`)
    RowRange {
        sheet: Option<String>,
        from: i64,
        to: i64,
    },
    /// Whole columns (`A:C`)
    ColumnRange {
        sheet: Option<String>,
        from: i64,
        to: i64,
    },
    /// Named cell, named range, or defined name
    Name(String),
    /// Reference into another workbook
    ExternalReference { workbook: String, target: Box<Expr> },

    // === Operators ===
    /// Run of one operator: `1+3+5` holds all three operands
    BinaryOp {
        op: BinaryOperator,
        operands: Vec<Expr>,
    },
    /// Prefix minus on anything but a number literal
    Negate(Box<Expr>),
    /// Parenthesised sub-expression
    Group(Box<Expr>),

    // === Function call ===
    FunctionCall { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Call every node of the tree, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::ArrayLiteral(rows) => rows.iter().flatten().for_each(|e| e.walk(visit)),
            Expr::ExternalReference { target, .. } => target.walk(visit),
            Expr::BinaryOp { operands, .. } => operands.iter().for_each(|e| e.walk(visit)),
            Expr::Negate(inner) | Expr::Group(inner) => inner.walk(visit),
            Expr::FunctionCall { args, .. } => args.iter().for_each(|e| e.walk(visit)),
            _ => {}
        }
    }

    /// Whether the expression refers to any cell or name
    pub fn has_references(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            found |= matches!(
                e,
                Expr::RelativeCell { .. }
                    | Expr::AbsoluteCell { .. }
                    | Expr::CellRange { .. }
                    | Expr::RowRange { .. }
                    | Expr::ColumnRange { .. }
                    | Expr::Name(_)
                    | Expr::ExternalReference { .. }
            )
        });
        found
    }
}

/// One corner of a [`Expr::CellRange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRef {
    Relative {
        row_offset: Option<i64>,
        col_offset: Option<i64>,
    },
    Absolute {
        row: i64,
        column: i64,
    },
}

impl CellRef {
    /// Concrete address of this corner on `sheet`, relative to `cursor`
    pub fn locate(&self, cursor: &CellAddress, sheet: &str) -> CellAddress {
        match *self {
            CellRef::Relative {
                row_offset,
                col_offset,
            } => apply_offset(cursor, row_offset, col_offset).on_sheet(sheet),
            CellRef::Absolute { row, column } => CellAddress::new(sheet, row, column),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
