//! Formula parser
//!
//! A recursive descent parser over the token stream from [`crate::lexer`].
//!
//! Operators have no precedence: an expression is folded strictly left to
//! right. A run of the same operator becomes one n-ary node, and a different
//! operator wraps everything to its left, so `1+2*3` is `(1+2)*3`.

use sheetwalk_core::{name_to_column, CellAddress, MAX_COLS, MAX_ROWS};

use crate::ast::{BinaryOperator, CellRef, Expr, Formula};
use crate::error::{FormulaError, FormulaResult, LexicalError};
use crate::lexer::{tokenize, Spanned, Token};

/// Function names the grammar knows about. A bare recognised name (no
/// parentheses) parses as a zero-argument call rather than as a name.
pub const RECOGNIZED_FUNCTIONS: &[&str] = &[
    "IF", "IFERROR", "SUM", "AVERAGE", "AVG", "VLOOKUP", "PI", "MAX", "MIN", "AND", "OR", "NOT",
    "ISERROR", "ROUND", "DATE", "COUNT",
];

/// Deepest nesting of parentheses, calls, arrays and prefix signs a formula
/// may use (Excel's limit)
pub const MAX_NESTING: usize = 64;

/// Whether `name` is one of [`RECOGNIZED_FUNCTIONS`] (case-insensitive)
pub fn is_recognized_function(name: &str) -> bool {
    RECOGNIZED_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

/// Parse a formula string into an AST
///
/// Lexical diagnostics are logged and dropped; use
/// [`parse_formula_with_diagnostics`] to keep them.
///
/// # Example
/// ```rust
/// use sheetwalk_formula::parse_formula;
///
/// let ast = parse_formula("=1+3+5").unwrap();
/// let ast = parse_formula("=SUM(B5:B15)").unwrap();
/// let ast = parse_formula("=IF(R[-1]C>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<Formula> {
    parse_formula_with_diagnostics(formula).map(|(formula, _)| formula)
}

/// Parse a formula string, also returning the characters the lexer skipped
pub fn parse_formula_with_diagnostics(
    formula: &str,
) -> FormulaResult<(Formula, Vec<LexicalError>)> {
    let out = tokenize(formula);
    for diagnostic in &out.diagnostics {
        tracing::warn!(formula, %diagnostic, "skipping illegal character");
    }

    let mut parser = FormulaParser::new(out.tokens);
    let formula = parser.parse_formula()?;
    Ok((formula, out.diagnostics))
}

/// Formula parser
struct FormulaParser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Terms open at once
    depth: usize,
}

/// Left side of a `:`
enum RangeStart {
    Cell(CellRef),
    Row(i64),
    Column(i64),
}

impl FormulaParser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // === Helper methods ===

    fn current_token(&self) -> &Token {
        self.peek_token(0)
    }

    fn peek_token(&self, ahead: usize) -> &Token {
        self.tokens
            .get(self.pos + ahead)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.position)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(self.unexpected(expected.to_string()))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> FormulaError {
        FormulaError::syntax(self.position(), expected, self.current_token().to_string())
    }

    // === Grammar ===

    fn parse_formula(&mut self) -> FormulaResult<Formula> {
        self.expect(&Token::Equal)?;
        let body = self.parse_expression()?;
        if *self.current_token() != Token::Eof {
            return Err(self.unexpected("operator or end of formula"));
        }
        Ok(Formula { body })
    }

    fn binary_operator(&self) -> Option<BinaryOperator> {
        Some(match self.current_token() {
            Token::Plus => BinaryOperator::Add,
            Token::Minus => BinaryOperator::Subtract,
            Token::Star => BinaryOperator::Multiply,
            Token::Slash => BinaryOperator::Divide,
            Token::Equal => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::LessThan => BinaryOperator::LessThan,
            Token::LessEqual => BinaryOperator::LessEqual,
            Token::GreaterThan => BinaryOperator::GreaterThan,
            Token::GreaterEqual => BinaryOperator::GreaterEqual,
            Token::Ampersand => BinaryOperator::Concat,
            _ => return None,
        })
    }

    fn parse_expression(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_term()?;

        while let Some(op) = self.binary_operator() {
            self.consume();
            let right = self.parse_term()?;

            // Terms are never bare BinaryOps, so this only extends the run
            // built by this loop
            left = match left {
                Expr::BinaryOp {
                    op: run_op,
                    mut operands,
                } if run_op == op => {
                    operands.push(right);
                    Expr::BinaryOp { op, operands }
                }
                other => Expr::BinaryOp {
                    op,
                    operands: vec![other, right],
                },
            };
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> FormulaResult<Expr> {
        if self.depth > MAX_NESTING {
            return Err(self.unexpected("shallower nesting"));
        }
        self.depth += 1;
        let term = self.parse_term_inner();
        self.depth -= 1;
        term
    }

    fn parse_term_inner(&mut self) -> FormulaResult<Expr> {
        match self.current_token().clone() {
            Token::Minus => {
                self.consume();
                if let Token::Number(n) = *self.current_token() {
                    self.consume();
                    return Ok(Expr::NumberLiteral(-n));
                }
                Ok(Expr::Negate(Box::new(self.parse_term()?)))
            }

            // Prefix plus (no-op)
            Token::Plus => {
                self.consume();
                self.parse_term()
            }

            Token::Number(_) if *self.peek_token(1) == Token::Colon => self.parse_reference(None),

            Token::Number(n) => {
                self.consume();
                Ok(Expr::NumberLiteral(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(Expr::StringLiteral(s))
            }

            Token::Boolean(b) => {
                self.consume();
                Ok(Expr::BooleanLiteral(b))
            }

            Token::Error(e) => {
                self.consume();
                Ok(Expr::ErrorLiteral(e))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(Expr::Group(Box::new(expr)))
            }

            Token::LeftBrace => self.parse_array(),

            Token::SheetRef { workbook, sheet } => {
                self.consume();
                let target = self.parse_reference(Some(sheet))?;
                Ok(match workbook {
                    Some(workbook) => Expr::ExternalReference {
                        workbook,
                        target: Box::new(target),
                    },
                    None => target,
                })
            }

            Token::Identifier(name) => {
                if *self.peek_token(1) == Token::LeftParen {
                    self.consume();
                    return self.parse_function_call(name);
                }
                if *self.peek_token(1) == Token::Colon && column_number(&name).is_some() {
                    return self.parse_reference(None);
                }
                self.consume();
                if is_recognized_function(&name) {
                    Ok(Expr::FunctionCall {
                        name: name.to_ascii_uppercase(),
                        args: Vec::new(),
                    })
                } else {
                    Ok(Expr::Name(name))
                }
            }

            Token::CellRef(_)
            | Token::RelativeCell { .. }
            | Token::AbsoluteCell { .. }
            | Token::MixedCell(_)
            | Token::ColumnLabel(_)
            | Token::RowLabel(_) => self.parse_reference(None),

            _ => Err(self.unexpected("term")),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Expr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Arguments are separated by commas or simply adjacent
        if *self.current_token() != Token::RightParen {
            loop {
                args.push(self.parse_expression()?);
                match self.current_token() {
                    Token::Comma => {
                        self.consume();
                    }
                    Token::RightParen => break,
                    _ => {}
                }
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(Expr::FunctionCall {
            name: name.to_ascii_uppercase(),
            args,
        })
    }

    fn parse_array(&mut self) -> FormulaResult<Expr> {
        self.expect(&Token::LeftBrace)?;

        let mut rows = Vec::new();
        let mut current_row = Vec::new();

        loop {
            match self.current_token() {
                Token::RightBrace => break,
                Token::Comma => {
                    self.consume();
                }
                Token::Semicolon => {
                    self.consume();
                    rows.push(std::mem::take(&mut current_row));
                }
                Token::Eof => return Err(self.unexpected("'}'")),
                _ => current_row.push(self.parse_expression()?),
            }
        }

        if !current_row.is_empty() {
            rows.push(current_row);
        }

        self.expect(&Token::RightBrace)?;
        Ok(Expr::ArrayLiteral(rows))
    }

    // === References ===

    /// A reference, optionally extended into a range by `:`
    fn parse_reference(&mut self, sheet: Option<String>) -> FormulaResult<Expr> {
        let start = self.parse_range_start()?;

        if *self.current_token() == Token::Colon {
            self.consume();
            return self.parse_range(sheet, start);
        }

        match start {
            RangeStart::Cell(CellRef::Relative {
                row_offset,
                col_offset,
            }) => Ok(Expr::RelativeCell {
                sheet,
                row_offset,
                col_offset,
            }),
            RangeStart::Cell(CellRef::Absolute { row, column }) => Ok(Expr::AbsoluteCell {
                sheet,
                row,
                column,
            }),
            RangeStart::Row(_) | RangeStart::Column(_) => Err(self.unexpected("':'")),
        }
    }

    fn parse_range_start(&mut self) -> FormulaResult<RangeStart> {
        let start = match self.current_token() {
            Token::CellRef(text) => {
                let address = CellAddress::parse_a1("", text)
                    .map_err(|e| self.unexpected(format!("cell reference ({})", e)))?;
                RangeStart::Cell(CellRef::Absolute {
                    row: address.row,
                    column: address.column,
                })
            }
            Token::RelativeCell {
                row_offset,
                col_offset,
            } => RangeStart::Cell(CellRef::Relative {
                row_offset: *row_offset,
                col_offset: *col_offset,
            }),
            Token::AbsoluteCell { row, column } => RangeStart::Cell(CellRef::Absolute {
                row: *row,
                column: *column,
            }),
            Token::RowLabel(row) => RangeStart::Row(*row),
            Token::Number(n) if *self.peek_token(1) == Token::Colon => match as_row(*n) {
                Some(row) => RangeStart::Row(row),
                None => return Err(self.unexpected("row number")),
            },
            Token::ColumnLabel(text) | Token::Identifier(text) => match column_number(text) {
                Some(column) if *self.peek_token(1) == Token::Colon => RangeStart::Column(column),
                _ => return Err(self.unexpected("cell reference")),
            },
            Token::MixedCell(_) => {
                return Err(self.unexpected("R1C1 reference that is fully relative or fully absolute"))
            }
            _ => return Err(self.unexpected("cell reference")),
        };
        self.consume();
        Ok(start)
    }

    /// The part after `:`
    fn parse_range(&mut self, sheet: Option<String>, start: RangeStart) -> FormulaResult<Expr> {
        if let Token::SheetRef { workbook, sheet: end_sheet } = self.current_token() {
            let same = workbook.is_none() && sheet.as_deref() == Some(end_sheet.as_str());
            if !same {
                return Err(self.unexpected("range on a single sheet"));
            }
            self.consume();
        }

        match start {
            RangeStart::Cell(from) => {
                let is_cell = matches!(
                    self.current_token(),
                    Token::CellRef(_)
                        | Token::RelativeCell { .. }
                        | Token::AbsoluteCell { .. }
                        | Token::MixedCell(_)
                );
                if !is_cell {
                    return Err(self.unexpected("cell reference"));
                }
                match self.parse_range_start()? {
                    RangeStart::Cell(to) => Ok(Expr::CellRange { sheet, from, to }),
                    _ => Err(self.unexpected("cell reference")),
                }
            }
            RangeStart::Row(from) => {
                let to = match *self.current_token() {
                    Token::RowLabel(row) => row,
                    Token::Number(n) => match as_row(n) {
                        Some(row) => row,
                        None => return Err(self.unexpected("row number")),
                    },
                    _ => return Err(self.unexpected("row number")),
                };
                self.consume();
                Ok(Expr::RowRange { sheet, from, to })
            }
            RangeStart::Column(from) => {
                let to = match self.current_token() {
                    Token::ColumnLabel(text) | Token::Identifier(text) => column_number(text),
                    _ => None,
                };
                let Some(to) = to else {
                    return Err(self.unexpected("column letters"));
                };
                self.consume();
                Ok(Expr::ColumnRange { sheet, from, to })
            }
        }
    }
}

/// A whole, positive number that fits on a sheet
fn as_row(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n >= 1.0 && n <= MAX_ROWS as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Column number for `A`, `$AB`, ...; `None` if not a column on a sheet
fn column_number(text: &str) -> Option<i64> {
    let letters = text.strip_prefix('$').unwrap_or(text);
    if letters.len() > 3 {
        return None;
    }
    name_to_column(letters)
        .ok()
        .filter(|&column| column <= MAX_COLS)
}
