//! Cell address type and column-name conversion

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;

/// A fully qualified cell address (sheet, row, column)
///
/// Rows and columns are 1-based. They are signed so that relative-offset
/// arithmetic can produce an address left of column A or above row 1; such an
/// address is representable but not [valid](CellAddress::is_valid), and the
/// workbook store rejects it on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Worksheet name
    pub sheet: String,
    /// Row number (1-based)
    pub row: i64,
    /// Column number (1-based, A=1)
    pub column: i64,
}

impl CellAddress {
    /// Create a new cell address
    pub fn new(sheet: impl Into<String>, row: i64, column: i64) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            column,
        }
    }

    /// Parse an A1-style address (`B5`, `$B$5`) on the given sheet
    ///
    /// # Examples
    /// ```
    /// use sheetwalk_core::CellAddress;
    ///
    /// let addr = CellAddress::parse_a1("Sheet1", "$AB$12").unwrap();
    /// assert_eq!(addr.row, 12);
    /// assert_eq!(addr.column, 28);
    /// ```
    pub fn parse_a1(sheet: impl Into<String>, text: &str) -> Result<Self> {
        let text = text.trim();
        let bytes = text.as_bytes();
        let mut pos = 0;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                text
            )));
        }
        let column = name_to_column(&text[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &text[pos..];
        if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "invalid row number in '{}'",
                text
            )));
        }
        let row: i64 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", text)))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                text
            )));
        }

        Ok(Self::new(sheet, row, column))
    }

    /// Whether the row and column fall inside the sheet bounds
    pub fn is_valid(&self) -> bool {
        (1..=MAX_ROWS).contains(&self.row) && (1..=MAX_COLS).contains(&self.column)
    }

    /// Column name (`A`, `AB`, ...), or `None` for a column left of `A`
    pub fn column_name(&self) -> Option<String> {
        column_to_name(self.column).ok()
    }

    /// Address moved by the given offsets
    pub fn offset(&self, row_offset: Option<i64>, col_offset: Option<i64>) -> Self {
        apply_offset(self, row_offset, col_offset)
    }

    /// Same row and column on another sheet
    pub fn on_sheet(&self, sheet: impl Into<String>) -> Self {
        Self::new(sheet, self.row, self.column)
    }

    /// Identifier for this cell in generated plans: `Sheet1__B__5`
    pub fn var_name(&self) -> String {
        let column = self
            .column_name()
            .unwrap_or_else(|| format!("C{}", self.column));
        format!("{}__{}__{}", self.sheet, column, self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column_name() {
            Some(column) if self.is_valid() => write!(f, "{}!{}{}", self.sheet, column, self.row),
            _ => write!(f, "{}!R{}C{}", self.sheet, self.row, self.column),
        }
    }
}

/// Convert a 1-based column number to its name (1 = A, 26 = Z, 27 = AA)
pub fn column_to_name(column: i64) -> Result<String> {
    if column < 1 {
        return Err(Error::InvalidAddress(format!(
            "column number must be >= 1, got {}",
            column
        )));
    }

    let mut result = String::new();
    let mut n = column;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    Ok(result)
}

/// Convert a column name to its 1-based number (A = 1, Z = 26, AA = 27)
///
/// Letters are case-insensitive.
pub fn name_to_column(name: &str) -> Result<i64> {
    if name.is_empty() {
        return Err(Error::InvalidAddress("empty column name".into()));
    }

    let mut column: i64 = 0;
    for c in name.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!(
                "invalid column letter '{}' in '{}'",
                c, name
            )));
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as i64 + 1;
        column = column
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| Error::InvalidAddress(format!("column name too long: '{}'", name)))?;
    }

    Ok(column)
}

/// Add row/column offsets to an address; an unspecified offset means "same".
///
/// No clamping happens here: the result may lie outside the sheet.
pub fn apply_offset(
    base: &CellAddress,
    row_offset: Option<i64>,
    col_offset: Option<i64>,
) -> CellAddress {
    CellAddress {
        sheet: base.sheet.clone(),
        row: base.row.saturating_add(row_offset.unwrap_or(0)),
        column: base.column.saturating_add(col_offset.unwrap_or(0)),
    }
}
