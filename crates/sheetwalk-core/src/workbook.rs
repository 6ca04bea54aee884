//! Workbook type - the store that formulas resolve against

use ahash::AHashMap;

use crate::cell::{Cell, CellAddress, CellField, DataType};
use crate::error::{Error, Missing, Result};
use crate::named_range::{NamedCells, NamedRange, NamedRanges};
use crate::worksheet::Worksheet;

/// A workbook: worksheets plus workbook-level names
///
/// The ingestion side fills it through [`set_cell_field`](Self::set_cell_field),
/// [`define_named_cell`](Self::define_named_cell) and
/// [`define_named_range`](Self::define_named_range); resolution only reads it.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Workbook {
    /// Worksheets in the order they were first written
    worksheets: Vec<Worksheet>,
    /// Sheet name → index into `worksheets`
    sheet_index: AHashMap<String, usize>,
    /// Named cells
    named_cells: NamedCells,
    /// Named ranges (defined names)
    named_ranges: NamedRanges,
    /// Identity of the file this workbook was read from
    source: Option<String>,
}

impl Workbook {
    /// Create a new empty workbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the source this workbook was built from, if recorded
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Record the source identity (typically a file path)
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    // === Worksheets ===

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by name
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index.get(name).map(|&i| &self.worksheets[i])
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    fn worksheet_or_insert(&mut self, name: &str) -> &mut Worksheet {
        let index = match self.sheet_index.get(name) {
            Some(&index) => index,
            None => {
                let index = self.worksheets.len();
                self.worksheets.push(Worksheet::new(name));
                self.sheet_index.insert(name.to_string(), index);
                index
            }
        };
        &mut self.worksheets[index]
    }

    // === Cells ===

    /// Get the cell at `address`
    ///
    /// The error says whether the worksheet, the column, or the row was absent.
    pub fn get_cell(&self, address: &CellAddress) -> Result<&Cell> {
        let worksheet = self
            .worksheet(&address.sheet)
            .ok_or_else(|| Error::CellNotFound {
                address: address.clone(),
                missing: Missing::Worksheet(address.sheet.clone()),
            })?;
        worksheet.get(address.row, address.column)
    }

    /// Set one field of the cell at `address`, creating sheet and cell as
    /// needed. Returns `false` if the field was already set.
    pub fn set_cell_field(&mut self, address: &CellAddress, field: CellField, value: &str) -> bool {
        self.worksheet_or_insert(&address.sheet)
            .set_field(address.row, address.column, field, value)
    }

    /// Store a formula for `address`
    pub fn set_formula(&mut self, address: &CellAddress, formula: &str) -> bool {
        self.set_cell_field(address, CellField::Formula, formula)
    }

    /// Store literal content and its datatype for `address`
    pub fn set_literal(&mut self, address: &CellAddress, content: &str, datatype: DataType) -> bool {
        let stored = self.set_cell_field(address, CellField::Content, content);
        self.set_cell_field(address, CellField::DataType, datatype.as_str());
        stored
    }

    /// Populated cells of rows `from..=to` on `sheet`, row-major
    pub fn cells_in_rows(&self, sheet: &str, from: i64, to: i64) -> Vec<&Cell> {
        self.worksheet(sheet)
            .map(|ws| ws.cells_in_rows(from, to))
            .unwrap_or_default()
    }

    /// Populated cells of columns `from..=to` on `sheet`, row-major
    pub fn cells_in_columns(&self, sheet: &str, from: i64, to: i64) -> Vec<&Cell> {
        self.worksheet(sheet)
            .map(|ws| ws.cells_in_columns(from, to))
            .unwrap_or_default()
    }

    /// Every formula cell, sheet by sheet, row-major within a sheet
    pub fn formula_cells(&self) -> impl Iterator<Item = &Cell> {
        self.worksheets.iter().flat_map(|ws| ws.formula_cells())
    }

    // === Names ===

    /// Declare `name` for the cell at `address`
    pub fn define_named_cell(&mut self, name: &str, address: CellAddress) {
        self.named_cells.define(name, address);
    }

    /// Append a named range definition
    pub fn define_named_range(&mut self, name: &str, refers_to: &str) {
        self.named_ranges.push(NamedRange::new(name, refers_to));
    }

    /// The single cell a named cell refers to
    pub fn get_named_cell(&self, name: &str) -> Result<&CellAddress> {
        self.named_cells.get(name)
    }

    /// The `refers_to` text of a named range
    pub fn get_named_range(&self, name: &str) -> Result<&str> {
        self.named_range(name)
            .map(|nr| nr.refers_to.as_str())
            .ok_or_else(|| Error::UnknownName {
                name: name.to_string(),
            })
    }

    /// The named range definition for `name`, if any
    pub fn named_range(&self, name: &str) -> Option<&NamedRange> {
        self.named_ranges.get(name)
    }

    /// All named cells
    pub fn named_cells(&self) -> &NamedCells {
        &self.named_cells
    }

    /// All named ranges
    pub fn named_ranges(&self) -> &NamedRanges {
        &self.named_ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(sheet: &str, row: i64, column: i64) -> CellAddress {
        CellAddress::new(sheet, row, column)
    }

    fn sample() -> Workbook {
        let mut wb = Workbook::new();
        wb.set_literal(&addr("Input", 1, 1), "10", DataType::Number);
        wb.set_literal(&addr("Input", 2, 1), "20", DataType::Number);
        wb.set_formula(&addr("Calc", 1, 2), "=Input!A1+Input!A2");
        wb.set_formula(&addr("Input", 3, 1), "=R[-2]C+R[-1]C");
        wb
    }

    #[test]
    fn test_get_cell() {
        let wb = sample();
        let cell = wb.get_cell(&addr("Input", 2, 1)).unwrap();
        assert_eq!(cell.content(), Some("20"));
        assert_eq!(cell.datatype(), DataType::Number);
        assert!(!cell.is_formula());
    }

    #[test]
    fn test_missing_worksheet() {
        let wb = sample();
        let err = wb.get_cell(&addr("Nope", 1, 1)).unwrap_err();
        assert_eq!(
            err,
            Error::CellNotFound {
                address: addr("Nope", 1, 1),
                missing: Missing::Worksheet("Nope".into()),
            }
        );
        assert!(err.to_string().contains("worksheet 'Nope'"));
    }

    #[test]
    fn test_missing_column_then_row() {
        let wb = sample();
        assert!(matches!(
            wb.get_cell(&addr("Input", 1, 7)),
            Err(Error::CellNotFound {
                missing: Missing::Column(_),
                ..
            })
        ));
        assert!(matches!(
            wb.get_cell(&addr("Input", 9, 1)),
            Err(Error::CellNotFound {
                missing: Missing::Row(9),
                ..
            })
        ));
    }

    #[test]
    fn test_first_write_wins() {
        let mut wb = Workbook::new();
        let a1 = addr("Sheet1", 1, 1);
        assert!(wb.set_cell_field(&a1, CellField::Content, "first"));
        assert!(!wb.set_cell_field(&a1, CellField::Content, "second"));
        assert_eq!(wb.get_cell(&a1).unwrap().content(), Some("first"));
    }

    #[test]
    fn test_worksheets_keep_first_write_order() {
        let wb = sample();
        let names: Vec<&str> = wb.worksheets().map(|ws| ws.name()).collect();
        assert_eq!(names, vec!["Input", "Calc"]);
        assert_eq!(wb.sheet_count(), 2);
        assert!(wb.worksheet("Calc").is_some());
        assert!(wb.worksheet("calc").is_none());
    }

    #[test]
    fn test_formula_cells_order() {
        let wb = sample();
        let formulas: Vec<String> = wb
            .formula_cells()
            .map(|c| c.address().to_string())
            .collect();
        assert_eq!(formulas, vec!["Input!A3", "Calc!B1"]);
    }

    #[test]
    fn test_cells_in_rows_unknown_sheet_is_empty() {
        let wb = sample();
        assert!(wb.cells_in_rows("Nope", 1, 5).is_empty());
        assert_eq!(wb.cells_in_columns("Input", 1, 1).len(), 3);
    }

    #[test]
    fn test_cells_in_rows_reversed_bounds() {
        let wb = sample();
        assert_eq!(wb.cells_in_rows("Input", 5, 1).len(), 3);
        assert_eq!(wb.cells_in_columns("Calc", 9, 1).len(), 1);
    }

    #[test]
    fn test_named_cells() {
        let mut wb = sample();
        wb.define_named_cell("Base", addr("Input", 1, 1));
        assert_eq!(wb.get_named_cell("base").unwrap(), &addr("Input", 1, 1));

        wb.define_named_cell("Twice", addr("Input", 1, 1));
        wb.define_named_cell("Twice", addr("Input", 2, 1));
        assert_eq!(
            wb.get_named_cell("Twice"),
            Err(Error::AmbiguousName {
                name: "Twice".into(),
                count: 2
            })
        );
    }

    #[test]
    fn test_named_ranges() {
        let mut wb = sample();
        wb.define_named_range("inputs", "=Input!R1C1:R2C1");
        wb.define_named_range("inputs", "=Input!R9C9");

        assert_eq!(wb.get_named_range("INPUTS").unwrap(), "=Input!R1C1:R2C1");
        assert_eq!(
            wb.get_named_range("other"),
            Err(Error::UnknownName {
                name: "other".into()
            })
        );
        assert_eq!(wb.named_ranges().len(), 2);
    }

    #[test]
    fn test_source_identity() {
        let mut wb = Workbook::new();
        assert_eq!(wb.source(), None);
        wb.set_source("model.xml");
        assert_eq!(wb.source(), Some("model.xml"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let mut wb = sample();
        wb.define_named_cell("Base", addr("Input", 1, 1));
        wb.define_named_range("inputs", "=Input!R1C1:R2C1");
        wb.set_source("model.xml");

        let json = serde_json::to_string(&wb).unwrap();
        let back: Workbook = serde_json::from_str(&json).unwrap();

        assert_eq!(back.source(), Some("model.xml"));
        assert_eq!(
            back.get_cell(&addr("Calc", 1, 2)).unwrap().formula(),
            Some("=Input!A1+Input!A2")
        );
        assert_eq!(back.get_named_cell("Base").unwrap(), &addr("Input", 1, 1));
        assert_eq!(back.get_named_range("inputs").unwrap(), "=Input!R1C1:R2C1");
    }
}
