//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{column_to_name, Cell, CellAddress, CellField};
use crate::error::{Error, Missing, Result};

/// A worksheet: column → row → cell
///
/// Storage is sparse. Only cells that ingestion touched exist.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Cells keyed by column, then row
    columns: BTreeMap<i64, BTreeMap<i64, Cell>>,
}

impl Worksheet {
    /// Create a new, empty worksheet
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    // === Cell Access ===

    /// Get the cell at a row and column, reporting which level was missing
    pub fn get(&self, row: i64, column: i64) -> Result<&Cell> {
        let address = || CellAddress::new(self.name.clone(), row, column);

        let rows = self.columns.get(&column).ok_or_else(|| Error::CellNotFound {
            address: address(),
            missing: Missing::Column(
                column_to_name(column).unwrap_or_else(|_| column.to_string()),
            ),
        })?;

        rows.get(&row).ok_or_else(|| Error::CellNotFound {
            address: address(),
            missing: Missing::Row(row),
        })
    }

    /// Get the cell at a row and column, if present
    pub fn cell_at(&self, row: i64, column: i64) -> Option<&Cell> {
        self.columns.get(&column).and_then(|rows| rows.get(&row))
    }

    /// Set one field of a cell, creating the cell if needed.
    ///
    /// First write wins: returns `false` when the field was already set.
    pub fn set_field(&mut self, row: i64, column: i64, field: CellField, value: &str) -> bool {
        let name = &self.name;
        self.columns
            .entry(column)
            .or_default()
            .entry(row)
            .or_insert_with(|| Cell::new(CellAddress::new(name.clone(), row, column)))
            .set_field(field, value)
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.columns.values().map(BTreeMap::len).sum()
    }

    /// All cells in row-major order
    pub fn cells(&self) -> Vec<&Cell> {
        let mut cells: Vec<&Cell> = self.columns.values().flat_map(|rows| rows.values()).collect();
        cells.sort_by_key(|c| (c.address().row, c.address().column));
        cells
    }

    /// Populated cells of rows `from..=to` (either order), row-major
    pub fn cells_in_rows(&self, from: i64, to: i64) -> Vec<&Cell> {
        let (first, last) = (from.min(to), from.max(to));
        let mut cells: Vec<&Cell> = self
            .columns
            .values()
            .flat_map(|rows| rows.range(first..=last).map(|(_, cell)| cell))
            .collect();
        cells.sort_by_key(|c| (c.address().row, c.address().column));
        cells
    }

    /// Populated cells of columns `from..=to` (either order), row-major
    pub fn cells_in_columns(&self, from: i64, to: i64) -> Vec<&Cell> {
        let (first, last) = (from.min(to), from.max(to));
        let mut cells: Vec<&Cell> = self
            .columns
            .range(first..=last)
            .flat_map(|(_, rows)| rows.values())
            .collect();
        cells.sort_by_key(|c| (c.address().row, c.address().column));
        cells
    }

    /// Formula cells in row-major order
    pub fn formula_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells().into_iter().filter(|c| c.is_formula())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Worksheet {
        let mut ws = Worksheet::new("Sheet1");
        for (row, column) in [(1, 1), (1, 3), (2, 2), (3, 1), (5, 3)] {
            ws.set_field(row, column, CellField::Content, "x");
        }
        ws.set_field(2, 2, CellField::Formula, "=R[-1]C[-1]");
        ws
    }

    #[test]
    fn test_get_reports_missing_level() {
        let ws = sheet();
        assert!(ws.get(1, 1).is_ok());

        match ws.get(1, 4) {
            Err(Error::CellNotFound { missing, .. }) => {
                assert_eq!(missing, Missing::Column("D".into()))
            }
            other => panic!("expected missing column, got {:?}", other),
        }

        match ws.get(4, 1) {
            Err(Error::CellNotFound { missing, address }) => {
                assert_eq!(missing, Missing::Row(4));
                assert_eq!(address, CellAddress::new("Sheet1", 4, 1));
            }
            other => panic!("expected missing row, got {:?}", other),
        }
    }

    #[test]
    fn test_get_invalid_column_is_missing_column() {
        let ws = sheet();
        match ws.get(1, 0) {
            Err(Error::CellNotFound { missing, .. }) => {
                assert_eq!(missing, Missing::Column("0".into()))
            }
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_cells_row_major() {
        let ws = sheet();
        let order: Vec<(i64, i64)> = ws
            .cells()
            .iter()
            .map(|c| (c.address().row, c.address().column))
            .collect();
        assert_eq!(order, vec![(1, 1), (1, 3), (2, 2), (3, 1), (5, 3)]);
        assert_eq!(ws.cell_count(), 5);
    }

    #[test]
    fn test_cells_in_rows_and_columns() {
        let ws = sheet();

        let rows: Vec<(i64, i64)> = ws
            .cells_in_rows(1, 2)
            .iter()
            .map(|c| (c.address().row, c.address().column))
            .collect();
        assert_eq!(rows, vec![(1, 1), (1, 3), (2, 2)]);

        let cols: Vec<(i64, i64)> = ws
            .cells_in_columns(3, 3)
            .iter()
            .map(|c| (c.address().row, c.address().column))
            .collect();
        assert_eq!(cols, vec![(1, 3), (5, 3)]);
    }

    #[test]
    fn test_reversed_bounds_cover_the_same_cells() {
        let ws = sheet();
        let positions = |cells: Vec<&Cell>| -> Vec<(i64, i64)> {
            cells
                .iter()
                .map(|c| (c.address().row, c.address().column))
                .collect()
        };

        assert_eq!(positions(ws.cells_in_rows(5, 1)), positions(ws.cells_in_rows(1, 5)));
        assert_eq!(positions(ws.cells_in_rows(2, 1)), vec![(1, 1), (1, 3), (2, 2)]);
        assert_eq!(positions(ws.cells_in_columns(3, 2)), vec![(1, 3), (2, 2), (5, 3)]);
    }

    #[test]
    fn test_formula_cells() {
        let ws = sheet();
        let formulas: Vec<_> = ws.formula_cells().collect();
        assert_eq!(formulas.len(), 1);
        assert_eq!(formulas[0].formula(), Some("=R[-1]C[-1]"));
    }
}
