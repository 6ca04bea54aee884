//! Cell record types

use std::fmt;

use super::CellAddress;

/// Declared type of a cell's literal content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    Number,
    String,
    Boolean,
    Error,
    #[default]
    Unspecified,
}

impl DataType {
    /// Parse a SpreadsheetML `ss:Type` value; unknown types are `Unspecified`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => DataType::Number,
            "string" => DataType::String,
            "boolean" => DataType::Boolean,
            "error" => DataType::Error,
            _ => DataType::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Number => "Number",
            DataType::String => "String",
            DataType::Boolean => "Boolean",
            DataType::Error => "Error",
            DataType::Unspecified => "Unspecified",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spreadsheet error values (#VALUE!, #REF!, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorValue {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
}

impl ErrorValue {
    /// Every error value, in display order
    pub const ALL: [ErrorValue; 7] = [
        ErrorValue::Null,
        ErrorValue::Div0,
        ErrorValue::Value,
        ErrorValue::Ref,
        ErrorValue::Name,
        ErrorValue::Num,
        ErrorValue::Na,
    ];

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorValue::Null => "#NULL!",
            ErrorValue::Div0 => "#DIV/0!",
            ErrorValue::Value => "#VALUE!",
            ErrorValue::Ref => "#REF!",
            ErrorValue::Name => "#NAME?",
            ErrorValue::Num => "#NUM!",
            ErrorValue::Na => "#N/A",
        }
    }

    /// Parse an error string
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.to_ascii_uppercase();
        Self::ALL.into_iter().find(|e| e.as_str() == upper)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field of a cell record that ingestion can set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellField {
    Formula,
    Content,
    DataType,
}

/// A cell in the workbook store
///
/// A cell holding formula text is a *formula cell*; any other cell is a
/// *literal cell* whose `content` is the value as ingested.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    address: CellAddress,
    formula: Option<String>,
    content: Option<String>,
    datatype: Option<DataType>,
}

impl Cell {
    /// Create an empty cell record at the given address
    pub fn new(address: CellAddress) -> Self {
        Self {
            address,
            formula: None,
            content: None,
            datatype: None,
        }
    }

    /// Create a literal cell
    pub fn literal(address: CellAddress, content: impl Into<String>, datatype: DataType) -> Self {
        Self {
            address,
            formula: None,
            content: Some(content.into()),
            datatype: Some(datatype),
        }
    }

    /// Create a formula cell
    pub fn with_formula(address: CellAddress, formula: impl Into<String>) -> Self {
        Self {
            address,
            formula: Some(formula.into()),
            content: None,
            datatype: None,
        }
    }

    pub fn address(&self) -> &CellAddress {
        &self.address
    }

    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Declared datatype, `Unspecified` when ingestion never set one
    pub fn datatype(&self) -> DataType {
        self.datatype.unwrap_or_default()
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Set a field unless it is already set.
    ///
    /// Returns `true` if the value was stored. The first write always wins.
    pub fn set_field(&mut self, field: CellField, value: &str) -> bool {
        match field {
            CellField::Formula if self.formula.is_none() => {
                self.formula = Some(value.to_string());
                true
            }
            CellField::Content if self.content.is_none() => {
                self.content = Some(value.to_string());
                true
            }
            CellField::DataType if self.datatype.is_none() => {
                self.datatype = Some(DataType::parse(value));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datatype_parse() {
        assert_eq!(DataType::parse("Number"), DataType::Number);
        assert_eq!(DataType::parse("string"), DataType::String);
        assert_eq!(DataType::parse("Boolean"), DataType::Boolean);
        assert_eq!(DataType::parse("Error"), DataType::Error);
        assert_eq!(DataType::parse("DateTime"), DataType::Unspecified);
    }

    #[test]
    fn test_error_value_parse() {
        assert_eq!(ErrorValue::parse("#N/A"), Some(ErrorValue::Na));
        assert_eq!(ErrorValue::parse("#div/0!"), Some(ErrorValue::Div0));
        assert_eq!(ErrorValue::parse("#NOPE"), None);
        assert_eq!(ErrorValue::Ref.to_string(), "#REF!");
    }

    #[test]
    fn test_first_write_wins() {
        let mut cell = Cell::new(CellAddress::new("Sheet1", 1, 1));

        assert!(cell.set_field(CellField::Formula, "=R[1]C"));
        assert!(!cell.set_field(CellField::Formula, "=R[2]C"));
        assert_eq!(cell.formula(), Some("=R[1]C"));

        assert!(cell.set_field(CellField::Content, "3"));
        assert!(!cell.set_field(CellField::Content, "4"));
        assert_eq!(cell.content(), Some("3"));

        assert_eq!(cell.datatype(), DataType::Unspecified);
        assert!(cell.set_field(CellField::DataType, "Number"));
        assert!(!cell.set_field(CellField::DataType, "String"));
        assert_eq!(cell.datatype(), DataType::Number);
    }

    #[test]
    fn test_formula_vs_literal() {
        let addr = CellAddress::new("Sheet1", 2, 3);
        assert!(Cell::with_formula(addr.clone(), "=1+1").is_formula());
        assert!(!Cell::literal(addr, "x", DataType::String).is_formula());
    }
}
