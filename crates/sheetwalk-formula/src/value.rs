//! Resolution results

use std::fmt;
use std::sync::Arc;

use sheetwalk_core::{CellAddress, DataType, ErrorValue};

use crate::ast::BinaryOperator;
use crate::error::LexicalError;

/// What a formula, or a piece of one, resolved to
///
/// Nothing here is evaluated: operators and calls record their resolved
/// operands, and cell references are replaced by what the cell holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// A cell without a formula
    Literal {
        address: CellAddress,
        content: Option<String>,
        datatype: DataType,
    },
    Number(f64),
    String(String),
    Boolean(bool),
    Error(ErrorValue),
    /// A range member the store does not hold
    Blank { address: CellAddress },
    /// A formula cell reached by reference, with its resolved body
    ///
    /// The body is shared by every reference to the cell within one
    /// resolution.
    Formula {
        address: CellAddress,
        formula: String,
        value: Arc<ResolvedValue>,
    },
    /// Range members in row-major order
    Range(Vec<ResolvedValue>),
    Call {
        function: String,
        args: Vec<ResolvedValue>,
    },
    Operation {
        op: BinaryOperator,
        operands: Vec<ResolvedValue>,
    },
    Negate(Box<ResolvedValue>),
    Array(Vec<Vec<ResolvedValue>>),
    /// A named cell or named range and what it resolved to
    Named {
        name: String,
        value: Box<ResolvedValue>,
    },
    Reduction(ReductionPlan),
}

impl ResolvedValue {
    /// The cell this value was read from, if it stands for a single cell
    pub fn address(&self) -> Option<&CellAddress> {
        match self {
            ResolvedValue::Literal { address, .. }
            | ResolvedValue::Blank { address }
            | ResolvedValue::Formula { address, .. } => Some(address),
            ResolvedValue::Named { value, .. } => value.address(),
            _ => None,
        }
    }

    /// Replace a range with its members; anything else is returned as is
    pub fn flatten(self) -> Vec<ResolvedValue> {
        match self {
            ResolvedValue::Range(cells) => cells,
            ResolvedValue::Named { value, .. } if matches!(*value, ResolvedValue::Range(_)) => {
                value.flatten()
            }
            other => vec![other],
        }
    }

    /// Addresses of every cell this value depends on directly, in order
    pub fn cell_addresses(&self) -> Vec<&CellAddress> {
        let mut out = Vec::new();
        self.collect_addresses(&mut out);
        out
    }

    fn collect_addresses<'a>(&'a self, out: &mut Vec<&'a CellAddress>) {
        match self {
            ResolvedValue::Literal { address, .. }
            | ResolvedValue::Blank { address }
            | ResolvedValue::Formula { address, .. } => out.push(address),
            ResolvedValue::Range(items) => items.iter().for_each(|v| v.collect_addresses(out)),
            ResolvedValue::Call { args, .. } => args.iter().for_each(|v| v.collect_addresses(out)),
            ResolvedValue::Operation { operands, .. } => {
                operands.iter().for_each(|v| v.collect_addresses(out))
            }
            ResolvedValue::Negate(inner) => inner.collect_addresses(out),
            ResolvedValue::Array(rows) => rows
                .iter()
                .flatten()
                .for_each(|v| v.collect_addresses(out)),
            ResolvedValue::Named { value, .. } => value.collect_addresses(out),
            ResolvedValue::Reduction(plan) => plan
                .operands
                .iter()
                .for_each(|o| o.value.collect_addresses(out)),
            ResolvedValue::Number(_)
            | ResolvedValue::String(_)
            | ResolvedValue::Boolean(_)
            | ResolvedValue::Error(_) => {}
        }
    }
}

/// Comparison a reduction keeps the winner of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Keep the larger (MAX)
    Greater,
    /// Keep the smaller (MIN)
    Less,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
        }
    }
}

/// One operand of a reduction and the variable it is known by
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionOperand {
    pub var: String,
    pub value: ResolvedValue,
}

/// An accumulate-and-compare plan for MAX/MIN
///
/// The first operand seeds the accumulator; every later operand is compared
/// against it and replaces it when the comparison holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionPlan {
    pub function: String,
    pub comparison: Comparison,
    pub accumulator: String,
    pub operands: Vec<ReductionOperand>,
}

impl ReductionPlan {
    pub fn new(function: impl Into<String>, comparison: Comparison, values: Vec<ResolvedValue>) -> Self {
        let function = function.into();
        let accumulator = match comparison {
            Comparison::Greater => "tempMax",
            Comparison::Less => "tempMin",
        }
        .to_string();
        let operands = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| ReductionOperand {
                var: operand_var(&value, i),
                value,
            })
            .collect();

        Self {
            function,
            comparison,
            accumulator,
            operands,
        }
    }

    /// The operand that seeds the accumulator
    pub fn seed(&self) -> Option<&ReductionOperand> {
        self.operands.first()
    }

    /// Operands compared against the accumulator, in order
    pub fn comparisons(&self) -> &[ReductionOperand] {
        self.operands.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for ReductionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(seed) = self.seed() {
            writeln!(f, "{} = {};", self.accumulator, seed.var)?;
        }
        for operand in self.comparisons() {
            writeln!(
                f,
                "if ({} {} {}) {{ {} = {}; }}",
                operand.var,
                self.comparison.as_str(),
                self.accumulator,
                self.accumulator,
                operand.var
            )?;
        }
        Ok(())
    }
}

fn operand_var(value: &ResolvedValue, index: usize) -> String {
    if let Some(address) = value.address() {
        return address.var_name();
    }
    match value {
        ResolvedValue::Number(n) => n.to_string(),
        ResolvedValue::String(s) => format!("{:?}", s),
        ResolvedValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        ResolvedValue::Error(e) => e.to_string(),
        _ => format!("arg{}", index),
    }
}

/// A resolved value together with the trail the traversal left
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: ResolvedValue,
    /// Function names in the order they were entered. A formula cell is
    /// expanded once, so its calls are listed once.
    pub calls: Vec<String>,
    /// Every cell entered, in order (repeats included). A formula cell
    /// reached again is listed again without its precedents.
    pub visited: Vec<CellAddress>,
    /// Characters skipped while tokenizing any formula on the way
    pub diagnostics: Vec<LexicalError>,
    /// Literal cells reached, each once, in first-reached order
    pub literals: Vec<CellAddress>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn literal(row: i64) -> ResolvedValue {
        ResolvedValue::Literal {
            address: CellAddress::new("Sheet1", row, 2),
            content: Some(row.to_string()),
            datatype: DataType::Number,
        }
    }

    #[test]
    fn test_reduction_plan_rendering() {
        let plan = ReductionPlan::new(
            "MAX",
            Comparison::Greater,
            vec![literal(5), literal(6), ResolvedValue::Number(3.0)],
        );
        assert_eq!(
            plan.to_string(),
            "tempMax = Sheet1__B__5;\n\
             if (Sheet1__B__6 > tempMax) { tempMax = Sheet1__B__6; }\n\
             if (3 > tempMax) { tempMax = 3; }\n"
        );
        assert_eq!(plan.seed().map(|o| o.var.as_str()), Some("Sheet1__B__5"));
        assert_eq!(plan.comparisons().len(), 2);
    }

    #[test]
    fn test_min_plan_uses_less_than() {
        let plan = ReductionPlan::new("MIN", Comparison::Less, vec![literal(1), literal(2)]);
        assert_eq!(
            plan.to_string(),
            "tempMin = Sheet1__B__1;\nif (Sheet1__B__2 < tempMin) { tempMin = Sheet1__B__2; }\n"
        );
    }

    #[test]
    fn test_empty_plan_renders_nothing() {
        let plan = ReductionPlan::new("MAX", Comparison::Greater, vec![]);
        assert_eq!(plan.to_string(), "");
        assert!(plan.seed().is_none());
        assert!(plan.comparisons().is_empty());
    }

    #[test]
    fn test_flatten_and_addresses() {
        let range = ResolvedValue::Range(vec![literal(1), literal(2)]);
        let named = ResolvedValue::Named {
            name: "inputs".into(),
            value: Box::new(range.clone()),
        };
        assert_eq!(named.clone().flatten(), vec![literal(1), literal(2)]);
        assert_eq!(ResolvedValue::Number(1.0).flatten(), vec![ResolvedValue::Number(1.0)]);

        let call = ResolvedValue::Call {
            function: "SUM".into(),
            args: vec![named, literal(9)],
        };
        let rows: Vec<i64> = call.cell_addresses().iter().map(|a| a.row).collect();
        assert_eq!(rows, vec![1, 2, 9]);
    }
}
