//! Dependency tracking between resolved cells

use ahash::{AHashMap, AHashSet};
use sheetwalk_core::CellAddress;

use crate::value::ResolvedValue;

/// Precedent → dependent edges between cells
///
/// Built from resolutions: a formula cell depends on every cell its formula
/// refers to directly. Formula cells reached along the way contribute their
/// own edges.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellAddress, AHashSet<CellAddress>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: CellAddress, dependent: CellAddress) {
        self.dependents
            .entry(precedent.clone())
            .or_default()
            .insert(dependent.clone());
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Record the edges of `root`'s resolved value
    ///
    /// A literal root resolves to itself and records nothing. A formula cell
    /// reached more than once contributes its edges once.
    pub fn record(&mut self, root: &CellAddress, value: &ResolvedValue) {
        let mut recorded = AHashSet::new();
        self.record_cell(root, value, &mut recorded);
    }

    fn record_cell<'a>(
        &mut self,
        cell: &'a CellAddress,
        value: &'a ResolvedValue,
        recorded: &mut AHashSet<&'a CellAddress>,
    ) {
        if !recorded.insert(cell) {
            return;
        }

        for precedent in value.cell_addresses() {
            if precedent != cell {
                self.add_dependency(precedent.clone(), cell.clone());
            }
        }

        let mut nested = Vec::new();
        collect_formulas(value, &mut nested);
        for (address, inner) in nested {
            self.record_cell(address, inner, recorded);
        }
    }

    /// Cells that depend on the given cell, sorted
    pub fn get_dependents(&self, cell: &CellAddress) -> Vec<&CellAddress> {
        sorted(self.dependents.get(cell))
    }

    /// Cells the given cell depends on, sorted
    pub fn get_precedents(&self, cell: &CellAddress) -> Vec<&CellAddress> {
        sorted(self.precedents.get(cell))
    }

    /// Number of cells with at least one precedent
    pub fn len(&self) -> usize {
        self.precedents.values().filter(|p| !p.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge another graph's edges into this one
    pub fn extend(&mut self, other: DependencyGraph) {
        for (dependent, precedents) in other.precedents {
            for precedent in precedents {
                self.add_dependency(precedent, dependent.clone());
            }
        }
    }
}

fn sorted(set: Option<&AHashSet<CellAddress>>) -> Vec<&CellAddress> {
    let mut cells: Vec<&CellAddress> = set.into_iter().flatten().collect();
    cells.sort();
    cells
}

/// Nested formula cells directly inside `value` (not inside each other)
fn collect_formulas<'a>(value: &'a ResolvedValue, out: &mut Vec<(&'a CellAddress, &'a ResolvedValue)>) {
    match value {
        ResolvedValue::Formula { address, value, .. } => out.push((address, value.as_ref())),
        ResolvedValue::Range(items) => items.iter().for_each(|v| collect_formulas(v, out)),
        ResolvedValue::Call { args, .. } => args.iter().for_each(|v| collect_formulas(v, out)),
        ResolvedValue::Operation { operands, .. } => {
            operands.iter().for_each(|v| collect_formulas(v, out))
        }
        ResolvedValue::Negate(inner) => collect_formulas(inner, out),
        ResolvedValue::Array(rows) => rows.iter().flatten().for_each(|v| collect_formulas(v, out)),
        ResolvedValue::Named { value, .. } => collect_formulas(value, out),
        ResolvedValue::Reduction(plan) => plan
            .operands
            .iter()
            .for_each(|o| collect_formulas(&o.value, out)),
        ResolvedValue::Literal { .. }
        | ResolvedValue::Blank { .. }
        | ResolvedValue::Number(_)
        | ResolvedValue::String(_)
        | ResolvedValue::Boolean(_)
        | ResolvedValue::Error(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetwalk_core::DataType;
    use std::sync::Arc;

    fn cell(a1: &str) -> CellAddress {
        CellAddress::parse_a1("Sheet1", a1).unwrap()
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(cell("A1"), cell("B1"));

        assert_eq!(graph.get_dependents(&cell("A1")), vec![&cell("B1")]);
        assert_eq!(graph.get_precedents(&cell("B1")), vec![&cell("A1")]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_dependents_sorted_and_extend() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(cell("A1"), cell("C1"));
        graph.add_dependency(cell("A1"), cell("B1"));

        let mut other = DependencyGraph::new();
        other.add_dependency(cell("A1"), cell("B1"));
        other.add_dependency(cell("B1"), cell("D1"));
        graph.extend(other);

        assert_eq!(graph.get_dependents(&cell("A1")), vec![&cell("B1"), &cell("C1")]);
        assert_eq!(graph.get_precedents(&cell("D1")), vec![&cell("B1")]);
        assert_eq!(graph.len(), 3);
        assert!(graph.get_precedents(&cell("A1")).is_empty());
    }

    #[test]
    fn test_record_nested_formula() {
        let literal = |a1: &str| ResolvedValue::Literal {
            address: cell(a1),
            content: Some("1".into()),
            datatype: DataType::Number,
        };
        // A1 = B1 + C1, where B1 = D1
        let value = ResolvedValue::Operation {
            op: crate::ast::BinaryOperator::Add,
            operands: vec![
                ResolvedValue::Formula {
                    address: cell("B1"),
                    formula: "=D1".into(),
                    value: Arc::new(literal("D1")),
                },
                literal("C1"),
            ],
        };

        let mut graph = DependencyGraph::new();
        graph.record(&cell("A1"), &value);

        assert_eq!(graph.get_precedents(&cell("A1")), vec![&cell("B1"), &cell("C1")]);
        assert_eq!(graph.get_precedents(&cell("B1")), vec![&cell("D1")]);
        assert_eq!(graph.get_dependents(&cell("D1")), vec![&cell("B1")]);
    }

    #[test]
    fn test_record_shared_formula_once() {
        let shared = Arc::new(ResolvedValue::Literal {
            address: cell("C1"),
            content: Some("1".into()),
            datatype: DataType::Number,
        });
        let reference = ResolvedValue::Formula {
            address: cell("B1"),
            formula: "=C1".into(),
            value: Arc::clone(&shared),
        };
        // A1 = B1 + B1
        let value = ResolvedValue::Operation {
            op: crate::ast::BinaryOperator::Add,
            operands: vec![reference.clone(), reference],
        };

        let mut graph = DependencyGraph::new();
        graph.record(&cell("A1"), &value);

        assert_eq!(graph.get_precedents(&cell("A1")), vec![&cell("B1")]);
        assert_eq!(graph.get_precedents(&cell("B1")), vec![&cell("C1")]);
        assert_eq!(graph.len(), 2);
    }
}
