//! Workbook-level formula resolution
//!
//! Resolves many root cells against one workbook, collecting per-root
//! outcomes, summary statistics and the dependency graph between cells.
//!
//! # Example
//!
//! ```rust
//! use sheetwalk::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! workbook.set_literal(&CellAddress::new("Sheet1", 1, 1), "10", DataType::Number);
//! workbook.set_literal(&CellAddress::new("Sheet1", 2, 1), "20", DataType::Number);
//! workbook.set_formula(&CellAddress::new("Sheet1", 3, 1), "=A1+A2");
//!
//! let report = workbook.resolve_formula_cells(&BatchOptions::default()).unwrap();
//! assert_eq!(report.stats.succeeded, 1);
//! ```

use sheetwalk_core::{CellAddress, Workbook};
use sheetwalk_formula::{
    DependencyGraph, FormulaError, FormulaResult, Resolution, ResolveOptions, ResolvedValue,
    Resolver,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Options for batch resolution
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Limits applied to each root's resolution
    pub resolve: ResolveOptions,
    /// Record failures and carry on (default), or stop at the first one
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            resolve: ResolveOptions::default(),
            continue_on_error: true,
        }
    }
}

/// Statistics from a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Number of root cells requested
    pub roots: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Cells entered across all successful roots (repeats included)
    pub cells_visited: usize,
    /// Failures that were circular references
    pub circular_references: usize,
    /// Failures raised by a traversal guard, circular references included
    pub guard_failures: usize,
}

/// What happened to one root cell
#[derive(Debug, Clone)]
pub struct RootOutcome {
    pub address: CellAddress,
    pub result: FormulaResult<Resolution>,
}

/// Result of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One outcome per root, in the order the roots were given
    pub outcomes: Vec<RootOutcome>,
    pub stats: ResolutionStats,
    /// Edges gathered from the successful roots
    pub graph: DependencyGraph,
}

impl BatchReport {
    /// Outcome for `address`, if it was one of the roots
    pub fn get(&self, address: &CellAddress) -> Option<&RootOutcome> {
        self.outcomes.iter().find(|o| &o.address == address)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&CellAddress, &FormulaError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.address, e)))
    }
}

/// Extension trait for Workbook to add resolution methods
pub trait WorkbookResolveExt {
    /// Resolve a single cell with the built-in functions and default options
    fn resolve_address(&self, address: &CellAddress) -> FormulaResult<ResolvedValue>;

    /// Resolve each of `addresses`
    fn resolve_roots(
        &self,
        addresses: &[CellAddress],
        options: &BatchOptions,
    ) -> FormulaResult<BatchReport>;

    /// Resolve every formula cell in the workbook, sheet by sheet
    fn resolve_formula_cells(&self, options: &BatchOptions) -> FormulaResult<BatchReport>;
}

impl WorkbookResolveExt for Workbook {
    fn resolve_address(&self, address: &CellAddress) -> FormulaResult<ResolvedValue> {
        Resolver::new(self).resolve_address(address)
    }

    fn resolve_roots(
        &self,
        addresses: &[CellAddress],
        options: &BatchOptions,
    ) -> FormulaResult<BatchReport> {
        let resolver = Resolver::new(self).with_options(options.resolve.clone());
        let results = resolve_each(&resolver, addresses, options.continue_on_error);
        build_report(addresses, results, options.continue_on_error)
    }

    fn resolve_formula_cells(&self, options: &BatchOptions) -> FormulaResult<BatchReport> {
        let roots: Vec<CellAddress> = self
            .formula_cells()
            .map(|cell| cell.address().clone())
            .collect();
        self.resolve_roots(&roots, options)
    }
}

#[cfg(not(feature = "parallel"))]
fn resolve_each(
    resolver: &Resolver<'_>,
    addresses: &[CellAddress],
    continue_on_error: bool,
) -> Vec<FormulaResult<Resolution>> {
    let mut results = Vec::with_capacity(addresses.len());
    for address in addresses {
        let result = resolver.resolve_address_with_trace(address);
        let failed = result.is_err();
        results.push(result);
        if failed && !continue_on_error {
            break;
        }
    }
    results
}

/// One traversal per root, fanned out over the rayon pool
#[cfg(feature = "parallel")]
fn resolve_each(
    resolver: &Resolver<'_>,
    addresses: &[CellAddress],
    _continue_on_error: bool,
) -> Vec<FormulaResult<Resolution>> {
    addresses
        .par_iter()
        .map(|address| resolver.resolve_address_with_trace(address))
        .collect()
}

fn build_report(
    addresses: &[CellAddress],
    results: Vec<FormulaResult<Resolution>>,
    continue_on_error: bool,
) -> FormulaResult<BatchReport> {
    let mut report = BatchReport {
        stats: ResolutionStats {
            roots: addresses.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for (address, result) in addresses.iter().zip(results) {
        match &result {
            Ok(resolution) => {
                report.stats.succeeded += 1;
                report.stats.cells_visited += resolution.visited.len();
                report.graph.record(address, &resolution.value);
            }
            Err(e) => {
                if !continue_on_error {
                    return Err(e.clone());
                }
                report.stats.failed += 1;
                if matches!(e, FormulaError::CircularReference { .. }) {
                    report.stats.circular_references += 1;
                }
                if e.is_guard() {
                    report.stats.guard_failures += 1;
                }
                tracing::warn!(cell = %address, error = %e, "failed to resolve cell");
            }
        }
        report.outcomes.push(RootOutcome {
            address: address.clone(),
            result,
        });
    }

    tracing::info!(
        roots = report.stats.roots,
        succeeded = report.stats.succeeded,
        failed = report.stats.failed,
        cells_visited = report.stats.cells_visited,
        circular_references = report.stats.circular_references,
        guard_failures = report.stats.guard_failures,
        dependent_cells = report.graph.len(),
        "batch resolution finished"
    );

    Ok(report)
}
