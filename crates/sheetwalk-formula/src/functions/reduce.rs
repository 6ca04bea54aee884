//! MAX and MIN
//!
//! These resolve to a [`ReductionPlan`] instead of a plain call: every
//! argument is resolved, ranges are opened up into their member cells, and
//! the resulting operands are laid out as an accumulate-and-compare sequence.

use super::FunctionHandler;
use crate::ast::Expr;
use crate::error::FormulaResult;
use crate::resolver::ResolveContext;
use crate::value::{Comparison, ReductionPlan, ResolvedValue};

#[derive(Debug, Clone, Copy)]
pub struct Extremum {
    comparison: Comparison,
}

impl Extremum {
    pub fn new(comparison: Comparison) -> Self {
        Self { comparison }
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

impl FunctionHandler for Extremum {
    fn resolve(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &mut ResolveContext<'_>,
    ) -> FormulaResult<ResolvedValue> {
        let mut operands = Vec::with_capacity(args.len());
        for arg in args {
            operands.extend(ctx.resolve(arg)?.flatten());
        }

        tracing::trace!(
            function = name,
            operands = operands.len(),
            cell = %ctx.cursor(),
            "building reduction plan"
        );

        Ok(ResolvedValue::Reduction(ReductionPlan::new(
            name.to_ascii_uppercase(),
            self.comparison,
            operands,
        )))
    }
}
