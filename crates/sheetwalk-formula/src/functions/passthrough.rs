//! Functions whose arguments are resolved as written

use super::FunctionHandler;
use crate::ast::Expr;
use crate::error::FormulaResult;
use crate::resolver::ResolveContext;
use crate::value::ResolvedValue;

/// Resolve every argument in order and keep them as the call's arguments
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl FunctionHandler for PassThrough {
    fn resolve(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &mut ResolveContext<'_>,
    ) -> FormulaResult<ResolvedValue> {
        Ok(ResolvedValue::Call {
            function: name.to_ascii_uppercase(),
            args: ctx.resolve_all(args)?,
        })
    }
}
