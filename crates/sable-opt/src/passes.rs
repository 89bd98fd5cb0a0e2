//! Rewriting passes driven by the data-flow analyzer.
//!
//! - [`Rematerialiser`]: replace a variable by its known literal value or by
//!   the variable it is a copy of, if that variable is in scope
//! - [`LoadResolver`]: replace `sload(x)` by the variable known to be stored
//!   at slot `x`
//!
//! Passes are [`DataFlowHooks`] and compose as tuples:
//! `run_pass(&mut (Rematerialiser::new(), LoadResolver::new()), &dialect, &mut block)`.

use crate::data_flow::{DataFlowAnalyzer, DataFlowHooks};
use crate::error::OptResult;
use crate::simplify::as_operation;
use sable_ast::{Block, Expression, Identifier, Instruction, Literal};
use sable_dialect::Dialect;
use tracing::trace;

/// Run `pass` over `block` with a fresh analyzer.
pub fn run_pass<H: DataFlowHooks>(pass: &mut H, dialect: &dyn Dialect, block: &mut Block) -> OptResult<()> {
    DataFlowAnalyzer::new(dialect).run_with(block, pass)
}

/// Constant and copy propagation.
#[derive(Debug, Default)]
pub struct Rematerialiser {
    replaced: usize,
}

impl Rematerialiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers replaced so far.
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

impl DataFlowHooks for Rematerialiser {
    fn rewrite_expression(&mut self, expr: &mut Expression, flow: &DataFlowAnalyzer<'_>) -> OptResult<()> {
        let ident = match expr {
            Expression::Identifier(ident) => ident,
            _ => return Ok(()),
        };
        let replacement = match flow.value_of(&ident.name) {
            Some(Expression::Literal(literal)) => Expression::Literal(Literal {
                span: ident.span,
                ..literal.clone()
            }),
            Some(Expression::Identifier(copied)) if flow.in_scope(&copied.name) => {
                Expression::Identifier(Identifier {
                    name: copied.name.clone(),
                    span: ident.span,
                })
            }
            _ => return Ok(()),
        };
        trace!("rematerialise {} => {}", ident.name, replacement);
        *expr = replacement;
        self.replaced += 1;
        Ok(())
    }
}

/// Redundant storage load elimination.
#[derive(Debug, Default)]
pub struct LoadResolver {
    resolved: usize,
}

impl LoadResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loads replaced so far.
    pub fn resolved(&self) -> usize {
        self.resolved
    }
}

impl DataFlowHooks for LoadResolver {
    fn rewrite_expression(&mut self, expr: &mut Expression, flow: &DataFlowAnalyzer<'_>) -> OptResult<()> {
        let slot = match as_operation(expr, flow.dialect()) {
            Some((Instruction::SLoad, [Expression::Identifier(slot)])) => slot.name.clone(),
            _ => return Ok(()),
        };
        let value = match flow.storage_value(&slot) {
            Some(value) if flow.in_scope(value) => value.clone(),
            _ => return Ok(()),
        };
        trace!("sload({}) resolved to {}", slot, value);
        let span = expr.span();
        *expr = Expression::Identifier(Identifier { name: value, span });
        self.resolved += 1;
        Ok(())
    }
}
