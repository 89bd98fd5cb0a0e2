//! Walkers that derive semantic facts from expressions and statements.
//!
//! - [`MovableChecker`]: movability, side-effect freedom, storage
//!   invalidation and referenced variables of one expression
//! - [`InvalidationChecker`]: could a block or expression invalidate storage
//! - [`TerminationFinder`]: where straight-line control flow first changes
//!
//! A call the dialect does not recognize is a user-defined function whose
//! body is not inspected. It is treated as non-movable, not side-effect free
//! and storage-invalidating.

use crate::error::{OptResult, OptimizerError};
use crate::walker::{walk_arguments, AstWalker};
use indexmap::IndexSet;
use sable_ast::{
    Block, Expression, ExpressionStatement, FunctionCall, FunctionalInstruction, Identifier,
    Name, Statement,
};
use sable_dialect::{Dialect, EffectFacts};

fn call_facts(dialect: &dyn Dialect, call: &FunctionCall) -> EffectFacts {
    dialect
        .call_facts(&call.function_name.name)
        .unwrap_or(EffectFacts::OPAQUE)
}

// ============================================================================
// Movable Checker
// ============================================================================

/// Effect facts and referenced variables of a single expression.
///
/// Requesting facts for a statement is an internal error.
pub struct MovableChecker<'d> {
    dialect: &'d dyn Dialect,
    referenced_variables: IndexSet<Name>,
    movable: bool,
    side_effect_free: bool,
    invalidates_storage: bool,
}

impl<'d> MovableChecker<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            referenced_variables: IndexSet::new(),
            movable: true,
            side_effect_free: true,
            invalidates_storage: false,
        }
    }

    /// Analyze `expr` in one go.
    pub fn analyze(dialect: &'d dyn Dialect, expr: &Expression) -> OptResult<Self> {
        let mut checker = Self::new(dialect);
        checker.visit_expression(expr)?;
        Ok(checker)
    }

    pub fn movable(&self) -> bool {
        self.movable
    }

    pub fn side_effect_free(&self) -> bool {
        self.side_effect_free
    }

    pub fn invalidates_storage(&self) -> bool {
        self.invalidates_storage
    }

    pub fn referenced_variables(&self) -> &IndexSet<Name> {
        &self.referenced_variables
    }

    fn fold(&mut self, facts: EffectFacts) {
        self.movable &= facts.movable;
        self.side_effect_free &= facts.side_effect_free;
        self.invalidates_storage |= facts.invalidates_storage;
    }
}

impl AstWalker for MovableChecker<'_> {
    fn visit_identifier(&mut self, identifier: &Identifier) -> OptResult<()> {
        self.referenced_variables.insert(identifier.name.clone());
        Ok(())
    }

    fn visit_function_call(&mut self, call: &FunctionCall) -> OptResult<()> {
        walk_arguments(self, &call.arguments)?;
        let facts = call_facts(self.dialect, call);
        self.fold(facts);
        Ok(())
    }

    fn visit_instruction(&mut self, instr: &FunctionalInstruction) -> OptResult<()> {
        walk_arguments(self, &instr.arguments)?;
        let facts = self.dialect.instruction_facts(instr.instruction);
        self.fold(facts);
        Ok(())
    }

    fn visit_statement(&mut self, stmt: &Statement) -> OptResult<()> {
        Err(OptimizerError::StatementInExpressionContext { span: stmt.span() })
    }

    fn visit_block(&mut self, block: &Block) -> OptResult<()> {
        Err(OptimizerError::StatementInExpressionContext { span: block.span })
    }
}

// ============================================================================
// Invalidation Checker
// ============================================================================

/// Answers whether some part of a block or expression might invalidate
/// storage.
///
/// Store builtins count as invalidating even if the dialect does not flag
/// them, so constructs containing a store nobody tracked always drop
/// storage knowledge.
pub struct InvalidationChecker<'d> {
    dialect: &'d dyn Dialect,
    invalidates: bool,
}

impl<'d> InvalidationChecker<'d> {
    pub fn block_invalidates_storage(dialect: &'d dyn Dialect, block: &Block) -> OptResult<bool> {
        let mut checker = Self {
            dialect,
            invalidates: false,
        };
        checker.visit_block(block)?;
        Ok(checker.invalidates)
    }

    pub fn expression_invalidates_storage(
        dialect: &'d dyn Dialect,
        expr: &Expression,
    ) -> OptResult<bool> {
        let mut checker = Self {
            dialect,
            invalidates: false,
        };
        checker.visit_expression(expr)?;
        Ok(checker.invalidates)
    }

    fn record(&mut self, facts: EffectFacts) {
        if facts.invalidates_storage || facts.is_store {
            self.invalidates = true;
        }
    }
}

impl AstWalker for InvalidationChecker<'_> {
    fn visit_function_call(&mut self, call: &FunctionCall) -> OptResult<()> {
        let facts = call_facts(self.dialect, call);
        self.record(facts);
        walk_arguments(self, &call.arguments)
    }

    fn visit_instruction(&mut self, instr: &FunctionalInstruction) -> OptResult<()> {
        let facts = self.dialect.instruction_facts(instr.instruction);
        self.record(facts);
        walk_arguments(self, &instr.arguments)
    }
}

// ============================================================================
// Termination Finder
// ============================================================================

/// How control leaves a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    /// Control may continue with the next statement.
    FlowOut,
    Break,
    Continue,
    Terminate,
}

/// Finds "irregular" control flow: termination, `break` and `continue`.
///
/// Only the static identity of a statement is inspected. `FlowOut` may be
/// reported for statements that never actually return.
pub struct TerminationFinder<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> TerminationFinder<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// The first statement that is an unconditional `break`, `continue` or
    /// call to a terminating builtin, with its index. `(FlowOut, None)` if
    /// control can reach the end of the list.
    pub fn first_unconditional_control_flow_change(
        &self,
        statements: &[Statement],
    ) -> (ControlFlow, Option<usize>) {
        statements
            .iter()
            .enumerate()
            .map(|(index, stmt)| (self.control_flow_kind(stmt), index))
            .find(|(kind, _)| *kind != ControlFlow::FlowOut)
            .map_or((ControlFlow::FlowOut, None), |(kind, index)| (kind, Some(index)))
    }

    pub fn control_flow_kind(&self, stmt: &Statement) -> ControlFlow {
        match stmt {
            Statement::ExpressionStatement(stmt) if self.is_terminating_builtin(stmt) => {
                ControlFlow::Terminate
            }
            Statement::Break(_) => ControlFlow::Break,
            Statement::Continue(_) => ControlFlow::Continue,
            _ => ControlFlow::FlowOut,
        }
    }

    /// Is the statement a direct call of a builtin like `stop`, `revert` or
    /// `return`?
    pub fn is_terminating_builtin(&self, stmt: &ExpressionStatement) -> bool {
        match &stmt.expression {
            Expression::Instruction(instr) => {
                self.dialect
                    .instruction_facts(instr.instruction)
                    .terminates_control_flow
            }
            Expression::FunctionCall(call) => self
                .dialect
                .call_facts(&call.function_name.name)
                .map_or(false, |facts| facts.terminates_control_flow),
            Expression::Literal(_) | Expression::Identifier(_) => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sable_ast::{Instruction, Span};
    use sable_dialect::{BuiltinFunction, EvmDialect};

    fn id(name: &str) -> Expression {
        Expression::identifier(name)
    }

    #[test]
    fn test_pure_expression_is_movable() {
        let dialect = EvmDialect::new();
        let expr = Expression::call("add", vec![id("a"), Expression::call("mul", vec![id("b"), id("a")])]);
        let checker = MovableChecker::analyze(&dialect, &expr).unwrap();
        assert!(checker.movable());
        assert!(checker.side_effect_free());
        assert!(!checker.invalidates_storage());
        let refs: Vec<&str> = checker.referenced_variables().iter().map(|n| n.as_str()).collect();
        assert_eq!(refs, vec!["a", "b"]);
    }

    #[test]
    fn test_sload_is_not_movable() {
        let dialect = EvmDialect::new();
        let expr = Expression::call("add", vec![Expression::call("sload", vec![id("x")]), Expression::number(1)]);
        let checker = MovableChecker::analyze(&dialect, &expr).unwrap();
        assert!(!checker.movable());
        assert!(checker.side_effect_free());
        assert!(!checker.invalidates_storage());
    }

    #[test]
    fn test_native_instruction_facts() {
        let dialect = EvmDialect::new();
        let expr = Expression::instruction(Instruction::Call, vec![Expression::number(0); 7]);
        let checker = MovableChecker::analyze(&dialect, &expr).unwrap();
        assert!(!checker.movable());
        assert!(!checker.side_effect_free());
        assert!(checker.invalidates_storage());
    }

    #[test]
    fn test_unrecognized_call_is_opaque() {
        let dialect = EvmDialect::new();
        let expr = Expression::call("add", vec![Expression::call("foo", vec![]), id("a")]);
        let checker = MovableChecker::analyze(&dialect, &expr).unwrap();
        assert!(!checker.movable());
        assert!(!checker.side_effect_free());
        assert!(checker.invalidates_storage());
    }

    #[test]
    fn test_facts_never_recover_within_one_visit() {
        let dialect = EvmDialect::new();
        let mut checker = MovableChecker::new(&dialect);
        checker.visit_expression(&Expression::call("foo", vec![])).unwrap();
        checker.visit_expression(&Expression::call("add", vec![id("a"), id("b")])).unwrap();
        assert!(!checker.movable());
        assert!(!checker.side_effect_free());
        assert!(checker.invalidates_storage());
    }

    #[test]
    fn test_statement_is_an_internal_error() {
        let dialect = EvmDialect::new();
        let mut checker = MovableChecker::new(&dialect);
        let err = checker.visit_statement(&Statement::Break(Span::new(3, 8))).unwrap_err();
        assert_eq!(err.tag(), "statement-in-expression-context");
        assert_eq!(err.span(), Some(Span::new(3, 8)));
    }

    #[test]
    fn test_invalidation_checker() {
        let dialect = EvmDialect::new();
        let pure = Expression::call("add", vec![id("a"), Expression::call("sload", vec![id("b")])]);
        assert!(!InvalidationChecker::expression_invalidates_storage(&dialect, &pure).unwrap());

        let nested_call = Expression::call("mstore", vec![
            Expression::number(0),
            Expression::call("call", vec![Expression::number(0); 7]),
        ]);
        assert!(InvalidationChecker::expression_invalidates_storage(&dialect, &nested_call).unwrap());

        let block = Block::new(vec![Statement::if_then(
            id("c"),
            Block::new(vec![Statement::expression(Expression::call("foo", vec![]))]),
        )]);
        assert!(InvalidationChecker::block_invalidates_storage(&dialect, &block).unwrap());
        assert!(!InvalidationChecker::block_invalidates_storage(&dialect, &Block::empty()).unwrap());
    }

    #[test]
    fn test_custom_store_builtin_counts_as_invalidating() {
        let dialect = EvmDialect::new().with_builtin(BuiltinFunction::custom(
            "store_word",
            2,
            0,
            EffectFacts {
                movable: false,
                side_effect_free: false,
                is_store: true,
                ..EffectFacts::PURE
            },
        ));
        let expr = Expression::call("store_word", vec![id("k"), id("v")]);
        assert!(InvalidationChecker::expression_invalidates_storage(&dialect, &expr).unwrap());
    }

    #[test]
    fn test_termination_finder() {
        let dialect = EvmDialect::new();
        let finder = TerminationFinder::new(&dialect);
        let statements = vec![
            Statement::assign(&["a"], Expression::number(1)),
            Statement::if_then(id("c"), Block::new(vec![Statement::Break(Span::dummy())])),
            Statement::expression(Expression::call("revert", vec![Expression::number(0), Expression::number(0)])),
            Statement::Break(Span::dummy()),
        ];
        assert_eq!(
            finder.first_unconditional_control_flow_change(&statements),
            (ControlFlow::Terminate, Some(2))
        );
        assert_eq!(
            finder.first_unconditional_control_flow_change(&statements[..2]),
            (ControlFlow::FlowOut, None)
        );
        assert_eq!(
            finder.control_flow_kind(&Statement::Continue(Span::dummy())),
            ControlFlow::Continue
        );
    }

    #[test]
    fn test_termination_by_native_instruction_and_user_call() {
        let dialect = EvmDialect::new();
        let finder = TerminationFinder::new(&dialect);
        let stop = Statement::expression(Expression::instruction(Instruction::Stop, vec![]));
        assert_eq!(finder.control_flow_kind(&stop), ControlFlow::Terminate);

        let user = Statement::expression(Expression::call("abort_everything", vec![]));
        assert_eq!(finder.control_flow_kind(&user), ControlFlow::FlowOut);

        let nested = Statement::expression(Expression::call("pop", vec![Expression::call(
            "revert",
            vec![Expression::number(0), Expression::number(0)],
        )]));
        assert_eq!(finder.control_flow_kind(&nested), ControlFlow::FlowOut);
    }
}
