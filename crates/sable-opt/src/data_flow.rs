//! Data-flow analysis over Sable trees.
//!
//! [`DataFlowAnalyzer`] walks a block depth-first and keeps track of
//!
//! - the expression each variable currently holds (only movable expressions
//!   that do not reference the variable itself),
//! - which variables each known value references, and the inverse relation,
//! - which variable's value is known to be in which storage slot.
//!
//! All knowledge is a "must" fact: it holds on every path reaching the
//! current point. At control-flow merges the analyzer keeps the
//! intersection. Anything that might break a fact (assignments, unknown
//! calls, storage-invalidating builtins) drops it.
//!
//! Rewriting passes plug in through [`DataFlowHooks`]. A hook sees every
//! expression after its arguments were visited, together with read-only
//! access to the knowledge valid at that point.
//!
//! ```text
//! let x := 1          x = 1
//! sstore(x, y)        storage[x] = y
//! if c { ... }        storage survives only if the body leaves it intact
//! ```

use crate::error::{OptResult, OptimizerError};
use crate::invertible_map::BidirectionalMap;
use crate::knowledge_base::{KnowledgeBase, ValueMap};
use crate::name_collector::{assigned_names, assigned_since_continue};
use crate::semantics::{InvalidationChecker, MovableChecker};
use crate::simplify::{SimplificationRules, SimplifyLimits};
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use sable_ast::{
    Assignment, Block, Expression, ExpressionStatement, ForLoop, FunctionDefinition, If,
    Literal, Name, Statement, Switch, VariableDeclaration,
};
use sable_dialect::Dialect;
use tracing::{debug, instrument, trace};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Bounds for every simplification done by the knowledge base.
    pub limits: SimplifyLimits,
    /// Verify the knowledge invariants once the walk completes.
    pub check_consistency: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            limits: SimplifyLimits::default(),
            check_consistency: true,
        }
    }
}

// ============================================================================
// Knowledge
// ============================================================================

/// Everything the analyzer knows at one program point.
#[derive(Debug, Clone, Default)]
pub struct Knowledge {
    values: ValueMap,
    references: FxHashMap<Name, FxHashSet<Name>>,
    referenced_by: FxHashMap<Name, FxHashSet<Name>>,
    storage: BidirectionalMap<Name>,
}

impl Knowledge {
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Variables read by the known value of `name`.
    pub fn references(&self, name: &str) -> Option<&FxHashSet<Name>> {
        self.references.get(name)
    }

    /// Variables whose known value reads `name`.
    pub fn referenced_by(&self, name: &str) -> Option<&FxHashSet<Name>> {
        self.referenced_by.get(name)
    }

    /// Slot variable to value variable.
    pub fn storage(&self) -> &BidirectionalMap<Name> {
        &self.storage
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.references.is_empty() && self.storage.is_empty()
    }

    /// Check that both directions of the reference graph agree and that the
    /// storage map's reverse index is exact.
    pub fn check_consistency(&self) -> OptResult<()> {
        for (name, targets) in &self.references {
            for target in targets {
                let mirrored = self
                    .referenced_by
                    .get(target)
                    .map_or(false, |sources| sources.contains(name));
                if !mirrored {
                    return Err(OptimizerError::InconsistentKnowledge {
                        message: format!("`{}` references `{}` without a reverse edge", name, target),
                    });
                }
            }
        }
        for (target, sources) in &self.referenced_by {
            for source in sources {
                let mirrored = self
                    .references
                    .get(source)
                    .map_or(false, |targets| targets.contains(target));
                if !mirrored {
                    return Err(OptimizerError::InconsistentKnowledge {
                        message: format!(
                            "reverse edge from `{}` to `{}` without a forward edge",
                            target, source
                        ),
                    });
                }
            }
        }
        self.storage.check_invariant()
    }

    fn add_references(&mut self, name: &Name, targets: &IndexSet<Name>) {
        for target in targets {
            self.referenced_by
                .entry(target.clone())
                .or_default()
                .insert(name.clone());
        }
        if !targets.is_empty() {
            self.references
                .entry(name.clone())
                .or_default()
                .extend(targets.iter().cloned());
        }
    }

    fn remove_references(&mut self, name: &Name) {
        let Some(targets) = self.references.remove(name) else {
            return;
        };
        for target in targets {
            if let Some(sources) = self.referenced_by.get_mut(&target) {
                sources.remove(name);
                if sources.is_empty() {
                    self.referenced_by.remove(&target);
                }
            }
        }
    }

    /// Drop storage facts whose slot or value is `name`.
    fn forget_storage_of(&mut self, name: &Name) {
        self.storage.erase_key(name);
        self.storage.erase_value(name);
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// Extension points for passes that rewrite the tree while it is analyzed.
pub trait DataFlowHooks {
    /// Called for every visited expression after its arguments. `flow`
    /// describes the state right before the expression is evaluated.
    fn rewrite_expression(
        &mut self,
        _expr: &mut Expression,
        _flow: &DataFlowAnalyzer<'_>,
    ) -> OptResult<()> {
        Ok(())
    }
}

/// Plain analysis without rewriting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl DataFlowHooks for NoHooks {}

/// Runs the first hook, then the second.
impl<A: DataFlowHooks, B: DataFlowHooks> DataFlowHooks for (A, B) {
    fn rewrite_expression(
        &mut self,
        expr: &mut Expression,
        flow: &DataFlowAnalyzer<'_>,
    ) -> OptResult<()> {
        self.0.rewrite_expression(expr, flow)?;
        self.1.rewrite_expression(expr, flow)
    }
}

impl<H: DataFlowHooks + ?Sized> DataFlowHooks for &mut H {
    fn rewrite_expression(
        &mut self,
        expr: &mut Expression,
        flow: &DataFlowAnalyzer<'_>,
    ) -> OptResult<()> {
        (**self).rewrite_expression(expr, flow)
    }
}

// ============================================================================
// Analyzer
// ============================================================================

#[derive(Debug, Default)]
struct Scope {
    variables: FxHashSet<Name>,
    /// Names of enclosing scopes are not visible through a function scope.
    is_function: bool,
}

pub struct DataFlowAnalyzer<'d> {
    dialect: &'d dyn Dialect,
    rules: SimplificationRules,
    config: AnalyzerConfig,
    knowledge: Knowledge,
    scopes: Vec<Scope>,
}

impl<'d> DataFlowAnalyzer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self::with_config(dialect, AnalyzerConfig::default())
    }

    pub fn with_config(dialect: &'d dyn Dialect, config: AnalyzerConfig) -> Self {
        Self {
            dialect,
            rules: SimplificationRules::standard(),
            config,
            knowledge: Knowledge::default(),
            scopes: Vec::new(),
        }
    }

    /// Replace the rule table used by the knowledge base.
    pub fn with_rules(mut self, rules: SimplificationRules) -> Self {
        self.rules = rules;
        self
    }

    /// Analyze `block` without rewriting it.
    pub fn run(&mut self, block: &mut Block) -> OptResult<()> {
        self.run_with(block, &mut NoHooks)
    }

    /// Analyze `block`, letting `hooks` rewrite expressions along the way.
    #[instrument(level = "debug", skip_all, fields(dialect = self.dialect.name()))]
    pub fn run_with<H: DataFlowHooks>(&mut self, block: &mut Block, hooks: &mut H) -> OptResult<()> {
        debug!("data-flow analysis of {} statements", block.statements.len());
        let depth = self.scopes.len();
        let result = self.visit_block(block, hooks);
        if self.scopes.len() != depth {
            return Err(OptimizerError::ScopeImbalance {
                expected: depth,
                actual: self.scopes.len(),
            });
        }
        result?;
        if self.config.check_consistency {
            self.knowledge.check_consistency()?;
        }
        debug!(
            "data-flow analysis finished: {} values, {} storage slots known",
            self.knowledge.values.len(),
            self.knowledge.storage.len()
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    /// The expression `name` is currently known to hold.
    pub fn value_of(&self, name: &str) -> Option<&Expression> {
        self.knowledge.values.get(name)
    }

    /// Variables read by the known value of `name`.
    pub fn references_of(&self, name: &str) -> Option<&FxHashSet<Name>> {
        self.knowledge.references(name)
    }

    /// The variable whose value is known to be stored at slot `slot`.
    pub fn storage_value(&self, slot: &str) -> Option<&Name> {
        self.knowledge.storage.get(slot)
    }

    pub fn storage(&self) -> &BidirectionalMap<Name> {
        &self.knowledge.storage
    }

    /// Is `name` visible from the current scope?
    pub fn in_scope(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.variables.contains(name) {
                return true;
            }
            if scope.is_function {
                return false;
            }
        }
        false
    }

    pub fn knowledge_base(&self) -> KnowledgeBase<'_> {
        KnowledgeBase::new(
            self.dialect,
            &self.knowledge.values,
            &self.rules,
            self.config.limits,
        )
    }

    pub fn known_to_be_different(&self, a: &str, b: &str) -> OptResult<bool> {
        self.knowledge_base().known_to_be_different(a, b)
    }

    pub fn known_to_be_equal(&self, a: &str, b: &str) -> OptResult<bool> {
        self.knowledge_base().known_to_be_equal(a, b)
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn visit_block<H: DataFlowHooks>(&mut self, block: &mut Block, hooks: &mut H) -> OptResult<()> {
        self.push_scope(false);
        let result = self.visit_statements(&mut block.statements, hooks);
        self.pop_scope();
        result
    }

    fn visit_statements<H: DataFlowHooks>(
        &mut self,
        statements: &mut [Statement],
        hooks: &mut H,
    ) -> OptResult<()> {
        for stmt in statements {
            self.visit_statement(stmt, hooks)?;
        }
        Ok(())
    }

    fn visit_statement<H: DataFlowHooks>(&mut self, stmt: &mut Statement, hooks: &mut H) -> OptResult<()> {
        match stmt {
            Statement::ExpressionStatement(stmt) => self.visit_expression_statement(stmt, hooks),
            Statement::Assignment(assignment) => self.visit_assignment(assignment, hooks),
            Statement::VariableDeclaration(decl) => self.visit_variable_declaration(decl, hooks),
            Statement::If(if_) => self.visit_if(if_, hooks),
            Statement::Switch(switch) => self.visit_switch(switch, hooks),
            Statement::ForLoop(for_loop) => self.visit_for_loop(for_loop, hooks),
            Statement::FunctionDefinition(fun) => self.visit_function_definition(fun, hooks),
            Statement::Break(_) | Statement::Continue(_) => Ok(()),
            Statement::Block(block) => self.visit_block(block, hooks),
        }
    }

    fn visit_expression_statement<H: DataFlowHooks>(
        &mut self,
        stmt: &mut ExpressionStatement,
        hooks: &mut H,
    ) -> OptResult<()> {
        match self.simple_store(&stmt.expression) {
            Some((slot, value)) => {
                self.visit_expression(&mut stmt.expression, hooks)?;
                self.record_store(slot, value)
            }
            None => {
                self.clear_storage_if_expression_invalidates(&stmt.expression)?;
                self.visit_expression(&mut stmt.expression, hooks)
            }
        }
    }

    fn visit_assignment<H: DataFlowHooks>(
        &mut self,
        assignment: &mut Assignment,
        hooks: &mut H,
    ) -> OptResult<()> {
        let names: Vec<Name> = assignment
            .variable_names
            .iter()
            .map(|ident| ident.name.clone())
            .collect();
        let value = match assignment.value.as_deref_mut() {
            Some(value) => value,
            None => {
                return Err(OptimizerError::MissingAssignmentValue {
                    names: names.join(", "),
                    span: assignment.span,
                })
            }
        };
        self.clear_storage_if_expression_invalidates(value)?;
        self.visit_expression(value, hooks)?;
        self.handle_assignment(&names, Some(&*value))
    }

    fn visit_variable_declaration<H: DataFlowHooks>(
        &mut self,
        decl: &mut VariableDeclaration,
        hooks: &mut H,
    ) -> OptResult<()> {
        let names: Vec<Name> = decl.variables.iter().map(|var| var.name.clone()).collect();
        self.declare(&names);
        if let Some(value) = decl.value.as_deref_mut() {
            self.clear_storage_if_expression_invalidates(value)?;
            self.visit_expression(value, hooks)?;
        }
        self.handle_assignment(&names, decl.value.as_deref())
    }

    fn visit_if<H: DataFlowHooks>(&mut self, if_: &mut If, hooks: &mut H) -> OptResult<()> {
        self.clear_storage_if_expression_invalidates(&if_.condition)?;
        let before = self.knowledge.storage.clone();
        self.visit_expression(&mut if_.condition, hooks)?;
        self.visit_block(&mut if_.body, hooks)?;
        self.join_storage_knowledge(&before);
        let assigned = assigned_names(&if_.body)?;
        self.clear_values(&assigned);
        Ok(())
    }

    fn visit_switch<H: DataFlowHooks>(&mut self, switch: &mut Switch, hooks: &mut H) -> OptResult<()> {
        self.clear_storage_if_expression_invalidates(&switch.expression)?;
        self.visit_expression(&mut switch.expression, hooks)?;
        let mut assigned_in_any_case = IndexSet::new();
        for case in &mut switch.cases {
            let before = self.knowledge.storage.clone();
            self.visit_block(&mut case.body, hooks)?;
            self.join_storage_knowledge(&before);

            let assigned = assigned_names(&case.body)?;
            self.clear_values(&assigned);
            assigned_in_any_case.extend(assigned);
            self.clear_storage_if_block_invalidates(&case.body)?;
        }
        for case in &switch.cases {
            self.clear_storage_if_block_invalidates(&case.body)?;
        }
        self.clear_values(&assigned_in_any_case);
        Ok(())
    }

    fn visit_for_loop<H: DataFlowHooks>(&mut self, for_loop: &mut ForLoop, hooks: &mut H) -> OptResult<()> {
        if !for_loop.pre.is_empty() {
            return Err(OptimizerError::NonEmptyForLoopPre {
                span: for_loop.pre.span,
            });
        }

        let assigned_since_continue = assigned_since_continue(&for_loop.body)?;
        let mut assigned = assigned_names(&for_loop.body)?;
        assigned.extend(assigned_names(&for_loop.post)?);

        self.clear_values(&assigned);
        self.clear_storage_if_loop_invalidates(for_loop)?;

        self.visit_expression(&mut for_loop.condition, hooks)?;
        self.visit_block(&mut for_loop.body, hooks)?;

        self.clear_values(&assigned_since_continue);
        self.clear_storage_if_block_invalidates(&for_loop.body)?;
        self.visit_block(&mut for_loop.post, hooks)?;

        // Back edge to the condition
        self.clear_values(&assigned);
        self.clear_storage_if_loop_invalidates(for_loop)
    }

    fn visit_function_definition<H: DataFlowHooks>(
        &mut self,
        fun: &mut FunctionDefinition,
        hooks: &mut H,
    ) -> OptResult<()> {
        debug!("entering function `{}`", fun.name);
        let outer = std::mem::take(&mut self.knowledge);
        self.push_scope(true);
        let result = self.visit_function_body(fun, hooks);
        self.pop_scope();
        self.knowledge = outer;
        debug!("leaving function `{}`", fun.name);
        result
    }

    fn visit_function_body<H: DataFlowHooks>(
        &mut self,
        fun: &mut FunctionDefinition,
        hooks: &mut H,
    ) -> OptResult<()> {
        let parameters: Vec<Name> = fun.parameters.iter().map(|p| p.name.clone()).collect();
        self.declare(&parameters);
        for var in &fun.return_variables {
            let name = [var.name.clone()];
            self.declare(&name);
            self.handle_assignment(&name, None)?;
        }
        self.visit_block(&mut fun.body, hooks)
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn visit_expression<H: DataFlowHooks>(&mut self, expr: &mut Expression, hooks: &mut H) -> OptResult<()> {
        for arg in expr.arguments_mut() {
            self.visit_expression(arg, hooks)?;
        }
        hooks.rewrite_expression(expr, self)
    }

    /// Slot and value of a store whose operands are both plain identifiers.
    fn simple_store(&self, expr: &Expression) -> Option<(Name, Name)> {
        let (is_store, arguments) = match expr {
            Expression::FunctionCall(call) => (
                self.dialect
                    .call_facts(&call.function_name.name)
                    .map_or(false, |facts| facts.is_store),
                &call.arguments,
            ),
            Expression::Instruction(instr) => (
                self.dialect.instruction_facts(instr.instruction).is_store,
                &instr.arguments,
            ),
            Expression::Literal(_) | Expression::Identifier(_) => return None,
        };
        match arguments.as_slice() {
            [slot, value] if is_store => Some((
                slot.as_identifier()?.name.clone(),
                value.as_identifier()?.name.clone(),
            )),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Knowledge updates
    // ------------------------------------------------------------------------

    /// `storage[slot] = value`. Facts about other slots survive only if
    /// their slot is provably different or their value provably equal.
    fn record_store(&mut self, slot: Name, value: Name) -> OptResult<()> {
        let mut aliased = Vec::new();
        {
            let kb = self.knowledge_base();
            for (other_slot, other_value) in self.knowledge.storage.iter() {
                if *other_slot == slot {
                    continue;
                }
                if !kb.known_to_be_different(other_slot, &slot)?
                    && !kb.known_to_be_equal(other_value, &value)?
                {
                    aliased.push(other_slot.clone());
                }
            }
        }
        for other_slot in &aliased {
            trace!("store to `{}` may alias slot `{}`", slot, other_slot);
            self.knowledge.storage.erase_key(other_slot);
        }
        trace!("storage[{}] = {}", slot, value);
        self.knowledge.storage.set(slot, value);
        Ok(())
    }

    fn handle_assignment(&mut self, names: &[Name], value: Option<&Expression>) -> OptResult<()> {
        self.clear_values(names);

        let referenced = match value {
            Some(value) => {
                let checker = MovableChecker::analyze(self.dialect, value)?;
                if let [name] = names {
                    if checker.movable() && !checker.referenced_variables().contains(name) {
                        self.knowledge.values.insert(name.clone(), value.clone());
                    }
                }
                checker.referenced_variables().clone()
            }
            None => {
                for name in names {
                    self.knowledge
                        .values
                        .insert(name.clone(), Expression::Literal(Literal::zero()));
                }
                IndexSet::new()
            }
        };

        for name in names {
            self.knowledge.remove_references(name);
            self.knowledge.add_references(name, &referenced);
        }
        Ok(())
    }

    /// Forget the values of `names` and of every variable whose known value
    /// reads one of them.
    ///
    /// Dependents are added one level deep. Storage facts keyed by or
    /// holding any cleared name are dropped; edges pointing at dependents stay.
    fn clear_values<'n>(&mut self, names: impl IntoIterator<Item = &'n Name>) {
        let mut cleared: IndexSet<Name> = names.into_iter().cloned().collect();

        let dependents: Vec<Name> = cleared
            .iter()
            .filter_map(|name| self.knowledge.referenced_by.get(name))
            .flatten()
            .cloned()
            .collect();
        cleared.extend(dependents);

        for name in &cleared {
            self.knowledge.values.remove(name);
            self.knowledge.remove_references(name);
            self.knowledge.forget_storage_of(name);
        }
    }

    /// Keep only storage facts that held before the branch as well.
    fn join_storage_knowledge(&mut self, before: &BidirectionalMap<Name>) {
        let known = self.knowledge.storage.len();
        self.knowledge
            .storage
            .retain(|slot, value| before.get(slot) == Some(value));
        let dropped = known - self.knowledge.storage.len();
        if dropped > 0 {
            trace!("join dropped {} storage facts", dropped);
        }
    }

    fn clear_storage(&mut self) {
        if !self.knowledge.storage.is_empty() {
            trace!("storage knowledge invalidated ({} facts)", self.knowledge.storage.len());
            self.knowledge.storage.clear();
        }
    }

    fn clear_storage_if_expression_invalidates(&mut self, expr: &Expression) -> OptResult<()> {
        if InvalidationChecker::expression_invalidates_storage(self.dialect, expr)? {
            self.clear_storage();
        }
        Ok(())
    }

    fn clear_storage_if_block_invalidates(&mut self, block: &Block) -> OptResult<()> {
        if InvalidationChecker::block_invalidates_storage(self.dialect, block)? {
            self.clear_storage();
        }
        Ok(())
    }

    fn clear_storage_if_loop_invalidates(&mut self, for_loop: &ForLoop) -> OptResult<()> {
        self.clear_storage_if_expression_invalidates(&for_loop.condition)?;
        self.clear_storage_if_block_invalidates(&for_loop.post)?;
        self.clear_storage_if_block_invalidates(&for_loop.body)
    }

    // ------------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------------

    fn push_scope(&mut self, is_function: bool) {
        self.scopes.push(Scope {
            variables: FxHashSet::default(),
            is_function,
        });
    }

    /// Leave the innermost scope, forgetting everything about its variables.
    fn pop_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.clear_values(&scope.variables);
        }
    }

    fn declare(&mut self, names: &[Name]) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.extend(names.iter().cloned());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
