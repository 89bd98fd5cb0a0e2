//! Walkers that collect the names assigned inside a subtree.
//!
//! Only `Assignment` statements count; declarations introduce new names
//! which cannot be visible outside the block that declares them. Nested
//! function definitions are skipped since a function body can only assign to
//! its own variables.

use crate::error::OptResult;
use crate::walker::{walk_assignment, walk_for_loop, AstWalker};
use indexmap::IndexSet;
use sable_ast::{Assignment, Block, ForLoop, FunctionDefinition, Name, Span};

/// Names assigned anywhere in the visited nodes.
#[derive(Debug, Default)]
pub struct Assignments {
    names: IndexSet<Name>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &IndexSet<Name> {
        &self.names
    }

    pub fn into_names(self) -> IndexSet<Name> {
        self.names
    }
}

impl AstWalker for Assignments {
    fn visit_assignment(&mut self, assignment: &Assignment) -> OptResult<()> {
        for ident in &assignment.variable_names {
            self.names.insert(ident.name.clone());
        }
        walk_assignment(self, assignment)
    }

    fn visit_function_definition(&mut self, _fun: &FunctionDefinition) -> OptResult<()> {
        Ok(())
    }
}

/// Names assigned anywhere in `block`.
pub fn assigned_names(block: &Block) -> OptResult<IndexSet<Name>> {
    let mut assignments = Assignments::new();
    assignments.visit_block(block)?;
    Ok(assignments.into_names())
}

/// Names assigned after the first `continue` of a loop body.
///
/// Visit the body of one loop with this walker. A `continue` that belongs to
/// a nested loop does not count. The collected names are the ones whose
/// value on the `continue` edge may differ from their value at the end of
/// the body.
#[derive(Debug, Default)]
pub struct AssignmentsSinceContinue {
    names: IndexSet<Name>,
    for_loop_depth: usize,
    continue_found: bool,
}

impl AssignmentsSinceContinue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &IndexSet<Name> {
        &self.names
    }

    pub fn into_names(self) -> IndexSet<Name> {
        self.names
    }
}

impl AstWalker for AssignmentsSinceContinue {
    fn visit_for_loop(&mut self, for_loop: &ForLoop) -> OptResult<()> {
        self.for_loop_depth += 1;
        let result = walk_for_loop(self, for_loop);
        self.for_loop_depth -= 1;
        result
    }

    fn visit_continue(&mut self, _span: Span) -> OptResult<()> {
        if self.for_loop_depth == 0 {
            self.continue_found = true;
        }
        Ok(())
    }

    fn visit_assignment(&mut self, assignment: &Assignment) -> OptResult<()> {
        if self.continue_found {
            for ident in &assignment.variable_names {
                self.names.insert(ident.name.clone());
            }
        }
        walk_assignment(self, assignment)
    }

    fn visit_function_definition(&mut self, _fun: &FunctionDefinition) -> OptResult<()> {
        Ok(())
    }
}

/// Names assigned after the first `continue` of the loop body `body`.
pub fn assigned_since_continue(body: &Block) -> OptResult<IndexSet<Name>> {
    let mut collector = AssignmentsSinceContinue::new();
    collector.visit_block(body)?;
    Ok(collector.into_names())
}
