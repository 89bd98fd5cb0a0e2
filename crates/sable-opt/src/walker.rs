//! Read-only traversal of Sable trees.
//!
//! Implementors override the `visit_*` methods for the node kinds they care
//! about and call the matching `walk_*` function to continue into children.
//! Every method returns [`OptResult`] so a walker can abort the traversal on
//! an internal error.

use crate::error::OptResult;
use sable_ast::{
    Assignment, Block, Expression, ForLoop, FunctionCall, FunctionDefinition,
    FunctionalInstruction, Identifier, Literal, Span, Statement,
};

pub trait AstWalker {
    fn visit_block(&mut self, block: &Block) -> OptResult<()> {
        walk_block(self, block)
    }

    fn visit_statement(&mut self, stmt: &Statement) -> OptResult<()> {
        walk_statement(self, stmt)
    }

    fn visit_expression(&mut self, expr: &Expression) -> OptResult<()> {
        walk_expression(self, expr)
    }

    fn visit_literal(&mut self, _literal: &Literal) -> OptResult<()> {
        Ok(())
    }

    fn visit_identifier(&mut self, _identifier: &Identifier) -> OptResult<()> {
        Ok(())
    }

    fn visit_function_call(&mut self, call: &FunctionCall) -> OptResult<()> {
        walk_arguments(self, &call.arguments)
    }

    fn visit_instruction(&mut self, instr: &FunctionalInstruction) -> OptResult<()> {
        walk_arguments(self, &instr.arguments)
    }

    fn visit_assignment(&mut self, assignment: &Assignment) -> OptResult<()> {
        walk_assignment(self, assignment)
    }

    fn visit_for_loop(&mut self, for_loop: &ForLoop) -> OptResult<()> {
        walk_for_loop(self, for_loop)
    }

    fn visit_function_definition(&mut self, fun: &FunctionDefinition) -> OptResult<()> {
        self.visit_block(&fun.body)
    }

    fn visit_break(&mut self, _span: Span) -> OptResult<()> {
        Ok(())
    }

    fn visit_continue(&mut self, _span: Span) -> OptResult<()> {
        Ok(())
    }
}

pub fn walk_block<W: AstWalker + ?Sized>(walker: &mut W, block: &Block) -> OptResult<()> {
    for stmt in &block.statements {
        walker.visit_statement(stmt)?;
    }
    Ok(())
}

pub fn walk_statement<W: AstWalker + ?Sized>(walker: &mut W, stmt: &Statement) -> OptResult<()> {
    match stmt {
        Statement::ExpressionStatement(stmt) => walker.visit_expression(&stmt.expression),
        Statement::Assignment(assignment) => walker.visit_assignment(assignment),
        Statement::VariableDeclaration(decl) => match &decl.value {
            Some(value) => walker.visit_expression(value),
            None => Ok(()),
        },
        Statement::If(if_) => {
            walker.visit_expression(&if_.condition)?;
            walker.visit_block(&if_.body)
        }
        Statement::Switch(switch) => {
            walker.visit_expression(&switch.expression)?;
            for case in &switch.cases {
                walker.visit_block(&case.body)?;
            }
            Ok(())
        }
        Statement::ForLoop(for_loop) => walker.visit_for_loop(for_loop),
        Statement::FunctionDefinition(fun) => walker.visit_function_definition(fun),
        Statement::Break(span) => walker.visit_break(*span),
        Statement::Continue(span) => walker.visit_continue(*span),
        Statement::Block(block) => walker.visit_block(block),
    }
}

pub fn walk_expression<W: AstWalker + ?Sized>(walker: &mut W, expr: &Expression) -> OptResult<()> {
    match expr {
        Expression::Literal(literal) => walker.visit_literal(literal),
        Expression::Identifier(identifier) => walker.visit_identifier(identifier),
        Expression::FunctionCall(call) => walker.visit_function_call(call),
        Expression::Instruction(instr) => walker.visit_instruction(instr),
    }
}

pub fn walk_arguments<W: AstWalker + ?Sized>(walker: &mut W, arguments: &[Expression]) -> OptResult<()> {
    for arg in arguments {
        walker.visit_expression(arg)?;
    }
    Ok(())
}

/// Visits the assigned value. Target names are writes, not reads, and are not
/// visited as identifiers.
pub fn walk_assignment<W: AstWalker + ?Sized>(walker: &mut W, assignment: &Assignment) -> OptResult<()> {
    match &assignment.value {
        Some(value) => walker.visit_expression(value),
        None => Ok(()),
    }
}

/// Visits pre, condition, body and post, in that order.
pub fn walk_for_loop<W: AstWalker + ?Sized>(walker: &mut W, for_loop: &ForLoop) -> OptResult<()> {
    walker.visit_block(&for_loop.pre)?;
    walker.visit_expression(&for_loop.condition)?;
    walker.visit_block(&for_loop.body)?;
    walker.visit_block(&for_loop.post)
}
