//! Compact single-line rendering of Sable trees.
//!
//! Used by log events and tests; this is not a source printer and makes no
//! attempt at layout.

use crate::{Block, Case, Expression, Literal, LiteralKind, Statement, TypedName};
use std::fmt;

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LiteralKind::String => write!(f, "\"{}\"", self.value),
            LiteralKind::Number | LiteralKind::Boolean => f.write_str(&self.value),
        }
    }
}

impl fmt::Display for TypedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            Some(ty) => write!(f, "{}:{}", self.name, ty),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Identifier(ident) => f.write_str(&ident.name),
            Expression::FunctionCall(call) => {
                write!(f, "{}(", call.function_name.name)?;
                write_list(f, &call.arguments)?;
                write!(f, ")")
            }
            Expression::Instruction(instr) => {
                write!(f, "{}(", instr.instruction)?;
                write_list(f, &instr.arguments)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for stmt in &self.statements {
            write!(f, " {}", stmt)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "case {} {}", value, self.body),
            None => write!(f, "default {}", self.body),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::ExpressionStatement(stmt) => write!(f, "{}", stmt.expression),
            Statement::Assignment(assign) => {
                let names: Vec<&str> = assign
                    .variable_names
                    .iter()
                    .map(|ident| ident.name.as_str())
                    .collect();
                write!(f, "{} :=", names.join(", "))?;
                match &assign.value {
                    Some(value) => write!(f, " {}", value),
                    None => write!(f, " <missing>"),
                }
            }
            Statement::VariableDeclaration(decl) => {
                write!(f, "let ")?;
                write_list(f, &decl.variables)?;
                if let Some(value) = &decl.value {
                    write!(f, " := {}", value)?;
                }
                Ok(())
            }
            Statement::If(if_) => write!(f, "if {} {}", if_.condition, if_.body),
            Statement::Switch(switch) => {
                write!(f, "switch {}", switch.expression)?;
                for case in &switch.cases {
                    write!(f, " {}", case)?;
                }
                Ok(())
            }
            Statement::ForLoop(for_loop) => write!(
                f,
                "for {} {} {} {}",
                for_loop.pre, for_loop.condition, for_loop.post, for_loop.body
            ),
            Statement::FunctionDefinition(fun) => {
                write!(f, "function {}(", fun.name)?;
                write_list(f, &fun.parameters)?;
                write!(f, ")")?;
                if !fun.return_variables.is_empty() {
                    write!(f, " -> ")?;
                    write_list(f, &fun.return_variables)?;
                }
                write!(f, " {}", fun.body)
            }
            Statement::Break(_) => write!(f, "break"),
            Statement::Continue(_) => write!(f, "continue"),
            Statement::Block(block) => write!(f, "{}", block),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Block, Case, Expression, Instruction, Literal, Statement};
    use insta::assert_snapshot;

    #[test]
    fn test_render_expressions() {
        let expr = Expression::call(
            "sstore",
            vec![
                Expression::identifier("x"),
                Expression::instruction(Instruction::Add, vec![
                    Expression::identifier("y"),
                    Expression::number(1),
                ]),
            ],
        );
        assert_snapshot!(expr.to_string(), @"sstore(x, add(y, 1))");
        assert_snapshot!(Expression::Literal(Literal::string("hi")).to_string(), @r#""hi""#);
    }

    #[test]
    fn test_render_statements() {
        let block = Block::new(vec![
            Statement::declare(&["x"], Some(Expression::number(1))),
            Statement::declare(&["a", "b"], None),
            Statement::if_then(
                Expression::identifier("c"),
                Block::new(vec![Statement::assign(&["x"], Expression::number(2))]),
            ),
            Statement::switch(
                Expression::identifier("x"),
                vec![
                    Case::new(Literal::number(0), Block::new(vec![Statement::Break(Default::default())])),
                    Case::default_case(Block::empty()),
                ],
            ),
        ]);
        assert_snapshot!(
            block.to_string(),
            @"{ let x := 1 let a, b if c { x := 2 } switch x case 0 { break } default { } }"
        );
    }

    #[test]
    fn test_render_function_and_loop() {
        let fun = Statement::function(
            "f",
            &["a"],
            &["r"],
            Block::new(vec![Statement::for_loop(
                Expression::identifier("a"),
                Block::empty(),
                Block::new(vec![Statement::Continue(Default::default())]),
            )]),
        );
        assert_snapshot!(fun.to_string(), @"function f(a) -> r { for { } a { } { continue } }");
    }
}
