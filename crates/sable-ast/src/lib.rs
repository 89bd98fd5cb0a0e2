//! Sable Abstract Syntax Tree
//!
//! Defines all node types of the Sable intermediate language: a block-structured
//! IR with nested lexical scopes, `for` loops, `if`/`switch` branching and
//! function definitions. The set of builtin operations is not fixed here; it is
//! supplied by a dialect (see `sable-dialect`). Operations native to the target
//! machine can also appear directly as [`FunctionalInstruction`]s.
//!
//! The node set is closed: every consumer matches exhaustively over
//! [`Statement`] and [`Expression`].

use std::ops::Range;

pub use smol_str::SmolStr;

mod instruction;
mod pretty;

pub use instruction::Instruction;

/// Variable, function and type names.
pub type Name = SmolStr;

/// Source location of a node (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Span for synthesized nodes.
    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Number,
    Boolean,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub value: SmolStr,
    pub span: Span,
}

impl Literal {
    pub fn number(value: u128) -> Self {
        Self {
            kind: LiteralKind::Number,
            value: SmolStr::new(value.to_string()),
            span: Span::dummy(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            kind: LiteralKind::Boolean,
            value: SmolStr::new(if value { "true" } else { "false" }),
            span: Span::dummy(),
        }
    }

    pub fn string(value: &str) -> Self {
        Self {
            kind: LiteralKind::String,
            value: SmolStr::new(value),
            span: Span::dummy(),
        }
    }

    /// The literal `0`, the value of every uninitialized variable.
    pub fn zero() -> Self {
        Self::number(0)
    }

    /// Numeric value of the literal if it fits in 128 bits.
    ///
    /// Accepts decimal and `0x`-prefixed hexadecimal numbers and booleans.
    /// String literals never have a numeric value here.
    pub fn numeric_value(&self) -> Option<u128> {
        match self.kind {
            LiteralKind::Boolean => match self.value.as_str() {
                "true" => Some(1),
                "false" => Some(0),
                _ => None,
            },
            LiteralKind::Number => {
                let text = self.value.as_str();
                match text.strip_prefix("0x") {
                    Some(hex) => u128::from_str_radix(hex, 16).ok(),
                    None => text.parse().ok(),
                }
            }
            LiteralKind::String => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: Name,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            span: Span::dummy(),
        }
    }
}

/// A declared name with an optional type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedName {
    pub name: Name,
    pub ty: Option<Name>,
    pub span: Span,
}

impl TypedName {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            span: Span::dummy(),
        }
    }
}

/// Call of a builtin or a user-defined function, by name.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub function_name: Identifier,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// Direct use of a native machine instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalInstruction {
    pub instruction: Instruction,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(Identifier),
    FunctionCall(FunctionCall),
    Instruction(FunctionalInstruction),
}

impl Expression {
    pub fn identifier(name: impl Into<Name>) -> Self {
        Expression::Identifier(Identifier::new(name))
    }

    pub fn number(value: u128) -> Self {
        Expression::Literal(Literal::number(value))
    }

    pub fn call(name: impl Into<Name>, arguments: Vec<Expression>) -> Self {
        Expression::FunctionCall(FunctionCall {
            function_name: Identifier::new(name),
            arguments,
            span: Span::dummy(),
        })
    }

    pub fn instruction(instruction: Instruction, arguments: Vec<Expression>) -> Self {
        Expression::Instruction(FunctionalInstruction {
            instruction,
            arguments,
            span: Span::dummy(),
        })
    }

    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(lit) => lit.span,
            Expression::Identifier(ident) => ident.span,
            Expression::FunctionCall(call) => call.span,
            Expression::Instruction(instr) => instr.span,
        }
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Expression::Identifier(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Operands of a call or instruction; empty for leaves.
    pub fn arguments(&self) -> &[Expression] {
        match self {
            Expression::FunctionCall(call) => &call.arguments,
            Expression::Instruction(instr) => &instr.arguments,
            Expression::Literal(_) | Expression::Identifier(_) => &[],
        }
    }

    pub fn arguments_mut(&mut self) -> &mut [Expression] {
        match self {
            Expression::FunctionCall(call) => &mut call.arguments,
            Expression::Instruction(instr) => &mut instr.arguments,
            Expression::Literal(_) | Expression::Identifier(_) => &mut [],
        }
    }

    /// Structural equality that ignores source locations.
    pub fn syntactically_equal(&self, other: &Expression) -> bool {
        match (self, other) {
            (Expression::Literal(a), Expression::Literal(b)) => {
                a.kind == b.kind && a.value == b.value
            }
            (Expression::Identifier(a), Expression::Identifier(b)) => a.name == b.name,
            (Expression::FunctionCall(a), Expression::FunctionCall(b)) => {
                a.function_name.name == b.function_name.name
                    && arguments_equal(&a.arguments, &b.arguments)
            }
            (Expression::Instruction(a), Expression::Instruction(b)) => {
                a.instruction == b.instruction && arguments_equal(&a.arguments, &b.arguments)
            }
            _ => false,
        }
    }
}

fn arguments_equal(a: &[Expression], b: &[Expression]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.syntactically_equal(y))
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

/// `a, b := value`
///
/// The value is optional only so that malformed trees can be represented;
/// analyses treat a missing value as an internal error.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub variable_names: Vec<Identifier>,
    pub value: Option<Box<Expression>>,
    pub span: Span,
}

/// `let a, b := value` or `let a, b` (zero-initialized).
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub variables: Vec<TypedName>,
    pub value: Option<Box<Expression>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub condition: Box<Expression>,
    pub body: Block,
    pub span: Span,
}

/// A `switch` case; `value == None` is the default case.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<Literal>,
    pub body: Block,
    pub span: Span,
}

impl Case {
    pub fn new(value: Literal, body: Block) -> Self {
        Self {
            value: Some(value),
            body,
            span: Span::dummy(),
        }
    }

    pub fn default_case(body: Block) -> Self {
        Self {
            value: None,
            body,
            span: Span::dummy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub expression: Box<Expression>,
    pub cases: Vec<Case>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub pre: Block,
    pub condition: Box<Expression>,
    pub post: Block,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: Name,
    pub parameters: Vec<TypedName>,
    pub return_variables: Vec<TypedName>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            span: Span::dummy(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    ExpressionStatement(ExpressionStatement),
    Assignment(Assignment),
    VariableDeclaration(VariableDeclaration),
    If(If),
    Switch(Switch),
    ForLoop(ForLoop),
    FunctionDefinition(FunctionDefinition),
    Break(Span),
    Continue(Span),
    Block(Block),
}

impl Statement {
    pub fn expression(expression: Expression) -> Self {
        Statement::ExpressionStatement(ExpressionStatement {
            expression,
            span: Span::dummy(),
        })
    }

    pub fn assign(names: &[&str], value: Expression) -> Self {
        Statement::Assignment(Assignment {
            variable_names: names.iter().map(|n| Identifier::new(*n)).collect(),
            value: Some(Box::new(value)),
            span: Span::dummy(),
        })
    }

    pub fn declare(names: &[&str], value: Option<Expression>) -> Self {
        Statement::VariableDeclaration(VariableDeclaration {
            variables: names.iter().map(|n| TypedName::new(*n)).collect(),
            value: value.map(Box::new),
            span: Span::dummy(),
        })
    }

    pub fn if_then(condition: Expression, body: Block) -> Self {
        Statement::If(If {
            condition: Box::new(condition),
            body,
            span: Span::dummy(),
        })
    }

    pub fn switch(expression: Expression, cases: Vec<Case>) -> Self {
        Statement::Switch(Switch {
            expression: Box::new(expression),
            cases,
            span: Span::dummy(),
        })
    }

    /// A `for` loop with an empty pre block.
    pub fn for_loop(condition: Expression, post: Block, body: Block) -> Self {
        Statement::ForLoop(ForLoop {
            pre: Block::empty(),
            condition: Box::new(condition),
            post,
            body,
            span: Span::dummy(),
        })
    }

    pub fn function(name: &str, parameters: &[&str], returns: &[&str], body: Block) -> Self {
        Statement::FunctionDefinition(FunctionDefinition {
            name: Name::new(name),
            parameters: parameters.iter().map(|n| TypedName::new(*n)).collect(),
            return_variables: returns.iter().map(|n| TypedName::new(*n)).collect(),
            body,
            span: Span::dummy(),
        })
    }

    pub fn span(&self) -> Span {
        match self {
            Statement::ExpressionStatement(stmt) => stmt.span,
            Statement::Assignment(assign) => assign.span,
            Statement::VariableDeclaration(decl) => decl.span,
            Statement::If(if_) => if_.span,
            Statement::Switch(switch) => switch.span,
            Statement::ForLoop(for_loop) => for_loop.span,
            Statement::FunctionDefinition(fun) => fun.span,
            Statement::Break(span) | Statement::Continue(span) => *span,
            Statement::Block(block) => block.span,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
