//! Rule-based expression simplification.
//!
//! The simplifier rewrites an expression bottom-up: arguments first, then the
//! first rule of the table that matches the operation. Identifiers whose
//! known value is a literal or another identifier are substituted on the way.
//!
//! # Rules
//!
//! - **Constant folding**: `add(2, 3)` → `5`, `eq(1, 2)` → `0`
//! - **Self operand**: `sub(x, x)` → `0`, `eq(x, x)` → `1`, `and(x, x)` → `x`
//! - **Neutral element**: `add(x, 0)` → `x`, `mul(x, 1)` → `x`
//!
//! Literal values are kept in 128 bits. A fold whose exact 256-bit result
//! does not fit (or would wrap) is not performed.

use crate::error::OptResult;
use crate::knowledge_base::ValueMap;
use crate::semantics::MovableChecker;
use sable_ast::{Expression, Instruction, Literal};
use sable_dialect::Dialect;
use std::fmt;
use tracing::trace;

/// Bounds that guarantee termination of a single simplification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplifyLimits {
    /// Maximum nesting of recursive simplification steps.
    pub max_depth: usize,
    /// Maximum number of rule applications.
    pub max_rewrites: usize,
}

impl Default for SimplifyLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_rewrites: 256,
        }
    }
}

/// The operation computed by `expr`, if it is a native instruction or a
/// builtin call that maps to one with the right number of arguments.
pub fn as_operation<'e>(
    expr: &'e Expression,
    dialect: &dyn Dialect,
) -> Option<(Instruction, &'e [Expression])> {
    let (instruction, arguments) = match expr {
        Expression::Instruction(instr) => (instr.instruction, instr.arguments.as_slice()),
        Expression::FunctionCall(call) => {
            let instruction = dialect.builtin(&call.function_name.name)?.instruction?;
            (instruction, call.arguments.as_slice())
        }
        Expression::Literal(_) | Expression::Identifier(_) => return None,
    };
    (arguments.len() == instruction.arguments()).then_some((instruction, arguments))
}

fn literal_value(expr: &Expression) -> Option<u128> {
    expr.as_literal().and_then(Literal::numeric_value)
}

fn boolean(value: bool) -> Expression {
    Expression::number(u128::from(value))
}

// ============================================================================
// Rules
// ============================================================================

/// What a rule may ask about its operands.
pub struct RuleContext<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> RuleContext<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    /// Can `expr` be dropped or duplicated without changing behavior?
    pub fn is_removable(&self, expr: &Expression) -> OptResult<bool> {
        let checker = MovableChecker::analyze(self.dialect, expr)?;
        Ok(checker.movable() && checker.side_effect_free())
    }
}

pub trait SimplificationRule {
    fn name(&self) -> &'static str;

    /// Rewrite `instruction(args...)`, or `None` if the rule does not match.
    fn apply(
        &self,
        instruction: Instruction,
        args: &[Expression],
        ctx: &RuleContext<'_>,
    ) -> OptResult<Option<Expression>>;
}

/// Evaluate operations whose operands are all literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantFolding;

impl SimplificationRule for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn apply(
        &self,
        instruction: Instruction,
        args: &[Expression],
        _ctx: &RuleContext<'_>,
    ) -> OptResult<Option<Expression>> {
        let values: Option<Vec<u128>> = args.iter().map(literal_value).collect();
        let folded = match (instruction, values.as_deref()) {
            (Instruction::IsZero, Some([a])) => Some(boolean(*a == 0)),
            (Instruction::Add, Some([a, b])) => a.checked_add(*b).map(Expression::number),
            (Instruction::Sub, Some([a, b])) => a.checked_sub(*b).map(Expression::number),
            (Instruction::Mul, Some([a, b])) => a.checked_mul(*b).map(Expression::number),
            // Division by zero yields zero
            (Instruction::Div, Some([a, b])) => Some(Expression::number(a.checked_div(*b).unwrap_or(0))),
            (Instruction::Mod, Some([a, b])) => Some(Expression::number(a.checked_rem(*b).unwrap_or(0))),
            (Instruction::Eq, Some([a, b])) => Some(boolean(a == b)),
            (Instruction::Lt, Some([a, b])) => Some(boolean(a < b)),
            (Instruction::Gt, Some([a, b])) => Some(boolean(a > b)),
            (Instruction::And, Some([a, b])) => Some(Expression::number(a & b)),
            (Instruction::Or, Some([a, b])) => Some(Expression::number(a | b)),
            (Instruction::Xor, Some([a, b])) => Some(Expression::number(a ^ b)),
            _ => None,
        };
        Ok(folded)
    }
}

/// Operations applied to two syntactically equal, removable operands.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfOperand;

impl SimplificationRule for SelfOperand {
    fn name(&self) -> &'static str {
        "self-operand"
    }

    fn apply(
        &self,
        instruction: Instruction,
        args: &[Expression],
        ctx: &RuleContext<'_>,
    ) -> OptResult<Option<Expression>> {
        let [x, y] = args else {
            return Ok(None);
        };
        let result = match instruction {
            Instruction::Sub | Instruction::Xor => Expression::number(0),
            Instruction::Eq => Expression::number(1),
            Instruction::Lt | Instruction::Gt | Instruction::SLt | Instruction::SGt => {
                Expression::number(0)
            }
            Instruction::And | Instruction::Or => x.clone(),
            _ => return Ok(None),
        };
        if !x.syntactically_equal(y) || !ctx.is_removable(x)? {
            return Ok(None);
        }
        Ok(Some(result))
    }
}

/// Drop an operand that does not change the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralElement;

impl SimplificationRule for NeutralElement {
    fn name(&self) -> &'static str {
        "neutral-element"
    }

    fn apply(
        &self,
        instruction: Instruction,
        args: &[Expression],
        _ctx: &RuleContext<'_>,
    ) -> OptResult<Option<Expression>> {
        let [x, y] = args else {
            return Ok(None);
        };
        let rewritten = match (instruction, literal_value(x), literal_value(y)) {
            // x + 0, x | 0, x ^ 0 and the commuted forms
            (Instruction::Add | Instruction::Or | Instruction::Xor, _, Some(0)) => Some(x),
            (Instruction::Add | Instruction::Or | Instruction::Xor, Some(0), _) => Some(y),
            // x - 0
            (Instruction::Sub, _, Some(0)) => Some(x),
            // x * 1
            (Instruction::Mul, _, Some(1)) => Some(x),
            (Instruction::Mul, Some(1), _) => Some(y),
            // x / 1
            (Instruction::Div, _, Some(1)) => Some(x),
            _ => None,
        };
        Ok(rewritten.cloned())
    }
}

/// Ordered rule table; the first matching rule wins.
pub struct SimplificationRules {
    rules: Vec<Box<dyn SimplificationRule>>,
}

impl SimplificationRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Constant folding, self-operand and neutral-element rules.
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(ConstantFolding)
            .with_rule(SelfOperand)
            .with_rule(NeutralElement)
    }

    pub fn with_rule(mut self, rule: impl SimplificationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule that rewrites `instruction(args...)`, with its result.
    pub fn find_first_match(
        &self,
        instruction: Instruction,
        args: &[Expression],
        ctx: &RuleContext<'_>,
    ) -> OptResult<Option<(&'static str, Expression)>> {
        for rule in &self.rules {
            if let Some(rewritten) = rule.apply(instruction, args, ctx)? {
                return Ok(Some((rule.name(), rewritten)));
            }
        }
        Ok(None)
    }
}

impl Default for SimplificationRules {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for SimplificationRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.name()))
            .finish()
    }
}

// ============================================================================
// Simplifier
// ============================================================================

/// One bounded simplification run.
pub struct Simplifier<'a> {
    dialect: &'a dyn Dialect,
    rules: &'a SimplificationRules,
    known_values: &'a ValueMap,
    limits: SimplifyLimits,
    rewrites: usize,
}

impl<'a> Simplifier<'a> {
    pub fn new(
        dialect: &'a dyn Dialect,
        rules: &'a SimplificationRules,
        known_values: &'a ValueMap,
        limits: SimplifyLimits,
    ) -> Self {
        Self {
            dialect,
            rules,
            known_values,
            limits,
            rewrites: 0,
        }
    }

    /// Number of rules applied so far.
    pub fn rewrites(&self) -> usize {
        self.rewrites
    }

    /// Simplify `expr`. Once a limit is reached the expression is returned
    /// as far as it got.
    pub fn simplify(&mut self, expr: &Expression) -> OptResult<Expression> {
        self.simplify_at(expr, 0)
    }

    fn simplify_at(&mut self, expr: &Expression, depth: usize) -> OptResult<Expression> {
        if depth > self.limits.max_depth {
            trace!("simplification depth limit reached at {}", expr);
            return Ok(expr.clone());
        }
        match expr {
            Expression::Literal(_) => Ok(expr.clone()),
            Expression::Identifier(ident) => match self.known_values.get(&ident.name) {
                Some(known @ Expression::Literal(_)) => Ok(known.clone()),
                Some(known @ Expression::Identifier(_)) => self.simplify_at(known, depth + 1),
                _ => Ok(expr.clone()),
            },
            Expression::FunctionCall(_) | Expression::Instruction(_) => {
                let mut simplified = expr.clone();
                for arg in simplified.arguments_mut() {
                    *arg = self.simplify_at(arg, depth + 1)?;
                }
                if self.rewrites >= self.limits.max_rewrites {
                    return Ok(simplified);
                }
                let ctx = RuleContext::new(self.dialect);
                let matched = match as_operation(&simplified, self.dialect) {
                    Some((instruction, args)) => {
                        self.rules.find_first_match(instruction, args, &ctx)?
                    }
                    None => None,
                };
                match matched {
                    Some((rule, rewritten)) => {
                        self.rewrites += 1;
                        trace!("{}: {} => {}", rule, simplified, rewritten);
                        self.simplify_at(&rewritten, depth + 1)
                    }
                    None => Ok(simplified),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
