//! Equality and difference proofs between variables.
//!
//! Both queries only ever answer `true` when the simplifier reduces the
//! comparison to a literal. `false` means "unknown", never "proven not".

use crate::error::OptResult;
use crate::simplify::{SimplificationRules, Simplifier, SimplifyLimits};
use rustc_hash::FxHashMap;
use sable_ast::{Expression, Instruction, Literal, Name};
use sable_dialect::Dialect;

/// Known value of each variable.
pub type ValueMap = FxHashMap<Name, Expression>;

pub struct KnowledgeBase<'a> {
    dialect: &'a dyn Dialect,
    values: &'a ValueMap,
    rules: &'a SimplificationRules,
    limits: SimplifyLimits,
}

impl<'a> KnowledgeBase<'a> {
    pub fn new(
        dialect: &'a dyn Dialect,
        values: &'a ValueMap,
        rules: &'a SimplificationRules,
        limits: SimplifyLimits,
    ) -> Self {
        Self {
            dialect,
            values,
            rules,
            limits,
        }
    }

    /// Are the current values of `a` and `b` provably different?
    ///
    /// Tries `sub(a, b)` first (a nonzero literal proves it), then
    /// `eq(a, b)` (zero proves it).
    pub fn known_to_be_different(&self, a: &str, b: &str) -> OptResult<bool> {
        if a == b {
            return Ok(false);
        }
        if let Some(difference) = self.simplify_comparison(Instruction::Sub, a, b)? {
            if difference != 0 {
                return Ok(true);
            }
        }
        Ok(self.simplify_comparison(Instruction::Eq, a, b)? == Some(0))
    }

    /// Are the current values of `a` and `b` provably equal?
    pub fn known_to_be_equal(&self, a: &str, b: &str) -> OptResult<bool> {
        if a == b {
            return Ok(true);
        }
        if self.simplify_comparison(Instruction::Sub, a, b)? == Some(0) {
            return Ok(true);
        }
        Ok(matches!(self.simplify_comparison(Instruction::Eq, a, b)?, Some(v) if v != 0))
    }

    pub fn value_of(&self, name: &str) -> Option<&'a Expression> {
        self.values.get(name)
    }

    /// Simplify `expr`, substituting known literal and identifier values.
    pub fn simplify(&self, expr: &Expression) -> OptResult<Expression> {
        Simplifier::new(self.dialect, self.rules, self.values, self.limits).simplify(expr)
    }

    fn simplify_comparison(&self, op: Instruction, a: &str, b: &str) -> OptResult<Option<u128>> {
        let comparison = Expression::instruction(
            op,
            vec![Expression::identifier(a), Expression::identifier(b)],
        );
        let simplified = self.simplify(&comparison)?;
        Ok(simplified.as_literal().and_then(Literal::numeric_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_dialect::EvmDialect;

    fn values(entries: &[(&str, Expression)]) -> ValueMap {
        entries
            .iter()
            .map(|(name, value)| (Name::new(name), value.clone()))
            .collect()
    }

    #[test]
    fn test_distinct_constants_are_different() {
        let dialect = EvmDialect::new();
        let rules = SimplificationRules::standard();
        let known = values(&[("a", Expression::number(1)), ("b", Expression::number(2))]);
        let kb = KnowledgeBase::new(&dialect, &known, &rules, SimplifyLimits::default());

        // sub(1, 2) does not fold exactly, eq(1, 2) does
        assert!(kb.known_to_be_different("a", "b").unwrap());
        assert!(kb.known_to_be_different("b", "a").unwrap());
        assert!(!kb.known_to_be_equal("a", "b").unwrap());
    }

    #[test]
    fn test_copies_are_equal() {
        let dialect = EvmDialect::new();
        let rules = SimplificationRules::standard();
        let known = values(&[("b", Expression::identifier("a"))]);
        let kb = KnowledgeBase::new(&dialect, &known, &rules, SimplifyLimits::default());

        assert!(kb.known_to_be_equal("a", "b").unwrap());
        assert!(kb.known_to_be_equal("a", "a").unwrap());
        assert!(!kb.known_to_be_different("a", "b").unwrap());
    }

    #[test]
    fn test_unknown_values_prove_nothing() {
        let dialect = EvmDialect::new();
        let rules = SimplificationRules::standard();
        let known = values(&[("a", Expression::call("calldataload", vec![Expression::number(0)]))]);
        let kb = KnowledgeBase::new(&dialect, &known, &rules, SimplifyLimits::default());

        assert!(!kb.known_to_be_different("a", "b").unwrap());
        assert!(!kb.known_to_be_equal("a", "b").unwrap());
        assert!(!kb.known_to_be_different("a", "a").unwrap());
        assert_eq!(
            kb.value_of("a"),
            Some(&Expression::call("calldataload", vec![Expression::number(0)]))
        );
    }

    #[test]
    fn test_empty_rule_table_proves_nothing() {
        let dialect = EvmDialect::new();
        let rules = SimplificationRules::empty();
        let known = values(&[("a", Expression::number(1)), ("b", Expression::number(2))]);
        let kb = KnowledgeBase::new(&dialect, &known, &rules, SimplifyLimits::default());
        assert!(!kb.known_to_be_different("a", "b").unwrap());
    }
}
