//! Sable Dialects
//!
//! A dialect decides which function names are builtins and what each builtin
//! may do when evaluated. Optimizer passes never inspect builtin names
//! themselves; they ask the dialect for the [`EffectFacts`] of a call and
//! treat every name the dialect does not know as an opaque user function.
//!
//! ## Effect Facts
//!
//! | Fact | Meaning |
//! |------|---------|
//! | movable | may be evaluated elsewhere or duplicated if its inputs are unchanged |
//! | side-effect free | can be removed if its result is unused |
//! | invalidates storage | may change storage slots unpredictably |
//! | terminates control flow | never returns to the caller |
//! | store | writes one storage slot (`sstore(slot, value)`) |
//!
//! [`EvmDialect`] exposes every native [`Instruction`] as a builtin of the same
//! name, with facts from [`semantic_information`].

use rustc_hash::FxHashMap;
use sable_ast::{Instruction, Name};

// ============================================================================
// Effect Facts
// ============================================================================

/// What evaluating one builtin (or instruction) may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectFacts {
    pub movable: bool,
    pub side_effect_free: bool,
    pub invalidates_storage: bool,
    pub terminates_control_flow: bool,
    pub is_store: bool,
}

impl EffectFacts {
    /// Facts of a pure computation.
    pub const PURE: EffectFacts = EffectFacts {
        movable: true,
        side_effect_free: true,
        invalidates_storage: false,
        terminates_control_flow: false,
        is_store: false,
    };

    /// Facts assumed for a call the dialect does not recognize.
    pub const OPAQUE: EffectFacts = EffectFacts {
        movable: false,
        side_effect_free: false,
        invalidates_storage: true,
        terminates_control_flow: false,
        is_store: false,
    };
}

impl Default for EffectFacts {
    fn default() -> Self {
        EffectFacts::PURE
    }
}

/// Semantic information for a native instruction.
pub fn semantic_information(instruction: Instruction) -> EffectFacts {
    let side_effect_free = !has_side_effects(instruction);
    EffectFacts {
        movable: side_effect_free && !reads_mutable_state(instruction),
        side_effect_free,
        invalidates_storage: invalidates_storage(instruction),
        terminates_control_flow: terminates_control_flow(instruction),
        is_store: instruction == Instruction::SStore,
    }
}

fn has_side_effects(instruction: Instruction) -> bool {
    matches!(
        instruction,
        Instruction::Stop
            | Instruction::MStore
            | Instruction::SStore
            | Instruction::Log0
            | Instruction::Log1
            | Instruction::Call
            | Instruction::CallCode
            | Instruction::DelegateCall
            | Instruction::StaticCall
            | Instruction::Create
            | Instruction::Create2
            | Instruction::Return
            | Instruction::Revert
            | Instruction::Invalid
            | Instruction::SelfDestruct
    )
}

/// Side-effect free, but the result depends on state other instructions change.
fn reads_mutable_state(instruction: Instruction) -> bool {
    matches!(
        instruction,
        Instruction::Keccak256
            | Instruction::Balance
            | Instruction::ExtCodeSize
            | Instruction::ExtCodeHash
            | Instruction::ReturnDataSize
            | Instruction::SLoad
            | Instruction::MLoad
            | Instruction::MSize
            | Instruction::Gas
    )
}

fn invalidates_storage(instruction: Instruction) -> bool {
    matches!(
        instruction,
        Instruction::SStore
            | Instruction::Call
            | Instruction::CallCode
            | Instruction::DelegateCall
            | Instruction::Create
            | Instruction::Create2
    )
}

fn terminates_control_flow(instruction: Instruction) -> bool {
    matches!(
        instruction,
        Instruction::Stop
            | Instruction::Return
            | Instruction::Revert
            | Instruction::Invalid
            | Instruction::SelfDestruct
    )
}

// ============================================================================
// Builtins
// ============================================================================

/// A function provided by the dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinFunction {
    pub name: Name,
    pub parameters: usize,
    pub returns: usize,
    pub facts: EffectFacts,
    /// The native instruction this builtin maps to, if any.
    pub instruction: Option<Instruction>,
}

impl BuiltinFunction {
    pub fn from_instruction(instruction: Instruction) -> Self {
        Self {
            name: Name::new(instruction.name()),
            parameters: instruction.arguments(),
            returns: instruction.returns(),
            facts: semantic_information(instruction),
            instruction: Some(instruction),
        }
    }

    /// A builtin without a native counterpart.
    pub fn custom(name: impl Into<Name>, parameters: usize, returns: usize, facts: EffectFacts) -> Self {
        Self {
            name: name.into(),
            parameters,
            returns,
            facts,
            instruction: None,
        }
    }
}

/// Query surface of a dialect.
pub trait Dialect {
    fn name(&self) -> &str;

    /// The builtin called `name`, or `None` for user-defined functions.
    fn builtin(&self, name: &str) -> Option<&BuiltinFunction>;

    fn instruction_facts(&self, instruction: Instruction) -> EffectFacts {
        semantic_information(instruction)
    }

    /// Facts of a call by name; `None` if the callee is not a builtin.
    fn call_facts(&self, name: &str) -> Option<EffectFacts> {
        self.builtin(name).map(|builtin| builtin.facts)
    }
}

// ============================================================================
// EVM Dialect
// ============================================================================

/// Dialect exposing every native instruction as a builtin.
#[derive(Debug, Clone)]
pub struct EvmDialect {
    name: String,
    builtins: FxHashMap<Name, BuiltinFunction>,
}

impl EvmDialect {
    pub fn new() -> Self {
        let mut dialect = Self {
            name: "evm".to_string(),
            builtins: FxHashMap::default(),
        };
        for instruction in Instruction::ALL {
            dialect.define(BuiltinFunction::from_instruction(instruction));
        }
        dialect
    }

    /// Register a builtin, replacing any builtin of the same name.
    pub fn define(&mut self, builtin: BuiltinFunction) {
        self.builtins.insert(builtin.name.clone(), builtin);
    }

    pub fn with_builtin(mut self, builtin: BuiltinFunction) -> Self {
        self.define(builtin);
        self
    }

    pub fn builtins(&self) -> impl Iterator<Item = &BuiltinFunction> {
        self.builtins.values()
    }
}

impl Default for EvmDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for EvmDialect {
    fn name(&self) -> &str {
        &self.name
    }

    fn builtin(&self, name: &str) -> Option<&BuiltinFunction> {
        self.builtins.get(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arithmetic_is_pure() {
        for instr in [Instruction::Add, Instruction::Sub, Instruction::Eq, Instruction::IsZero] {
            assert_eq!(semantic_information(instr), EffectFacts::PURE, "{}", instr);
        }
    }

    #[test]
    fn test_sstore_facts() {
        let facts = semantic_information(Instruction::SStore);
        assert!(facts.is_store);
        assert!(facts.invalidates_storage);
        assert!(!facts.movable);
        assert!(!facts.side_effect_free);
        assert!(!facts.terminates_control_flow);
    }

    #[test]
    fn test_sload_is_side_effect_free_but_not_movable() {
        let facts = semantic_information(Instruction::SLoad);
        assert!(facts.side_effect_free);
        assert!(!facts.movable);
        assert!(!facts.invalidates_storage);
    }

    #[test]
    fn test_calls_invalidate_storage() {
        assert!(semantic_information(Instruction::Call).invalidates_storage);
        assert!(semantic_information(Instruction::DelegateCall).invalidates_storage);
        assert!(semantic_information(Instruction::Create2).invalidates_storage);
        assert!(!semantic_information(Instruction::StaticCall).invalidates_storage);
    }

    #[test]
    fn test_terminating_instructions() {
        let terminating: Vec<_> = Instruction::ALL
            .iter()
            .copied()
            .filter(|instr| semantic_information(*instr).terminates_control_flow)
            .collect();
        assert_eq!(
            terminating,
            vec![
                Instruction::Stop,
                Instruction::Return,
                Instruction::Revert,
                Instruction::Invalid,
                Instruction::SelfDestruct,
            ]
        );
    }

    #[test]
    fn test_evm_dialect_registers_all_instructions() {
        let dialect = EvmDialect::new();
        assert_eq!(dialect.name(), "evm");
        assert_eq!(dialect.builtins().count(), Instruction::ALL.len());

        let sstore = dialect.builtin("sstore").expect("sstore is a builtin");
        assert_eq!(sstore.instruction, Some(Instruction::SStore));
        assert_eq!(sstore.parameters, 2);
        assert!(dialect.builtin("my_function").is_none());
        assert_eq!(dialect.call_facts("my_function"), None);
    }

    #[test]
    fn test_custom_builtin() {
        let dialect = EvmDialect::new().with_builtin(BuiltinFunction::custom(
            "checked_add",
            2,
            1,
            EffectFacts {
                movable: false,
                side_effect_free: false,
                ..EffectFacts::PURE
            },
        ));
        let facts = dialect.call_facts("checked_add").expect("registered");
        assert!(!facts.movable);
        assert!(!facts.invalidates_storage);
        assert_eq!(dialect.builtin("checked_add").and_then(|b| b.instruction), None);
    }
}
