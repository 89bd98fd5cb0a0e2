//! Native instruction identities.
//!
//! An [`Instruction`] only names an operation of the target machine. What an
//! instruction does (movability, storage effects, termination) is dialect
//! knowledge and lives in `sable-dialect`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instruction {
    Stop,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    SDiv,
    Mod,
    SMod,
    Exp,
    // Comparison and bitwise logic
    Not,
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Byte,
    Shl,
    Shr,
    Sar,
    Keccak256,
    // Environment
    Address,
    Balance,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    ReturnDataSize,
    ExtCodeSize,
    ExtCodeHash,
    Gas,
    MSize,
    // Stack, memory and storage
    Pop,
    MLoad,
    MStore,
    SLoad,
    SStore,
    // Logging
    Log0,
    Log1,
    // Calls and creation
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
    // Halting
    Return,
    Revert,
    Invalid,
    SelfDestruct,
}

impl Instruction {
    pub const ALL: [Instruction; 52] = [
        Instruction::Stop,
        Instruction::Add,
        Instruction::Sub,
        Instruction::Mul,
        Instruction::Div,
        Instruction::SDiv,
        Instruction::Mod,
        Instruction::SMod,
        Instruction::Exp,
        Instruction::Not,
        Instruction::Lt,
        Instruction::Gt,
        Instruction::SLt,
        Instruction::SGt,
        Instruction::Eq,
        Instruction::IsZero,
        Instruction::And,
        Instruction::Or,
        Instruction::Xor,
        Instruction::Byte,
        Instruction::Shl,
        Instruction::Shr,
        Instruction::Sar,
        Instruction::Keccak256,
        Instruction::Address,
        Instruction::Balance,
        Instruction::Caller,
        Instruction::CallValue,
        Instruction::CallDataLoad,
        Instruction::CallDataSize,
        Instruction::ReturnDataSize,
        Instruction::ExtCodeSize,
        Instruction::ExtCodeHash,
        Instruction::Gas,
        Instruction::MSize,
        Instruction::Pop,
        Instruction::MLoad,
        Instruction::MStore,
        Instruction::SLoad,
        Instruction::SStore,
        Instruction::Log0,
        Instruction::Log1,
        Instruction::Call,
        Instruction::CallCode,
        Instruction::DelegateCall,
        Instruction::StaticCall,
        Instruction::Create,
        Instruction::Create2,
        Instruction::Return,
        Instruction::Revert,
        Instruction::Invalid,
        Instruction::SelfDestruct,
    ];

    /// Mnemonic used for the builtin of the same name.
    pub fn name(self) -> &'static str {
        match self {
            Instruction::Stop => "stop",
            Instruction::Add => "add",
            Instruction::Sub => "sub",
            Instruction::Mul => "mul",
            Instruction::Div => "div",
            Instruction::SDiv => "sdiv",
            Instruction::Mod => "mod",
            Instruction::SMod => "smod",
            Instruction::Exp => "exp",
            Instruction::Not => "not",
            Instruction::Lt => "lt",
            Instruction::Gt => "gt",
            Instruction::SLt => "slt",
            Instruction::SGt => "sgt",
            Instruction::Eq => "eq",
            Instruction::IsZero => "iszero",
            Instruction::And => "and",
            Instruction::Or => "or",
            Instruction::Xor => "xor",
            Instruction::Byte => "byte",
            Instruction::Shl => "shl",
            Instruction::Shr => "shr",
            Instruction::Sar => "sar",
            Instruction::Keccak256 => "keccak256",
            Instruction::Address => "address",
            Instruction::Balance => "balance",
            Instruction::Caller => "caller",
            Instruction::CallValue => "callvalue",
            Instruction::CallDataLoad => "calldataload",
            Instruction::CallDataSize => "calldatasize",
            Instruction::ReturnDataSize => "returndatasize",
            Instruction::ExtCodeSize => "extcodesize",
            Instruction::ExtCodeHash => "extcodehash",
            Instruction::Gas => "gas",
            Instruction::MSize => "msize",
            Instruction::Pop => "pop",
            Instruction::MLoad => "mload",
            Instruction::MStore => "mstore",
            Instruction::SLoad => "sload",
            Instruction::SStore => "sstore",
            Instruction::Log0 => "log0",
            Instruction::Log1 => "log1",
            Instruction::Call => "call",
            Instruction::CallCode => "callcode",
            Instruction::DelegateCall => "delegatecall",
            Instruction::StaticCall => "staticcall",
            Instruction::Create => "create",
            Instruction::Create2 => "create2",
            Instruction::Return => "return",
            Instruction::Revert => "revert",
            Instruction::Invalid => "invalid",
            Instruction::SelfDestruct => "selfdestruct",
        }
    }

    pub fn from_name(name: &str) -> Option<Instruction> {
        Instruction::ALL.iter().copied().find(|instr| instr.name() == name)
    }

    /// Number of stack arguments consumed.
    pub fn arguments(self) -> usize {
        match self {
            Instruction::Stop
            | Instruction::Invalid
            | Instruction::Address
            | Instruction::Caller
            | Instruction::CallValue
            | Instruction::CallDataSize
            | Instruction::ReturnDataSize
            | Instruction::Gas
            | Instruction::MSize => 0,
            Instruction::Not
            | Instruction::IsZero
            | Instruction::Balance
            | Instruction::CallDataLoad
            | Instruction::ExtCodeSize
            | Instruction::ExtCodeHash
            | Instruction::Pop
            | Instruction::MLoad
            | Instruction::SLoad
            | Instruction::SelfDestruct => 1,
            Instruction::Log1 | Instruction::Create => 3,
            Instruction::Create2 => 4,
            Instruction::DelegateCall | Instruction::StaticCall => 6,
            Instruction::Call | Instruction::CallCode => 7,
            _ => 2,
        }
    }

    /// Number of results produced (zero or one).
    pub fn returns(self) -> usize {
        match self {
            Instruction::Stop
            | Instruction::Invalid
            | Instruction::Pop
            | Instruction::MStore
            | Instruction::SStore
            | Instruction::Log0
            | Instruction::Log1
            | Instruction::Return
            | Instruction::Revert
            | Instruction::SelfDestruct => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip_for_every_instruction() {
        for instr in Instruction::ALL {
            assert_eq!(Instruction::from_name(instr.name()), Some(instr));
        }
        assert_eq!(Instruction::from_name("frobnicate"), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(Instruction::SStore.arguments(), 2);
        assert_eq!(Instruction::SStore.returns(), 0);
        assert_eq!(Instruction::SLoad.arguments(), 1);
        assert_eq!(Instruction::SLoad.returns(), 1);
        assert_eq!(Instruction::Call.arguments(), 7);
        assert_eq!(Instruction::Gas.arguments(), 0);
    }
}
