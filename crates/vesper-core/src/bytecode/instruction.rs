//! Bytecode Instruction Representation
//!
//! Three-address instruction format shared by the compiler, the bytecode
//! reader/writer and the VM. This layer contains no execution semantics.

use super::opcode::OpCode;
use crate::host::HostId;

/// A single instruction operand: either a literal or a storage reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Float(f32),
    Str(String),

    /// Temporary register of the current frame
    Register(u32),

    /// Named local variable slot of the current frame
    Local(u32),

    /// Shared global variable
    Global(u32),
}

impl Operand {
    /// Registers, locals and globals can be written to.
    pub fn is_addressable(&self) -> bool {
        matches!(
            self,
            Operand::Register(_) | Operand::Local(_) | Operand::Global(_)
        )
    }

    pub fn is_literal(&self) -> bool {
        !self.is_addressable()
    }

    pub fn register(&self) -> Option<u32> {
        match self {
            Operand::Register(r) => Some(*r),
            _ => None,
        }
    }
}

/// What an instruction does.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Native function registered by the host (built-in keywords included)
    Host(HostId),

    /// User-defined function, by index into the program
    Call(u32),

    /// Arithmetic, logical, comparison or assignment operator
    Code(OpCode),

    BlockStart,
    BlockEnd,
}

/// One instruction ("line"): an operation over an ordered operand list.
/// When `has_result` is set the last operand is the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub op: Op,
    pub params: Vec<Operand>,
    pub has_result: bool,
}

impl Line {
    pub fn new(op: Op, params: Vec<Operand>, has_result: bool) -> Self {
        Line {
            op,
            params,
            has_result,
        }
    }

    /// Block marker with no operands
    pub fn marker(op: Op) -> Self {
        Line::new(op, Vec::new(), false)
    }

    /// Source operands (everything except the destination, if any)
    pub fn inputs(&self) -> &[Operand] {
        if self.has_result && !self.params.is_empty() {
            &self.params[..self.params.len() - 1]
        } else {
            &self.params
        }
    }

    /// Result destination, if the call site asked for one
    pub fn destination(&self) -> Option<&Operand> {
        if self.has_result {
            self.params.last()
        } else {
            None
        }
    }

    /// Number of inputs, i.e. the argument count of a call
    pub fn argc(&self) -> usize {
        self.inputs().len()
    }
}
