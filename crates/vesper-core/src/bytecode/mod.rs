pub mod format;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod writer;

pub use instruction::{Line, Op, Operand};
pub use opcode::OpCode;
pub use program::{Function, Program};
pub use writer::BytecodeWriter;
