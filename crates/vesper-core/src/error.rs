//! Vesper Error Types
//!
//! Defines every error condition produced by the engine, split by tier:
//! compilation, bytecode loading, host registration and script execution.
//! Compile and load errors are final for the attempt; runtime errors carry the
//! location the VM was at when it entered the Error state.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::vm::State;

/// Compile-time failure. Any of these aborts the whole compilation; no
/// bytecode is written.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read source {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write bytecode {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    // Tokenizer
    #[error("unterminated block comment (missing '*/')")]
    UnterminatedComment,

    // Parser
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { token: String, line: u32 },

    #[error("line {line}: unmatched bracket")]
    UnmatchedBracket { line: u32 },

    #[error("unexpected end of input{}", in_function(.function))]
    UnexpectedEof { function: String },

    #[error("line {line}: invalid function definition '{name}'")]
    InvalidFunctionName { name: String, line: u32 },

    #[error("line {line}: duplicate parameter '{name}' in function '{function}'")]
    DuplicateParameter { function: String, name: String, line: u32 },

    #[error("line {line}: 'def' cannot be used as an identifier")]
    ReservedIdentifier { line: u32 },

    #[error("line {line}: invalid global variable '@{index}'")]
    UnknownGlobal { index: String, line: u32 },

    #[error("line {line}: invalid literal '{literal}'")]
    InvalidLiteral { literal: String, line: u32 },

    // Lowering, checking and postprocessing
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("'{name}' expects {expected} parameter(s), found {found}")]
    ArityMismatch { name: String, expected: usize, found: usize },

    #[error("malformed expression{}", in_function(.function))]
    MalformedExpression { function: String },

    #[error("parameter must be a value or variable{}", in_function(.function))]
    InvalidOperand { function: String },

    #[error("instruction is not a call, operator or block marker{}", in_function(.function))]
    InvalidInstruction { function: String },
}

fn in_function(name: &str) -> String {
    if name.is_empty() {
        " in main".to_string()
    } else {
        format!(" in function '{}'", name)
    }
}

/// Bytecode load failure. Nothing is left runnable after one of these.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read bytecode: {0}")]
    Io(#[from] io::Error),

    #[error("invalid bytecode magic number 0x{0:08X}")]
    InvalidMagicNumber(u32),

    #[error("bytecode is truncated")]
    Truncated,

    #[error("unknown tag {0}")]
    UnknownTag(u8),

    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    #[error("invalid utf-8 in bytecode string")]
    InvalidUtf8,

    #[error("bytecode has no entry point")]
    MissingEntryPoint,

    #[error("bytecode has more than one entry point")]
    DuplicateEntryPoint,

    #[error("unresolved function '{0}'")]
    UnresolvedFunction(String),

    #[error("operand out of bounds in function {function}, line {line}")]
    OperandOutOfBounds { function: usize, line: usize },

    #[error("function {function} needs {slots} slots, limit is {limit}")]
    FrameTooLarge { function: usize, slots: usize, limit: usize },

    #[error("call to '{callee}' passes {found} argument(s), expected {expected}")]
    ArityMismatch { callee: String, expected: usize, found: usize },

    #[error("a program is already loaded")]
    AlreadyLoaded,
}

/// Host function registration failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("function '{0}' is already registered")]
    Duplicate(String),

    #[error("'{0}' is not a valid function name")]
    InvalidName(String),
}

/// What went wrong while executing. Host callbacks return this to signal
/// invalid arguments; the VM attaches the location and stops.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("no program loaded")]
    NotLoaded,

    #[error("script cannot run from the {0:?} state")]
    NotRunnable(State),

    #[error("malformed operation '{0}'")]
    TypeMismatch(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("read of an uninitialized value")]
    Uninitialized,

    #[error("operand is not assignable")]
    NotAssignable,

    #[error("invalid operand")]
    InvalidOperand,

    #[error("invalid global variable {0}")]
    InvalidGlobal(usize),

    #[error("unexpected block start")]
    UnexpectedBlockStart,

    #[error("unexpected block end")]
    UnexpectedBlockEnd,

    #[error("no block follows the condition")]
    MissingBlock,

    #[error("malformed block")]
    MalformedBlock,

    #[error("return stack is empty")]
    ReturnOutsideCall,

    #[error("call site expects a value but the function returned none")]
    MissingReturnValue,

    #[error("'{0}' does not return a result")]
    NoResult(String),

    #[error("wrong number of arguments: expected {expected}, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("maximum call depth {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("{0}")]
    Host(String),
}

/// A fault together with the VM location it happened at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{fault} (function {function}, pc {pc}, scope {scope})")]
pub struct RuntimeError {
    pub fault: Fault,
    pub function: usize,
    pub pc: usize,
    pub scope: usize,
}

/// Umbrella error for callers that drive the whole pipeline.
#[derive(Debug, Error)]
pub enum VesperError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type CompileResult<T> = Result<T, CompileError>;
pub type LoadResult<T> = Result<T, LoadError>;
pub type VesperResult<T> = Result<T, VesperError>;
