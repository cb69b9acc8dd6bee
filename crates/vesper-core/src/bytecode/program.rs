//! Compiled Program
//!
//! A program is an ordered list of functions with exactly one unnamed entry
//! point. It is immutable once compiled or loaded.

use std::fmt;

use super::instruction::{Line, Op, Operand};
use crate::host::HostRegistry;

/// One compiled function.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Empty for the entry point
    pub name: String,

    /// Declared parameter count; parameters occupy locals `0..argn`
    pub argn: u32,

    /// Named local variable slots (parameters included)
    pub varn: u32,

    /// Temporary registers
    pub regn: u32,

    pub lines: Vec<Line>,
}

impl Function {
    pub fn new(name: impl Into<String>, argn: u32) -> Self {
        Function {
            name: name.into(),
            argn,
            varn: 0,
            regn: 0,
            lines: Vec::new(),
        }
    }

    pub fn is_entry(&self) -> bool {
        self.name.is_empty()
    }
}

/// Compiled program
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,

    /// Index of the unnamed function
    pub entry: usize,
}

impl Program {
    pub fn function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    /// Index of a function by name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    /// Human-readable listing of the program
    pub fn trace<'a>(&'a self, hosts: &'a HostRegistry) -> ProgramTrace<'a> {
        ProgramTrace {
            program: self,
            hosts,
        }
    }
}

/// Display adapter printing every function's instructions.
pub struct ProgramTrace<'a> {
    program: &'a Program,
    hosts: &'a HostRegistry,
}

impl ProgramTrace<'_> {
    fn op_name(&self, op: &Op) -> String {
        match op {
            Op::Host(id) => self
                .hosts
                .name(*id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("host#{}", id.0)),
            Op::Call(index) => self
                .program
                .function(*index as usize)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("fn#{}", index)),
            Op::Code(code) => code.symbol().to_string(),
            Op::BlockStart => "{".to_string(),
            Op::BlockEnd => "}".to_string(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(i) => write!(f, "{}", i),
            Operand::Float(x) => write!(f, "{}", x),
            Operand::Str(s) => write!(f, "{:?}", s),
            Operand::Register(r) => write!(f, "r{}", r),
            Operand::Local(v) => write!(f, "v{}", v),
            Operand::Global(g) => write!(f, "@{}", g),
        }
    }
}

impl fmt::Display for ProgramTrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for function in &self.program.functions {
            if function.is_entry() {
                writeln!(f, "# main")?;
            } else {
                writeln!(f, "# function: {}", function.name)?;
            }
            writeln!(f, "# variable count: {}", function.varn)?;
            writeln!(f, "# register count: {}", function.regn)?;

            for (index, line) in function.lines.iter().enumerate() {
                write!(
                    f,
                    "{} -> {} [{}]",
                    index,
                    self.op_name(&line.op),
                    line.has_result as u8
                )?;
                for param in &line.params {
                    write!(f, " {}", param)?;
                }
                writeln!(f)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
