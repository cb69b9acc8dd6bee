//! Bytecode Writer
//!
//! Serializes a compiled program to the binary layout in `format`.
//! Calls are written by name and re-resolved when the file is loaded.

use std::fs;
use std::path::Path;

use super::format::*;
use super::instruction::{Line, Op, Operand};
use super::program::Program;
use crate::error::{CompileError, CompileResult};
use crate::host::HostRegistry;

/// Bytecode writer
pub struct BytecodeWriter;

impl BytecodeWriter {
    /// Serialize a program to bytes
    pub fn write(program: &Program, hosts: &HostRegistry) -> CompileResult<Vec<u8>> {
        let mut out = Vec::new();

        Self::write_u32(&mut out, MAGIC);
        Self::write_u32(&mut out, program.functions.len() as u32);

        for function in &program.functions {
            Self::write_str(&mut out, &function.name);
            Self::write_u32(&mut out, function.argn);
        }

        for function in &program.functions {
            Self::write_u32(&mut out, function.regn);
            Self::write_u32(&mut out, function.varn);
            Self::write_u32(&mut out, function.lines.len() as u32);
            for line in &function.lines {
                Self::write_line(&mut out, line, program, hosts).ok_or_else(|| {
                    CompileError::InvalidInstruction {
                        function: function.name.clone(),
                    }
                })?;
            }
        }

        log::debug!(
            "serialized {} function(s) into {} bytes",
            program.functions.len(),
            out.len()
        );
        Ok(out)
    }

    /// Serialize a program and write it to `path`
    pub fn save(program: &Program, hosts: &HostRegistry, path: &Path) -> CompileResult<()> {
        let bytes = Self::write(program, hosts)?;
        fs::write(path, bytes).map_err(|source| CompileError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_line(
        out: &mut Vec<u8>,
        line: &Line,
        program: &Program,
        hosts: &HostRegistry,
    ) -> Option<()> {
        match &line.op {
            Op::Host(id) => {
                out.push(TAG_FUNCTION);
                Self::write_str(out, hosts.name(*id)?);
            }
            Op::Call(index) => {
                out.push(TAG_FUNCTION);
                Self::write_str(out, &program.function(*index as usize)?.name);
            }
            Op::Code(code) => {
                out.push(TAG_OPCODE);
                Self::write_u32(out, *code as u32);
            }
            Op::BlockStart => {
                out.push(TAG_BLOCK_START);
                Self::write_str(out, "{");
            }
            Op::BlockEnd => {
                out.push(TAG_BLOCK_END);
                Self::write_str(out, "}");
            }
        }

        out.push(line.has_result as u8);
        Self::write_u32(out, line.params.len() as u32);
        for param in &line.params {
            Self::write_operand(out, param);
        }
        Some(())
    }

    fn write_operand(out: &mut Vec<u8>, operand: &Operand) {
        match operand {
            Operand::Str(s) => {
                out.push(TAG_STR);
                Self::write_str(out, s);
            }
            Operand::Int(i) => {
                out.push(TAG_INT);
                out.extend_from_slice(&i.to_le_bytes());
            }
            Operand::Float(x) => {
                out.push(TAG_FLOAT);
                out.extend_from_slice(&x.to_le_bytes());
            }
            Operand::Register(r) => {
                out.push(TAG_REGISTER);
                Self::write_u32(out, *r);
            }
            Operand::Local(v) => {
                out.push(TAG_LOCAL);
                Self::write_u32(out, *v);
            }
            Operand::Global(g) => {
                out.push(TAG_GLOBAL);
                Self::write_u32(out, *g);
            }
        }
    }

    fn write_u32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(out: &mut Vec<u8>, s: &str) {
        Self::write_u32(out, s.len() as u32);
        out.extend_from_slice(s.as_bytes());
    }
}
