//! Bytecode Loader
//!
//! Decodes and validates Vesper bytecode. Function names are resolved
//! against the live host registry first, then against the program's own
//! functions. Validation guarantees every operand fits its frame and every
//! call passes the callee's argument count, so the VM never indexes out of
//! bounds.

use std::fs;
use std::path::Path;

use crate::bytecode::format::*;
use crate::bytecode::{Function, Line, Op, OpCode, Operand, Program};
use crate::config::VmConfig;
use crate::error::{LoadError, LoadResult};
use crate::host::HostRegistry;

/// Bytecode loader
pub struct BytecodeLoader;

impl BytecodeLoader {
    /// Load and validate a bytecode file
    pub fn load_file(path: &Path, hosts: &HostRegistry, config: &VmConfig) -> LoadResult<Program> {
        let bytes = fs::read(path)?;
        Self::load(&bytes, hosts, config)
    }

    /// Load bytecode from raw bytes
    pub fn load(bytes: &[u8], hosts: &HostRegistry, config: &VmConfig) -> LoadResult<Program> {
        let mut reader = Reader::new(bytes);

        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(LoadError::InvalidMagicNumber(magic));
        }

        // Function table
        let count = reader.read_u32()? as usize;
        let mut functions = Vec::new();
        for _ in 0..count {
            let name = reader.read_str()?;
            let argn = reader.read_u32()?;
            functions.push(Function::new(name, argn));
        }

        let mut entry = None;
        for (index, function) in functions.iter().enumerate() {
            if function.is_entry() {
                if entry.is_some() {
                    return Err(LoadError::DuplicateEntryPoint);
                }
                entry = Some(index);
            }
        }
        let entry = entry.ok_or(LoadError::MissingEntryPoint)?;

        // Bodies
        let names: Vec<String> = functions.iter().map(|f| f.name.clone()).collect();
        for function in functions.iter_mut() {
            function.regn = reader.read_u32()?;
            function.varn = reader.read_u32()?;
            let line_count = reader.read_u32()? as usize;
            for _ in 0..line_count {
                function.lines.push(Self::read_line(&mut reader, &names, hosts)?);
            }
        }

        let program = Program { functions, entry };
        Self::validate(&program, hosts, config)?;

        log::debug!(
            "loaded {} function(s) from {} bytes",
            program.functions.len(),
            bytes.len()
        );
        Ok(program)
    }

    /// Structural checks shared by loaded and in-memory programs.
    pub fn validate(program: &Program, hosts: &HostRegistry, config: &VmConfig) -> LoadResult<()> {
        match program.function(program.entry) {
            Some(f) if f.is_entry() => {}
            _ => return Err(LoadError::MissingEntryPoint),
        }

        for (index, function) in program.functions.iter().enumerate() {
            if function.varn as usize > config.max_locals {
                return Err(LoadError::FrameTooLarge {
                    function: index,
                    slots: function.varn as usize,
                    limit: config.max_locals,
                });
            }
            if function.regn as usize > config.max_registers {
                return Err(LoadError::FrameTooLarge {
                    function: index,
                    slots: function.regn as usize,
                    limit: config.max_registers,
                });
            }
            if function.argn > function.varn {
                return Err(LoadError::OperandOutOfBounds {
                    function: index,
                    line: 0,
                });
            }

            for (at, line) in function.lines.iter().enumerate() {
                let out_of_bounds = LoadError::OperandOutOfBounds {
                    function: index,
                    line: at,
                };

                if line.has_result && line.params.is_empty() {
                    return Err(out_of_bounds);
                }
                for param in &line.params {
                    let fits = match param {
                        Operand::Register(r) => *r < function.regn,
                        Operand::Local(v) => *v < function.varn,
                        _ => true,
                    };
                    if !fits {
                        return Err(out_of_bounds);
                    }
                }

                let (callee, expected) = match &line.op {
                    Op::Call(target) => {
                        let callee = program
                            .function(*target as usize)
                            .ok_or_else(|| LoadError::UnresolvedFunction(format!("#{}", target)))?;
                        (callee.name.clone(), callee.argn as usize)
                    }
                    Op::Host(id) => {
                        let host = hosts
                            .get(*id)
                            .ok_or_else(|| LoadError::UnresolvedFunction(format!("host#{}", id.0)))?;
                        (host.name().to_string(), host.arity())
                    }
                    _ => continue,
                };
                if line.argc() != expected {
                    return Err(LoadError::ArityMismatch {
                        callee,
                        expected,
                        found: line.argc(),
                    });
                }
            }
        }
        Ok(())
    }

    fn read_line(reader: &mut Reader<'_>, names: &[String], hosts: &HostRegistry) -> LoadResult<Line> {
        let tag = reader.read_u8()?;
        let op = match tag {
            TAG_FUNCTION => {
                let name = reader.read_str()?;
                if let Some(id) = hosts.lookup(&name) {
                    Op::Host(id)
                } else if let Some(index) = names.iter().position(|n| !n.is_empty() && *n == name) {
                    Op::Call(index as u32)
                } else {
                    return Err(LoadError::UnresolvedFunction(name));
                }
            }
            TAG_OPCODE => {
                let raw = reader.read_u32()?;
                let code = u8::try_from(raw)
                    .ok()
                    .and_then(OpCode::from_u8)
                    .ok_or(LoadError::UnknownOpcode(raw))?;
                Op::Code(code)
            }
            TAG_BLOCK_START => {
                reader.read_str()?;
                Op::BlockStart
            }
            TAG_BLOCK_END => {
                reader.read_str()?;
                Op::BlockEnd
            }
            other => return Err(LoadError::UnknownTag(other)),
        };

        let has_result = reader.read_u8()? != 0;
        let count = reader.read_u32()? as usize;
        let mut params = Vec::new();
        for _ in 0..count {
            params.push(Self::read_operand(reader)?);
        }

        Ok(Line::new(op, params, has_result))
    }

    fn read_operand(reader: &mut Reader<'_>) -> LoadResult<Operand> {
        let tag = reader.read_u8()?;
        match tag {
            TAG_STR => Ok(Operand::Str(reader.read_str()?)),
            TAG_INT => Ok(Operand::Int(reader.read_u32()? as i32)),
            TAG_FLOAT => Ok(Operand::Float(f32::from_bits(reader.read_u32()?))),
            TAG_REGISTER => Ok(Operand::Register(reader.read_u32()?)),
            TAG_LOCAL => Ok(Operand::Local(reader.read_u32()?)),
            TAG_GLOBAL => Ok(Operand::Global(reader.read_u32()?)),
            other => Err(LoadError::UnknownTag(other)),
        }
    }
}

/// Bounds-checked little-endian cursor
struct Reader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, cursor: 0 }
    }

    fn take(&mut self, len: usize) -> LoadResult<&'a [u8]> {
        let end = self.cursor.checked_add(len).ok_or(LoadError::Truncated)?;
        let slice = self.bytes.get(self.cursor..end).ok_or(LoadError::Truncated)?;
        self.cursor = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> LoadResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> LoadResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_str(&mut self) -> LoadResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| LoadError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(functions: &[(&str, u32)]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(MAGIC.to_le_bytes());
        buf.extend((functions.len() as u32).to_le_bytes());
        for (name, argn) in functions {
            buf.extend((name.len() as u32).to_le_bytes());
            buf.extend(name.as_bytes());
            buf.extend(argn.to_le_bytes());
        }
        buf
    }

    fn body(buf: &mut Vec<u8>, regn: u32, varn: u32, lines: u32) {
        buf.extend(regn.to_le_bytes());
        buf.extend(varn.to_le_bytes());
        buf.extend(lines.to_le_bytes());
    }

    fn load(buf: &[u8]) -> LoadResult<Program> {
        BytecodeLoader::load(buf, &HostRegistry::new(), &VmConfig::new())
    }

    #[test]
    fn loads_empty_entry_point() {
        let mut buf = header(&[("", 0)]);
        body(&mut buf, 0, 0, 0);
        let program = load(&buf).unwrap();
        assert_eq!(program.entry, 0);
        assert!(program.functions[0].lines.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = header(&[("", 0)]);
        buf[0] ^= 0xFF;
        assert!(matches!(load(&buf), Err(LoadError::InvalidMagicNumber(_))));
    }

    #[test]
    fn rejects_truncated_input() {
        let mut buf = header(&[("", 0)]);
        body(&mut buf, 0, 0, 1);
        assert!(matches!(load(&buf), Err(LoadError::Truncated)));
        assert!(matches!(load(&buf[..6]), Err(LoadError::Truncated)));
    }

    #[test]
    fn rejects_missing_entry_point() {
        let mut buf = header(&[("f", 0)]);
        body(&mut buf, 0, 0, 0);
        assert!(matches!(load(&buf), Err(LoadError::MissingEntryPoint)));
    }

    #[test]
    fn rejects_unresolved_function() {
        let mut buf = header(&[("", 0)]);
        body(&mut buf, 0, 0, 1);
        buf.push(TAG_FUNCTION);
        buf.extend(4u32.to_le_bytes());
        buf.extend(b"nope");
        buf.push(0);
        buf.extend(0u32.to_le_bytes());
        assert!(matches!(load(&buf), Err(LoadError::UnresolvedFunction(name)) if name == "nope"));
    }

    #[test]
    fn rejects_register_outside_frame() {
        let mut buf = header(&[("", 0)]);
        body(&mut buf, 1, 0, 1);
        buf.push(TAG_OPCODE);
        buf.extend((OpCode::Inc as u32).to_le_bytes());
        buf.push(0);
        buf.extend(1u32.to_le_bytes());
        buf.push(TAG_REGISTER);
        buf.extend(1u32.to_le_bytes());
        assert!(matches!(
            load(&buf),
            Err(LoadError::OperandOutOfBounds { function: 0, line: 0 })
        ));
    }

    #[test]
    fn rejects_keyword_arity_mismatch() {
        let mut buf = header(&[("", 0)]);
        body(&mut buf, 0, 0, 1);
        buf.push(TAG_FUNCTION);
        buf.extend(5u32.to_le_bytes());
        buf.extend(b"print");
        buf.push(0);
        buf.extend(0u32.to_le_bytes());
        assert!(matches!(
            load(&buf),
            Err(LoadError::ArityMismatch { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn rejects_frames_over_limit() {
        let mut buf = header(&[("", 0)]);
        body(&mut buf, 0, 10, 0);
        let config = VmConfig {
            max_locals: 4,
            ..VmConfig::new()
        };
        let res = BytecodeLoader::load(&buf, &HostRegistry::new(), &config);
        assert!(matches!(res, Err(LoadError::FrameTooLarge { slots: 10, limit: 4, .. })));
    }
}
