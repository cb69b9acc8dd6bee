//! Vesper Compiler
//!
//! Source text to bytecode in five passes: tokenize, parse to RPN, lower to
//! three-address instructions, check, then postprocess and resolve. Any
//! error aborts the compilation and nothing is written.

pub mod check;
pub mod lexer;
pub mod lower;
pub mod optimize;
pub mod parser;
pub mod token;

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::bytecode::{BytecodeWriter, Program};
use crate::config::CompileOptions;
use crate::env::Environment;
use crate::error::{CompileError, CompileResult};
use crate::host::HostRegistry;
use parser::ParsedProgram;

/// Call signatures visible to the compiler: host functions (keywords
/// included) and the script's own functions.
pub struct Signatures<'a> {
    program: &'a ParsedProgram,
    hosts: &'a HostRegistry,
}

impl<'a> Signatures<'a> {
    pub fn new(program: &'a ParsedProgram, hosts: &'a HostRegistry) -> Self {
        Signatures { program, hosts }
    }

    pub fn hosts(&self) -> &'a HostRegistry {
        self.hosts
    }

    /// Parameter count of a callable name
    pub fn arity(&self, name: &str) -> Option<usize> {
        if let Some(id) = self.hosts.lookup(name) {
            return self.hosts.arity(id);
        }
        self.user_index(name)
            .and_then(|index| self.program.get_index(index as usize))
            .map(|(_, function)| function.argn as usize)
    }

    /// Program index of a user function; the entry point is not callable.
    pub fn user_index(&self, name: &str) -> Option<u32> {
        if name.is_empty() {
            return None;
        }
        self.program.get_index_of(name).map(|index| index as u32)
    }
}

/// Compile source text into a program.
pub fn compile(source: &str, env: &Environment) -> CompileResult<Program> {
    let tokens = lexer::tokenize(source)?;
    debug!("tokenized {} lexeme(s)", tokens.len());

    let parsed = parser::parse(&tokens, env)?;
    let sigs = Signatures::new(&parsed, env.hosts());

    let mut functions = Vec::with_capacity(parsed.len());
    for function in parsed.values() {
        let mut instrs = lower::lower(function, &sigs)?;
        check::check(&function.name, &instrs, &sigs)?;
        optimize::optimize(&function.name, &mut instrs)?;
        let function = optimize::resolve(function, instrs, &sigs)?;
        debug!(
            "compiled '{}': {} line(s), {} variable(s), {} register(s)",
            function.name,
            function.lines.len(),
            function.varn,
            function.regn
        );
        functions.push(function);
    }

    Ok(Program {
        functions,
        entry: 0,
    })
}

/// Compile a source file and write the bytecode to `out`.
pub fn compile_file(
    src: &Path,
    out: &Path,
    env: &Environment,
    options: CompileOptions,
) -> CompileResult<Program> {
    let source = fs::read_to_string(src).map_err(|source| CompileError::Read {
        path: src.to_path_buf(),
        source,
    })?;

    let program = compile(&source, env)?;
    if options.trace {
        print!("{}", program.trace(env.hosts()));
    }

    BytecodeWriter::save(&program, env.hosts(), out)?;
    info!("compiled {} -> {}", src.display(), out.display());
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Op, Operand};

    #[test]
    fn entry_point_comes_first() {
        let env = Environment::new();
        let program = compile("def f(a){ return(a); } x = f(2);", &env).unwrap();
        assert_eq!(program.entry, 0);
        assert_eq!(program.functions[0].name, "");
        assert_eq!(program.functions[1].name, "f");
        assert_eq!(program.functions[1].argn, 1);
        assert_eq!(program.functions[0].lines[0].op, Op::Call(1));
        assert_eq!(
            program.functions[0].lines[0].params,
            vec![Operand::Int(2), Operand::Local(0)]
        );
    }

    #[test]
    fn keywords_resolve_to_host_ids() {
        let env = Environment::new();
        let program = compile("print(\"hi\");", &env).unwrap();
        let line = &program.functions[0].lines[0];
        assert_eq!(line.op, Op::Host(env.hosts().lookup("print").unwrap()));
        assert!(!line.has_result);
    }

    #[test]
    fn entry_point_is_not_callable() {
        let env = Environment::new();
        let program = ParsedProgram::default();
        assert_eq!(Signatures::new(&program, env.hosts()).user_index(""), None);
    }

    #[test]
    fn missing_source_is_a_read_error() {
        let env = Environment::new();
        let res = compile_file(
            Path::new("/nonexistent/script.vsp"),
            Path::new("/nonexistent/script.vbc"),
            &env,
            CompileOptions::default(),
        );
        assert!(matches!(res, Err(CompileError::Read { .. })));
    }
}
