//! Instruction Checker
//!
//! Verifies the shape of every lowered instruction before postprocessing.

use super::lower::Instr;
use super::token::Sym;
use super::Signatures;
use crate::error::{CompileError, CompileResult};

/// Check one function's instructions.
pub fn check(function: &str, instrs: &[Instr], sigs: &Signatures<'_>) -> CompileResult<()> {
    for instr in instrs {
        let arity = match &instr.op {
            Sym::Function { name, .. } => Some((
                name.as_str(),
                sigs.arity(name)
                    .ok_or_else(|| CompileError::UnknownFunction(name.clone()))?,
            )),
            Sym::Operator(code, fixity) => {
                Some((code.symbol(), Sym::operator_arity(*code, *fixity)))
            }
            Sym::BlockStart | Sym::BlockEnd => None,
            _ => {
                return Err(CompileError::InvalidInstruction {
                    function: function.to_string(),
                })
            }
        };

        if let Some((name, arity)) = arity {
            let found = instr.input_count();
            if found != arity || instr.params.len() != arity + instr.has_result as usize {
                return Err(CompileError::ArityMismatch {
                    name: name.to_string(),
                    expected: arity,
                    found,
                });
            }
        }

        if !instr.params.iter().all(Sym::is_value) {
            return Err(CompileError::InvalidOperand {
                function: function.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;
    use crate::compiler::parser::ParsedProgram;
    use crate::compiler::token::Fixity;
    use crate::env::Environment;

    fn run(instrs: &[Instr]) -> CompileResult<()> {
        let env = Environment::new();
        let program = ParsedProgram::default();
        check("", instrs, &Signatures::new(&program, env.hosts()))
    }

    #[test]
    fn accepts_well_formed_instructions() {
        let instrs = [
            Instr {
                op: Sym::Operator(OpCode::Add, Fixity::Infix),
                params: vec![Sym::Int(1), Sym::Var("a".into()), Sym::Temp(0)],
                has_result: true,
            },
            Instr {
                op: Sym::Function {
                    name: "print".into(),
                    argc: Some(1),
                },
                params: vec![Sym::Temp(0)],
                has_result: false,
            },
        ];
        assert!(run(&instrs).is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        let literal_op = Instr {
            op: Sym::Int(3),
            params: vec![],
            has_result: false,
        };
        assert!(matches!(run(&[literal_op]), Err(CompileError::InvalidInstruction { .. })));

        let unknown = Instr {
            op: Sym::Function {
                name: "nope".into(),
                argc: None,
            },
            params: vec![],
            has_result: false,
        };
        assert!(matches!(run(&[unknown]), Err(CompileError::UnknownFunction(_))));

        let short = Instr {
            op: Sym::Function {
                name: "print".into(),
                argc: None,
            },
            params: vec![],
            has_result: false,
        };
        assert!(matches!(run(&[short]), Err(CompileError::ArityMismatch { .. })));

        let bracket = Instr {
            op: Sym::Operator(OpCode::Not, Fixity::Prefix),
            params: vec![Sym::LeftBracket {
                call: false,
                commas: 0,
            }],
            has_result: false,
        };
        assert!(matches!(run(&[bracket]), Err(CompileError::InvalidOperand { .. })));
    }
}
