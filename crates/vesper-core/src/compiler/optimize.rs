//! Postprocessing
//!
//! Removes temporaries that only carry a value from one instruction to the
//! next, then resolves symbols to bytecode operands:
//!
//! - `x = <temp>` writes the producing instruction straight into `x`
//! - a result of `=` or a compound assignment is replaced by its target
//! - `-` applied to a literal is folded
//! - statements without effect (`5 = x;`, `-x;`) are dropped

use super::lower::Instr;
use super::parser::ParsedFunction;
use super::token::{Fixity, Sym};
use super::Signatures;
use crate::bytecode::{Function, Line, Op, OpCode, Operand};
use crate::error::{CompileError, CompileResult};

/// Simplify one function's instructions in place.
pub fn optimize(function: &str, instrs: &mut Vec<Instr>) -> CompileResult<()> {
    let invalid = || CompileError::InvalidInstruction {
        function: function.to_string(),
    };

    // Pending substitutions: (temporary, value that replaces it)
    let mut replace: Vec<(Sym, Sym)> = Vec::new();
    let mut i = 0;

    while i < instrs.len() {
        let instr = &mut instrs[i];
        let inputs = instr.input_count();
        if instr.params.len() < instr.has_result as usize {
            return Err(invalid());
        }

        for param in &mut instr.params[..inputs] {
            if let Some(at) = replace.iter().position(|(from, _)| from == param) {
                *param = replace.remove(at).1;
            }
        }
        if instr.has_result {
            let dest = &instr.params[inputs];
            replace.retain(|(from, _)| from != dest);
        }

        let (code, fixity) = match instr.op {
            Sym::Operator(code, fixity) => (code, fixity),
            _ => {
                i += 1;
                continue;
            }
        };
        if inputs != Sym::operator_arity(code, fixity) {
            return Err(invalid());
        }

        match (code, fixity) {
            (OpCode::Assign, _) => {
                let target = instr.params[0].clone();
                if !target.is_addressable() {
                    if !instr.has_result {
                        instrs.remove(i);
                        continue;
                    }
                } else {
                    if instr.has_result {
                        if let Some(result) = instr.params.pop() {
                            replace.push((result, target.clone()));
                        }
                        instr.has_result = false;
                    }
                    if let Sym::Temp(_) = instr.params[1] {
                        let source = instr.params[1].clone();
                        let producer = instrs[..i]
                            .iter()
                            .rposition(|p| p.has_result && p.params.last() == Some(&source));
                        if let Some(j) = producer {
                            if let Some(dest) = instrs[j].params.last_mut() {
                                *dest = target;
                            }
                            instrs.remove(i);
                            continue;
                        }
                    }
                }
            }
            (OpCode::Sub, Fixity::Prefix) => {
                if !instr.has_result {
                    instrs.remove(i);
                    continue;
                }
                let folded = match instr.params[0] {
                    Sym::Int(v) => Some(Sym::Int(v.wrapping_neg())),
                    Sym::Float(v) => Some(Sym::Float(-v)),
                    _ => None,
                };
                if let Some(folded) = folded {
                    let result = instr.params[1].clone();
                    replace.push((result, folded));
                    instrs.remove(i);
                    continue;
                }
            }
            (code, _) if code.is_compound_assign() => {
                let target = instr.params[0].clone();
                if instr.has_result && target.is_addressable() {
                    if let Some(result) = instr.params.pop() {
                        replace.push((result, target));
                    }
                    instr.has_result = false;
                }
            }
            _ => {}
        }
        i += 1;
    }

    Ok(())
}

/// Resolve symbols to operands and build the bytecode function.
pub fn resolve(
    parsed: &ParsedFunction,
    instrs: Vec<Instr>,
    sigs: &Signatures<'_>,
) -> CompileResult<Function> {
    let mut function = Function::new(parsed.name.clone(), parsed.argn);
    function.varn = parsed.vars.len() as u32;

    let mut regn = 0;
    for instr in instrs {
        let op = match &instr.op {
            Sym::Function { name, .. } => {
                if let Some(id) = sigs.hosts().lookup(name) {
                    Op::Host(id)
                } else {
                    let index = sigs
                        .user_index(name)
                        .ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
                    Op::Call(index)
                }
            }
            Sym::Operator(code, _) => Op::Code(*code),
            Sym::BlockStart => Op::BlockStart,
            Sym::BlockEnd => Op::BlockEnd,
            _ => {
                return Err(CompileError::InvalidInstruction {
                    function: parsed.name.clone(),
                })
            }
        };

        let mut params = Vec::with_capacity(instr.params.len());
        for param in instr.params {
            let operand = match param {
                Sym::Int(v) => Operand::Int(v),
                Sym::Float(v) => Operand::Float(v),
                Sym::Str(s) => Operand::Str(s),
                Sym::Global(g) => Operand::Global(g),
                Sym::Temp(r) => {
                    regn = regn.max(r + 1);
                    Operand::Register(r)
                }
                Sym::Var(name) => {
                    let slot = parsed.vars.get_index_of(&name).ok_or_else(|| {
                        CompileError::InvalidOperand {
                            function: parsed.name.clone(),
                        }
                    })?;
                    Operand::Local(slot as u32)
                }
                _ => {
                    return Err(CompileError::InvalidOperand {
                        function: parsed.name.clone(),
                    })
                }
            };
            params.push(operand);
        }

        function.lines.push(Line::new(op, params, instr.has_result));
    }
    function.regn = regn;

    Ok(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{lexer::tokenize, lower::lower, parser::parse};
    use crate::env::Environment;

    fn optimized(source: &str) -> Vec<Instr> {
        let env = Environment::new();
        let program = parse(&tokenize(source).unwrap(), &env).unwrap();
        let sigs = Signatures::new(&program, env.hosts());
        let mut instrs = lower(&program[""], &sigs).unwrap();
        optimize("", &mut instrs).unwrap();
        instrs
    }

    fn var(name: &str) -> Sym {
        Sym::Var(name.to_string())
    }

    #[test]
    fn assignment_from_temporary_is_folded_into_producer() {
        let instrs = optimized("x = a + b;");
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].params, vec![var("a"), var("b"), var("x")]);
        assert!(instrs[0].has_result);
    }

    #[test]
    fn chained_assignment_uses_the_target() {
        let instrs = optimized("a = b = 5;");
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].params, vec![var("b"), Sym::Int(5)]);
        assert_eq!(instrs[1].params, vec![var("a"), var("b")]);
    }

    #[test]
    fn negative_literals_are_folded() {
        let instrs = optimized("x = -5 * y;");
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].params, vec![Sym::Int(-5), var("y"), var("x")]);

        let instrs = optimized("x = -7;");
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].params, vec![var("x"), Sym::Int(-7)]);
    }

    #[test]
    fn dead_statements_are_removed_without_skipping() {
        let instrs = optimized("-x; 5 = y; z = 1;");
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].params, vec![var("z"), Sym::Int(1)]);
    }

    #[test]
    fn compound_assignment_result_is_its_target() {
        let instrs = optimized("y = x += 2;");
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].params, vec![var("x"), Sym::Int(2)]);
        assert_eq!(instrs[1].params, vec![var("y"), var("x")]);
    }

    #[test]
    fn resolves_slots_and_counts_registers() {
        let env = Environment::new();
        let program = parse(&tokenize("x = a * b + c * d;").unwrap(), &env).unwrap();
        let sigs = Signatures::new(&program, env.hosts());
        let mut instrs = lower(&program[""], &sigs).unwrap();
        optimize("", &mut instrs).unwrap();
        let function = resolve(&program[""], instrs, &sigs).unwrap();
        assert_eq!(function.varn, 5);
        assert_eq!(function.regn, 2);
        assert_eq!(
            function.lines.last().map(|l| l.params.clone()),
            Some(vec![Operand::Register(0), Operand::Register(1), Operand::Local(0)])
        );
    }
}
