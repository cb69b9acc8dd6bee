//! Three-Address Lowering
//!
//! Evaluates each RPN line symbolically: every operator or call consumes its
//! operands from the slot list and leaves a fresh temporary register behind.
//! Registers are reused as soon as their value has been consumed. Postfix
//! `++`/`--` are deferred until the rest of the line has been emitted.

use super::parser::{ParsedFunction, RpnLine};
use super::token::{Fixity, Sym};
use super::Signatures;
use crate::error::{CompileError, CompileResult};

/// An instruction before operands are resolved to frame slots. When
/// `has_result` is set the last param is the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub op: Sym,
    pub params: Vec<Sym>,
    pub has_result: bool,
}

impl Instr {
    fn marker(op: Sym) -> Self {
        Instr {
            op,
            params: Vec::new(),
            has_result: false,
        }
    }

    /// Number of params that are inputs
    pub fn input_count(&self) -> usize {
        self.params.len().saturating_sub(self.has_result as usize)
    }
}

/// Lowest-free register allocator
#[derive(Debug, Default)]
struct Registers {
    busy: Vec<bool>,
}

impl Registers {
    fn alloc(&mut self) -> u32 {
        match self.busy.iter().position(|b| !b) {
            Some(free) => {
                self.busy[free] = true;
                free as u32
            }
            None => {
                self.busy.push(true);
                (self.busy.len() - 1) as u32
            }
        }
    }

    fn free(&mut self, register: u32) {
        if let Some(slot) = self.busy.get_mut(register as usize) {
            *slot = false;
        }
    }

    fn clear(&mut self) {
        self.busy.iter_mut().for_each(|b| *b = false);
    }
}

/// Lower one parsed function into instructions.
pub fn lower(function: &ParsedFunction, sigs: &Signatures<'_>) -> CompileResult<Vec<Instr>> {
    let mut out = Vec::new();
    let mut registers = Registers::default();

    for line in &function.lines {
        match line {
            RpnLine::BlockStart => out.push(Instr::marker(Sym::BlockStart)),
            RpnLine::BlockEnd => out.push(Instr::marker(Sym::BlockEnd)),
            RpnLine::Expr(syms) => {
                registers.clear();
                lower_line(&function.name, syms, sigs, &mut registers, &mut out)?;
            }
        }
    }

    Ok(out)
}

fn lower_line(
    function: &str,
    syms: &[Sym],
    sigs: &Signatures<'_>,
    registers: &mut Registers,
    out: &mut Vec<Instr>,
) -> CompileResult<()> {
    if syms.len() == 1 && !matches!(syms[0], Sym::Function { .. }) {
        log::warn!("statement without effect in {}", display_name(function));
        return Ok(());
    }

    let malformed = || CompileError::MalformedExpression {
        function: function.to_string(),
    };

    let start = out.len();
    let mut slots = syms.to_vec();
    let mut postfix = Vec::new();
    let mut i = 0;

    while i < slots.len() {
        let arity = match &slots[i] {
            Sym::Operator(code, fixity) => Sym::operator_arity(*code, *fixity),
            Sym::Function { name, argc } => {
                let arity = sigs
                    .arity(name)
                    .ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
                let found = match argc {
                    Some(n) if *n != arity => Some(*n),
                    _ if i < arity => Some(i),
                    _ => None,
                };
                if let Some(found) = found {
                    return Err(CompileError::ArityMismatch {
                        name: name.clone(),
                        expected: arity,
                        found,
                    });
                }
                arity
            }
            _ => {
                i += 1;
                continue;
            }
        };
        if i < arity {
            return Err(malformed());
        }

        let j = i - arity;
        let params = slots[j..i].to_vec();
        if !params.iter().all(Sym::is_value) {
            return Err(CompileError::InvalidOperand {
                function: function.to_string(),
            });
        }

        let step = match &slots[i] {
            Sym::Operator(code, fixity) if code.is_postfix() => Some(*fixity),
            _ => None,
        };
        match step {
            Some(Fixity::Postfix) => {
                // The operand keeps its place as the expression's value
                postfix.push(Instr {
                    op: slots.remove(i),
                    params,
                    has_result: false,
                });
            }
            Some(_) => {
                out.push(Instr {
                    op: slots.remove(i),
                    params,
                    has_result: false,
                });
            }
            None => {
                for param in &params {
                    if let Sym::Temp(r) = param {
                        registers.free(*r);
                    }
                }
                let result = Sym::Temp(registers.alloc());
                let mut params = params;
                params.push(result.clone());
                out.push(Instr {
                    op: slots[i].clone(),
                    params,
                    has_result: true,
                });
                slots.splice(j..=i, [result]);
                i = j + 1;
            }
        }
    }

    // The value of a whole statement is discarded
    if let Some(last) = out[start..].last_mut() {
        if last.has_result {
            last.has_result = false;
            last.params.pop();
        }
    }
    out.append(&mut postfix);

    if slots.len() != 1 {
        return Err(malformed());
    }
    Ok(())
}

fn display_name(function: &str) -> &str {
    if function.is_empty() {
        "main"
    } else {
        function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;
    use crate::compiler::{lexer::tokenize, parser::parse};
    use crate::env::Environment;

    fn lower_src(source: &str) -> CompileResult<Vec<Instr>> {
        let env = Environment::with_globals(1);
        let program = parse(&tokenize(source)?, &env)?;
        let sigs = Signatures::new(&program, env.hosts());
        lower(&program[""], &sigs)
    }

    fn var(name: &str) -> Sym {
        Sym::Var(name.to_string())
    }

    fn op(code: OpCode) -> Sym {
        Sym::Operator(code, Fixity::Infix)
    }

    #[test]
    fn nested_expression_reuses_registers() {
        let instrs = lower_src("x = a * b + c * d;").unwrap();
        assert_eq!(
            instrs,
            vec![
                Instr {
                    op: op(OpCode::Mul),
                    params: vec![var("a"), var("b"), Sym::Temp(0)],
                    has_result: true
                },
                Instr {
                    op: op(OpCode::Mul),
                    params: vec![var("c"), var("d"), Sym::Temp(1)],
                    has_result: true
                },
                Instr {
                    op: op(OpCode::Add),
                    params: vec![Sym::Temp(0), Sym::Temp(1), Sym::Temp(0)],
                    has_result: true
                },
                Instr {
                    op: op(OpCode::Assign),
                    params: vec![var("x"), Sym::Temp(0)],
                    has_result: false
                },
            ]
        );
    }

    #[test]
    fn postfix_runs_after_the_statement() {
        let instrs = lower_src("x = y++;").unwrap();
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].op, op(OpCode::Assign));
        assert_eq!(instrs[0].params, vec![var("x"), var("y")]);
        assert_eq!(instrs[1].op, Sym::Operator(OpCode::Inc, Fixity::Postfix));
        assert_eq!(instrs[1].params, vec![var("y")]);
    }

    #[test]
    fn prefix_runs_in_place() {
        let instrs = lower_src("x = ++y;").unwrap();
        assert_eq!(instrs[0].op, Sym::Operator(OpCode::Inc, Fixity::Prefix));
        assert_eq!(instrs[1].params, vec![var("x"), var("y")]);

        let instrs = lower_src("++y;").unwrap();
        assert_eq!(instrs.len(), 1);
    }

    #[test]
    fn statements_drop_their_value() {
        let instrs = lower_src("print(1 + 2);").unwrap();
        assert!(instrs[0].has_result);
        assert!(!instrs[1].has_result);
        assert_eq!(instrs[1].params, vec![Sym::Temp(0)]);
    }

    #[test]
    fn lone_values_are_skipped() {
        assert!(lower_src("x; 5; @0;").unwrap().is_empty());
    }

    #[test]
    fn block_markers_pass_through() {
        let instrs = lower_src("while(x < 3){ x += 1; }").unwrap();
        let ops: Vec<&Sym> = instrs.iter().map(|i| &i.op).collect();
        assert_eq!(ops[2], &Sym::BlockStart);
        assert_eq!(ops[4], &Sym::BlockEnd);
    }

    #[test]
    fn call_arguments_must_match_arity() {
        assert!(matches!(
            lower_src("def f(a, b){ return(a); } x = f(1);"),
            Err(CompileError::ArityMismatch { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            lower_src("print(1, 2);"),
            Err(CompileError::ArityMismatch { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn leftover_operands_are_malformed() {
        let env = Environment::new();
        let program = Default::default();
        let sigs = Signatures::new(&program, env.hosts());
        let mut out = Vec::new();
        let mut registers = Registers::default();

        let missing = [Sym::Int(1), op(OpCode::Add)];
        assert!(matches!(
            lower_line("", &missing, &sigs, &mut registers, &mut out),
            Err(CompileError::MalformedExpression { .. })
        ));
        let extra = [Sym::Int(1), Sym::Int(2)];
        assert!(matches!(
            lower_line("", &extra, &sigs, &mut registers, &mut out),
            Err(CompileError::MalformedExpression { .. })
        ));
    }
}
