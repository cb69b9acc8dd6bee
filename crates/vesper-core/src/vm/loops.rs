//! Loop Restart Points
//!
//! A `while` condition is computed by the instructions leading up to it.
//! When the loop body ends, execution has to jump back far enough to
//! recompute the condition. The restart point is found by a backward scan
//! over the register def-use chain feeding the condition.

use crate::bytecode::{Line, Op, OpCode, Operand};

/// Index to resume at when the loop whose `while` sits at `at` iterates.
///
/// Deterministic and side-effect free; the VM memoizes the result per
/// (function, instruction).
pub fn loop_restart_point(lines: &[Line], at: usize) -> usize {
    let Some(condition) = lines.get(at).and_then(|line| line.inputs().first()) else {
        return at;
    };
    let Some(register) = condition.register() else {
        return at;
    };

    let mut live = vec![register];

    for index in (0..at.min(lines.len())).rev() {
        let line = &lines[index];
        match line.op {
            Op::Code(OpCode::Assign) => {
                if let Some(dest) = line.params.first().and_then(Operand::register) {
                    if take(&mut live, dest) {
                        extend(&mut live, line.params.get(1));
                    }
                }
            }
            // Prefix negation: input then destination
            Op::Code(OpCode::Sub) if line.has_result && line.params.len() == 2 => {
                if let Some(dest) = line.params[1].register() {
                    if take(&mut live, dest) {
                        extend(&mut live, line.params.first());
                    }
                }
            }
            _ => {
                if let Some(dest) = line.destination().and_then(Operand::register) {
                    if take(&mut live, dest) {
                        for input in line.inputs() {
                            extend(&mut live, Some(input));
                        }
                    }
                }
            }
        }

        if live.is_empty() {
            return index;
        }
    }

    0
}

fn take(live: &mut Vec<u32>, register: u32) -> bool {
    match live.iter().position(|r| *r == register) {
        Some(pos) => {
            live.swap_remove(pos);
            true
        }
        None => false,
    }
}

fn extend(live: &mut Vec<u32>, operand: Option<&Operand>) {
    if let Some(register) = operand.and_then(Operand::register) {
        if !live.contains(&register) {
            live.push(register);
        }
    }
}
