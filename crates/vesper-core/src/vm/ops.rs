//! Operator Semantics
//!
//! Pure value-level implementation of every opcode. The VM resolves operands
//! and destinations; this module only computes results.
//!
//! Integer arithmetic wraps. Mixed int/float operands are computed in float.
//! `+` concatenates when either side is a string.

use std::cmp::Ordering;

use super::value::Value;
use crate::bytecode::OpCode;
use crate::error::Fault;

/// Binary operator (compound assignments map to their plain form)
pub fn binary(code: OpCode, a: &Value, b: &Value) -> Result<Value, Fault> {
    match code {
        OpCode::Add | OpCode::AddAssign => add(a, b),
        OpCode::Sub | OpCode::SubAssign => arith(code, a, b, i32::wrapping_sub, |x, y| x - y),
        OpCode::Mul | OpCode::MulAssign => arith(code, a, b, i32::wrapping_mul, |x, y| x * y),
        OpCode::Div | OpCode::DivAssign => divide(a, b),
        OpCode::Mod | OpCode::ModAssign => match (a, b) {
            (Value::Int(_), Value::Int(0)) => Err(Fault::DivisionByZero),
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_rem(*y))),
            _ => Err(Fault::TypeMismatch(code.symbol())),
        },

        OpCode::Equal
        | OpCode::NotEqual
        | OpCode::Greater
        | OpCode::Less
        | OpCode::GreaterEqual
        | OpCode::LessEqual => Ok(compare(code, a, b)),

        OpCode::BitAnd | OpCode::BitXor | OpCode::BitOr => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match code {
                OpCode::BitAnd => x & y,
                OpCode::BitXor => x ^ y,
                _ => x | y,
            })),
            _ => Err(Fault::TypeMismatch(code.symbol())),
        },

        OpCode::And | OpCode::Or | OpCode::Xor => {
            let x = truth(a)?;
            let y = truth(b)?;
            Ok(Value::from(match code {
                OpCode::And => x && y,
                OpCode::Or => x || y,
                _ => x != y,
            }))
        }

        OpCode::Assign | OpCode::Not | OpCode::Inc | OpCode::Dec => {
            Err(Fault::TypeMismatch(code.symbol()))
        }
    }
}

/// Prefix `-`
pub fn negate(v: &Value) -> Result<Value, Fault> {
    match v {
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Float(x) => Ok(Value::Float(-x)),
        _ => Err(Fault::TypeMismatch("-")),
    }
}

/// Prefix `!`
pub fn not(v: &Value) -> Result<Value, Fault> {
    Ok(Value::from(!truth(v)?))
}

/// `++` / `--`
pub fn step(code: OpCode, v: &Value) -> Result<Value, Fault> {
    let delta = if code == OpCode::Dec { -1 } else { 1 };
    match v {
        Value::Int(i) => Ok(Value::Int(i.wrapping_add(delta))),
        Value::Float(x) => Ok(Value::Float(x + delta as f32)),
        _ => Err(Fault::TypeMismatch(code.symbol())),
    }
}

fn truth(v: &Value) -> Result<bool, Fault> {
    v.truthy().ok_or(Fault::Uninitialized)
}

fn add(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::Str(format!("{}{}", concat_text(a)?, concat_text(b)?)))
        }
        _ => arith(OpCode::Add, a, b, i32::wrapping_add, |x, y| x + y),
    }
}

fn concat_text(v: &Value) -> Result<String, Fault> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(x) => Ok(format!("{:.6}", x)),
        Value::Uninit => Err(Fault::Uninitialized),
    }
}

fn arith(
    code: OpCode,
    a: &Value,
    b: &Value,
    int: fn(i32, i32) -> i32,
    float: fn(f32, f32) -> f32,
) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int(*x, *y))),
        _ => match (as_float(a), as_float(b)) {
            (Some(x), Some(y)) => Ok(Value::Float(float(x, y))),
            _ => Err(Fault::TypeMismatch(code.symbol())),
        },
    }
}

fn divide(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(Fault::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_div(*y))),
        _ => match (as_float(a), as_float(b)) {
            (Some(_), Some(y)) if y == 0.0 => Err(Fault::DivisionByZero),
            (Some(x), Some(y)) => Ok(Value::Float(x / y)),
            _ => Err(Fault::TypeMismatch("/")),
        },
    }
}

fn as_float(v: &Value) -> Option<f32> {
    match v {
        Value::Int(i) => Some(*i as f32),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

/// Comparisons never fail: a string against a number is simply false,
/// whatever the operator.
fn compare(code: OpCode, a: &Value, b: &Value) -> Value {
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        _ => match (as_float(a), as_float(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };

    let Some(ordering) = ordering else {
        return Value::Int(0);
    };

    Value::from(match code {
        OpCode::Equal => ordering == Ordering::Equal,
        OpCode::NotEqual => ordering != Ordering::Equal,
        OpCode::Greater => ordering == Ordering::Greater,
        OpCode::Less => ordering == Ordering::Less,
        OpCode::GreaterEqual => ordering != Ordering::Less,
        _ => ordering != Ordering::Greater,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i32) -> Value {
        Value::Int(i)
    }

    #[test]
    fn integer_arithmetic_wraps() {
        assert_eq!(binary(OpCode::Add, &int(i32::MAX), &int(1)), Ok(int(i32::MIN)));
        assert_eq!(binary(OpCode::Mul, &int(1 << 30), &int(4)), Ok(int(0)));
        assert_eq!(negate(&int(i32::MIN)), Ok(int(i32::MIN)));
        assert_eq!(binary(OpCode::Div, &int(i32::MIN), &int(-1)), Ok(int(i32::MIN)));
    }

    #[test]
    fn mixed_numbers_promote_to_float() {
        assert_eq!(binary(OpCode::Add, &int(1), &Value::Float(0.5)), Ok(Value::Float(1.5)));
        assert_eq!(binary(OpCode::Div, &int(7), &int(2)), Ok(int(3)));
        assert_eq!(binary(OpCode::Div, &Value::Float(7.0), &int(2)), Ok(Value::Float(3.5)));
    }

    #[test]
    fn division_by_any_zero_faults() {
        assert_eq!(binary(OpCode::Div, &int(1), &int(0)), Err(Fault::DivisionByZero));
        assert_eq!(binary(OpCode::Div, &int(1), &Value::Float(0.0)), Err(Fault::DivisionByZero));
        assert_eq!(binary(OpCode::DivAssign, &Value::Float(1.0), &int(0)), Err(Fault::DivisionByZero));
        assert_eq!(binary(OpCode::Mod, &int(5), &int(0)), Err(Fault::DivisionByZero));
        assert_eq!(binary(OpCode::Mod, &Value::Float(5.0), &int(2)), Err(Fault::TypeMismatch("%")));
    }

    #[test]
    fn plus_concatenates_strings() {
        assert_eq!(binary(OpCode::Add, &Value::from("n="), &int(4)), Ok(Value::from("n=4")));
        assert_eq!(
            binary(OpCode::Add, &Value::Float(1.5), &Value::from("!")),
            Ok(Value::from("1.500000!"))
        );
        assert_eq!(binary(OpCode::Sub, &Value::from("a"), &int(1)), Err(Fault::TypeMismatch("-")));
    }

    #[test]
    fn string_number_comparisons_are_false() {
        for code in [OpCode::Equal, OpCode::NotEqual, OpCode::Less, OpCode::GreaterEqual] {
            assert_eq!(binary(code, &Value::from("1"), &int(1)), Ok(int(0)));
        }
        assert_eq!(binary(OpCode::Less, &Value::from("abc"), &Value::from("abd")), Ok(int(1)));
        assert_eq!(binary(OpCode::Equal, &int(2), &Value::Float(2.0)), Ok(int(1)));
    }

    #[test]
    fn logical_operators_use_truthiness() {
        assert_eq!(binary(OpCode::And, &Value::from("x"), &Value::Float(0.0)), Ok(int(0)));
        assert_eq!(binary(OpCode::Or, &Value::from(""), &int(3)), Ok(int(1)));
        assert_eq!(binary(OpCode::Xor, &int(1), &int(2)), Ok(int(0)));
        assert_eq!(not(&Value::from("")), Ok(int(1)));
    }

    #[test]
    fn bitwise_is_integer_only() {
        assert_eq!(binary(OpCode::BitXor, &int(6), &int(3)), Ok(int(5)));
        assert_eq!(binary(OpCode::BitOr, &int(1), &Value::Float(2.0)), Err(Fault::TypeMismatch("|")));
    }

    #[test]
    fn increment_is_numeric_only() {
        assert_eq!(step(OpCode::Inc, &int(1)), Ok(int(2)));
        assert_eq!(step(OpCode::Dec, &Value::Float(1.5)), Ok(Value::Float(0.5)));
        assert_eq!(step(OpCode::Inc, &Value::from("a")), Err(Fault::TypeMismatch("++")));
    }
}
